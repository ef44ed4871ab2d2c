// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Sea-level air density (kg/m^3).
pub const AIR_DENSITY: f64 = 1.225;

/// Kinematic viscosity of air at 15 °C (m^2/s).
pub const KINEMATIC_VISCOSITY: f64 = 1.4661e-5;

/// Safety clamp on corrected lift coefficients from the dynamic-stall layer.
pub const CL_SAFETY_CLAMP: f64 = 2.5;

/// Floor substituted for denominators that evaluate to zero/NaN/Inf inside
/// tip-loss and dynamic-stall expressions. The loop must keep advancing.
pub const DENOMINATOR_FLOOR: f64 = 0.01;

/// Wake node/particle position magnitude beyond which the run is aborted.
pub const WAKE_POSITION_LIMIT: f64 = 1e5;

/// Panel relative-velocity magnitude beyond which the run is aborted.
pub const RELATIVE_VELOCITY_LIMIT: f64 = 1e8;

/// Particle core size at filament conversion, relative to filament length.
pub const CONVERSION_CORE_FACTOR: f64 = 1.1;

/// Squire parameter for turbulent vortex core growth.
pub const SQUIRE_ALPHA: f64 = 1.25643;

// Indicial step-response coefficients for the effective-angle filter,
// Jones flat-plate set (production-active).
// Avatar rotor:  A1 0.1784, b1 0.07549, A2 0.07035, b2 0.7429
// HAWC2 default: A1 0.0962, b1 0.0455,  A2 0.1667,  b2 0.3
pub const JONES_A1: f64 = 0.165;
pub const JONES_B1: f64 = 0.0455;
pub const JONES_A2: f64 = 0.335;
pub const JONES_B2: f64 = 0.3;

/// Gormont reduced-time coefficient.
pub const GORMONT_K1: f64 = 0.75;
