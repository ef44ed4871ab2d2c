// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Particle
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::arena::Handle;
use vortex_math::Vec3;

pub type ParticleHandle = Handle<WakeParticle>;

/// Lagrangian vortex particle, produced by converting an aged filament.
///
/// `alpha` is the vector vorticity (filament direction × circulation ×
/// length at conversion); it evolves under vortex stretching and,
/// optionally, particle-strength-exchange diffusion.
#[derive(Debug, Clone)]
pub struct WakeParticle {
    pub position: Vec3,
    pub initial_position: Vec3,
    pub alpha: Vec3,
    pub initial_alpha: Vec3,
    /// Latest position rate of change.
    pub rate: Vec3,
    pub rate_prev: Vec3,
    /// Latest vorticity rate of change (stretching + diffusion).
    pub alpha_rate: Vec3,
    pub alpha_rate_prev: Vec3,
    pub core_size: f64,
    pub volume: f64,
    /// Circulation magnitude of the source filament.
    pub gamma: f64,
    /// Length of the source filament.
    pub length: f64,
    pub is_new: bool,
    /// Converted from a trailing filament (vs a shed one).
    pub is_trail: bool,
    pub from_blade: usize,
    pub from_station: usize,
    pub from_timestep: usize,
    pub from_revolution: f64,
}

impl WakeParticle {
    #[allow(clippy::too_many_arguments)]
    pub fn from_filament(
        position: Vec3,
        alpha: Vec3,
        core_size: f64,
        gamma: f64,
        length: f64,
        is_trail: bool,
        blade: usize,
        station: usize,
        timestep: usize,
        revolution: f64,
    ) -> Self {
        let volume = std::f64::consts::PI * core_size * core_size * length;
        WakeParticle {
            position,
            initial_position: position,
            alpha,
            initial_alpha: alpha,
            rate: Vec3::ZERO,
            rate_prev: Vec3::ZERO,
            alpha_rate: Vec3::ZERO,
            alpha_rate_prev: Vec3::ZERO,
            core_size,
            volume,
            gamma,
            length,
            is_new: true,
            is_trail,
            from_blade: blade,
            from_station: station,
            from_timestep: timestep,
            from_revolution: revolution,
        }
    }
}
