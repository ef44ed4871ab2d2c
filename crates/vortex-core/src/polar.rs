// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Polar Provider
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Airfoil polar coefficient provider contract.
//!
//! The provider is an external collaborator: the solver only depends on
//! this trait. Any NaN in the returned coefficients is a fatal abort
//! condition checked at the call site, never here.

use vortex_math::Vec3;

/// Everything the solver wants back from one polar lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeroCoefficients {
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
    /// Attached-flow (inviscid) lift, for the separation decomposition.
    pub cl_attached: f64,
    /// Fully-separated lift.
    pub cl_separated: f64,
    /// Steady separation fraction f in [0, 1]:
    /// `cl = f * cl_attached + (1 - f) * cl_separated`.
    pub f_separation: f64,
    /// Lift-curve slope, per radian.
    pub lift_slope: f64,
    pub alpha_zero_deg: f64,
    pub cd_zero: f64,
    pub alpha_cl_max_deg: f64,
    pub alpha_cl_min_deg: f64,
    /// Local derivatives, per degree.
    pub dcl_dalpha: f64,
    pub dcd_dalpha: f64,
    pub dcm_dalpha: f64,
    pub uses_decomposition: bool,
}

impl AeroCoefficients {
    pub fn is_finite(&self) -> bool {
        self.cl.is_finite() && self.cd.is_finite() && self.cm.is_finite()
    }
}

/// One lookup request.
#[derive(Debug, Clone, Copy)]
pub struct PolarQuery {
    pub blade: usize,
    pub station: usize,
    /// Span fraction in [0, 1] along the blade.
    pub span_fraction: f64,
    pub alpha_deg: f64,
    pub reynolds: f64,
    pub tip_speed_ratio: Option<f64>,
    pub flap_state: Option<f64>,
}

/// External polar/airfoil model. Must be evaluable at arbitrary angles
/// (wraparound beyond ±180°) and safe to query from worker threads.
pub trait PolarProvider: Sync + Send {
    fn coefficients(&self, query: &PolarQuery) -> AeroCoefficients;
}

/// Wrap an angle in degrees into [-180, 180).
pub fn wrap_angle_deg(alpha: f64) -> f64 {
    let mut a = (alpha + 180.0) % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a - 180.0
}

/// Flat-plate polar with a linear lift region and a post-stall plateau.
/// The standard stub for solver verification.
#[derive(Debug, Clone, Copy)]
pub struct LinearPolar {
    /// Lift-curve slope per radian.
    pub lift_slope: f64,
    pub alpha_zero_deg: f64,
    pub cd_zero: f64,
    pub stall_deg: f64,
    pub cm: f64,
}

impl Default for LinearPolar {
    fn default() -> Self {
        LinearPolar {
            lift_slope: 2.0 * std::f64::consts::PI,
            alpha_zero_deg: 0.0,
            cd_zero: 0.008,
            stall_deg: 12.0,
            cm: -0.05,
        }
    }
}

impl PolarProvider for LinearPolar {
    fn coefficients(&self, query: &PolarQuery) -> AeroCoefficients {
        let alpha = wrap_angle_deg(query.alpha_deg);
        let alpha_rel = (alpha - self.alpha_zero_deg).to_radians();
        let cl_attached = self.lift_slope * alpha_rel;
        // Deep-stall plate carries about a quarter of the attached lift,
        // which keeps the separation fraction inside [0, 1] past stall.
        let cl_separated = 0.25 * cl_attached;
        let stall = self.stall_deg.to_radians();
        let (cl, f_separation) = if alpha_rel.abs() <= stall {
            (cl_attached, 1.0)
        } else {
            // Plateau at the stall value, fading separation fraction.
            let cl_stall = self.lift_slope * stall * alpha_rel.signum();
            let f = ((cl_stall - cl_separated) / (cl_attached - cl_separated))
                .clamp(0.0, 1.0);
            (cl_stall, f)
        };
        let cd = self.cd_zero + 0.01 * (alpha_rel.abs() / stall).powi(2);
        AeroCoefficients {
            cl,
            cd,
            cm: self.cm,
            cl_attached,
            cl_separated,
            f_separation,
            lift_slope: self.lift_slope,
            alpha_zero_deg: self.alpha_zero_deg,
            cd_zero: self.cd_zero,
            alpha_cl_max_deg: self.alpha_zero_deg + self.stall_deg,
            alpha_cl_min_deg: self.alpha_zero_deg - self.stall_deg,
            dcl_dalpha: if alpha_rel.abs() <= stall {
                self.lift_slope.to_radians()
            } else {
                0.0
            },
            dcd_dalpha: 0.0,
            dcm_dalpha: 0.0,
            uses_decomposition: true,
        }
    }
}

/// Snel's stall-delay correction for rotating blades.
///
/// Pushes the local lift toward the potential-flow value in proportion to
/// (chord / radius)^2; only meaningful inboard where c/r is large.
pub fn himmelskamp_correction(
    coeffs: &AeroCoefficients,
    chord: f64,
    radius: f64,
    alpha_deg: f64,
) -> f64 {
    if radius <= 0.0 {
        return coeffs.cl;
    }
    let cl_potential = coeffs.lift_slope * (alpha_deg - coeffs.alpha_zero_deg).to_radians();
    coeffs.cl + 3.1 * (chord / radius).powi(2) * (cl_potential - coeffs.cl)
}

/// Direction of profile drag: along the in-plane inflow.
pub fn drag_direction(v_in_plane: Vec3) -> Vec3 {
    v_in_plane.normalized()
}
