// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Unsteady BEM
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Polar-grid engineering induction: the cheaper alternative to vortex
//! induction. Axial/tangential induction from the empirical
//! thrust-coefficient curve on an azimuth × radius grid, Prandtl tip
//! loss, Glauert yaw correction, and a first-order dynamic-inflow lag.

use crate::panel::VortexPanel;
use crate::polar::{PolarProvider, PolarQuery};
use ndarray::Array2;
use std::f64::consts::PI;
use vortex_math::{Frame, Vec3};
use vortex_types::config::{BemConfig, RotorConfig};

/// Momentum theory below, Glauert's empirical line above the transition
/// thrust coefficient.
const GLAUERT_CT_TRANSITION: f64 = 0.96;

/// Tip-loss flow-angle sine floor.
const SIN_PHI_FLOOR: f64 = 0.01;

/// Axial induction factor from a local thrust coefficient.
pub fn axial_induction_from_ct(ct: f64, tip_loss: f64) -> f64 {
    let ctf = (ct / tip_loss.max(0.1)).max(0.0);
    if ctf < GLAUERT_CT_TRANSITION {
        0.5 * (1.0 - (1.0 - ctf).max(0.0).sqrt())
    } else {
        // Straight-line fit through (0.96, 0.4) toward the turbulent
        // wake state.
        (15.0 * ctf - 4.0) / 26.0
    }
}

/// Prandtl tip-loss factor.
pub fn prandtl_tip_loss(num_blades: usize, radius: f64, tip_radius: f64, phi_rad: f64) -> f64 {
    if radius >= tip_radius {
        return 0.1;
    }
    let s = phi_rad.sin().abs().max(SIN_PHI_FLOOR);
    let f_exp = num_blades as f64 * (tip_radius - radius) / (2.0 * radius.max(1e-6) * s);
    ((-f_exp).exp().acos() * 2.0 / PI).max(0.1)
}

/// Glauert skewed-wake correction factor on the axial induction.
pub fn yaw_correction(
    a: f64,
    radius: f64,
    tip_radius: f64,
    skew_rad: f64,
    azimuth_rad: f64,
) -> f64 {
    a * (1.0
        + 15.0 * PI / 32.0 * (radius / tip_radius.max(1e-6)) * (skew_rad / 2.0).tan()
            * azimuth_rad.cos())
}

/// Classic steady BEM iteration for one annulus: fixed-point over the
/// axial/tangential induction with the empirical thrust curve.
pub fn solve_steady_annulus(
    solidity: f64,
    tsr_local: f64,
    twist_deg: f64,
    num_blades: usize,
    radius_fraction: f64,
    polar: &dyn PolarProvider,
    max_iterations: usize,
) -> (f64, f64, usize) {
    let mut a = 0.0_f64;
    let mut a_prime = 0.0_f64;
    let mut iterations = 0;
    for it in 1..=max_iterations {
        iterations = it;
        let phi = (1.0 - a).atan2(tsr_local * (1.0 + a_prime));
        let alpha_deg = phi.to_degrees() - twist_deg;
        let coeffs = polar.coefficients(&PolarQuery {
            blade: 0,
            station: 0,
            span_fraction: radius_fraction,
            alpha_deg,
            reynolds: 1e6,
            tip_speed_ratio: Some(tsr_local),
            flap_state: None,
        });
        let cn = coeffs.cl * phi.cos() + coeffs.cd * phi.sin();
        let ctang = coeffs.cl * phi.sin() - coeffs.cd * phi.cos();
        let f = prandtl_tip_loss(num_blades, radius_fraction, 1.0, phi);
        let sin_phi = phi.sin().abs().max(SIN_PHI_FLOOR);

        let ct_local = solidity * cn * (1.0 - a).powi(2) / (sin_phi * sin_phi);
        let a_new = axial_induction_from_ct(ct_local, f);
        let kt = solidity * ctang / (4.0 * f * sin_phi * phi.cos().abs().max(SIN_PHI_FLOOR));
        let a_prime_new = kt / (1.0 - kt).max(0.1);

        let delta_a = a_new - a;
        let delta_ap = a_prime_new - a_prime;
        a += 0.3 * delta_a;
        a_prime += 0.3 * delta_ap;
        if delta_a.abs() < 1e-6 && delta_ap.abs() < 1e-6 {
            break;
        }
    }
    (a, a_prime, iterations)
}

/// Azimuth × radius induction grid with dynamic-inflow memory.
pub struct UnsteadyBem {
    cfg: BemConfig,
    num_blades: usize,
    tip_radius: f64,
    hub_radius: f64,
    rpm: f64,
    yaw_deg: f64,
    radii: Vec<f64>,
    /// Axial induction factor per (azimuth, radius) cell.
    axial: Array2<f64>,
    /// Tangential induction factor per cell.
    tangential: Array2<f64>,
}

impl UnsteadyBem {
    pub fn new(rotor: &RotorConfig, cfg: &BemConfig) -> Self {
        let hub_radius = rotor.blade.first().map(|s| s.radius).unwrap_or(0.0);
        let tip_radius = rotor.tip_radius();
        let nr = cfg.grid_radial.max(2);
        let radii = (0..nr)
            .map(|i| hub_radius + (tip_radius - hub_radius) * (i as f64 + 0.5) / nr as f64)
            .collect();
        UnsteadyBem {
            cfg: cfg.clone(),
            num_blades: rotor.num_blades,
            tip_radius,
            hub_radius,
            rpm: rotor.rpm,
            yaw_deg: rotor.yaw_deg,
            radii,
            axial: Array2::zeros((cfg.grid_azimuth.max(1), nr)),
            tangential: Array2::zeros((cfg.grid_azimuth.max(1), nr)),
        }
    }

    fn cell(&self, azimuth_deg: f64, radius: f64) -> (usize, usize) {
        let n_az = self.axial.dim().0;
        let mut az = azimuth_deg % 360.0;
        if az < 0.0 {
            az += 360.0;
        }
        let i = ((az / 360.0 * n_az as f64) as usize).min(n_az - 1);
        let span = (self.tip_radius - self.hub_radius).max(1e-9);
        let t = ((radius - self.hub_radius) / span).clamp(0.0, 1.0);
        let j = ((t * self.radii.len() as f64) as usize).min(self.radii.len() - 1);
        (i, j)
    }

    /// Polar coordinates of a world point in the (azimuth-zero) hub frame.
    fn polar_coordinates(&self, point: Vec3, hub: &Frame) -> (f64, f64, Vec3, Vec3) {
        let local = point - hub.origin;
        let c1 = local.dot(hub.y);
        let c2 = local.dot(hub.z);
        let radius = (c1 * c1 + c2 * c2).sqrt();
        let azimuth_deg = c2.atan2(c1).to_degrees();
        let radial_dir = if radius > 1e-9 {
            (hub.y * c1 + hub.z * c2) / radius
        } else {
            hub.y
        };
        let tangent_dir = hub.x.cross(radial_dir);
        (azimuth_deg, radius, radial_dir, tangent_dir)
    }

    /// Engineering induced velocity at a world point: axial slowdown plus
    /// wake swirl, with the skewed-wake azimuthal weighting.
    pub fn induced_velocity_at_point(&self, point: Vec3, hub: &Frame, v_free: Vec3) -> Vec3 {
        let (azimuth_deg, radius, _radial, tangent) = self.polar_coordinates(point, hub);
        if radius > self.tip_radius * 1.05 {
            return Vec3::ZERO;
        }
        let (i, j) = self.cell(azimuth_deg, radius);
        let mut a = self.axial[[i, j]];
        let skew = self.yaw_deg.to_radians();
        if skew.abs() > 1e-9 {
            a = yaw_correction(a, radius, self.tip_radius, skew, azimuth_deg.to_radians());
        }
        let a_prime = self.tangential[[i, j]];
        let v_axial = v_free.dot(hub.x);
        let omega = self.rpm * 2.0 * PI / 60.0;
        -hub.x * (a * v_axial) - tangent * (a_prime * omega * radius)
    }

    /// Feed the converged panel loading back into the grid: local thrust
    /// coefficient → quasi-steady induction → first-order dynamic-inflow
    /// relaxation of the cells under each blade.
    pub fn update(
        &mut self,
        panels: &[VortexPanel],
        hub: &Frame,
        wind_speed: f64,
        density: f64,
        dt: f64,
    ) {
        if wind_speed <= 1e-6 {
            return;
        }
        let omega = self.rpm * 2.0 * PI / 60.0;
        for panel in panels {
            if panel.is_strut {
                continue;
            }
            let (azimuth_deg, radius, _r, _t) = self.polar_coordinates(panel.control_point, hub);
            let (i, j) = self.cell(azimuth_deg, radius);

            let f_axial = panel.force_per_length.dot(hub.x).max(0.0);
            let ct = self.num_blades as f64 * f_axial
                / (0.5 * density * wind_speed * wind_speed * 2.0 * PI * radius.max(1e-6));

            let a_old = self.axial[[i, j]];
            let phi = (wind_speed * (1.0 - a_old))
                .atan2(omega * radius * (1.0 + self.tangential[[i, j]]));
            let f = if self.cfg.tip_loss {
                prandtl_tip_loss(self.num_blades, radius, self.tip_radius, phi)
            } else {
                1.0
            };
            let a_qs = axial_induction_from_ct(ct, f);

            let a_new = if self.cfg.dynamic_inflow && dt > 0.0 {
                // Dynamic-inflow time constant grows with loading.
                let tau = 1.1 / (1.0 - 1.3 * a_old.min(0.5)) * self.tip_radius / wind_speed;
                a_old + (a_qs - a_old) * (dt / tau).min(1.0)
            } else {
                a_qs
            };
            self.axial[[i, j]] = a_new.clamp(0.0, 0.95);

            // Swirl from angular momentum balance.
            let lambda_r = (omega * radius / wind_speed).max(1e-6);
            self.tangential[[i, j]] =
                (a_new * (1.0 - a_new) / (lambda_r * lambda_r)).clamp(0.0, 0.5);
        }
    }

    pub fn axial_at(&self, azimuth_deg: f64, radius: f64) -> f64 {
        let (i, j) = self.cell(azimuth_deg, radius);
        self.axial[[i, j]]
    }
}
