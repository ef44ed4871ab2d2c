// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Loads
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Panel load evaluation and the span-interval integration surface the
//! structural solver pulls from.

use crate::panel::VortexPanel;
use vortex_math::Vec3;

/// Integrated loads over a span interval, per unit length, with the
/// angle-of-attack sensitivities the structural coupling linearizes
/// against.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeamLoad {
    pub force_per_length: Vec3,
    pub moment_per_length: f64,
    pub dforce_dalpha: Vec3,
    pub dmoment_dalpha: f64,
}

/// Kutta-Joukowski lift plus profile drag and pitching moment for every
/// panel, from the converged circulation and corrected coefficients.
pub fn update_panel_loads(panels: &mut [VortexPanel], density: f64) {
    for panel in panels.iter_mut() {
        let v = panel.v_total;
        let speed = panel.v_in_plane.norm();
        if speed < 1e-9 {
            panel.force_per_length = Vec3::ZERO;
            panel.moment_per_length = 0.0;
            continue;
        }
        // Lift per unit span: rho * (V x Gamma a2).
        let lift = density * v.cross(panel.a2 * panel.gamma);
        let drag_dir = panel.v_in_plane.normalized();
        let q = 0.5 * density * speed * speed;
        let drag = drag_dir * (q * panel.chord * panel.cd);
        panel.force_per_length = lift + drag;
        panel.moment_per_length = q * panel.chord * panel.chord * panel.cm;
    }
}

/// Overlap length of `[a0, a1]` with `[b0, b1]`.
fn overlap(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

/// Span-interval force per unit length for one blade, length-weighted
/// over the panels intersecting `[span_from, span_to]` (span fractions).
pub fn beam_force_per_length(
    panels: &[VortexPanel],
    blade: usize,
    span_from: f64,
    span_to: f64,
    density: f64,
) -> BeamLoad {
    let mut load = BeamLoad::default();
    let mut weight_sum = 0.0;
    for panel in panels
        .iter()
        .filter(|p| p.from_blade == blade && !p.is_strut)
    {
        let w = overlap(
            panel.relative_length_a,
            panel.relative_length_b,
            span_from,
            span_to,
        );
        if w <= 0.0 {
            continue;
        }
        let q = 0.5 * density * panel.v_in_plane.norm_sqr();
        load.force_per_length += panel.force_per_length * w;
        load.moment_per_length += panel.moment_per_length * w;
        // Sensitivities from the polar derivatives at the operating point.
        let dlift = q * panel.chord * panel.coeffs.dcl_dalpha;
        load.dforce_dalpha += panel.a3 * (dlift * w);
        load.dmoment_dalpha += q * panel.chord * panel.chord * panel.coeffs.dcm_dalpha * w;
        weight_sum += w;
    }
    if weight_sum > 1e-12 {
        load.force_per_length = load.force_per_length / weight_sum;
        load.moment_per_length /= weight_sum;
        load.dforce_dalpha = load.dforce_dalpha / weight_sum;
        load.dmoment_dalpha /= weight_sum;
    }
    load
}

/// Span-interval moment per unit length for one blade.
pub fn beam_moment_per_length(
    panels: &[VortexPanel],
    blade: usize,
    span_from: f64,
    span_to: f64,
    density: f64,
) -> f64 {
    beam_force_per_length(panels, blade, span_from, span_to, density).moment_per_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelCorners;

    fn loaded_panel(blade: usize, rel_a: f64, rel_b: f64) -> VortexPanel {
        let mut panel = VortexPanel::new(blade, None, 0, 1.0, 0.0, 0.18, 0.25, rel_a, rel_b);
        panel.update_geometry(
            PanelCorners {
                le_a: Vec3::new(0.0, 0.0, 0.0),
                te_a: Vec3::new(1.0, 0.0, 0.0),
                te_b: Vec3::new(1.0, 1.0, 0.0),
                le_b: Vec3::new(0.0, 1.0, 0.0),
            },
            0.0,
        );
        panel.reset_motion_state();
        panel.v_total = Vec3::new(10.0, 0.0, 0.0);
        panel.v_in_plane = panel.in_plane(panel.v_total);
        panel
    }

    #[test]
    fn test_kutta_joukowski_lift_direction_and_magnitude() {
        let mut panels = vec![loaded_panel(0, 0.0, 1.0)];
        panels[0].gamma = 2.0;
        panels[0].cd = 0.0;
        update_panel_loads(&mut panels, 1.225);
        // V along x, bound vortex along y: lift along V x a2*Gamma = z x?
        // rho * (V x Gamma y) = rho * V * Gamma * (x x y) = rho V Gamma z.
        let f = panels[0].force_per_length;
        assert!((f.z - 1.225 * 10.0 * 2.0).abs() < 1e-9, "lift {f:?}");
        assert!(f.x.abs() < 1e-12, "no drag configured");
        assert!(f.dot(panels[0].v_total).abs() < 1e-9, "lift is normal to inflow");
    }

    #[test]
    fn test_drag_aligned_with_inflow() {
        let mut panels = vec![loaded_panel(0, 0.0, 1.0)];
        panels[0].gamma = 0.0;
        panels[0].cd = 0.02;
        update_panel_loads(&mut panels, 1.225);
        let f = panels[0].force_per_length;
        let q = 0.5 * 1.225 * 100.0;
        assert!((f.x - q * 1.0 * 0.02).abs() < 1e-9, "drag {f:?}");
        assert!(f.z.abs() < 1e-12);
    }

    #[test]
    fn test_moment_scales_with_chord_squared() {
        let mut panels = vec![loaded_panel(0, 0.0, 1.0)];
        panels[0].cm = -0.05;
        update_panel_loads(&mut panels, 1.225);
        let q = 0.5 * 1.225 * 100.0;
        assert!((panels[0].moment_per_length + q * 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_beam_interval_weights_by_overlap() {
        let mut panels = vec![loaded_panel(0, 0.0, 0.5), loaded_panel(0, 0.5, 1.0)];
        panels[0].gamma = 2.0;
        panels[1].gamma = 4.0;
        update_panel_loads(&mut panels, 1.0);

        // Interval covering only the outboard panel.
        let outboard = beam_force_per_length(&panels, 0, 0.5, 1.0, 1.0);
        assert!((outboard.force_per_length.z - 40.0).abs() < 1e-9);

        // Interval straddling both equally averages them.
        let straddle = beam_force_per_length(&panels, 0, 0.25, 0.75, 1.0);
        assert!((straddle.force_per_length.z - 30.0).abs() < 1e-9);

        // Another blade contributes nothing.
        let other = beam_force_per_length(&panels, 1, 0.0, 1.0, 1.0);
        assert_eq!(other.force_per_length, Vec3::ZERO);
    }
}
