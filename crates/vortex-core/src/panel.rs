// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Panel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Lifting-line panels: geometry, local frame, and per-panel aerodynamic
//! state. Corner points are rewritten every substep by the geometry
//! provider; everything else is derived.

use crate::dynstall::DynStallState;
use crate::polar::AeroCoefficients;
use vortex_math::Vec3;
use vortex_wake::FilamentSegment;

/// Four corner points of one panel: leading/trailing edge at the inboard
/// (A) and outboard (B) span stations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelCorners {
    pub le_a: Vec3,
    pub te_a: Vec3,
    pub te_b: Vec3,
    pub le_b: Vec3,
}

/// One bound lifting-line panel with its full aerodynamic state.
#[derive(Debug, Clone)]
pub struct VortexPanel {
    // Geometry, rewritten every substep.
    pub corners: PanelCorners,
    corners_old: PanelCorners,
    /// Chordwise unit vector, leading to trailing edge.
    pub a1: Vec3,
    /// Spanwise unit vector, A to B.
    pub a2: Vec3,
    /// Normal unit vector, a1 × a2.
    pub a3: Vec3,
    pub chord: f64,
    /// Quarter-chord control point (bound vortex, load evaluation).
    pub control_point: Vec3,
    /// Three-quarter-chord evaluation point (quasi-steady angle).
    pub control_point_75: Vec3,
    /// Midspan distance from the rotor axis.
    pub radius: f64,
    pub twist_deg: f64,
    pub thickness_ratio: f64,
    pub pitch_axis: f64,
    /// Span-fraction bounds along the blade, `relative_length_a < relative_length_b`.
    pub relative_length_a: f64,
    pub relative_length_b: f64,

    // Provenance.
    pub from_blade: usize,
    pub from_strut: Option<usize>,
    pub from_station: usize,
    pub is_hub: bool,
    pub is_tip: bool,
    pub is_strut: bool,

    // Circulation history.
    pub gamma: f64,
    pub gamma_t_minus_1: f64,
    pub gamma_t_minus_2: f64,
    pub gamma_last_iteration: f64,
    pub converged: bool,

    // Velocity decomposition at the control point.
    pub v_sampled: Vec3,
    pub v_induced: Vec3,
    pub v_tower: Vec3,
    /// Rigid-body/structural velocity of the panel itself.
    pub v_relative: Vec3,
    pub v_total: Vec3,
    pub v_in_plane: Vec3,

    // Angles and Reynolds number.
    pub alpha_deg: f64,
    pub alpha75_deg: f64,
    /// Quasi-steady angle from the previous outer step.
    pub alpha_deg_old: f64,
    /// Angle from geometry alone, without induction.
    pub alpha_geometric_deg: f64,
    pub reynolds: f64,

    // Latest polar lookup and corrected output coefficients.
    pub coeffs: AeroCoefficients,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,

    // Loads.
    pub force_per_length: Vec3,
    pub moment_per_length: f64,

    // Dynamic-stall state machine.
    pub dyn_state: DynStallState,
}

impl VortexPanel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blade: usize,
        strut: Option<usize>,
        station: usize,
        radius: f64,
        twist_deg: f64,
        thickness_ratio: f64,
        pitch_axis: f64,
        relative_length_a: f64,
        relative_length_b: f64,
    ) -> Self {
        debug_assert!(relative_length_a < relative_length_b);
        VortexPanel {
            corners: PanelCorners::default(),
            corners_old: PanelCorners::default(),
            a1: Vec3::new(1.0, 0.0, 0.0),
            a2: Vec3::new(0.0, 1.0, 0.0),
            a3: Vec3::new(0.0, 0.0, 1.0),
            chord: 0.0,
            control_point: Vec3::ZERO,
            control_point_75: Vec3::ZERO,
            radius,
            twist_deg,
            thickness_ratio,
            pitch_axis,
            relative_length_a,
            relative_length_b,
            from_blade: blade,
            from_strut: strut,
            from_station: station,
            is_hub: false,
            is_tip: false,
            is_strut: strut.is_some(),
            gamma: 0.0,
            gamma_t_minus_1: 0.0,
            gamma_t_minus_2: 0.0,
            gamma_last_iteration: 0.0,
            converged: false,
            v_sampled: Vec3::ZERO,
            v_induced: Vec3::ZERO,
            v_tower: Vec3::ZERO,
            v_relative: Vec3::ZERO,
            v_total: Vec3::ZERO,
            v_in_plane: Vec3::ZERO,
            alpha_deg: 0.0,
            alpha75_deg: 0.0,
            alpha_deg_old: 0.0,
            alpha_geometric_deg: 0.0,
            reynolds: 0.0,
            coeffs: AeroCoefficients::default(),
            cl: 0.0,
            cd: 0.0,
            cm: 0.0,
            force_per_length: Vec3::ZERO,
            moment_per_length: 0.0,
            dyn_state: DynStallState::None,
        }
    }

    /// Install new corner points and derive the local frame, control
    /// points and the panel velocity by backward difference over `dt`.
    pub fn update_geometry(&mut self, corners: PanelCorners, dt: f64) {
        self.corners_old = self.corners;
        self.corners = corners;

        let mid_le = (corners.le_a + corners.le_b) * 0.5;
        let mid_te = (corners.te_a + corners.te_b) * 0.5;
        let mid_a = (corners.le_a + corners.te_a) * 0.5;
        let mid_b = (corners.le_b + corners.te_b) * 0.5;

        self.chord = (mid_te - mid_le).norm();
        self.a1 = (mid_te - mid_le).normalized();
        let span = (mid_b - mid_a).normalized();
        self.a3 = self.a1.cross(span).normalized();
        // Re-orthogonalize the spanwise axis.
        self.a2 = self.a3.cross(self.a1);
        self.control_point = mid_le + self.a1 * (0.25 * self.chord);
        self.control_point_75 = mid_le + self.a1 * (0.75 * self.chord);

        if dt > 0.0 {
            let old_mid_le = (self.corners_old.le_a + self.corners_old.le_b) * 0.5;
            let old_mid_te = (self.corners_old.te_a + self.corners_old.te_b) * 0.5;
            let old_cp = old_mid_le + (old_mid_te - old_mid_le) * 0.25;
            self.v_relative = (self.control_point - old_cp) / dt;
        }
    }

    /// Seed the velocity history so the first backward difference is zero.
    pub fn reset_motion_state(&mut self) {
        self.corners_old = self.corners;
        self.v_relative = Vec3::ZERO;
    }

    /// Trailing-edge corner positions, A then B.
    pub fn trailing_edge(&self) -> (Vec3, Vec3) {
        (self.corners.te_a, self.corners.te_b)
    }

    /// Spanwise extent of the panel.
    pub fn span_length(&self) -> f64 {
        let mid_a = (self.corners.le_a + self.corners.te_a) * 0.5;
        let mid_b = (self.corners.le_b + self.corners.te_b) * 0.5;
        (mid_b - mid_a).norm()
    }

    /// The quarter-chord bound vortex of this panel as an induction source.
    pub fn bound_segment(&self, gamma: f64) -> FilamentSegment {
        let quarter_a = self.corners.le_a + (self.corners.te_a - self.corners.le_a) * 0.25;
        let quarter_b = self.corners.le_b + (self.corners.te_b - self.corners.le_b) * 0.25;
        FilamentSegment {
            leading: quarter_a,
            trailing: quarter_b,
            gamma,
            core_size_sqr: (0.05 * self.chord).powi(2).max(1e-8),
        }
    }

    /// Shift the circulation history at the end of an outer timestep.
    pub fn rotate_gamma_history(&mut self) {
        self.gamma_t_minus_2 = self.gamma_t_minus_1;
        self.gamma_t_minus_1 = self.gamma;
    }

    /// Angle of attack from an inflow vector, via the in-plane projection
    /// onto the chordwise/normal axes, in degrees.
    pub fn angle_of_attack_deg(&self, velocity: Vec3) -> f64 {
        let chordwise = velocity.dot(self.a1);
        let normal = velocity.dot(self.a3);
        normal.atan2(chordwise).to_degrees()
    }

    /// Project a velocity into the panel plane (drop the spanwise part).
    pub fn in_plane(&self, velocity: Vec3) -> Vec3 {
        velocity - self.a2 * velocity.dot(self.a2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn flat_panel(chord: f64, span: f64) -> VortexPanel {
        let mut panel = VortexPanel::new(0, None, 0, 1.0, 0.0, 0.18, 0.25, 0.0, 1.0);
        panel.update_geometry(
            PanelCorners {
                le_a: Vec3::new(0.0, 0.0, 0.0),
                te_a: Vec3::new(chord, 0.0, 0.0),
                te_b: Vec3::new(chord, span, 0.0),
                le_b: Vec3::new(0.0, span, 0.0),
            },
            0.0,
        );
        panel.reset_motion_state();
        panel
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let panel = flat_panel(1.5, 4.0);
        assert!((panel.a1.norm() - 1.0).abs() < 1e-12);
        assert!((panel.a2.norm() - 1.0).abs() < 1e-12);
        assert!((panel.a3.norm() - 1.0).abs() < 1e-12);
        assert!(panel.a1.dot(panel.a2).abs() < 1e-12);
        assert!(panel.a1.dot(panel.a3).abs() < 1e-12);
        assert!((panel.chord - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_control_points_on_chord() {
        let panel = flat_panel(2.0, 1.0);
        assert!((panel.control_point - Vec3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
        assert!((panel.control_point_75 - Vec3::new(1.5, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_angle_of_attack_sign() {
        let panel = flat_panel(1.0, 1.0);
        // Flow from below (positive normal component) is positive incidence.
        let aoa = panel.angle_of_attack_deg(Vec3::new(10.0, 0.0, 10.0 * 5.0_f64.to_radians().tan()));
        assert!((aoa - 5.0).abs() < 1e-9, "aoa {aoa}");
        let neg = panel.angle_of_attack_deg(Vec3::new(10.0, 0.0, -1.0));
        assert!(neg < 0.0);
    }

    #[test]
    fn test_relative_velocity_backward_difference() {
        let mut panel = flat_panel(1.0, 1.0);
        let shifted = PanelCorners {
            le_a: Vec3::new(0.0, 0.0, 0.1),
            te_a: Vec3::new(1.0, 0.0, 0.1),
            te_b: Vec3::new(1.0, 1.0, 0.1),
            le_b: Vec3::new(0.0, 1.0, 0.1),
        };
        panel.update_geometry(shifted, 0.05);
        assert!((panel.v_relative - Vec3::new(0.0, 0.0, 2.0)).norm() < 1e-9);
    }

    #[test]
    fn test_in_plane_removes_spanwise_component() {
        let panel = flat_panel(1.0, 1.0);
        let v = Vec3::new(3.0, 7.0, -2.0);
        let in_plane = panel.in_plane(v);
        assert!(in_plane.dot(panel.a2).abs() < 1e-12);
        assert!((in_plane - Vec3::new(3.0, 0.0, -2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_gamma_history_rotation() {
        let mut panel = flat_panel(1.0, 1.0);
        panel.gamma = 3.0;
        panel.rotate_gamma_history();
        panel.gamma = 5.0;
        panel.rotate_gamma_history();
        assert!((panel.gamma_t_minus_1 - 5.0).abs() < 1e-12);
        assert!((panel.gamma_t_minus_2 - 3.0).abs() < 1e-12);
    }
}
