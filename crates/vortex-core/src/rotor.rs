// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Rigid Rotor Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Structural/geometry provider contract and the rigid analytic rotor.
//!
//! Conventions: wind along +x, z up, hub at (0, 0, hub_height). Blade 0
//! points +z at zero azimuth; azimuth advances the rotor about the shaft
//! axis. A deformable multibody model implements the same trait.

use crate::panel::{PanelCorners, VortexPanel};
use vortex_math::{frame::rotate_about_axis, Frame, Vec3};
use vortex_types::config::RotorConfig;

/// Supplies panel corner positions each (sub)step and the hub frame.
pub trait StructuralProvider {
    fn update_geometry(&self, panels: &mut [VortexPanel], time: f64, azimuth_deg: f64, dt: f64);
    fn hub_frame(&self, azimuth_deg: f64) -> Frame;
    /// Trailing-edge position of one span station, where wake rows spawn.
    fn trailing_edge(&self, blade: usize, station: usize, azimuth_deg: f64) -> Vec3;
    /// Demanded blade pitch, e.g. from the controller.
    fn set_pitch(&mut self, blade: usize, pitch_deg: f64);
}

/// One interpolated blade section.
#[derive(Debug, Clone, Copy)]
struct BladeSection {
    radius: f64,
    chord: f64,
    twist_deg: f64,
    thickness_ratio: f64,
    pitch_axis: f64,
}

/// Rigid analytic rotor: blade stations swept to panel corners, rotated
/// by azimuth with hub offset, cone, yaw and shaft tilt applied.
pub struct RigidRotor {
    cfg: RotorConfig,
    sections: Vec<BladeSection>,
    pitch_deg: Vec<f64>,
}

impl RigidRotor {
    pub fn new(cfg: &RotorConfig) -> Self {
        let n_stations = cfg.panels_per_blade + 1;
        let root = cfg.blade.first().expect("validated config").radius;
        let tip = cfg.tip_radius();
        let sections = (0..n_stations)
            .map(|i| {
                let r = root + (tip - root) * i as f64 / (n_stations - 1) as f64;
                Self::section_at(cfg, r)
            })
            .collect();
        RigidRotor {
            cfg: cfg.clone(),
            sections,
            pitch_deg: vec![cfg.collective_pitch_deg; cfg.num_blades],
        }
    }

    fn section_at(cfg: &RotorConfig, radius: f64) -> BladeSection {
        let stations = &cfg.blade;
        let clamped = radius.clamp(stations[0].radius, stations[stations.len() - 1].radius);
        let idx = stations
            .windows(2)
            .position(|w| clamped <= w[1].radius)
            .unwrap_or(stations.len() - 2);
        let lo = &stations[idx];
        let hi = &stations[idx + 1];
        let t = if hi.radius > lo.radius {
            (clamped - lo.radius) / (hi.radius - lo.radius)
        } else {
            0.0
        };
        BladeSection {
            radius: clamped,
            chord: lo.chord + t * (hi.chord - lo.chord),
            twist_deg: lo.twist_deg + t * (hi.twist_deg - lo.twist_deg),
            thickness_ratio: lo.thickness_ratio + t * (hi.thickness_ratio - lo.thickness_ratio),
            pitch_axis: lo.pitch_axis + t * (hi.pitch_axis - lo.pitch_axis),
        }
    }

    /// Build the panel array this rotor will drive. One panel per pair of
    /// adjacent sections, per blade, span-station order strictly
    /// increasing along each blade.
    pub fn build_panels(&self) -> Vec<VortexPanel> {
        let root = self.sections.first().map(|s| s.radius).unwrap_or(0.0);
        let tip = self.sections.last().map(|s| s.radius).unwrap_or(1.0);
        let span = (tip - root).max(1e-9);
        let mut panels = Vec::with_capacity(self.cfg.num_blades * self.cfg.panels_per_blade);
        for blade in 0..self.cfg.num_blades {
            for p in 0..self.cfg.panels_per_blade {
                let a = &self.sections[p];
                let b = &self.sections[p + 1];
                let mut panel = VortexPanel::new(
                    blade,
                    None,
                    p,
                    0.5 * (a.radius + b.radius),
                    0.5 * (a.twist_deg + b.twist_deg),
                    0.5 * (a.thickness_ratio + b.thickness_ratio),
                    0.5 * (a.pitch_axis + b.pitch_axis),
                    (a.radius - root) / span,
                    (b.radius - root) / span,
                );
                panel.is_hub = p == 0;
                panel.is_tip = p == self.cfg.panels_per_blade - 1;
                panels.push(panel);
            }
        }
        panels
    }

    pub fn panels_per_blade(&self) -> usize {
        self.cfg.panels_per_blade
    }

    pub fn num_blades(&self) -> usize {
        self.cfg.num_blades
    }

    fn shaft_axis(&self) -> Vec3 {
        let tilted = rotate_about_axis(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            self.cfg.shaft_tilt_deg.to_radians(),
        );
        rotate_about_axis(
            tilted,
            Vec3::new(0.0, 0.0, 1.0),
            self.cfg.yaw_deg.to_radians(),
        )
    }

    fn hub_position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.cfg.hub_height) - self.shaft_axis() * self.cfg.overhang
    }

    /// World-space corner points of one section of one blade.
    fn section_corners(&self, blade: usize, section: usize, azimuth_deg: f64) -> (Vec3, Vec3) {
        let axis = self.shaft_axis();
        let hub = self.hub_position();
        let s = &self.sections[section];

        let psi = azimuth_deg + 360.0 * blade as f64 / self.cfg.num_blades as f64;
        // Span reference: +z projected off the shaft axis, rotated by azimuth.
        let up = (Vec3::new(0.0, 0.0, 1.0) - axis * axis.z).normalized();
        let mut span = rotate_about_axis(up, axis, psi.to_radians());
        let tangent = axis.cross(span);
        if self.cfg.cone_deg != 0.0 {
            span = rotate_about_axis(span, tangent, self.cfg.cone_deg.to_radians());
        }

        // Leading edge into the direction of motion.
        let chord0 = if self.cfg.reversed_rotation {
            tangent
        } else {
            -tangent
        };
        let theta = (s.twist_deg + self.pitch_deg[blade]).to_radians();
        let chord_dir = rotate_about_axis(chord0, span, -theta);

        let reference = hub + span * s.radius;
        let le = reference - chord_dir * (s.pitch_axis * s.chord);
        let te = le + chord_dir * s.chord;
        (le, te)
    }

    /// Trailing-edge position of one span station of one blade.
    pub fn trailing_edge_position(&self, blade: usize, station: usize, azimuth_deg: f64) -> Vec3 {
        self.section_corners(blade, station, azimuth_deg).1
    }
}

impl StructuralProvider for RigidRotor {
    fn update_geometry(&self, panels: &mut [VortexPanel], _time: f64, azimuth_deg: f64, dt: f64) {
        for panel in panels.iter_mut() {
            let (le_a, te_a) = self.section_corners(panel.from_blade, panel.from_station, azimuth_deg);
            let (le_b, te_b) =
                self.section_corners(panel.from_blade, panel.from_station + 1, azimuth_deg);
            panel.update_geometry(
                PanelCorners {
                    le_a,
                    te_a,
                    te_b,
                    le_b,
                },
                dt,
            );
        }
    }

    fn hub_frame(&self, azimuth_deg: f64) -> Frame {
        let axis = self.shaft_axis();
        let up = (Vec3::new(0.0, 0.0, 1.0) - axis * axis.z).normalized();
        let y = rotate_about_axis(up, axis, azimuth_deg.to_radians());
        Frame {
            origin: self.hub_position(),
            x: axis,
            y,
            z: axis.cross(y),
        }
    }

    fn trailing_edge(&self, blade: usize, station: usize, azimuth_deg: f64) -> Vec3 {
        self.trailing_edge_position(blade, station, azimuth_deg)
    }

    fn set_pitch(&mut self, blade: usize, pitch_deg: f64) {
        if let Some(p) = self.pitch_deg.get_mut(blade) {
            *p = pitch_deg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_types::config::BladeStation;

    fn test_rotor_config() -> RotorConfig {
        RotorConfig {
            num_blades: 3,
            blade: vec![
                BladeStation {
                    radius: 1.0,
                    chord: 2.0,
                    twist_deg: 10.0,
                    thickness_ratio: 0.4,
                    pitch_axis: 0.25,
                },
                BladeStation {
                    radius: 20.0,
                    chord: 1.0,
                    twist_deg: 0.0,
                    thickness_ratio: 0.18,
                    pitch_axis: 0.25,
                },
            ],
            panels_per_blade: 8,
            rpm: 12.0,
            hub_height: 50.0,
            overhang: 0.0,
            shaft_tilt_deg: 0.0,
            cone_deg: 0.0,
            yaw_deg: 0.0,
            collective_pitch_deg: 0.0,
            reversed_rotation: false,
            rampup_steps: 0,
        }
    }

    #[test]
    fn test_panel_layout() {
        let rotor = RigidRotor::new(&test_rotor_config());
        let panels = rotor.build_panels();
        assert_eq!(panels.len(), 24);
        for blade in 0..3 {
            let blade_panels: Vec<_> =
                panels.iter().filter(|p| p.from_blade == blade).collect();
            assert_eq!(blade_panels.len(), 8);
            assert!(blade_panels[0].is_hub);
            assert!(blade_panels[7].is_tip);
            // Span fractions strictly increase along the blade.
            for pair in blade_panels.windows(2) {
                assert!(pair[0].relative_length_b <= pair[1].relative_length_a + 1e-12);
                assert!(pair[0].relative_length_a < pair[0].relative_length_b);
            }
        }
    }

    #[test]
    fn test_tip_station_at_tip_radius() {
        let cfg = test_rotor_config();
        let rotor = RigidRotor::new(&cfg);
        let te = rotor.trailing_edge_position(0, 8, 0.0);
        let hub = Vec3::new(0.0, 0.0, 50.0);
        let radial = te - hub;
        // The trailing edge sits a chord-scale distance off the span axis.
        assert!((radial.norm() - 20.0).abs() < 1.0, "tip radius {}", radial.norm());
        assert!(radial.z > 19.0, "blade 0 points up at zero azimuth");
    }

    #[test]
    fn test_azimuth_rotates_blade() {
        let cfg = test_rotor_config();
        let rotor = RigidRotor::new(&cfg);
        let up = rotor.trailing_edge_position(0, 8, 0.0);
        let down = rotor.trailing_edge_position(0, 8, 180.0);
        let hub = Vec3::new(0.0, 0.0, 50.0);
        assert!((up - hub).z > 0.0);
        assert!((down - hub).z < 0.0);
        // Blades are evenly phased: blade 1 at 0° equals blade 0 at 120°.
        let b1 = rotor.trailing_edge_position(1, 8, 0.0);
        let b0_at_120 = rotor.trailing_edge_position(0, 8, 120.0);
        assert!((b1 - b0_at_120).norm() < 1e-9);
    }

    #[test]
    fn test_rotation_velocity_magnitude() {
        let cfg = test_rotor_config();
        let rotor = RigidRotor::new(&cfg);
        let mut panels = rotor.build_panels();
        let dt = 1e-3;
        let omega = 1.0; // deg per step below
        rotor.update_geometry(&mut panels, 0.0, 0.0, 0.0);
        for panel in panels.iter_mut() {
            panel.reset_motion_state();
        }
        rotor.update_geometry(&mut panels, dt, omega * dt * 360.0, dt);

        // Outer panel control point moves tangentially at about ω r.
        let tip_panel = &panels[7];
        let expected = 2.0 * std::f64::consts::PI * omega * tip_panel.radius;
        let measured = tip_panel.v_relative.norm();
        assert!(
            (measured - expected).abs() / expected < 0.05,
            "tip speed {measured} vs {expected}"
        );
    }

    #[test]
    fn test_yaw_turns_shaft_axis() {
        let mut cfg = test_rotor_config();
        cfg.yaw_deg = 30.0;
        let rotor = RigidRotor::new(&cfg);
        let frame = rotor.hub_frame(0.0);
        assert!((frame.x.x - 30.0_f64.to_radians().cos()).abs() < 1e-12);
        assert!((frame.x.y - 30.0_f64.to_radians().sin()).abs() < 1e-12);
    }

    #[test]
    fn test_pitch_rotates_chord() {
        let cfg = test_rotor_config();
        let mut rotor = RigidRotor::new(&cfg);
        let mut panels = rotor.build_panels();
        rotor.update_geometry(&mut panels, 0.0, 0.0, 0.0);
        let alpha_before = panels[7].angle_of_attack_deg(Vec3::new(10.0, 0.0, 0.0));
        rotor.set_pitch(0, 5.0);
        rotor.update_geometry(&mut panels, 0.0, 0.0, 0.0);
        let alpha_after = panels[7].angle_of_attack_deg(Vec3::new(10.0, 0.0, 0.0));
        assert!(
            (alpha_before - alpha_after - 5.0).abs() < 1e-9,
            "pitching up feathers the section: {alpha_before} -> {alpha_after}"
        );
    }
}
