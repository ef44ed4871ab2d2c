// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Panel Velocity Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-panel velocity assembly: sampled freestream + wake induction +
//! tower shadow − rigid-body motion, decomposed in the panel frame into
//! angles of attack at the quarter- and three-quarter-chord points.

use crate::bem::UnsteadyBem;
use crate::induction::{line_induction, InductionField};
use crate::inflow::Inflow;
use crate::panel::VortexPanel;
use rayon::prelude::*;
use vortex_math::{Frame, Vec3};
use vortex_types::config::TowerConfig;
use vortex_types::constants::RELATIVE_VELOCITY_LIMIT;
use vortex_types::error::{VortexError, VortexResult};
use vortex_wake::FilamentSegment;

const SPEED_FLOOR: f64 = 1e-9;

/// Everything the assembly pass reads. Sources are frozen for the pass.
pub struct VelocityEnvironment<'a> {
    pub inflow: &'a dyn Inflow,
    pub wake_field: &'a InductionField,
    /// Polar-grid engineering induction instead of vortex induction.
    pub bem: Option<(&'a UnsteadyBem, Frame)>,
    pub tower: Option<&'a TowerConfig>,
    pub time: f64,
    pub kinematic_viscosity: f64,
    pub timestep: usize,
}

/// Potential-flow dipole plus drag-source velocity deficit of a
/// cylindrical tower on the z axis, applied only inside the downstream
/// shadow cone.
pub fn tower_influence(point: Vec3, tower: &TowerConfig, free_stream: Vec3) -> Vec3 {
    let horizontal = Vec3::new(free_stream.x, free_stream.y, 0.0);
    let speed = horizontal.norm();
    if speed < SPEED_FLOOR {
        return Vec3::ZERO;
    }
    let xw = horizontal / speed;
    let yw = Vec3::new(-xw.y, xw.x, 0.0);
    let px = point.x * xw.x + point.y * xw.y;
    let py = point.x * yw.x + point.y * yw.y;
    let radius = tower.radius;
    let r2 = px * px + py * py;
    if r2 < radius * radius {
        // Inside the tower: cancel the sampled flow.
        return -horizontal;
    }
    let half_width = radius + 0.3 * px;
    if px <= 0.0 || py.abs() > half_width {
        return Vec3::ZERO;
    }
    let r4 = r2 * r2;
    let du = -speed * radius * radius * (px * px - py * py) / r4;
    let dv = -2.0 * speed * radius * radius * px * py / r4;
    // Empirical drag wake deficit, strongest on the centerline.
    let shape = (std::f64::consts::FRAC_PI_2 * py / half_width).cos().powi(2);
    let deficit = tower.drag_coefficient * speed * (radius / (radius + px)).sqrt() * shape;
    xw * (du - deficit) + yw * dv
}

fn induced_velocity(point: Vec3, bound: &[FilamentSegment], env: &VelocityEnvironment) -> Vec3 {
    if let Some((bem, hub)) = &env.bem {
        return bem.induced_velocity_at_point(point, hub, env.inflow.free_stream(point, env.time));
    }
    let mut v = env.wake_field.velocity_at(point);
    for seg in bound {
        v += line_induction(point, seg.leading, seg.trailing, seg.gamma, seg.core_size_sqr);
    }
    v
}

/// Assemble the velocity decomposition and angles of attack for every
/// panel. Data-parallel over panels; sources are read-only.
pub fn assemble_panel_velocities(
    panels: &mut [VortexPanel],
    bound: &[FilamentSegment],
    env: &VelocityEnvironment,
) -> VortexResult<()> {
    panels
        .par_iter_mut()
        .map(|panel| {
            let cp = panel.control_point;
            let cp75 = panel.control_point_75;

            panel.v_sampled = env.inflow.free_stream(cp, env.time);
            panel.v_induced = induced_velocity(cp, bound, env);
            panel.v_tower = match env.tower {
                Some(tower) => tower_influence(cp, tower, panel.v_sampled),
                None => Vec3::ZERO,
            };
            panel.v_total = panel.v_sampled + panel.v_induced + panel.v_tower - panel.v_relative;

            let magnitude = panel.v_total.norm();
            if !magnitude.is_finite() || magnitude > RELATIVE_VELOCITY_LIMIT {
                return Err(VortexError::VelocityExploded {
                    timestep: env.timestep,
                    blade: panel.from_blade,
                    station: panel.from_station,
                    magnitude,
                });
            }

            panel.v_in_plane = panel.in_plane(panel.v_total);
            panel.alpha_deg = panel.angle_of_attack_deg(panel.v_total);
            panel.alpha_geometric_deg = panel.angle_of_attack_deg(panel.v_sampled - panel.v_relative);

            let v75 = env.inflow.free_stream(cp75, env.time) + induced_velocity(cp75, bound, env)
                + panel.v_tower
                - panel.v_relative;
            panel.alpha75_deg = panel.angle_of_attack_deg(v75);

            panel.reynolds = panel.chord * panel.v_in_plane.norm() / env.kinematic_viscosity;
            Ok(())
        })
        .collect::<VortexResult<Vec<()>>>()?;
    Ok(())
}
