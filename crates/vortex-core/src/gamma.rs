// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Gamma Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The bound-circulation fixed-point iteration.
//!
//! One iteration is a pure step: velocity assembly over the frozen wake
//! plus the current bound circulation, polar lookup, circulation update
//! under relaxation, convergence check. The outer loop is a plain
//! `while not converged && iter < max` over that step. Non-convergence is
//! recorded, never fatal; a NaN from the polar provider is fatal.

use crate::panel::VortexPanel;
use crate::polar::{himmelskamp_correction, PolarProvider, PolarQuery};
use crate::velocity::{assemble_panel_velocities, VelocityEnvironment};
use rayon::prelude::*;
use vortex_types::config::GammaSolverConfig;
use vortex_types::error::{VortexError, VortexResult};
use vortex_types::state::PanelId;
use vortex_wake::FilamentSegment;

/// Residual denominator floor: freshly started rotors iterate from zero.
const RESIDUAL_FLOOR: f64 = 1e-3;

/// One pass of the fixed-point iteration.
#[derive(Debug, Clone, Copy)]
pub struct GammaIterationRecord {
    pub iteration: usize,
    pub max_residual: f64,
    pub all_converged: bool,
}

/// Result of one converged (or abandoned) solve.
#[derive(Debug, Clone)]
pub struct GammaOutcome {
    pub iterations: usize,
    pub converged: bool,
    pub unconverged: Vec<PanelId>,
}

/// Inputs that stay fixed across the iteration.
pub struct GammaSolveContext<'a> {
    pub env: VelocityEnvironment<'a>,
    pub polar: &'a dyn PolarProvider,
    pub cfg: &'a GammaSolverConfig,
    pub tip_speed_ratio: Option<f64>,
    pub reversed_rotation: bool,
}

fn bound_segments(panels: &[VortexPanel]) -> Vec<FilamentSegment> {
    if panels.is_empty() {
        return Vec::new();
    }
    panels
        .iter()
        .map(|p| p.bound_segment(p.gamma_last_iteration))
        .collect()
}

/// One iteration over the panels whose `active` slot is set. Returns the
/// worst relative circulation residual seen.
pub fn gamma_iteration_step(
    panels: &mut [VortexPanel],
    active: &[bool],
    ctx: &GammaSolveContext,
    iteration: usize,
) -> VortexResult<GammaIterationRecord> {
    // In polar-grid BEM mode the induction term comes from the grid, not
    // from bound vortices.
    let bound = if ctx.env.bem.is_some() {
        Vec::new()
    } else {
        bound_segments(panels)
    };
    assemble_panel_velocities(panels, &bound, &ctx.env)?;

    let timestep = ctx.env.timestep;
    let sign = if ctx.reversed_rotation { -1.0 } else { 1.0 };
    let relax = ctx.cfg.relaxation_factor;
    let epsilon = ctx.cfg.epsilon;
    let himmelskamp = ctx.cfg.himmelskamp;
    let polar = ctx.polar;
    let tsr = ctx.tip_speed_ratio;

    let residuals: Vec<f64> = panels
        .par_iter_mut()
        .zip(active.par_iter())
        .map(|(panel, &is_active)| {
            if !is_active {
                return Ok(0.0);
            }
            let query = PolarQuery {
                blade: panel.from_blade,
                station: panel.from_station,
                span_fraction: 0.5 * (panel.relative_length_a + panel.relative_length_b),
                alpha_deg: panel.alpha_deg,
                reynolds: panel.reynolds,
                tip_speed_ratio: tsr,
                flap_state: None,
            };
            let mut coeffs = polar.coefficients(&query);
            if !coeffs.is_finite() {
                return Err(VortexError::PolarNan {
                    timestep,
                    blade: panel.from_blade,
                    station: panel.from_station,
                });
            }
            if himmelskamp && !panel.is_strut {
                coeffs.cl =
                    himmelskamp_correction(&coeffs, panel.chord, panel.radius, panel.alpha_deg);
            }
            panel.coeffs = coeffs;
            panel.cl = coeffs.cl;
            panel.cd = coeffs.cd;
            panel.cm = coeffs.cm;

            let gamma_computed =
                sign * 0.5 * coeffs.cl * panel.chord * panel.v_in_plane.norm();
            let delta = gamma_computed - panel.gamma_last_iteration;
            let residual = delta.abs() / panel.gamma_last_iteration.abs().max(RESIDUAL_FLOOR);
            panel.gamma_last_iteration += relax * delta;
            panel.converged = residual < epsilon;
            Ok(residual)
        })
        .collect::<VortexResult<Vec<f64>>>()?;

    let max_residual = residuals.iter().copied().fold(0.0_f64, f64::max);
    let all_converged = panels
        .iter()
        .zip(active)
        .filter(|(_, &a)| a)
        .all(|(p, _)| p.converged);
    Ok(GammaIterationRecord {
        iteration,
        max_residual,
        all_converged,
    })
}

/// Run the fixed-point loop to convergence or `max_iterations`.
///
/// Strut panels join the main loop, run in a nested sub-loop afterwards,
/// or are pinned at zero circulation, per configuration.
pub fn solve_gamma(
    panels: &mut [VortexPanel],
    ctx: &GammaSolveContext,
) -> VortexResult<GammaOutcome> {
    // Seed from the previous wake step.
    for panel in panels.iter_mut() {
        panel.gamma_last_iteration = panel.gamma;
        panel.converged = false;
    }

    let strut_in_main = ctx.cfg.strut_lift && !ctx.cfg.strut_inner_iteration;
    let main_active: Vec<bool> = panels
        .iter()
        .map(|p| !p.is_strut || strut_in_main)
        .collect();

    if !ctx.cfg.strut_lift {
        for panel in panels.iter_mut().filter(|p| p.is_strut) {
            panel.gamma_last_iteration = 0.0;
            panel.converged = true;
        }
    }

    let mut iterations = 0;
    for it in 1..=ctx.cfg.max_iterations {
        iterations = it;
        let record = gamma_iteration_step(panels, &main_active, ctx, it)?;
        if record.all_converged {
            break;
        }
    }

    // Optional nested strut sub-loop against the frozen blade circulation.
    if ctx.cfg.strut_lift && ctx.cfg.strut_inner_iteration {
        let strut_active: Vec<bool> = panels.iter().map(|p| p.is_strut).collect();
        if strut_active.iter().any(|&a| a) {
            for it in 1..=ctx.cfg.max_iterations {
                let record = gamma_iteration_step(panels, &strut_active, ctx, it)?;
                if record.all_converged {
                    break;
                }
            }
        }
    }

    for panel in panels.iter_mut() {
        panel.gamma = panel.gamma_last_iteration;
    }

    let unconverged: Vec<PanelId> = panels
        .iter()
        .filter(|p| !p.converged)
        .map(|p| PanelId {
            blade: p.from_blade,
            station: p.from_station,
        })
        .collect();
    Ok(GammaOutcome {
        iterations,
        converged: unconverged.is_empty(),
        unconverged,
    })
}
