// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Maintenance
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Wake truncation, coarsening, particle conversion and cleanup.
//!
//! Circulation is conserved across coarsening: a removed shed filament
//! redistributes its circulation onto its temporal neighbours, a removed
//! trailing filament is merged into its downstream neighbour. The cleanup
//! pass is a mark-and-sweep over the arenas and runs after every
//! structural mutation of the wake.

use crate::filament::LineHandle;
use crate::particle::WakeParticle;
use crate::wake::Wake;
use vortex_math::Vec3;
use vortex_types::config::WakeConfig;
use vortex_types::constants::{CONVERSION_CORE_FACTOR, SQUIRE_ALPHA};

/// Where the rotor currently is, for age- and distance-based policies.
#[derive(Debug, Clone, Copy)]
pub struct WakeAgeFrame {
    pub timestep: usize,
    pub revolution: f64,
    pub hub_position: Vec3,
    pub rotor_diameter: f64,
}

fn element_age(cfg: &WakeConfig, frame: &WakeAgeFrame, from_timestep: usize, from_revolution: f64) -> f64 {
    if cfg.count_in_revolutions {
        frame.revolution - from_revolution
    } else {
        frame.timestep.saturating_sub(from_timestep) as f64
    }
}

/// Disconnect aged and weak filaments, delete far elements, then enforce
/// the hard element cap oldest-first.
pub fn truncate_wake(wake: &mut Wake, cfg: &WakeConfig, frame: &WakeAgeFrame) {
    let max_age = cfg.total_wake_length();
    let gamma_floor = wake.max_gamma * cfg.min_gamma_factor;

    for handle in wake.filaments.handles() {
        let (from_timestep, from_revolution, gamma) = match wake.filaments.get(handle) {
            Some(f) => (f.from_timestep, f.from_revolution, f.gamma),
            None => continue,
        };
        if wake.is_protected_step(from_timestep) {
            continue;
        }
        let age = element_age(cfg, frame, from_timestep, from_revolution);
        if age > max_age || (wake.max_gamma > 0.0 && gamma.abs() < gamma_floor) {
            wake.disconnect_filament(handle);
        }
    }

    let max_distance = cfg.max_wake_distance * frame.rotor_diameter;
    if max_distance > 0.0 {
        for handle in wake.nodes.handles() {
            let too_far = match wake.nodes.get(handle) {
                Some(n) if !n.is_bound && !wake.is_protected_step(n.from_timestep) => {
                    n.position.distance(frame.hub_position) > max_distance
                }
                _ => false,
            };
            if too_far {
                wake.delete_node(handle);
            }
        }
        for handle in wake.particles.handles() {
            let too_far = match wake.particles.get(handle) {
                Some(p) => p.position.distance(frame.hub_position) > max_distance,
                None => false,
            };
            if too_far {
                wake.remove_particle(handle);
            }
        }
    }

    // Hard cap: evict oldest filaments/particles first.
    let total = wake.counts().total();
    if total > cfg.max_elements {
        let mut candidates: Vec<(usize, Option<LineHandle>, Option<crate::ParticleHandle>)> =
            Vec::new();
        for (h, f) in wake.filaments.iter() {
            if !wake.is_protected_step(f.from_timestep) {
                candidates.push((f.from_timestep, Some(h), None));
            }
        }
        for (h, p) in wake.particles.iter() {
            candidates.push((p.from_timestep, None, Some(h)));
        }
        candidates.sort_by_key(|c| c.0);
        let mut overshoot = total - cfg.max_elements;
        for (_, line, particle) in candidates {
            if overshoot == 0 {
                break;
            }
            if let Some(h) = line {
                wake.disconnect_filament(h);
                overshoot -= 1;
            } else if let Some(h) = particle {
                wake.remove_particle(h);
                overshoot -= 1;
            }
        }
    }

    cleanup(wake);
}

/// Three-zone coarsening: beyond each zone boundary keep only every Nth
/// wake row, N the cumulative zone factor. Removed shed circulation is
/// redistributed onto the temporal neighbours in proportion to temporal
/// distance; removed trailing filaments merge into the downstream
/// neighbour.
pub fn reduce_wake(wake: &mut Wake, cfg: &WakeConfig, frame: &WakeAgeFrame) {
    let b1 = cfg.near_wake_length;
    let b2 = b1 + cfg.zone1_length;
    let b3 = b2 + cfg.zone2_length;
    let n1 = cfg.zone1_factor;
    let n2 = n1 * cfg.zone2_factor;
    let n3 = n2 * cfg.zone3_factor;
    let nth = cfg.nth_wake_step.max(1);

    for handle in wake.filaments.handles() {
        let Some(f) = wake.filaments.get(handle) else {
            continue;
        };
        if wake.is_protected_step(f.from_timestep) {
            continue;
        }
        let age = element_age(cfg, frame, f.from_timestep, f.from_revolution);
        let factor = if age > b3 {
            n3
        } else if age > b2 {
            n2
        } else if age > b1 {
            n1
        } else {
            continue;
        };
        let row = f.from_timestep / nth;
        if row % factor == 0 {
            continue;
        }
        if f.is_shed {
            remove_shed_conservative(wake, handle);
        } else if f.is_trailing {
            merge_trailing_downstream(wake, handle);
        }
    }

    cleanup(wake);
}

/// Redistribute a shed filament's circulation onto its temporal
/// neighbours, weighted toward the closer one, then disconnect it.
/// Without any live neighbour the filament is kept: dropping it would
/// lose circulation.
fn remove_shed_conservative(wake: &mut Wake, handle: LineHandle) {
    let (gamma, step, up, down) = match wake.filaments.get(handle) {
        Some(f) => (f.gamma, f.from_timestep, f.shed_upstream, f.shed_downstream),
        None => return,
    };
    let up = up.filter(|h| wake.filaments.contains(*h));
    let down = down.filter(|h| wake.filaments.contains(*h));
    match (up, down) {
        (Some(up), Some(down)) => {
            let t_up = wake.filaments.get(up).map(|f| f.from_timestep).unwrap_or(step);
            let t_down = wake.filaments.get(down).map(|f| f.from_timestep).unwrap_or(step);
            let d_up = step.abs_diff(t_up).max(1) as f64;
            let d_down = step.abs_diff(t_down).max(1) as f64;
            let w_up = d_down / (d_up + d_down);
            let w_down = d_up / (d_up + d_down);
            if let Some(f) = wake.filaments.get_mut(up) {
                f.gamma += gamma * w_up;
            }
            if let Some(f) = wake.filaments.get_mut(down) {
                f.gamma += gamma * w_down;
            }
        }
        (Some(only), None) | (None, Some(only)) => {
            if let Some(f) = wake.filaments.get_mut(only) {
                f.gamma += gamma;
            }
        }
        (None, None) => return,
    }
    wake.disconnect_filament(handle);
}

/// Merge a trailing filament into its downstream (older) neighbour: the
/// neighbour's leading endpoint is relocated onto the removed filament's
/// leading node and circulation/stretch/core are averaged.
fn merge_trailing_downstream(wake: &mut Wake, handle: LineHandle) {
    let (leading, trailing, gamma, stretch, core) = match wake.filaments.get(handle) {
        Some(f) => (
            f.leading,
            f.trailing,
            f.gamma,
            f.stretch_factor,
            f.core_size_sqr,
        ),
        None => return,
    };
    // The downstream neighbour shares the removed filament's trailing node.
    let downstream = wake
        .nodes
        .get(trailing)
        .and_then(|node| {
            node.attached.iter().copied().find(|&h| {
                h != handle
                    && wake
                        .filaments
                        .get(h)
                        .map(|f| f.is_trailing && f.leading == trailing)
                        .unwrap_or(false)
            })
        });
    let Some(downstream) = downstream else {
        return;
    };

    wake.disconnect_filament(handle);
    if let Some(node) = wake.nodes.get_mut(trailing) {
        node.detach(downstream);
    }
    if let Some(f) = wake.filaments.get_mut(downstream) {
        f.leading = leading;
        f.gamma = 0.5 * (f.gamma + gamma);
        f.stretch_factor = 0.5 * (f.stretch_factor + stretch);
        f.core_size_sqr = 0.5 * (f.core_size_sqr + core);
    }
    if let Some(node) = wake.nodes.get_mut(leading) {
        node.attached.push(downstream);
    }
}

/// Convert filaments older than the conversion length into particles.
/// Zero-circulation filaments are simply dropped.
pub fn convert_lines_to_particles(wake: &mut Wake, cfg: &WakeConfig, frame: &WakeAgeFrame) {
    for handle in wake.filaments.handles() {
        let Some(f) = wake.filaments.get(handle) else {
            continue;
        };
        if wake.is_protected_step(f.from_timestep) {
            continue;
        }
        let age = element_age(cfg, frame, f.from_timestep, f.from_revolution);
        if age <= cfg.wake_conversion_length {
            continue;
        }
        let (Some(leading), Some(trailing)) =
            (wake.nodes.get(f.leading), wake.nodes.get(f.trailing))
        else {
            wake.disconnect_filament(handle);
            continue;
        };
        if f.gamma.abs() < 1e-12 {
            wake.disconnect_filament(handle);
            continue;
        }
        let span = trailing.position - leading.position;
        let length = span.norm();
        if length < 1e-12 {
            wake.disconnect_filament(handle);
            continue;
        }
        let midpoint = (leading.position + trailing.position) * 0.5;
        let alpha = span * f.gamma;
        let mut particle = WakeParticle::from_filament(
            midpoint,
            alpha,
            length * CONVERSION_CORE_FACTOR,
            f.gamma,
            length,
            f.is_trailing,
            f.from_blade,
            f.from_station,
            f.from_timestep,
            f.from_revolution,
        );
        particle.is_new = false;
        wake.particles.insert(particle);
        wake.disconnect_filament(handle);
    }

    cleanup(wake);
}

/// Grow filament cores by the strain/diffusion law and refresh stretch
/// factors. Freshly spawned filaments adopt their first nonzero length as
/// the stretch reference.
pub fn age_filament_cores(wake: &mut Wake, cfg: &WakeConfig, kinematic_viscosity: f64, dt: f64) {
    let growth = 4.0 * SQUIRE_ALPHA * cfg.turbulent_viscosity * kinematic_viscosity * dt;
    for handle in wake.filaments.handles() {
        let length = match wake.filaments.get(handle) {
            Some(f) => wake.filament_length(f).unwrap_or(0.0),
            None => continue,
        };
        if let Some(f) = wake.filaments.get_mut(handle) {
            if f.initial_length < 1e-12 {
                f.initial_length = length;
            } else if length > 1e-12 {
                f.stretch_factor = length / f.initial_length;
            }
            f.core_size_sqr = (f.core_size_sqr + growth) / f.stretch_factor.max(1e-3);
        }
    }
}

/// Mark-and-sweep: drop filaments with a missing endpoint, then reclaim
/// free nodes with no attached filament, newest two rows excepted.
pub fn cleanup(wake: &mut Wake) {
    for handle in wake.filaments.handles() {
        let dangling = match wake.filaments.get(handle) {
            Some(f) => {
                !wake.nodes.contains(f.leading) || !wake.nodes.contains(f.trailing)
            }
            None => false,
        };
        if dangling {
            wake.disconnect_filament(handle);
        }
    }
    for handle in wake.nodes.handles() {
        let orphan = match wake.nodes.get(handle) {
            Some(n) => {
                !n.is_bound && n.attached.is_empty() && !wake.is_protected_step(n.from_timestep)
            }
            None => false,
        };
        if orphan {
            wake.nodes.remove(handle);
        }
    }
}
