// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Convection
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Wake advancement: predictor-corrector convection of free nodes and
//! particles, particle vorticity evolution, partial emission of fresh
//! rows, and the divergence sanity check that aborts the run.

use crate::induction::{BatchedInduction, InductionField};
use crate::inflow::Inflow;
use vortex_math::Vec3;
use vortex_types::config::WakeIntegrationScheme;
use vortex_types::constants::WAKE_POSITION_LIMIT;
use vortex_types::error::{VortexError, VortexResult};
use vortex_wake::{NodeHandle, ParticleHandle, ParticleSource, Wake};

/// Read-only inputs of one convection step. `dt` is the wake substep,
/// outer dt times the wake-step stride.
pub struct ConvectionContext<'a> {
    pub field: &'a InductionField,
    pub inflow: &'a dyn Inflow,
    pub time: f64,
    pub dt: f64,
    pub scheme: WakeIntegrationScheme,
    pub first_wake_row_length: f64,
    /// Particle-strength-exchange viscosity, when diffusion is enabled.
    pub exchange_viscosity: Option<f64>,
    pub timestep: usize,
}

fn mobile_nodes(wake: &Wake) -> Vec<NodeHandle> {
    wake.nodes
        .iter()
        .filter(|(_, n)| !n.is_bound)
        .map(|(h, _)| h)
        .collect()
}

fn particle_handles(wake: &Wake) -> Vec<ParticleHandle> {
    wake.particles.iter().map(|(h, _)| h).collect()
}

/// Snapshot current rates as the previous-step rates and freeze the
/// initial state the corrector integrates from.
pub fn store_rates_of_change(wake: &mut Wake) {
    for handle in mobile_nodes(wake) {
        if let Some(node) = wake.nodes.get_mut(handle) {
            node.rate_prev = node.rate;
            node.initial_position = node.position;
            node.push_history();
        }
    }
    for handle in particle_handles(wake) {
        if let Some(p) = wake.particles.get_mut(handle) {
            p.rate_prev = p.rate;
            p.alpha_rate_prev = p.alpha_rate;
            p.initial_position = p.position;
            p.initial_alpha = p.alpha;
        }
    }
}

fn rates_at<'b>(
    positions: &[Vec3],
    ctx: &ConvectionContext,
    backend: Option<&mut (dyn BatchedInduction + 'b)>,
) -> VortexResult<Vec<Vec3>> {
    let induced = ctx.field.velocities_at_device(positions, backend)?;
    Ok(positions
        .iter()
        .zip(induced)
        .map(|(&p, v)| v + ctx.inflow.free_stream(p, ctx.time))
        .collect())
}

/// Predictor: rates of change over the current wake geometry.
pub fn calculate_wake_rates_of_change<'b>(
    wake: &mut Wake,
    ctx: &ConvectionContext,
    mut backend: Option<&mut (dyn BatchedInduction + 'b)>,
) -> VortexResult<()> {
    let nodes = mobile_nodes(wake);
    let positions: Vec<Vec3> = nodes
        .iter()
        .filter_map(|&h| wake.nodes.get(h).map(|n| n.position))
        .collect();
    let rates = rates_at(&positions, ctx, backend.as_deref_mut())?;
    for (&handle, rate) in nodes.iter().zip(rates) {
        if let Some(node) = wake.nodes.get_mut(handle) {
            node.rate = rate;
        }
    }

    let particles = particle_handles(wake);
    let receivers: Vec<ParticleSource> = particles
        .iter()
        .filter_map(|&h| {
            wake.particles.get(h).map(|p| ParticleSource {
                position: p.position,
                alpha: p.alpha,
                core_size: p.core_size,
                volume: p.volume,
            })
        })
        .collect();
    let positions: Vec<Vec3> = receivers.iter().map(|r| r.position).collect();
    let rates = rates_at(&positions, ctx, backend.as_deref_mut())?;
    let alpha_rates = ctx
        .field
        .particle_alpha_rates(&receivers, ctx.exchange_viscosity);
    for ((&handle, rate), alpha_rate) in particles.iter().zip(rates).zip(alpha_rates) {
        if let Some(p) = wake.particles.get_mut(handle) {
            p.rate = rate;
            p.alpha_rate = alpha_rate;
        }
    }
    Ok(())
}

/// Corrector: re-evaluate rates at the predicted state and average with
/// the predictor rates (trapezoidal refinement).
pub fn perform_wake_correction_step<'b>(
    wake: &mut Wake,
    ctx: &ConvectionContext,
    mut backend: Option<&mut (dyn BatchedInduction + 'b)>,
) -> VortexResult<()> {
    let dt = ctx.dt;

    let nodes = mobile_nodes(wake);
    let predicted: Vec<Vec3> = nodes
        .iter()
        .filter_map(|&h| {
            wake.nodes
                .get(h)
                .map(|n| n.initial_position + n.rate * dt)
        })
        .collect();
    let corrected = rates_at(&predicted, ctx, backend.as_deref_mut())?;
    for (&handle, rate2) in nodes.iter().zip(corrected) {
        if let Some(node) = wake.nodes.get_mut(handle) {
            node.rate = (node.rate + rate2) * 0.5;
        }
    }

    let particles = particle_handles(wake);
    let predicted_receivers: Vec<ParticleSource> = particles
        .iter()
        .filter_map(|&h| {
            wake.particles.get(h).map(|p| ParticleSource {
                position: p.initial_position + p.rate * dt,
                alpha: p.initial_alpha + p.alpha_rate * dt,
                core_size: p.core_size,
                volume: p.volume,
            })
        })
        .collect();
    let positions: Vec<Vec3> = predicted_receivers.iter().map(|r| r.position).collect();
    let corrected = rates_at(&positions, ctx, backend.as_deref_mut())?;
    let corrected_alpha = ctx
        .field
        .particle_alpha_rates(&predicted_receivers, ctx.exchange_viscosity);
    for ((&handle, rate2), alpha2) in particles.iter().zip(corrected).zip(corrected_alpha) {
        if let Some(p) = wake.particles.get_mut(handle) {
            p.rate = (p.rate + rate2) * 0.5;
            p.alpha_rate = (p.alpha_rate + alpha2) * 0.5;
        }
    }
    Ok(())
}

/// Final advance over the averaged rates, partial emission of new rows,
/// and the divergence sanity check. A position that leaves the sane
/// range aborts the run; the wake cannot recover from it.
pub fn calculate_new_wake_state(wake: &mut Wake, ctx: &ConvectionContext) -> VortexResult<()> {
    let dt = ctx.dt;

    for handle in mobile_nodes(wake) {
        let Some(node) = wake.nodes.get_mut(handle) else {
            continue;
        };
        let trapezoidal = node.initial_position + node.rate * dt;
        let mut position = match ctx.scheme {
            WakeIntegrationScheme::PredictorCorrector => trapezoidal,
            WakeIntegrationScheme::Pc2b => {
                if node.history_len >= 3 {
                    // Three-step backward correction over the position
                    // history, driven by the averaged rate.
                    (node.history[0] * 18.0 - node.history[1] * 9.0 + node.history[2] * 2.0)
                        / 11.0
                        + node.rate * (6.0 / 11.0 * dt)
                } else {
                    trapezoidal
                }
            }
        };
        if node.is_new {
            position = node.initial_position
                + (position - node.initial_position) * ctx.first_wake_row_length;
        }
        if !position.is_finite() || position.norm() > WAKE_POSITION_LIMIT {
            return Err(VortexError::WakeDiverged {
                timestep: ctx.timestep,
                message: format!(
                    "wake node (blade {}, station {}, spawned at step {}) reached {:?}",
                    node.from_blade, node.from_station, node.from_timestep, position
                ),
            });
        }
        node.position = position;
    }

    for handle in particle_handles(wake) {
        let Some(p) = wake.particles.get_mut(handle) else {
            continue;
        };
        let mut position = p.initial_position + p.rate * dt;
        let alpha = p.initial_alpha + p.alpha_rate * dt;
        if p.is_new {
            position = p.initial_position
                + (position - p.initial_position) * ctx.first_wake_row_length;
            p.is_new = false;
        }
        if !position.is_finite() || position.norm() > WAKE_POSITION_LIMIT || !alpha.is_finite() {
            return Err(VortexError::WakeDiverged {
                timestep: ctx.timestep,
                message: format!(
                    "wake particle (station {}, spawned at step {}) reached {:?}",
                    p.from_station, p.from_timestep, position
                ),
            });
        }
        p.position = position;
        p.alpha = alpha;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflow::UniformInflow;
    use vortex_types::config::ParticleKernel;
    use vortex_wake::{WakeNode, WakeParticle};

    fn empty_field() -> InductionField {
        InductionField::new(ParticleKernel::HighOrderAlgebraic, false)
    }

    fn context<'a>(
        field: &'a InductionField,
        inflow: &'a dyn Inflow,
        dt: f64,
    ) -> ConvectionContext<'a> {
        ConvectionContext {
            field,
            inflow,
            time: 0.0,
            dt,
            scheme: WakeIntegrationScheme::PredictorCorrector,
            first_wake_row_length: 1.0,
            exchange_viscosity: None,
            timestep: 0,
        }
    }

    fn step(wake: &mut Wake, ctx: &ConvectionContext) -> VortexResult<()> {
        store_rates_of_change(wake);
        calculate_wake_rates_of_change(wake, ctx, None)?;
        perform_wake_correction_step(wake, ctx, None)?;
        calculate_new_wake_state(wake, ctx)
    }

    #[test]
    fn test_uniform_convection_is_exact() {
        let mut wake = Wake::new();
        let mut node = WakeNode::free(Vec3::new(1.0, 2.0, 3.0), 0, None, 0, 0, 0.0);
        node.is_new = false;
        let handle = wake.nodes.insert(node);

        let field = empty_field();
        let inflow = UniformInflow::axial(10.0);
        let ctx = context(&field, &inflow, 0.1);
        step(&mut wake, &ctx).unwrap();

        let moved = wake.nodes.get(handle).unwrap().position;
        assert!((moved - Vec3::new(2.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_bound_nodes_do_not_convect() {
        let mut wake = Wake::new();
        let bound = wake.register_bound_node(Vec3::new(0.0, 0.0, 0.0), 0, None, 0);
        let field = empty_field();
        let inflow = UniformInflow::axial(10.0);
        let ctx = context(&field, &inflow, 0.1);
        step(&mut wake, &ctx).unwrap();
        assert_eq!(wake.nodes.get(bound).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_new_row_partial_emission() {
        let mut wake = Wake::new();
        let handle = wake
            .nodes
            .insert(WakeNode::free(Vec3::ZERO, 0, None, 0, 0, 0.0));
        assert!(wake.nodes.get(handle).unwrap().is_new);

        let field = empty_field();
        let inflow = UniformInflow::axial(10.0);
        let mut ctx = context(&field, &inflow, 0.1);
        ctx.first_wake_row_length = 0.3;
        step(&mut wake, &ctx).unwrap();

        let moved = wake.nodes.get(handle).unwrap().position;
        assert!(
            (moved - Vec3::new(0.3, 0.0, 0.0)).norm() < 1e-12,
            "partial emission: {moved:?}"
        );
    }

    /// Linear shear: u = (1 + z, 0, 0). The trapezoidal corrector must
    /// land exactly on the two-point average, which Euler misses.
    struct ShearInflow;
    impl Inflow for ShearInflow {
        fn free_stream(&self, point: Vec3, _time: f64) -> Vec3 {
            Vec3::new(1.0 + point.z, 0.0, 0.0)
        }
    }

    #[test]
    fn test_corrector_averages_predictor_and_corrected_rates() {
        let mut wake = Wake::new();
        let mut node = WakeNode::free(Vec3::new(0.0, 0.0, 1.0), 0, None, 0, 0, 0.0);
        node.is_new = false;
        let handle = wake.nodes.insert(node);

        let field = empty_field();
        let inflow = ShearInflow;
        let ctx = context(&field, &inflow, 0.5);
        step(&mut wake, &ctx).unwrap();

        // Shear depends on z only and the motion is horizontal, so both
        // evaluations see u = 2 and the step is exact.
        let moved = wake.nodes.get(handle).unwrap().position;
        assert!((moved - Vec3::new(1.0, 0.0, 1.0)).norm() < 1e-12);

        // A particle with vertical motion samples two different rates.
        let mut wake2 = Wake::new();
        let mut particle = WakeParticle::from_filament(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1e-12),
            0.1,
            1e-12,
            1.0,
            true,
            0,
            0,
            0,
            0.0,
        );
        particle.is_new = false;
        let ph = wake2.particles.insert(particle);

        struct VerticalShear;
        impl Inflow for VerticalShear {
            fn free_stream(&self, point: Vec3, _time: f64) -> Vec3 {
                Vec3::new(0.0, 0.0, 1.0 + point.z)
            }
        }
        let ctx2 = ConvectionContext {
            inflow: &VerticalShear,
            ..context(&field, &inflow, 0.5)
        };
        step(&mut wake2, &ctx2).unwrap();
        // Predictor rate at z=0 is 1; predicted z=0.5 gives rate 1.5;
        // average 1.25 over dt=0.5 => z = 0.625.
        let z = wake2.particles.get(ph).unwrap().position.z;
        assert!((z - 0.625).abs() < 1e-12, "trapezoidal z {z}");
    }

    #[test]
    fn test_divergence_aborts_with_identity() {
        let mut wake = Wake::new();
        let mut node = WakeNode::free(Vec3::new(9.9e4, 0.0, 0.0), 1, None, 4, 11, 0.0);
        node.is_new = false;
        wake.nodes.insert(node);

        let field = empty_field();
        let inflow = UniformInflow::axial(2.0e3);
        let mut ctx = context(&field, &inflow, 1.0);
        ctx.timestep = 42;
        let err = step(&mut wake, &ctx).unwrap_err();
        match err {
            VortexError::WakeDiverged { timestep, message } => {
                assert_eq!(timestep, 42);
                assert!(message.contains("blade 1"), "{message}");
                assert!(message.contains("station 4"), "{message}");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_particle_alpha_constant_without_sources() {
        let mut wake = Wake::new();
        let mut particle = WakeParticle::from_filament(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 2.0),
            0.1,
            2.0,
            1.0,
            true,
            0,
            0,
            0,
            0.0,
        );
        particle.is_new = false;
        let handle = wake.particles.insert(particle);

        let field = empty_field();
        let inflow = UniformInflow::axial(5.0);
        let ctx = context(&field, &inflow, 0.2);
        step(&mut wake, &ctx).unwrap();

        let p = wake.particles.get(handle).unwrap();
        assert!((p.alpha - Vec3::new(0.0, 0.0, 2.0)).norm() < 1e-12);
        assert!((p.position - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }
}
