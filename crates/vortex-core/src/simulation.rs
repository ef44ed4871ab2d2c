// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Simulation Orchestrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The per-timestep driver: controller exchange → geometry update → wake
//! spawn → Gamma fixed point → dynamic stall → loads → circulation
//! assignment → snapshot → convection → wake maintenance. One instance
//! exclusively owns one rotor's wake; neighbouring rotors are read as
//! immutable field snapshots only.

use crate::bem::UnsteadyBem;
use crate::controller::{Controller, ControllerSensors};
use crate::convect::{
    calculate_new_wake_state, calculate_wake_rates_of_change, perform_wake_correction_step,
    store_rates_of_change, ConvectionContext,
};
use crate::dynstall::{dynamic_stall_correction, DynStallState, UnsteadySample};
use crate::gamma::{solve_gamma, GammaSolveContext};
use crate::induction::{BatchedInduction, InductionField};
use crate::inflow::Inflow;
use crate::loads::update_panel_loads;
use crate::panel::VortexPanel;
use crate::polar::{PolarProvider, PolarQuery};
use crate::rotor::{RigidRotor, StructuralProvider};
use crate::velocity::VelocityEnvironment;
use std::f64::consts::PI;
use vortex_math::{Frame, Vec3};
use vortex_types::config::{ExecutionDevice, InductionMode, SimulationConfig};
use vortex_types::error::{VortexError, VortexResult};
use vortex_types::state::{
    ConvergenceRecord, FilamentSnapshot, PanelId, PanelSnapshot, ParticleSnapshot,
    TimestepResult, WakeSnapshot,
};
use vortex_wake::maintain::{
    age_filament_cores, cleanup, convert_lines_to_particles, reduce_wake, truncate_wake,
    WakeAgeFrame,
};
use vortex_wake::spawn::{add_wake_elements, refresh_row_circulation, BladeSpawnFrame, SpawnStation};
use vortex_wake::{NodeHandle, Wake};

/// Read-only induction sources of another rotor, for multi-rotor wake
/// interaction. Built once per step from that rotor's state; never
/// written back.
#[derive(Debug, Clone, Default)]
pub struct WakeFieldSnapshot {
    pub filaments: Vec<vortex_wake::FilamentSegment>,
    pub particles: Vec<vortex_wake::ParticleSource>,
}

struct BoundStation {
    handle: NodeHandle,
    blade: usize,
    station: usize,
}

/// One rotor's free-vortex-wake simulation instance.
pub struct RotorSimulation {
    config: SimulationConfig,
    provider: Box<dyn StructuralProvider>,
    panels: Vec<VortexPanel>,
    wake: Wake,
    bem: Option<UnsteadyBem>,
    inflow: Box<dyn Inflow>,
    polar: Box<dyn PolarProvider>,
    controller: Option<Box<dyn Controller>>,
    accelerator: Option<Box<dyn BatchedInduction>>,
    bound_stations: Vec<BoundStation>,
    pitch_deg: Vec<f64>,
    timestep: usize,
    time: f64,
    azimuth_deg: f64,
    convergence_failures: Vec<ConvergenceRecord>,
    snapshots: Vec<WakeSnapshot>,
    abort_reason: Option<String>,
}

impl RotorSimulation {
    pub fn new(
        config: SimulationConfig,
        inflow: Box<dyn Inflow>,
        polar: Box<dyn PolarProvider>,
    ) -> VortexResult<Self> {
        config.validate()?;
        let rotor = RigidRotor::new(&config.rotor);
        let mut panels = rotor.build_panels();
        rotor.update_geometry(&mut panels, 0.0, 0.0, 0.0);
        for panel in &mut panels {
            panel.reset_motion_state();
            panel.dyn_state = DynStallState::for_model(config.dynamic_stall.model);
        }

        let mut wake = Wake::new();
        let mut bound_stations = Vec::new();
        for blade in 0..config.rotor.num_blades {
            for station in 0..=config.rotor.panels_per_blade {
                let position = rotor.trailing_edge_position(blade, station, 0.0);
                let handle = wake.register_bound_node(position, blade, None, station);
                bound_stations.push(BoundStation {
                    handle,
                    blade,
                    station,
                });
            }
        }

        let bem = (config.solver.mode == InductionMode::UnsteadyBem)
            .then(|| UnsteadyBem::new(&config.rotor, &config.solver.bem));
        let pitch_deg = vec![config.rotor.collective_pitch_deg; config.rotor.num_blades];

        Ok(RotorSimulation {
            config,
            provider: Box::new(rotor),
            panels,
            wake,
            bem,
            inflow,
            polar,
            controller: None,
            accelerator: None,
            bound_stations,
            pitch_deg,
            timestep: 0,
            time: 0.0,
            azimuth_deg: 0.0,
            convergence_failures: Vec::new(),
            snapshots: Vec::new(),
            abort_reason: None,
        })
    }

    pub fn set_controller(&mut self, controller: Box<dyn Controller>) {
        self.controller = Some(controller);
    }

    pub fn set_accelerator(&mut self, accelerator: Box<dyn BatchedInduction>) {
        self.accelerator = Some(accelerator);
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth_deg
    }

    pub fn panels(&self) -> &[VortexPanel] {
        &self.panels
    }

    pub fn wake(&self) -> &Wake {
        &self.wake
    }

    pub fn convergence_failures(&self) -> &[ConvergenceRecord] {
        &self.convergence_failures
    }

    pub fn snapshots(&self) -> &[WakeSnapshot] {
        &self.snapshots
    }

    /// Human-readable reason once a run has aborted.
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Read-only induction sources of this rotor, bound panels included,
    /// for neighbouring rotors.
    pub fn field_snapshot(&self) -> WakeFieldSnapshot {
        let mut filaments = self.wake.filament_segments();
        filaments.extend(self.panels.iter().map(|p| p.bound_segment(p.gamma)));
        WakeFieldSnapshot {
            filaments,
            particles: self.wake.particle_sources(),
        }
    }

    pub fn advance(&mut self, dt: f64) -> VortexResult<TimestepResult> {
        self.advance_with_neighbours(dt, &[])
    }

    /// Advance one outer timestep. A fatal error (wake divergence, polar
    /// NaN, velocity explosion, controller fail flag) latches the abort
    /// reason: the timestep counter never advances again.
    pub fn advance_with_neighbours(
        &mut self,
        dt: f64,
        neighbours: &[WakeFieldSnapshot],
    ) -> VortexResult<TimestepResult> {
        if let Some(reason) = &self.abort_reason {
            return Err(VortexError::ConfigError(format!(
                "simulation aborted: {reason}"
            )));
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(VortexError::ConfigError(format!(
                "timestep must be finite and > 0, got {dt}"
            )));
        }
        match self.advance_inner(dt, neighbours) {
            Ok(result) => Ok(result),
            Err(err) => {
                if err.is_fatal_divergence() || matches!(err, VortexError::ControllerFail { .. }) {
                    self.abort_reason = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn advance_inner(
        &mut self,
        dt: f64,
        neighbours: &[WakeFieldSnapshot],
    ) -> VortexResult<TimestepResult> {
        let t = self.time + dt;
        let hub_zero = self.provider.hub_frame(0.0);

        // Controller exchange precedes the geometry update of this step.
        if let Some(controller) = self.controller.as_mut() {
            let sensors = ControllerSensors {
                time: self.time,
                azimuth_deg: self.azimuth_deg,
                rotor_speed_rad: self.config.rotor.rpm * 2.0 * PI / 60.0,
                wind_speed: self
                    .inflow
                    .free_stream(hub_zero.origin, self.time)
                    .norm(),
                pitch_deg: self.pitch_deg.clone(),
                aero_torque: aero_torque(&self.panels, &hub_zero),
            };
            let demand = controller.exchange(&sensors);
            if demand.fail {
                return Err(VortexError::ControllerFail {
                    timestep: self.timestep,
                });
            }
            for (blade, pitch) in demand
                .pitch_deg
                .iter()
                .enumerate()
                .take(self.config.rotor.num_blades)
            {
                self.provider.set_pitch(blade, *pitch);
                self.pitch_deg[blade] = *pitch;
            }
        }

        let direction = if self.config.rotor.reversed_rotation {
            -1.0
        } else {
            1.0
        };
        self.azimuth_deg += self.config.rotor.rpm * 6.0 * dt * direction;
        let azimuth = self.azimuth_deg;

        self.provider
            .update_geometry(&mut self.panels, t, azimuth, dt);
        for bs in &self.bound_stations {
            let position = self.provider.trailing_edge(bs.blade, bs.station, azimuth);
            if let Some(node) = self.wake.nodes.get_mut(bs.handle) {
                node.position = position;
            }
        }

        // The polar-grid mode carries no Lagrangian wake at all.
        let past_rampup = self.timestep >= self.config.rotor.rampup_steps;
        let wake_step = self.config.solver.mode == InductionMode::FreeVortexWake
            && past_rampup
            && (self.timestep - self.config.rotor.rampup_steps) % self.config.wake.nth_wake_step
                == 0;

        // New wake row from the previous step's circulation; refreshed
        // after the solve below.
        if wake_step {
            self.spawn_wake_rows();
        }

        // Gamma fixed point over the frozen wake.
        let wake_field = self.build_field(false, neighbours);
        let v_hub = self.inflow.free_stream(hub_zero.origin, t);
        let omega = self.config.rotor.rpm * 2.0 * PI / 60.0;
        let tip_speed_ratio = if v_hub.norm() > 1e-6 {
            Some(omega * self.config.rotor.tip_radius() / v_hub.norm())
        } else {
            None
        };
        let outcome = {
            let ctx = GammaSolveContext {
                env: VelocityEnvironment {
                    inflow: &*self.inflow,
                    wake_field: &wake_field,
                    bem: self.bem.as_ref().map(|b| (b, hub_zero)),
                    tower: self.config.tower.as_ref(),
                    time: t,
                    kinematic_viscosity: self.config.environment.kinematic_viscosity,
                    timestep: self.timestep,
                },
                polar: &*self.polar,
                cfg: &self.config.solver,
                tip_speed_ratio,
                reversed_rotation: self.config.rotor.reversed_rotation,
            };
            solve_gamma(&mut self.panels, &ctx)?
        };
        if !outcome.converged {
            self.convergence_failures.push(ConvergenceRecord {
                timestep: self.timestep,
                time: t,
                iterations: outcome.iterations,
                panels: outcome.unconverged.clone(),
            });
        }

        // Dynamic-stall correction, once per outer step.
        let polar = &*self.polar;
        let ds_cfg = &self.config.dynamic_stall;
        for panel in self.panels.iter_mut() {
            let sample = UnsteadySample {
                coeffs: panel.coeffs,
                alpha_deg: panel.alpha_deg,
                alpha_qs_deg: panel.alpha75_deg,
                alpha_old_deg: panel.alpha_deg_old,
                v_rel: panel.v_in_plane.norm(),
                chord: panel.chord,
                thickness_ratio: panel.thickness_ratio,
                dt,
                flap_state: 0.0,
                flap_state_old: 0.0,
                dcl_dflap: 0.0,
            };
            let blade = panel.from_blade;
            let station = panel.from_station;
            let span_fraction = 0.5 * (panel.relative_length_a + panel.relative_length_b);
            let reynolds = panel.reynolds;
            let lookup = move |alpha_deg: f64| {
                polar.coefficients(&PolarQuery {
                    blade,
                    station,
                    span_fraction,
                    alpha_deg,
                    reynolds,
                    tip_speed_ratio: None,
                    flap_state: None,
                })
            };
            let corrected =
                dynamic_stall_correction(ds_cfg, &mut panel.dyn_state, &sample, &lookup);
            panel.cl = corrected.cl;
            panel.cd = corrected.cd;
            panel.cm = corrected.cm;
            panel.alpha_deg_old = panel.alpha_deg;
        }

        update_panel_loads(&mut self.panels, self.config.environment.density);

        // Assign the converged circulation to this step's wake row and
        // track the largest bound circulation for truncation thresholds.
        let max_panel_gamma = self
            .panels
            .iter()
            .map(|p| p.gamma.abs())
            .fold(0.0_f64, f64::max);
        self.wake.max_gamma = self.wake.max_gamma.max(max_panel_gamma);
        if wake_step {
            self.refresh_wake_rows();
        }

        if let Some(bem) = self.bem.as_mut() {
            bem.update(
                &self.panels,
                &hub_zero,
                v_hub.norm(),
                self.config.environment.density,
                dt,
            );
        }

        if self.config.store_snapshots {
            let snapshot = self.make_snapshot(t, azimuth);
            self.snapshots.push(snapshot);
        }

        // Convect and maintain the wake.
        if wake_step {
            let dt_wake = dt * self.config.wake.nth_wake_step as f64;
            let conv_field = self.build_field(true, neighbours);
            let ctx = ConvectionContext {
                field: &conv_field,
                inflow: &*self.inflow,
                time: t,
                dt: dt_wake,
                scheme: self.config.wake.integration_scheme,
                first_wake_row_length: self.config.wake.first_wake_row_length,
                exchange_viscosity: self
                    .config
                    .wake
                    .particle_strength_exchange
                    .then_some(self.config.environment.kinematic_viscosity),
                timestep: self.timestep,
            };
            let use_accelerator = self.config.solver.device == ExecutionDevice::Accelerator;
            let mut backend = if use_accelerator {
                self.accelerator.as_deref_mut()
            } else {
                None
            };
            store_rates_of_change(&mut self.wake);
            calculate_wake_rates_of_change(&mut self.wake, &ctx, backend.as_deref_mut())?;
            perform_wake_correction_step(&mut self.wake, &ctx, backend.as_deref_mut())?;
            calculate_new_wake_state(&mut self.wake, &ctx)?;
            drop(ctx);

            age_filament_cores(
                &mut self.wake,
                &self.config.wake,
                self.config.environment.kinematic_viscosity,
                dt_wake,
            );
            let frame = WakeAgeFrame {
                timestep: self.timestep,
                revolution: self.azimuth_deg.abs() / 360.0,
                hub_position: hub_zero.origin,
                rotor_diameter: self.config.rotor.diameter(),
            };
            truncate_wake(&mut self.wake, &self.config.wake, &frame);
            reduce_wake(&mut self.wake, &self.config.wake, &frame);
            convert_lines_to_particles(&mut self.wake, &self.config.wake, &frame);
            cleanup(&mut self.wake);
        }

        for panel in &mut self.panels {
            panel.rotate_gamma_history();
        }
        self.timestep += 1;
        self.time = t;

        Ok(TimestepResult {
            timestep: self.timestep - 1,
            time: t,
            azimuth_deg: azimuth,
            iterations: outcome.iterations,
            converged: outcome.converged,
            unconverged: outcome.unconverged,
            max_gamma: self.wake.max_gamma,
            elements: self.wake.counts(),
            wake_step,
        })
    }

    fn build_field(&self, include_bound: bool, neighbours: &[WakeFieldSnapshot]) -> InductionField {
        let mut field = InductionField::new(
            self.config.wake.particle_kernel,
            self.config.environment.ground_effect,
        );
        field.add_filaments(self.wake.filament_segments());
        field.add_particles(self.wake.particle_sources());
        if include_bound {
            field.add_filaments(self.panels.iter().map(|p| p.bound_segment(p.gamma)));
        }
        for neighbour in neighbours {
            field.add_filaments(neighbour.filaments.iter().copied());
            field.add_particles(neighbour.particles.iter().copied());
        }
        field
    }

    fn blade_stations(&self, blade: usize) -> (Vec<SpawnStation>, Vec<f64>) {
        let panels_per_blade = self.config.rotor.panels_per_blade;
        let mut stations = Vec::with_capacity(panels_per_blade + 1);
        for s in 0..=panels_per_blade {
            let bound = &self.bound_stations[blade * (panels_per_blade + 1) + s];
            let position = self
                .wake
                .nodes
                .get(bound.handle)
                .map(|n| n.position)
                .unwrap_or(Vec3::ZERO);
            let chord_panel = blade * panels_per_blade + s.min(panels_per_blade - 1);
            let chord = self.panels[chord_panel].chord;
            stations.push(SpawnStation {
                bound_node: bound.handle,
                position,
                station: s,
                left_panel: (s > 0).then(|| blade * panels_per_blade + s - 1),
                right_panel: (s < panels_per_blade).then(|| blade * panels_per_blade + s),
                core_size_sqr: (self.config.wake.initial_core_fraction * chord).powi(2),
            });
        }
        let gammas: Vec<f64> = self.panels
            [blade * panels_per_blade..(blade + 1) * panels_per_blade]
            .iter()
            .map(|p| p.gamma)
            .collect();
        (stations, gammas)
    }

    fn spawn_wake_rows(&mut self) {
        let revolution = self.azimuth_deg.abs() / 360.0;
        for blade in 0..self.config.rotor.num_blades {
            let (stations, gammas) = self.blade_stations(blade);
            let frame = BladeSpawnFrame {
                blade,
                strut: None,
                stations: &stations,
                panel_gamma: &gammas,
            };
            add_wake_elements(
                &mut self.wake,
                &frame,
                &self.config.wake,
                self.timestep,
                revolution,
            );
        }
    }

    fn refresh_wake_rows(&mut self) {
        for blade in 0..self.config.rotor.num_blades {
            let (stations, gammas) = self.blade_stations(blade);
            let frame = BladeSpawnFrame {
                blade,
                strut: None,
                stations: &stations,
                panel_gamma: &gammas,
            };
            refresh_row_circulation(&mut self.wake, &frame, self.timestep);
        }
    }

    fn make_snapshot(&self, time: f64, azimuth_deg: f64) -> WakeSnapshot {
        let filaments = self
            .wake
            .filaments
            .iter()
            .filter_map(|(_, f)| {
                let leading = self.wake.nodes.get(f.leading)?.position;
                let trailing = self.wake.nodes.get(f.trailing)?.position;
                Some(FilamentSnapshot {
                    leading,
                    trailing,
                    gamma: f.gamma,
                    core_size: f.core_size_sqr.max(0.0).sqrt(),
                    is_shed: f.is_shed,
                })
            })
            .collect();
        let particles = self
            .wake
            .particles
            .iter()
            .map(|(_, p)| ParticleSnapshot {
                position: p.position,
                vorticity: p.alpha,
                core_size: p.core_size,
            })
            .collect();
        let panels = self
            .panels
            .iter()
            .map(|p| PanelSnapshot {
                id: PanelId {
                    blade: p.from_blade,
                    station: p.from_station,
                },
                corners: [p.corners.le_a, p.corners.te_a, p.corners.te_b, p.corners.le_b],
                gamma: p.gamma,
                alpha_deg: p.alpha_deg,
                cl: p.cl,
                cd: p.cd,
                cm: p.cm,
                force_per_length: p.force_per_length,
                moment_per_length: p.moment_per_length,
            })
            .collect();
        WakeSnapshot {
            timestep: self.timestep,
            time,
            azimuth_deg,
            hub_frame: self.provider.hub_frame(azimuth_deg),
            filaments,
            particles,
            panels,
        }
    }
}

/// Rotor-aggregate aerodynamic torque about the shaft axis.
fn aero_torque(panels: &[VortexPanel], hub: &Frame) -> f64 {
    panels
        .iter()
        .map(|p| {
            let arm = p.control_point - hub.origin;
            arm.cross(p.force_per_length * p.span_length()).dot(hub.x)
        })
        .sum()
}
