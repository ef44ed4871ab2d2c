// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — End-to-End Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Whole-solver scenarios: steady BEM annulus against actuator-disk
//! theory, wake topology after a known spawn sequence, and the fatal
//! polar-NaN abort path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vortex_core::bem::solve_steady_annulus;
use vortex_core::inflow::UniformInflow;
use vortex_core::polar::{AeroCoefficients, LinearPolar, PolarProvider, PolarQuery};
use vortex_core::simulation::RotorSimulation;
use vortex_types::config::{BladeStation, RotorConfig, SimulationConfig};
use vortex_types::error::VortexError;

fn two_panel_config() -> SimulationConfig {
    SimulationConfig {
        name: "scenario".to_string(),
        rotor: RotorConfig {
            num_blades: 1,
            blade: vec![
                BladeStation {
                    radius: 1.0,
                    chord: 1.5,
                    twist_deg: 8.0,
                    thickness_ratio: 0.25,
                    pitch_axis: 0.25,
                },
                BladeStation {
                    radius: 10.0,
                    chord: 0.8,
                    twist_deg: 0.0,
                    thickness_ratio: 0.18,
                    pitch_axis: 0.25,
                },
            ],
            panels_per_blade: 2,
            rpm: 15.0,
            hub_height: 30.0,
            overhang: 0.0,
            shaft_tilt_deg: 0.0,
            cone_deg: 0.0,
            yaw_deg: 0.0,
            collective_pitch_deg: 0.0,
            reversed_rotation: false,
            rampup_steps: 0,
        },
        environment: Default::default(),
        wake: Default::default(),
        solver: Default::default(),
        dynamic_stall: Default::default(),
        tower: None,
        store_snapshots: true,
    }
}

/// Scenario A: a single annulus in 10 m/s axial inflow at tip-speed
/// ratio 7 with the 2π-slope flat-plate polar. The classic steady BEM
/// iteration must land near the actuator-disk optimum, inside the
/// empirical-correction band rather than exactly on 1/3.
#[test]
fn scenario_a_steady_bem_axial_induction() {
    let polar = LinearPolar {
        cd_zero: 0.0,
        ..LinearPolar::default()
    };
    let (a, _a_prime, iterations) = solve_steady_annulus(0.055, 7.0, 2.44, 3, 0.7, &polar, 500);
    assert!(iterations < 500, "classic iteration converges");
    assert!(
        (a - 1.0 / 3.0).abs() < 0.08,
        "axial induction {a} within the empirical band around 1/3"
    );
}

/// Scenario B: five wake steps on a 2-panel, 1-blade rotor with shedding
/// and trailing enabled. Counts and topology follow the spawn rules in
/// closed form: S rows of (P+1) nodes, S*(P+1) trailing and S*P shed
/// filaments.
#[test]
fn scenario_b_wake_topology_after_five_steps() {
    let mut cfg = two_panel_config();
    // Topology census: disable the weak-circulation truncation so rows
    // with a near-zero shed strength survive the full five steps.
    cfg.wake.min_gamma_factor = 0.0;
    let mut sim = RotorSimulation::new(
        cfg,
        Box::new(UniformInflow::axial(10.0)),
        Box::new(LinearPolar::default()),
    )
    .unwrap();
    for _ in 0..5 {
        sim.advance(0.05).unwrap();
    }

    let counts = sim.wake().counts();
    assert_eq!(counts.nodes, 15, "S*(P+1) free nodes");
    assert_eq!(counts.filaments, 25, "S*(P+1) trailing + S*P shed");
    assert_eq!(counts.particles, 0);

    let wake = sim.wake();
    let trailing: Vec<_> = wake
        .filaments
        .iter()
        .filter(|(_, f)| f.is_trailing)
        .collect();
    let shed: Vec<_> = wake.filaments.iter().filter(|(_, f)| f.is_shed).collect();
    assert_eq!(trailing.len(), 15);
    assert_eq!(shed.len(), 10);

    // Hub/tip flags: one hub and one tip trailing filament per row.
    assert_eq!(trailing.iter().filter(|(_, f)| f.is_hub).count(), 5);
    assert_eq!(trailing.iter().filter(|(_, f)| f.is_tip).count(), 5);
    // With two panels every shed filament borders both hub and tip pair.
    assert!(shed.iter().all(|(_, f)| f.is_hub || f.is_tip));

    // Attached-line census. Bound trailing-edge nodes carry exactly the
    // one filament currently hanging off the blade.
    for (_, node) in wake.nodes.iter().filter(|(_, n)| n.is_bound) {
        assert_eq!(node.attached.len(), 1, "bound node census");
    }
    // Free nodes: oldest row has one trailing end, younger rows two;
    // interior stations add two shed, boundary stations one.
    for (_, node) in wake.nodes.iter().filter(|(_, n)| !n.is_bound) {
        let trailing_here = 2 - usize::from(node.from_timestep == 0);
        let shed_here = if node.from_station == 1 { 2 } else { 1 };
        assert_eq!(
            node.attached.len(),
            trailing_here + shed_here,
            "node census at station {} row {}",
            node.from_station,
            node.from_timestep
        );
    }
}

/// Wraps the stub polar; once poisoned it returns NaN lift for one
/// station.
struct SwitchablePolar {
    inner: LinearPolar,
    poisoned: Arc<AtomicBool>,
    station: usize,
}

impl PolarProvider for SwitchablePolar {
    fn coefficients(&self, query: &PolarQuery) -> AeroCoefficients {
        let mut coeffs = self.inner.coefficients(query);
        if self.poisoned.load(Ordering::Relaxed) && query.station == self.station {
            coeffs.cl = f64::NAN;
        }
        coeffs
    }
}

/// Scenario C: a NaN injected into the polar output of one panel aborts
/// the run at that timestep, names the panel, and freezes the timestep
/// counter while keeping stored snapshots available.
#[test]
fn scenario_c_polar_nan_aborts_run() {
    let poisoned = Arc::new(AtomicBool::new(false));
    let polar = SwitchablePolar {
        inner: LinearPolar::default(),
        poisoned: poisoned.clone(),
        station: 1,
    };
    let mut sim = RotorSimulation::new(
        two_panel_config(),
        Box::new(UniformInflow::axial(10.0)),
        Box::new(polar),
    )
    .unwrap();

    for _ in 0..3 {
        sim.advance(0.05).unwrap();
    }
    assert_eq!(sim.timestep(), 3);
    assert_eq!(sim.snapshots().len(), 3);

    poisoned.store(true, Ordering::Relaxed);
    let err = sim.advance(0.05).unwrap_err();
    match err {
        VortexError::PolarNan {
            timestep,
            blade,
            station,
        } => {
            assert_eq!(timestep, 3);
            assert_eq!(blade, 0);
            assert_eq!(station, 1);
        }
        other => panic!("Unexpected error: {other:?}"),
    }

    // Terminal: no further timesteps advance, the reason is recorded,
    // and the already-computed snapshots survive.
    assert!(sim.abort_reason().unwrap().contains("NaN"));
    assert!(sim.advance(0.05).is_err());
    assert_eq!(sim.timestep(), 3);
    assert_eq!(sim.snapshots().len(), 3);
}

/// Non-convergence is a recorded diagnostic, not an abort: with a single
/// iteration allowed the run continues and accumulates records.
#[test]
fn nonconvergence_diagnostics_accumulate() {
    let mut cfg = two_panel_config();
    cfg.solver.max_iterations = 1;
    let mut sim = RotorSimulation::new(
        cfg,
        Box::new(UniformInflow::axial(10.0)),
        Box::new(LinearPolar::default()),
    )
    .unwrap();
    for _ in 0..3 {
        let result = sim.advance(0.05).unwrap();
        assert!(!result.converged);
        assert!(!result.unconverged.is_empty());
    }
    assert_eq!(sim.timestep(), 3, "run continues despite non-convergence");
    assert_eq!(sim.convergence_failures().len(), 3);
    assert_eq!(sim.convergence_failures()[0].timestep, 0);
}
