// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Property-Based Tests (proptest) for vortex-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for vortex-types using proptest.
//!
//! Covers: configuration serialization round-trip, validation invariants,
//! wake zone arithmetic.

use proptest::prelude::*;
use vortex_types::config::{BladeStation, RotorConfig, SimulationConfig, WakeConfig};

fn base_config(num_blades: usize, panels: usize, tip_radius: f64) -> SimulationConfig {
    SimulationConfig {
        name: "prop".to_string(),
        rotor: RotorConfig {
            num_blades,
            blade: vec![
                BladeStation {
                    radius: 0.05 * tip_radius,
                    chord: 0.08 * tip_radius,
                    twist_deg: 12.0,
                    thickness_ratio: 0.3,
                    pitch_axis: 0.25,
                },
                BladeStation {
                    radius: tip_radius,
                    chord: 0.03 * tip_radius,
                    twist_deg: 0.0,
                    thickness_ratio: 0.18,
                    pitch_axis: 0.25,
                },
            ],
            panels_per_blade: panels,
            rpm: 10.0,
            hub_height: 2.0 * tip_radius,
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

proptest! {
    /// Any well-formed config passes validation and survives a JSON round-trip.
    #[test]
    fn config_roundtrip(
        num_blades in 1usize..6,
        panels in 1usize..40,
        tip_radius in 1.0f64..120.0,
    ) {
        let cfg = base_config(num_blades, panels, tip_radius);
        cfg.validate().expect("well-formed config validates");

        let json = serde_json::to_string(&cfg).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        back.validate().expect("round-tripped config validates");
        prop_assert_eq!(back.rotor.num_blades, num_blades);
        prop_assert_eq!(back.rotor.panels_per_blade, panels);
        prop_assert!((back.rotor.tip_radius() - tip_radius).abs() < 1e-12);
    }

    /// Total wake length always equals the sum of the four zones.
    #[test]
    fn wake_zone_sum(
        near in 0.0f64..5.0,
        z1 in 0.0f64..10.0,
        z2 in 0.0f64..10.0,
        z3 in 0.0f64..10.0,
    ) {
        let mut wake = WakeConfig::default();
        wake.near_wake_length = near;
        wake.zone1_length = z1;
        wake.zone2_length = z2;
        wake.zone3_length = z3;
        prop_assert!((wake.total_wake_length() - (near + z1 + z2 + z3)).abs() < 1e-12);
    }

    /// Zero or reversed station ordering is always rejected.
    #[test]
    fn bad_station_order_rejected(tip_radius in 1.0f64..120.0) {
        let mut cfg = base_config(3, 10, tip_radius);
        cfg.rotor.blade.swap(0, 1);
        prop_assert!(cfg.validate().is_err());
    }
}
