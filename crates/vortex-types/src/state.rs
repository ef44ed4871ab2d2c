// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Read-only output state: per-timestep snapshots, convergence diagnostics,
//! and timestep results consumed by plotting/export/replay.

use serde::{Deserialize, Serialize};
use vortex_math::{Frame, Vec3};

/// Identity of a lifting-line panel for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelId {
    pub blade: usize,
    pub station: usize,
}

/// One wake filament, copied out for visualization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilamentSnapshot {
    pub leading: Vec3,
    pub trailing: Vec3,
    pub gamma: f64,
    pub core_size: f64,
    pub is_shed: bool,
}

/// One wake particle, copied out for visualization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub position: Vec3,
    pub vorticity: Vec3,
    pub core_size: f64,
}

/// One bound panel: geometry, circulation and loads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub id: PanelId,
    /// Leading-edge A, trailing-edge A, trailing-edge B, leading-edge B.
    pub corners: [Vec3; 4],
    pub gamma: f64,
    pub alpha_deg: f64,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
    pub force_per_length: Vec3,
    pub moment_per_length: f64,
}

/// Complete stored state of one timestep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeSnapshot {
    pub timestep: usize,
    pub time: f64,
    pub azimuth_deg: f64,
    pub hub_frame: Frame,
    pub filaments: Vec<FilamentSnapshot>,
    pub particles: Vec<ParticleSnapshot>,
    pub panels: Vec<PanelSnapshot>,
}

/// Gamma-loop non-convergence record, accumulated over the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceRecord {
    pub timestep: usize,
    pub time: f64,
    pub iterations: usize,
    pub panels: Vec<PanelId>,
}

/// Wake element population counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub nodes: usize,
    pub filaments: usize,
    pub particles: usize,
}

impl ElementCounts {
    pub fn total(&self) -> usize {
        self.nodes + self.filaments + self.particles
    }
}

/// Outcome of one advanced timestep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestepResult {
    pub timestep: usize,
    pub time: f64,
    pub azimuth_deg: f64,
    /// Gamma iterations used this step.
    pub iterations: usize,
    pub converged: bool,
    /// Panels still above the convergence threshold when the loop stopped.
    pub unconverged: Vec<PanelId>,
    pub max_gamma: f64,
    pub elements: ElementCounts,
    /// Whether this step spawned and convected wake.
    pub wake_step: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_counts_total() {
        let counts = ElementCounts {
            nodes: 10,
            filaments: 18,
            particles: 5,
        };
        assert_eq!(counts.total(), 33);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snap = WakeSnapshot {
            timestep: 7,
            time: 0.35,
            azimuth_deg: 126.0,
            hub_frame: Frame::world(Vec3::new(0.0, 0.0, 90.0)),
            filaments: vec![FilamentSnapshot {
                leading: Vec3::new(1.0, 0.0, 0.0),
                trailing: Vec3::new(2.0, 0.0, 0.0),
                gamma: 4.2,
                core_size: 0.05,
                is_shed: false,
            }],
            particles: vec![],
            panels: vec![],
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: WakeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestep, 7);
        assert_eq!(back.filaments.len(), 1);
        assert!((back.filaments[0].gamma - 4.2).abs() < 1e-12);
    }
}
