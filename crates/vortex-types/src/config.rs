// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Solver configuration.
//!
//! One immutable `SimulationConfig` value is passed into every entry point;
//! there is no process-wide mutable solver state. All fields carry serde
//! defaults so partial JSON configs deserialize.

use crate::error::{VortexError, VortexResult};
use serde::{Deserialize, Serialize};

/// Top-level configuration for one rotor simulation instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub name: String,
    pub rotor: RotorConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub wake: WakeConfig,
    #[serde(default)]
    pub solver: GammaSolverConfig,
    #[serde(default)]
    pub dynamic_stall: DynamicStallConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tower: Option<TowerConfig>,
    /// Keep per-timestep output snapshots for replay/plotting.
    #[serde(default = "default_true")]
    pub store_snapshots: bool,
}

/// One blade definition station, root to tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BladeStation {
    /// Spanwise position from the rotor axis (m).
    pub radius: f64,
    pub chord: f64,
    pub twist_deg: f64,
    /// Relative profile thickness t/c.
    #[serde(default = "default_thickness")]
    pub thickness_ratio: f64,
    /// Chordwise pitch-axis location, fraction of chord from the leading edge.
    #[serde(default = "default_pitch_axis")]
    pub pitch_axis: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotorConfig {
    pub num_blades: usize,
    pub blade: Vec<BladeStation>,
    /// Lifting-line panels per blade.
    pub panels_per_blade: usize,
    pub rpm: f64,
    #[serde(default)]
    pub hub_height: f64,
    #[serde(default)]
    pub overhang: f64,
    #[serde(default)]
    pub shaft_tilt_deg: f64,
    #[serde(default)]
    pub cone_deg: f64,
    #[serde(default)]
    pub yaw_deg: f64,
    #[serde(default)]
    pub collective_pitch_deg: f64,
    #[serde(default)]
    pub reversed_rotation: bool,
    /// Advance geometry and circulation without spawning wake for this many
    /// initial steps.
    #[serde(default)]
    pub rampup_steps: usize,
}

impl RotorConfig {
    pub fn tip_radius(&self) -> f64 {
        self.blade.last().map(|s| s.radius).unwrap_or(0.0)
    }

    pub fn diameter(&self) -> f64 {
        2.0 * self.tip_radius()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_density")]
    pub density: f64,
    #[serde(default = "default_viscosity")]
    pub kinematic_viscosity: f64,
    /// Mirror every induction source across z = 0.
    #[serde(default)]
    pub ground_effect: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            density: default_density(),
            kinematic_viscosity: default_viscosity(),
            ground_effect: false,
        }
    }
}

/// Regularized particle smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKernel {
    LowOrderAlgebraic,
    HighOrderAlgebraic,
    Gaussian,
}

/// Wake position integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeIntegrationScheme {
    /// Two-point predictor-corrector (trapezoidal).
    PredictorCorrector,
    /// Four-point correction using the three-step position history.
    Pc2b,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    /// Wake rows are spawned every nth outer timestep.
    #[serde(default = "default_one")]
    pub nth_wake_step: usize,
    /// Age-based policies count revolutions when true, wake steps when false.
    #[serde(default = "default_true")]
    pub count_in_revolutions: bool,
    /// Near wake zone length (revolutions or steps per `count_in_revolutions`).
    #[serde(default = "default_near_wake")]
    pub near_wake_length: f64,
    #[serde(default = "default_zone1_length")]
    pub zone1_length: f64,
    #[serde(default = "default_zone2_length")]
    pub zone2_length: f64,
    #[serde(default = "default_zone3_length")]
    pub zone3_length: f64,
    // Coarsening keeps every Nth filament with N the cumulative zone factor
    // (2, 4, 8 for the default factors).
    #[serde(default = "default_zone_factor")]
    pub zone1_factor: usize,
    #[serde(default = "default_zone_factor")]
    pub zone2_factor: usize,
    #[serde(default = "default_zone_factor")]
    pub zone3_factor: usize,
    /// Filaments below `max_observed_gamma * min_gamma_factor` are truncated.
    #[serde(default = "default_min_gamma_factor")]
    pub min_gamma_factor: f64,
    /// Elements farther than this many rotor diameters from the hub are deleted.
    #[serde(default = "default_max_wake_distance")]
    pub max_wake_distance: f64,
    /// Filaments older than this are converted into particles.
    #[serde(default = "default_conversion_length")]
    pub wake_conversion_length: f64,
    /// Fraction of the first convection step applied to freshly spawned rows.
    #[serde(default = "default_one_f64")]
    pub first_wake_row_length: f64,
    /// Hard cap on nodes + filaments + particles; oldest evicted first.
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_true")]
    pub shed: bool,
    #[serde(default = "default_true")]
    pub trailing: bool,
    #[serde(default = "default_kernel")]
    pub particle_kernel: ParticleKernel,
    #[serde(default = "default_scheme")]
    pub integration_scheme: WakeIntegrationScheme,
    /// Initial filament core radius as a fraction of local chord.
    #[serde(default = "default_core_fraction")]
    pub initial_core_fraction: f64,
    /// Turbulent-viscosity multiplier in the core growth law.
    #[serde(default = "default_turbulent_viscosity")]
    pub turbulent_viscosity: f64,
    /// Accumulate particle-strength-exchange diffusion alongside stretching.
    #[serde(default)]
    pub particle_strength_exchange: bool,
}

impl Default for WakeConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty wake config deserializes")
    }
}

impl WakeConfig {
    /// Total tracked wake age: near wake plus the three coarsening zones.
    pub fn total_wake_length(&self) -> f64 {
        self.near_wake_length + self.zone1_length + self.zone2_length + self.zone3_length
    }
}

/// Induction model driving the circulation iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InductionMode {
    FreeVortexWake,
    UnsteadyBem,
}

/// Execution device for the batched induction passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionDevice {
    Cpu,
    Accelerator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaSolverConfig {
    #[serde(default = "default_mode")]
    pub mode: InductionMode,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Relative circulation change below which a panel counts as converged.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_relaxation")]
    pub relaxation_factor: f64,
    /// Struts produce lift and take part in the iteration.
    #[serde(default)]
    pub strut_lift: bool,
    /// Iterate strut panels in a nested sub-loop instead of the main loop.
    #[serde(default = "default_true")]
    pub strut_inner_iteration: bool,
    /// Himmelskamp stall-delay correction for rotating blades.
    #[serde(default)]
    pub himmelskamp: bool,
    #[serde(default = "default_device")]
    pub device: ExecutionDevice,
    #[serde(default)]
    pub bem: BemConfig,
}

impl Default for GammaSolverConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty solver config deserializes")
    }
}

/// Polar-grid unsteady BEM parameters (`InductionMode::UnsteadyBem`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BemConfig {
    #[serde(default = "default_bem_azimuth")]
    pub grid_azimuth: usize,
    #[serde(default = "default_bem_radial")]
    pub grid_radial: usize,
    #[serde(default = "default_true")]
    pub tip_loss: bool,
    #[serde(default = "default_true")]
    pub dynamic_inflow: bool,
}

impl Default for BemConfig {
    fn default() -> Self {
        BemConfig {
            grid_azimuth: default_bem_azimuth(),
            grid_radial: default_bem_radial(),
            tip_loss: true,
            dynamic_inflow: true,
        }
    }
}

/// Dynamic-stall model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicStallModel {
    None,
    Oye,
    GormontBerg,
    Ateflap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicStallConfig {
    #[serde(default = "default_ds_model")]
    pub model: DynamicStallModel,
    /// Oye separation lag time constant factor.
    #[serde(default = "default_tf")]
    pub tf: f64,
    /// Gormont-Berg blending constant.
    #[serde(default = "default_am")]
    pub am: f64,
    /// Pressure lag time constant (ATEFLAP).
    #[serde(default = "default_tp")]
    pub tp: f64,
    /// Separation lag time constant (ATEFLAP).
    #[serde(default = "default_tf")]
    pub tf_ateflap: f64,
}

impl Default for DynamicStallConfig {
    fn default() -> Self {
        DynamicStallConfig {
            model: default_ds_model(),
            tf: default_tf(),
            am: default_am(),
            tp: default_tp(),
            tf_ateflap: default_tf(),
        }
    }
}

/// Cylindrical tower shadow model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerConfig {
    pub radius: f64,
    #[serde(default = "default_tower_drag")]
    pub drag_coefficient: f64,
}

fn default_true() -> bool {
    true
}
fn default_one() -> usize {
    1
}
fn default_one_f64() -> f64 {
    1.0
}
fn default_thickness() -> f64 {
    1.0
}
fn default_pitch_axis() -> f64 {
    0.25
}
fn default_density() -> f64 {
    crate::constants::AIR_DENSITY
}
fn default_viscosity() -> f64 {
    crate::constants::KINEMATIC_VISCOSITY
}
fn default_near_wake() -> f64 {
    0.5
}
fn default_zone1_length() -> f64 {
    2.0
}
fn default_zone2_length() -> f64 {
    4.0
}
fn default_zone3_length() -> f64 {
    6.0
}
fn default_zone_factor() -> usize {
    2
}
fn default_min_gamma_factor() -> f64 {
    1e-3
}
fn default_max_wake_distance() -> f64 {
    5.0
}
fn default_conversion_length() -> f64 {
    2.0
}
fn default_max_elements() -> usize {
    200_000
}
fn default_kernel() -> ParticleKernel {
    ParticleKernel::HighOrderAlgebraic
}
fn default_scheme() -> WakeIntegrationScheme {
    WakeIntegrationScheme::PredictorCorrector
}
fn default_core_fraction() -> f64 {
    0.05
}
fn default_turbulent_viscosity() -> f64 {
    40.0
}
fn default_mode() -> InductionMode {
    InductionMode::FreeVortexWake
}
fn default_max_iterations() -> usize {
    100
}
fn default_epsilon() -> f64 {
    5e-3
}
fn default_relaxation() -> f64 {
    0.35
}
fn default_device() -> ExecutionDevice {
    ExecutionDevice::Cpu
}
fn default_bem_azimuth() -> usize {
    36
}
fn default_bem_radial() -> usize {
    20
}
fn default_ds_model() -> DynamicStallModel {
    DynamicStallModel::Oye
}
fn default_tf() -> f64 {
    6.0
}
fn default_am() -> f64 {
    6.0
}
fn default_tp() -> f64 {
    1.5
}
fn default_tower_drag() -> f64 {
    0.5
}

impl SimulationConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> VortexResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the solver cannot run on.
    pub fn validate(&self) -> VortexResult<()> {
        let r = &self.rotor;
        if r.num_blades == 0 {
            return Err(VortexError::ConfigError(
                "num_blades must be >= 1".to_string(),
            ));
        }
        if r.panels_per_blade == 0 {
            return Err(VortexError::ConfigError(
                "panels_per_blade must be >= 1".to_string(),
            ));
        }
        if r.blade.len() < 2 {
            return Err(VortexError::ConfigError(
                "blade definition needs at least 2 stations".to_string(),
            ));
        }
        for pair in r.blade.windows(2) {
            if pair[1].radius <= pair[0].radius {
                return Err(VortexError::ConfigError(format!(
                    "blade stations must have strictly increasing radius: {} then {}",
                    pair[0].radius, pair[1].radius
                )));
            }
        }
        for (i, s) in r.blade.iter().enumerate() {
            if !s.chord.is_finite() || s.chord <= 0.0 {
                return Err(VortexError::ConfigError(format!(
                    "blade station {i}: chord must be finite and > 0, got {}",
                    s.chord
                )));
            }
        }
        let w = &self.wake;
        if w.nth_wake_step == 0 {
            return Err(VortexError::ConfigError(
                "nth_wake_step must be >= 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&w.first_wake_row_length) || w.first_wake_row_length == 0.0 {
            return Err(VortexError::ConfigError(
                "first_wake_row_length must be in (0, 1]".to_string(),
            ));
        }
        if w.zone1_factor == 0 || w.zone2_factor == 0 || w.zone3_factor == 0 {
            return Err(VortexError::ConfigError(
                "coarsening zone factors must be >= 1".to_string(),
            ));
        }
        if !w.min_gamma_factor.is_finite() || w.min_gamma_factor < 0.0 {
            return Err(VortexError::ConfigError(
                "min_gamma_factor must be finite and >= 0".to_string(),
            ));
        }
        let s = &self.solver;
        if s.max_iterations == 0 {
            return Err(VortexError::ConfigError(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if !s.epsilon.is_finite() || s.epsilon <= 0.0 {
            return Err(VortexError::ConfigError(
                "epsilon must be finite and > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.relaxation_factor) || s.relaxation_factor == 0.0 {
            return Err(VortexError::ConfigError(
                "relaxation_factor must be in (0, 1]".to_string(),
            ));
        }
        if !self.environment.density.is_finite() || self.environment.density <= 0.0 {
            return Err(VortexError::ConfigError(
                "density must be finite and > 0".to_string(),
            ));
        }
        if let Some(tower) = &self.tower {
            if !tower.radius.is_finite() || tower.radius <= 0.0 {
                return Err(VortexError::ConfigError(
                    "tower radius must be finite and > 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "name": "test-rotor",
            "rotor": {
                "num_blades": 3,
                "panels_per_blade": 10,
                "rpm": 12.0,
                "blade": [
                    { "radius": 1.5, "chord": 3.0, "twist_deg": 13.0 },
                    { "radius": 40.0, "chord": 1.2, "twist_deg": 0.0 }
                ]
            }
        }"#
    }

    #[test]
    fn test_minimal_config_deserializes_with_defaults() {
        let cfg: SimulationConfig = serde_json::from_str(minimal_json()).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.rotor.num_blades, 3);
        assert_eq!(cfg.wake.nth_wake_step, 1);
        assert_eq!(cfg.wake.particle_kernel, ParticleKernel::HighOrderAlgebraic);
        assert_eq!(cfg.solver.mode, InductionMode::FreeVortexWake);
        assert_eq!(cfg.dynamic_stall.model, DynamicStallModel::Oye);
        assert!((cfg.solver.relaxation_factor - 0.35).abs() < 1e-12);
        assert!((cfg.rotor.diameter() - 80.0).abs() < 1e-12);
        assert!(cfg.tower.is_none());
    }

    #[test]
    fn test_total_wake_length_sums_zones() {
        let cfg = WakeConfig::default();
        assert!((cfg.total_wake_length() - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg: SimulationConfig = serde_json::from_str(minimal_json()).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.name, cfg2.name);
        assert_eq!(cfg.rotor.blade.len(), cfg2.rotor.blade.len());
        assert_eq!(cfg.wake.zone1_factor, cfg2.wake.zone1_factor);
    }

    #[test]
    fn test_validate_rejects_unordered_stations() {
        let mut cfg: SimulationConfig = serde_json::from_str(minimal_json()).unwrap();
        cfg.rotor.blade[1].radius = 1.0;
        let err = cfg.validate().unwrap_err();
        match err {
            VortexError::ConfigError(msg) => assert!(msg.contains("increasing radius")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_relaxation() {
        let mut cfg: SimulationConfig = serde_json::from_str(minimal_json()).unwrap();
        cfg.solver.relaxation_factor = 0.0;
        assert!(cfg.validate().is_err());
        cfg.solver.relaxation_factor = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_panels() {
        let mut cfg: SimulationConfig = serde_json::from_str(minimal_json()).unwrap();
        cfg.rotor.panels_per_blade = 0;
        assert!(cfg.validate().is_err());
    }
}
