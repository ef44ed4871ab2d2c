// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

/// Error taxonomy for the wake solver.
///
/// Fatal numerical divergence carries the offending element's identity and
/// the timestep it was detected at; an aborted run is terminal, never
/// retried. Gamma non-convergence is deliberately NOT an error — it is
/// recorded as diagnostic data and the run continues.
#[derive(Error, Debug)]
pub enum VortexError {
    #[error("Wake diverged at timestep {timestep}: {message}")]
    WakeDiverged { timestep: usize, message: String },

    #[error(
        "Polar lookup returned NaN at timestep {timestep} for blade {blade}, station {station}"
    )]
    PolarNan {
        timestep: usize,
        blade: usize,
        station: usize,
    },

    #[error(
        "Panel relative velocity exploded at timestep {timestep} for blade {blade}, \
         station {station}: |V| = {magnitude:.3e}"
    )]
    VelocityExploded {
        timestep: usize,
        blade: usize,
        station: usize,
        magnitude: f64,
    },

    #[error("Controller raised fail flag at timestep {timestep}")]
    ControllerFail { timestep: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Geometry error: {0}")]
    GeometryError(String),

    #[error("Accelerator error: {0}")]
    AcceleratorError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type VortexResult<T> = Result<T, VortexError>;

impl VortexError {
    /// Fatal errors terminate the run; everything else is a setup failure
    /// surfaced before the timestep loop begins.
    pub fn is_fatal_divergence(&self) -> bool {
        matches!(
            self,
            VortexError::WakeDiverged { .. }
                | VortexError::PolarNan { .. }
                | VortexError::VelocityExploded { .. }
        )
    }
}
