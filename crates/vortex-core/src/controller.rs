// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Controller Contract
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! External controller callback contract: a fixed sensor vector in,
//! demanded actuation out, exchanged once per outer timestep before the
//! next step's geometry update. A raised fail flag aborts the run.

/// Sensor vector handed to the controller.
#[derive(Debug, Clone)]
pub struct ControllerSensors {
    pub time: f64,
    pub azimuth_deg: f64,
    pub rotor_speed_rad: f64,
    pub wind_speed: f64,
    pub pitch_deg: Vec<f64>,
    /// Rotor-aggregate aerodynamic torque about the shaft axis.
    pub aero_torque: f64,
}

/// Demanded actuation returned by the controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerDemand {
    pub pitch_deg: Vec<f64>,
    pub generator_torque: f64,
    pub yaw_rate_deg: f64,
    pub flap_states: Vec<f64>,
    /// Terminal abort request.
    pub fail: bool,
}

/// Opaque external controller.
pub trait Controller {
    fn exchange(&mut self, sensors: &ControllerSensors) -> ControllerDemand;
}

/// Holds every demand constant; the no-controller baseline.
#[derive(Debug, Clone, Default)]
pub struct ConstantDemand {
    pub demand: ControllerDemand,
}

impl Controller for ConstantDemand {
    fn exchange(&mut self, _sensors: &ControllerSensors) -> ControllerDemand {
        self.demand.clone()
    }
}
