// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Filament
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::arena::Handle;
use crate::node::NodeHandle;

pub type LineHandle = Handle<WakeFilament>;

/// Directed straight vortex segment between two wake nodes.
///
/// `leading` is the blade-side endpoint, `trailing` the downstream one.
/// Owned by the wake filament arena; the endpoint nodes hold weak
/// back-references only.
#[derive(Debug, Clone)]
pub struct WakeFilament {
    pub leading: NodeHandle,
    pub trailing: NodeHandle,
    pub gamma: f64,
    /// Circulation at spawn, kept for diagnostics and coarsening weights.
    pub initial_gamma: f64,
    /// Squared desingularization core radius; grows by the diffusion law.
    pub core_size_sqr: f64,
    pub stretch_factor: f64,
    /// Length at spawn, denominator of the stretch ratio.
    pub initial_length: f64,
    pub is_hub: bool,
    pub is_tip: bool,
    pub is_shed: bool,
    pub is_trailing: bool,
    pub is_strut: bool,
    pub from_blade: usize,
    pub from_station: usize,
    pub from_timestep: usize,
    pub from_revolution: f64,
    /// Bound panel index this trailing filament was shed from.
    pub right_panel: Option<usize>,
    /// Trailing filament this one split from at the last spawn.
    pub from_line: Option<LineHandle>,
    /// Older shed neighbour at the same station pair.
    pub shed_upstream: Option<LineHandle>,
    /// Newer shed neighbour at the same station pair.
    pub shed_downstream: Option<LineHandle>,
}

impl WakeFilament {
    #[allow(clippy::too_many_arguments)]
    pub fn trailing_line(
        leading: NodeHandle,
        trailing: NodeHandle,
        gamma: f64,
        core_size_sqr: f64,
        blade: usize,
        station: usize,
        timestep: usize,
        revolution: f64,
    ) -> Self {
        WakeFilament {
            leading,
            trailing,
            gamma,
            initial_gamma: gamma,
            core_size_sqr,
            stretch_factor: 1.0,
            initial_length: 0.0,
            is_hub: false,
            is_tip: false,
            is_shed: false,
            is_trailing: true,
            is_strut: false,
            from_blade: blade,
            from_station: station,
            from_timestep: timestep,
            from_revolution: revolution,
            right_panel: None,
            from_line: None,
            shed_upstream: None,
            shed_downstream: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn shed_line(
        leading: NodeHandle,
        trailing: NodeHandle,
        gamma: f64,
        core_size_sqr: f64,
        blade: usize,
        station: usize,
        timestep: usize,
        revolution: f64,
    ) -> Self {
        WakeFilament {
            is_shed: true,
            is_trailing: false,
            ..WakeFilament::trailing_line(
                leading, trailing, gamma, core_size_sqr, blade, station, timestep, revolution,
            )
        }
    }
}
