// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Node
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::arena::Handle;
use crate::filament::LineHandle;
use vortex_math::Vec3;

pub type NodeHandle = Handle<WakeNode>;

/// A wake vertex. A node never owns its filaments; `attached` is a weak
/// back-reference list maintained by the wake on connect/disconnect.
/// A free node with zero attached filaments is garbage and is reclaimed by
/// the cleanup pass, except the newest two spawned rows.
#[derive(Debug, Clone)]
pub struct WakeNode {
    pub position: Vec3,
    /// Position at the start of the current convection step.
    pub initial_position: Vec3,
    /// Latest evaluated rate of change.
    pub rate: Vec3,
    /// Rate of change from the previous wake step.
    pub rate_prev: Vec3,
    /// Short position history, newest first, for the 4-point correction.
    pub history: [Vec3; 3],
    pub history_len: usize,
    /// Most recently spawned row.
    pub is_new: bool,
    /// Bound trailing-edge node; excluded from convection and reclamation,
    /// position rewritten by the geometry provider every substep.
    pub is_bound: bool,
    pub from_blade: usize,
    pub from_strut: Option<usize>,
    pub from_station: usize,
    pub from_timestep: usize,
    pub from_revolution: f64,
    pub attached: Vec<LineHandle>,
}

impl WakeNode {
    pub fn free(
        position: Vec3,
        blade: usize,
        strut: Option<usize>,
        station: usize,
        timestep: usize,
        revolution: f64,
    ) -> Self {
        WakeNode {
            position,
            initial_position: position,
            rate: Vec3::ZERO,
            rate_prev: Vec3::ZERO,
            history: [position; 3],
            history_len: 0,
            is_new: true,
            is_bound: false,
            from_blade: blade,
            from_strut: strut,
            from_station: station,
            from_timestep: timestep,
            from_revolution: revolution,
            attached: Vec::new(),
        }
    }

    pub fn bound(position: Vec3, blade: usize, strut: Option<usize>, station: usize) -> Self {
        WakeNode {
            is_bound: true,
            is_new: false,
            ..WakeNode::free(position, blade, strut, station, 0, 0.0)
        }
    }

    /// Push the current position onto the history ring, newest first.
    pub fn push_history(&mut self) {
        self.history[2] = self.history[1];
        self.history[1] = self.history[0];
        self.history[0] = self.position;
        self.history_len = (self.history_len + 1).min(3);
    }

    pub fn detach(&mut self, line: LineHandle) {
        self.attached.retain(|&h| h != line);
    }
}
