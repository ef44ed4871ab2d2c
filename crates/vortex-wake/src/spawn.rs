// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Spawn
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Wake row spawning.
//!
//! Every wake step emits one row of free nodes at the current trailing
//! edge. The trailing filaments that were hanging on the bound
//! trailing-edge nodes are re-pointed onto the fresh row, then a new
//! zero-length trailing filament per span station and one shed filament
//! per adjacent station pair are created. Span-station ordering of the
//! input stations is an invariant this walk depends on.

use crate::filament::WakeFilament;
use crate::node::{NodeHandle, WakeNode};
use crate::wake::{RowMemory, Wake};
use vortex_math::Vec3;
use vortex_types::config::WakeConfig;

/// One span station of a lifting surface at spawn time.
#[derive(Debug, Clone, Copy)]
pub struct SpawnStation {
    /// Bound trailing-edge node registered at setup.
    pub bound_node: NodeHandle,
    /// Current trailing-edge position.
    pub position: Vec3,
    pub station: usize,
    /// Bound panel inboard of this station, global index.
    pub left_panel: Option<usize>,
    /// Bound panel outboard of this station, global index.
    pub right_panel: Option<usize>,
    /// Initial squared core radius for filaments spawned here.
    pub core_size_sqr: f64,
}

/// Spawn input for one blade or strut: its ordered stations and the
/// converged bound circulation of the panels between them.
#[derive(Debug, Clone, Copy)]
pub struct BladeSpawnFrame<'a> {
    pub blade: usize,
    pub strut: Option<usize>,
    /// Ordered hub to tip; `stations.len() == panel_gamma.len() + 1`.
    pub stations: &'a [SpawnStation],
    pub panel_gamma: &'a [f64],
}

/// Spawn one wake row for one lifting surface.
pub fn add_wake_elements(
    wake: &mut Wake,
    frame: &BladeSpawnFrame,
    cfg: &WakeConfig,
    timestep: usize,
    revolution: f64,
) {
    debug_assert_eq!(frame.stations.len(), frame.panel_gamma.len() + 1);
    let n_stations = frame.stations.len();
    let n_panels = frame.panel_gamma.len();
    let key = (frame.blade, frame.strut);
    let previous = wake.row_memory.remove(&key).unwrap_or_default();
    wake.push_protected_step(timestep);

    // The previous row is no longer the newest.
    for &node in &previous.nodes {
        if let Some(n) = wake.nodes.get_mut(node) {
            n.is_new = false;
        }
    }

    // New row of free nodes at the trailing edge.
    let mut new_nodes: Vec<NodeHandle> = Vec::with_capacity(n_stations);
    for station in frame.stations {
        new_nodes.push(wake.nodes.insert(WakeNode::free(
            station.position,
            frame.blade,
            frame.strut,
            station.station,
            timestep,
            revolution,
        )));
    }

    let mut repointed: Vec<Option<crate::filament::LineHandle>> = vec![None; n_stations];
    if cfg.trailing {
        // Hand the filaments currently attached to the bound trailing edge
        // over to the fresh row.
        for (s, station) in frame.stations.iter().enumerate() {
            let attached = match wake.nodes.get(station.bound_node) {
                Some(node) => node.attached.clone(),
                None => continue,
            };
            for line in attached {
                let is_hanging = wake
                    .filaments
                    .get(line)
                    .map(|f| f.is_trailing && f.leading == station.bound_node)
                    .unwrap_or(false);
                if !is_hanging {
                    continue;
                }
                if let Some(f) = wake.filaments.get_mut(line) {
                    f.leading = new_nodes[s];
                }
                if let Some(node) = wake.nodes.get_mut(station.bound_node) {
                    node.detach(line);
                }
                if let Some(node) = wake.nodes.get_mut(new_nodes[s]) {
                    node.attached.push(line);
                }
                repointed[s] = Some(line);
            }
        }

        // One new trailing filament per station, blade side to new row.
        for (s, station) in frame.stations.iter().enumerate() {
            let gamma_left = if s > 0 { frame.panel_gamma[s - 1] } else { 0.0 };
            let gamma_right = if s < n_panels { frame.panel_gamma[s] } else { 0.0 };
            let mut filament = WakeFilament::trailing_line(
                station.bound_node,
                new_nodes[s],
                gamma_left - gamma_right,
                station.core_size_sqr,
                frame.blade,
                station.station,
                timestep,
                revolution,
            );
            filament.is_hub = s == 0;
            filament.is_tip = s == n_stations - 1;
            filament.is_strut = frame.strut.is_some();
            filament.right_panel = station.right_panel;
            filament.from_line = repointed[s];
            wake.connect_filament(filament);
        }
    }

    // One shed filament per adjacent station pair, carrying the temporal
    // circulation change since the last spawn. At the first spawn the
    // previous circulation is zero: the starting vortex.
    let mut new_shed = vec![None; n_panels];
    if cfg.shed {
        for s in 0..n_panels {
            let gamma_prev = previous.panel_gamma.get(s).copied().unwrap_or(0.0);
            let core = 0.5
                * (frame.stations[s].core_size_sqr + frame.stations[s + 1].core_size_sqr);
            let mut filament = WakeFilament::shed_line(
                new_nodes[s],
                new_nodes[s + 1],
                frame.panel_gamma[s] - gamma_prev,
                core,
                frame.blade,
                s,
                timestep,
                revolution,
            );
            filament.is_hub = s == 0;
            filament.is_tip = s == n_panels - 1;
            filament.is_strut = frame.strut.is_some();
            filament.shed_upstream = previous.shed.get(s).copied().flatten();
            let handle = wake.connect_filament(filament);
            if let Some(up) = previous.shed.get(s).copied().flatten() {
                if let Some(older) = wake.filaments.get_mut(up) {
                    older.shed_downstream = Some(handle);
                }
            }
            new_shed[s] = Some(handle);
        }
    }

    wake.row_memory.insert(
        key,
        RowMemory {
            nodes: new_nodes,
            shed: new_shed,
            panel_gamma: frame.panel_gamma.to_vec(),
            prev_panel_gamma: previous.panel_gamma,
        },
    );
}

/// Rewrite the newest row's circulation after the Gamma iteration has
/// converged: the row was spawned with the previous step's circulation
/// and now adopts the fresh solution. Trailing filaments take the
/// spanwise difference, shed filaments the change against the previous
/// row.
pub fn refresh_row_circulation(wake: &mut Wake, frame: &BladeSpawnFrame, timestep: usize) {
    let n_panels = frame.panel_gamma.len();
    let key = (frame.blade, frame.strut);

    // Trailing filaments of this row hang on the bound nodes.
    for (s, station) in frame.stations.iter().enumerate() {
        let gamma_left = if s > 0 { frame.panel_gamma[s - 1] } else { 0.0 };
        let gamma_right = if s < n_panels { frame.panel_gamma[s] } else { 0.0 };
        let attached = match wake.nodes.get(station.bound_node) {
            Some(node) => node.attached.clone(),
            None => continue,
        };
        for line in attached {
            let matches = wake
                .filaments
                .get(line)
                .map(|f| f.is_trailing && f.from_timestep == timestep)
                .unwrap_or(false);
            if matches {
                if let Some(f) = wake.filaments.get_mut(line) {
                    f.gamma = gamma_left - gamma_right;
                    f.initial_gamma = f.gamma;
                }
            }
        }
    }

    let Some(memory) = wake.row_memory.get_mut(&key) else {
        return;
    };
    let shed_handles = memory.shed.clone();
    let prev_gamma = memory.prev_panel_gamma.clone();
    memory.panel_gamma = frame.panel_gamma.to_vec();
    for (s, handle) in shed_handles.iter().enumerate() {
        let Some(handle) = handle else { continue };
        let previous = prev_gamma.get(s).copied().unwrap_or(0.0);
        if let Some(f) = wake.filaments.get_mut(*handle) {
            f.gamma = frame.panel_gamma[s] - previous;
            f.initial_gamma = f.gamma;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-panel single-blade rig: three bound trailing-edge nodes.
    fn rig(wake: &mut Wake) -> Vec<SpawnStation> {
        (0..3)
            .map(|s| SpawnStation {
                bound_node: wake.register_bound_node(
                    Vec3::new(0.0, s as f64, 0.0),
                    0,
                    None,
                    s,
                ),
                position: Vec3::new(0.0, s as f64, 0.0),
                station: s,
                left_panel: if s > 0 { Some(s - 1) } else { None },
                right_panel: if s < 2 { Some(s) } else { None },
                core_size_sqr: 1e-4,
            })
            .collect()
    }

    fn spawn(wake: &mut Wake, stations: &[SpawnStation], gamma: &[f64], step: usize) {
        let frame = BladeSpawnFrame {
            blade: 0,
            strut: None,
            stations,
            panel_gamma: gamma,
        };
        add_wake_elements(wake, &frame, &WakeConfig::default(), step, step as f64 / 10.0);
    }

    #[test]
    fn test_spawn_counts_closed_form() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        for step in 0..5 {
            spawn(&mut wake, &stations, &[4.0, 3.0], step);
        }
        // S spawns over P panels: S*(P+1) nodes, S*(P+1) trailing, S*P shed.
        let counts = wake.counts();
        assert_eq!(counts.nodes, 15);
        assert_eq!(counts.filaments, 15 + 10);
        let shed = wake.filaments.iter().filter(|(_, f)| f.is_shed).count();
        let trailing = wake.filaments.iter().filter(|(_, f)| f.is_trailing).count();
        assert_eq!(shed, 10);
        assert_eq!(trailing, 15);
    }

    #[test]
    fn test_trailing_circulation_telescopes_to_zero() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[4.0, 3.0], 0);
        // Γ_t(s) = Γ(s-1) − Γ(s): −4, 1, 3 across the three stations.
        assert!(wake.total_trailing_gamma().abs() < 1e-12);
        let hub = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_trailing && f.is_hub)
            .unwrap()
            .1;
        assert!((hub.gamma + 4.0).abs() < 1e-12, "hub gamma {}", hub.gamma);
        let tip = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_trailing && f.is_tip)
            .unwrap()
            .1;
        assert!((tip.gamma - 3.0).abs() < 1e-12, "tip gamma {}", tip.gamma);
    }

    #[test]
    fn test_first_shed_row_is_starting_vortex() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[4.0, 3.0], 0);
        assert!((wake.total_shed_gamma() - 7.0).abs() < 1e-12);

        // Second spawn sheds only the change.
        spawn(&mut wake, &stations, &[5.0, 3.5], 1);
        assert!((wake.total_shed_gamma() - 8.5).abs() < 1e-12);
    }

    #[test]
    fn test_repointing_keeps_trailing_chain_connected() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[4.0, 3.0], 0);
        spawn(&mut wake, &stations, &[4.0, 3.0], 1);
        spawn(&mut wake, &stations, &[4.0, 3.0], 2);

        // Exactly one trailing filament per station hangs on the bound node.
        for station in &stations {
            let hanging = wake
                .filaments
                .iter()
                .filter(|(_, f)| f.is_trailing && f.leading == station.bound_node)
                .count();
            assert_eq!(hanging, 1, "station {}", station.station);
        }
        // Walking from_line from the newest filament reaches the oldest row.
        let newest = wake
            .filaments
            .iter()
            .find(|(_, f)| {
                f.is_trailing && f.from_timestep == 2 && f.leading == stations[1].bound_node
            })
            .map(|(h, _)| h)
            .unwrap();
        let mut depth = 0;
        let mut cursor = Some(newest);
        while let Some(h) = cursor {
            cursor = wake.filaments.get(h).and_then(|f| f.from_line);
            depth += 1;
        }
        assert_eq!(depth, 3, "three rows chained by from_line");
    }

    #[test]
    fn test_shed_neighbour_links() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[4.0, 3.0], 0);
        spawn(&mut wake, &stations, &[5.0, 3.0], 1);

        let newest = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_shed && f.from_timestep == 1 && f.from_station == 0)
            .map(|(h, f)| (h, f.shed_upstream))
            .unwrap();
        let up = newest.1.expect("newest shed links its older neighbour");
        let older = wake.filaments.get(up).unwrap();
        assert_eq!(older.from_timestep, 0);
        assert_eq!(older.shed_downstream, Some(newest.0));
    }

    #[test]
    fn test_refresh_row_adopts_converged_circulation() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[4.0, 3.0], 0);
        // Row spawned with the stale circulation, then the solve lands on
        // [5.0, 3.5].
        spawn(&mut wake, &stations, &[4.0, 3.0], 1);
        let frame = BladeSpawnFrame {
            blade: 0,
            strut: None,
            stations: &stations,
            panel_gamma: &[5.0, 3.5],
        };
        refresh_row_circulation(&mut wake, &frame, 1);

        let hub = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_trailing && f.is_hub && f.from_timestep == 1)
            .unwrap()
            .1;
        assert!((hub.gamma + 5.0).abs() < 1e-12, "hub trailing {}", hub.gamma);
        // Shed carries the change against row 0's circulation.
        let shed = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_shed && f.from_timestep == 1 && f.from_station == 0)
            .unwrap()
            .1;
        assert!((shed.gamma - 1.0).abs() < 1e-12, "shed {}", shed.gamma);
        // Older rows are untouched.
        let old_shed = wake
            .filaments
            .iter()
            .find(|(_, f)| f.is_shed && f.from_timestep == 0 && f.from_station == 0)
            .unwrap()
            .1;
        assert!((old_shed.gamma - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_only_newest_row_flagged_new() {
        let mut wake = Wake::new();
        let stations = rig(&mut wake);
        spawn(&mut wake, &stations, &[1.0, 1.0], 0);
        spawn(&mut wake, &stations, &[1.0, 1.0], 1);
        let new_nodes = wake
            .nodes
            .iter()
            .filter(|(_, n)| n.is_new && !n.is_bound)
            .count();
        assert_eq!(new_nodes, 3);
        assert!(wake
            .nodes
            .iter()
            .filter(|(_, n)| n.is_new)
            .all(|(_, n)| n.from_timestep == 1));
    }
}
