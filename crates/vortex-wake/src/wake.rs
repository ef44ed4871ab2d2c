// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Wake Collections
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The mutable wake state of one rotor: node/filament/particle arenas plus
//! the per-blade spawn memory. Exclusively owned by one simulation
//! instance; neighbouring rotors only ever see the flattened read-only
//! source snapshots.

use crate::arena::Arena;
use crate::filament::{LineHandle, WakeFilament};
use crate::node::{NodeHandle, WakeNode};
use crate::particle::{ParticleHandle, WakeParticle};
use std::collections::HashMap;
use vortex_math::Vec3;
use vortex_types::state::ElementCounts;

/// Flattened straight-segment induction source.
#[derive(Debug, Clone, Copy)]
pub struct FilamentSegment {
    pub leading: Vec3,
    pub trailing: Vec3,
    pub gamma: f64,
    pub core_size_sqr: f64,
}

/// Flattened particle induction source.
#[derive(Debug, Clone, Copy)]
pub struct ParticleSource {
    pub position: Vec3,
    pub alpha: Vec3,
    pub core_size: f64,
    pub volume: f64,
}

/// Identifies one spawning lifting surface (blade or strut).
pub type SurfaceKey = (usize, Option<usize>);

/// Per-surface memory of the last spawned row.
#[derive(Debug, Default, Clone)]
pub struct RowMemory {
    pub nodes: Vec<NodeHandle>,
    pub shed: Vec<Option<LineHandle>>,
    pub panel_gamma: Vec<f64>,
    /// Circulation of the row before this one, for shed bookkeeping when
    /// the newest row is refreshed after the Gamma solve.
    pub prev_panel_gamma: Vec<f64>,
}

#[derive(Default)]
pub struct Wake {
    pub nodes: Arena<WakeNode>,
    pub filaments: Arena<WakeFilament>,
    pub particles: Arena<WakeParticle>,
    /// Largest bound circulation magnitude seen so far; scales the
    /// weak-filament truncation threshold.
    pub max_gamma: f64,
    /// Timesteps of the two most recent spawn calls; their rows are
    /// protected from cleanup and truncation.
    pub protected_steps: [Option<usize>; 2],
    pub(crate) row_memory: HashMap<SurfaceKey, RowMemory>,
}

impl Wake {
    pub fn new() -> Self {
        Wake::default()
    }

    /// Register a bound trailing-edge node owned by the panel geometry.
    pub fn register_bound_node(
        &mut self,
        position: Vec3,
        blade: usize,
        strut: Option<usize>,
        station: usize,
    ) -> NodeHandle {
        self.nodes
            .insert(WakeNode::bound(position, blade, strut, station))
    }

    /// Free (convecting) wake nodes, bound trailing-edge nodes excluded.
    pub fn free_node_count(&self) -> usize {
        self.nodes.iter().filter(|(_, n)| !n.is_bound).count()
    }

    pub fn counts(&self) -> ElementCounts {
        ElementCounts {
            nodes: self.free_node_count(),
            filaments: self.filaments.len(),
            particles: self.particles.len(),
        }
    }

    pub fn filament_length(&self, line: &WakeFilament) -> Option<f64> {
        let l = self.nodes.get(line.leading)?.position;
        let t = self.nodes.get(line.trailing)?.position;
        Some((t - l).norm())
    }

    pub fn filament_midpoint(&self, line: &WakeFilament) -> Option<Vec3> {
        let l = self.nodes.get(line.leading)?.position;
        let t = self.nodes.get(line.trailing)?.position;
        Some((l + t) * 0.5)
    }

    /// Connect a filament to both endpoint nodes and store it.
    pub fn connect_filament(&mut self, filament: WakeFilament) -> LineHandle {
        let leading = filament.leading;
        let trailing = filament.trailing;
        let handle = self.filaments.insert(filament);
        if let Some(node) = self.nodes.get_mut(leading) {
            node.attached.push(handle);
        }
        if let Some(node) = self.nodes.get_mut(trailing) {
            node.attached.push(handle);
        }
        handle
    }

    /// Disconnect a filament: drop endpoint back-references, relink shed
    /// neighbours across the gap, remove from the arena.
    pub fn disconnect_filament(&mut self, handle: LineHandle) -> Option<WakeFilament> {
        let filament = self.filaments.remove(handle)?;
        if let Some(node) = self.nodes.get_mut(filament.leading) {
            node.detach(handle);
        }
        if let Some(node) = self.nodes.get_mut(filament.trailing) {
            node.detach(handle);
        }
        if let Some(up) = filament.shed_upstream {
            if let Some(line) = self.filaments.get_mut(up) {
                line.shed_downstream = filament.shed_downstream;
            }
        }
        if let Some(down) = filament.shed_downstream {
            if let Some(line) = self.filaments.get_mut(down) {
                line.shed_upstream = filament.shed_upstream;
            }
        }
        Some(filament)
    }

    /// Delete a free node together with every filament still attached.
    pub fn delete_node(&mut self, handle: NodeHandle) {
        let attached = match self.nodes.get(handle) {
            Some(node) if !node.is_bound => node.attached.clone(),
            _ => return,
        };
        for line in attached {
            self.disconnect_filament(line);
        }
        self.nodes.remove(handle);
    }

    pub fn remove_particle(&mut self, handle: ParticleHandle) {
        self.particles.remove(handle);
    }

    /// Flatten all live filaments into induction sources.
    pub fn filament_segments(&self) -> Vec<FilamentSegment> {
        self.filaments
            .iter()
            .filter_map(|(_, line)| {
                let leading = self.nodes.get(line.leading)?.position;
                let trailing = self.nodes.get(line.trailing)?.position;
                Some(FilamentSegment {
                    leading,
                    trailing,
                    gamma: line.gamma,
                    core_size_sqr: line.core_size_sqr,
                })
            })
            .collect()
    }

    /// Flatten all live particles into induction sources.
    pub fn particle_sources(&self) -> Vec<ParticleSource> {
        self.particles
            .iter()
            .map(|(_, p)| ParticleSource {
                position: p.position,
                alpha: p.alpha,
                core_size: p.core_size,
                volume: p.volume,
            })
            .collect()
    }

    /// Sum of shed filament circulation (conservation bookkeeping).
    pub fn total_shed_gamma(&self) -> f64 {
        self.filaments
            .iter()
            .filter(|(_, l)| l.is_shed)
            .map(|(_, l)| l.gamma)
            .sum()
    }

    /// Sum of trailing filament circulation (conservation bookkeeping).
    pub fn total_trailing_gamma(&self) -> f64 {
        self.filaments
            .iter()
            .filter(|(_, l)| l.is_trailing)
            .map(|(_, l)| l.gamma)
            .sum()
    }

    /// A node row is protected while it belongs to one of the two most
    /// recent spawn calls.
    pub fn is_protected_step(&self, timestep: usize) -> bool {
        self.protected_steps
            .iter()
            .any(|s| *s == Some(timestep))
    }

    pub(crate) fn push_protected_step(&mut self, timestep: usize) {
        if self.protected_steps[0] == Some(timestep) {
            return;
        }
        self.protected_steps[1] = self.protected_steps[0];
        self.protected_steps[0] = Some(timestep);
    }

    pub fn row_memory(&self, key: &SurfaceKey) -> Option<&RowMemory> {
        self.row_memory.get(key)
    }
}
