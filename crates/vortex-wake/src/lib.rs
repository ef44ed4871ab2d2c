// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Vortex Wake
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Lagrangian wake storage and lifecycle.
//!
//! Nodes, filaments and particles live in per-collection arenas with
//! generational handles; all cross-references are handles, never owning
//! pointers. Lifecycle passes (spawn, truncation, coarsening, particle
//! conversion, cleanup) mutate the arenas in place between timesteps.

pub mod arena;
pub mod filament;
pub mod maintain;
pub mod node;
pub mod particle;
pub mod spawn;
pub mod wake;

pub use arena::{Arena, Handle};
pub use filament::{LineHandle, WakeFilament};
pub use node::{NodeHandle, WakeNode};
pub use particle::{ParticleHandle, WakeParticle};
pub use wake::{FilamentSegment, ParticleSource, Wake};
