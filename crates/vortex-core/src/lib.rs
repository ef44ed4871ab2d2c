// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Vortex Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Free-vortex-wake rotor aerodynamics: induction kernels, circulation
//! fixed-point solver, dynamic stall, wake convection and the per-timestep
//! orchestrator.

pub mod bem;
pub mod controller;
pub mod convect;
pub mod dynstall;
pub mod gamma;
pub mod induction;
pub mod inflow;
pub mod loads;
pub mod panel;
pub mod polar;
pub mod rotor;
pub mod simulation;
pub mod velocity;
