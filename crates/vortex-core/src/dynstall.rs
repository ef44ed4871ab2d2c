// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Dynamic Stall
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-panel unsteady aerodynamics state machines: Oye, Gormont-Berg and
//! the ATEFLAP indicial-response model. Executed once per outer timestep
//! after the circulation has converged on the steady polar; all three
//! collapse onto the static polar when the lag filters settle.

use crate::polar::AeroCoefficients;
use vortex_types::config::{DynamicStallConfig, DynamicStallModel};
use vortex_types::constants::{
    CL_SAFETY_CLAMP, DENOMINATOR_FLOOR, GORMONT_K1, JONES_A1, JONES_A2, JONES_B1, JONES_B2,
};

/// Relative velocity floor for the lag time constants.
const VELOCITY_FLOOR: f64 = 0.01;

/// Re-lookup of the static polar at an arbitrary angle of attack,
/// provided by the caller (Gormont-Berg evaluates the curve at its
/// shifted reference angle).
pub type PolarLookup<'a> = &'a dyn Fn(f64) -> AeroCoefficients;

/// Per-panel dynamic-stall state, a fixed-size value type.
#[derive(Debug, Clone)]
pub enum DynStallState {
    None,
    Oye(OyeState),
    GormontBerg(GbState),
    Ateflap(AteflapState),
}

impl DynStallState {
    pub fn for_model(model: DynamicStallModel) -> Self {
        match model {
            DynamicStallModel::None => DynStallState::None,
            DynamicStallModel::Oye => DynStallState::Oye(OyeState::default()),
            DynamicStallModel::GormontBerg => DynStallState::GormontBerg(GbState::default()),
            DynamicStallModel::Ateflap => DynStallState::Ateflap(AteflapState::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OyeState {
    pub f_dyn: f64,
    pub f_dyn_old: f64,
    initialized: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GbState {
    pub alpha_old_deg: f64,
    initialized: bool,
}

/// Indicial-response state: ten first-order channels with their `_old`
/// shadow and the two previous forcing samples per channel.
///
/// Channels: 0/1 circulatory angle (Jones A1/A2), 2/3 flap deflection,
/// 4 pressure lag, 5 separation lag, 6 pitch-rate filter, 7 flap-rate
/// filter, 8 moment effective angle, 9 flap drag-channel lag.
#[derive(Debug, Clone, Copy)]
pub struct AteflapState {
    pub x: [f64; 10],
    pub x_old: [f64; 10],
    pub q1: [f64; 10],
    pub q2: [f64; 10],
    initialized: bool,
}

impl Default for AteflapState {
    fn default() -> Self {
        AteflapState {
            x: [0.0; 10],
            x_old: [0.0; 10],
            q1: [0.0; 10],
            q2: [0.0; 10],
            initialized: false,
        }
    }
}

/// Everything the correction needs for one panel at one step.
#[derive(Debug, Clone, Copy)]
pub struct UnsteadySample {
    pub coeffs: AeroCoefficients,
    /// Quarter-chord angle of attack, degrees.
    pub alpha_deg: f64,
    /// Three-quarter-chord quasi-steady angle, degrees.
    pub alpha_qs_deg: f64,
    pub alpha_old_deg: f64,
    pub v_rel: f64,
    pub chord: f64,
    pub thickness_ratio: f64,
    pub dt: f64,
    pub flap_state: f64,
    pub flap_state_old: f64,
    /// Lift sensitivity of the active flap, per unit flap state.
    pub dcl_dflap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedCoefficients {
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
}

/// Exact one-step update of the first-order lag `x' = p (f - x)` with the
/// forcing taken as the parabola through the current sample `f0`, the
/// previous `f1` and the one before `f2`. The decay factor is
/// `C = exp(-p dt)`; the increment integrates the parabola against the
/// exponential kernel in closed form. An approximate Euler/RK step here
/// does not reproduce reference results.
pub fn exp_recurrence(x_old: f64, p: f64, dt: f64, f0: f64, f1: f64, f2: f64) -> f64 {
    if p <= 0.0 || dt <= 0.0 || !p.is_finite() {
        return f0;
    }
    let pdt = p * dt;
    let c = (-pdt).exp();
    if pdt < 1e-9 {
        // Degenerate rate: the state barely moves.
        return x_old + pdt * (f1 - x_old);
    }
    // f(s) = a0 + b s + c2 s², s in [0, dt], through f(-dt)=f2, f(0)=f1, f(dt)=f0.
    let a0 = f1;
    let b = (f0 - f2) / (2.0 * dt);
    let c2 = (f0 - 2.0 * f1 + f2) / (2.0 * dt * dt);
    let j0 = (1.0 - c) / p;
    let int_u = (1.0 - c * (1.0 + pdt)) / (p * p);
    let int_u2 = (2.0 - c * (2.0 + 2.0 * pdt + pdt * pdt)) / (p * p * p);
    let j1 = dt * j0 - int_u;
    let j2 = dt * dt * j0 - 2.0 * dt * int_u + int_u2;
    c * x_old + p * (a0 * j0 + b * j1 + c2 * j2)
}

fn clamp_cl(cl: f64) -> f64 {
    cl.clamp(-CL_SAFETY_CLAMP, CL_SAFETY_CLAMP)
}

fn passthrough(s: &UnsteadySample) -> CorrectedCoefficients {
    CorrectedCoefficients {
        cl: clamp_cl(s.coeffs.cl),
        cd: s.coeffs.cd,
        cm: s.coeffs.cm,
    }
}

/// Dispatch the configured model, returning corrected coefficients and
/// updating the per-panel state in place. Persisting the `_old` shadow
/// state for the next step's finite differences happens here.
pub fn dynamic_stall_correction(
    cfg: &DynamicStallConfig,
    state: &mut DynStallState,
    s: &UnsteadySample,
    lookup: PolarLookup,
) -> CorrectedCoefficients {
    // A dead lift curve means the polar has nothing to lag.
    if s.coeffs.lift_slope.abs() < 1e-6 || s.dt <= 0.0 {
        return passthrough(s);
    }
    match state {
        DynStallState::None => passthrough(s),
        DynStallState::Oye(oye) => oye_correction(cfg, oye, s),
        DynStallState::GormontBerg(gb) => gormont_berg_correction(cfg, gb, s, lookup),
        DynStallState::Ateflap(at) => ateflap_correction(cfg, at, s),
    }
}

/// Oye: first-order lag of the separation function toward its steady
/// value, blending the attached and fully-separated lift curves; drag
/// corrected by the Bergami term.
fn oye_correction(
    cfg: &DynamicStallConfig,
    state: &mut OyeState,
    s: &UnsteadySample,
) -> CorrectedCoefficients {
    let f_st = s.coeffs.f_separation.clamp(0.0, 1.0);
    if !state.initialized {
        state.f_dyn = f_st;
        state.initialized = true;
    }
    let tau = cfg.tf * s.chord / (2.0 * s.v_rel.max(VELOCITY_FLOOR));
    state.f_dyn_old = state.f_dyn;
    state.f_dyn = f_st + (state.f_dyn_old - f_st) * (-s.dt / tau.max(1e-9)).exp();
    let f = state.f_dyn.clamp(0.0, 1.0);

    let cl = if s.coeffs.uses_decomposition {
        f * s.coeffs.cl_attached + (1.0 - f) * s.coeffs.cl_separated
    } else {
        s.coeffs.cl
    };
    let dcd = (s.coeffs.cd - s.coeffs.cd_zero)
        * ((f_st.sqrt() - f.sqrt()) / 2.0 - (f_st - f) / 4.0);
    CorrectedCoefficients {
        cl: clamp_cl(cl),
        cd: s.coeffs.cd + dcd,
        cm: s.coeffs.cm,
    }
}

/// Gormont-Berg: empirical reference-angle shift proportional to the
/// square root of the reduced pitch rate; the static curve is re-read at
/// the reference angle and rescaled, then blended back onto the static
/// curve beyond stall by the Am constant.
fn gormont_berg_correction(
    cfg: &DynamicStallConfig,
    state: &mut GbState,
    s: &UnsteadySample,
    lookup: PolarLookup,
) -> CorrectedCoefficients {
    if !state.initialized {
        state.alpha_old_deg = s.alpha_deg;
        state.initialized = true;
    }
    let alpha_dot_rad = (s.alpha_deg - state.alpha_old_deg).to_radians() / s.dt;
    state.alpha_old_deg = s.alpha_deg;

    let v = s.v_rel.max(VELOCITY_FLOOR);
    let reduced = (GORMONT_K1 * s.chord * alpha_dot_rad.abs() / (2.0 * v)).sqrt();
    let tc = s.thickness_ratio;
    // Gormont thickness fits.
    // Alternate fit: y_l = 1.4 - 6.0 * (t/c - 0.06)
    let y_l = 1.4 - 6.0 * (0.06 - tc);
    let y_d = 1.0 - 2.5 * (0.06 - tc);
    let delta_deg = (reduced * alpha_dot_rad.signum()).to_degrees();

    let alpha0 = s.coeffs.alpha_zero_deg;
    let alpha_ref_l = s.alpha_deg - y_l * delta_deg;
    let alpha_ref_d = s.alpha_deg - y_d * delta_deg;

    // Static curve at the shifted reference angle, rescaled back to the
    // geometric angle.
    let at_ref = lookup(alpha_ref_l);
    let mut denom = alpha_ref_l - alpha0;
    if !denom.is_finite() || denom.abs() < DENOMINATOR_FLOOR {
        denom = DENOMINATOR_FLOOR * if denom < 0.0 { -1.0 } else { 1.0 };
    }
    let cl_dyn = at_ref.cl * (s.alpha_deg - alpha0) / denom;
    let cd_dyn = lookup(alpha_ref_d).cd;

    // Berg blending toward the static curve between alpha_ss and Am*alpha_ss.
    let alpha_ss = if s.alpha_deg >= alpha0 {
        s.coeffs.alpha_cl_max_deg - alpha0
    } else {
        alpha0 - s.coeffs.alpha_cl_min_deg
    };
    let excursion = (s.alpha_deg - alpha0).abs();
    let mut blend_denom = (cfg.am - 1.0) * alpha_ss;
    if !blend_denom.is_finite() || blend_denom.abs() < DENOMINATOR_FLOOR {
        blend_denom = DENOMINATOR_FLOOR;
    }
    let w = ((cfg.am * alpha_ss - excursion) / blend_denom).clamp(0.0, 1.0);

    CorrectedCoefficients {
        cl: clamp_cl(w * cl_dyn + (1.0 - w) * s.coeffs.cl),
        cd: w * cd_dyn + (1.0 - w) * s.coeffs.cd,
        cm: s.coeffs.cm,
    }
}

/// ATEFLAP: Duhamel superposition over the ten-channel state vector with
/// the exact parabolic-forcing recurrence, non-circulatory lift from
/// pitch and flap rate, induced-drag correction from the effective-angle
/// deficit, and a lagged flap channel.
fn ateflap_correction(
    cfg: &DynamicStallConfig,
    state: &mut AteflapState,
    s: &UnsteadySample,
) -> CorrectedCoefficients {
    let v = s.v_rel.max(VELOCITY_FLOOR);
    let tds = 2.0 * v / s.chord.max(1e-6);
    let dt = s.dt;
    let alpha_qs = s.alpha_qs_deg;
    let slope_rad = s.coeffs.lift_slope;
    let alpha0 = s.coeffs.alpha_zero_deg;

    let alpha_dot_rad = (s.alpha_deg - s.alpha_old_deg).to_radians() / dt;
    let flap_dot = (s.flap_state - s.flap_state_old) / dt;

    // Per-channel rates and forcings.
    let rates = [
        JONES_B1 * tds,
        JONES_B2 * tds,
        JONES_B1 * tds,
        JONES_B2 * tds,
        2.0 * v / (cfg.tp * s.chord).max(1e-9),
        2.0 * v / (cfg.tf_ateflap * s.chord).max(1e-9),
        tds,
        tds,
        0.5 * tds,
        JONES_B2 * tds,
    ];
    let f_st = s.coeffs.f_separation.clamp(0.0, 1.0);
    let cl_pot = slope_rad * (alpha_qs - alpha0).to_radians() + s.dcl_dflap * s.flap_state;
    let forcings = [
        JONES_A1 * alpha_qs,
        JONES_A2 * alpha_qs,
        JONES_A1 * s.flap_state,
        JONES_A2 * s.flap_state,
        cl_pot,
        f_st,
        alpha_dot_rad,
        flap_dot,
        alpha_qs,
        s.flap_state,
    ];

    if !state.initialized {
        // Seed at the steady state: no startup transient.
        state.x = forcings;
        state.q1 = forcings;
        state.q2 = forcings;
        state.initialized = true;
    }
    state.x_old = state.x;
    for i in 0..10 {
        state.x[i] = exp_recurrence(
            state.x_old[i],
            rates[i],
            dt,
            forcings[i],
            state.q1[i],
            state.q2[i],
        );
    }
    state.q2 = state.q1;
    state.q1 = forcings;

    let alpha_eff = alpha_qs * (1.0 - JONES_A1 - JONES_A2) + state.x[0] + state.x[1];
    let flap_eff = s.flap_state * (1.0 - JONES_A1 - JONES_A2) + state.x[2] + state.x[3];
    let f_dyn = state.x[5].clamp(0.0, 1.0);

    // Circulatory lift at the effective angle and flap state.
    let cl_att_eff = slope_rad * (alpha_eff - alpha0).to_radians() + s.dcl_dflap * flap_eff;
    let cl_circ = if s.coeffs.uses_decomposition {
        let shift = cl_att_eff - s.coeffs.cl_attached - s.dcl_dflap * s.flap_state;
        f_dyn * (s.coeffs.cl_attached + shift) + (1.0 - f_dyn) * (s.coeffs.cl_separated + shift)
    } else {
        s.coeffs.cl + slope_rad * (alpha_eff - alpha_qs).to_radians()
    };

    // Non-circulatory (added-mass) lift from the filtered pitch and flap
    // rates.
    let cl_nc = std::f64::consts::PI * s.chord * state.x[6] / (2.0 * v)
        + 0.25 * s.dcl_dflap * s.chord * state.x[7] / v;
    let cl = cl_circ + cl_nc;

    // Induced drag from the quasi-steady vs effective angle deficit, plus
    // the lagged flap drag channel.
    let cd = s.coeffs.cd
        + cl_circ * (alpha_qs - alpha_eff).to_radians()
        + s.coeffs.dcd_dalpha * (state.x[9] - s.flap_state);

    // Moment follows its own effective angle plus the pitch-rate term.
    let cm = s.coeffs.cm + s.coeffs.dcm_dalpha * (state.x[8] - alpha_qs)
        - std::f64::consts::PI * s.chord * state.x[6] / (8.0 * v);

    CorrectedCoefficients {
        cl: clamp_cl(cl),
        cd,
        cm,
    }
}
