// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Induction Kernels
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Desingularized Biot-Savart evaluators for straight vortex segments and
//! vortex particles, the ground mirror, and the batched evaluation field.
//!
//! Kernels are pure functions over positions and circulation/vorticity.
//! A result that would be singular or non-finite is clamped to zero: the
//! summation must keep advancing.

use rayon::prelude::*;
use vortex_math::Vec3;
use vortex_types::config::ParticleKernel;
use vortex_types::error::VortexResult;
use vortex_wake::{FilamentSegment, ParticleSource};

const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

/// Leg length below which a segment evaluation degenerates.
const LEG_FLOOR: f64 = 1e-10;

/// Velocity induced at `eval` by a finite straight filament with endpoints
/// `leading`/`trailing`, circulation `gamma` and squared core radius
/// `core_size_sqr` mixed into the denominator to desingularize the
/// near-core field.
pub fn line_induction(
    eval: Vec3,
    leading: Vec3,
    trailing: Vec3,
    gamma: f64,
    core_size_sqr: f64,
) -> Vec3 {
    let r0 = trailing - leading;
    let r1 = eval - leading;
    let r2 = eval - trailing;
    let l1 = r1.norm();
    let l2 = r2.norm();
    if l1 < LEG_FLOOR || l2 < LEG_FLOOR {
        return Vec3::ZERO;
    }
    let cross = r1.cross(r2);
    let denom = cross.norm_sqr() + core_size_sqr * r0.norm_sqr();
    if denom < 1e-24 {
        return Vec3::ZERO;
    }
    let k = gamma / (FOUR_PI * denom) * (r0.dot(r1) / l1 - r0.dot(r2) / l2);
    let v = cross * k;
    if v.is_finite() {
        v
    } else {
        Vec3::ZERO
    }
}

/// Regularization function g(ρ): fraction of the singular induction felt
/// at ρ = r/σ. g → 1 far from the core, g → 0 at the center.
fn kernel_g(kernel: ParticleKernel, rho: f64) -> f64 {
    let r2 = rho * rho;
    match kernel {
        ParticleKernel::LowOrderAlgebraic => rho * r2 / (r2 + 1.0).powf(1.5),
        ParticleKernel::HighOrderAlgebraic => rho * r2 * (r2 + 2.5) / (r2 + 1.0).powf(2.5),
        ParticleKernel::Gaussian => 1.0 - (-rho * r2).exp(),
    }
}

/// dg/dρ for the stretching gradient.
fn kernel_dg(kernel: ParticleKernel, rho: f64) -> f64 {
    let r2 = rho * rho;
    match kernel {
        ParticleKernel::LowOrderAlgebraic => 3.0 * r2 / (r2 + 1.0).powf(2.5),
        ParticleKernel::HighOrderAlgebraic => 7.5 * r2 / (r2 + 1.0).powf(3.5),
        ParticleKernel::Gaussian => 3.0 * r2 * (-rho * r2).exp(),
    }
}

/// Velocity induced at `eval` by one vortex particle.
pub fn particle_induction(eval: Vec3, source: &ParticleSource, kernel: ParticleKernel) -> Vec3 {
    let r = eval - source.position;
    let rn = r.norm();
    if rn < LEG_FLOOR {
        return Vec3::ZERO;
    }
    let sigma = source.core_size.max(LEG_FLOOR);
    let g = kernel_g(kernel, rn / sigma);
    let v = source.alpha.cross(r) * (g / (FOUR_PI * rn * rn * rn));
    if v.is_finite() {
        v
    } else {
        Vec3::ZERO
    }
}

/// Vorticity rate of change of a receiver particle due to one source
/// particle: the transpose-scheme vortex stretching term
/// `dα_r/dt = (∇u_s)ᵀ α_r`.
pub fn particle_stretching(
    receiver_position: Vec3,
    receiver_alpha: Vec3,
    source: &ParticleSource,
    kernel: ParticleKernel,
) -> Vec3 {
    let r = receiver_position - source.position;
    let rn = r.norm();
    if rn < LEG_FLOOR {
        return Vec3::ZERO;
    }
    let sigma = source.core_size.max(LEG_FLOOR);
    let rho = rn / sigma;
    let g = kernel_g(kernel, rho);
    let dg = kernel_dg(kernel, rho);
    let rn3 = rn * rn * rn;
    let f = g / (FOUR_PI * rn3);
    // f'(r)/r with f(r) = g(ρ) / (4π r³)
    let fprime_over_r = (dg / (sigma * rn3) - 3.0 * g / (rn3 * rn)) / (FOUR_PI * rn);
    let rate = receiver_alpha.cross(source.alpha) * f
        + r * (fprime_over_r * source.alpha.cross(r).dot(receiver_alpha));
    if rate.is_finite() {
        rate
    } else {
        Vec3::ZERO
    }
}

/// Particle-strength-exchange diffusion between a receiver and one source,
/// high-order algebraic regularization of the Laplacian.
pub fn particle_exchange(
    receiver_position: Vec3,
    receiver_alpha: Vec3,
    receiver_volume: f64,
    source: &ParticleSource,
    viscosity: f64,
) -> Vec3 {
    let r = receiver_position - source.position;
    let rn = r.norm();
    let sigma = source.core_size.max(LEG_FLOOR);
    if rn < LEG_FLOOR {
        return Vec3::ZERO;
    }
    let rho = rn / sigma;
    let eta = 105.0 / (8.0 * std::f64::consts::PI) / (rho * rho + 1.0).powf(4.5);
    let eta_sigma = eta / (sigma * sigma * sigma);
    let rate = (source.alpha * receiver_volume - receiver_alpha * source.volume)
        * (2.0 * viscosity / (sigma * sigma) * eta_sigma);
    if rate.is_finite() {
        rate
    } else {
        Vec3::ZERO
    }
}

fn mirror_segment(seg: &FilamentSegment) -> FilamentSegment {
    FilamentSegment {
        leading: Vec3::new(seg.leading.x, seg.leading.y, -seg.leading.z),
        trailing: Vec3::new(seg.trailing.x, seg.trailing.y, -seg.trailing.z),
        gamma: -seg.gamma,
        core_size_sqr: seg.core_size_sqr,
    }
}

fn mirror_particle(p: &ParticleSource) -> ParticleSource {
    ParticleSource {
        position: Vec3::new(p.position.x, p.position.y, -p.position.z),
        alpha: Vec3::new(-p.alpha.x, -p.alpha.y, p.alpha.z),
        core_size: p.core_size,
        volume: p.volume,
    }
}

/// Read-only snapshot of every induction source for one pass.
///
/// Sources are frozen while evaluation points are swept in parallel;
/// each destination writes only its own slot.
pub struct InductionField {
    filaments: Vec<FilamentSegment>,
    particles: Vec<ParticleSource>,
    kernel: ParticleKernel,
    ground_mirror: bool,
}

impl InductionField {
    pub fn new(kernel: ParticleKernel, ground_mirror: bool) -> Self {
        InductionField {
            filaments: Vec::new(),
            particles: Vec::new(),
            kernel,
            ground_mirror,
        }
    }

    pub fn kernel(&self) -> ParticleKernel {
        self.kernel
    }

    pub fn ground_mirror(&self) -> bool {
        self.ground_mirror
    }

    pub fn add_filaments<I: IntoIterator<Item = FilamentSegment>>(&mut self, segments: I) {
        self.filaments.extend(segments);
    }

    pub fn add_particles<I: IntoIterator<Item = ParticleSource>>(&mut self, particles: I) {
        self.particles.extend(particles);
    }

    pub fn source_count(&self) -> usize {
        let base = self.filaments.len() + self.particles.len();
        if self.ground_mirror {
            2 * base
        } else {
            base
        }
    }

    /// Induced velocity at one evaluation point, all sources summed.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        let mut v = Vec3::ZERO;
        for seg in &self.filaments {
            v += line_induction(point, seg.leading, seg.trailing, seg.gamma, seg.core_size_sqr);
            if self.ground_mirror {
                let m = mirror_segment(seg);
                v += line_induction(point, m.leading, m.trailing, m.gamma, m.core_size_sqr);
            }
        }
        for p in &self.particles {
            v += particle_induction(point, p, self.kernel);
            if self.ground_mirror {
                v += particle_induction(point, &mirror_particle(p), self.kernel);
            }
        }
        v
    }

    /// Data-parallel sweep over evaluation points (fork-join; the caller
    /// resumes only after every point is done).
    pub fn velocities_at(&self, points: &[Vec3]) -> Vec<Vec3> {
        points.par_iter().map(|&p| self.velocity_at(p)).collect()
    }

    /// Same sweep through a batched accelerator backend when one is
    /// given, the CPU parallel-for otherwise. The two paths are required
    /// to agree at single precision.
    pub fn velocities_at_device<'b>(
        &self,
        points: &[Vec3],
        backend: Option<&mut (dyn BatchedInduction + 'b)>,
    ) -> VortexResult<Vec<Vec3>> {
        let Some(backend) = backend else {
            return Ok(self.velocities_at(points));
        };
        let flat_points: Vec<[f32; 4]> = points
            .iter()
            .map(|p| [p.x as f32, p.y as f32, p.z as f32, 0.0])
            .collect();
        let (endpoints_a, endpoints_b) = self.flat_filaments();
        let from_filaments =
            backend.filament_velocities(&flat_points, &endpoints_a, &endpoints_b)?;
        let (positions, alphas) = self.flat_particles();
        let from_particles =
            backend.particle_velocities(&flat_points, &positions, &alphas, self.kernel)?;
        Ok(from_filaments
            .iter()
            .zip(&from_particles)
            .map(|(f, p)| {
                Vec3::new(
                    (f[0] + p[0]) as f64,
                    (f[1] + p[1]) as f64,
                    (f[2] + p[2]) as f64,
                )
            })
            .collect())
    }

    /// Vorticity rates of change for a set of receiver particles:
    /// stretching from every source, plus strength exchange when a
    /// viscosity is given.
    pub fn particle_alpha_rates(
        &self,
        receivers: &[ParticleSource],
        exchange_viscosity: Option<f64>,
    ) -> Vec<Vec3> {
        receivers
            .par_iter()
            .map(|receiver| {
                let mut rate = Vec3::ZERO;
                for p in &self.particles {
                    rate += particle_stretching(
                        receiver.position,
                        receiver.alpha,
                        p,
                        self.kernel,
                    );
                    if let Some(nu) = exchange_viscosity {
                        rate += particle_exchange(
                            receiver.position,
                            receiver.alpha,
                            receiver.volume,
                            p,
                            nu,
                        );
                    }
                    if self.ground_mirror {
                        let m = mirror_particle(p);
                        rate += particle_stretching(
                            receiver.position,
                            receiver.alpha,
                            &m,
                            self.kernel,
                        );
                    }
                }
                rate
            })
            .collect()
    }

    /// Flatten filament sources for the accelerator path, ground mirrors
    /// replicated directly in the arrays: `(position.xyz, core²)` and
    /// `(position.xyz, gamma)`.
    pub fn flat_filaments(&self) -> (Vec<[f32; 4]>, Vec<[f32; 4]>) {
        let mut a = Vec::with_capacity(self.filaments.len() * 2);
        let mut b = Vec::with_capacity(self.filaments.len() * 2);
        let mut push = |seg: &FilamentSegment| {
            a.push([
                seg.leading.x as f32,
                seg.leading.y as f32,
                seg.leading.z as f32,
                seg.core_size_sqr as f32,
            ]);
            b.push([
                seg.trailing.x as f32,
                seg.trailing.y as f32,
                seg.trailing.z as f32,
                seg.gamma as f32,
            ]);
        };
        for seg in &self.filaments {
            push(seg);
            if self.ground_mirror {
                push(&mirror_segment(seg));
            }
        }
        (a, b)
    }

    /// Flatten particle sources: `(position.xyz, core)` and `(alpha.xyz, volume)`.
    pub fn flat_particles(&self) -> (Vec<[f32; 4]>, Vec<[f32; 4]>) {
        let mut pos = Vec::with_capacity(self.particles.len() * 2);
        let mut alpha = Vec::with_capacity(self.particles.len() * 2);
        let mut push = |p: &ParticleSource| {
            pos.push([
                p.position.x as f32,
                p.position.y as f32,
                p.position.z as f32,
                p.core_size as f32,
            ]);
            alpha.push([p.alpha.x as f32, p.alpha.y as f32, p.alpha.z as f32, p.volume as f32]);
        };
        for p in &self.particles {
            push(p);
            if self.ground_mirror {
                push(&mirror_particle(p));
            }
        }
        (pos, alpha)
    }
}

/// Batched accelerator contract: flat arrays in, induced velocities out,
/// one output per evaluation point. A zero-source call is a no-op and
/// returns zeros. Numerical equivalence with the CPU path is required at
/// single precision.
pub trait BatchedInduction: Send {
    fn filament_velocities(
        &mut self,
        points: &[[f32; 4]],
        endpoints_a: &[[f32; 4]],
        endpoints_b: &[[f32; 4]],
    ) -> VortexResult<Vec<[f32; 3]>>;

    fn particle_velocities(
        &mut self,
        points: &[[f32; 4]],
        positions: &[[f32; 4]],
        alphas: &[[f32; 4]],
        kernel: ParticleKernel,
    ) -> VortexResult<Vec<[f32; 3]>>;
}
