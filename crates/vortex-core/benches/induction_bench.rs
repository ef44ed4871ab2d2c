// -------------------------------------------------------------------------
// SCPN Vortex Rotor -- Induction Pass Benchmark
// Sweeps the filament/particle source count for one full evaluation pass
// over a fixed set of evaluation points, CPU parallel-for path.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use vortex_core::induction::InductionField;
use vortex_math::Vec3;
use vortex_types::config::ParticleKernel;
use vortex_wake::{FilamentSegment, ParticleSource};

/// Helical wake-like source set, deterministic.
fn make_field(n_filaments: usize, n_particles: usize, ground: bool) -> InductionField {
    let mut field = InductionField::new(ParticleKernel::HighOrderAlgebraic, ground);
    field.add_filaments((0..n_filaments).map(|i| {
        let t = i as f64 * 0.05;
        let (s, c) = (t * 3.0).sin_cos();
        FilamentSegment {
            leading: Vec3::new(t, 20.0 * c, 60.0 + 20.0 * s),
            trailing: Vec3::new(t + 0.5, 20.0 * c, 60.0 + 20.0 * s + 0.3),
            gamma: 5.0 + (i % 7) as f64,
            core_size_sqr: 1e-2,
        }
    }));
    field.add_particles((0..n_particles).map(|i| {
        let t = i as f64 * 0.11;
        let (s, c) = (t * 2.0).sin_cos();
        ParticleSource {
            position: Vec3::new(30.0 + t, 18.0 * c, 60.0 + 18.0 * s),
            alpha: Vec3::new(1.0, 0.2 * s, 0.2 * c),
            core_size: 0.4,
            volume: 0.05,
        }
    }));
    field
}

fn make_points(n: usize) -> Vec<Vec3> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.21;
            Vec3::new(0.5 * t, 15.0 * t.cos(), 60.0 + 15.0 * t.sin())
        })
        .collect()
}

fn bench_induction_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("induction_pass");
    group.sample_size(20);
    let points = make_points(256);

    for &n in &[1_000usize, 10_000, 50_000] {
        let field = make_field(n, n / 4, false);
        group.bench_with_input(BenchmarkId::new("cpu", n), &field, |b, field| {
            b.iter(|| black_box(field.velocities_at(&points)))
        });

        let mirrored = make_field(n, n / 4, true);
        group.bench_with_input(BenchmarkId::new("cpu_ground", n), &mirrored, |b, field| {
            b.iter(|| black_box(field.velocities_at(&points)))
        });
    }
    group.finish();
}

fn bench_particle_rates(c: &mut Criterion) {
    let mut group = c.benchmark_group("particle_alpha_rates");
    group.sample_size(20);

    for &n in &[500usize, 2_000] {
        let field = make_field(0, n, false);
        let receivers: Vec<ParticleSource> = (0..n)
            .map(|i| {
                let t = i as f64 * 0.11;
                ParticleSource {
                    position: Vec3::new(30.0 + t, 18.0 * (t * 2.0).cos(), 60.0),
                    alpha: Vec3::new(1.0, 0.0, 0.1),
                    core_size: 0.4,
                    volume: 0.05,
                }
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("stretching", n), &field, |b, field| {
            b.iter(|| black_box(field.particle_alpha_rates(&receivers, Some(1.5e-5))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_induction_pass, bench_particle_rates);
criterion_main!(benches);
