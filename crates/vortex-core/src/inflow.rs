// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Inflow
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inflow provider contract and the analytic implementations.

use vortex_math::Vec3;

/// Free-stream velocity provider.
///
/// Must be a pure function of `(point, time)` for fixed boundary-condition
/// state, and safe to call concurrently from the induction worker threads.
pub trait Inflow: Sync + Send {
    fn free_stream(&self, point: Vec3, time: f64) -> Vec3;

    /// Time-averaged free stream, defaults to the instantaneous value.
    fn mean_free_stream(&self, point: Vec3) -> Vec3 {
        self.free_stream(point, 0.0)
    }

    /// Flow acceleration, zero for steady inflow.
    fn acceleration(&self, _point: Vec3, _time: f64) -> Vec3 {
        Vec3::ZERO
    }
}

/// Uniform inflow along a fixed direction.
#[derive(Debug, Clone, Copy)]
pub struct UniformInflow {
    pub speed: f64,
    pub direction: Vec3,
}

impl UniformInflow {
    pub fn axial(speed: f64) -> Self {
        UniformInflow {
            speed,
            direction: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

impl Inflow for UniformInflow {
    fn free_stream(&self, _point: Vec3, _time: f64) -> Vec3 {
        self.direction.normalized() * self.speed
    }
}

/// Power-law sheared inflow over flat terrain, wind along +x.
#[derive(Debug, Clone, Copy)]
pub struct PowerLawInflow {
    pub reference_speed: f64,
    pub reference_height: f64,
    pub shear_exponent: f64,
}

impl Inflow for PowerLawInflow {
    fn free_stream(&self, point: Vec3, _time: f64) -> Vec3 {
        if point.z <= 0.0 || self.reference_height <= 0.0 {
            return Vec3::ZERO;
        }
        let speed = self.reference_speed * (point.z / self.reference_height).powf(self.shear_exponent);
        Vec3::new(speed, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_inflow_is_position_independent() {
        let inflow = UniformInflow::axial(10.0);
        let a = inflow.free_stream(Vec3::ZERO, 0.0);
        let b = inflow.free_stream(Vec3::new(100.0, -50.0, 30.0), 12.0);
        assert!((a - b).norm() < 1e-14);
        assert!((a.x - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_law_matches_reference_height() {
        let inflow = PowerLawInflow {
            reference_speed: 8.0,
            reference_height: 90.0,
            shear_exponent: 0.2,
        };
        let at_ref = inflow.free_stream(Vec3::new(0.0, 0.0, 90.0), 0.0);
        assert!((at_ref.x - 8.0).abs() < 1e-12);
        let above = inflow.free_stream(Vec3::new(0.0, 0.0, 180.0), 0.0);
        assert!(above.x > 8.0, "speed grows with height: {}", above.x);
        let below_ground = inflow.free_stream(Vec3::new(0.0, 0.0, -1.0), 0.0);
        assert_eq!(below_ground, Vec3::ZERO);
    }
}
