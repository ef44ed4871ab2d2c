// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Property-Based Tests (proptest) for vortex-math
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for vortex-math using proptest.
//!
//! Covers: Vec3 algebra identities, Rodrigues rotation invariants,
//! frame round-trips.

use proptest::prelude::*;
use vortex_math::frame::{rotate_about_axis, Frame};
use vortex_math::vec3::Vec3;

fn finite_component() -> impl Strategy<Value = f64> {
    -100.0f64..100.0
}

fn vec3_strategy() -> impl Strategy<Value = Vec3> {
    (finite_component(), finite_component(), finite_component())
        .prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    /// Scalar triple product is invariant under cyclic permutation.
    #[test]
    fn triple_product_cyclic(a in vec3_strategy(), b in vec3_strategy(), c in vec3_strategy()) {
        let t1 = a.dot(b.cross(c));
        let t2 = b.dot(c.cross(a));
        let scale = 1.0 + a.norm() * b.norm() * c.norm();
        prop_assert!((t1 - t2).abs() / scale < 1e-9, "t1={t1}, t2={t2}");
    }

    /// Cross product is orthogonal to both factors.
    #[test]
    fn cross_orthogonality(a in vec3_strategy(), b in vec3_strategy()) {
        let c = a.cross(b);
        let scale = 1.0 + a.norm() * b.norm();
        prop_assert!(c.dot(a).abs() / scale < 1e-9);
        prop_assert!(c.dot(b).abs() / scale < 1e-9);
    }

    /// Rotation preserves length for any axis and angle.
    #[test]
    fn rotation_is_isometric(
        v in vec3_strategy(),
        axis in vec3_strategy(),
        angle in -10.0f64..10.0,
    ) {
        prop_assume!(axis.norm() > 1e-6);
        let r = rotate_about_axis(v, axis, angle);
        prop_assert!((r.norm() - v.norm()).abs() < 1e-8 * (1.0 + v.norm()));
    }

    /// Rotating forward then backward restores the vector.
    #[test]
    fn rotation_inverts(
        v in vec3_strategy(),
        axis in vec3_strategy(),
        angle in -6.0f64..6.0,
    ) {
        prop_assume!(axis.norm() > 1e-6);
        let back = rotate_about_axis(rotate_about_axis(v, axis, angle), axis, -angle);
        prop_assert!((back - v).norm() < 1e-8 * (1.0 + v.norm()));
    }

    /// Frame local/world round-trip is the identity.
    #[test]
    fn frame_roundtrip(
        origin in vec3_strategy(),
        axis in vec3_strategy(),
        angle in -6.0f64..6.0,
        p in vec3_strategy(),
    ) {
        prop_assume!(axis.norm() > 1e-6);
        let frame = Frame::world(origin).rotated_about(origin, axis, angle);
        let back = frame.from_local(frame.to_local(p));
        prop_assert!((back - p).norm() < 1e-7 * (1.0 + p.norm()));
    }
}
