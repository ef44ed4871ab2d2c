// ─────────────────────────────────────────────────────────────────────
// SCPN Vortex Rotor — Frame
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Orthonormal coordinate frames and axis rotations.

use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

/// Right-handed orthonormal frame with an origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// World-aligned frame at the given origin.
    pub fn world(origin: Vec3) -> Self {
        Frame {
            origin,
            x: Vec3::new(1.0, 0.0, 0.0),
            y: Vec3::new(0.0, 1.0, 0.0),
            z: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Express a world-space point in this frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        let d = point - self.origin;
        Vec3::new(d.dot(self.x), d.dot(self.y), d.dot(self.z))
    }

    /// Express a frame-local point in world space.
    pub fn from_local(&self, point: Vec3) -> Vec3 {
        self.origin + self.x * point.x + self.y * point.y + self.z * point.z
    }

    /// Express a world-space direction in this frame (no origin shift).
    pub fn direction_to_local(&self, dir: Vec3) -> Vec3 {
        Vec3::new(dir.dot(self.x), dir.dot(self.y), dir.dot(self.z))
    }

    /// Rotate the whole frame about an axis through `pivot`.
    pub fn rotated_about(&self, pivot: Vec3, axis: Vec3, angle_rad: f64) -> Frame {
        Frame {
            origin: rotate_point_about_line(self.origin, pivot, axis, angle_rad),
            x: rotate_about_axis(self.x, axis, angle_rad),
            y: rotate_about_axis(self.y, axis, angle_rad),
            z: rotate_about_axis(self.z, axis, angle_rad),
        }
    }
}

/// Rodrigues rotation of a vector about a (not necessarily unit) axis.
pub fn rotate_about_axis(v: Vec3, axis: Vec3, angle_rad: f64) -> Vec3 {
    let k = axis.normalized();
    if k == Vec3::ZERO {
        return v;
    }
    let (s, c) = angle_rad.sin_cos();
    v * c + k.cross(v) * s + k * (k.dot(v) * (1.0 - c))
}

/// Rotate a point about the line through `origin` with direction `axis`.
pub fn rotate_point_about_line(point: Vec3, origin: Vec3, axis: Vec3, angle_rad: f64) -> Vec3 {
    origin + rotate_about_axis(point - origin, axis, angle_rad)
}
