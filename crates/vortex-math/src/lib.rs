//! Vector algebra primitives for SCPN Vortex Rotor.

pub mod frame;
pub mod vec3;

pub use frame::Frame;
pub use vec3::Vec3;
