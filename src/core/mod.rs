//! Core deterministic primitives.
//!
//! Everything here is free of game semantics: a position vector with the
//! exact float32 layout the wire format requires, and a seeded PRNG whose
//! sequence is identical on every platform.

pub mod rng;
pub mod vec3;

// Re-export core types
pub use rng::DeterministicRng;
pub use vec3::Vec3;
