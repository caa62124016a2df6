//! Position Vector
//!
//! 3-component float32 vector matching the wire layout exactly:
//! 12 bytes, little-endian, (x, y, z) order.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Size of a serialized [`Vec3`] in bytes.
pub const VEC3_WIRE_SIZE: usize = 12;

/// 3D position with float32 components.
///
/// Positions are authoritative on the server and predicted on the client;
/// the z component is carried for protocol compatibility even though the
/// grid only looks at x and y.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to another point (avoids sqrt - prefer for comparisons).
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Exact component-wise equality (no epsilon).
    ///
    /// Spawn slot release matches on this, not on [`PartialEq`] via floats
    /// that went through arithmetic: positions compared here are only ever
    /// copied, never recomputed.
    #[inline]
    pub fn bits_eq(self, other: Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }

    /// Serialize to the 12-byte little-endian wire layout.
    #[inline]
    pub fn to_wire(self) -> [u8; VEC3_WIRE_SIZE] {
        let mut out = [0u8; VEC3_WIRE_SIZE];
        out[0..4].copy_from_slice(&self.x.to_le_bytes());
        out[4..8].copy_from_slice(&self.y.to_le_bytes());
        out[8..12].copy_from_slice(&self.z.to_le_bytes());
        out
    }

    /// Deserialize from the 12-byte little-endian wire layout.
    #[inline]
    pub fn from_wire(bytes: &[u8; VEC3_WIRE_SIZE]) -> Self {
        Self {
            x: f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            y: f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            z: f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// =============================================================================
// TESTS
// =============================================================================
