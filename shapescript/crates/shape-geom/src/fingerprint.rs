//! Structural fingerprints for the geometry cache.
//!
//! A fingerprint is a content hash over everything that determines the
//! *shape* of a built sub-geometry: geometry kind and parameters, child
//! fingerprints, per-point colour data, and externally resolved asset
//! identity. Uniform material overrides (colour, texture) are deliberately
//! left out so recolourings share cache entries.
//!
//! Hashing uses `ahash` with pinned seeds, so fingerprints are stable for
//! the lifetime of a process and across concurrent runs sharing one cache.

use std::hash::Hasher;

use ahash::RandomState;

use crate::math::{Color, Rotation, Transform, Vector};
use crate::path::{Path, PathPoint, Polygon};

/// A 64-bit structural hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

/// Streaming builder for [`Fingerprint`]s.
pub struct FingerprintBuilder {
    hasher: ahash::AHasher,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        // Pinned seeds keep fingerprints comparable across threads and
        // cache instances within a process.
        let state = RandomState::with_seeds(
            0x5368_6170_6553_6372,
            0x6970_7447_656f_6d65,
            0x7472_7943_6163_6865,
            0x4669_6e67_6572_7072,
        );
        use std::hash::BuildHasher;
        Self {
            hasher: state.build_hasher(),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.hasher.write_u8(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.hasher.write_u32(value);
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.hasher.write_u64(value);
        self
    }

    pub fn write_usize(&mut self, value: usize) -> &mut Self {
        self.hasher.write_u64(value as u64);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.hasher.write_u8(value as u8);
        self
    }

    /// Hash a float by bit pattern; -0.0 normalises to 0.0 so equal
    /// geometry hashes equally.
    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        let normalised = if value == 0.0 { 0.0 } else { value };
        self.hasher.write_u64(normalised.to_bits());
        self
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.hasher.write(value.as_bytes());
        self.hasher.write_u8(0xff);
        self
    }

    pub fn write_vector(&mut self, value: Vector) -> &mut Self {
        self.write_f64(value.x).write_f64(value.y).write_f64(value.z)
    }

    pub fn write_color(&mut self, value: Color) -> &mut Self {
        self.write_f64(value.r)
            .write_f64(value.g)
            .write_f64(value.b)
            .write_f64(value.a)
    }

    pub fn write_rotation(&mut self, value: Rotation) -> &mut Self {
        for component in value.components() {
            self.write_f64(component);
        }
        self
    }

    pub fn write_transform(&mut self, value: &Transform) -> &mut Self {
        self.write_vector(value.offset)
            .write_rotation(value.rotation)
            .write_vector(value.scale)
    }

    pub fn write_point(&mut self, point: &PathPoint) -> &mut Self {
        self.write_vector(point.position)
            .write_bool(point.is_curved);
        match point.color {
            Some(color) => self.write_u8(1).write_color(color),
            None => self.write_u8(0),
        }
    }

    pub fn write_path(&mut self, path: &Path) -> &mut Self {
        self.write_usize(path.points.len())
            .write_bool(path.closed);
        for point in &path.points {
            self.write_point(point);
        }
        self
    }

    pub fn write_polygon(&mut self, polygon: &Polygon) -> &mut Self {
        self.write_usize(polygon.points.len());
        for point in &polygon.points {
            self.write_point(point);
        }
        self
    }

    pub fn write_fingerprint(&mut self, fingerprint: Fingerprint) -> &mut Self {
        self.write_u64(fingerprint.0)
    }

    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.hasher.finish())
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}
