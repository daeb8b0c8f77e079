//! shape-geom - Geometry substrate for the ShapeScript evaluator.
//!
//! This crate holds the value-level geometry types (vectors, colours,
//! rotations, bounds, transforms, paths, polygons, meshes, materials), the
//! narrow [`MeshKernel`] interface through which the evaluator consumes
//! mesh construction as a set of pure functions, the content-addressed
//! [`GeometryCache`] that shares built sub-geometry across uniform
//! recolourings, and cooperative [`CancellationToken`] plumbing.
//!
//! The bundled [`DefaultKernel`] is deterministic and self-contained: it
//! triangulates, extrudes, lathes, and merges without an external CSG
//! engine, and reports itself as approximate through
//! [`KernelCapabilities`] so hosts (and tests) can tell exact boolean
//! results apart from stand-ins.

pub mod cache;
pub mod cancel;
pub mod fingerprint;
pub mod geometry;
pub mod kernel;
pub mod material;
pub mod math;
pub mod mesh;
pub mod path;

pub use cache::{CacheStats, GeometryCache};
pub use cancel::CancellationToken;
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use geometry::{Geometry, GeometryKind, Primitive};
pub use kernel::{DefaultKernel, KernelCapabilities, KernelError, MeshKernel};
pub use material::{Material, Texture, TextureSource};
pub use math::{Bounds, Color, Halfturns, Radians, Rotation, Transform, Vector};
pub use mesh::Mesh;
pub use path::{Path, PathPoint, Polygon};
