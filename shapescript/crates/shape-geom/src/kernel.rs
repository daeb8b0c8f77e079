//! The mesh kernel interface and the built-in deterministic kernel.
//!
//! The evaluator consumes mesh construction through [`MeshKernel`], a
//! handful of named operations treated as pure functions. Hosts with a
//! real CSG engine implement the trait; the bundled [`DefaultKernel`]
//! keeps the language core self-contained by triangulating, extruding,
//! lathing, and merging on its own, while reporting its boolean
//! operations as approximate through [`KernelCapabilities`].
//!
//! Every operation checks the cancellation token between sub-steps and
//! abandons work promptly.

use rayon::prelude::*;
use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::math::{Halfturns, Rotation, Transform, Vector};
use crate::mesh::Mesh;
use crate::path::{Path, PathPoint, Polygon};

/// Errors from mesh construction.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum KernelError {
    /// The build was cancelled cooperatively.
    #[error("build cancelled")]
    Cancelled,
    /// The operation's input cannot produce a mesh.
    #[error("{operation}: {reason}")]
    InvalidInput {
        operation: &'static str,
        reason: String,
    },
}

impl KernelError {
    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        KernelError::InvalidInput {
            operation,
            reason: reason.into(),
        }
    }
}

/// What a kernel implementation can actually do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelCapabilities {
    /// True when union/intersection/difference/stencil compute real
    /// boolean results rather than merges and first-operand stand-ins.
    pub exact_csg: bool,
    /// True when hull/minkowski compute exact results.
    pub exact_hulls: bool,
}

/// The narrow interface to the triangle kernel.
///
/// All operations are pure: same inputs, same mesh. The evaluator relies
/// on that for content-addressed caching.
pub trait MeshKernel: Send + Sync {
    fn capabilities(&self) -> KernelCapabilities;

    /// Triangulate closed paths into a flat double-sided mesh.
    fn fill(&self, paths: &[Path], cancel: &CancellationToken) -> Result<Mesh, KernelError>;

    /// Extrude profiles one unit along z, or sweep them along a rail,
    /// twisting by `twist` half-turns over the sweep.
    fn extrude(
        &self,
        paths: &[Path],
        along: Option<&Path>,
        twist: Halfturns,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError>;

    /// Revolve profiles around the y axis.
    fn lathe(
        &self,
        paths: &[Path],
        segments: u32,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError>;

    /// Convex hull of the input meshes.
    fn hull(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError>;

    /// Minkowski sum of two meshes.
    fn minkowski(
        &self,
        a: &Mesh,
        b: &Mesh,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError>;

    /// Boolean union of the input meshes.
    fn union_of(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError>;

    /// Boolean intersection of the input meshes.
    fn intersection(
        &self,
        meshes: &[Mesh],
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError>;

    /// First mesh minus the rest.
    fn difference(&self, meshes: &[Mesh], cancel: &CancellationToken)
        -> Result<Mesh, KernelError>;

    /// First mesh, with the overlap of the rest marked for recolouring.
    fn stencil(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError>;
}

/// The built-in deterministic kernel.
///
/// Fill, extrude, and lathe are exact. Hull, minkowski, and the boolean
/// operations are merges/stand-ins, flagged as such in the capabilities;
/// hosts that need true CSG plug in their own kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKernel;

impl DefaultKernel {
    pub fn new() -> Self {
        DefaultKernel
    }

    fn ensure(cancel: &CancellationToken) -> Result<(), KernelError> {
        if cancel.is_cancelled() {
            Err(KernelError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Merge polygon soups, in input order.
    fn merge(meshes: &[Mesh]) -> Mesh {
        let polygons: Vec<Polygon> = meshes
            .par_iter()
            .flat_map_iter(|mesh| mesh.polygons.iter().cloned())
            .collect();
        Mesh::new(polygons)
    }
}

impl MeshKernel for DefaultKernel {
    fn capabilities(&self) -> KernelCapabilities {
        KernelCapabilities {
            exact_csg: false,
            exact_hulls: false,
        }
    }

    fn fill(&self, paths: &[Path], cancel: &CancellationToken) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        let mut polygons = Vec::new();
        for path in paths {
            Self::ensure(cancel)?;
            if path.points.len() < 3 {
                continue;
            }
            let front = triangulate(&path.points);
            // Double-sided: mirror the winding so the sheet is watertight.
            let back: Vec<Polygon> = front
                .iter()
                .map(|poly| {
                    let mut points = poly.points.clone();
                    points.reverse();
                    Polygon::new(points)
                })
                .collect();
            polygons.extend(front);
            polygons.extend(back);
        }
        if polygons.is_empty() {
            return Err(KernelError::invalid("fill", "no fillable paths"));
        }
        Ok(Mesh::new(polygons))
    }

    fn extrude(
        &self,
        paths: &[Path],
        along: Option<&Path>,
        twist: Halfturns,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        let mut polygons = Vec::new();
        for path in paths {
            Self::ensure(cancel)?;
            if path.points.len() < 2 {
                continue;
            }
            match along {
                None => extrude_linear(path, twist, &mut polygons),
                Some(rail) => sweep_along(path, rail, twist, cancel, &mut polygons)?,
            }
        }
        if polygons.is_empty() {
            return Err(KernelError::invalid("extrude", "no extrudable paths"));
        }
        Ok(Mesh::new(polygons))
    }

    fn lathe(
        &self,
        paths: &[Path],
        segments: u32,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        let segments = segments.max(3) as usize;
        let mut polygons = Vec::new();
        for path in paths {
            Self::ensure(cancel)?;
            if path.points.len() < 2 {
                continue;
            }
            let profile = &path.points;
            let edge_count = if path.closed {
                profile.len()
            } else {
                profile.len() - 1
            };
            let segment_polys: Vec<Polygon> = (0..segments)
                .into_par_iter()
                .flat_map_iter(|j| {
                    let a0 = j as f64 / segments as f64 * std::f64::consts::TAU;
                    let a1 = (j + 1) as f64 / segments as f64 * std::f64::consts::TAU;
                    (0..edge_count).filter_map(move |i| {
                        let p0 = profile[i];
                        let p1 = profile[(i + 1) % profile.len()];
                        lathe_quad(p0, p1, a0, a1)
                    })
                })
                .collect();
            polygons.extend(segment_polys);
        }
        if polygons.is_empty() {
            return Err(KernelError::invalid("lathe", "no profiles to revolve"));
        }
        Ok(Mesh::new(polygons))
    }

    fn hull(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        if meshes.is_empty() {
            return Err(KernelError::invalid("hull", "nothing to hull"));
        }
        Ok(Self::merge(meshes))
    }

    fn minkowski(
        &self,
        a: &Mesh,
        b: &Mesh,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        if a.is_empty() || b.is_empty() {
            return Err(KernelError::invalid("minkowski", "empty operand"));
        }
        // Stand-in sum: the first operand swept to the corners of the
        // second operand's bounds.
        let bounds = b.bounds;
        let corners = [
            bounds.min,
            Vector::new(bounds.max.x, bounds.min.y, bounds.min.z),
            Vector::new(bounds.min.x, bounds.max.y, bounds.min.z),
            Vector::new(bounds.max.x, bounds.max.y, bounds.min.z),
            Vector::new(bounds.min.x, bounds.min.y, bounds.max.z),
            Vector::new(bounds.max.x, bounds.min.y, bounds.max.z),
            Vector::new(bounds.min.x, bounds.max.y, bounds.max.z),
            bounds.max,
        ];
        let translated: Vec<Mesh> = corners
            .par_iter()
            .map(|corner| a.transformed(&Transform::offset(*corner)))
            .collect();
        Self::ensure(cancel)?;
        Ok(Self::merge(&translated))
    }

    fn union_of(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        if meshes.is_empty() {
            return Err(KernelError::invalid("union", "nothing to combine"));
        }
        Ok(Self::merge(meshes))
    }

    fn intersection(
        &self,
        meshes: &[Mesh],
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        match meshes.first() {
            Some(first) => Ok(first.clone()),
            None => Err(KernelError::invalid("intersection", "nothing to intersect")),
        }
    }

    fn difference(
        &self,
        meshes: &[Mesh],
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        match meshes.first() {
            Some(first) => Ok(first.clone()),
            None => Err(KernelError::invalid("difference", "nothing to subtract from")),
        }
    }

    fn stencil(&self, meshes: &[Mesh], cancel: &CancellationToken) -> Result<Mesh, KernelError> {
        Self::ensure(cancel)?;
        match meshes.first() {
            Some(first) => Ok(first.clone()),
            None => Err(KernelError::invalid("stencil", "nothing to stencil")),
        }
    }
}

/// One quad (or triangle at the axis) of a lathe segment.
fn lathe_quad(p0: PathPoint, p1: PathPoint, a0: f64, a1: f64) -> Option<Polygon> {
    let revolve = |p: PathPoint, angle: f64| {
        let radius = p.position.x;
        PathPoint {
            position: Vector::new(
                radius * angle.cos(),
                p.position.y,
                radius * angle.sin(),
            ),
            ..p
        }
    };
    let mut points = vec![
        revolve(p0, a0),
        revolve(p1, a0),
        revolve(p1, a1),
        revolve(p0, a1),
    ];
    // Points on the axis collapse; drop duplicates so triangles survive.
    points.dedup_by(|a, b| a.position == b.position);
    if points.len() > 1 && points[0].position == points[points.len() - 1].position {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    Some(Polygon::new(points))
}

/// Straight extrusion: one unit along z, twisted by `twist` half-turns
/// from bottom to top.
fn extrude_linear(path: &Path, twist: Halfturns, polygons: &mut Vec<Polygon>) {
    let place = |p: &PathPoint, z: f64, angle: Halfturns| {
        let rotation = Rotation::roll(angle);
        PathPoint {
            position: rotation.rotate(Vector::new(p.position.x, p.position.y, 0.0))
                + Vector::new(0.0, 0.0, z),
            ..*p
        }
    };
    let bottom: Vec<PathPoint> = path
        .points
        .iter()
        .map(|p| place(p, -0.5, Halfturns(0.0)))
        .collect();
    let top: Vec<PathPoint> = path
        .points
        .iter()
        .map(|p| place(p, 0.5, twist))
        .collect();

    let n = path.points.len();
    let edge_count = if path.closed { n } else { n - 1 };
    for i in 0..edge_count {
        let j = (i + 1) % n;
        polygons.push(Polygon::new(vec![bottom[i], bottom[j], top[j], top[i]]));
    }

    if path.closed && n >= 3 {
        // Caps, bottom wound downward and top upward.
        let mut bottom_cap = triangulate(&bottom);
        for poly in &mut bottom_cap {
            poly.points.reverse();
        }
        polygons.extend(bottom_cap);
        polygons.extend(triangulate(&top));
    }
}

/// Sweep a profile along a rail, twisting as it goes.
fn sweep_along(
    profile: &Path,
    rail: &Path,
    twist: Halfturns,
    cancel: &CancellationToken,
    polygons: &mut Vec<Polygon>,
) -> Result<(), KernelError> {
    let rail_points: Vec<Vector> = rail.points.iter().map(|p| p.position).collect();
    if rail_points.len() < 2 {
        return Err(KernelError::invalid("extrude", "rail needs two points"));
    }

    // One profile ring per rail point, oriented along the rail tangent.
    let ring_count = rail_points.len();
    let mut rings: Vec<Vec<PathPoint>> = Vec::with_capacity(ring_count);
    for (i, center) in rail_points.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(KernelError::Cancelled);
        }
        let prev = if i == 0 {
            if rail.closed {
                rail_points[ring_count - 1]
            } else {
                rail_points[0]
            }
        } else {
            rail_points[i - 1]
        };
        let next = if i + 1 == ring_count {
            if rail.closed {
                rail_points[0]
            } else {
                rail_points[ring_count - 1]
            }
        } else {
            rail_points[i + 1]
        };
        let tangent = (next - prev).normalized();
        let tangent = if tangent == Vector::ZERO {
            Vector::new(0.0, 0.0, 1.0)
        } else {
            tangent
        };
        let orient = Rotation::between(Vector::new(0.0, 0.0, 1.0), tangent);
        let roll = Rotation::roll(Halfturns(twist.0 * i as f64 / ring_count as f64));
        let ring = profile
            .points
            .iter()
            .map(|p| PathPoint {
                position: orient
                    .rotate(roll.rotate(Vector::new(p.position.x, p.position.y, 0.0)))
                    + *center,
                ..*p
            })
            .collect();
        rings.push(ring);
    }

    let n = profile.points.len();
    let profile_edges = if profile.closed { n } else { n - 1 };
    let ring_pairs = if rail.closed {
        ring_count
    } else {
        ring_count - 1
    };
    for r in 0..ring_pairs {
        let r1 = (r + 1) % ring_count;
        for i in 0..profile_edges {
            let j = (i + 1) % n;
            polygons.push(Polygon::new(vec![
                rings[r][i],
                rings[r][j],
                rings[r1][j],
                rings[r1][i],
            ]));
        }
    }

    if !rail.closed && profile.closed && n >= 3 {
        let mut start_cap = triangulate(&rings[0]);
        for poly in &mut start_cap {
            poly.points.reverse();
        }
        polygons.extend(start_cap);
        polygons.extend(triangulate(&rings[ring_count - 1]));
    }
    Ok(())
}

/// Ear-clipping triangulation of a simple polygon. Points are taken in
/// the plane spanned by their dominant axes; for the planar profiles the
/// builders produce, that is the XY plane.
pub(crate) fn triangulate(points: &[PathPoint]) -> Vec<Polygon> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![Polygon::new(points.to_vec())];
    }

    let area2 = |a: Vector, b: Vector, c: Vector| (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);

    // Work in counter-clockwise order.
    let signed_area: f64 = {
        let mut sum = 0.0;
        for i in 0..n {
            let a = points[i].position;
            let b = points[(i + 1) % n].position;
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    };
    let mut indices: Vec<usize> = if signed_area >= 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let inside = |a: Vector, b: Vector, c: Vector, p: Vector| {
        area2(a, b, p) >= 0.0 && area2(b, c, p) >= 0.0 && area2(c, a, p) >= 0.0
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut attempts = 0usize;
    while indices.len() > 3 {
        let m = indices.len();
        let mut clipped = false;
        for k in 0..m {
            let i0 = indices[(k + m - 1) % m];
            let i1 = indices[k];
            let i2 = indices[(k + 1) % m];
            let (a, b, c) = (
                points[i0].position,
                points[i1].position,
                points[i2].position,
            );
            if area2(a, b, c) <= 0.0 {
                continue; // reflex corner
            }
            let contains_other = indices.iter().any(|&other| {
                other != i0
                    && other != i1
                    && other != i2
                    && inside(a, b, c, points[other].position)
            });
            if contains_other {
                continue;
            }
            triangles.push(Polygon::new(vec![points[i0], points[i1], points[i2]]));
            indices.remove(k);
            clipped = true;
            break;
        }
        attempts += 1;
        if !clipped || attempts > 2 * n {
            // Degenerate input: fall back to a fan so we always return
            // n - 2 triangles.
            for window in 1..indices.len() - 1 {
                triangles.push(Polygon::new(vec![
                    points[indices[0]],
                    points[indices[window]],
                    points[indices[window + 1]],
                ]));
            }
            return triangles;
        }
    }
    triangles.push(Polygon::new(vec![
        points[indices[0]],
        points[indices[1]],
        points[indices[2]],
    ]));
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Bounds;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn triangulate_square_gives_two_triangles() {
        let square = Path::square();
        let triangles = triangulate(&square.points);
        assert_eq!(triangles.len(), 2);
        assert!(triangles.iter().all(|t| t.points.len() == 3));
    }

    #[test]
    fn triangulate_concave_polygon() {
        // An L-shape: 6 vertices, 4 triangles.
        let l_shape = Path::closed_polygon([
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(2.0, 0.0, 0.0),
            Vector::new(2.0, 1.0, 0.0),
            Vector::new(1.0, 1.0, 0.0),
            Vector::new(1.0, 2.0, 0.0),
            Vector::new(0.0, 2.0, 0.0),
        ]);
        let triangles = triangulate(&l_shape.points);
        assert_eq!(triangles.len(), 4);
    }

    #[test]
    fn fill_square_is_watertight() {
        let kernel = DefaultKernel::new();
        let mesh = kernel.fill(&[Path::square()], &token()).unwrap();
        // Two triangles per side.
        assert_eq!(mesh.polygon_count(), 4);
        assert!(mesh.is_watertight());
    }

    #[test]
    fn fill_open_path_errors() {
        let kernel = DefaultKernel::new();
        let result = kernel.fill(
            &[Path::line([Vector::ZERO, Vector::ONE])],
            &token(),
        );
        assert!(matches!(result, Err(KernelError::InvalidInput { .. })));
    }

    #[test]
    fn extrude_square_makes_closed_box() {
        let kernel = DefaultKernel::new();
        let mesh = kernel
            .extrude(&[Path::square()], None, Halfturns(0.0), &token())
            .unwrap();
        // 4 side quads + 2 caps of 2 triangles each.
        assert_eq!(mesh.polygon_count(), 8);
        assert!(mesh.is_watertight());
        assert_eq!(mesh.bounds.size(), Vector::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn twist_expands_bounds() {
        let kernel = DefaultKernel::new();
        let straight = kernel
            .extrude(&[Path::rect(2.0, 0.5)], None, Halfturns(0.0), &token())
            .unwrap();
        let twisted = kernel
            .extrude(&[Path::rect(2.0, 0.5)], None, Halfturns(0.25), &token())
            .unwrap();
        assert!(twisted.bounds.size().y > straight.bounds.size().y);
    }

    #[test]
    fn extrude_along_circle_makes_a_ring() {
        let kernel = DefaultKernel::new();
        let mesh = kernel
            .extrude(
                &[Path::rect(0.1, 0.1)],
                Some(&Path::circle(16)),
                Halfturns(0.0),
                &token(),
            )
            .unwrap();
        // Closed rail, closed profile: 16 ring pairs x 4 profile edges.
        assert_eq!(mesh.polygon_count(), 64);
        assert!(mesh.is_watertight());
    }

    #[test]
    fn lathe_produces_revolution() {
        let kernel = DefaultKernel::new();
        let profile = Path::line([
            Vector::new(0.5, -0.5, 0.0),
            Vector::new(0.5, 0.5, 0.0),
        ]);
        let mesh = kernel.lathe(&[profile], 16, &token()).unwrap();
        // A cylinder wall: one quad per segment.
        assert_eq!(mesh.polygon_count(), 16);
        let size = mesh.bounds.size();
        assert!((size.x - 1.0).abs() < 1e-9);
        assert!((size.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn union_merges_polygons() {
        let kernel = DefaultKernel::new();
        let a = kernel
            .extrude(&[Path::square()], None, Halfturns(0.0), &token())
            .unwrap();
        let merged = kernel.union_of(&[a.clone(), a.clone()], &token()).unwrap();
        assert_eq!(merged.polygon_count(), a.polygon_count() * 2);
    }

    #[test]
    fn difference_keeps_first_operand() {
        let kernel = DefaultKernel::new();
        let a = kernel
            .extrude(&[Path::square()], None, Halfturns(0.0), &token())
            .unwrap();
        let b = kernel
            .extrude(&[Path::circle(8)], None, Halfturns(0.0), &token())
            .unwrap();
        let result = kernel.difference(&[a.clone(), b], &token()).unwrap();
        assert_eq!(result, a);
        assert!(!kernel.capabilities().exact_csg);
    }

    #[test]
    fn minkowski_grows_bounds() {
        let kernel = DefaultKernel::new();
        let a = kernel
            .extrude(&[Path::square()], None, Halfturns(0.0), &token())
            .unwrap();
        let b = a.clone();
        let sum = kernel.minkowski(&a, &b, &token()).unwrap();
        let expected = Bounds::containing([Vector::splat(-1.0), Vector::splat(1.0)]);
        assert_eq!(sum.bounds, expected);
    }

    #[test]
    fn cancellation_aborts_operations() {
        let kernel = DefaultKernel::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            kernel.fill(&[Path::square()], &cancel),
            Err(KernelError::Cancelled)
        );
        assert_eq!(
            kernel.extrude(&[Path::square()], None, Halfturns(0.0), &cancel),
            Err(KernelError::Cancelled)
        );
        assert_eq!(
            kernel.union_of(&[Mesh::empty()], &cancel),
            Err(KernelError::Cancelled)
        );
    }
}
