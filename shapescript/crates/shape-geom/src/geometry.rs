//! The geometry node tree the evaluator produces.
//!
//! A [`Geometry`] freezes the kind, children, and a snapshot of the
//! material and transform in effect when it was emitted. Meshes are built
//! lazily through a [`MeshKernel`] and shared through the
//! [`GeometryCache`]: builder nodes are cached by structural fingerprint,
//! which excludes uniform colour/texture so recolourings of the same
//! sub-tree rebuild nothing.

use std::sync::Arc;

use crate::cache::GeometryCache;
use crate::cancel::CancellationToken;
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::kernel::{KernelError, MeshKernel};
use crate::material::Material;
use crate::math::{Bounds, Halfturns, Transform};
use crate::mesh::Mesh;
use crate::path::Path;

/// A solid primitive, unit-sized and centred; size arrives through the
/// node transform's scale.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Cube,
    Sphere { detail: u32 },
    Cylinder { detail: u32 },
    Cone { detail: u32 },
}

impl Primitive {
    /// Sample the primitive into a mesh.
    ///
    /// Bounds of the result are the exact bounds of the sampled polygons,
    /// not of the ideal solid: a low-detail sphere is smaller than its
    /// radius in most directions.
    pub fn build(&self) -> Mesh {
        match self {
            Primitive::Cube => cube_mesh(),
            Primitive::Sphere { detail } => sphere_mesh(*detail),
            Primitive::Cylinder { detail } => cylinder_mesh(*detail),
            Primitive::Cone { detail } => cone_mesh(*detail),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Primitive::Cube => 0,
            Primitive::Sphere { .. } => 1,
            Primitive::Cylinder { .. } => 2,
            Primitive::Cone { .. } => 3,
        }
    }

    fn detail(&self) -> u32 {
        match self {
            Primitive::Cube => 0,
            Primitive::Sphere { detail }
            | Primitive::Cylinder { detail }
            | Primitive::Cone { detail } => *detail,
        }
    }
}

/// What a geometry node is.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryKind {
    /// A transparent container; children keep their own materials.
    Group,
    /// A solid primitive.
    Primitive(Primitive),
    /// A 2D path node.
    Path(Path),
    /// Fill child paths into a flat mesh.
    Fill,
    /// Extrude child paths, optionally along a rail with a twist.
    Extrude {
        along: Option<Path>,
        twist: Halfturns,
    },
    /// Revolve child paths around the y axis.
    Lathe { segments: u32 },
    /// Convex hull of the children.
    Hull,
    /// Minkowski sum of the children, left to right.
    Minkowski,
    /// Boolean union of the children.
    Union,
    /// Boolean intersection of the children.
    Intersection,
    /// First child minus the rest.
    Difference,
    /// First child with the others' overlap marked for recolour.
    Stencil,
    /// An already-built mesh (imports, host-supplied geometry).
    Mesh(Arc<Mesh>),
}

impl GeometryKind {
    /// Builder nodes invoke the mesh kernel and are worth caching.
    fn is_builder(&self) -> bool {
        matches!(
            self,
            GeometryKind::Fill
                | GeometryKind::Extrude { .. }
                | GeometryKind::Lathe { .. }
                | GeometryKind::Hull
                | GeometryKind::Minkowski
                | GeometryKind::Union
                | GeometryKind::Intersection
                | GeometryKind::Difference
                | GeometryKind::Stencil
        )
    }

    fn tag(&self) -> u8 {
        match self {
            GeometryKind::Group => 0,
            GeometryKind::Primitive(_) => 1,
            GeometryKind::Path(_) => 2,
            GeometryKind::Fill => 3,
            GeometryKind::Extrude { .. } => 4,
            GeometryKind::Lathe { .. } => 5,
            GeometryKind::Hull => 6,
            GeometryKind::Minkowski => 7,
            GeometryKind::Union => 8,
            GeometryKind::Intersection => 9,
            GeometryKind::Difference => 10,
            GeometryKind::Stencil => 11,
            GeometryKind::Mesh(_) => 12,
        }
    }
}

/// A node of the geometry tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub children: Vec<Geometry>,
    /// Transform snapshot; applied by whoever consumes this node, so the
    /// built mesh itself stays in local space and cache-shareable.
    pub transform: Transform,
    /// Material snapshot frozen at emission.
    pub material: Material,
}

impl Geometry {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            material: Material::default(),
        }
    }

    pub fn with_children(mut self, children: Vec<Geometry>) -> Self {
        self.children = children;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Structural fingerprint of this node.
    ///
    /// Includes the kind and its parameters, the children (with their
    /// transforms, which shape this node's input), and the geometry-
    /// relevant material fields. Excludes this node's own transform and
    /// the uniform colour/texture overrides, so a recoloured or re-placed
    /// instance of the same sub-tree shares its cache entry.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new();
        self.fingerprint_into(&mut builder, true);
        builder.finish()
    }

    fn fingerprint_into(&self, builder: &mut FingerprintBuilder, is_root: bool) {
        builder.write_u8(self.kind.tag());
        match &self.kind {
            GeometryKind::Primitive(primitive) => {
                builder.write_u8(primitive.tag()).write_u32(primitive.detail());
            }
            GeometryKind::Path(path) => {
                builder.write_path(path);
            }
            GeometryKind::Extrude { along, twist } => {
                match along {
                    Some(rail) => builder.write_u8(1).write_path(rail),
                    None => builder.write_u8(0),
                };
                builder.write_f64(twist.0);
            }
            GeometryKind::Lathe { segments } => {
                builder.write_u32(*segments);
            }
            GeometryKind::Mesh(mesh) => {
                builder.write_usize(mesh.polygon_count());
                for polygon in &mesh.polygons {
                    builder.write_polygon(polygon);
                }
            }
            _ => {}
        }

        // A child's transform shapes the parent's input; the root's own
        // transform does not change what gets built.
        if !is_root {
            builder.write_transform(&self.transform);
        }

        // Geometry-relevant material state; colour and texture are the
        // uniform overrides the cache deliberately ignores.
        builder
            .write_f64(self.material.opacity)
            .write_f64(self.material.metallicity)
            .write_f64(self.material.roughness)
            .write_f64(self.material.glow);

        builder.write_usize(self.children.len());
        for child in &self.children {
            child.fingerprint_into(builder, false);
        }
    }

    /// Collect the paths this node contributes as builder input, in their
    /// parent-relative positions.
    fn collect_paths(&self, into: &mut Vec<Path>) {
        match &self.kind {
            GeometryKind::Path(path) => {
                if self.transform.is_identity() {
                    into.push(path.clone());
                } else {
                    into.push(path.transformed(&self.transform));
                }
            }
            GeometryKind::Group => {
                for child in &self.children {
                    // Group transform applies to every contained path.
                    let mut nested = Vec::new();
                    child.collect_paths(&mut nested);
                    for path in nested {
                        into.push(path.transformed(&self.transform));
                    }
                }
            }
            _ => {}
        }
    }

    /// The paths of this node's children, for path-consuming builders.
    pub fn child_paths(&self) -> Vec<Path> {
        let mut paths = Vec::new();
        for child in &self.children {
            child.collect_paths(&mut paths);
        }
        paths
    }

    /// Build (or fetch) this node's mesh in local space.
    ///
    /// Builder nodes are cached by fingerprint; primitives, groups, and
    /// path fills rebuild directly, which keeps the cache focused on the
    /// kernel-expensive work.
    pub fn build_mesh(
        &self,
        kernel: &dyn MeshKernel,
        cache: &GeometryCache,
        cancel: &CancellationToken,
    ) -> Result<Arc<Mesh>, KernelError> {
        if cancel.is_cancelled() {
            return Err(KernelError::Cancelled);
        }
        match &self.kind {
            GeometryKind::Mesh(mesh) => Ok(mesh.clone()),
            GeometryKind::Primitive(primitive) => Ok(Arc::new(primitive.build())),
            GeometryKind::Path(path) => Ok(Arc::new(kernel.fill(
                std::slice::from_ref(path),
                cancel,
            )?)),
            GeometryKind::Group => {
                let mut polygons = Vec::new();
                for child in &self.children {
                    let mesh = child.build_mesh(kernel, cache, cancel)?;
                    let placed = mesh.transformed(&child.transform);
                    polygons.extend(placed.polygons);
                }
                Ok(Arc::new(Mesh::new(polygons)))
            }
            _ => {
                let fingerprint = self.fingerprint();
                cache.get_or_try_build(fingerprint, || self.build_uncached(kernel, cache, cancel))
            }
        }
    }

    fn build_uncached(
        &self,
        kernel: &dyn MeshKernel,
        cache: &GeometryCache,
        cancel: &CancellationToken,
    ) -> Result<Mesh, KernelError> {
        match &self.kind {
            GeometryKind::Fill => kernel.fill(&self.child_paths(), cancel),
            GeometryKind::Extrude { along, twist } => {
                kernel.extrude(&self.child_paths(), along.as_ref(), *twist, cancel)
            }
            GeometryKind::Lathe { segments } => {
                kernel.lathe(&self.child_paths(), *segments, cancel)
            }
            kind => {
                let meshes = self.child_meshes(kernel, cache, cancel)?;
                match kind {
                    GeometryKind::Hull => kernel.hull(&meshes, cancel),
                    GeometryKind::Minkowski => {
                        let mut meshes = meshes.into_iter();
                        let first = meshes.next().ok_or_else(|| {
                            KernelError::invalid("minkowski", "needs two operands")
                        })?;
                        meshes.try_fold(first, |acc, next| {
                            kernel.minkowski(&acc, &next, cancel)
                        })
                    }
                    GeometryKind::Union => kernel.union_of(&meshes, cancel),
                    GeometryKind::Intersection => kernel.intersection(&meshes, cancel),
                    GeometryKind::Difference => kernel.difference(&meshes, cancel),
                    GeometryKind::Stencil => kernel.stencil(&meshes, cancel),
                    _ => unreachable!("non-builder kinds are handled by build_mesh"),
                }
            }
        }
    }

    /// Children as meshes placed by their transforms, for mesh-consuming
    /// builders.
    fn child_meshes(
        &self,
        kernel: &dyn MeshKernel,
        cache: &GeometryCache,
        cancel: &CancellationToken,
    ) -> Result<Vec<Mesh>, KernelError> {
        let mut meshes = Vec::with_capacity(self.children.len());
        for child in &self.children {
            if cancel.is_cancelled() {
                return Err(KernelError::Cancelled);
            }
            let mesh = child.build_mesh(kernel, cache, cancel)?;
            meshes.push(mesh.transformed(&child.transform));
        }
        Ok(meshes)
    }

    /// The world bounds of this node: built mesh bounds under the node's
    /// transform.
    pub fn bounds(
        &self,
        kernel: &dyn MeshKernel,
        cache: &GeometryCache,
        cancel: &CancellationToken,
    ) -> Result<Bounds, KernelError> {
        match &self.kind {
            GeometryKind::Path(path) => Ok(path.bounds().transformed(&self.transform)),
            _ => {
                let mesh = self.build_mesh(kernel, cache, cancel)?;
                Ok(mesh.bounds.transformed(&self.transform))
            }
        }
    }
}

fn cube_mesh() -> Mesh {
    use crate::path::{PathPoint, Polygon};
    use crate::math::Vector;
    let corner = |x: f64, y: f64, z: f64| PathPoint::corner(Vector::new(x, y, z));
    let h = 0.5;
    let faces = vec![
        // +z
        Polygon::new(vec![
            corner(-h, -h, h),
            corner(h, -h, h),
            corner(h, h, h),
            corner(-h, h, h),
        ]),
        // -z
        Polygon::new(vec![
            corner(-h, h, -h),
            corner(h, h, -h),
            corner(h, -h, -h),
            corner(-h, -h, -h),
        ]),
        // +x
        Polygon::new(vec![
            corner(h, -h, h),
            corner(h, -h, -h),
            corner(h, h, -h),
            corner(h, h, h),
        ]),
        // -x
        Polygon::new(vec![
            corner(-h, h, h),
            corner(-h, h, -h),
            corner(-h, -h, -h),
            corner(-h, -h, h),
        ]),
        // +y
        Polygon::new(vec![
            corner(h, h, h),
            corner(h, h, -h),
            corner(-h, h, -h),
            corner(-h, h, h),
        ]),
        // -y
        Polygon::new(vec![
            corner(-h, -h, h),
            corner(-h, -h, -h),
            corner(h, -h, -h),
            corner(h, -h, h),
        ]),
    ];
    Mesh::new(faces)
}

fn sphere_mesh(detail: u32) -> Mesh {
    use crate::path::PathPoint;
    use crate::math::Vector;
    let slices = detail.max(3) as usize;
    let stacks = (detail / 2).max(2) as usize;
    // Poles are pinned to exact values so every polar quad collapses to a
    // triangle sharing one bit-identical apex.
    let vertex = |slice: usize, stack: usize| {
        if stack == 0 {
            return PathPoint::corner(Vector::new(0.0, 0.5, 0.0));
        }
        if stack == stacks {
            return PathPoint::corner(Vector::new(0.0, -0.5, 0.0));
        }
        let phi = stack as f64 / stacks as f64 * std::f64::consts::PI;
        let theta = slice as f64 / slices as f64 * std::f64::consts::TAU;
        PathPoint::corner(
            Vector::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ) * 0.5,
        )
    };
    let mut polygons = Vec::new();
    for stack in 0..stacks {
        for slice in 0..slices {
            let next_slice = (slice + 1) % slices;
            let mut points = vec![
                vertex(slice, stack),
                vertex(slice, stack + 1),
                vertex(next_slice, stack + 1),
                vertex(next_slice, stack),
            ];
            points.dedup_by(|a, b| a.position == b.position);
            if points.len() > 1 && points[0].position == points[points.len() - 1].position {
                points.pop();
            }
            if points.len() >= 3 {
                polygons.push(crate::path::Polygon::new(points));
            }
        }
    }
    Mesh::new(polygons)
}

fn cylinder_mesh(detail: u32) -> Mesh {
    use crate::path::{PathPoint, Polygon};
    use crate::math::Vector;
    let sides = detail.max(3) as usize;
    let ring = |y: f64| -> Vec<Vector> {
        (0..sides)
            .map(|i| {
                let angle = i as f64 / sides as f64 * std::f64::consts::TAU;
                Vector::new(angle.cos() * 0.5, y, angle.sin() * 0.5)
            })
            .collect()
    };
    let top = ring(0.5);
    let bottom = ring(-0.5);
    let mut polygons = Vec::new();
    for i in 0..sides {
        let j = (i + 1) % sides;
        polygons.push(Polygon::new(vec![
            PathPoint::corner(bottom[i]),
            PathPoint::corner(top[i]),
            PathPoint::corner(top[j]),
            PathPoint::corner(bottom[j]),
        ]));
    }
    let top_center = PathPoint::corner(Vector::new(0.0, 0.5, 0.0));
    let bottom_center = PathPoint::corner(Vector::new(0.0, -0.5, 0.0));
    for i in 0..sides {
        let j = (i + 1) % sides;
        polygons.push(Polygon::new(vec![
            top_center,
            PathPoint::corner(top[j]),
            PathPoint::corner(top[i]),
        ]));
        polygons.push(Polygon::new(vec![
            bottom_center,
            PathPoint::corner(bottom[i]),
            PathPoint::corner(bottom[j]),
        ]));
    }
    Mesh::new(polygons)
}

fn cone_mesh(detail: u32) -> Mesh {
    use crate::path::{PathPoint, Polygon};
    use crate::math::Vector;
    let sides = detail.max(3) as usize;
    let apex = PathPoint::corner(Vector::new(0.0, 0.5, 0.0));
    let base_center = PathPoint::corner(Vector::new(0.0, -0.5, 0.0));
    let base: Vec<Vector> = (0..sides)
        .map(|i| {
            let angle = i as f64 / sides as f64 * std::f64::consts::TAU;
            Vector::new(angle.cos() * 0.5, -0.5, angle.sin() * 0.5)
        })
        .collect();
    let mut polygons = Vec::new();
    for i in 0..sides {
        let j = (i + 1) % sides;
        polygons.push(Polygon::new(vec![
            apex,
            PathPoint::corner(base[j]),
            PathPoint::corner(base[i]),
        ]));
        polygons.push(Polygon::new(vec![
            base_center,
            PathPoint::corner(base[i]),
            PathPoint::corner(base[j]),
        ]));
    }
    Mesh::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::DefaultKernel;
    use crate::math::{Color, Vector};

    fn build(geometry: &Geometry) -> Arc<Mesh> {
        geometry
            .build_mesh(
                &DefaultKernel::new(),
                &GeometryCache::new(),
                &CancellationToken::new(),
            )
            .unwrap()
    }

    #[test]
    fn cube_has_six_faces_and_unit_bounds() {
        let mesh = build(&Geometry::new(GeometryKind::Primitive(Primitive::Cube)));
        assert_eq!(mesh.polygon_count(), 6);
        assert!(mesh.is_watertight());
        assert_eq!(mesh.bounds.size(), Vector::ONE);
    }

    #[test]
    fn sphere_bounds_are_sampled_not_ideal() {
        // detail 7 gives 3 stacks: no ring sits on the equator, so the x
        // extent stays strictly inside the ideal sphere while the poles
        // still touch the radius.
        let mesh = build(&Geometry::new(GeometryKind::Primitive(Primitive::Sphere {
            detail: 7,
        })));
        assert_eq!(mesh.bounds.size().y, 1.0);
        assert!(mesh.bounds.size().x < 1.0);
        assert!(mesh.is_watertight());
    }

    #[test]
    fn cylinder_and_cone_are_watertight() {
        let cylinder = build(&Geometry::new(GeometryKind::Primitive(
            Primitive::Cylinder { detail: 16 },
        )));
        assert!(cylinder.is_watertight());
        assert_eq!(cylinder.polygon_count(), 16 * 3);
        let cone = build(&Geometry::new(GeometryKind::Primitive(Primitive::Cone {
            detail: 16,
        })));
        assert!(cone.is_watertight());
        assert_eq!(cone.polygon_count(), 16 * 2);
    }

    #[test]
    fn recolour_does_not_change_fingerprint() {
        let plain = Geometry::new(GeometryKind::Extrude {
            along: None,
            twist: Halfturns(0.0),
        })
        .with_children(vec![Geometry::new(GeometryKind::Path(Path::square()))]);
        let red = plain.clone().with_material(Material {
            color: Some(Color::RED),
            ..Material::default()
        });
        assert_eq!(plain.fingerprint(), red.fingerprint());
    }

    #[test]
    fn own_transform_does_not_change_fingerprint_but_child_transform_does() {
        let node = Geometry::new(GeometryKind::Fill)
            .with_children(vec![Geometry::new(GeometryKind::Path(Path::square()))]);
        let moved = node
            .clone()
            .with_transform(Transform::offset(Vector::new(1.0, 0.0, 0.0)));
        assert_eq!(node.fingerprint(), moved.fingerprint());

        let mut moved_child = node.clone();
        moved_child.children[0].transform = Transform::offset(Vector::new(1.0, 0.0, 0.0));
        assert_ne!(node.fingerprint(), moved_child.fingerprint());
    }

    #[test]
    fn builder_results_are_cached_by_structure() {
        let cache = GeometryCache::new();
        let kernel = DefaultKernel::new();
        let cancel = CancellationToken::new();

        let make = |color: Option<Color>| {
            Geometry::new(GeometryKind::Extrude {
                along: None,
                twist: Halfturns(0.0),
            })
            .with_children(vec![Geometry::new(GeometryKind::Path(Path::square()))])
            .with_material(Material {
                color,
                ..Material::default()
            })
        };

        let first = make(Some(Color::RED))
            .build_mesh(&kernel, &cache, &cancel)
            .unwrap();
        let second = make(Some(Color::BLUE))
            .build_mesh(&kernel, &cache, &cancel)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert!(!first.has_vertex_colors);
    }

    #[test]
    fn group_merges_placed_children() {
        let child_a = Geometry::new(GeometryKind::Primitive(Primitive::Cube));
        let child_b = Geometry::new(GeometryKind::Primitive(Primitive::Cube))
            .with_transform(Transform::offset(Vector::new(2.0, 0.0, 0.0)));
        let group = Geometry::new(GeometryKind::Group).with_children(vec![child_a, child_b]);
        let mesh = build(&group);
        assert_eq!(mesh.polygon_count(), 12);
        assert_eq!(mesh.bounds.min.x, -0.5);
        assert_eq!(mesh.bounds.max.x, 2.5);
    }

    #[test]
    fn cancelled_build_leaves_cache_empty() {
        let cache = GeometryCache::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let node = Geometry::new(GeometryKind::Fill)
            .with_children(vec![Geometry::new(GeometryKind::Path(Path::square()))]);
        let result = node.build_mesh(&DefaultKernel::new(), &cache, &cancel);
        assert_eq!(result, Err(KernelError::Cancelled));
        assert!(cache.is_empty());
    }

    #[test]
    fn bounds_apply_node_transform() {
        let node = Geometry::new(GeometryKind::Primitive(Primitive::Cube))
            .with_transform(Transform::offset(Vector::new(3.0, 0.0, 0.0)));
        let bounds = node
            .bounds(
                &DefaultKernel::new(),
                &GeometryCache::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(bounds.center(), Vector::new(3.0, 0.0, 0.0));
    }
}
