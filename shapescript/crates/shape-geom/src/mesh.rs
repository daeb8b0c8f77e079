//! Triangle/polygon meshes.

use rustc_hash::FxHashMap;

use crate::math::{Bounds, Transform};
use crate::path::Polygon;

/// A polygon soup with cached bounds.
///
/// `has_vertex_colors` records whether any vertex carries a colour of its
/// own; such meshes cannot share cache entries across recolourings because
/// the colour data is baked into the geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub polygons: Vec<Polygon>,
    pub bounds: Bounds,
    pub has_vertex_colors: bool,
}

impl Mesh {
    /// The empty mesh.
    pub fn empty() -> Self {
        Self {
            polygons: Vec::new(),
            bounds: Bounds::EMPTY,
            has_vertex_colors: false,
        }
    }

    /// Build a mesh from polygons, computing bounds and colour flags.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let bounds = Bounds::containing(
            polygons
                .iter()
                .flat_map(|poly| poly.points.iter().map(|p| p.position)),
        );
        let has_vertex_colors = polygons.iter().any(|poly| poly.has_vertex_colors());
        Self {
            polygons,
            bounds,
            has_vertex_colors,
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// The mesh with a transform applied to every vertex.
    pub fn transformed(&self, transform: &Transform) -> Mesh {
        Mesh::new(
            self.polygons
                .iter()
                .map(|poly| poly.transformed(transform))
                .collect(),
        )
    }

    /// Whether every edge is shared by exactly two polygons.
    ///
    /// Vertices are matched by exact bit pattern; builders that intend to
    /// produce watertight output emit shared vertices rather than
    /// recomputed ones, so this is a structural check, not a tolerance
    /// test.
    pub fn is_watertight(&self) -> bool {
        if self.polygons.is_empty() {
            return false;
        }
        let key = |v: crate::math::Vector| (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
        let mut edge_counts: FxHashMap<_, i64> = FxHashMap::default();
        for polygon in &self.polygons {
            let n = polygon.points.len();
            for i in 0..n {
                let a = key(polygon.points[i].position);
                let b = key(polygon.points[(i + 1) % n].position);
                // Count directed edges; a closed orientable surface pairs
                // each edge with its reverse.
                *edge_counts.entry((a, b)).or_insert(0) += 1;
                *edge_counts.entry((b, a)).or_insert(0) -= 1;
            }
        }
        edge_counts.values().all(|&count| count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Color, Vector};
    use crate::path::PathPoint;

    fn quad(z: f64) -> Polygon {
        Polygon::new(vec![
            PathPoint::corner(Vector::new(0.0, 0.0, z)),
            PathPoint::corner(Vector::new(1.0, 0.0, z)),
            PathPoint::corner(Vector::new(1.0, 1.0, z)),
            PathPoint::corner(Vector::new(0.0, 1.0, z)),
        ])
    }

    #[test]
    fn new_computes_bounds_and_flags() {
        let mesh = Mesh::new(vec![quad(0.0), quad(2.0)]);
        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.bounds.min, Vector::ZERO);
        assert_eq!(mesh.bounds.max, Vector::new(1.0, 1.0, 2.0));
        assert!(!mesh.has_vertex_colors);
    }

    #[test]
    fn vertex_colors_flagged() {
        let mut polygon = quad(0.0);
        polygon.points[0].color = Some(Color::RED);
        let mesh = Mesh::new(vec![polygon]);
        assert!(mesh.has_vertex_colors);
    }

    #[test]
    fn empty_mesh() {
        let mesh = Mesh::empty();
        assert!(mesh.is_empty());
        assert!(mesh.bounds.is_empty());
        assert!(!mesh.is_watertight());
    }

    #[test]
    fn open_quad_is_not_watertight() {
        assert!(!Mesh::new(vec![quad(0.0)]).is_watertight());
    }

    #[test]
    fn double_sided_quad_is_watertight() {
        // The same quad in both windings closes every edge.
        let front = quad(0.0);
        let mut back = front.clone();
        back.points.reverse();
        assert!(Mesh::new(vec![front, back]).is_watertight());
    }

    #[test]
    fn transformed_mesh_moves_bounds() {
        let mesh = Mesh::new(vec![quad(0.0)])
            .transformed(&Transform::offset(Vector::new(10.0, 0.0, 0.0)));
        assert_eq!(mesh.bounds.min.x, 10.0);
    }
}
