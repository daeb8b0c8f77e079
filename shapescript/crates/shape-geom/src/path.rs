//! 2D paths and planar polygons.
//!
//! Paths live in the XY plane (with z free for 3D paths used as extrusion
//! rails). Points carry an optional colour, which is what makes a mesh
//! built from them non-uniformly coloured, and a curvature flag used by
//! builders to decide smoothing.

use crate::math::{Bounds, Color, Transform, Vector};

/// One vertex of a path or polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    pub position: Vector,
    /// Per-point colour override; `None` inherits the uniform material.
    pub color: Option<Color>,
    /// Whether the point is a curve control rather than a corner.
    pub is_curved: bool,
}

impl PathPoint {
    pub fn corner(position: Vector) -> Self {
        Self {
            position,
            color: None,
            is_curved: false,
        }
    }

    pub fn curve(position: Vector) -> Self {
        Self {
            position,
            color: None,
            is_curved: true,
        }
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }
}

/// An open or closed sequence of points.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Path {
    pub points: Vec<PathPoint>,
    pub closed: bool,
}

impl Path {
    pub fn new(points: Vec<PathPoint>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// An open polyline through the given positions.
    pub fn line(positions: impl IntoIterator<Item = Vector>) -> Self {
        Self {
            points: positions.into_iter().map(PathPoint::corner).collect(),
            closed: false,
        }
    }

    /// A closed polygon through the given positions.
    pub fn closed_polygon(positions: impl IntoIterator<Item = Vector>) -> Self {
        Self {
            points: positions.into_iter().map(PathPoint::corner).collect(),
            closed: true,
        }
    }

    /// A unit square centred on the origin.
    pub fn square() -> Self {
        Self::rect(1.0, 1.0)
    }

    /// An axis-aligned rectangle centred on the origin.
    pub fn rect(width: f64, height: f64) -> Self {
        let w = width / 2.0;
        let h = height / 2.0;
        Self::closed_polygon([
            Vector::new(-w, -h, 0.0),
            Vector::new(w, -h, 0.0),
            Vector::new(w, h, 0.0),
            Vector::new(-w, h, 0.0),
        ])
    }

    /// A regular polygon with `sides` vertices inscribed in the unit
    /// circle. With enough sides this is also the sampled circle.
    pub fn circle(sides: u32) -> Self {
        let sides = sides.max(3);
        let positions = (0..sides).map(|i| {
            let angle = (i as f64) / (sides as f64) * std::f64::consts::TAU;
            Vector::new(angle.cos() * 0.5, angle.sin() * 0.5, 0.0)
        });
        let mut path = Self::closed_polygon(positions);
        for point in &mut path.points {
            point.is_curved = true;
        }
        path
    }

    /// A rounded rectangle sampled with `detail` points per corner arc.
    pub fn roundrect(width: f64, height: f64, radius: f64, detail: u32) -> Self {
        let radius = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        if radius == 0.0 {
            return Self::rect(width, height);
        }
        let w = width / 2.0 - radius;
        let h = height / 2.0 - radius;
        let corners = [
            (Vector::new(w, h, 0.0), 0.0),
            (Vector::new(-w, h, 0.0), 0.25),
            (Vector::new(-w, -h, 0.0), 0.5),
            (Vector::new(w, -h, 0.0), 0.75),
        ];
        let steps = detail.max(1);
        let mut points = Vec::new();
        for (center, start) in corners {
            for i in 0..=steps {
                let t = start + (i as f64 / steps as f64) * 0.25;
                let angle = t * std::f64::consts::TAU;
                let position = center + Vector::new(angle.cos(), angle.sin(), 0.0) * radius;
                points.push(PathPoint::curve(position));
            }
        }
        Self {
            points,
            closed: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The exact bounds of the path's points.
    pub fn bounds(&self) -> Bounds {
        Bounds::containing(self.points.iter().map(|p| p.position))
    }

    /// Whether any point carries its own colour.
    pub fn has_point_colors(&self) -> bool {
        self.points.iter().any(|p| p.color.is_some())
    }

    /// The path with a transform applied to every point.
    pub fn transformed(&self, transform: &Transform) -> Path {
        Path {
            points: self
                .points
                .iter()
                .map(|p| PathPoint {
                    position: transform.apply(p.position),
                    ..*p
                })
                .collect(),
            closed: self.closed,
        }
    }

    /// Total length of the path's segments.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        for pair in self.points.windows(2) {
            total += (pair[1].position - pair[0].position).length();
        }
        if self.closed && self.points.len() > 2 {
            let first = self.points[0].position;
            let last = self.points[self.points.len() - 1].position;
            total += (first - last).length();
        }
        total
    }
}

/// A planar polygon, always treated as closed.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub points: Vec<PathPoint>,
}

impl Polygon {
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    /// The average of the vertex positions.
    pub fn center(&self) -> Vector {
        if self.points.is_empty() {
            return Vector::ZERO;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector::ZERO, |acc, p| acc + p.position);
        sum / self.points.len() as f64
    }

    /// The polygon's boundary as a closed path.
    pub fn as_path(&self) -> Path {
        Path {
            points: self.points.clone(),
            closed: true,
        }
    }

    /// Whether any vertex carries its own colour.
    pub fn has_vertex_colors(&self) -> bool {
        self.points.iter().any(|p| p.color.is_some())
    }

    /// The polygon with a transform applied to every vertex.
    pub fn transformed(&self, transform: &Transform) -> Polygon {
        Polygon {
            points: self
                .points
                .iter()
                .map(|p| PathPoint {
                    position: transform.apply(p.position),
                    ..*p
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_is_unit_sized_and_closed() {
        let square = Path::square();
        assert_eq!(square.points.len(), 4);
        assert!(square.closed);
        let bounds = square.bounds();
        assert_eq!(bounds.size(), Vector::new(1.0, 1.0, 0.0));
        assert_eq!(bounds.center(), Vector::ZERO);
    }

    #[test]
    fn circle_is_sampled_and_curved() {
        let circle = Path::circle(16);
        assert_eq!(circle.points.len(), 16);
        assert!(circle.points.iter().all(|p| p.is_curved));
        // All points on the radius-0.5 circle.
        for point in &circle.points {
            assert!((point.position.length() - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn circle_clamps_minimum_sides() {
        assert_eq!(Path::circle(0).points.len(), 3);
    }

    #[test]
    fn roundrect_with_zero_radius_is_rect() {
        let path = Path::roundrect(2.0, 1.0, 0.0, 4);
        assert_eq!(path.points.len(), 4);
    }

    #[test]
    fn path_length_closed_vs_open() {
        let open = Path::line([
            Vector::ZERO,
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(1.0, 1.0, 0.0),
        ]);
        assert!((open.length() - 2.0).abs() < 1e-9);
        let square = Path::square();
        assert!((square.length() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn polygon_center_and_boundary() {
        let polygon = Polygon::new(
            Path::rect(2.0, 2.0).points,
        );
        assert_eq!(polygon.center(), Vector::ZERO);
        let path = polygon.as_path();
        assert!(path.closed);
        assert_eq!(path.points.len(), 4);
    }

    #[test]
    fn point_colors_detected() {
        let mut path = Path::square();
        assert!(!path.has_point_colors());
        path.points[0].color = Some(Color::RED);
        assert!(path.has_point_colors());
    }

    #[test]
    fn transformed_path_moves_points() {
        let path = Path::square().transformed(&Transform::offset(Vector::new(5.0, 0.0, 0.0)));
        assert_eq!(path.bounds().center(), Vector::new(5.0, 0.0, 0.0));
    }
}
