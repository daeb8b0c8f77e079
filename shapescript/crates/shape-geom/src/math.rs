//! Scalar and affine math types: vectors, colours, angles, rotations,
//! bounds, and transforms.
//!
//! Rotations are stored as unit quaternions but constructed from and
//! reported as (roll, yaw, pitch) Euler angles measured in half-turns,
//! which is the unit ShapeScript programs use.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// A 3D vector (also used for points and sizes).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);
    pub const ONE: Vector = Vector::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn dot(&self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vector) -> Vector {
        Vector::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Unit vector in the same direction; zero stays zero.
    pub fn normalized(&self) -> Vector {
        let length = self.length();
        if length == 0.0 {
            Vector::ZERO
        } else {
            *self / length
        }
    }

    pub fn min(&self, other: Vector) -> Vector {
        Vector::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(&self, other: Vector) -> Vector {
        Vector::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    /// Component-wise multiplication.
    pub fn scaled(&self, other: Vector) -> Vector {
        Vector::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn lerp(&self, other: Vector, t: f64) -> Vector {
        *self + (other - *self) * t
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, factor: f64) -> Vector {
        Vector::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Div<f64> for Vector {
    type Output = Vector;
    fn div(self, divisor: f64) -> Vector {
        Vector::new(self.x / divisor, self.y / divisor, self.z / divisor)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

/// An RGBA colour with components in 0...1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Opaque grayscale.
    pub const fn gray(value: f64) -> Self {
        Self::new(value, value, value, 1.0)
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.a = alpha;
        self
    }

    /// The components as an array, RGBA order.
    pub fn components(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse hex digits (3, 4, 6, or 8 of them) into a colour.
    pub fn from_hex_digits(digits: &str) -> Option<Color> {
        fn nibble(b: u8) -> Option<f64> {
            (b as char).to_digit(16).map(|v| v as f64 / 15.0)
        }
        fn byte(hi: u8, lo: u8) -> Option<f64> {
            let hi = (hi as char).to_digit(16)?;
            let lo = (lo as char).to_digit(16)?;
            Some((hi * 16 + lo) as f64 / 255.0)
        }
        let b = digits.as_bytes();
        match b.len() {
            3 => Some(Color::rgb(nibble(b[0])?, nibble(b[1])?, nibble(b[2])?)),
            4 => Some(Color::new(
                nibble(b[0])?,
                nibble(b[1])?,
                nibble(b[2])?,
                nibble(b[3])?,
            )),
            6 => Some(Color::rgb(
                byte(b[0], b[1])?,
                byte(b[2], b[3])?,
                byte(b[4], b[5])?,
            )),
            8 => Some(Color::new(
                byte(b[0], b[1])?,
                byte(b[2], b[3])?,
                byte(b[4], b[5])?,
                byte(b[6], b[7])?,
            )),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// An angle measured in radians. Not interchangeable with [`Halfturns`].
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Radians(pub f64);

/// An angle measured in half-turns (1.0 = 180 degrees), the unit rotations
/// are written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Halfturns(pub f64);

impl Halfturns {
    pub fn to_radians(self) -> Radians {
        Radians(self.0 * std::f64::consts::PI)
    }
}

impl Radians {
    pub fn to_halfturns(self) -> Halfturns {
        Halfturns(self.0 / std::f64::consts::PI)
    }
}

/// An orientation, stored as a unit quaternion.
///
/// Constructed from (roll, yaw, pitch) Euler angles in half-turns: roll is
/// about the z axis, yaw about y, pitch about x, applied in that order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    fn axis_angle(axis: Vector, angle: Radians) -> Rotation {
        let half = angle.0 / 2.0;
        let (sin, cos) = half.sin_cos();
        Rotation {
            x: axis.x * sin,
            y: axis.y * sin,
            z: axis.z * sin,
            w: cos,
        }
    }

    /// The rotation taking unit vector `from` onto unit vector `to`.
    pub fn between(from: Vector, to: Vector) -> Rotation {
        let from = from.normalized();
        let to = to.normalized();
        let dot = from.dot(to).clamp(-1.0, 1.0);
        if dot > 1.0 - 1e-12 {
            return Rotation::IDENTITY;
        }
        if dot < -1.0 + 1e-12 {
            // Opposite vectors: rotate a half-turn about any perpendicular.
            let axis = from.cross(Vector::new(1.0, 0.0, 0.0));
            let axis = if axis.length() < 1e-9 {
                from.cross(Vector::new(0.0, 1.0, 0.0)).normalized()
            } else {
                axis.normalized()
            };
            return Rotation::axis_angle(axis, Radians(std::f64::consts::PI));
        }
        let axis = from.cross(to).normalized();
        Rotation::axis_angle(axis, Radians(dot.acos()))
    }

    /// Build from Euler angles in half-turns.
    pub fn from_euler(roll: Halfturns, yaw: Halfturns, pitch: Halfturns) -> Rotation {
        let rz = Rotation::axis_angle(Vector::new(0.0, 0.0, 1.0), roll.to_radians());
        let ry = Rotation::axis_angle(Vector::new(0.0, 1.0, 0.0), yaw.to_radians());
        let rx = Rotation::axis_angle(Vector::new(1.0, 0.0, 0.0), pitch.to_radians());
        rz * ry * rx
    }

    /// Roll about z only.
    pub fn roll(angle: Halfturns) -> Rotation {
        Rotation::from_euler(angle, Halfturns(0.0), Halfturns(0.0))
    }

    /// The roll component, in half-turns.
    pub fn roll_angle(&self) -> Halfturns {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        Radians(siny_cosp.atan2(cosy_cosp)).to_halfturns()
    }

    /// The yaw component, in half-turns.
    pub fn yaw_angle(&self) -> Halfturns {
        let sinp = 2.0 * (self.w * self.y - self.z * self.x);
        let clamped = sinp.clamp(-1.0, 1.0);
        Radians(clamped.asin()).to_halfturns()
    }

    /// The pitch component, in half-turns.
    pub fn pitch_angle(&self) -> Halfturns {
        let sinr_cosp = 2.0 * (self.w * self.x + self.y * self.z);
        let cosr_cosp = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);
        Radians(sinr_cosp.atan2(cosr_cosp)).to_halfturns()
    }

    /// Rotate a vector.
    pub fn rotate(&self, v: Vector) -> Vector {
        // q * v * q^-1, expanded.
        let u = Vector::new(self.x, self.y, self.z);
        let s = self.w;
        u * (2.0 * u.dot(v)) + v * (s * s - u.dot(u)) + u.cross(v) * (2.0 * s)
    }

    /// The quaternion components (x, y, z, w).
    pub fn components(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn is_identity(&self) -> bool {
        *self == Rotation::IDENTITY
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::IDENTITY
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vector,
    pub max: Vector,
}

impl Bounds {
    /// The empty bounds: the identity for [`Bounds::union`].
    pub const EMPTY: Bounds = Bounds {
        min: Vector::splat(f64::INFINITY),
        max: Vector::splat(f64::NEG_INFINITY),
    };

    pub fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// The exact bounds of a set of points.
    pub fn containing(points: impl IntoIterator<Item = Vector>) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        for point in points {
            bounds.min = bounds.min.min(point);
            bounds.max = bounds.max.max(point);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn size(&self) -> Vector {
        if self.is_empty() {
            Vector::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vector {
        if self.is_empty() {
            Vector::ZERO
        } else {
            (self.min + self.max) / 2.0
        }
    }

    pub fn union(&self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The bounds of this box's corners under a transform. Exact for the
    /// corner set, which makes it exact for sampled meshes but a superset
    /// for ideal solids.
    pub fn transformed(&self, transform: &Transform) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vector::new(self.min.x, self.min.y, self.min.z),
            Vector::new(self.max.x, self.min.y, self.min.z),
            Vector::new(self.min.x, self.max.y, self.min.z),
            Vector::new(self.max.x, self.max.y, self.min.z),
            Vector::new(self.min.x, self.min.y, self.max.z),
            Vector::new(self.max.x, self.min.y, self.max.z),
            Vector::new(self.min.x, self.max.y, self.max.z),
            Vector::new(self.max.x, self.max.y, self.max.z),
        ];
        Bounds::containing(corners.into_iter().map(|c| transform.apply(c)))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::EMPTY
    }
}

/// Scale, then rotate, then translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub offset: Vector,
    pub rotation: Rotation,
    pub scale: Vector,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        offset: Vector::ZERO,
        rotation: Rotation::IDENTITY,
        scale: Vector::ONE,
    };

    pub fn offset(offset: Vector) -> Transform {
        Transform {
            offset,
            ..Transform::IDENTITY
        }
    }

    pub fn scale(scale: Vector) -> Transform {
        Transform {
            scale,
            ..Transform::IDENTITY
        }
    }

    pub fn rotation(rotation: Rotation) -> Transform {
        Transform {
            rotation,
            ..Transform::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Transform::IDENTITY
    }

    /// Apply to a point.
    pub fn apply(&self, point: Vector) -> Vector {
        self.rotation.rotate(point.scaled(self.scale)) + self.offset
    }

    /// The transform equivalent to applying `child` then `self`.
    pub fn combined(&self, child: &Transform) -> Transform {
        Transform {
            offset: self.apply(child.offset),
            rotation: self.rotation * child.rotation,
            scale: self.scale.scaled(child.scale),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}
