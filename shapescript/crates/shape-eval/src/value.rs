//! Runtime values.
//!
//! Values are immutable and cheap to clone (geometry is `Arc`-shared).
//! They compare structurally, and `log_description` renders them the way
//! `print` does: primitive atoms joined with spaces, numbers trimmed of
//! trailing zeros.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use shape_geom::{Bounds, Color, Geometry, Material, Path, PathPoint, Polygon, Rotation, Texture};

/// A numeric range with an optional stride.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeValue {
    pub from: f64,
    pub to: f64,
    pub step: Option<f64>,
}

impl RangeValue {
    pub fn new(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            step: None,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// The effective stride: 1, or -1 for descending stepless ranges.
    pub fn stride(&self) -> f64 {
        match self.step {
            Some(step) => step,
            None if self.to < self.from => -1.0,
            None => 1.0,
        }
    }

    /// Iterate the range inclusively.
    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: self.from,
            range: *self,
        }
    }

    /// Whether the range contains `value` (on a stride point or not).
    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        value >= lo && value <= hi
    }
}

/// Iterator over a [`RangeValue`].
pub struct RangeIter {
    next: f64,
    range: RangeValue,
}

impl Iterator for RangeIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let stride = self.range.stride();
        if stride == 0.0 {
            return None;
        }
        let current = self.next;
        let done = if stride > 0.0 {
            current > self.range.to + 1e-9
        } else {
            current < self.range.to - 1e-9
        };
        if done {
            None
        } else {
            self.next = current + stride;
            Some(current)
        }
    }
}

/// The runtime value taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    String(Arc<str>),
    Boolean(bool),
    Vector(shape_geom::Vector),
    Size(shape_geom::Vector),
    Color(Color),
    Rotation(Rotation),
    /// An angle in radians; deliberately not interchangeable with
    /// half-turns.
    Radians(f64),
    /// An angle in half-turns.
    Halfturns(f64),
    Range(RangeValue),
    Tuple(Vec<Value>),
    /// Insertion-ordered map; iterates sorted by key when converted to a
    /// list.
    Object(IndexMap<String, Value>),
    Path(Arc<Path>),
    Polygon(Arc<Polygon>),
    Point(PathPoint),
    /// A geometry node (mesh-producing); building happens lazily through
    /// the kernel and cache.
    Mesh(Arc<Geometry>),
    Texture(Texture),
    Material(Material),
    Font(Arc<str>),
    Bounds(Bounds),
    Void,
}

impl Value {
    pub fn string(text: impl Into<Arc<str>>) -> Value {
        Value::String(text.into())
    }

    /// The short type name used in error messages.
    pub fn type_description(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Vector(_) => "vector",
            Value::Size(_) => "size",
            Value::Color(_) => "color",
            Value::Rotation(_) => "rotation",
            Value::Radians(_) => "angle in radians",
            Value::Halfturns(_) => "angle in half-turns",
            Value::Range(_) => "range",
            Value::Tuple(elements) if elements.is_empty() => "empty tuple",
            Value::Tuple(_) => "tuple",
            Value::Object(_) => "object",
            Value::Path(_) => "path",
            Value::Polygon(_) => "polygon",
            Value::Point(_) => "point",
            Value::Mesh(_) => "mesh",
            Value::Texture(_) => "texture",
            Value::Material(_) => "material",
            Value::Font(_) => "font",
            Value::Bounds(_) => "bounds",
            Value::Void => "void",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Whether the value is geometry (emitted as scene children rather
    /// than warned about as unused).
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Value::Mesh(_) | Value::Path(_) | Value::Polygon(_) | Value::Point(_)
        )
    }

    /// The numeric content, when the value is number-like. Strings with
    /// numeric content count, which is what lets arithmetic work on
    /// numeric strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            Value::Boolean(_) => None,
            Value::Tuple(elements) if elements.len() == 1 => elements[0].as_number(),
            _ => None,
        }
    }

    /// Tuple/list element access helpers used by ordinal members.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// Format a number the way ShapeScript prints: no trailing `.0`.
    pub fn format_number(n: f64) -> String {
        if n == 0.0 {
            return "0".to_string();
        }
        if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            let formatted = format!("{}", n);
            formatted
        }
    }

    /// The textual form used by `print` and string conversion.
    pub fn log_description(&self) -> String {
        match self {
            Value::Number(n) => Self::format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Vector(v) | Value::Size(v) => format!(
                "{} {} {}",
                Self::format_number(v.x),
                Self::format_number(v.y),
                Self::format_number(v.z)
            ),
            Value::Color(c) => format!(
                "{} {} {} {}",
                Self::format_number(c.r),
                Self::format_number(c.g),
                Self::format_number(c.b),
                Self::format_number(c.a)
            ),
            Value::Rotation(r) => format!(
                "{} {} {}",
                Self::format_number(r.roll_angle().0),
                Self::format_number(r.yaw_angle().0),
                Self::format_number(r.pitch_angle().0)
            ),
            Value::Radians(n) => format!("{} radians", Self::format_number(*n)),
            Value::Halfturns(n) => Self::format_number(*n),
            Value::Range(range) => match range.step {
                Some(step) => format!(
                    "{} to {} step {}",
                    Self::format_number(range.from),
                    Self::format_number(range.to),
                    Self::format_number(step)
                ),
                None => format!(
                    "{} to {}",
                    Self::format_number(range.from),
                    Self::format_number(range.to)
                ),
            },
            Value::Tuple(elements) => elements
                .iter()
                .map(|element| element.log_description())
                .collect::<Vec<_>>()
                .join(" "),
            Value::Object(map) => {
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                keys.iter()
                    .map(|key| format!("{} {}", key, map[key.as_str()].log_description()))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            Value::Path(_) => "path".to_string(),
            Value::Polygon(_) => "polygon".to_string(),
            Value::Point(p) => format!(
                "{} {} {}",
                Self::format_number(p.position.x),
                Self::format_number(p.position.y),
                Self::format_number(p.position.z)
            ),
            Value::Mesh(_) => "mesh".to_string(),
            Value::Texture(t) => t.name().unwrap_or("texture").to_string(),
            Value::Material(_) => "material".to_string(),
            Value::Font(name) => name.to_string(),
            Value::Bounds(b) => format!(
                "{} {} {} to {} {} {}",
                Self::format_number(b.min.x),
                Self::format_number(b.min.y),
                Self::format_number(b.min.z),
                Self::format_number(b.max.x),
                Self::format_number(b.max.y),
                Self::format_number(b.max.z)
            ),
            Value::Void => String::new(),
        }
    }

    /// The object's entries in sorted-key order, as `[key, value]` pairs.
    pub fn sorted_object_entries(map: &IndexMap<String, Value>) -> Vec<Value> {
        let mut keys: Vec<_> = map.keys().cloned().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let value = map[&key].clone();
                Value::Tuple(vec![Value::string(key), value])
            })
            .collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_description())
    }
}

fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    let normalised = if value == 0.0 { 0.0 } else { value };
    state.write_u64(normalised.to_bits());
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Number(n) | Value::Radians(n) | Value::Halfturns(n) => hash_f64(*n, state),
            Value::String(s) | Value::Font(s) => s.hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Vector(v) | Value::Size(v) => {
                hash_f64(v.x, state);
                hash_f64(v.y, state);
                hash_f64(v.z, state);
            }
            Value::Color(c) => {
                hash_f64(c.r, state);
                hash_f64(c.g, state);
                hash_f64(c.b, state);
                hash_f64(c.a, state);
            }
            Value::Rotation(r) => {
                for component in r.components() {
                    hash_f64(component, state);
                }
            }
            Value::Range(range) => {
                hash_f64(range.from, state);
                hash_f64(range.to, state);
                if let Some(step) = range.step {
                    hash_f64(step, state);
                }
            }
            Value::Tuple(elements) => {
                state.write_usize(elements.len());
                for element in elements {
                    element.hash(state);
                }
            }
            Value::Object(map) => {
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                for key in keys {
                    key.hash(state);
                    map[key.as_str()].hash(state);
                }
            }
            Value::Point(p) => {
                hash_f64(p.position.x, state);
                hash_f64(p.position.y, state);
                hash_f64(p.position.z, state);
                p.is_curved.hash(state);
            }
            Value::Path(path) => {
                state.write_usize(path.points.len());
                path.closed.hash(state);
            }
            Value::Polygon(polygon) => state.write_usize(polygon.points.len()),
            Value::Mesh(geometry) => geometry.fingerprint().hash(state),
            Value::Texture(texture) => texture.name().hash(state),
            Value::Material(_) | Value::Bounds(_) | Value::Void => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_iteration_inclusive() {
        let values: Vec<f64> = RangeValue::new(1.0, 4.0).iter().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn range_iteration_with_step() {
        let values: Vec<f64> = RangeValue::new(0.0, 1.0).with_step(0.25).iter().collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn descending_range_defaults_to_negative_stride() {
        let values: Vec<f64> = RangeValue::new(3.0, 1.0).iter().collect();
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn zero_step_yields_nothing() {
        let values: Vec<f64> = RangeValue::new(1.0, 5.0).with_step(0.0).iter().collect();
        assert!(values.is_empty());
    }

    #[test]
    fn range_contains_interval_not_stride() {
        let range = RangeValue::new(1.0, 5.0).with_step(2.0);
        assert!(range.contains(2.0));
        assert!(range.contains(5.0));
        assert!(!range.contains(5.5));
    }

    #[test]
    fn number_formatting_trims() {
        assert_eq!(Value::format_number(10.0), "10");
        assert_eq!(Value::format_number(1.5), "1.5");
        assert_eq!(Value::format_number(-0.0), "0");
        assert_eq!(Value::format_number(-2.0), "-2");
    }

    #[test]
    fn log_description_joins_with_spaces() {
        let tuple = Value::Tuple(vec![
            Value::Number(11.0),
            Value::Number(14.0),
            Value::Number(14.0),
            Value::Number(6.0),
        ]);
        assert_eq!(tuple.log_description(), "11 14 14 6");
        assert_eq!(Value::string("hello").log_description(), "hello");
    }

    #[test]
    fn numeric_strings_read_as_numbers() {
        assert_eq!(Value::string("42").as_number(), Some(42.0));
        assert_eq!(Value::string(" 1.5 ").as_number(), Some(1.5));
        assert_eq!(Value::string("nope").as_number(), None);
        assert_eq!(
            Value::Tuple(vec![Value::Number(5.0)]).as_number(),
            Some(5.0)
        );
    }

    #[test]
    fn object_entries_sorted_by_key() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Value::Number(2.0));
        map.insert("a".to_string(), Value::Number(1.0));
        let entries = Value::sorted_object_entries(&map);
        match &entries[0] {
            Value::Tuple(pair) => assert_eq!(pair[0], Value::string("a")),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn equal_values_hash_equally() {
        use std::collections::hash_map::DefaultHasher;
        let hash = |value: &Value| {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&Value::Number(0.0)), hash(&Value::Number(-0.0)));
        assert_eq!(
            hash(&Value::Tuple(vec![Value::Number(1.0)])),
            hash(&Value::Tuple(vec![Value::Number(1.0)]))
        );
        assert_ne!(hash(&Value::Number(1.0)), hash(&Value::string("1")));
    }
}
