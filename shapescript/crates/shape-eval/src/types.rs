//! The static value-type lattice.
//!
//! Types form a lattice with `any` at the top and flat, order-independent
//! unions. `optional(T)` is sugar for `union(T, void)`. Simplification is
//! idempotent and collapses unions containing a supertype onto that
//! supertype.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// A static type.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    /// Top of the lattice.
    Any,
    Number,
    String,
    Boolean,
    Vector,
    Size,
    Color,
    Rotation,
    Radians,
    Halfturns,
    Range,
    Path,
    Polygon,
    Point,
    Mesh,
    Texture,
    Material,
    Font,
    Bounds,
    Void,
    /// Fixed arity, heterogeneous.
    Tuple(Vec<ValueType>),
    /// Variadic, homogeneous.
    List(Box<ValueType>),
    /// Known key set.
    Object(BTreeMap<String, ValueType>),
    /// An object of unknown shape.
    AnyObject,
    /// Flat, order-independent union.
    Union(Vec<ValueType>),
}

impl ValueType {
    /// `union(T, void)`.
    pub fn optional(inner: ValueType) -> ValueType {
        ValueType::Union(vec![inner, ValueType::Void]).simplified()
    }

    /// `union(number, vector)`, the type arithmetic broadcasts over.
    pub fn number_or_vector() -> ValueType {
        ValueType::Union(vec![ValueType::Number, ValueType::Vector])
    }

    pub fn list(inner: ValueType) -> ValueType {
        ValueType::List(Box::new(inner))
    }

    /// The union of `self` and `other`, simplified.
    pub fn union_with(self, other: ValueType) -> ValueType {
        ValueType::Union(vec![self, other]).simplified()
    }

    /// Normal form: unions flattened, deduplicated, and collapsed onto
    /// contained supertypes; composite types simplified component-wise.
    pub fn simplified(&self) -> ValueType {
        match self {
            ValueType::Union(members) => {
                let mut flat: Vec<ValueType> = Vec::new();
                for member in members {
                    match member.simplified() {
                        ValueType::Union(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                if flat.iter().any(|member| matches!(member, ValueType::Any)) {
                    return ValueType::Any;
                }
                // Drop duplicates and members subsumed by another member.
                let mut kept: Vec<ValueType> = Vec::new();
                for member in &flat {
                    let subsumed = flat.iter().any(|other| {
                        other != member && member.is_subtype(other) && !other.is_subtype(member)
                    });
                    if !subsumed && !kept.contains(member) {
                        kept.push(member.clone());
                    }
                }
                match kept.len() {
                    0 => ValueType::Void,
                    1 => kept.pop().expect("len checked"),
                    _ => ValueType::Union(kept),
                }
            }
            ValueType::List(inner) => ValueType::list(inner.simplified()),
            ValueType::Tuple(components) => {
                ValueType::Tuple(components.iter().map(|c| c.simplified()).collect())
            }
            ValueType::Object(fields) => ValueType::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.simplified()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Reflexive subtype check; `any` is the top.
    pub fn is_subtype(&self, other: &ValueType) -> bool {
        if self == other || matches!(other, ValueType::Any) {
            return true;
        }
        match (self, other) {
            (ValueType::Union(members), _) => {
                members.iter().all(|member| member.is_subtype(other))
            }
            (_, ValueType::Union(members)) => {
                members.iter().any(|member| self.is_subtype(member))
            }
            (ValueType::List(a), ValueType::List(b)) => a.is_subtype(b),
            (ValueType::Tuple(components), ValueType::List(element)) => {
                components.iter().all(|c| c.is_subtype(element))
            }
            (ValueType::Tuple(a), ValueType::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_subtype(y))
            }
            (ValueType::Object(_), ValueType::AnyObject) => true,
            (ValueType::Object(a), ValueType::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.get(key).is_some_and(|expected| value.is_subtype(expected))
                    })
            }
            _ => false,
        }
    }

    /// The static type of a member access, or `None` when the member is
    /// unknown for this type.
    pub fn member_type(&self, name: &str) -> Option<ValueType> {
        match self {
            ValueType::Vector | ValueType::Size => match name {
                "x" | "y" | "z" => Some(ValueType::Number),
                _ => None,
            },
            ValueType::Color => match name {
                "red" | "green" | "blue" | "alpha" => Some(ValueType::Number),
                _ => None,
            },
            ValueType::Path => match name {
                "points" => Some(ValueType::list(ValueType::Point)),
                "bounds" => Some(ValueType::Bounds),
                _ => None,
            },
            ValueType::Mesh => match name {
                "polygons" => Some(ValueType::list(ValueType::Polygon)),
                "bounds" => Some(ValueType::Bounds),
                _ => None,
            },
            ValueType::Polygon => match name {
                "points" => Some(ValueType::list(ValueType::Point)),
                "center" => Some(ValueType::Vector),
                _ => None,
            },
            ValueType::Point => match name {
                "position" => Some(ValueType::Vector),
                "color" => Some(ValueType::optional(ValueType::Color)),
                "isCurved" => Some(ValueType::Boolean),
                _ => None,
            },
            ValueType::Range => match name {
                "start" | "end" | "step" => Some(ValueType::Number),
                _ => None,
            },
            ValueType::Bounds => match name {
                "min" | "max" | "size" | "center" => Some(ValueType::Vector),
                "width" | "height" | "depth" => Some(ValueType::Number),
                _ => None,
            },
            ValueType::String => match name {
                "lines" | "words" | "characters" => Some(ValueType::list(ValueType::String)),
                "count" => Some(ValueType::Number),
                _ => None,
            },
            ValueType::Object(fields) => fields.get(name).cloned(),
            ValueType::AnyObject | ValueType::Any => Some(ValueType::Any),
            ValueType::List(element) => sequence_member(name, element, None),
            ValueType::Tuple(components) => {
                if let Some(found) = tuple_numeric_member(name, components) {
                    return Some(found);
                }
                let element = components
                    .iter()
                    .cloned()
                    .reduce(|a, b| a.union_with(b))
                    .unwrap_or(ValueType::Void);
                sequence_member(name, &element, Some(components))
            }
            ValueType::Union(members) => {
                let mut result: Option<ValueType> = None;
                for member in members {
                    if matches!(member, ValueType::Void) {
                        continue;
                    }
                    let member_type = member.member_type(name)?;
                    result = Some(match result {
                        Some(acc) => acc.union_with(member_type),
                        None => member_type,
                    });
                }
                result
            }
            _ => None,
        }
    }

    /// The runtime type of a value.
    pub fn of(value: &Value) -> ValueType {
        match value {
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Vector(_) => ValueType::Vector,
            Value::Size(_) => ValueType::Size,
            Value::Color(_) => ValueType::Color,
            Value::Rotation(_) => ValueType::Rotation,
            Value::Radians(_) => ValueType::Radians,
            Value::Halfturns(_) => ValueType::Halfturns,
            Value::Range(_) => ValueType::Range,
            Value::Tuple(elements) => {
                ValueType::Tuple(elements.iter().map(ValueType::of).collect())
            }
            Value::Object(map) => ValueType::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), ValueType::of(value)))
                    .collect(),
            ),
            Value::Path(_) => ValueType::Path,
            Value::Polygon(_) => ValueType::Polygon,
            Value::Point(_) => ValueType::Point,
            Value::Mesh(_) => ValueType::Mesh,
            Value::Texture(_) => ValueType::Texture,
            Value::Material(_) => ValueType::Material,
            Value::Font(_) => ValueType::Font,
            Value::Bounds(_) => ValueType::Bounds,
            Value::Void => ValueType::Void,
        }
    }
}

/// Ordinal and structural members shared by lists and tuples.
fn sequence_member(
    name: &str,
    element: &ValueType,
    components: Option<&[ValueType]>,
) -> Option<ValueType> {
    if let Some(index) = ordinal_index(name) {
        return Some(match components {
            Some(components) => components.get(index).cloned().unwrap_or(ValueType::Void),
            None => element.clone(),
        });
    }
    match name {
        "last" => Some(match components {
            Some(components) => components.last().cloned().unwrap_or(ValueType::Void),
            None => element.clone(),
        }),
        "count" => Some(ValueType::Number),
        "allButFirst" | "allButLast" => Some(ValueType::list(element.clone())),
        _ => {
            // Tuples of matching arity expose vector/colour accessors.
            if components.is_none() {
                element.member_type(name)
            } else {
                None
            }
        }
    }
}

/// Numeric tuples of small arity also answer to vector/colour members.
fn tuple_numeric_member(name: &str, components: &[ValueType]) -> Option<ValueType> {
    let all_numeric = !components.is_empty()
        && components
            .iter()
            .all(|c| c.is_subtype(&ValueType::Number));
    if !all_numeric {
        return None;
    }
    match name {
        "x" | "y" | "z" if components.len() <= 3 => Some(ValueType::Number),
        "red" | "green" | "blue" | "alpha" if components.len() <= 4 => Some(ValueType::Number),
        "width" | "height" | "depth" if components.len() <= 3 => Some(ValueType::Number),
        _ => None,
    }
}

/// Parse an English ordinal (`first` ... `ninetyninth`) to a 0-based index.
pub fn ordinal_index(name: &str) -> Option<usize> {
    const UNITS: [&str; 9] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    ];
    const TENS: [&str; 9] = [
        "tenth",
        "twentieth",
        "thirtieth",
        "fortieth",
        "fiftieth",
        "sixtieth",
        "seventieth",
        "eightieth",
        "ninetieth",
    ];
    const TEN_PREFIXES: [&str; 9] = [
        "ten", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ];
    if let Some(index) = UNITS.iter().position(|unit| *unit == name) {
        return Some(index);
    }
    if let Some(index) = TENS.iter().position(|ten| *ten == name) {
        return Some((index + 1) * 10 - 1);
    }
    for (tens, prefix) in TEN_PREFIXES.iter().enumerate().skip(1) {
        if let Some(rest) = name.strip_prefix(prefix) {
            if let Some(unit) = UNITS.iter().position(|u| *u == rest) {
                return Some((tens + 1) * 10 + unit);
            }
        }
    }
    None
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Number => write!(f, "number"),
            ValueType::String => write!(f, "string"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Vector => write!(f, "vector"),
            ValueType::Size => write!(f, "size"),
            ValueType::Color => write!(f, "color"),
            ValueType::Rotation => write!(f, "rotation"),
            ValueType::Radians => write!(f, "angle in radians"),
            ValueType::Halfturns => write!(f, "angle in half-turns"),
            ValueType::Range => write!(f, "range"),
            ValueType::Path => write!(f, "path"),
            ValueType::Polygon => write!(f, "polygon"),
            ValueType::Point => write!(f, "point"),
            ValueType::Mesh => write!(f, "mesh"),
            ValueType::Texture => write!(f, "texture"),
            ValueType::Material => write!(f, "material"),
            ValueType::Font => write!(f, "font"),
            ValueType::Bounds => write!(f, "bounds"),
            ValueType::Void => write!(f, "void"),
            ValueType::Tuple(components) => {
                write!(f, "tuple of ")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", component)?;
                }
                Ok(())
            }
            ValueType::List(element) => write!(f, "list of {}", element),
            ValueType::Object(_) => write!(f, "object"),
            ValueType::AnyObject => write!(f, "object"),
            ValueType::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_with_any_collapses() {
        let union = ValueType::Union(vec![ValueType::Number, ValueType::Any]);
        assert_eq!(union.simplified(), ValueType::Any);
    }

    #[test]
    fn nested_unions_flatten() {
        let union = ValueType::Union(vec![
            ValueType::Boolean,
            ValueType::Union(vec![ValueType::Number, ValueType::String]),
        ]);
        match union.simplified() {
            ValueType::Union(members) => {
                assert_eq!(members.len(), 3);
                assert!(members.contains(&ValueType::Boolean));
                assert!(members.contains(&ValueType::Number));
                assert!(members.contains(&ValueType::String));
            }
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn singleton_union_unwraps() {
        let union = ValueType::Union(vec![ValueType::Number, ValueType::Number]);
        assert_eq!(union.simplified(), ValueType::Number);
    }

    #[test]
    fn list_of_union_with_any_is_list_of_any() {
        let list = ValueType::list(ValueType::Union(vec![ValueType::Number, ValueType::Any]));
        assert_eq!(list.simplified(), ValueType::list(ValueType::Any));
    }

    #[test]
    fn optional_absorbs_void() {
        let optional = ValueType::optional(ValueType::optional(ValueType::Color));
        match optional {
            ValueType::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn subtype_rules() {
        assert!(ValueType::Number.is_subtype(&ValueType::Any));
        assert!(ValueType::Number.is_subtype(&ValueType::number_or_vector()));
        assert!(!ValueType::String.is_subtype(&ValueType::number_or_vector()));
        assert!(ValueType::list(ValueType::Number).is_subtype(&ValueType::list(ValueType::Any)));
        assert!(ValueType::Tuple(vec![ValueType::Number, ValueType::Number])
            .is_subtype(&ValueType::list(ValueType::Number)));
        assert!(!ValueType::Tuple(vec![ValueType::Number, ValueType::String])
            .is_subtype(&ValueType::list(ValueType::Number)));
        assert!(ValueType::Void.is_subtype(&ValueType::optional(ValueType::Color)));
        assert!(ValueType::Color.is_subtype(&ValueType::optional(ValueType::Color)));
    }

    #[test]
    fn union_subtype_collapse() {
        // A union containing a supertype collapses to that supertype.
        let union = ValueType::Union(vec![
            ValueType::Number,
            ValueType::number_or_vector(),
        ]);
        assert_eq!(union.simplified(), ValueType::number_or_vector().simplified());
    }

    #[test]
    fn member_types() {
        assert_eq!(
            ValueType::Vector.member_type("x"),
            Some(ValueType::Number)
        );
        assert_eq!(
            ValueType::Path.member_type("points"),
            Some(ValueType::list(ValueType::Point))
        );
        assert_eq!(
            ValueType::Point.member_type("color"),
            Some(ValueType::optional(ValueType::Color))
        );
        assert_eq!(ValueType::Vector.member_type("points"), None);
        assert_eq!(
            ValueType::list(ValueType::Point).member_type("first"),
            Some(ValueType::Point)
        );
        assert_eq!(
            ValueType::Tuple(vec![ValueType::Number, ValueType::String]).member_type("second"),
            Some(ValueType::String)
        );
        assert_eq!(
            ValueType::Tuple(vec![ValueType::Number; 3]).member_type("y"),
            Some(ValueType::Number)
        );
        assert_eq!(
            ValueType::Tuple(vec![ValueType::Number; 5]).member_type("y"),
            None
        );
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal_index("first"), Some(0));
        assert_eq!(ordinal_index("ninth"), Some(8));
        assert_eq!(ordinal_index("tenth"), Some(9));
        assert_eq!(ordinal_index("twentieth"), Some(19));
        assert_eq!(ordinal_index("twentyfirst"), Some(20));
        assert_eq!(ordinal_index("ninetyninth"), Some(98));
        assert_eq!(ordinal_index("zeroth"), None);
        assert_eq!(ordinal_index("points"), None);
    }

    #[test]
    fn runtime_type_of_values() {
        assert_eq!(ValueType::of(&Value::Number(1.0)), ValueType::Number);
        assert_eq!(
            ValueType::of(&Value::Tuple(vec![Value::Number(1.0), Value::string("x")])),
            ValueType::Tuple(vec![ValueType::Number, ValueType::String])
        );
    }

    fn arbitrary_type(seed: u64, depth: u8) -> ValueType {
        let leaf = match seed % 7 {
            0 => ValueType::Number,
            1 => ValueType::String,
            2 => ValueType::Boolean,
            3 => ValueType::Vector,
            4 => ValueType::Void,
            5 => ValueType::Any,
            _ => ValueType::Color,
        };
        if depth == 0 {
            return leaf;
        }
        match seed % 4 {
            0 => ValueType::list(arbitrary_type(seed / 4, depth - 1)),
            1 => ValueType::Union(vec![
                arbitrary_type(seed / 4, depth - 1),
                arbitrary_type(seed / 7 + 1, depth - 1),
            ]),
            2 => ValueType::Tuple(vec![
                arbitrary_type(seed / 4, depth - 1),
                arbitrary_type(seed / 5 + 2, depth - 1),
            ]),
            _ => leaf,
        }
    }

    #[quickcheck_macros::quickcheck]
    fn simplification_is_idempotent(seed: u64) -> bool {
        let ty = arbitrary_type(seed, 3);
        let once = ty.simplified();
        once.simplified() == once
    }

    #[quickcheck_macros::quickcheck]
    fn simplified_type_is_mutual_subtype(seed: u64) -> bool {
        let ty = arbitrary_type(seed, 3);
        let simplified = ty.simplified();
        ty.is_subtype(&simplified) && simplified.is_subtype(&ty)
    }
}
