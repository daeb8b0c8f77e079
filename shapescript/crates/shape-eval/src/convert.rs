//! Value conversions.
//!
//! This is where most of the language's user-visible flexibility lives: a
//! bare number is a grayscale colour, three numbers are a vector or an RGB
//! triple depending on what the receiving symbol wants, an object with the
//! right keys is a material. Conversion is total on its declared domain:
//! whenever [`can_convert`] answers true, [`convert`] produces a value
//! whose runtime type is a subtype of the target.

use std::sync::Arc;

use shape_geom::{
    Color, Geometry, GeometryKind, Halfturns, Material, Mesh, Rotation, Texture, Vector,
};

use crate::types::ValueType;
use crate::value::Value;

/// Why a conversion failed. The evaluator wraps this with the receiving
/// symbol's name and source range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvertError {
    /// The value's shape does not fit the target type at all.
    Mismatch,
    /// A tuple with more components than the target accepts.
    TooMany { max: usize },
}

/// Whether `value` converts to `target`.
pub fn can_convert(value: &Value, target: &ValueType) -> bool {
    convert(value, target).is_ok()
}

/// Convert `value` to `target`, applying the implicit conversion rules.
pub fn convert(value: &Value, target: &ValueType) -> Result<Value, ConvertError> {
    // Exact fits pass through untouched.
    if ValueType::of(value).is_subtype(target) {
        return Ok(value.clone());
    }

    match target {
        ValueType::Any => Ok(value.clone()),
        ValueType::Union(members) => {
            for member in members {
                if let Ok(converted) = convert(value, member) {
                    return Ok(converted);
                }
            }
            Err(ConvertError::Mismatch)
        }
        ValueType::Number => match value {
            Value::Radians(n) | Value::Halfturns(n) => Ok(Value::Number(*n)),
            _ => value
                .as_number()
                .map(Value::Number)
                .ok_or(ConvertError::Mismatch),
        },
        ValueType::String => Ok(Value::string(value.log_description())),
        ValueType::Boolean => match value {
            Value::String(s) => match s.trim() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ConvertError::Mismatch),
            },
            _ => unwrap_singleton(value, target),
        },
        ValueType::Vector => to_vector(value),
        ValueType::Size => to_size(value),
        ValueType::Color => to_color(value),
        ValueType::Rotation => to_rotation(value),
        ValueType::Radians => match value {
            Value::Number(n) => Ok(Value::Radians(*n)),
            // Half-turns never silently reinterpret as radians.
            _ => unwrap_singleton(value, target),
        },
        ValueType::Halfturns => match value {
            Value::Number(n) => Ok(Value::Halfturns(*n)),
            _ => unwrap_singleton(value, target),
        },
        ValueType::Range => unwrap_singleton(value, target),
        ValueType::Tuple(components) => to_tuple(value, components),
        ValueType::List(element) => to_list(value, element),
        ValueType::Object(_) | ValueType::AnyObject => unwrap_singleton(value, target),
        ValueType::Material => to_material(value),
        ValueType::Texture => match value {
            Value::String(name) => Ok(Value::Texture(Texture::file(name.to_string(), None))),
            _ => unwrap_singleton(value, target),
        },
        ValueType::Font => match value {
            Value::String(name) => Ok(Value::Font(name.clone())),
            _ => unwrap_singleton(value, target),
        },
        ValueType::Mesh => to_mesh(value),
        ValueType::Path => match value {
            Value::Polygon(polygon) => Ok(Value::Path(Arc::new(polygon.as_path()))),
            _ => unwrap_singleton(value, target),
        },
        ValueType::Point => match value {
            Value::Vector(v) => Ok(Value::Point(shape_geom::PathPoint::corner(*v))),
            _ => unwrap_singleton(value, target),
        },
        ValueType::Polygon | ValueType::Bounds | ValueType::Void => {
            unwrap_singleton(value, target)
        }
    }
}

/// A one-element tuple converts as its element.
fn unwrap_singleton(value: &Value, target: &ValueType) -> Result<Value, ConvertError> {
    match value {
        Value::Tuple(elements) if elements.len() == 1 => convert(&elements[0], target),
        _ => Err(ConvertError::Mismatch),
    }
}

/// The numeric components of a tuple, when every element has them.
fn numeric_components(elements: &[Value]) -> Option<Vec<f64>> {
    elements.iter().map(|e| e.as_number()).collect()
}

fn to_vector(value: &Value) -> Result<Value, ConvertError> {
    match value {
        Value::Size(v) => Ok(Value::Vector(*v)),
        // A lone number is an x offset.
        Value::Number(n) => Ok(Value::Vector(Vector::new(*n, 0.0, 0.0))),
        Value::Tuple(elements) => {
            if elements.len() == 1 {
                if let Ok(inner) = convert(&elements[0], &ValueType::Vector) {
                    return Ok(inner);
                }
            }
            let components = numeric_components(elements).ok_or(ConvertError::Mismatch)?;
            match components.len() {
                0 => Err(ConvertError::Mismatch),
                1 => Ok(Value::Vector(Vector::new(components[0], 0.0, 0.0))),
                2 => Ok(Value::Vector(Vector::new(components[0], components[1], 0.0))),
                3 => Ok(Value::Vector(Vector::new(
                    components[0],
                    components[1],
                    components[2],
                ))),
                _ => Err(ConvertError::TooMany { max: 3 }),
            }
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn to_size(value: &Value) -> Result<Value, ConvertError> {
    match value {
        Value::Vector(v) => Ok(Value::Size(*v)),
        // A lone number scales uniformly.
        Value::Number(n) => Ok(Value::Size(Vector::splat(*n))),
        Value::Tuple(elements) => {
            if elements.len() == 1 {
                if let Ok(inner) = convert(&elements[0], &ValueType::Size) {
                    return Ok(inner);
                }
            }
            let components = numeric_components(elements).ok_or(ConvertError::Mismatch)?;
            match components.len() {
                0 => Err(ConvertError::Mismatch),
                1 => Ok(Value::Size(Vector::splat(components[0]))),
                // Width and height; depth tracks width.
                2 => Ok(Value::Size(Vector::new(
                    components[0],
                    components[1],
                    components[0],
                ))),
                3 => Ok(Value::Size(Vector::new(
                    components[0],
                    components[1],
                    components[2],
                ))),
                _ => Err(ConvertError::TooMany { max: 3 }),
            }
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn to_color(value: &Value) -> Result<Value, ConvertError> {
    match value {
        Value::Number(n) => Ok(Value::Color(Color::gray(*n))),
        Value::String(text) => {
            let digits = text.strip_prefix('#').ok_or(ConvertError::Mismatch)?;
            Color::from_hex_digits(digits)
                .map(Value::Color)
                .ok_or(ConvertError::Mismatch)
        }
        Value::Tuple(elements) => {
            if elements.is_empty() {
                return Err(ConvertError::Mismatch);
            }
            // A colour followed by a number overrides the alpha.
            if let [Value::Color(color), rest @ ..] = elements.as_slice() {
                return match rest {
                    [] => Ok(Value::Color(*color)),
                    [alpha] => {
                        let alpha = alpha.as_number().ok_or(ConvertError::Mismatch)?;
                        Ok(Value::Color(color.with_alpha(alpha)))
                    }
                    _ => Err(ConvertError::TooMany { max: 2 }),
                };
            }
            if elements.len() == 1 {
                return convert(&elements[0], &ValueType::Color);
            }
            let components = numeric_components(elements).ok_or(ConvertError::Mismatch)?;
            match components.as_slice() {
                [gray, alpha] => Ok(Value::Color(Color::gray(*gray).with_alpha(*alpha))),
                [r, g, b] => Ok(Value::Color(Color::rgb(*r, *g, *b))),
                [r, g, b, a] => Ok(Value::Color(Color::new(*r, *g, *b, *a))),
                _ => Err(ConvertError::TooMany { max: 4 }),
            }
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn to_rotation(value: &Value) -> Result<Value, ConvertError> {
    match value {
        // A lone number rolls, measured in half-turns. Radians are
        // deliberately not accepted: the unit must be explicit.
        Value::Number(n) => Ok(Value::Rotation(Rotation::roll(Halfturns(*n)))),
        Value::Halfturns(n) => Ok(Value::Rotation(Rotation::roll(Halfturns(*n)))),
        Value::Tuple(elements) => {
            if elements.len() == 1 {
                return convert(&elements[0], &ValueType::Rotation);
            }
            let components = numeric_components(elements).ok_or(ConvertError::Mismatch)?;
            match components.as_slice() {
                [] => Err(ConvertError::Mismatch),
                [roll] => Ok(Value::Rotation(Rotation::roll(Halfturns(*roll)))),
                [roll, yaw] => Ok(Value::Rotation(Rotation::from_euler(
                    Halfturns(*roll),
                    Halfturns(*yaw),
                    Halfturns(0.0),
                ))),
                [roll, yaw, pitch] => Ok(Value::Rotation(Rotation::from_euler(
                    Halfturns(*roll),
                    Halfturns(*yaw),
                    Halfturns(*pitch),
                ))),
                _ => Err(ConvertError::TooMany { max: 3 }),
            }
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn to_tuple(value: &Value, components: &[ValueType]) -> Result<Value, ConvertError> {
    match value {
        Value::Tuple(elements) if elements.len() == components.len() => {
            let converted: Result<Vec<Value>, ConvertError> = elements
                .iter()
                .zip(components)
                .map(|(element, target)| convert(element, target))
                .collect();
            Ok(Value::Tuple(converted?))
        }
        // A bare value fills a one-slot tuple.
        _ if components.len() == 1 => {
            Ok(Value::Tuple(vec![convert(value, &components[0])?]))
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn to_list(value: &Value, element: &ValueType) -> Result<Value, ConvertError> {
    match value {
        Value::Tuple(elements) => {
            let converted: Result<Vec<Value>, ConvertError> =
                elements.iter().map(|e| convert(e, element)).collect();
            Ok(Value::Tuple(converted?))
        }
        // An object lists its entries as (key, value) pairs, sorted.
        Value::Object(map)
            if matches!(element, ValueType::Tuple(pair)
                if pair.len() == 2 && pair[0] == ValueType::String) =>
        {
            Ok(Value::Tuple(Value::sorted_object_entries(map)))
        }
        // A colour lists its four components.
        Value::Color(color) if element.is_subtype(&ValueType::Number)
            || ValueType::Number.is_subtype(element) =>
        {
            Ok(Value::Tuple(
                color.components().iter().map(|&c| Value::Number(c)).collect(),
            ))
        }
        // Anything else is a one-element list of itself.
        _ => Ok(Value::Tuple(vec![convert(value, element)?])),
    }
}

/// The keys an object may carry when it stands in for a material.
fn to_material(value: &Value) -> Result<Value, ConvertError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Tuple(elements) if elements.len() == 1 => {
            return to_material(&elements[0]);
        }
        _ => return Err(ConvertError::Mismatch),
    };
    let mut material = Material::default();
    for (key, entry) in map {
        match key.as_str() {
            "opacity" => material.opacity = entry.as_number().ok_or(ConvertError::Mismatch)?,
            "metallicity" => {
                material.metallicity = entry.as_number().ok_or(ConvertError::Mismatch)?
            }
            "roughness" => {
                material.roughness = entry.as_number().ok_or(ConvertError::Mismatch)?
            }
            "glow" => material.glow = entry.as_number().ok_or(ConvertError::Mismatch)?,
            // Colour and texture both feed the albedo.
            "color" => match convert(entry, &ValueType::Color)? {
                Value::Color(color) => material.color = Some(color),
                _ => return Err(ConvertError::Mismatch),
            },
            "texture" => match convert(entry, &ValueType::Texture)? {
                Value::Texture(texture) => material.texture = Some(texture),
                _ => return Err(ConvertError::Mismatch),
            },
            "normals" => match convert(entry, &ValueType::Texture)? {
                Value::Texture(texture) => material.normals = Some(texture),
                _ => return Err(ConvertError::Mismatch),
            },
            _ => return Err(ConvertError::Mismatch),
        }
    }
    Ok(Value::Material(material))
}

fn to_mesh(value: &Value) -> Result<Value, ConvertError> {
    match value {
        // Paths become meshes by filling; the geometry node defers the
        // actual kernel call until someone builds it.
        Value::Path(path) => Ok(Value::Mesh(Arc::new(Geometry::new(GeometryKind::Path(
            path.as_ref().clone(),
        ))))),
        Value::Polygon(polygon) => Ok(Value::Mesh(Arc::new(Geometry::new(
            GeometryKind::Mesh(Arc::new(Mesh::new(vec![polygon.as_ref().clone()]))),
        )))),
        _ => unwrap_singleton(value, &ValueType::Mesh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use shape_geom::Path;

    fn numbers(values: &[f64]) -> Value {
        Value::Tuple(values.iter().map(|&n| Value::Number(n)).collect())
    }

    #[test]
    fn number_to_color_is_grayscale() {
        assert_eq!(
            convert(&Value::Number(0.5), &ValueType::Color),
            Ok(Value::Color(Color::gray(0.5)))
        );
    }

    #[test]
    fn tuple_to_color_arities() {
        assert_eq!(
            convert(&numbers(&[0.5, 0.25]), &ValueType::Color),
            Ok(Value::Color(Color::gray(0.5).with_alpha(0.25)))
        );
        assert_eq!(
            convert(&numbers(&[1.0, 0.0, 0.0]), &ValueType::Color),
            Ok(Value::Color(Color::RED))
        );
        assert_eq!(
            convert(&numbers(&[1.0, 0.0, 0.0, 0.5]), &ValueType::Color),
            Ok(Value::Color(Color::new(1.0, 0.0, 0.0, 0.5)))
        );
        assert_eq!(
            convert(&numbers(&[1.0, 2.0, 3.0, 4.0, 5.0]), &ValueType::Color),
            Err(ConvertError::TooMany { max: 4 })
        );
        assert_eq!(
            convert(&Value::Tuple(vec![]), &ValueType::Color),
            Err(ConvertError::Mismatch)
        );
    }

    #[test]
    fn color_with_alpha_override() {
        let pair = Value::Tuple(vec![Value::Color(Color::RED), Value::Number(0.5)]);
        assert_eq!(
            convert(&pair, &ValueType::Color),
            Ok(Value::Color(Color::RED.with_alpha(0.5)))
        );
    }

    #[test]
    fn hex_string_to_color() {
        assert_eq!(
            convert(&Value::string("#f00"), &ValueType::Color),
            Ok(Value::Color(Color::RED))
        );
        assert_eq!(
            convert(&Value::string("f00"), &ValueType::Color),
            Err(ConvertError::Mismatch)
        );
    }

    #[test]
    fn color_to_number_list() {
        assert_eq!(
            convert(
                &Value::Color(Color::new(1.0, 0.0, 0.0, 0.5)),
                &ValueType::list(ValueType::Number)
            ),
            Ok(numbers(&[1.0, 0.0, 0.0, 0.5]))
        );
    }

    #[test]
    fn number_to_list_wraps() {
        assert_eq!(
            convert(&Value::Number(5.0), &ValueType::list(ValueType::Number)),
            Ok(numbers(&[5.0]))
        );
        assert_eq!(
            convert(&Value::Number(5.0), &ValueType::Tuple(vec![ValueType::Number])),
            Ok(numbers(&[5.0]))
        );
    }

    #[test]
    fn vector_and_size_fill_differently() {
        assert_eq!(
            convert(&Value::Number(2.0), &ValueType::Vector),
            Ok(Value::Vector(Vector::new(2.0, 0.0, 0.0)))
        );
        assert_eq!(
            convert(&Value::Number(2.0), &ValueType::Size),
            Ok(Value::Size(Vector::splat(2.0)))
        );
        assert_eq!(
            convert(&numbers(&[1.0, 2.0]), &ValueType::Size),
            Ok(Value::Size(Vector::new(1.0, 2.0, 1.0)))
        );
        assert_eq!(
            convert(&numbers(&[1.0, 2.0]), &ValueType::Vector),
            Ok(Value::Vector(Vector::new(1.0, 2.0, 0.0)))
        );
        // Structural copies both ways.
        assert_eq!(
            convert(&Value::Size(Vector::ONE), &ValueType::Vector),
            Ok(Value::Vector(Vector::ONE))
        );
        assert_eq!(
            convert(&Value::Vector(Vector::ONE), &ValueType::Size),
            Ok(Value::Size(Vector::ONE))
        );
    }

    #[test]
    fn angle_units_do_not_cross() {
        assert!(can_convert(&Value::Radians(1.0), &ValueType::Number));
        assert!(can_convert(&Value::Halfturns(1.0), &ValueType::Number));
        assert!(can_convert(&Value::Number(1.0), &ValueType::Radians));
        assert!(!can_convert(&Value::Radians(1.0), &ValueType::Halfturns));
        assert!(!can_convert(&Value::Halfturns(1.0), &ValueType::Radians));
    }

    #[test]
    fn rotation_from_halfturns_not_radians() {
        assert_eq!(
            convert(&Value::Number(0.5), &ValueType::Rotation),
            Ok(Value::Rotation(Rotation::roll(Halfturns(0.5))))
        );
        assert!(can_convert(&Value::Halfturns(0.5), &ValueType::Rotation));
        assert!(!can_convert(&Value::Radians(0.5), &ValueType::Rotation));
        assert_eq!(
            convert(&numbers(&[0.5, 0.25, 0.0]), &ValueType::Rotation),
            Ok(Value::Rotation(Rotation::from_euler(
                Halfturns(0.5),
                Halfturns(0.25),
                Halfturns(0.0)
            )))
        );
    }

    #[test]
    fn singleton_tuple_unwraps() {
        let range = Value::Range(crate::value::RangeValue::new(1.0, 3.0));
        let wrapped = Value::Tuple(vec![range.clone()]);
        assert_eq!(convert(&wrapped, &ValueType::Range), Ok(range));
        assert_eq!(
            convert(&Value::Tuple(vec![Value::Number(5.0)]), &ValueType::Number),
            Ok(Value::Number(5.0))
        );
        assert_eq!(
            convert(&Value::Tuple(vec![Value::Number(5.0)]), &ValueType::String),
            Ok(Value::string("5"))
        );
    }

    #[test]
    fn numeric_string_to_number() {
        assert_eq!(
            convert(&Value::string("42"), &ValueType::Number),
            Ok(Value::Number(42.0))
        );
        assert!(!can_convert(&Value::string("nope"), &ValueType::Number));
    }

    #[test]
    fn anything_to_string_uses_log_rules() {
        assert_eq!(
            convert(&numbers(&[1.0, 2.0]), &ValueType::String),
            Ok(Value::string("1 2"))
        );
        assert_eq!(
            convert(
                &Value::Texture(Texture::file("wood.png", None)),
                &ValueType::String
            ),
            Ok(Value::string("wood.png"))
        );
        assert_eq!(
            convert(&Value::Font("Helvetica".into()), &ValueType::String),
            Ok(Value::string("Helvetica"))
        );
    }

    #[test]
    fn object_to_material_whitelist() {
        let mut map = IndexMap::new();
        map.insert("color".to_string(), Value::Color(Color::RED));
        map.insert("opacity".to_string(), Value::Number(0.5));
        map.insert("roughness".to_string(), Value::Number(0.1));
        let converted = convert(&Value::Object(map.clone()), &ValueType::Material).unwrap();
        match converted {
            Value::Material(material) => {
                assert_eq!(material.color, Some(Color::RED));
                assert_eq!(material.opacity, 0.5);
                assert_eq!(material.roughness, 0.1);
            }
            other => panic!("expected material, got {:?}", other),
        }

        map.insert("shininess".to_string(), Value::Number(1.0));
        assert_eq!(
            convert(&Value::Object(map), &ValueType::Material),
            Err(ConvertError::Mismatch)
        );
    }

    #[test]
    fn object_to_sorted_entry_list() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), Value::Number(2.0));
        map.insert("a".to_string(), Value::Number(1.0));
        let target = ValueType::list(ValueType::Tuple(vec![
            ValueType::String,
            ValueType::Any,
        ]));
        match convert(&Value::Object(map), &target).unwrap() {
            Value::Tuple(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(
                    entries[0],
                    Value::Tuple(vec![Value::string("a"), Value::Number(1.0)])
                );
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn path_to_mesh_defers_fill() {
        let path = Value::Path(Arc::new(Path::square()));
        match convert(&path, &ValueType::Mesh).unwrap() {
            Value::Mesh(geometry) => {
                assert!(matches!(geometry.kind, GeometryKind::Path(_)));
            }
            other => panic!("expected mesh, got {:?}", other),
        }
    }

    #[test]
    fn polygon_to_path_is_boundary() {
        let polygon = shape_geom::Polygon::new(Path::square().points);
        match convert(&Value::Polygon(Arc::new(polygon)), &ValueType::Path).unwrap() {
            Value::Path(path) => assert!(path.closed),
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn conversion_lands_in_target_type() {
        // Conversion is total on its declared domain.
        let samples = vec![
            Value::Number(1.0),
            Value::string("2.5"),
            numbers(&[1.0, 2.0, 3.0]),
            Value::Color(Color::BLUE),
            Value::Boolean(true),
        ];
        let targets = vec![
            ValueType::Number,
            ValueType::String,
            ValueType::Color,
            ValueType::Vector,
            ValueType::Size,
            ValueType::list(ValueType::Number),
            ValueType::list(ValueType::Any),
        ];
        for value in &samples {
            for target in &targets {
                if let Ok(converted) = convert(value, target) {
                    assert!(
                        ValueType::of(&converted).is_subtype(target),
                        "{:?} -> {:?} produced {:?}",
                        value,
                        target,
                        converted
                    );
                }
            }
        }
    }
}
