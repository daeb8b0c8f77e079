//! Math built-ins.
//!
//! All functions here are pure: they receive the argument already coerced
//! to the built-in's parameter type and return a value. A shape that still
//! does not fit (a non-numeric element inside `sum`'s open-typed list)
//! reports [`ConvertError::Mismatch`], which the evaluator wraps into a
//! `typeMismatch` with the built-in's name and source range.

use shape_geom::Vector;

use crate::convert::ConvertError;
use crate::stdlib::Builtin;
use crate::value::Value;

/// Apply a pure math built-in to its coerced argument.
pub(crate) fn apply_math(builtin: Builtin, arg: &Value) -> Result<Value, ConvertError> {
    match builtin {
        Builtin::Sum => sum(arg),
        Builtin::Length => Ok(Value::Number(vector_of(arg)?.length())),
        Builtin::Normalize => Ok(Value::Vector(vector_of(arg)?.normalized())),
        Builtin::Dot => {
            let (a, b) = vector_pair(arg)?;
            Ok(Value::Number(a.dot(b)))
        }
        Builtin::Cross => {
            let (a, b) = vector_pair(arg)?;
            Ok(Value::Vector(a.cross(b)))
        }
        Builtin::Floor => elementwise(arg, f64::floor),
        Builtin::Ceil => elementwise(arg, f64::ceil),
        Builtin::Round => elementwise(arg, f64::round),
        Builtin::Abs => elementwise(arg, f64::abs),
        Builtin::Sqrt => elementwise(arg, f64::sqrt),
        Builtin::Sign => elementwise(arg, |n| {
            if n == 0.0 {
                0.0
            } else {
                n.signum()
            }
        }),
        Builtin::Min => fold_numbers(arg, f64::min),
        Builtin::Max => fold_numbers(arg, f64::max),
        Builtin::Cos => Ok(Value::Number(radians_of(arg)?.cos())),
        Builtin::Sin => Ok(Value::Number(radians_of(arg)?.sin())),
        Builtin::Tan => Ok(Value::Number(radians_of(arg)?.tan())),
        Builtin::Acos => Ok(Value::Number(number_of(arg)?.acos())),
        Builtin::Asin => Ok(Value::Number(number_of(arg)?.asin())),
        Builtin::Atan => Ok(Value::Number(number_of(arg)?.atan())),
        Builtin::Atan2 => {
            let (y, x) = number_pair(arg)?;
            Ok(Value::Number(y.atan2(x)))
        }
        Builtin::Pow => {
            let (base, exponent) = number_pair(arg)?;
            Ok(Value::Number(base.powf(exponent)))
        }
        Builtin::Log => Ok(Value::Number(number_of(arg)?.ln())),
        Builtin::Exp => Ok(Value::Number(number_of(arg)?.exp())),
        Builtin::Clamp => {
            let [value, lo, hi] = number_triple(arg)?;
            Ok(Value::Number(value.clamp(lo, hi)))
        }
        Builtin::Lerp => {
            let [a, b, t] = number_triple(arg)?;
            Ok(Value::Number(a + (b - a) * t))
        }
        Builtin::Mod => {
            let (a, b) = number_pair(arg)?;
            if b == 0.0 {
                return Err(ConvertError::Mismatch);
            }
            Ok(Value::Number(a.rem_euclid(b)))
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn number_of(value: &Value) -> Result<f64, ConvertError> {
    value.as_number().ok_or(ConvertError::Mismatch)
}

/// Trig input: a bare number is already radians.
fn radians_of(value: &Value) -> Result<f64, ConvertError> {
    match value {
        Value::Radians(n) => Ok(*n),
        other => number_of(other),
    }
}

fn vector_of(value: &Value) -> Result<Vector, ConvertError> {
    match value {
        Value::Vector(v) | Value::Size(v) => Ok(*v),
        _ => Err(ConvertError::Mismatch),
    }
}

fn vector_pair(value: &Value) -> Result<(Vector, Vector), ConvertError> {
    match value {
        Value::Tuple(elements) if elements.len() == 2 => {
            Ok((vector_of(&elements[0])?, vector_of(&elements[1])?))
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn number_pair(value: &Value) -> Result<(f64, f64), ConvertError> {
    match value {
        Value::Tuple(elements) if elements.len() == 2 => {
            Ok((number_of(&elements[0])?, number_of(&elements[1])?))
        }
        _ => Err(ConvertError::Mismatch),
    }
}

fn number_triple(value: &Value) -> Result<[f64; 3], ConvertError> {
    match value {
        Value::Tuple(elements) if elements.len() == 3 => Ok([
            number_of(&elements[0])?,
            number_of(&elements[1])?,
            number_of(&elements[2])?,
        ]),
        _ => Err(ConvertError::Mismatch),
    }
}

/// Unary maps apply per component over vectors.
fn elementwise(value: &Value, f: impl Fn(f64) -> f64) -> Result<Value, ConvertError> {
    match value {
        Value::Vector(v) | Value::Size(v) => {
            Ok(Value::Vector(Vector::new(f(v.x), f(v.y), f(v.z))))
        }
        other => Ok(Value::Number(f(number_of(other)?))),
    }
}

fn fold_numbers(value: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, ConvertError> {
    let elements = match value {
        Value::Tuple(elements) if !elements.is_empty() => elements,
        _ => return Err(ConvertError::Mismatch),
    };
    let mut result = number_of(&elements[0])?;
    for element in &elements[1..] {
        result = f(result, number_of(element)?);
    }
    Ok(Value::Number(result))
}

/// The numeric components an addend contributes to `sum`.
fn addend_components(value: &Value) -> Result<Vec<f64>, ConvertError> {
    match value {
        Value::Vector(v) | Value::Size(v) => Ok(vec![v.x, v.y, v.z]),
        Value::Tuple(elements) => elements
            .iter()
            .map(|e| number_of(e))
            .collect::<Result<Vec<f64>, ConvertError>>(),
        other => Ok(vec![number_of(other)?]),
    }
}

/// Element-wise sum, broadcasting to the longest arity with zero fill.
fn sum(arg: &Value) -> Result<Value, ConvertError> {
    let addends = match arg {
        Value::Tuple(elements) => elements.as_slice(),
        single => std::slice::from_ref(single),
    };
    let mut totals: Vec<f64> = Vec::new();
    for addend in addends {
        let components = addend_components(addend)?;
        if components.len() > totals.len() {
            totals.resize(components.len(), 0.0);
        }
        for (total, component) in totals.iter_mut().zip(components) {
            *total += component;
        }
    }
    match totals.len() {
        0 => Ok(Value::Number(0.0)),
        1 => Ok(Value::Number(totals[0])),
        _ => Ok(Value::Tuple(totals.into_iter().map(Value::Number).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Value {
        Value::Tuple(values.iter().map(|&n| Value::Number(n)).collect())
    }

    #[test]
    fn sum_broadcasts_with_zero_fill() {
        let arg = Value::Tuple(vec![
            numbers(&[1.0, 2.0]),
            numbers(&[3.0, 4.0, 5.0, 6.0]),
            numbers(&[7.0, 8.0, 9.0]),
        ]);
        assert_eq!(
            apply_math(Builtin::Sum, &arg),
            Ok(numbers(&[11.0, 14.0, 14.0, 6.0]))
        );
    }

    #[test]
    fn sum_of_scalars_is_a_scalar() {
        assert_eq!(
            apply_math(Builtin::Sum, &numbers(&[1.0, 2.0, 3.0])),
            Ok(Value::Number(6.0))
        );
        assert_eq!(apply_math(Builtin::Sum, &Value::Tuple(vec![])), Ok(Value::Number(0.0)));
    }

    #[test]
    fn sum_rejects_non_numeric_addends() {
        let arg = Value::Tuple(vec![Value::Number(1.0), Value::Boolean(true)]);
        assert_eq!(apply_math(Builtin::Sum, &arg), Err(ConvertError::Mismatch));
    }

    #[test]
    fn vector_functions() {
        let v = Value::Vector(Vector::new(3.0, 4.0, 0.0));
        assert_eq!(apply_math(Builtin::Length, &v), Ok(Value::Number(5.0)));
        let x = Value::Vector(Vector::new(1.0, 0.0, 0.0));
        let y = Value::Vector(Vector::new(0.0, 1.0, 0.0));
        let pair = Value::Tuple(vec![x.clone(), y.clone()]);
        assert_eq!(apply_math(Builtin::Dot, &pair), Ok(Value::Number(0.0)));
        assert_eq!(
            apply_math(Builtin::Cross, &pair),
            Ok(Value::Vector(Vector::new(0.0, 0.0, 1.0)))
        );
        assert_eq!(
            apply_math(Builtin::Normalize, &Value::Vector(Vector::new(0.0, 5.0, 0.0))),
            Ok(Value::Vector(Vector::new(0.0, 1.0, 0.0)))
        );
    }

    #[test]
    fn rounding_is_elementwise_over_vectors() {
        assert_eq!(
            apply_math(Builtin::Floor, &Value::Number(1.7)),
            Ok(Value::Number(1.0))
        );
        assert_eq!(
            apply_math(
                Builtin::Round,
                &Value::Vector(Vector::new(1.4, 1.5, -1.2))
            ),
            Ok(Value::Vector(Vector::new(1.0, 2.0, -1.0)))
        );
        assert_eq!(
            apply_math(Builtin::Sign, &Value::Number(-3.0)),
            Ok(Value::Number(-1.0))
        );
        assert_eq!(apply_math(Builtin::Sign, &Value::Number(0.0)), Ok(Value::Number(0.0)));
    }

    #[test]
    fn trig_accepts_radian_values() {
        let cos_pi = apply_math(
            Builtin::Cos,
            &Value::Radians(std::f64::consts::PI),
        )
        .unwrap();
        match cos_pi {
            Value::Number(n) => assert!((n + 1.0).abs() < 1e-12),
            other => panic!("expected number, got {:?}", other),
        }
        // A bare number is already radians.
        assert_eq!(apply_math(Builtin::Cos, &Value::Number(0.0)), Ok(Value::Number(1.0)));
    }

    #[test]
    fn min_max_fold() {
        assert_eq!(
            apply_math(Builtin::Min, &numbers(&[3.0, 1.0, 2.0])),
            Ok(Value::Number(1.0))
        );
        assert_eq!(
            apply_math(Builtin::Max, &numbers(&[3.0, 1.0, 2.0])),
            Ok(Value::Number(3.0))
        );
        assert_eq!(
            apply_math(Builtin::Min, &Value::Tuple(vec![])),
            Err(ConvertError::Mismatch)
        );
    }

    #[test]
    fn binary_and_ternary_helpers() {
        assert_eq!(
            apply_math(Builtin::Pow, &numbers(&[2.0, 10.0])),
            Ok(Value::Number(1024.0))
        );
        assert_eq!(
            apply_math(Builtin::Mod, &numbers(&[-1.0, 3.0])),
            Ok(Value::Number(2.0))
        );
        assert_eq!(
            apply_math(Builtin::Mod, &numbers(&[1.0, 0.0])),
            Err(ConvertError::Mismatch)
        );
        assert_eq!(
            apply_math(Builtin::Clamp, &numbers(&[5.0, 0.0, 2.0])),
            Ok(Value::Number(2.0))
        );
        assert_eq!(
            apply_math(Builtin::Lerp, &numbers(&[0.0, 10.0, 0.25])),
            Ok(Value::Number(2.5))
        );
    }
}
