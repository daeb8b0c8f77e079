//! String built-ins.

use crate::convert::ConvertError;
use crate::stdlib::Builtin;
use crate::value::Value;

/// Apply a string built-in to its coerced argument.
pub(crate) fn apply_string(builtin: Builtin, arg: &Value) -> Result<Value, ConvertError> {
    match builtin {
        Builtin::Split => split(arg),
        Builtin::Join => join(arg),
        Builtin::Trim => match arg {
            Value::String(text) => Ok(Value::string(text.trim())),
            _ => Err(ConvertError::Mismatch),
        },
        _ => Err(ConvertError::Mismatch),
    }
}

fn split(arg: &Value) -> Result<Value, ConvertError> {
    let (text, separator) = match arg {
        Value::Tuple(elements) => match elements.as_slice() {
            [Value::String(text), Value::String(separator)] => (text, separator),
            _ => return Err(ConvertError::Mismatch),
        },
        _ => return Err(ConvertError::Mismatch),
    };
    if separator.is_empty() {
        return Ok(Value::Tuple(
            text.chars().map(|c| Value::string(c.to_string())).collect(),
        ));
    }
    Ok(Value::Tuple(
        text.split(separator.as_ref()).map(Value::string).collect(),
    ))
}

/// `join LIST SEPARATOR`, or `join LIST` for plain concatenation.
fn join(arg: &Value) -> Result<Value, ConvertError> {
    let (items, separator): (&[Value], &str) = match arg {
        Value::Tuple(elements) => match elements.as_slice() {
            [Value::Tuple(items), Value::String(separator)] => (items, separator),
            items => (items, ""),
        },
        single => (std::slice::from_ref(single), ""),
    };
    let joined = items
        .iter()
        .map(|item| item.log_description())
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::string(joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Value {
        Value::Tuple(values.iter().map(|&s| Value::string(s)).collect())
    }

    #[test]
    fn split_on_separator() {
        let arg = strings(&["a,b,c", ","]);
        assert_eq!(apply_string(Builtin::Split, &arg), Ok(strings(&["a", "b", "c"])));
    }

    #[test]
    fn split_empty_separator_yields_characters() {
        let arg = strings(&["abc", ""]);
        assert_eq!(apply_string(Builtin::Split, &arg), Ok(strings(&["a", "b", "c"])));
    }

    #[test]
    fn join_with_and_without_separator() {
        let arg = Value::Tuple(vec![strings(&["a", "b"]), Value::string("-")]);
        assert_eq!(apply_string(Builtin::Join, &arg), Ok(Value::string("a-b")));
        let arg = strings(&["a", "b", "c"]);
        assert_eq!(apply_string(Builtin::Join, &arg), Ok(Value::string("abc")));
    }

    #[test]
    fn join_stringifies_values() {
        let arg = Value::Tuple(vec![
            Value::Tuple(vec![Value::Number(1.0), Value::Number(2.5)]),
            Value::string("/"),
        ]);
        assert_eq!(apply_string(Builtin::Join, &arg), Ok(Value::string("1/2.5")));
    }

    #[test]
    fn trim_strips_whitespace() {
        assert_eq!(
            apply_string(Builtin::Trim, &Value::string("  hi \n")),
            Ok(Value::string("hi"))
        );
    }
}
