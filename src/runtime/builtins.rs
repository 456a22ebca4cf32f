//! Native implementations of the shipped standard-library routines.
//!
//! Every function has the [`BuiltinFn`](crate::registry::BuiltinFn)
//! signature so the registry's descriptor tables can reference it
//! directly.
use std::fs;

use crate::capabilities::{self, require_capability};

use super::{
    helpers::{safe_attr_access, safe_call},
    Record, RuntimeError, Value,
};

fn arity(name: &str, expected: &str, found: usize) -> RuntimeError {
    RuntimeError::Arity {
        name: name.to_owned(),
        expected: expected.to_owned(),
        found,
    }
}

// ---------------------------------------------------------------------
// builtin module

pub fn int(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("int", "1", args.len()));
    };

    match value {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Float(value) => Ok(Value::Int(*value as i64)),
        Value::Bool(value) => Ok(Value::Int(i64::from(*value))),
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::Value(format!("cannot convert '{text}' to int"))),
        other => Err(RuntimeError::TypeMismatch {
            expected: "number, bool, or str".to_owned(),
            found: other.type_name().to_owned(),
        }),
    }
}

pub fn float(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("float", "1", args.len()));
    };

    match value {
        Value::Int(value) => Ok(Value::Float(*value as f64)),
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Bool(value) => Ok(Value::Float(f64::from(u8::from(*value)))),
        Value::Str(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::Value(format!("cannot convert '{text}' to float"))),
        other => Err(RuntimeError::TypeMismatch {
            expected: "number, bool, or str".to_owned(),
            found: other.type_name().to_owned(),
        }),
    }
}

pub fn str(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("str", "1", args.len()));
    };
    Ok(Value::Str(value.render()))
}

pub fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("len", "1", args.len()));
    };

    let length = match value {
        Value::Str(text) => text.chars().count(),
        Value::Array(values) => values.len(),
        Value::Record(record) => record.len(),
        other => {
            return Err(RuntimeError::TypeMismatch {
                expected: "str, array, or object".to_owned(),
                found: other.type_name().to_owned(),
            })
        }
    };

    Ok(Value::Int(length as i64))
}

pub fn range(args: &[Value]) -> Result<Value, RuntimeError> {
    let (start, end, step) = match args {
        [end] => (0, end.as_int()?, 1),
        [start, end] => (start.as_int()?, end.as_int()?, 1),
        [start, end, step] => (start.as_int()?, end.as_int()?, step.as_int()?),
        _ => return Err(arity("range", "1..3", args.len())),
    };

    if step == 0 {
        return Err(RuntimeError::Value("range step cannot be zero".to_owned()));
    }

    let mut values = vec![];
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        values.push(Value::Int(current));
        current += step;
    }

    Ok(Value::Array(values))
}

pub fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered = args
        .iter()
        .map(Value::render)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{rendered}");
    Ok(Value::Null)
}

pub fn typeof_(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("typeof", "1", args.len()));
    };
    Ok(Value::Str(value.type_name().to_owned()))
}

pub fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("abs", "1", args.len()));
    };

    match value {
        Value::Int(value) => Ok(Value::Int(value.abs())),
        Value::Float(value) => Ok(Value::Float(value.abs())),
        other => Err(RuntimeError::TypeMismatch {
            expected: "number".to_owned(),
            found: other.type_name().to_owned(),
        }),
    }
}

fn extremum(name: &'static str, args: &[Value], pick_greater: bool) -> Result<Value, RuntimeError> {
    let items: &[Value] = match args {
        [Value::Array(values)] => values.as_slice(),
        [] => return Err(arity(name, "1+", 0)),
        items => items,
    };

    if items.is_empty() {
        return Err(RuntimeError::Value(format!("{name} of an empty sequence")));
    }

    let mut best = &items[0];
    for item in &items[1..] {
        let ordering = item.as_float()?.partial_cmp(&best.as_float()?);
        let replace = match ordering {
            Some(std::cmp::Ordering::Greater) => pick_greater,
            Some(std::cmp::Ordering::Less) => !pick_greater,
            _ => false,
        };
        if replace {
            best = item;
        }
    }

    Ok(best.clone())
}

pub fn min(args: &[Value]) -> Result<Value, RuntimeError> {
    extremum("min", args, false)
}

pub fn max(args: &[Value]) -> Result<Value, RuntimeError> {
    extremum("max", args, true)
}

pub fn keys(args: &[Value]) -> Result<Value, RuntimeError> {
    let [Value::Record(record)] = args else {
        return Err(RuntimeError::TypeMismatch {
            expected: "object".to_owned(),
            found: args.first().map(Value::type_name).unwrap_or("nothing").to_owned(),
        });
    };

    Ok(Value::Array(
        record.keys().into_iter().map(Value::Str).collect(),
    ))
}

pub fn values(args: &[Value]) -> Result<Value, RuntimeError> {
    let [Value::Record(record)] = args else {
        return Err(RuntimeError::TypeMismatch {
            expected: "object".to_owned(),
            found: args.first().map(Value::type_name).unwrap_or("nothing").to_owned(),
        });
    };

    Ok(Value::Array(
        record
            .keys()
            .into_iter()
            .filter_map(|key| record.get(&key).cloned())
            .collect(),
    ))
}

/// Safe `getattr`. The name check happens inside `safe_attr_access`, so
/// a dunder name assembled at runtime is refused here even though the
/// static analyzer could not see it; with a default provided, the
/// refusal degrades to the default instead of an error.
pub fn getattr(args: &[Value]) -> Result<Value, RuntimeError> {
    let (object, name, default) = match args {
        [object, name] => (object, name, None),
        [object, name, default] => (object, name, Some(default)),
        _ => return Err(arity("getattr", "2..3", args.len())),
    };

    let name = name.as_str()?;
    match safe_attr_access(object, name) {
        Ok(value) => Ok(value),
        Err(_) if default.is_some() => Ok(default.cloned().unwrap_or(Value::Null)),
        Err(err) => Err(err),
    }
}

pub fn hasattr(args: &[Value]) -> Result<Value, RuntimeError> {
    let [object, name] = args else {
        return Err(arity("hasattr", "2", args.len()));
    };

    let name = name.as_str()?;
    Ok(Value::Bool(safe_attr_access(object, name).is_ok()))
}

/// Safe `setattr`. Only ML objects are writable; the updated record is
/// returned.
pub fn setattr(args: &[Value]) -> Result<Value, RuntimeError> {
    let [object, name, value] = args else {
        return Err(arity("setattr", "3", args.len()));
    };

    let name = name.as_str()?;
    let mut object = object.clone();
    super::helpers::safe_attr_assign(&mut object, name, value.clone())?;
    Ok(object)
}

pub fn call(args: &[Value]) -> Result<Value, RuntimeError> {
    let Some((callee, rest)) = args.split_first() else {
        return Err(arity("call", "1+", 0));
    };
    safe_call(callee, rest)
}

pub fn has_capability(args: &[Value]) -> Result<Value, RuntimeError> {
    let [name] = args else {
        return Err(arity("has_capability", "1", args.len()));
    };
    Ok(Value::Bool(capabilities::has_capability(name.as_str()?)))
}

pub fn get_capabilities(args: &[Value]) -> Result<Value, RuntimeError> {
    if !args.is_empty() {
        return Err(arity("get_capabilities", "0", args.len()));
    }
    Ok(Value::Array(
        capabilities::get_capabilities()
            .into_iter()
            .map(Value::Str)
            .collect(),
    ))
}

pub fn get_capability_info(args: &[Value]) -> Result<Value, RuntimeError> {
    let [name] = args else {
        return Err(arity("get_capability_info", "1", args.len()));
    };

    let Some(info) = capabilities::get_capability_info(name.as_str()?) else {
        return Ok(Value::Null);
    };

    let mut record = Record::new();
    record.set("type", Value::Str(info.capability_type));
    record.set(
        "resources",
        Value::Array(info.resource_patterns.into_iter().map(Value::Str).collect()),
    );
    record.set(
        "operations",
        Value::Array(info.operations.into_iter().map(Value::Str).collect()),
    );
    record.set("usage", Value::Int(info.usage as i64));
    Ok(Value::Record(record))
}

pub fn required_capabilities(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("required_capabilities", "1", args.len()));
    };

    let Value::Builtin(metadata) = value else {
        return Err(RuntimeError::TypeMismatch {
            expected: "function".to_owned(),
            found: value.type_name().to_owned(),
        });
    };

    Ok(Value::Array(
        metadata
            .capabilities
            .iter()
            .cloned()
            .map(Value::Str)
            .collect(),
    ))
}

// ---------------------------------------------------------------------
// math module

fn unary_float(name: &str, args: &[Value]) -> Result<f64, RuntimeError> {
    let [value] = args else {
        return Err(arity(name, "1", args.len()));
    };
    value.as_float()
}

pub fn sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = unary_float("sqrt", args)?;
    if value < 0.0 {
        return Err(RuntimeError::Value("sqrt of a negative number".to_owned()));
    }
    Ok(Value::Float(value.sqrt()))
}

pub fn floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(unary_float("floor", args)?.floor() as i64))
}

pub fn ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(unary_float("ceil", args)?.ceil() as i64))
}

pub fn pow(args: &[Value]) -> Result<Value, RuntimeError> {
    let [base, exponent] = args else {
        return Err(arity("pow", "2", args.len()));
    };

    if let (Value::Int(base), Value::Int(exponent)) = (base, exponent) {
        if *exponent >= 0 && *exponent <= u32::MAX as i64 {
            if let Some(result) = base.checked_pow(*exponent as u32) {
                return Ok(Value::Int(result));
            }
        }
    }

    Ok(Value::Float(base.as_float()?.powf(exponent.as_float()?)))
}

pub fn sin(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(unary_float("sin", args)?.sin()))
}

pub fn cos(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(unary_float("cos", args)?.cos()))
}

// ---------------------------------------------------------------------
// string module

pub fn upper(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("upper", "1", args.len()));
    };
    Ok(Value::Str(value.as_str()?.to_uppercase()))
}

pub fn lower(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("lower", "1", args.len()));
    };
    Ok(Value::Str(value.as_str()?.to_lowercase()))
}

pub fn strip(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("strip", "1", args.len()));
    };
    Ok(Value::Str(value.as_str()?.trim().to_owned()))
}

pub fn split(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value, separator] = args else {
        return Err(arity("split", "2", args.len()));
    };

    Ok(Value::Array(
        value
            .as_str()?
            .split(separator.as_str()?)
            .map(|part| Value::Str(part.to_owned()))
            .collect(),
    ))
}

pub fn join(args: &[Value]) -> Result<Value, RuntimeError> {
    let [parts, separator] = args else {
        return Err(arity("join", "2", args.len()));
    };

    let mut rendered = vec![];
    for part in parts.as_array()? {
        rendered.push(part.as_str()?.to_owned());
    }

    Ok(Value::Str(rendered.join(separator.as_str()?)))
}

pub fn replace(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value, from, to] = args else {
        return Err(arity("replace", "3", args.len()));
    };
    Ok(Value::Str(
        value.as_str()?.replace(from.as_str()?, to.as_str()?),
    ))
}

pub fn contains(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value, needle] = args else {
        return Err(arity("contains", "2", args.len()));
    };
    Ok(Value::Bool(value.as_str()?.contains(needle.as_str()?)))
}

// ---------------------------------------------------------------------
// json module

pub fn dumps(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(arity("dumps", "1", args.len()));
    };

    let json = to_json(value)?;
    serde_json::to_string(&json)
        .map(Value::Str)
        .map_err(|err| RuntimeError::Value(format!("cannot serialize value: {err}")))
}

pub fn loads(args: &[Value]) -> Result<Value, RuntimeError> {
    let [text] = args else {
        return Err(arity("loads", "1", args.len()));
    };

    let json: serde_json::Value = serde_json::from_str(text.as_str()?)
        .map_err(|err| RuntimeError::Value(format!("invalid JSON: {err}")))?;
    Ok(from_json(&json))
}

fn to_json(value: &Value) -> Result<serde_json::Value, RuntimeError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(value) => serde_json::Value::Bool(*value),
        Value::Int(value) => serde_json::Value::from(*value),
        Value::Float(value) => serde_json::Value::from(*value),
        Value::Str(value) => serde_json::Value::String(value.clone()),
        Value::Array(values) => serde_json::Value::Array(
            values.iter().map(to_json).collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Record(record) => {
            let mut map = serde_json::Map::new();
            for key in record.keys() {
                if let Some(value) = record.get(&key) {
                    map.insert(key, to_json(value)?);
                }
            }
            serde_json::Value::Object(map)
        }
        other => {
            return Err(RuntimeError::TypeMismatch {
                expected: "serializable value".to_owned(),
                found: other.type_name().to_owned(),
            })
        }
    })
}

fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(value) => Value::Bool(*value),
        serde_json::Value::Number(value) => {
            if let Some(int) = value.as_i64() {
                Value::Int(int)
            } else {
                Value::Float(value.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(value) => Value::Str(value.clone()),
        serde_json::Value::Array(values) => {
            Value::Array(values.iter().map(from_json).collect())
        }
        serde_json::Value::Object(map) => Value::Record(Record::from_entries(
            map.iter().map(|(key, value)| (key.clone(), from_json(value))),
        )),
    }
}

// ---------------------------------------------------------------------
// file module

pub fn read_text(args: &[Value]) -> Result<Value, RuntimeError> {
    let [path] = args else {
        return Err(arity("read_text", "1", args.len()));
    };
    let path = path.as_str()?;

    let token = require_capability("FileRead")?;
    token.matches(path, "read")?;

    if let Some(max) = token.constraints().max_file_size {
        let size = fs::metadata(path)
            .map_err(|err| RuntimeError::Value(format!("cannot stat '{path}': {err}")))?
            .len();
        if size > max {
            return Err(RuntimeError::Value(format!(
                "'{path}' exceeds the capability's {max}-byte limit"
            )));
        }
    }

    fs::read_to_string(path)
        .map(Value::Str)
        .map_err(|err| RuntimeError::Value(format!("cannot read '{path}': {err}")))
}

pub fn write_text(args: &[Value]) -> Result<Value, RuntimeError> {
    let [path, content] = args else {
        return Err(arity("write_text", "2", args.len()));
    };
    let path = path.as_str()?;

    let token = require_capability("FileWrite")?;
    token.matches(path, "write")?;

    fs::write(path, content.as_str()?)
        .map(|()| Value::Null)
        .map_err(|err| RuntimeError::Value(format!("cannot write '{path}': {err}")))
}

pub fn exists(args: &[Value]) -> Result<Value, RuntimeError> {
    let [path] = args else {
        return Err(arity("exists", "1", args.len()));
    };
    let path = path.as_str()?;

    let token = require_capability("FileRead")?;
    token.matches(path, "read")?;

    Ok(Value::Bool(std::path::Path::new(path).exists()))
}
