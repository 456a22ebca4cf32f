use std::{collections::HashMap, sync::Arc};

use crate::registry::FunctionMetadata;

use super::RuntimeError;

/// Runtime value model of the embedded helpers.
///
/// ML-constructed objects get the tagged [`Record`] representation, so
/// `safe_method_call` dispatches on the tag instead of inspecting a
/// mapping's key types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Record(Record),
    Builtin(Arc<FunctionMetadata>),
    Module(ModuleNamespace),
}

/// Attribute map of an ML object literal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    attrs: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Record {
        Record {
            attrs: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.attrs.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Namespace exposing a module's members. User modules are marked so the
/// attribute helpers treat their names as trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNamespace {
    pub name: String,
    pub user_module: bool,
    attrs: HashMap<String, Value>,
}

impl ModuleNamespace {
    pub fn new(name: impl Into<String>, user_module: bool) -> ModuleNamespace {
        ModuleNamespace {
            name: name.into(),
            user_module,
            attrs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn member_names(&self) -> Vec<String> {
        let mut names = self.attrs.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Value {
    /// Type tag used for diagnostics and for safe-attribute registry
    /// lookups. Mirrors the host's spelling for host-visible types.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "list",
            Value::Record(_) => "object",
            Value::Builtin(_) => "function",
            Value::Module(_) => "module",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::Array(values) => !values.is_empty(),
            Value::Record(record) => !record.is_empty(),
            Value::Builtin(_) | Value::Module(_) => true,
        }
    }

    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "int".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::Str(value) => Ok(value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "str".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], RuntimeError> {
        match self {
            Value::Array(values) => Ok(values),
            other => Err(RuntimeError::TypeMismatch {
                expected: "array".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Int(value) => Ok(*value as f64),
            Value::Float(value) => Ok(*value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "number".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    /// Evaluate `self[start:end:step]` with the host's slice semantics:
    /// negative indices count from the end, out-of-range bounds clamp,
    /// and a zero step is an error.
    pub fn slice(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    ) -> Result<Value, RuntimeError> {
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(RuntimeError::Value("slice step cannot be zero".to_owned()));
        }

        match self {
            Value::Array(values) => Ok(Value::Array(
                slice_indices(values.len(), start, end, step)
                    .map(|index| values[index].clone())
                    .collect(),
            )),
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                Ok(Value::Str(
                    slice_indices(chars.len(), start, end, step)
                        .map(|index| chars[index])
                        .collect(),
                ))
            }
            other => Err(RuntimeError::TypeMismatch {
                expected: "array or str".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    /// Render the value the way the emitted program's `print` renders it.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(true) => "true".to_owned(),
            Value::Bool(false) => "false".to_owned(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Str(value) => value.clone(),
            Value::Array(values) => {
                let rendered = values
                    .iter()
                    .map(|value| value.render())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Record(record) => {
                let rendered = record
                    .keys()
                    .into_iter()
                    .filter_map(|key| {
                        record.get(&key).map(|value| format!("{key}: {}", value.render()))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
            Value::Builtin(metadata) => format!("<function {}>", metadata.name),
            Value::Module(namespace) => format!("<module {}>", namespace.name),
        }
    }
}

/// Indices a slice visits, in visit order. Resolution matches the
/// host's: negative indices are offset by the length, then clamped to
/// the valid range for the step's direction.
fn slice_indices(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
    step: i64,
) -> impl Iterator<Item = usize> {
    let n = len as i64;
    let resolve = move |index: Option<i64>, default: i64| -> i64 {
        match index {
            None => default,
            Some(mut value) => {
                if value < 0 {
                    value += n;
                }
                if step > 0 {
                    value.clamp(0, n)
                } else if value < 0 {
                    -1
                } else {
                    value.min(n - 1)
                }
            }
        }
    };

    let (default_start, default_end) = if step > 0 { (0, n) } else { (n - 1, -1) };
    let start = resolve(start, default_start);
    let end = resolve(end, default_end);

    std::iter::successors(Some(start), move |&current| Some(current + step))
        .take_while(move |&current| {
            if step > 0 {
                current < end
            } else {
                current > end
            }
        })
        .map(|current| current as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|value| Value::Int(*value)).collect())
    }

    #[test]
    fn test_full_and_reversed_slices() {
        let arr = ints(&[1, 2, 3, 4, 5]);

        assert_eq!(arr.slice(None, None, None), Ok(ints(&[1, 2, 3, 4, 5])));
        assert_eq!(arr.slice(None, None, Some(-1)), Ok(ints(&[5, 4, 3, 2, 1])));
    }

    #[test]
    fn test_boundary_slices() {
        let arr = ints(&[1, 2, 3, 4, 5]);

        assert_eq!(arr.slice(Some(-1), None, None), Ok(ints(&[5])));
        assert_eq!(arr.slice(Some(1), Some(100), None), Ok(ints(&[2, 3, 4, 5])));
        assert_eq!(arr.slice(Some(3), Some(1), None), Ok(ints(&[])));
        assert_eq!(arr.slice(Some(-10), None, Some(-1)), Ok(ints(&[])));
    }

    #[test]
    fn test_stepped_slices() {
        let arr = ints(&[1, 2, 3, 4, 5]);

        assert_eq!(arr.slice(None, None, Some(2)), Ok(ints(&[1, 3, 5])));
        assert_eq!(arr.slice(Some(4), Some(0), Some(-2)), Ok(ints(&[5, 3])));
    }

    #[test]
    fn test_zero_step_is_an_error() {
        let arr = ints(&[1, 2, 3]);
        assert!(arr.slice(None, None, Some(0)).is_err());
    }

    #[test]
    fn test_string_slicing() {
        let text = Value::Str("hello".to_owned());

        assert_eq!(
            text.slice(None, None, Some(-1)),
            Ok(Value::Str("olleh".to_owned()))
        );
        assert_eq!(
            text.slice(Some(1), Some(3), None),
            Ok(Value::Str("el".to_owned()))
        );
    }

    #[test]
    fn test_empty_sequence_slices() {
        let arr = ints(&[]);

        assert_eq!(arr.slice(None, None, None), Ok(ints(&[])));
        assert_eq!(arr.slice(None, None, Some(-1)), Ok(ints(&[])));
    }

    #[test]
    fn test_slice_of_non_sequence_rejected() {
        assert!(Value::Int(3).slice(None, None, None).is_err());
    }
}
