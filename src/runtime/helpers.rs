//! The runtime floor of the security model.
//!
//! Every helper refuses names beginning with `_` before any other
//! check runs. The static analyzer cannot see names assembled at
//! runtime; these checks are what catches them.
use log::trace;

use crate::{
    capabilities::require_capability,
    registry::{safe_attribute_registry, DANGEROUS_NAMES},
};

use super::{RuntimeError, Value};

fn check_name(name: &str) -> Result<(), RuntimeError> {
    if name.starts_with('_') {
        return Err(RuntimeError::security(
            name,
            "names beginning with '_' are never reachable",
        ));
    }
    if DANGEROUS_NAMES.contains(&name) {
        return Err(RuntimeError::security(
            name,
            "name is on the dangerous-pattern blacklist",
        ));
    }
    Ok(())
}

/// Whether a value is a generated user-module namespace, whose members
/// are trusted without consulting the safe-attribute registry.
pub fn is_user_module_namespace(value: &Value) -> bool {
    matches!(value, Value::Module(namespace) if namespace.user_module)
}

/// Call a callable value, enforcing its declared capability
/// requirements and recording one unit of usage per matched token.
pub fn safe_call(callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Builtin(metadata) = callee else {
        return Err(RuntimeError::NotCallable {
            type_name: callee.type_name().to_owned(),
        });
    };

    if !metadata.params.accepts(args.len()) {
        return Err(RuntimeError::Arity {
            name: metadata.name.clone(),
            expected: metadata.params.describe(),
            found: args.len(),
        });
    }

    for capability in &metadata.capabilities {
        let token = require_capability(capability)?;
        token.record_use()?;
    }

    let Some(func) = metadata.func else {
        return Err(RuntimeError::Value(format!(
            "'{}' has no native implementation in the embedded runtime",
            metadata.name
        )));
    };

    trace!("safe_call dispatching '{}'", metadata.name);
    func(args)
}

/// Attribute read with the three-case dispatch: refuse unsafe names,
/// trust ML records and module namespaces, and hold every other value
/// to the safe-attribute registry.
pub fn safe_attr_access(obj: &Value, name: &str) -> Result<Value, RuntimeError> {
    check_name(name)?;

    match obj {
        Value::Record(record) => record.get(name).cloned().ok_or_else(|| {
            RuntimeError::Value(format!("object has no attribute '{name}'"))
        }),
        Value::Module(namespace) => namespace.get(name).cloned().ok_or_else(|| {
            RuntimeError::Value(format!(
                "module '{}' has no member '{name}'",
                namespace.name
            ))
        }),
        other => {
            let registry = safe_attribute_registry();
            if registry.is_safe_attribute_name(other.type_name(), name) {
                Err(RuntimeError::Value(format!(
                    "attribute '{name}' on '{}' is a method; invoke it as a call",
                    other.type_name()
                )))
            } else {
                Err(RuntimeError::AttributeDenied {
                    type_name: other.type_name().to_owned(),
                    attribute: name.to_owned(),
                })
            }
        }
    }
}

/// Attribute write twin of [`safe_attr_access`]. Only ML records are
/// writable; module namespaces are frozen after construction.
pub fn safe_attr_assign(obj: &mut Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    check_name(name)?;

    match obj {
        Value::Record(record) => {
            record.set(name, value);
            Ok(())
        }
        Value::Module(namespace) => Err(RuntimeError::Value(format!(
            "module '{}' is frozen",
            namespace.name
        ))),
        other => Err(RuntimeError::AttributeDenied {
            type_name: other.type_name().to_owned(),
            attribute: name.to_owned(),
        }),
    }
}

/// Method call with the three-case dispatch.
pub fn safe_method_call(obj: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    check_name(name)?;

    match obj {
        Value::Record(record) => match record.get(name) {
            Some(callable @ Value::Builtin(_)) => safe_call(callable, args),
            Some(other) => Err(RuntimeError::NotCallable {
                type_name: other.type_name().to_owned(),
            }),
            None => Err(RuntimeError::Value(format!(
                "object has no method '{name}'"
            ))),
        },
        Value::Module(namespace) => match namespace.get(name) {
            Some(callable @ Value::Builtin(_)) => safe_call(callable, args),
            Some(other) => Err(RuntimeError::NotCallable {
                type_name: other.type_name().to_owned(),
            }),
            None => Err(RuntimeError::Value(format!(
                "module '{}' has no member '{name}'",
                namespace.name
            ))),
        },
        other => {
            let registry = safe_attribute_registry();
            if !registry.is_safe_attribute_name(other.type_name(), name) {
                return Err(RuntimeError::AttributeDenied {
                    type_name: other.type_name().to_owned(),
                    attribute: name.to_owned(),
                });
            }
            native_method(other, name, args)
        }
    }
}

/// Dispatch a whitelisted method on a host-native value.
///
/// The floor has no interior mutability, so host mutators whose return
/// value is nothing (`append`, `insert`, `remove`, `sort`, `reverse`,
/// `extend`) return the updated sequence instead; `pop` returns the
/// popped element like the host does. The registry's dict whitelist is
/// for the emitted host runtime only: ML object literals arrive here as
/// tagged records and dispatch before the registry is consulted, and no
/// untagged dict value exists in this floor.
fn native_method(obj: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    use super::builtins;

    let with_receiver = |rest: &[Value]| {
        let mut all = Vec::with_capacity(rest.len() + 1);
        all.push(obj.clone());
        all.extend_from_slice(rest);
        all
    };

    match (obj, name) {
        (Value::Str(_), "upper") => builtins::upper(&with_receiver(args)),
        (Value::Str(_), "lower") => builtins::lower(&with_receiver(args)),
        (Value::Str(_), "strip") => builtins::strip(&with_receiver(args)),
        (Value::Str(_), "split") => builtins::split(&with_receiver(args)),
        (Value::Str(_), "replace") => builtins::replace(&with_receiver(args)),
        (Value::Str(text), "startswith") => {
            let [prefix] = args else {
                return Err(RuntimeError::Arity {
                    name: "startswith".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            Ok(Value::Bool(text.starts_with(prefix.as_str()?)))
        }
        (Value::Str(text), "endswith") => {
            let [suffix] = args else {
                return Err(RuntimeError::Arity {
                    name: "endswith".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            Ok(Value::Bool(text.ends_with(suffix.as_str()?)))
        }
        (Value::Str(text), "find") => {
            let [needle] = args else {
                return Err(RuntimeError::Arity {
                    name: "find".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            let index = text
                .find(needle.as_str()?)
                .map(|byte| text[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::Int(index))
        }
        (Value::Str(separator), "join") => {
            let [parts] = args else {
                return Err(RuntimeError::Arity {
                    name: "join".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            builtins::join(&[parts.clone(), Value::Str(separator.clone())])
        }
        (Value::Array(values), "index") => {
            let [needle] = args else {
                return Err(RuntimeError::Arity {
                    name: "index".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            values
                .iter()
                .position(|value| value == needle)
                .map(|index| Value::Int(index as i64))
                .ok_or_else(|| RuntimeError::Value("value not in list".to_owned()))
        }
        (Value::Array(values), "count") => {
            let [needle] = args else {
                return Err(RuntimeError::Arity {
                    name: "count".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            let count = values.iter().filter(|value| *value == needle).count();
            Ok(Value::Int(count as i64))
        }
        (Value::Array(values), "append") => {
            let [element] = args else {
                return Err(RuntimeError::Arity {
                    name: "append".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            let mut updated = values.clone();
            updated.push(element.clone());
            Ok(Value::Array(updated))
        }
        (Value::Array(values), "pop") => {
            if values.is_empty() {
                return Err(RuntimeError::Value("pop from an empty list".to_owned()));
            }
            let index = match args {
                [] => values.len() as i64 - 1,
                [index] => index.as_int()?,
                _ => {
                    return Err(RuntimeError::Arity {
                        name: "pop".to_owned(),
                        expected: "0..1".to_owned(),
                        found: args.len(),
                    })
                }
            };
            let index = if index < 0 {
                index + values.len() as i64
            } else {
                index
            };
            if index < 0 || index >= values.len() as i64 {
                return Err(RuntimeError::Value("pop index out of range".to_owned()));
            }
            Ok(values[index as usize].clone())
        }
        (Value::Array(values), "insert") => {
            let [index, element] = args else {
                return Err(RuntimeError::Arity {
                    name: "insert".to_owned(),
                    expected: "2".to_owned(),
                    found: args.len(),
                });
            };
            let mut at = index.as_int()?;
            if at < 0 {
                at += values.len() as i64;
            }
            let at = at.clamp(0, values.len() as i64) as usize;
            let mut updated = values.clone();
            updated.insert(at, element.clone());
            Ok(Value::Array(updated))
        }
        (Value::Array(values), "remove") => {
            let [needle] = args else {
                return Err(RuntimeError::Arity {
                    name: "remove".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            let Some(position) = values.iter().position(|value| value == needle) else {
                return Err(RuntimeError::Value("value not in list".to_owned()));
            };
            let mut updated = values.clone();
            updated.remove(position);
            Ok(Value::Array(updated))
        }
        (Value::Array(values), "sort") => {
            if !args.is_empty() {
                return Err(RuntimeError::Arity {
                    name: "sort".to_owned(),
                    expected: "0".to_owned(),
                    found: args.len(),
                });
            }
            let mut updated = values.clone();
            let mut failure = None;
            updated.sort_by(|a, b| match compare_values(a, b) {
                Ok(ordering) => ordering,
                Err(err) => {
                    failure.get_or_insert(err);
                    std::cmp::Ordering::Equal
                }
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(Value::Array(updated)),
            }
        }
        (Value::Array(values), "reverse") => {
            if !args.is_empty() {
                return Err(RuntimeError::Arity {
                    name: "reverse".to_owned(),
                    expected: "0".to_owned(),
                    found: args.len(),
                });
            }
            Ok(Value::Array(values.iter().rev().cloned().collect()))
        }
        (Value::Array(values), "extend") => {
            let [other] = args else {
                return Err(RuntimeError::Arity {
                    name: "extend".to_owned(),
                    expected: "1".to_owned(),
                    found: args.len(),
                });
            };
            let mut updated = values.clone();
            updated.extend_from_slice(other.as_array()?);
            Ok(Value::Array(updated))
        }
        _ => Err(RuntimeError::Value(format!(
            "method '{name}' on '{}' is not available in the embedded runtime",
            obj.type_name()
        ))),
    }
}

fn compare_values(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a
            .as_float()?
            .partial_cmp(&b.as_float()?)
            .ok_or_else(|| RuntimeError::Value("values are not orderable".to_owned())),
        _ => Err(RuntimeError::TypeMismatch {
            expected: "comparable values".to_owned(),
            found: format!("{} and {}", a.type_name(), b.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        capabilities::{enter_context, CapabilityConstraints, CapabilityError, CapabilityToken},
        registry::stdlib_registry,
        runtime::Record,
    };

    use super::*;

    fn builtin(name: &str) -> Value {
        let module = stdlib_registry()
            .lookup_module("builtin")
            .expect("builtin module registered");
        Value::Builtin(module.function(name).expect("function registered"))
    }

    #[test]
    fn test_underscore_refused_on_every_receiver() {
        let receivers = [
            Value::Str("text".to_owned()),
            Value::Array(vec![]),
            Value::Record(Record::new()),
            Value::Int(3),
        ];

        for receiver in &receivers {
            let err = safe_attr_access(receiver, "__class__").expect_err("must refuse");
            assert!(err.is_security_refusal(), "got {err:?}");

            let err = safe_method_call(receiver, "_private", &[]).expect_err("must refuse");
            assert!(err.is_security_refusal(), "got {err:?}");
        }
    }

    #[test]
    fn test_runtime_concatenated_dunder_refused() {
        // the analyzer cannot see this name being built; the floor can
        let name = format!("{}{}", "__", "class__");
        let record = Value::Record(Record::new());
        let err = safe_attr_access(&record, &name).expect_err("must refuse");
        assert!(err.is_security_refusal());
    }

    #[test]
    fn test_blacklisted_name_refused() {
        let record = Value::Record(Record::new());
        for name in ["mro", "subclasses", "globals", "eval"] {
            let err = safe_attr_access(&record, name).expect_err("must refuse");
            assert!(err.is_security_refusal(), "'{name}' got {err:?}");
        }
    }

    #[test]
    fn test_record_attribute_lookup() {
        let mut record = Record::new();
        record.set("size", Value::Int(4));
        let record = Value::Record(record);

        assert_eq!(safe_attr_access(&record, "size"), Ok(Value::Int(4)));
        assert!(safe_attr_access(&record, "missing").is_err());
    }

    #[test]
    fn test_record_method_dispatch() {
        let mut record = Record::new();
        record.set("describe", builtin("typeof"));
        let record = Value::Record(record);

        let result = safe_method_call(&record, "describe", &[Value::Int(1)]);
        assert_eq!(result, Ok(Value::Str("int".to_owned())));
    }

    #[test]
    fn test_native_method_whitelisted() {
        let text = Value::Str("hello".to_owned());
        assert_eq!(
            safe_method_call(&text, "upper", &[]),
            Ok(Value::Str("HELLO".to_owned()))
        );
        assert_eq!(
            safe_method_call(&text, "startswith", &[Value::Str("he".to_owned())]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_native_method_not_whitelisted() {
        let text = Value::Str("hello".to_owned());
        let err = safe_method_call(&text, "mystery", &[]).expect_err("must refuse");
        assert!(matches!(err, RuntimeError::AttributeDenied { .. }));
    }

    #[test]
    fn test_native_list_methods() {
        let ints = |values: &[i64]| {
            Value::Array(values.iter().map(|value| Value::Int(*value)).collect())
        };
        let list = ints(&[3, 1, 2]);

        assert_eq!(
            safe_method_call(&list, "append", &[Value::Int(4)]),
            Ok(ints(&[3, 1, 2, 4]))
        );
        assert_eq!(safe_method_call(&list, "pop", &[]), Ok(Value::Int(2)));
        assert_eq!(
            safe_method_call(&list, "pop", &[Value::Int(-3)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            safe_method_call(&list, "insert", &[Value::Int(0), Value::Int(9)]),
            Ok(ints(&[9, 3, 1, 2]))
        );
        assert_eq!(
            safe_method_call(&list, "remove", &[Value::Int(1)]),
            Ok(ints(&[3, 2]))
        );
        assert_eq!(safe_method_call(&list, "sort", &[]), Ok(ints(&[1, 2, 3])));
        assert_eq!(
            safe_method_call(&list, "reverse", &[]),
            Ok(ints(&[2, 1, 3]))
        );
        assert_eq!(
            safe_method_call(&list, "extend", &[ints(&[7, 8])]),
            Ok(ints(&[3, 1, 2, 7, 8]))
        );
    }

    #[test]
    fn test_native_list_method_errors() {
        let empty = Value::Array(vec![]);
        assert!(safe_method_call(&empty, "pop", &[]).is_err());

        let list = Value::Array(vec![Value::Int(1)]);
        assert!(safe_method_call(&list, "remove", &[Value::Int(9)]).is_err());

        let mixed = Value::Array(vec![Value::Int(1), Value::Str("a".to_owned())]);
        let err = safe_method_call(&mixed, "sort", &[]).expect_err("unorderable");
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_attr_assign_on_record_only() {
        let mut record = Value::Record(Record::new());
        safe_attr_assign(&mut record, "field", Value::Int(1)).expect("record is writable");

        let mut number = Value::Int(3);
        assert!(safe_attr_assign(&mut number, "field", Value::Int(1)).is_err());

        let err = safe_attr_assign(&mut record, "_field", Value::Int(1)).expect_err("refuse");
        assert!(err.is_security_refusal());
    }

    #[test]
    fn test_safe_call_checks_arity() {
        let len = builtin("len");
        let err = safe_call(&len, &[]).expect_err("arity error");
        assert!(matches!(err, RuntimeError::Arity { .. }));
    }

    #[test]
    fn test_safe_call_enforces_capabilities() {
        let file_module = stdlib_registry()
            .lookup_module("file")
            .expect("file module registered");
        let read_text = Value::Builtin(
            file_module
                .function("read_text")
                .expect("read_text registered"),
        );

        let err = safe_call(&read_text, &[Value::Str("notes.txt".to_owned())])
            .expect_err("must fail without a capability");
        assert_eq!(
            err,
            RuntimeError::Capability(CapabilityError::Missing("FileRead".to_owned()))
        );
    }

    #[test]
    fn test_safe_call_records_usage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").expect("write fixture");

        let token = Arc::new(
            CapabilityToken::new(
                "FileRead",
                vec!["**".to_owned()],
                ["read".to_owned()],
                CapabilityConstraints::default(),
            )
            .expect("token should build"),
        );
        let _guard = enter_context(vec![token.clone()]);

        let file_module = stdlib_registry()
            .lookup_module("file")
            .expect("file module registered");
        let read_text = Value::Builtin(
            file_module
                .function("read_text")
                .expect("read_text registered"),
        );

        let content = safe_call(
            &read_text,
            &[Value::Str(path.to_string_lossy().into_owned())],
        )
        .expect("read should succeed");
        assert_eq!(content, Value::Str("hello".to_owned()));
        assert_eq!(token.usage(), 1);
    }

    #[test]
    fn test_user_module_namespace_trusted() {
        let mut namespace = crate::runtime::ModuleNamespace::new("sorting", true);
        namespace.insert("swap", builtin("typeof"));
        let module = Value::Module(namespace);

        assert!(is_user_module_namespace(&module));
        assert_eq!(
            safe_method_call(&module, "swap", &[Value::Bool(true)]),
            Ok(Value::Str("bool".to_owned()))
        );

        // underscore refusal still applies to module members
        let err = safe_attr_access(&module, "_is_user_module").expect_err("refuse");
        assert!(err.is_security_refusal());
    }
}
