//! The runtime floor: names assembled at runtime are refused by the
//! helpers no matter how they were constructed, which is what the
//! static analyzer relies on for everything it cannot prove.
use test_utils::{check_emission, transpile_silent, Expected};

use ml_lang::{
    registry::stdlib_registry,
    runtime::{safe_attr_access, safe_call, safe_method_call, Record, Value},
};

fn builtin(name: &str) -> Value {
    let module = stdlib_registry()
        .lookup_module("builtin")
        .expect("builtin module registered");
    Value::Builtin(module.function(name).expect("function registered"))
}

#[test]
fn concatenated_dunder_compiles_but_refuses_at_runtime() {
    // the analyzer cannot prove the concatenation dangerous, so this
    // compiles (with a warning)
    let result = transpile_silent(
        "obj = {}; n = \"__\" + \"class__\"; r = getattr(obj, n, \"fallback\");",
    )
    .expect("compiles");
    assert!(result
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == "SEC003"));

    // at runtime the constructed name starts with `_`, so getattr
    // falls back to its default
    let name = format!("{}{}", "__", "class__");
    let getattr = builtin("getattr");
    let obj = Value::Record(Record::new());

    let with_default = safe_call(
        &getattr,
        &[
            obj.clone(),
            Value::Str(name.clone()),
            Value::Str("fallback".to_owned()),
        ],
    );
    assert_eq!(with_default, Ok(Value::Str("fallback".to_owned())));

    // and errors without a default
    let without_default = safe_call(&getattr, &[obj, Value::Str(name)]);
    assert!(without_default.is_err());
}

#[test]
fn underscore_names_refused_for_every_value_kind() {
    let values = [
        Value::Null,
        Value::Bool(true),
        Value::Int(0),
        Value::Float(0.5),
        Value::Str("s".to_owned()),
        Value::Array(vec![]),
        Value::Record(Record::new()),
    ];

    for value in &values {
        for name in ["_x", "__dict__", "_", "__subclasses__"] {
            assert!(
                safe_attr_access(value, name).is_err(),
                "'{name}' must be refused on {}",
                value.type_name()
            );
            assert!(
                safe_method_call(value, name, &[]).is_err(),
                "'{name}' must be refused on {}",
                value.type_name()
            );
        }
    }
}

#[test]
fn getattr_and_hasattr_stay_compilable() {
    check_emission(
        "obj = {a: 1}; x = getattr(obj, \"a\"); h = hasattr(obj, \"a\");",
        Expected {
            contains: &["builtin.getattr(obj, \"a\")", "builtin.hasattr(obj, \"a\")"],
            absent: &[],
        },
    );
}

#[test]
fn hasattr_reports_refused_names_as_absent() {
    let hasattr = builtin("hasattr");
    let mut record = Record::new();
    record.set("visible", Value::Int(1));
    let obj = Value::Record(record);

    assert_eq!(
        safe_call(
            &hasattr,
            &[obj.clone(), Value::Str("visible".to_owned())]
        ),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        safe_call(&hasattr, &[obj, Value::Str("__class__".to_owned())]),
        Ok(Value::Bool(false))
    );
}
