use test_utils::{check_emission, Expected};

use ml_lang::{
    registry::stdlib_registry,
    runtime::{safe_call, Value},
};

const SRC: &str = "x = len([1, 2, 3]); print(x);";

#[test]
fn builtin_calls_route_through_module_object() {
    check_emission(
        SRC,
        Expected {
            contains: &[
                "builtin.len([1, 2, 3])",
                "builtin.print(x)",
                "import ml_runtime",
            ],
            absent: &["x = len(", "\nlen("],
        },
    );
}

#[test]
fn builtin_len_evaluates_to_three() {
    let module = stdlib_registry()
        .lookup_module("builtin")
        .expect("builtin module registered");
    let len = Value::Builtin(module.function("len").expect("len registered"));

    let result = safe_call(
        &len,
        &[Value::Array(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ])],
    );
    assert_eq!(result, Ok(Value::Int(3)));
}

#[test]
fn every_emitted_builtin_is_in_the_precomputed_set() {
    let result = check_emission(
        "total = max(1, 2) + abs(-3); print(str(total));",
        Expected {
            contains: &["builtin.max(1, 2)", "builtin.abs(-3)", "builtin.str(total)"],
            absent: &[],
        },
    );

    let registry = stdlib_registry();
    for line in result.output_source.lines() {
        let mut rest = line;
        while let Some(index) = rest.find("builtin.") {
            let after = &rest[index + "builtin.".len()..];
            let name: String = after
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                .collect();
            assert!(
                registry.is_allowed_builtin(&name),
                "emitted builtin '{name}' is not registered"
            );
            rest = &after[name.len()..];
        }
    }
}
