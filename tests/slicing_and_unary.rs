use test_utils::{check_emission, transpile_silent, Expected};

use ml_lang::runtime::Value;

fn ints(values: &[i64]) -> Value {
    Value::Array(values.iter().map(|value| Value::Int(*value)).collect())
}

#[test]
fn boundary_slices_lower_natively() {
    check_emission(
        "arr = [1, 2, 3, 4, 5];\n\
         a = arr[:];\n\
         b = arr[::-1];\n\
         c = arr[-1:];\n\
         d = arr[1:100];\n\
         e = arr[3:1];\n\
         print(b);",
        Expected {
            contains: &[
                "a = arr[:]",
                "b = arr[::-1]",
                "c = arr[-1:]",
                "d = arr[1:100]",
                "e = arr[3:1]",
                "builtin.print(b)",
            ],
            absent: &[],
        },
    );
}

#[test]
fn boundary_slices_evaluate_on_the_native_floor() {
    let arr = ints(&[1, 2, 3, 4, 5]);

    // arr[:]
    assert_eq!(arr.slice(None, None, None), Ok(ints(&[1, 2, 3, 4, 5])));
    // arr[::-1]
    assert_eq!(arr.slice(None, None, Some(-1)), Ok(ints(&[5, 4, 3, 2, 1])));
    // arr[-1:]
    assert_eq!(arr.slice(Some(-1), None, None), Ok(ints(&[5])));
    // arr[1:100]
    assert_eq!(arr.slice(Some(1), Some(100), None), Ok(ints(&[2, 3, 4, 5])));
    // arr[3:1]
    assert_eq!(arr.slice(Some(3), Some(1), None), Ok(ints(&[])));
}

#[test]
fn zero_step_slice_compiles_and_fails_at_runtime_only() {
    check_emission(
        "arr = [1, 2, 3]; z = arr[::0];",
        Expected {
            contains: &["z = arr[::0]"],
            absent: &[],
        },
    );

    // arr[::0] is a runtime failure, not a compile-time one
    let arr = ints(&[1, 2, 3]);
    assert!(arr.slice(None, None, Some(0)).is_err());
}

#[test]
fn unary_boundary_cases_preserved() {
    check_emission(
        "x = 1; condition = true;\n\
         a = -5;\n\
         b = -(x + 1);\n\
         c = !condition;\n\
         d = !!x;",
        Expected {
            contains: &[
                "a = -5",
                "b = (-(x + 1))",
                "c = (not condition)",
                "d = (not (not x))",
            ],
            absent: &[],
        },
    );
}

#[test]
fn compilation_is_idempotent() {
    let source = "arr = [1, 2, 3, 4, 5]; print(arr[::-1]); total = len(arr) + -1;";

    let first = transpile_silent(source).expect("compiles");
    let second = transpile_silent(source).expect("compiles");
    assert_eq!(first.output_source, second.output_source);
}
