//! Single-file emission lifts module functions to file scope so that
//! sibling functions can call each other directly, and exposes them
//! through a generated namespace object.
use std::fs;

use ml_lang::{transpile, EmitMode, TranspileOptions};

const SORTING_MODULE: &str = r#"function swap(arr, i, j) {
    tmp = arr[i];
    arr[i] = arr[j];
    arr[j] = tmp;
    return arr;
}

function quicksort(arr) {
    n = len(arr);
    i = 0;
    while (i < n) {
        j = 0;
        while (j + 1 < n) {
            if (arr[j + 1] < arr[j]) {
                arr = swap(arr, j, j + 1);
            }
            j = j + 1;
        }
        i = i + 1;
    }
    return arr;
}
"#;

const MAIN: &str = "import sorting;\nprint(sorting.quicksort([3, 1, 2]));\n";

fn transpile_inline() -> String {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("sorting.ml"), SORTING_MODULE).expect("write module");

    let options = TranspileOptions {
        emit_mode: EmitMode::SingleFile,
        import_paths: vec![dir.path().to_path_buf()],
        source_name: dir.path().join("main.ml").to_string_lossy().to_string(),
        output_dir: Some(dir.path().join("out")),
        ..TranspileOptions::default()
    };

    let result = transpile(MAIN, &options).expect("transpilation should succeed");

    // the written output matches the returned output
    let written = fs::read_to_string(dir.path().join("out/main.py")).expect("output written");
    assert_eq!(written, result.output_source);
    assert!(
        dir.path().join("out/ml_runtime.py").exists(),
        "runtime library written next to the output"
    );

    result.output_source
}

#[test]
fn module_functions_lift_to_file_scope() {
    let output = transpile_inline();

    assert!(
        output.contains("\ndef _ml_sorting_swap(arr, i, j):"),
        "swap must be a top-level def:\n{output}"
    );
    assert!(
        output.contains("\ndef _ml_sorting_quicksort(arr):"),
        "quicksort must be a top-level def:\n{output}"
    );
}

#[test]
fn sibling_calls_use_the_lifted_names() {
    let output = transpile_inline();

    assert!(
        output.contains("arr = _ml_sorting_swap(arr, j, (j + 1))"),
        "quicksort must call the lifted swap directly:\n{output}"
    );
}

#[test]
fn namespace_object_exposes_both_functions() {
    let output = transpile_inline();

    assert!(
        output.contains(
            "sorting = ml_runtime.make_user_module(\"sorting\", \
             {\"quicksort\": _ml_sorting_quicksort, \"swap\": _ml_sorting_swap})"
        ),
        "namespace object expected:\n{output}"
    );
    assert!(
        output.contains("safe_method_call(sorting, \"quicksort\", [3, 1, 2])"),
        "main must call through the namespace:\n{output}"
    );
}
