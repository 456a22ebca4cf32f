use test_utils::check_rejection;

use ml_lang::{diagnostics::Category, EngineError};

#[test]
fn unknown_identifier_blocks_compilation() {
    let err = check_rejection("y = type(42);");

    let EngineError::Codegen(err) = err else {
        panic!("expected a codegen error, got: {err}");
    };
    assert_eq!(err.diagnostic.category, Category::UnknownIdentifier);
    assert!(err.diagnostic.message.contains("'type'"));
    assert_eq!(
        err.diagnostic.remediation.as_deref(),
        Some("did you mean 'typeof'?")
    );
    assert!(
        err.diagnostic
            .hints
            .iter()
            .any(|hint| hint.starts_with("known builtins:")),
        "hints should bucket known names: {:?}",
        err.diagnostic.hints
    );
}

#[test]
fn eval_call_is_a_security_error() {
    let err = check_rejection("y = eval(\"1\");");

    let EngineError::Security(diagnostics) = err else {
        panic!("expected a security rejection, got: {err}");
    };
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == "SEC010" && diagnostic.is_error()));
}

#[test]
fn dunder_member_access_is_a_security_error() {
    let err = check_rejection("obj = {}; y = obj.__class__;");

    let EngineError::Security(diagnostics) = err else {
        panic!("expected a security rejection, got: {err}");
    };
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == "SEC002" && diagnostic.is_error()));
}

#[test]
fn unresolved_import_is_an_import_error() {
    let err = check_rejection("import nowhere;");

    let EngineError::Security(diagnostics) = err else {
        panic!("expected a rejection from the import-safety pass, got: {err}");
    };
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == "IMP001" && diagnostic.is_error()));
}

#[test]
fn strict_mode_promotes_warnings() {
    use ml_lang::{transpile, TranspileOptions};

    let source = "obj = {}; n = \"__\" + \"class__\"; r = getattr(obj, n, null);";

    // default mode: the literal concatenation is only a warning
    let relaxed = transpile(source, &TranspileOptions::silent()).expect("compiles");
    assert!(relaxed
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code == "SEC003"));

    let strict = TranspileOptions {
        strict: true,
        ..TranspileOptions::silent()
    };
    assert!(transpile(source, &strict).is_err());
}
