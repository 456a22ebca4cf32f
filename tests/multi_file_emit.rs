//! Multi-file emission: output mirrors the source layout, package-init
//! files make host-module resolution work, and the mtime cache keeps
//! unchanged modules from being re-emitted.
use std::{fs, thread, time::Duration};

use ml_lang::{transpile, EmitMode, TranspileOptions};

const TEXT_MODULE: &str = "function shout(s) {\n    return len(s);\n}\n";
const MAIN: &str = "import utils.text;\nprint(text.shout(\"hi\"));\n";

fn options_for(dir: &std::path::Path) -> TranspileOptions {
    TranspileOptions {
        emit_mode: EmitMode::MultiFile,
        import_paths: vec![dir.to_path_buf()],
        source_name: dir.join("main.ml").to_string_lossy().to_string(),
        output_dir: Some(dir.join("out")),
        ..TranspileOptions::default()
    }
}

#[test]
fn output_mirrors_source_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("utils")).expect("mkdir");
    fs::write(dir.path().join("utils/text.ml"), TEXT_MODULE).expect("write module");

    let options = options_for(dir.path());
    let result = transpile(MAIN, &options).expect("transpilation should succeed");

    let out = dir.path().join("out");
    assert!(out.join("ml_runtime.py").exists());
    assert!(out.join("utils/__init__.py").exists());
    assert!(out.join("utils/text.py").exists());
    assert!(out.join("main.py").exists());
    assert!(out.join(".mlcache.json").exists());

    let module = fs::read_to_string(out.join("utils/text.py")).expect("module output");
    assert!(
        module.contains("_is_user_module = True"),
        "user modules carry the trust sentinel:\n{module}"
    );
    assert!(module.contains("def shout(s):"), "{module}");

    assert!(
        result.output_source.contains("from utils import text"),
        "caller emits a regular import:\n{}",
        result.output_source
    );
}

#[test]
fn cache_skips_fresh_modules_and_rebuilds_stale_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("utils")).expect("mkdir");
    let source_path = dir.path().join("utils/text.ml");
    fs::write(&source_path, TEXT_MODULE).expect("write module");

    let options = options_for(dir.path());
    transpile(MAIN, &options).expect("first run succeeds");

    let emitted_path = dir.path().join("out/utils/text.py");

    // leave a marker; a fresh cache entry must not overwrite it
    thread::sleep(Duration::from_millis(1100));
    let mut marked = fs::read_to_string(&emitted_path).expect("read emitted");
    marked.push_str("# marker\n");
    fs::write(&emitted_path, &marked).expect("write marker");

    transpile(MAIN, &options_for(dir.path())).expect("second run succeeds");
    let after_fresh_run = fs::read_to_string(&emitted_path).expect("read emitted");
    assert!(
        after_fresh_run.contains("# marker"),
        "fresh module must be reused, not re-emitted"
    );

    // make the source newer than the emitted file; the next run must
    // re-emit
    thread::sleep(Duration::from_millis(1100));
    fs::write(&source_path, TEXT_MODULE).expect("touch source");

    transpile(MAIN, &options_for(dir.path())).expect("third run succeeds");
    let after_stale_run = fs::read_to_string(&emitted_path).expect("read emitted");
    assert!(
        !after_stale_run.contains("# marker"),
        "stale module must be re-emitted"
    );
}
