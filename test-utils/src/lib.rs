use ml_lang::{transpile, EngineError, Transpilation, TranspileOptions};

/// Substrings the emitted output must and must not contain.
pub struct Expected<'a> {
    pub contains: &'a [&'a str],
    pub absent: &'a [&'a str],
}

impl Expected<'_> {
    pub fn assert_matches(&self, output: &str) {
        for needle in self.contains {
            assert!(
                output.contains(needle),
                "expected emitted output to contain {needle:?}:\n{output}"
            );
        }
        for needle in self.absent {
            assert!(
                !output.contains(needle),
                "expected emitted output to not contain {needle:?}:\n{output}"
            );
        }
    }
}

/// Transpile a source string fully in memory.
pub fn transpile_silent(source: &str) -> Result<Transpilation, EngineError> {
    transpile(source, &TranspileOptions::silent())
}

/// Transpile in memory and assert on the emitted output.
pub fn check_emission(source: &str, expected: Expected) -> Transpilation {
    let result = transpile_silent(source).unwrap_or_else(|err| {
        panic!("transpilation should succeed, failed with: {err}");
    });
    expected.assert_matches(&result.output_source);
    result
}

/// Transpile in memory and return the error the compilation must
/// produce.
pub fn check_rejection(source: &str) -> EngineError {
    match transpile_silent(source) {
        Ok(result) => panic!(
            "transpilation should fail, but produced:\n{}",
            result.output_source
        ),
        Err(err) => err,
    }
}
