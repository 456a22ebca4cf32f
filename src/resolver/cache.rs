//! Mtime-keyed cache for multi-file emission.
//!
//! A manifest sibling file records the source-path → emitted-path
//! association; staleness is decided by comparing modification times.
//! Within one transpilation session each source compiles at most once,
//! so diamond imports cause no duplicate work.
use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

pub const CACHE_MANIFEST_NAME: &str = ".mlcache.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheManifest {
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    output_path: String,
    source_mtime_secs: u64,
}

#[derive(Debug)]
pub struct ModuleCache {
    manifest_path: PathBuf,
    manifest: CacheManifest,
    compiled_this_session: HashSet<PathBuf>,
}

fn mtime_secs(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|since| since.as_secs())
}

impl ModuleCache {
    /// Load the manifest from the output directory, starting empty when
    /// none exists yet.
    pub fn load(output_dir: &Path) -> ModuleCache {
        let manifest_path = output_dir.join(CACHE_MANIFEST_NAME);
        let manifest = fs::read_to_string(&manifest_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        ModuleCache {
            manifest_path,
            manifest,
            compiled_this_session: HashSet::new(),
        }
    }

    /// Whether the emitted output for a source is still usable: it must
    /// exist and be at least as new as the source.
    pub fn is_fresh(&self, source: &Path, output: &Path) -> bool {
        let (Some(source_mtime), Some(output_mtime)) = (mtime_secs(source), mtime_secs(output))
        else {
            return false;
        };

        let fresh = output_mtime >= source_mtime;
        trace!(
            "cache check for {}: source mtime {source_mtime}, output mtime {output_mtime}, fresh: {fresh}",
            source.display()
        );
        fresh
    }

    /// Whether this session already emitted the source, regardless of
    /// mtimes.
    pub fn already_compiled(&self, source: &Path) -> bool {
        self.compiled_this_session.contains(source)
    }

    pub fn mark_compiled(&mut self, source: &Path, output: &Path) {
        self.compiled_this_session.insert(source.to_path_buf());
        if let Some(source_mtime) = mtime_secs(source) {
            self.manifest.entries.insert(
                source.to_string_lossy().to_string(),
                CacheEntry {
                    output_path: output.to_string_lossy().to_string(),
                    source_mtime_secs: source_mtime,
                },
            );
        }
    }

    pub fn cached_output(&self, source: &Path) -> Option<PathBuf> {
        self.manifest
            .entries
            .get(source.to_string_lossy().as_ref())
            .map(|entry| PathBuf::from(&entry.output_path))
    }

    /// Persist the manifest next to the emitted files.
    pub fn save(&self) -> io::Result<()> {
        debug!(
            "saving module cache manifest to {}",
            self.manifest_path.display()
        );
        let content = serde_json::to_string_pretty(&self.manifest)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&self.manifest_path, content)
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn test_missing_output_is_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("m.ml");
        fs::write(&source, "x = 1;").expect("write source");

        let cache = ModuleCache::load(dir.path());
        assert!(!cache.is_fresh(&source, &dir.path().join("m.py")));
    }

    #[test]
    fn test_newer_output_is_fresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("m.ml");
        fs::write(&source, "x = 1;").expect("write source");
        thread::sleep(Duration::from_millis(1100));
        let output = dir.path().join("m.py");
        fs::write(&output, "x = 1\n").expect("write output");

        let cache = ModuleCache::load(dir.path());
        assert!(cache.is_fresh(&source, &output));
    }

    #[test]
    fn test_newer_source_is_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("m.py");
        fs::write(&output, "x = 1\n").expect("write output");
        thread::sleep(Duration::from_millis(1100));
        let source = dir.path().join("m.ml");
        fs::write(&source, "x = 2;").expect("write source");

        let cache = ModuleCache::load(dir.path());
        assert!(!cache.is_fresh(&source, &output));
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("m.ml");
        fs::write(&source, "x = 1;").expect("write source");
        let output = dir.path().join("m.py");

        let mut cache = ModuleCache::load(dir.path());
        cache.mark_compiled(&source, &output);
        assert!(cache.already_compiled(&source));
        cache.save().expect("save manifest");

        let reloaded = ModuleCache::load(dir.path());
        assert_eq!(reloaded.cached_output(&source), Some(output));
        // session-scoped dedup does not survive reload
        assert!(!reloaded.already_compiled(&source));
    }
}
