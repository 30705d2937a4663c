//! Indexer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Knobs read by the model manager and the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub indexer_enabled: bool,
    /// Files above this many megabytes are not indexed. `None` is unlimited.
    pub file_size_limit_mb: Option<u32>,
    /// Process files one at a time and write every diagnostic to a task file.
    pub dump_diagnostics: bool,
    pub dump_dir: PathBuf,
    /// Write a configuration dump whenever project info changes.
    pub dump_project_info: bool,
    pub gc_delay: Duration,
    /// Worker threads; 0 lets rayon decide.
    pub worker_threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexer_enabled: true,
            file_size_limit_mb: Some(5),
            dump_diagnostics: false,
            dump_dir: std::env::temp_dir(),
            dump_project_info: false,
            gc_delay: Duration::from_millis(500),
            worker_threads: 0,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `CODEMODEL_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup. Unparsable values are ignored.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(enabled) = var("CODEMODEL_INDEXER_ENABLED").and_then(|v| parse_flag(&v)) {
            self.indexer_enabled = enabled;
        }
        if let Some(limit) = var("CODEMODEL_FILE_SIZE_LIMIT_MB") {
            match limit.trim().parse::<u32>() {
                Ok(0) => self.file_size_limit_mb = None,
                Ok(mb) => self.file_size_limit_mb = Some(mb),
                Err(_) => tracing::warn!(value = %limit, "ignoring invalid CODEMODEL_FILE_SIZE_LIMIT_MB"),
            }
        }
        if let Some(dump) = var("CODEMODEL_DUMP_DIAGNOSTICS").and_then(|v| parse_flag(&v)) {
            self.dump_diagnostics = dump;
        }
        if let Some(dir) = var("CODEMODEL_DUMP_DIR").filter(|d| !d.is_empty()) {
            self.dump_dir = PathBuf::from(dir);
        }
        if let Some(dump) = var("CODEMODEL_DUMP_PROJECT_INFO").and_then(|v| parse_flag(&v)) {
            self.dump_project_info = dump;
        }
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rustc_hash::FxHashMap;

    fn overlay(vars: &[(&str, &str)]) -> Settings {
        let vars: FxHashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::default().with_overrides(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.indexer_enabled);
        assert_eq!(settings.file_size_limit_mb, Some(5));
        assert_eq!(settings.gc_delay, Duration::from_millis(500));
    }

    #[rstest]
    #[case("0", None)]
    #[case("12", Some(12))]
    #[case("junk", Some(5))]
    fn test_size_limit_override(#[case] value: &str, #[case] expected: Option<u32>) {
        let settings = overlay(&[("CODEMODEL_FILE_SIZE_LIMIT_MB", value)]);
        assert_eq!(settings.file_size_limit_mb, expected);
    }

    #[test]
    fn test_flag_overrides() {
        let settings = overlay(&[
            ("CODEMODEL_INDEXER_ENABLED", "off"),
            ("CODEMODEL_DUMP_DIAGNOSTICS", "1"),
            ("CODEMODEL_DUMP_DIR", "/tmp/dumps"),
        ]);
        assert!(!settings.indexer_enabled);
        assert!(settings.dump_diagnostics);
        assert_eq!(settings.dump_dir, PathBuf::from("/tmp/dumps"));
        assert!(!settings.dump_project_info);
    }
}
