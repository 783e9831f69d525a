//! Conversion settings – reads/writes `lvt.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use lvt_convert::{AssemblerConfig, PipelineConfig};
use lvt_convert::pipeline::DEFAULT_BATCH_SIZE;
use lvt_types::{FailurePolicy, TargetFrame};
use serde::{Deserialize, Serialize};

/// Default file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "lvt.toml";

/// Persisted conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Frame ground-truth boxes are written in.
    #[serde(default)]
    pub ground_truth_frame: TargetFrame,

    /// Frame predicted boxes are written in.
    #[serde(default)]
    pub predicted_frame: TargetFrame,

    #[serde(default)]
    pub policy: FailurePolicy,

    /// Worker threads; `0` picks one per core.
    #[serde(default)]
    pub threads: usize,

    /// Frames assembled per parallel batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ground_truth_frame: TargetFrame::default(),
            predicted_frame: TargetFrame::default(),
            policy: FailurePolicy::default(),
            threads: 0,
            batch_size: default_batch_size(),
        }
    }
}

impl Config {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            assembler: AssemblerConfig {
                ground_truth_frame: self.ground_truth_frame,
                predicted_frame: self.predicted_frame,
                policy: self.policy,
            },
            threads: self.threads,
            batch_size: self.batch_size,
        }
    }
}

/// `./lvt.toml`
pub fn config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `LVT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LVT_POLICY` | `policy` (`fail-fast` / `best-effort`) |
/// | `LVT_THREADS` | `threads` |
/// | `LVT_BATCH_SIZE` | `batch_size` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("LVT_POLICY")
        && let Ok(policy) = v.parse::<FailurePolicy>()
    {
        cfg.policy = policy;
    }
    if let Ok(v) = std::env::var("LVT_THREADS")
        && let Ok(threads) = v.parse::<usize>()
    {
        cfg.threads = threads;
    }
    if let Ok(v) = std::env::var("LVT_BATCH_SIZE")
        && let Ok(size) = v.parse::<usize>()
        && size > 0
    {
        cfg.batch_size = size;
    }
}

/// Save the config to a specific path, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.ground_truth_frame, TargetFrame::Vehicle);
        assert_eq!(loaded.predicted_frame, TargetFrame::Vehicle);
        assert_eq!(loaded.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join(DEFAULT_CONFIG_FILE)).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "predicted_frame = \"source\"\nthreads = 3\n").expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.predicted_frame, TargetFrame::Source);
        assert_eq!(cfg.ground_truth_frame, TargetFrame::Vehicle);
        assert_eq!(cfg.threads, 3);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "policy = \"sometimes\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn pipeline_config_carries_every_field() {
        let cfg = Config {
            ground_truth_frame: TargetFrame::Source,
            predicted_frame: TargetFrame::Vehicle,
            policy: FailurePolicy::FailFast,
            threads: 4,
            batch_size: 8,
        };
        let p = cfg.pipeline();
        assert_eq!(p.assembler.ground_truth_frame, TargetFrame::Source);
        assert_eq!(p.assembler.policy, FailurePolicy::FailFast);
        assert_eq!(p.threads, 4);
        assert_eq!(p.batch_size, 8);
    }

    #[test]
    fn apply_env_overrides_changes_policy() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("LVT_POLICY", "fail-fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.policy, FailurePolicy::FailFast);
        unsafe { std::env::remove_var("LVT_POLICY") };
    }

    #[test]
    fn apply_env_overrides_changes_threads() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("LVT_THREADS", "6") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.threads, 6);
        unsafe { std::env::remove_var("LVT_THREADS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_batch_size() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("LVT_BATCH_SIZE", "0") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        unsafe { std::env::remove_var("LVT_BATCH_SIZE") };
    }
}
