use crate::models::Algorithm;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// What `start` does when the engine already has a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Refuse the new job with `JobAlreadyRunning`.
    #[default]
    Reject,
    /// Cancel the running job, then start the new one.
    Preempt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub on_busy: BusyPolicy,
    pub default_algorithm: Algorithm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            on_busy: BusyPolicy::Reject,
            default_algorithm: Algorithm::Sha256,
        }
    }
}

impl EngineConfig {
    /// Chunk size forced into the supported range.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }
}

pub fn default_config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("freehash").join("config.toml")
}

/// Layered load: optional TOML file, then FREEHASH_* environment variables
/// (e.g. FREEHASH_CHUNK_SIZE, FREEHASH_ON_BUSY).
pub fn load_config() -> Result<EngineConfig> {
    load_config_from(&default_config_path(), true)
}

pub fn load_config_from(path: &Path, with_env: bool) -> Result<EngineConfig> {
    let mut builder = Config::builder().add_source(File::from(path).required(false));
    if with_env {
        builder = builder.add_source(Environment::with_prefix("FREEHASH").try_parsing(true));
    }
    let s = builder
        .build()
        .with_context(|| format!("reading configuration from {}", path.display()))?;
    let cfg: EngineConfig = s
        .try_deserialize()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn reads_toml_file() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.toml");
        std::fs::write(
            &p,
            "chunk_size = 65536\non_busy = \"preempt\"\ndefault_algorithm = \"sha-512\"\n",
        )
        .unwrap();
        let cfg = load_config_from(&p, false).unwrap();
        assert_eq!(cfg.chunk_size, 65536);
        assert_eq!(cfg.on_busy, BusyPolicy::Preempt);
        assert_eq!(cfg.default_algorithm, Algorithm::Sha512);
    }

    #[test]
    fn bad_values_are_errors() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.toml");
        std::fs::write(&p, "default_algorithm = \"crc-7\"\n").unwrap();
        assert!(load_config_from(&p, false).is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("config.toml");
        std::fs::write(&p, "chunk_size = 65536\ndefault_algorithm = \"md5\"\n").unwrap();

        std::env::set_var("FREEHASH_CHUNK_SIZE", "8192");
        std::env::set_var("FREEHASH_ON_BUSY", "preempt");
        let loaded = load_config_from(&p, true);
        std::env::remove_var("FREEHASH_CHUNK_SIZE");
        std::env::remove_var("FREEHASH_ON_BUSY");

        let cfg = loaded.unwrap();
        assert_eq!(cfg.chunk_size, 8192);
        assert_eq!(cfg.on_busy, BusyPolicy::Preempt);
        assert_eq!(cfg.default_algorithm, Algorithm::Md5);
    }

    #[test]
    fn chunk_size_is_clamped() {
        let mut cfg = EngineConfig { chunk_size: 1, ..EngineConfig::default() };
        assert_eq!(cfg.effective_chunk_size(), MIN_CHUNK_SIZE);
        cfg.chunk_size = usize::MAX;
        assert_eq!(cfg.effective_chunk_size(), MAX_CHUNK_SIZE);
        cfg.chunk_size = 65536;
        assert_eq!(cfg.effective_chunk_size(), 65536);
    }
}
