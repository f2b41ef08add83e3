//! Sequencer configuration stored in `sequencer.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::runtime::service::SessionDefaults;
use crate::runtime::session::Revision;

/// Sequencer configuration (TOML).
///
/// Edited by humans; missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SequencerConfig {
    pub engine: EngineConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for child selection and reordering. Unset draws from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub randomization_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub default_revision: Revision,
    pub default_credit: String,
    pub default_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_completion_threshold: Option<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let defaults = SessionDefaults::default();
        Self {
            default_revision: defaults.revision,
            default_credit: defaults.credit,
            default_mode: defaults.mode,
            default_completion_threshold: defaults.completion_threshold,
        }
    }
}

impl RuntimeConfig {
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            revision: self.default_revision,
            credit: self.default_credit.clone(),
            mode: self.default_mode.clone(),
            completion_threshold: self.default_completion_threshold,
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<()> {
        let runtime = &self.runtime;
        if !["credit", "no-credit"].contains(&runtime.default_credit.as_str()) {
            return Err(anyhow!(
                "runtime.default_credit must be 'credit' or 'no-credit', got '{}'",
                runtime.default_credit
            ));
        }
        if !["browse", "normal", "review"].contains(&runtime.default_mode.as_str()) {
            return Err(anyhow!(
                "runtime.default_mode must be 'browse', 'normal' or 'review', got '{}'",
                runtime.default_mode
            ));
        }
        if let Some(threshold) = runtime.default_completion_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(anyhow!(
                "runtime.default_completion_threshold must be within [0,1], got {}",
                threshold
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SequencerConfig::default()`.
pub fn load_config(path: &Path) -> Result<SequencerConfig> {
    if !path.exists() {
        let cfg = SequencerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SequencerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SequencerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, SequencerConfig::default());
        assert_eq!(cfg.runtime.default_revision, Revision::Scorm2004);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sequencer.toml");
        let mut cfg = SequencerConfig::default();
        cfg.engine.randomization_seed = Some(42);
        cfg.runtime.default_revision = Revision::Scorm12;
        cfg.runtime.default_completion_threshold = Some(0.6);
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    /// Partial files keep defaults for every omitted field.
    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sequencer.toml");
        fs::write(&path, "[runtime]\ndefault_revision = \"1.2\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.runtime.default_revision, Revision::Scorm12);
        assert_eq!(cfg.runtime.default_mode, "normal");
        assert_eq!(cfg.engine.randomization_seed, None);
    }

    #[test]
    fn rejects_unknown_vocabulary_and_thresholds() {
        let mut cfg = SequencerConfig::default();
        cfg.runtime.default_mode = "fast".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = SequencerConfig::default();
        cfg.runtime.default_completion_threshold = Some(1.5);
        let err = cfg.validate().expect_err("threshold");
        assert!(err.to_string().contains("default_completion_threshold"));
    }

    #[test]
    fn session_defaults_follow_runtime_section() {
        let mut cfg = SequencerConfig::default();
        cfg.runtime.default_credit = "no-credit".to_string();
        let defaults = cfg.runtime.session_defaults();
        assert_eq!(defaults.credit, "no-credit");
        assert_eq!(defaults.params().revision, Revision::Scorm2004);
    }
}
