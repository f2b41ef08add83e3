//! Scaffolding for a sequencer working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{SequencerConfig, write_config};
use super::tree_store::{TREE_SCHEMA, write_tree};
use crate::core::activity::default_activity;

/// Canonical file locations inside a sequencer working directory.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub tree_path: PathBuf,
    pub state_path: PathBuf,
    pub config_path: PathBuf,
    pub schema_path: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            tree_path: root.join("tree.json"),
            state_path: root.join("state.json"),
            config_path: root.join("sequencer.toml"),
            schema_path: root.join("schemas").join("activity_tree.v1.schema.json"),
            root,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing files.
    pub force: bool,
}

/// Write a starter tree, default config and the tree schema into `root`.
///
/// Fails if a tree already exists unless `options.force` is set.
pub fn init_workspace(root: &Path, options: &InitOptions) -> Result<WorkspacePaths> {
    let paths = WorkspacePaths::new(root);
    if paths.tree_path.exists() && !options.force {
        return Err(anyhow!(
            "sequencer init: {} already exists (use --force to overwrite)",
            paths.tree_path.display()
        ));
    }
    if let Some(schema_dir) = paths.schema_path.parent() {
        fs::create_dir_all(schema_dir)
            .with_context(|| format!("create directory {}", schema_dir.display()))?;
    }

    write_tree(&paths.tree_path, &default_activity())?;
    write_config(&paths.config_path, &SequencerConfig::default())?;
    fs::write(&paths.schema_path, TREE_SCHEMA)
        .with_context(|| format!("write {}", paths.schema_path.display()))?;
    info!(root = %paths.root.display(), "initialized sequencer workspace");
    Ok(paths)
}
