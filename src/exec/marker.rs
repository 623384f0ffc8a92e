// src/exec/marker.rs

//! Completion markers: the only durable "this (run, pipeline) is done" signal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

pub const COMPLETION_MARKER_FILE: &str = "analysis_complete.json";

pub fn marker_path(output_dir: &Path) -> PathBuf {
    output_dir.join(COMPLETION_MARKER_FILE)
}

/// Presence of the marker file is what matters; its content is informational.
pub fn is_complete(fs: &dyn FileSystem, output_dir: &Path) -> bool {
    fs.is_file(&marker_path(output_dir))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub timestamp_analysis_start: DateTime<Local>,
    pub timestamp_analysis_complete: DateTime<Local>,
}

impl CompletionMarker {
    pub fn new(started: DateTime<Local>, completed: DateTime<Local>) -> Self {
        Self {
            timestamp_analysis_start: started,
            timestamp_analysis_complete: completed,
        }
    }

    /// Write the marker into `output_dir`, creating the directory if the
    /// pipeline runner did not.
    pub fn write(&self, fs: &dyn FileSystem, output_dir: &Path) -> Result<PathBuf> {
        fs.create_dir_all(output_dir)?;
        let path = marker_path(output_dir);
        let mut body = serde_json::to_string_pretty(self).context("serializing completion marker")?;
        body.push('\n');
        fs.write(&path, body.as_bytes())?;
        Ok(path)
    }

    pub fn read(fs: &dyn FileSystem, output_dir: &Path) -> Result<Self> {
        let path = marker_path(output_dir);
        let raw = fs.read_to_string(&path)?;
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed completion marker {}", path.display()))
    }
}
