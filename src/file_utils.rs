use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use regex::Regex;
use log::{debug, warn};

use crate::app_config::InventoryConfig;
use crate::errors::{CountMismatchWarning, InventoryError};
use crate::mixing::loudness::AudioClip;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Directory a file will be published into ("." for bare file names)
    pub fn parent_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Clips found in a workspace, plus the count check against the cue list
#[derive(Debug, Clone)]
pub struct InventoryReport {
    /// Clips sorted by their embedded number
    pub clips: Vec<AudioClip>,
    /// Set when the clip count differs from the cue count
    pub mismatch: Option<CountMismatchWarning>,
}

/// Resolves per-cue synthesized audio files in a workspace directory.
///
/// Files must be named `<prefix><number>.<extension>`; anything else in the
/// directory is ignored.
#[derive(Debug, Clone)]
pub struct ClipInventory {
    pattern: Regex,
}

impl ClipInventory {
    /// Create an inventory for the given naming convention
    pub fn new(prefix: &str, extension: &str) -> Result<Self, InventoryError> {
        let extension = extension.trim_start_matches('.');
        let pattern = format!(r"^{}(\d+)\.{}$", regex::escape(prefix), regex::escape(extension));
        let pattern = Regex::new(&pattern).map_err(|e| InventoryError::InvalidPattern(e.to_string()))?;
        Ok(Self { pattern })
    }

    pub fn from_config(config: &InventoryConfig) -> Result<Self, InventoryError> {
        Self::new(&config.clip_prefix, &config.clip_extension)
    }

    /// Number embedded in a clip file name, if the name follows the convention
    pub fn clip_number(&self, file_name: &str) -> Option<u64> {
        self.pattern
            .captures(file_name)
            .and_then(|caps| caps[1].parse().ok())
    }

    /// Scan a directory (non-recursively) and return matching clips in ascending order
    pub fn scan<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<AudioClip>, InventoryError> {
        let dir = dir.as_ref();
        if !FileManager::dir_exists(dir) {
            return Err(InventoryError::MissingDirectory(dir.to_path_buf()));
        }

        let mut found: Vec<(u64, PathBuf)> = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.map_err(|e| InventoryError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if let Some(number) = self.clip_number(&file_name) {
                found.push((number, entry.path().to_path_buf()));
            }
        }

        // Equal numbers (e.g. "_1" and "_01") are ordered by path
        found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        debug!("Found {} clip file(s) in {:?}", found.len(), dir);

        Ok(found
            .into_iter()
            .map(|(number, path)| AudioClip::new(number, path))
            .collect())
    }

    /// Scan a directory and compare the clip count with the cue count
    pub fn scan_for_cues<P: AsRef<Path>>(&self, dir: P, cue_count: usize) -> Result<InventoryReport, InventoryError> {
        let clips = self.scan(dir)?;

        let mismatch = if clips.len() != cue_count {
            let warning = CountMismatchWarning { clips: clips.len(), cues: cue_count };
            warn!("Warning: {}", warning);
            Some(warning)
        } else {
            None
        };

        Ok(InventoryReport { clips, mismatch })
    }
}
