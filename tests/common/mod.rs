/*!
 * Common test utilities for the dubwai test suite
 */

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Once;
use anyhow::Result;
use tempfile::TempDir;

use dubwai::app_config::Config;

static INIT_LOGGER: Once = Once::new();

/// Route library logs through env_logger in test mode
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Three cues starting at 0.0, 2.5 and 6.0 seconds, ending at 8.2
pub const THREE_CUES_SRT: &str = "1
00:00:00,000 --> 00:00:02,000
Hello there.

2
00:00:02,500 --> 00:00:05,000
How are you?

3
00:00:06,000 --> 00:00:08,200
Fine, thanks.
";

/// Creates the three-cue subtitle file
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, THREE_CUES_SRT)
}

/// Creates placeholder clip files named after the default convention
pub fn create_clips(dir: &Path, numbers: &[u64]) -> Result<Vec<PathBuf>> {
    numbers
        .iter()
        .map(|n| create_test_file(dir, &format!("translated_audio_{}.wav", n), "RIFF"))
        .collect()
}

/// Workspace with a subtitle file and a `clips/` directory holding `clip_numbers`
pub struct Workspace {
    pub root: TempDir,
    pub subtitles: PathBuf,
    pub clips_dir: PathBuf,
}

impl Workspace {
    pub fn new(clip_numbers: &[u64]) -> Result<Self> {
        let root = create_temp_dir()?;
        let subtitles = create_test_subtitle(root.path(), "movie.srt")?;
        let clips_dir = root.path().join("clips");
        fs::create_dir_all(&clips_dir)?;
        create_clips(&clips_dir, clip_numbers)?;
        Ok(Self { root, subtitles, clips_dir })
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("out").join("dub.wav")
    }
}

/// Default config with a small worker pool
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.analysis.concurrent_analyses = 2;
    config
}
