use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Mixing settings handed to the compositor
    #[serde(default)]
    pub mixing: MixingConfig,

    /// Clip naming convention in the workspace
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Loudness analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Rendering engine settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How clip loudness is measured before gain calculation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    // @mode: RMS level, falling back to peak estimate then default
    #[default]
    Rms,
    // @mode: Peak level, falling back to default
    Peak,
    // @mode: No analysis, every clip keeps unity gain
    Off,
}

impl NormalizationMode {
    // @returns: Lowercase mode identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Rms => "rms".to_string(),
            Self::Peak => "peak".to_string(),
            Self::Off => "off".to_string(),
        }
    }
}

impl std::fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for NormalizationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rms" => Ok(Self::Rms),
            "peak" => Ok(Self::Peak),
            "off" | "none" => Ok(Self::Off),
            _ => Err(anyhow!("Invalid normalization mode: {}", s)),
        }
    }
}

/// Mixing configuration passed explicitly to the compositor
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MixingConfig {
    /// Target loudness in dBFS that every clip is gained towards
    #[serde(default = "default_target_loudness_db")]
    pub target_loudness_db: f64,

    /// Loudness measurement mode
    #[serde(default)]
    pub normalization: NormalizationMode,

    /// Whether to run the soft compressor on every clip
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output channel count
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            target_loudness_db: default_target_loudness_db(),
            normalization: NormalizationMode::default(),
            compression: true,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

impl MixingConfig {
    /// Channel layout name understood by the rendering engine
    pub fn channel_layout(&self) -> String {
        match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{}c", n),
        }
    }
}

/// Naming convention for synthesized per-cue clips
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InventoryConfig {
    /// File name prefix preceding the embedded cue number
    #[serde(default = "default_clip_prefix")]
    pub clip_prefix: String,

    /// File extension (without the dot)
    #[serde(default = "default_clip_extension")]
    pub clip_extension: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            clip_prefix: default_clip_prefix(),
            clip_extension: default_clip_extension(),
        }
    }
}

/// Loudness analysis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Maximum number of clips analyzed at the same time
    #[serde(default = "default_concurrent_analyses")]
    pub concurrent_analyses: usize,

    /// Timeout for a single statistics call in seconds
    #[serde(default = "default_analysis_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrent_analyses: default_concurrent_analyses(),
            timeout_secs: default_analysis_timeout_secs(),
        }
    }
}

/// Rendering engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Path or name of the ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Timeout for the whole render in seconds
    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_render_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_loudness_db() -> f64 {
    -12.0
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u16 {
    2
}

fn default_true() -> bool {
    true
}

fn default_clip_prefix() -> String {
    "translated_audio_".to_string()
}

fn default_clip_extension() -> String {
    "wav".to_string()
}

fn default_concurrent_analyses() -> usize {
    4
}

fn default_analysis_timeout_secs() -> u64 {
    60
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_render_timeout_secs() -> u64 {
    600 // 10 minutes for long timelines
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let target = self.mixing.target_loudness_db;
        if !target.is_finite() || target > 0.0 {
            return Err(anyhow!("Target loudness must be a finite value <= 0 dBFS, got {}", target));
        }

        if self.mixing.sample_rate == 0 {
            return Err(anyhow!("Sample rate must be greater than zero"));
        }

        if self.mixing.channels == 0 {
            return Err(anyhow!("Channel count must be greater than zero"));
        }

        if self.inventory.clip_prefix.is_empty() {
            return Err(anyhow!("Clip prefix cannot be empty"));
        }

        if self.inventory.clip_extension.trim_start_matches('.').is_empty() {
            return Err(anyhow!("Clip extension cannot be empty"));
        }

        if self.analysis.concurrent_analyses == 0 {
            return Err(anyhow!("Concurrent analyses must be at least 1"));
        }

        if self.render.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("ffmpeg path cannot be empty"));
        }

        Ok(())
    }
}
