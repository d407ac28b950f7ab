/*!
 * ffmpeg-backed statistics and rendering engines.
 *
 * Loudness is read from the `astats` and `volumedetect` filter reports that
 * ffmpeg prints on stderr. Rendering runs a single `-filter_complex` command
 * built from a `MixGraph`.
 */

use async_trait::async_trait;
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::Config;
use crate::engines::{AudioStatistics, CancelHandle, RenderEngine};
use crate::errors::{AnalysisFailure, RenderError};
use crate::mixing::graph::MixGraph;

// @const: "RMS level dB: -20.51" line of an astats report
static RMS_LEVEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"RMS level dB:\s*(-?inf|-?\d+(?:\.\d+)?)").unwrap()
});

// @const: "max_volume: -3.2 dB" line of a volumedetect report
static MAX_VOLUME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"max_volume:\s*(-?inf|-?\d+(?:\.\d+)?)\s*dB").unwrap()
});

/// Parse per-channel RMS levels from an astats report.
///
/// Levels listed under `Channel:` sections are returned in order. When the
/// report has no channel sections the `Overall` level is used instead.
pub fn parse_astats_rms(stderr: &str) -> Vec<f64> {
    let mut channels = Vec::new();
    let mut overall = Vec::new();
    let mut in_overall = false;

    for line in stderr.lines() {
        if line.contains("Channel:") {
            in_overall = false;
        } else if line.trim_end().ends_with("Overall") {
            in_overall = true;
        }

        if let Some(caps) = RMS_LEVEL_REGEX.captures(line) {
            if let Ok(level) = caps[1].parse::<f64>() {
                if in_overall {
                    overall.push(level);
                } else {
                    channels.push(level);
                }
            }
        }
    }

    if channels.is_empty() { overall } else { channels }
}

/// Parse the `max_volume` figure from a volumedetect report
pub fn parse_volumedetect_peak(stderr: &str) -> Option<f64> {
    MAX_VOLUME_REGEX
        .captures(stderr)
        .and_then(|caps| caps[1].parse().ok())
}

/// Keep only the meaningful error lines of ffmpeg's stderr, dropping the
/// version banner, build configuration and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    // Banner and metadata lines are indented; unindented lines are kept
    let noise_prefixes = [
        "ffmpeg version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Metadata:",
        "    Metadata:",
        "      Metadata:",
        "  Duration:",
        "  Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Arguments of the render command for `graph`, writing to `output`
pub fn render_args(graph: &MixGraph, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for input in &graph.inputs {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());
    }

    args.push("-filter_complex".to_string());
    args.push(graph.filter_complex());
    args.push("-map".to_string());
    args.push(format!("[{}]", graph.output_label));
    args.push("-c:a".to_string());
    args.push(graph.codec.clone());
    args.push("-ar".to_string());
    args.push(graph.sample_rate.to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

fn shell_quote(arg: &str) -> String {
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=,".contains(c));
    if plain && !arg.is_empty() {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// ffmpeg command line tool used for both analysis and rendering
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: String,
    analysis_timeout: Duration,
    render_timeout: Duration,
    cancel: CancelHandle,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<String>, analysis_timeout: Duration, render_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            analysis_timeout,
            render_timeout,
            cancel: CancelHandle::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.render.ffmpeg_path.clone(),
            Duration::from_secs(config.analysis.timeout_secs),
            Duration::from_secs(config.render.timeout_secs),
        )
    }

    /// Abort renders when `cancel` fires
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run an analysis filter over `path` and return ffmpeg's stderr
    async fn run_analysis(&self, path: &Path, filter: &str) -> Result<String, AnalysisFailure> {
        let mut command = Command::new(&self.binary);
        command
            .args(["-hide_banner", "-nostats", "-nostdin", "-i"])
            .arg(path)
            .args(["-af", filter, "-f", "null", "-"])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::select! {
            result = command.output() => {
                result.map_err(|e| AnalysisFailure::Unavailable(format!("{}: {}", self.binary, e)))?
            },
            _ = tokio::time::sleep(self.analysis_timeout) => {
                return Err(AnalysisFailure::TimedOut(self.analysis_timeout.as_secs()));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(AnalysisFailure::Unavailable(filter_ffmpeg_stderr(&stderr)));
        }
        Ok(stderr)
    }
}

#[async_trait]
impl AudioStatistics for FfmpegEngine {
    async fn rms_levels(&self, path: &Path) -> Result<Vec<f64>, AnalysisFailure> {
        let stderr = self.run_analysis(path, "astats").await?;
        let levels = parse_astats_rms(&stderr);
        if levels.is_empty() {
            return Err(AnalysisFailure::NoMeasurement("astats reported no RMS level".to_string()));
        }
        Ok(levels)
    }

    async fn peak_level(&self, path: &Path) -> Result<f64, AnalysisFailure> {
        let stderr = self.run_analysis(path, "volumedetect").await?;
        parse_volumedetect_peak(&stderr)
            .ok_or_else(|| AnalysisFailure::NoMeasurement("volumedetect reported no max_volume".to_string()))
    }
}

#[async_trait]
impl RenderEngine for FfmpegEngine {
    async fn render(&self, graph: &MixGraph, output: &Path) -> Result<(), RenderError> {
        let args = render_args(graph, output);
        debug!("Running {} with {} input(s)", self.binary, graph.inputs.len());

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Spawn(format!("{}: {}", self.binary, e)))?;

        // Dropping the wait future kills the child
        let result = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| RenderError::Spawn(e.to_string()))?
            },
            _ = self.cancel.cancelled() => {
                return Err(RenderError::Cancelled);
            },
            _ = tokio::time::sleep(self.render_timeout) => {
                return Err(RenderError::TimedOut(self.render_timeout.as_secs()));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let diagnostics = filter_ffmpeg_stderr(&stderr);
            error!("Rendering failed: {}", diagnostics);
            return Err(RenderError::Failed {
                status: result.status.code(),
                diagnostics,
            });
        }

        Ok(())
    }

    fn describe(&self, graph: &MixGraph, output: &Path) -> String {
        std::iter::once(self.binary.clone())
            .chain(render_args(graph, output))
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
