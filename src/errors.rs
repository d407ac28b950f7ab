/*!
 * Error types for the dubwai application.
 *
 * This module contains custom error types for the different stages of the
 * compositor, using the thiserror crate for ergonomic error definitions.
 * Fatal errors are gathered in `CompositorError`, which always reports the
 * stage that failed along with the underlying diagnostic.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while parsing subtitle timing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// The subtitle text contained no entries at all
    #[error("Subtitle content contains no entries")]
    Empty,

    /// An entry had fewer than the three required lines
    #[error("Entry {entry} has {lines} line(s), expected sequence number, time range and text")]
    TooFewLines {
        /// Position of the entry in the file (1-based)
        entry: usize,
        /// Number of lines found
        lines: usize,
    },

    /// The first line of an entry is not an integer
    #[error("Entry {entry} has an invalid sequence number: '{value}'")]
    InvalidSequence { entry: usize, value: String },

    /// The time range line lacks the `-->` separator
    #[error("Entry {entry} time range is missing the '-->' separator: '{line}'")]
    MissingRangeSeparator { entry: usize, line: String },

    /// A timestamp is not in `HH:MM:SS,mmm` form
    #[error("Entry {entry} has an invalid timestamp: '{value}'")]
    InvalidTimestamp { entry: usize, value: String },

    /// The end of a cue is not after its start
    #[error("Entry {entry} ends at {end:.3}s which is not after its start {start:.3}s")]
    InvalidRange { entry: usize, start: f64, end: f64 },

    /// Two entries share a sequence number
    #[error("Sequence number {index} appears more than once")]
    DuplicateIndex { index: u64 },
}

/// Errors that can occur while scanning the clip workspace
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The workspace directory does not exist
    #[error("Workspace directory does not exist: {0:?}")]
    MissingDirectory(PathBuf),

    /// The configured naming convention could not be compiled
    #[error("Invalid clip naming pattern: {0}")]
    InvalidPattern(String),

    /// Reading the directory failed
    #[error("Failed to scan workspace: {0}")]
    Io(String),
}

/// Non-fatal warning: the clip count differs from the cue count.
///
/// Composition proceeds over the overlapping index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatchWarning {
    pub clips: usize,
    pub cues: usize,
}

impl CountMismatchWarning {
    /// Number of cue/clip pairs that will be mixed
    pub fn overlap(&self) -> usize {
        self.clips.min(self.cues)
    }
}

impl fmt::Display for CountMismatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} audio clip(s) but {} subtitle cue(s); mixing the first {} pair(s), this might cause sync issues",
            self.clips,
            self.cues,
            self.overlap()
        )
    }
}

/// Reason a single loudness strategy could not produce a value.
///
/// Never fatal: the analyzer moves on to the next strategy in its chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisFailure {
    /// The statistics engine could not be run
    #[error("statistics engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran but produced no usable measurement
    #[error("no measurement in engine output: {0}")]
    NoMeasurement(String),

    /// The engine did not finish within the configured timeout
    #[error("statistics engine timed out after {0}s")]
    TimedOut(u64),
}

/// Errors that can occur while rendering the mix graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The rendering engine could not be started
    #[error("Failed to start rendering engine: {0}")]
    Spawn(String),

    /// The rendering engine exited with a non-zero status
    #[error("Rendering engine exited with status {}: {diagnostics}", status_text(.status))]
    Failed {
        /// Exit code, when the process reported one
        status: Option<i32>,
        /// Filtered diagnostic output
        diagnostics: String,
    },

    /// The render did not finish within the configured timeout
    #[error("Rendering engine timed out after {0}s")]
    TimedOut(u64),

    /// The render was cancelled before it finished
    #[error("Render cancelled")]
    Cancelled,

    /// Preparing or publishing the output failed
    #[error("Output error: {0}")]
    Output(String),
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Inventory,
    Analysis,
    Assembly,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Inventory => "inventory",
            Stage::Analysis => "analysis",
            Stage::Assembly => "assembly",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

/// Fatal compositor error
#[derive(Error, Debug)]
pub enum CompositorError {
    /// Malformed cue timing; raised before any mixing begins
    #[error("parse stage failed: {0}")]
    Parse(#[from] SubtitleError),

    /// The clip workspace could not be scanned
    #[error("inventory stage failed: {0}")]
    Inventory(#[from] InventoryError),

    /// The mix plan could not be assembled
    #[error("assembly stage failed: {0}")]
    Assembly(String),

    /// The rendering engine failed
    #[error("render stage failed: {0}")]
    Render(#[from] RenderError),

    /// Reading an input file failed
    #[error("{stage} stage failed: could not read {path:?}: {message}")]
    Io {
        stage: Stage,
        path: PathBuf,
        message: String,
    },
}

impl CompositorError {
    /// The stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parse(_) => Stage::Parse,
            Self::Inventory(_) => Stage::Inventory,
            Self::Assembly(_) => Stage::Assembly,
            Self::Render(_) => Stage::Render,
            Self::Io { stage, .. } => *stage,
        }
    }

    /// Diagnostic text captured from the rendering engine, if any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Render(RenderError::Failed { diagnostics, .. }) => Some(diagnostics),
            _ => None,
        }
    }
}
