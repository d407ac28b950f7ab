use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Context, Result};
use log::{debug, warn};

use crate::errors::SubtitleError;

// @module: Subtitle timing extraction

// @const: SRT timestamp regex (HH:MM:SS,mmm, '.' tolerated as separator)
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}):(\d{2}):(\d{2})[,.](\d{3})$").unwrap()
});

// @const: Entry boundary, any run of blank lines
static ENTRY_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

// @struct: Single timed subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    // @field: Sequence number from the file
    pub index: u64,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Text lines joined with spaces
    pub text: String,
}

impl SubtitleCue {
    /// Creates a new cue
    pub fn new(index: u64, start: f64, end: f64, text: impl Into<String>) -> Self {
        SubtitleCue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Cue length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Onset delay in whole milliseconds
    pub fn start_ms(&self) -> u64 {
        (self.start * 1000.0).round() as u64
    }

    /// Parse an SRT timestamp to seconds
    pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
        let caps = TIMESTAMP_REGEX.captures(timestamp.trim())?;
        let hours: u64 = caps[1].parse().ok()?;
        let minutes: u64 = caps[2].parse().ok()?;
        let seconds: u64 = caps[3].parse().ok()?;
        let millis: u64 = caps[4].parse().ok()?;

        if minutes >= 60 || seconds >= 60 {
            return None;
        }

        let total_ms = (hours * 3600 + minutes * 60 + seconds) * 1000 + millis;
        Some(total_ms as f64 / 1000.0)
    }

    /// Format a time in seconds as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(secs: f64) -> String {
        let ms = (secs.max(0.0) * 1000.0).round() as u64;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", Self::format_timestamp(self.start), Self::format_timestamp(self.end))?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Ordered cue list parsed from one subtitle track
#[derive(Debug, Clone, Default)]
pub struct CueList {
    /// Cues in file order
    pub cues: Vec<SubtitleCue>,
}

impl CueList {
    /// Read and parse an SRT file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {:?}", path))?;
        Ok(Self::parse(&content)?)
    }

    /// Parse SRT content into cues.
    ///
    /// Entries are separated by blank lines and need a sequence number, a
    /// time range and at least one text line. Order is kept as found; no
    /// re-sort is done.
    pub fn parse(content: &str) -> Result<Self, SubtitleError> {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        let normalized = normalized.trim_start_matches('\u{feff}').trim();

        if normalized.is_empty() {
            return Err(SubtitleError::Empty);
        }

        let mut cues = Vec::new();
        let mut seen = HashSet::new();

        for (position, block) in ENTRY_BOUNDARY_REGEX.split(normalized).enumerate() {
            let entry = position + 1;
            let lines: Vec<&str> = block.trim().lines().map(str::trim).collect();
            if lines.len() < 3 {
                return Err(SubtitleError::TooFewLines { entry, lines: lines.len() });
            }

            let index: u64 = lines[0].parse().map_err(|_| SubtitleError::InvalidSequence {
                entry,
                value: lines[0].to_string(),
            })?;

            let (start_raw, end_raw) = lines[1].split_once("-->").ok_or_else(|| {
                SubtitleError::MissingRangeSeparator { entry, line: lines[1].to_string() }
            })?;

            let start = SubtitleCue::parse_timestamp(start_raw).ok_or_else(|| {
                SubtitleError::InvalidTimestamp { entry, value: start_raw.trim().to_string() }
            })?;
            let end = SubtitleCue::parse_timestamp(end_raw).ok_or_else(|| {
                SubtitleError::InvalidTimestamp { entry, value: end_raw.trim().to_string() }
            })?;

            if end <= start {
                return Err(SubtitleError::InvalidRange { entry, start, end });
            }

            if !seen.insert(index) {
                return Err(SubtitleError::DuplicateIndex { index });
            }

            cues.push(SubtitleCue::new(index, start, end, lines[2..].join(" ")));
        }

        let out_of_order = cues.windows(2).filter(|w| w[1].start < w[0].start).count();
        if out_of_order > 0 {
            warn!("Found {} cue(s) starting before their predecessor; keeping file order", out_of_order);
        }

        debug!("Parsed {} subtitle cues", cues.len());
        Ok(CueList { cues })
    }

    /// Total timeline length: the latest cue end
    pub fn total_duration(&self) -> f64 {
        self.cues.iter().map(|cue| cue.end).fold(0.0, f64::max)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleCue> {
        self.cues.iter()
    }
}

impl fmt::Display for CueList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for cue in &self.cues {
            write!(f, "{}", cue)?;
        }
        Ok(())
    }
}
