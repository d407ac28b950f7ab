//! Background bed mixed under the voice composite.
//!
//! The bed is looped indefinitely, trimmed to the timeline length and
//! attenuated before a weighted merge. Auto-normalization stays off in the
//! merge so the 1:0.3 ratio is what reaches the output.

use std::path::PathBuf;

/// Weight of the voice composite in the final merge
pub const VOICE_WEIGHT: f64 = 1.0;

/// Weight of the background bed in the final merge
pub const BED_WEIGHT: f64 = 0.3;

/// Linear attenuation applied to the bed before the merge (about -6 dB).
///
/// Together with `BED_WEIGHT` the bed lands at 0.15 of its source level,
/// about -16.5 dB under the voice composite.
pub const BED_ATTENUATION: f64 = 0.5;

// @const: Loop size large enough to cover any timeline
const LOOP_SIZE: &str = "2e+09";

/// Descriptor of the optional background track
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundBed {
    /// Background audio file
    pub path: PathBuf,
    /// Exact length the looped bed is cut to, in seconds
    pub trim_duration: f64,
    /// Linear volume applied before mixing
    pub attenuation: f64,
    /// (voice, bed) merge weights
    pub weights: (f64, f64),
}

impl BackgroundBed {
    pub fn new(path: impl Into<PathBuf>, trim_duration: f64) -> Self {
        Self {
            path: path.into(),
            trim_duration,
            attenuation: BED_ATTENUATION,
            weights: (VOICE_WEIGHT, BED_WEIGHT),
        }
    }

    /// Loop, trim and attenuate the bed
    pub fn bed_filters(&self) -> Vec<String> {
        vec![
            format!("aloop=loop=-1:size={}", LOOP_SIZE),
            format!("atrim=duration={}", self.trim_duration),
            "asetpts=PTS-STARTPTS".to_string(),
            format!("volume={}", self.attenuation),
        ]
    }

    /// Weighted, unnormalized merge of voice and bed
    pub fn merge_filter(&self) -> String {
        format!(
            "amix=inputs=2:duration=longest:weights={} {}:normalize=0",
            self.weights.0, self.weights.1
        )
    }
}
