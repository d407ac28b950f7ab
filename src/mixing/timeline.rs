/*!
 * Timeline assembly.
 *
 * Builds the transient `MixPlan`: a silent base spanning the whole cue list,
 * and one entry per cue/clip pair carrying the clip's gain, compressor flag
 * and onset delay. Pairs are formed by position: the i-th clip in inventory
 * order goes with the i-th cue in file order. Entries keep that order, which
 * is also the order of the pairwise merges in the rendered graph.
 */

use log::debug;
use std::path::PathBuf;

use crate::app_config::MixingConfig;
use crate::errors::CompositorError;
use crate::mixing::background::BackgroundBed;
use crate::mixing::gain::GainAdjustment;
use crate::mixing::loudness::AudioClip;
use crate::subtitle_processor::CueList;

/// Fixed soft-knee compressor applied to speech clips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f64,
    pub ratio: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    pub makeup_db: f64,
}

/// -18 dB threshold, 3:1, 3 ms attack, 50 ms release, +2 dB makeup
pub const SOFT_COMPRESSOR: CompressorSettings = CompressorSettings {
    threshold_db: -18.0,
    ratio: 3.0,
    attack_ms: 3.0,
    release_ms: 50.0,
    makeup_db: 2.0,
};

impl CompressorSettings {
    /// Filter expression for the rendering engine
    pub fn filter(&self) -> String {
        format!(
            "acompressor=threshold={}dB:ratio={}:attack={}:release={}:makeup={}dB",
            self.threshold_db, self.ratio, self.attack_ms, self.release_ms, self.makeup_db
        )
    }
}

// @struct: One gained, delayed clip on the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct MixEntry {
    // @field: Sequence number of the paired cue
    pub cue_index: u64,

    // @field: Number embedded in the clip file name
    pub clip_index: u64,

    // @field: Clip file
    pub clip_path: PathBuf,

    // @field: Onset delay, round(cue.start * 1000)
    pub delay_ms: u64,

    // @field: Linear volume multiplier
    pub gain: f64,

    // @field: Whether the soft compressor runs on this clip
    pub compress: bool,
}

/// Everything the graph builder needs for one render
#[derive(Debug, Clone, PartialEq)]
pub struct MixPlan {
    /// Entries in merge order
    pub entries: Vec<MixEntry>,
    /// Length of the silent base in seconds
    pub base_duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub channel_layout: String,
    /// Optional bed mixed under the voices
    pub background: Option<BackgroundBed>,
}

impl MixPlan {
    /// Attach a background bed trimmed to the base duration
    pub fn with_background(mut self, path: impl Into<PathBuf>) -> Self {
        self.background = Some(BackgroundBed::new(path, self.base_duration));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TimelineAssembler {
    compression: bool,
    sample_rate: u32,
    channels: u16,
    channel_layout: String,
}

impl TimelineAssembler {
    pub fn from_config(config: &MixingConfig) -> Self {
        Self {
            compression: config.compression,
            sample_rate: config.sample_rate,
            channels: config.channels,
            channel_layout: config.channel_layout(),
        }
    }

    /// Pair cues with clips and gains by position and build the plan.
    ///
    /// `clips` and `gains` must line up one to one. Cues beyond the last clip
    /// still count towards the base duration but get no entry.
    pub fn assemble(
        &self,
        cues: &CueList,
        clips: &[AudioClip],
        gains: &[GainAdjustment],
    ) -> Result<MixPlan, CompositorError> {
        if cues.is_empty() {
            return Err(CompositorError::Assembly("cue list is empty".to_string()));
        }
        if clips.len() != gains.len() {
            return Err(CompositorError::Assembly(format!(
                "{} clip(s) but {} gain value(s)",
                clips.len(),
                gains.len()
            )));
        }

        let base_duration = cues.total_duration();

        let entries: Vec<MixEntry> = cues
            .iter()
            .zip(clips.iter().zip(gains))
            .map(|(cue, (clip, gain))| MixEntry {
                cue_index: cue.index,
                clip_index: clip.index,
                clip_path: clip.path.clone(),
                delay_ms: cue.start_ms(),
                gain: gain.multiplier,
                compress: self.compression,
            })
            .collect();

        debug!(
            "Assembled {} entries over a {:.3}s base track",
            entries.len(),
            base_duration
        );

        Ok(MixPlan {
            entries,
            base_duration,
            sample_rate: self.sample_rate,
            channels: self.channels,
            channel_layout: self.channel_layout.clone(),
            background: None,
        })
    }
}
