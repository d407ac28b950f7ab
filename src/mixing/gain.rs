//! Loudness-to-gain conversion.
//!
//! `delta = target - loudness`, capped at +20 dB, then `10^(delta / 20)`.
//! Attenuation is never capped. Silent clips keep unity gain so that noise
//! floors are not amplified.

use serde::Serialize;

use crate::mixing::loudness::{is_silent_db, Loudness};

/// Largest boost applied to a quiet clip
pub const MAX_BOOST_DB: f64 = 20.0;

/// Volume applied to one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GainAdjustment {
    /// Clip number from the inventory
    pub clip_index: u64,
    /// Linear volume multiplier
    pub multiplier: f64,
    /// Loudness the multiplier was derived from, when analyzed
    pub loudness: Option<Loudness>,
    /// True when the clip was below the silence floor
    pub silent: bool,
}

impl GainAdjustment {
    /// Unity gain for a clip that was not analyzed
    pub fn unity(clip_index: u64) -> Self {
        Self {
            clip_index,
            multiplier: 1.0,
            loudness: None,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GainCalculator {
    target_db: f64,
}

impl GainCalculator {
    pub fn new(target_db: f64) -> Self {
        Self { target_db }
    }

    pub fn target_db(&self) -> f64 {
        self.target_db
    }

    /// Gain in dB needed to reach the target, after the boost cap
    pub fn delta_db(&self, loudness_db: f64) -> f64 {
        (self.target_db - loudness_db).min(MAX_BOOST_DB)
    }

    /// Linear multiplier for a measured loudness
    pub fn multiplier_for_db(&self, loudness_db: f64) -> f64 {
        if is_silent_db(loudness_db) {
            return 1.0;
        }
        10f64.powf(self.delta_db(loudness_db) / 20.0)
    }

    pub fn adjustment(&self, clip_index: u64, loudness: Loudness) -> GainAdjustment {
        GainAdjustment {
            clip_index,
            multiplier: self.multiplier_for_db(loudness.db),
            loudness: Some(loudness),
            silent: loudness.is_silent(),
        }
    }
}
