/*!
 * Per-clip loudness estimation.
 *
 * Each clip is measured through an ordered chain of strategies. A strategy
 * either yields a loudness or a reason, and the next one is tried on failure.
 * The default chain for RMS normalization is:
 *
 * 1. channel-averaged RMS level
 * 2. peak level minus 6 dB
 * 3. a fixed -20 dBFS
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OnceCell, Semaphore};

use crate::app_config::NormalizationMode;
use crate::engines::AudioStatistics;
use crate::errors::AnalysisFailure;

/// Loudness assumed when every measurement failed
pub const DEFAULT_LOUDNESS_DB: f64 = -20.0;

/// Subtracted from the peak level to approximate RMS
pub const PEAK_TO_RMS_OFFSET_DB: f64 = 6.0;

/// Clips quieter than this are treated as silence
pub const SILENCE_FLOOR_DB: f64 = -60.0;

/// True for `-inf`, NaN and anything below the silence floor
pub fn is_silent_db(db: f64) -> bool {
    !(db >= SILENCE_FLOOR_DB)
}

/// Which strategy produced a loudness value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessSource {
    Rms,
    PeakEstimate,
    Peak,
    Default,
}

/// Resolved loudness of one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Loudness {
    /// Level in dBFS
    pub db: f64,
    /// Strategy that produced it
    pub source: LoudnessSource,
}

impl Loudness {
    pub fn new(db: f64, source: LoudnessSource) -> Self {
        Self { db, source }
    }

    pub fn is_silent(&self) -> bool {
        is_silent_db(self.db)
    }
}

/// One synthesized clip in the workspace
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Number embedded in the file name
    pub index: u64,
    /// Location of the clip
    pub path: PathBuf,
    loudness: OnceCell<Loudness>,
}

impl AudioClip {
    pub fn new(index: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            path: path.into(),
            loudness: OnceCell::new(),
        }
    }

    /// Clip with an already known loudness
    pub fn with_loudness(index: u64, path: impl Into<PathBuf>, loudness: Loudness) -> Self {
        Self {
            index,
            path: path.into(),
            loudness: OnceCell::new_with(Some(loudness)),
        }
    }

    /// Loudness, if it has been measured
    pub fn loudness(&self) -> Option<Loudness> {
        self.loudness.get().copied()
    }
}

/// A single step of the measurement chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoudnessStrategy {
    /// Average of the per-channel RMS levels
    ChannelRms,
    /// Peak level minus the given offset in dB
    PeakMinusOffset(f64),
    /// Peak level as-is
    Peak,
    /// Constant value; never fails
    Fixed(f64),
}

impl LoudnessStrategy {
    /// Chain used for a normalization mode (empty when normalization is off)
    pub fn chain_for(mode: NormalizationMode) -> Vec<LoudnessStrategy> {
        match mode {
            NormalizationMode::Rms => vec![
                LoudnessStrategy::ChannelRms,
                LoudnessStrategy::PeakMinusOffset(PEAK_TO_RMS_OFFSET_DB),
                LoudnessStrategy::Fixed(DEFAULT_LOUDNESS_DB),
            ],
            NormalizationMode::Peak => vec![
                LoudnessStrategy::Peak,
                LoudnessStrategy::Fixed(DEFAULT_LOUDNESS_DB),
            ],
            NormalizationMode::Off => Vec::new(),
        }
    }

    /// Try this strategy against one file
    pub async fn measure(&self, stats: &dyn AudioStatistics, path: &Path) -> Result<Loudness, AnalysisFailure> {
        match *self {
            LoudnessStrategy::ChannelRms => {
                let levels = stats.rms_levels(path).await?;
                if levels.is_empty() {
                    return Err(AnalysisFailure::NoMeasurement("no RMS channel levels".to_string()));
                }
                let average = levels.iter().sum::<f64>() / levels.len() as f64;
                Ok(Loudness::new(average, LoudnessSource::Rms))
            }
            LoudnessStrategy::PeakMinusOffset(offset) => {
                let peak = stats.peak_level(path).await?;
                Ok(Loudness::new(peak - offset, LoudnessSource::PeakEstimate))
            }
            LoudnessStrategy::Peak => {
                let peak = stats.peak_level(path).await?;
                Ok(Loudness::new(peak, LoudnessSource::Peak))
            }
            LoudnessStrategy::Fixed(db) => Ok(Loudness::new(db, LoudnessSource::Default)),
        }
    }
}

/// Measures clips on a bounded pool and hands results back in clip order
#[derive(Debug, Clone)]
pub struct LoudnessAnalyzer {
    stats: Arc<dyn AudioStatistics>,
    chain: Vec<LoudnessStrategy>,
    max_concurrent: usize,
}

impl LoudnessAnalyzer {
    pub fn new(stats: Arc<dyn AudioStatistics>, mode: NormalizationMode, max_concurrent: usize) -> Self {
        Self {
            stats,
            chain: LoudnessStrategy::chain_for(mode),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn chain(&self) -> &[LoudnessStrategy] {
        &self.chain
    }

    /// Walk the chain for one file until a strategy succeeds
    pub async fn resolve(&self, path: &Path) -> Loudness {
        for strategy in &self.chain {
            match strategy.measure(self.stats.as_ref(), path).await {
                Ok(loudness) => {
                    debug!("{:?}: {:.1} dB ({:?})", path, loudness.db, loudness.source);
                    return loudness;
                }
                Err(reason) => {
                    debug!("{:?}: {:?} failed: {}", path, strategy, reason);
                }
            }
        }

        warn!("Could not detect volume for {:?}, assuming {} dB", path, DEFAULT_LOUDNESS_DB);
        Loudness::new(DEFAULT_LOUDNESS_DB, LoudnessSource::Default)
    }

    /// Loudness of a clip; measured on first call only
    pub async fn measure(&self, clip: &AudioClip) -> Loudness {
        *clip.loudness.get_or_init(|| self.resolve(&clip.path)).await
    }

    /// Measure every clip, `max_concurrent` at a time.
    ///
    /// The returned vector is in the same order as `clips` regardless of the
    /// order in which measurements complete.
    pub async fn analyze_all(
        &self,
        clips: &[AudioClip],
        progress_callback: impl Fn(usize, usize) + Sync,
    ) -> Vec<Loudness> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let total = clips.len();
        let processed = AtomicUsize::new(0);
        let processed = &processed;
        let progress_callback = &progress_callback;

        let mut results = stream::iter(clips.iter().enumerate())
            .map(|(position, clip)| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.ok();
                    let loudness = self.measure(clip).await;

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    (position, loudness)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|(position, _)| *position);
        results.into_iter().map(|(_, loudness)| loudness).collect()
    }
}
