/*!
 * End-to-end composition pipeline.
 *
 * Parse → inventory → analyze → gain → assemble → (background) → render.
 * Every stage runs in order; only loudness analysis fans out, and its results
 * are put back in clip order before gains are computed.
 */

use log::info;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;

use crate::app_config::{Config, MixingConfig, NormalizationMode};
use crate::engines::{AudioStatistics, RenderEngine};
use crate::errors::{CompositorError, CountMismatchWarning, Stage};
use crate::file_utils::{ClipInventory, FileManager};
use crate::mixing::gain::{GainAdjustment, GainCalculator};
use crate::mixing::graph::MixGraph;
use crate::mixing::loudness::{AudioClip, LoudnessAnalyzer, LoudnessSource};
use crate::mixing::render::RenderInvoker;
use crate::mixing::timeline::{MixPlan, TimelineAssembler};
use crate::subtitle_processor::CueList;

// @const: One async lock per workspace directory with a composition in flight
static WORKSPACE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn workspace_key(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// Exclusive hold on a workspace; the registry entry is dropped with the
/// last holder
struct WorkspaceGuard {
    key: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = WORKSPACE_LOCKS.lock();
        // Waiters and holders keep their own clone, so 1 means only the registry
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}

async fn lock_workspace(dir: &Path) -> WorkspaceGuard {
    let key = workspace_key(dir);
    let lock = WORKSPACE_LOCKS.lock().entry(key.clone()).or_default().clone();
    WorkspaceGuard {
        key,
        guard: Some(lock.lock_owned().await),
    }
}

/// Inputs of one composition
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRequest {
    /// SRT file whose cue timings drive the timeline
    pub subtitle_path: PathBuf,
    /// Directory holding the synthesized clips
    pub workspace_dir: PathBuf,
    /// Optional background bed
    pub background_path: Option<PathBuf>,
    /// Where the rendered track is published
    pub output_path: PathBuf,
}

impl CompositionRequest {
    pub fn new(
        subtitle_path: impl Into<PathBuf>,
        workspace_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subtitle_path: subtitle_path.into(),
            workspace_dir: workspace_dir.into(),
            background_path: None,
            output_path: output_path.into(),
        }
    }

    pub fn with_background(mut self, path: impl Into<PathBuf>) -> Self {
        self.background_path = Some(path.into());
        self
    }
}

/// Non-fatal condition met during composition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositionWarning {
    /// Clip and cue counts differ; only the overlap was mixed
    CountMismatch { clips: usize, cues: usize },
    /// No measurement succeeded for a clip and the default loudness was used
    AnalysisFallback { clip_index: u64, path: PathBuf },
}

impl From<CountMismatchWarning> for CompositionWarning {
    fn from(warning: CountMismatchWarning) -> Self {
        CompositionWarning::CountMismatch {
            clips: warning.clips,
            cues: warning.cues,
        }
    }
}

impl fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionWarning::CountMismatch { clips, cues } => {
                write!(f, "{}", CountMismatchWarning { clips: *clips, cues: *cues })
            }
            CompositionWarning::AnalysisFallback { clip_index, path } => {
                write!(f, "clip {} ({:?}) could not be measured; default loudness used", clip_index, path)
            }
        }
    }
}

/// Everything decided before the render call
#[derive(Debug, Clone)]
pub struct PreparedMix {
    pub cues: CueList,
    /// Clips found in the workspace, including unpaired ones
    pub clip_count: usize,
    pub gains: Vec<GainAdjustment>,
    pub plan: MixPlan,
    pub graph: MixGraph,
    pub warnings: Vec<CompositionWarning>,
}

/// Summary of a finished composition
#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    pub output_path: PathBuf,
    /// Seconds; the latest cue end
    pub total_duration: f64,
    pub cue_count: usize,
    pub clip_count: usize,
    pub mixed_clips: usize,
    pub gains: Vec<GainAdjustment>,
    pub warnings: Vec<CompositionWarning>,
    pub graph_fingerprint: String,
    pub elapsed: Duration,
}

/// Audio timeline compositor
#[derive(Debug, Clone)]
pub struct Compositor {
    mixing: MixingConfig,
    inventory: ClipInventory,
    analyzer: LoudnessAnalyzer,
    calculator: GainCalculator,
    assembler: TimelineAssembler,
    invoker: RenderInvoker,
}

impl Compositor {
    /// Build a compositor from an explicit configuration and engines
    pub fn new(
        config: &Config,
        stats: Arc<dyn AudioStatistics>,
        engine: Arc<dyn RenderEngine>,
    ) -> Result<Self, CompositorError> {
        let inventory = ClipInventory::from_config(&config.inventory)?;
        Ok(Self {
            mixing: config.mixing.clone(),
            inventory,
            analyzer: LoudnessAnalyzer::new(
                stats,
                config.mixing.normalization,
                config.analysis.concurrent_analyses,
            ),
            calculator: GainCalculator::new(config.mixing.target_loudness_db),
            assembler: TimelineAssembler::from_config(&config.mixing),
            invoker: RenderInvoker::new(engine),
        })
    }

    /// Run every stage up to, but not including, the render.
    ///
    /// `progress_callback` receives `(analyzed, total)` after each clip.
    pub async fn prepare(
        &self,
        request: &CompositionRequest,
        progress_callback: impl Fn(usize, usize) + Sync,
    ) -> Result<PreparedMix, CompositorError> {
        let content = std::fs::read_to_string(&request.subtitle_path).map_err(|e| CompositorError::Io {
            stage: Stage::Parse,
            path: request.subtitle_path.clone(),
            message: e.to_string(),
        })?;
        let cues = CueList::parse(&content)?;
        info!(
            "Parsed {} cues, timeline length {:.3}s",
            cues.len(),
            cues.total_duration()
        );

        let mut warnings: Vec<CompositionWarning> = Vec::new();
        let report = self.inventory.scan_for_cues(&request.workspace_dir, cues.len())?;
        let clip_count = report.clips.len();
        if let Some(mismatch) = report.mismatch {
            warnings.push(mismatch.into());
        }

        let clips: Vec<AudioClip> = report.clips.into_iter().take(cues.len()).collect();
        let gains = self.compute_gains(&clips, &mut warnings, progress_callback).await;

        let mut plan = self.assembler.assemble(&cues, &clips, &gains)?;

        if let Some(background) = &request.background_path {
            if !FileManager::file_exists(background) {
                return Err(CompositorError::Io {
                    stage: Stage::Assembly,
                    path: background.clone(),
                    message: "background file not found".to_string(),
                });
            }
            plan = plan.with_background(background);
        }

        let graph = MixGraph::from_plan(&plan);

        Ok(PreparedMix {
            cues,
            clip_count,
            gains,
            plan,
            graph,
            warnings,
        })
    }

    async fn compute_gains(
        &self,
        clips: &[AudioClip],
        warnings: &mut Vec<CompositionWarning>,
        progress_callback: impl Fn(usize, usize) + Sync,
    ) -> Vec<GainAdjustment> {
        if self.mixing.normalization == NormalizationMode::Off {
            info!("Normalization is off; every clip keeps unity gain");
            return clips.iter().map(|clip| GainAdjustment::unity(clip.index)).collect();
        }

        info!(
            "Analyzing {} clip(s) ({} normalization, target {} dBFS)",
            clips.len(),
            self.mixing.normalization,
            self.calculator.target_db()
        );
        let levels = self.analyzer.analyze_all(clips, progress_callback).await;

        clips
            .iter()
            .zip(levels)
            .map(|(clip, loudness)| {
                if loudness.source == LoudnessSource::Default {
                    warnings.push(CompositionWarning::AnalysisFallback {
                        clip_index: clip.index,
                        path: clip.path.clone(),
                    });
                }
                self.calculator.adjustment(clip.index, loudness)
            })
            .collect()
    }

    /// Engine command line for a prepared mix
    pub fn describe(&self, prepared: &PreparedMix, output: &Path) -> String {
        self.invoker.describe(&prepared.graph, output)
    }

    pub async fn compose(&self, request: &CompositionRequest) -> Result<CompositionReport, CompositorError> {
        self.compose_with_progress(request, |_, _| {}).await
    }

    /// Prepare and render; concurrent calls on the same workspace run one at a time
    pub async fn compose_with_progress(
        &self,
        request: &CompositionRequest,
        progress_callback: impl Fn(usize, usize) + Sync,
    ) -> Result<CompositionReport, CompositorError> {
        let start = Instant::now();
        let _guard = lock_workspace(&request.workspace_dir).await;

        let prepared = self.prepare(request, progress_callback).await?;

        let outcome = self.invoker.render(&prepared.graph, &request.output_path).await?;

        Ok(CompositionReport {
            output_path: outcome.output_path,
            total_duration: prepared.plan.base_duration,
            cue_count: prepared.cues.len(),
            clip_count: prepared.clip_count,
            mixed_clips: prepared.plan.entries.len(),
            gains: prepared.gains,
            warnings: prepared.warnings,
            graph_fingerprint: outcome.fingerprint,
            elapsed: start.elapsed(),
        })
    }
}
