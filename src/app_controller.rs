use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;

use crate::app_config::Config;
use crate::engines::ffmpeg::FfmpegEngine;
use crate::engines::{AudioStatistics, CancelHandle, RenderEngine};
use crate::file_utils::FileManager;
use crate::mixing::{CompositionReport, CompositionRequest, Compositor};

// @module: Application controller for audio compositing

/// Main application controller for the dubbing mix
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Shared cancellation flag for the render engine
    cancel: CancelHandle,

    // @field: Compositor wired to its engines
    compositor: Compositor,
}

impl Controller {
    /// Create a controller backed by the ffmpeg engines
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let cancel = CancelHandle::new();
        let engine = Arc::new(FfmpegEngine::from_config(&config).with_cancel_handle(cancel.clone()));
        Self::build(config, cancel, engine.clone(), engine)
    }

    /// Create a controller with injected engines
    pub fn with_engines(
        config: Config,
        stats: Arc<dyn AudioStatistics>,
        engine: Arc<dyn RenderEngine>,
    ) -> Result<Self> {
        config.validate()?;
        Self::build(config, CancelHandle::new(), stats, engine)
    }

    fn build(
        config: Config,
        cancel: CancelHandle,
        stats: Arc<dyn AudioStatistics>,
        engine: Arc<dyn RenderEngine>,
    ) -> Result<Self> {
        let compositor = Compositor::new(&config, stats, engine).context("Failed to set up compositor")?;
        Ok(Self { config, cancel, compositor })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle used to abort an in-flight render (e.g. on Ctrl-C)
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn check_inputs(request: &CompositionRequest) -> Result<()> {
        if !FileManager::file_exists(&request.subtitle_path) {
            return Err(anyhow!("Subtitle file does not exist: {:?}", request.subtitle_path));
        }
        if !FileManager::dir_exists(&request.workspace_dir) {
            return Err(anyhow!("Workspace directory does not exist: {:?}", request.workspace_dir));
        }
        Ok(())
    }

    /// Compose and render one track.
    ///
    /// Returns `None` when the output exists and `force_overwrite` is off.
    pub async fn run(&self, request: CompositionRequest, force_overwrite: bool) -> Result<Option<CompositionReport>> {
        Self::check_inputs(&request)?;

        if request.output_path.exists() && !force_overwrite {
            warn!("Skipping, output already exists (use -f to force overwrite): {:?}", request.output_path);
            return Ok(None);
        }

        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clips ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Analyzing");

        let pb = progress_bar.clone();
        let result = self
            .compositor
            .compose_with_progress(&request, move |done, total| {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            })
            .await;
        progress_bar.finish_and_clear();

        let report = result.map_err(|e| {
            let stage = e.stage();
            anyhow::Error::new(e).context(format!("Composition failed at the {} stage", stage))
        })?;

        info!(
            "Mixed {} of {} clip(s) over {:.3}s into {:?}",
            report.mixed_clips, report.clip_count, report.total_duration, report.output_path
        );
        if !report.warnings.is_empty() {
            warn!("Finished with {} warning(s)", report.warnings.len());
        }
        info!("Graph fingerprint: {}", report.graph_fingerprint);
        info!("Total time: {}", Self::format_duration(report.elapsed));

        Ok(Some(report))
    }

    /// Run every stage except the render.
    ///
    /// Returns the graph fingerprint as a `#` comment line followed by the
    /// engine command line.
    pub async fn plan(&self, request: CompositionRequest) -> Result<String> {
        Self::check_inputs(&request)?;

        let prepared = self
            .compositor
            .prepare(&request, |_, _| {})
            .await
            .context("Failed to prepare the mix")?;

        if !prepared.warnings.is_empty() {
            warn!("Prepared with {} warning(s)", prepared.warnings.len());
        }
        let fingerprint = prepared.graph.fingerprint();
        info!("Planned {} clip(s) over {:.3}s", prepared.plan.entries.len(), prepared.plan.base_duration);

        Ok(format!(
            "# graph {}\n{}",
            fingerprint,
            self.compositor.describe(&prepared, &request.output_path)
        ))
    }

    /// Format a duration in a human-readable way
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
