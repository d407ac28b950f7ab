/*!
 * In-process engines for testing.
 *
 * - `StubStatistics` answers loudness queries from a table keyed by file name
 * - `StubRenderEngine` records graphs and writes a placeholder file, or fails
 *   on demand after leaving partial output behind
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::engines::{AudioStatistics, CancelHandle, RenderEngine};
use crate::errors::{AnalysisFailure, RenderError};
use crate::mixing::graph::MixGraph;

/// Bytes written by a successful stub render
pub const STUB_RENDER_BYTES: &[u8] = b"RIFF-stub-render";

fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Table-driven statistics engine
#[derive(Debug, Default)]
pub struct StubStatistics {
    rms: HashMap<String, Vec<f64>>,
    peaks: HashMap<String, f64>,
    delays: HashMap<String, Duration>,
    rms_calls: AtomicUsize,
    peak_calls: AtomicUsize,
}

impl StubStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel RMS levels reported for a file name
    pub fn with_rms(mut self, file_name: &str, levels: Vec<f64>) -> Self {
        self.rms.insert(file_name.to_string(), levels);
        self
    }

    /// Peak level reported for a file name
    pub fn with_peak(mut self, file_name: &str, peak: f64) -> Self {
        self.peaks.insert(file_name.to_string(), peak);
        self
    }

    /// Delay every answer for a file name
    pub fn with_delay(mut self, file_name: &str, delay: Duration) -> Self {
        self.delays.insert(file_name.to_string(), delay);
        self
    }

    pub fn rms_calls(&self) -> usize {
        self.rms_calls.load(Ordering::SeqCst)
    }

    pub fn peak_calls(&self) -> usize {
        self.peak_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self, key: &str) {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl AudioStatistics for StubStatistics {
    async fn rms_levels(&self, path: &Path) -> Result<Vec<f64>, AnalysisFailure> {
        self.rms_calls.fetch_add(1, Ordering::SeqCst);
        let key = file_key(path);
        self.pause(&key).await;
        self.rms
            .get(&key)
            .cloned()
            .ok_or_else(|| AnalysisFailure::Unavailable(format!("no RMS data for {}", key)))
    }

    async fn peak_level(&self, path: &Path) -> Result<f64, AnalysisFailure> {
        self.peak_calls.fetch_add(1, Ordering::SeqCst);
        let key = file_key(path);
        self.pause(&key).await;
        self.peaks
            .get(&key)
            .copied()
            .ok_or_else(|| AnalysisFailure::Unavailable(format!("no peak data for {}", key)))
    }
}

/// Behavior mode for the stub renderer
#[derive(Debug, Clone, PartialEq)]
pub enum StubRenderBehavior {
    /// Writes `STUB_RENDER_BYTES` and succeeds
    Succeed,
    /// Writes partial bytes then fails with the given status and diagnostics
    Fail { status: Option<i32>, diagnostics: String },
    /// Waits until cancelled
    Hang,
}

/// Recording render engine
#[derive(Debug)]
pub struct StubRenderEngine {
    behavior: StubRenderBehavior,
    cancel: CancelHandle,
    rendered: Mutex<Vec<MixGraph>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubRenderEngine {
    pub fn new(behavior: StubRenderBehavior) -> Self {
        Self {
            behavior,
            cancel: CancelHandle::new(),
            rendered: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Hold every render for `delay` before acting
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Highest number of renders seen running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn succeeding() -> Self {
        Self::new(StubRenderBehavior::Succeed)
    }

    pub fn failing(status: i32, diagnostics: &str) -> Self {
        Self::new(StubRenderBehavior::Fail {
            status: Some(status),
            diagnostics: diagnostics.to_string(),
        })
    }

    pub fn hanging(cancel: CancelHandle) -> Self {
        Self {
            cancel,
            ..Self::new(StubRenderBehavior::Hang)
        }
    }

    /// Graphs passed to `render`, in call order
    pub fn rendered(&self) -> Vec<MixGraph> {
        self.rendered.lock().clone()
    }

    async fn run_behavior(&self, output: &Path) -> Result<(), RenderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            StubRenderBehavior::Succeed => {
                std::fs::write(output, STUB_RENDER_BYTES).map_err(|e| RenderError::Output(e.to_string()))
            }
            StubRenderBehavior::Fail { status, diagnostics } => {
                std::fs::write(output, b"RIFF").map_err(|e| RenderError::Output(e.to_string()))?;
                Err(RenderError::Failed {
                    status: *status,
                    diagnostics: diagnostics.clone(),
                })
            }
            StubRenderBehavior::Hang => {
                self.cancel.cancelled().await;
                Err(RenderError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl RenderEngine for StubRenderEngine {
    async fn render(&self, graph: &MixGraph, output: &Path) -> Result<(), RenderError> {
        self.rendered.lock().push(graph.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.run_behavior(output).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn describe(&self, graph: &MixGraph, output: &Path) -> String {
        format!("stub -filter_complex {} {}", graph.filter_complex(), output.display())
    }
}
