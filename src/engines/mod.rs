/*!
 * External engines used by the compositor.
 *
 * The compositor never runs DSP itself. It asks an audio statistics engine
 * for loudness figures and hands a finished mix graph to a rendering engine:
 * - `ffmpeg`: both engines backed by the ffmpeg command line tool
 * - `mock`: in-process stand-ins for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use crate::errors::{AnalysisFailure, RenderError};
use crate::mixing::graph::MixGraph;

/// Source of loudness statistics for a single audio file
#[async_trait]
pub trait AudioStatistics: Send + Sync + Debug {
    /// RMS level of each channel in dBFS
    ///
    /// # Returns
    /// * `Ok(levels)` - One value per channel, possibly `-inf` for digital silence
    /// * `Err(reason)` - Why the measurement could not be taken
    async fn rms_levels(&self, path: &Path) -> Result<Vec<f64>, AnalysisFailure>;

    /// Peak level in dBFS
    async fn peak_level(&self, path: &Path) -> Result<f64, AnalysisFailure>;
}

/// Deterministic renderer for declarative mix graphs
#[async_trait]
pub trait RenderEngine: Send + Sync + Debug {
    /// Render `graph` into `output`.
    ///
    /// The call blocks until the engine finishes. On failure the content of
    /// `output` is unspecified; callers must not publish it.
    async fn render(&self, graph: &MixGraph, output: &Path) -> Result<(), RenderError>;

    /// Human readable description of what `render` would run
    fn describe(&self, graph: &MixGraph, output: &Path) -> String;
}

/// Shared flag used to abort an in-flight render
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; wakes every pending `cancelled()` future
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

pub mod ffmpeg;
pub mod mock;
