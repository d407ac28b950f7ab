/*!
 * Render invocation and atomic publishing.
 *
 * The engine always writes into a temporary file next to the destination.
 * Only a successful render is renamed onto the final path; on any failure the
 * temporary file is dropped and the destination is left as it was.
 */

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engines::RenderEngine;
use crate::errors::RenderError;
use crate::file_utils::FileManager;
use crate::mixing::graph::MixGraph;

/// Result of a successful render
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub fingerprint: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderInvoker {
    engine: Arc<dyn RenderEngine>,
}

impl RenderInvoker {
    pub fn new(engine: Arc<dyn RenderEngine>) -> Self {
        Self { engine }
    }

    /// Command line the engine would run for `graph`
    pub fn describe(&self, graph: &MixGraph, output: &Path) -> String {
        self.engine.describe(graph, output)
    }

    /// Render `graph` and publish it at `output`. No retry is attempted.
    pub async fn render(&self, graph: &MixGraph, output: &Path) -> Result<RenderOutcome, RenderError> {
        let start = Instant::now();
        let fingerprint = graph.fingerprint();
        let dir = FileManager::parent_dir(output);
        FileManager::ensure_dir(&dir).map_err(|e| RenderError::Output(e.to_string()))?;

        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staging = tempfile::Builder::new()
            .prefix(".dubwai-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| RenderError::Output(format!("cannot create temporary file in {:?}: {}", dir, e)))?;

        debug!("Rendering graph {} into {:?}", &fingerprint[..12], staging.path());
        self.engine.render(graph, staging.path()).await?;

        staging
            .persist(output)
            .map_err(|e| RenderError::Output(format!("cannot publish {:?}: {}", output, e.error)))?;

        let elapsed = start.elapsed();
        info!("Rendered {:?} in {:.1}s", output, elapsed.as_secs_f64());

        Ok(RenderOutcome {
            output_path: output.to_path_buf(),
            fingerprint,
            elapsed,
        })
    }
}
