/*!
 * Audio timeline compositing.
 *
 * - `loudness`: per-clip loudness with an ordered fallback chain
 * - `gain`: loudness to linear volume
 * - `timeline`: pairing of cues and clips into a mix plan
 * - `background`: optional looped and attenuated bed
 * - `graph`: the declarative graph handed to the engine
 * - `render`: engine call and atomic publishing
 * - `compositor`: the whole pipeline
 */

pub mod background;
pub mod compositor;
pub mod gain;
pub mod graph;
pub mod loudness;
pub mod render;
pub mod timeline;

pub use compositor::{CompositionReport, CompositionRequest, CompositionWarning, Compositor, PreparedMix};
pub use graph::MixGraph;
pub use timeline::MixPlan;
