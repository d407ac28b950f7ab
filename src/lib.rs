/*!
 * # dubwai - audio timeline compositor for video dubbing
 *
 * Assembles independently synthesized speech clips (one per translated
 * subtitle cue) into a single master audio track locked to the original cue
 * timings, with per-clip loudness normalization and an optional background
 * bed mixed underneath.
 *
 * ## Features
 *
 * - SRT cue timing extraction
 * - Clip discovery by embedded cue number
 * - Loudness analysis with an RMS → peak → default fallback chain
 * - Capped gain calculation towards a target loudness
 * - Deterministic, sequential mix graphs rendered by ffmpeg
 * - Atomic publishing of the rendered track
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Cue parsing
 * - `file_utils`: Clip inventory and file system operations
 * - `mixing`: The compositing pipeline:
 *   - `mixing::loudness`: Loudness analysis
 *   - `mixing::gain`: Gain calculation
 *   - `mixing::timeline`: Timeline assembly
 *   - `mixing::background`: Background bed
 *   - `mixing::graph`: Mix graph description
 *   - `mixing::render`: Render invocation
 *   - `mixing::compositor`: End-to-end pipeline
 * - `engines`: Audio statistics and rendering engines:
 *   - `engines::ffmpeg`: ffmpeg command line backend
 *   - `engines::mock`: Test stand-ins
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod mixing;
pub mod engines;
pub mod app_controller;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{CueList, SubtitleCue};
pub use mixing::{CompositionReport, CompositionRequest, Compositor};
pub use errors::CompositorError;
