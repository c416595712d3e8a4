//! Pose heatmap decoding and per-frame performance measurement.
//!
//! Convolutional pose machines and similar networks do not output keypoint coordinates directly.
//! They produce a stack of confidence heatmaps, one per body keypoint, and the position of each
//! keypoint has to be recovered from its heatmap. [`heatmap::decode`] does that, producing a
//! [`KeypointSet`] that [`body`] can label and connect into a skeleton.
//!
//! [`timer::FrameTimer`] measures frame rate and per-frame latencies, and
//! [`pipeline::PoseEstimator`] ties both together around an external pose network.
//!
//! # Coordinates
//!
//! Keypoint positions are normalized to `[0, 1)` relative to the heatmap grid, with X pointing
//! right and Y pointing down, like image coordinates.
//!
//! # Environment Variables
//!
//! Some defaults can be overridden by setting environment variables:
//!
//! * `HEATPOSE_FRAME_WINDOW`: the number of frames a [`timer::FrameTimer`] keeps (default: 30).
//! * `HEATPOSE_DECODE_MODE`: `strict` to report malformed heatmap tensors as errors, or `tolerant`
//!   (the default) to log them and continue with an empty [`KeypointSet`].

use log::LevelFilter;

pub mod body;
pub mod config;
pub mod heatmap;
pub mod keypoint;
pub mod pipeline;
pub mod tensor;
pub mod timer;

pub use keypoint::{Keypoint, KeypointSet};
pub use tensor::Tensor;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level, unless overridden by `RUST_LOG`.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
