//! Per-frame pose estimation.
//!
//! A [`PoseEstimator`] runs the sequence every captured frame goes through: start timing, run the
//! network, decode its heatmaps, stop timing. The network itself is an external collaborator
//! behind the [`Inference`] trait.

use anyhow::Context;

use crate::{
    config,
    heatmap::DecodeMode,
    keypoint::KeypointSet,
    tensor::Tensor,
    timer::{Clock, Discard, FpsSink, FrameTimer, MonotonicClock},
};

/// Checkpoint recorded once the network has produced its output.
pub const END_INFERENCE: &str = "endInference";

/// A pose network that turns frames of type `F` into heatmap tensors.
pub trait Inference<F> {
    fn infer(&mut self, frame: F) -> anyhow::Result<Tensor>;
}

impl<F, M: FnMut(F) -> anyhow::Result<Tensor>> Inference<F> for M {
    fn infer(&mut self, frame: F) -> anyhow::Result<Tensor> {
        self(frame)
    }
}

/// The outcome of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Keypoints decoded from this frame's heatmaps.
    pub keypoints: KeypointSet,
    /// Frame rate estimate, if the timer had a previous frame to compare against.
    pub fps: Option<u32>,
}

/// Runs a pose network on a stream of frames and decodes its output.
///
/// Each estimator owns its [`FrameTimer`], so one estimator should be used per frame source.
pub struct PoseEstimator<M, S = Discard, C = MonotonicClock> {
    model: M,
    timer: FrameTimer<S, C>,
    mode: DecodeMode,
}

impl<M> PoseEstimator<M> {
    /// Creates an estimator using the configured frame window and decode mode (see
    /// [`config`]).
    pub fn new(model: M) -> Self {
        Self {
            model,
            timer: FrameTimer::new(),
            mode: config::decode_mode(),
        }
    }
}

impl<M, S: FpsSink, C: Clock> PoseEstimator<M, S, C> {
    /// Sends frame rate estimates to `sink`.
    pub fn with_sink<T: FpsSink>(self, sink: T) -> PoseEstimator<M, T, C> {
        PoseEstimator {
            model: self.model,
            timer: self.timer.with_sink(sink),
            mode: self.mode,
        }
    }

    /// Replaces the timer, eg. to use a different window size or clock.
    pub fn with_timer<T: FpsSink, D: Clock>(
        self,
        timer: FrameTimer<T, D>,
    ) -> PoseEstimator<M, T, D> {
        PoseEstimator {
            model: self.model,
            timer,
            mode: self.mode,
        }
    }

    pub fn with_mode(self, mode: DecodeMode) -> Self {
        Self { mode, ..self }
    }

    pub fn timer(&self) -> &FrameTimer<S, C> {
        &self.timer
    }

    /// Runs the network on `frame` and decodes its output.
    ///
    /// If the network fails, the error is returned and the frame is left unfinished in the timer;
    /// the next frame simply starts a new slot. In [`DecodeMode::Strict`], malformed network output
    /// is returned as an error as well.
    pub fn process<F>(&mut self, frame: F) -> anyhow::Result<FrameResult>
    where
        M: Inference<F>,
    {
        self.timer.start();
        let heatmap = self.model.infer(frame).context("pose network inference failed")?;
        self.timer.mark(END_INFERENCE);

        let keypoints = self.mode.decode(&heatmap)?;
        let fps = self.timer.stop();

        Ok(FrameResult { keypoints, fps })
    }
}
