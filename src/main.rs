//! Runs synthetic pose heatmaps through a [`PoseEstimator`] and logs what comes out.
//!
//! Usage: `heatpose [FRAMES]`

use std::{env, thread, time::Duration};

use anyhow::Context;
use heatpose::{
    body::{self, KeypointIdx},
    pipeline::PoseEstimator,
    Tensor,
};

/// Heatmap resolution of the common 368x368 CPM models.
const GRID: usize = 46;
const SIGMA: f32 = 1.5;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

const REST_POSE: [[f32; 2]; KeypointIdx::COUNT] = [
    [0.50, 0.15],
    [0.50, 0.25],
    [0.40, 0.27],
    [0.35, 0.40],
    [0.33, 0.52],
    [0.60, 0.27],
    [0.65, 0.40],
    [0.67, 0.52],
    [0.44, 0.55],
    [0.43, 0.72],
    [0.42, 0.90],
    [0.56, 0.55],
    [0.57, 0.72],
    [0.58, 0.90],
];

fn main() -> anyhow::Result<()> {
    heatpose::init_logger!();

    let frames = match env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("invalid frame count '{arg}'"))?,
        None => 90,
    };

    let mut estimator =
        PoseEstimator::new(synthesize).with_sink(|fps: u32| log::debug!("FPS: {fps}"));

    for frame in 0..frames {
        let result = estimator.process(frame)?;

        if frame % 30 == 0 {
            for (label, text) in body::describe(&result.keypoints) {
                log::info!("{label:>14}: {text}");
            }
            log::info!(
                "frame {frame}: {} bones; {}",
                body::bones(&result.keypoints).count(),
                estimator.timer()
            );
        }

        thread::sleep(FRAME_INTERVAL);
    }

    Ok(())
}

/// Renders a swaying figure into one gaussian blob per keypoint. Every 7th frame the left wrist
/// is occluded.
fn synthesize(frame: usize) -> anyhow::Result<Tensor> {
    let sway = 0.05 * (frame as f32 * 0.1).sin();
    let occluded = frame % 7 == 6;

    Ok(Tensor::from_array_shape_fn(
        [KeypointIdx::COUNT, GRID, GRID],
        |[k, i, j]| {
            if occluded && k == KeypointIdx::LeftWrist.index() {
                return 0.0;
            }
            let [x, y] = REST_POSE[k];
            let dx = j as f32 + 0.5 - (x + sway) * GRID as f32;
            let dy = i as f32 + 0.5 - y * GRID as f32;
            let value = (-(dx * dx + dy * dy) / (2.0 * SIGMA * SIGMA)).exp();
            if value < 0.01 {
                0.0
            } else {
                value
            }
        },
    ))
}
