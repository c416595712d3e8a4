//! Heatmap decoding.
//!
//! CPM-style pose networks output one confidence heatmap per keypoint class, stacked into a tensor
//! of shape `[K, W, H]`. Decoding picks the strongest cell of every heatmap and turns its grid
//! coordinates into a normalized position.
//!
//! The position of the winning cell `(i, j)` is `x = (j + 0.5) / H`, `y = (i + 0.5) / W`: `x` comes
//! from the third axis and `y` from the second. Downstream label and connection tables rely on
//! this pairing, so it must not be swapped.

use itertools::iproduct;
use thiserror::Error;

use crate::{
    keypoint::{Keypoint, KeypointSet},
    tensor::Tensor,
};

/// A heatmap tensor that cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("heatmap tensor needs at least 3 dimensions, got shape {shape:?}")]
    MalformedTensor { shape: Vec<usize> },
    #[error("heatmap tensor holds {actual} values, but its first 3 dimensions need {expected}")]
    Truncated { expected: usize, actual: usize },
}

/// How [`DecodeError`]s are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Errors are returned to the caller.
    Strict,
    /// Errors are logged and decode to an empty [`KeypointSet`].
    #[default]
    Tolerant,
}

impl DecodeMode {
    /// Decodes `tensor`, handling errors according to `self`.
    ///
    /// In [`DecodeMode::Tolerant`] this never returns an error.
    pub fn decode(self, tensor: &Tensor) -> Result<KeypointSet, DecodeError> {
        match self {
            DecodeMode::Strict => decode(tensor),
            DecodeMode::Tolerant => Ok(decode_or_empty(tensor)),
        }
    }
}

/// Decodes a `[K, W, H]` confidence tensor into `K` keypoints.
///
/// For each class, the cell with the highest confidence wins. Cells with a confidence of `0` or
/// less (or NaN) carry no signal and are skipped, so a heatmap without any positive cell yields
/// `None` in its slot. When several cells share the highest confidence, the first one in scan
/// order (`i` major, then `j`) is kept.
///
/// Dimensions beyond the third are ignored; cells are read from the flattened data at
/// `k*(W*H) + i*H + j`.
pub fn decode(tensor: &Tensor) -> Result<KeypointSet, DecodeError> {
    let &[classes, width, height, ..] = tensor.shape() else {
        return Err(DecodeError::MalformedTensor {
            shape: tensor.shape().to_vec(),
        });
    };

    let plane = width * height;
    let data = tensor.as_raw_data();
    if data.len() < classes * plane {
        return Err(DecodeError::Truncated {
            expected: classes * plane,
            actual: data.len(),
        });
    }

    let mut keypoints = KeypointSet::new(classes);
    for k in 0..classes {
        let heatmap = &data[k * plane..(k + 1) * plane];

        let mut best: Option<(usize, usize, f32)> = None;
        for (i, j) in iproduct!(0..width, 0..height) {
            let confidence = heatmap[i * height + j];
            // Also rejects NaN.
            if !(confidence > 0.0) {
                continue;
            }
            if best.map_or(true, |(_, _, c)| confidence > c) {
                best = Some((i, j, confidence));
            }
        }

        keypoints.set(
            k,
            best.map(|(i, j, confidence)| {
                let x = (j as f32 + 0.5) / height as f32;
                let y = (i as f32 + 0.5) / width as f32;
                Keypoint::new([x, y], confidence)
            }),
        );
    }

    Ok(keypoints)
}

/// Decodes `tensor` like [`decode`], but logs errors and returns an empty [`KeypointSet`] instead.
pub fn decode_or_empty(tensor: &Tensor) -> KeypointSet {
    decode(tensor).unwrap_or_else(|e| {
        log::warn!("heatmap invalid: {e}");
        KeypointSet::default()
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn all_zero_is_all_absent() {
        let tensor = Tensor::from_array_shape_fn([14, 46, 46], |_| 0.0);
        let keypoints = decode(&tensor).unwrap();
        assert_eq!(keypoints.len(), 14);
        assert!(keypoints.iter().all(|kp| kp.is_none()));
    }

    #[test]
    fn single_cell() {
        let tensor = Tensor::from_vec(&[1, 2, 2], vec![0.0, 0.0, 0.0, 5.0]).unwrap();
        let keypoints = decode(&tensor).unwrap();
        assert_eq!(keypoints.len(), 1);
        assert_eq!(keypoints[0], Some(Keypoint::new([0.75, 0.75], 5.0)));
    }

    #[test]
    fn single_random_peak() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..50 {
            let shape = [rng.usize(1..6), rng.usize(1..9), rng.usize(1..9)];
            let [k0, i0, j0] = shape.map(|len| rng.usize(..len));
            let value = rng.f32() * 10.0 + 0.01;
            let tensor = Tensor::from_array_shape_fn(shape, |idx| {
                if idx == [k0, i0, j0] {
                    value
                } else {
                    0.0
                }
            });

            let keypoints = decode(&tensor).unwrap();
            assert_eq!(keypoints.len(), shape[0]);
            for (k, kp) in keypoints.iter().enumerate() {
                if k != k0 {
                    assert_eq!(kp, None);
                    continue;
                }
                let kp = kp.unwrap();
                assert_relative_eq!(kp.x(), (j0 as f32 + 0.5) / shape[2] as f32);
                assert_relative_eq!(kp.y(), (i0 as f32 + 0.5) / shape[1] as f32);
                assert_eq!(kp.confidence(), value);
            }
        }
    }

    #[test]
    fn non_square_axis_pairing() {
        // W = 2 rows along the second axis, H = 4 columns along the third.
        let tensor = Tensor::from_array_shape_fn([1, 2, 4], |[_, i, j]| {
            if (i, j) == (1, 3) {
                1.0
            } else {
                0.0
            }
        });
        let kp = decode(&tensor).unwrap()[0].unwrap();
        assert_relative_eq!(kp.x(), 3.5 / 4.0);
        assert_relative_eq!(kp.y(), 1.5 / 2.0);
    }

    #[test]
    fn ties_keep_first_in_scan_order() {
        // (1, 2), (2, 0) and (2, 1) share the maximum.
        let data = vec![0.3, 0.0, 0.0, 0.0, 0.0, 0.8, 0.8, 0.8, 0.0];
        let tensor = Tensor::from_vec(&[1, 3, 3], data).unwrap();
        let kp = decode(&tensor).unwrap()[0].unwrap();
        assert_relative_eq!(kp.x(), 2.5 / 3.0);
        assert_relative_eq!(kp.y(), 1.5 / 3.0);
        assert_eq!(kp.confidence(), 0.8);
    }

    #[test]
    fn ties_are_per_class() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..20 {
            let (w, h) = (rng.usize(2..8), rng.usize(2..8));
            let mut data = vec![0.0; 2 * w * h];
            let mut cells: Vec<usize> = (0..w * h).collect();
            rng.shuffle(&mut cells);
            let winners = &cells[..3];
            for &cell in winners {
                data[w * h + cell] = 2.0;
            }
            let first = *winners.iter().min().unwrap();

            let tensor = Tensor::from_vec(&[2, w, h], data).unwrap();
            let keypoints = decode(&tensor).unwrap();
            assert_eq!(keypoints[0], None);
            let kp = keypoints[1].unwrap();
            assert_relative_eq!(kp.x(), ((first % h) as f32 + 0.5) / h as f32);
            assert_relative_eq!(kp.y(), ((first / h) as f32 + 0.5) / w as f32);
        }
    }

    #[test]
    fn no_signal_cells_are_skipped() {
        let tensor = Tensor::from_vec(&[2, 1, 3], vec![-1.0, f32::NAN, 0.0, f32::NAN, 0.1, -3.0])
            .unwrap();
        let keypoints = decode(&tensor).unwrap();
        assert_eq!(keypoints[0], None);
        let kp = keypoints[1].unwrap();
        assert_eq!(kp.confidence(), 0.1);
        assert_relative_eq!(kp.x(), 1.5 / 3.0);
    }

    #[test]
    fn confidence_is_not_clamped() {
        let tensor = Tensor::from_vec(&[1, 1, 2], vec![7.5, 3.0]).unwrap();
        assert_eq!(decode(&tensor).unwrap()[0].unwrap().confidence(), 7.5);
    }

    #[test]
    fn malformed_shapes() {
        let shapes: [&[usize]; 3] = [&[], &[4], &[2, 2]];
        for shape in shapes {
            let tensor = Tensor::from_dyn_shape_fn(shape, |_| 1.0);
            assert_eq!(
                decode(&tensor),
                Err(DecodeError::MalformedTensor {
                    shape: shape.to_vec()
                })
            );
            assert!(decode_or_empty(&tensor).is_empty());
            assert!(DecodeMode::Tolerant.decode(&tensor).unwrap().is_empty());
            assert!(DecodeMode::Strict.decode(&tensor).is_err());
        }
    }

    #[test]
    fn extra_dimensions_are_ignored() {
        let tensor = Tensor::from_vec(&[1, 2, 2, 1], vec![0.0, 0.0, 0.0, 5.0]).unwrap();
        assert_eq!(
            decode(&tensor).unwrap()[0],
            Some(Keypoint::new([0.75, 0.75], 5.0))
        );
    }

    #[test]
    fn truncated_data() {
        let tensor = Tensor::from_dyn_shape_fn(&[1, 2, 2, 0], |_| 1.0);
        assert_eq!(
            decode(&tensor),
            Err(DecodeError::Truncated {
                expected: 4,
                actual: 0
            })
        );
        assert!(decode_or_empty(&tensor).is_empty());
    }

    #[test]
    fn zero_classes() {
        let tensor = Tensor::from_dyn_shape_fn(&[0, 46, 46], |_| 1.0);
        assert!(decode(&tensor).unwrap().is_empty());
    }
}
