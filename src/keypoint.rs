//! Decoded keypoints.

use std::{fmt, ops::Index};

type Position = [f32; 2];

/// A keypoint detected in one heatmap.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Keypoint {
    pos: Position,
    confidence: f32,
}

impl Keypoint {
    /// Creates a keypoint at a normalized `position` with a raw `confidence` value.
    pub fn new(position: Position, confidence: f32) -> Self {
        Self {
            pos: position,
            confidence,
        }
    }

    /// The position of the keypoint, normalized to `[0, 1)` on both axes.
    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    /// The raw heatmap value the keypoint was found at.
    ///
    /// This is not normalized, and may exceed `1.0` depending on the network.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Formats as `(x, y), [confidence]` with three decimals.
impl fmt::Display for Keypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}), [{:.3}]",
            self.x(),
            self.y(),
            self.confidence
        )
    }
}

/// The keypoints decoded from a single frame, one slot per keypoint class.
///
/// Slot `i` always belongs to class `i`. A slot is `None` when the network produced no signal for
/// that class. Sets are independent snapshots: nothing is carried over between frames.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeypointSet {
    keypoints: Box<[Option<Keypoint>]>,
}

impl KeypointSet {
    /// Creates a [`KeypointSet`] with `len` slots, all of them empty.
    pub fn new(len: usize) -> Self {
        Self {
            keypoints: vec![None; len].into_boxed_slice(),
        }
    }

    /// Returns the number of slots (detected or not).
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Returns the keypoint in slot `index`, or `None` if it was not detected or `index` is out of
    /// range.
    pub fn get(&self, index: usize) -> Option<Keypoint> {
        self.keypoints.get(index).copied().flatten()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize, keypoint: Option<Keypoint>) {
        self.keypoints[index] = keypoint;
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Keypoint>> + Clone + '_ {
        self.keypoints.iter().copied()
    }

    /// Iterates over the detected keypoints and their slot indices.
    pub fn detected(&self) -> impl Iterator<Item = (usize, Keypoint)> + '_ {
        self.keypoints
            .iter()
            .enumerate()
            .filter_map(|(i, kp)| kp.map(|kp| (i, kp)))
    }
}

impl Index<usize> for KeypointSet {
    type Output = Option<Keypoint>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.keypoints[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_all_absent() {
        let set = KeypointSet::new(14);
        assert_eq!(set.len(), 14);
        assert!(set.iter().all(|kp| kp.is_none()));
        assert_eq!(set.detected().count(), 0);
        assert_eq!(set.get(20), None);
    }

    #[test]
    fn set_and_detected() {
        let mut set = KeypointSet::new(3);
        set.set(1, Some(Keypoint::new([0.25, 0.75], 0.5)));
        assert_eq!(set[0], None);
        assert_eq!(set.get(1).map(|kp| kp.position()), Some([0.25, 0.75]));
        assert_eq!(
            set.detected().collect::<Vec<_>>(),
            [(1, Keypoint::new([0.25, 0.75], 0.5))]
        );
    }

    #[test]
    fn display() {
        let kp = Keypoint::new([0.75, 0.25], 5.0);
        assert_eq!(kp.to_string(), "(0.750, 0.250), [5.000]");
    }
}
