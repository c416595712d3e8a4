//! Body keypoints of CPM-style pose networks.
//!
//! These networks emit 14 heatmaps, one per [`KeypointIdx`]. This module holds the labels and the
//! skeletal connections a rendering layer needs to present a decoded [`KeypointSet`].

use crate::keypoint::{Keypoint, KeypointSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIdx {
    Head = 0,
    Neck = 1,
    RightShoulder = 2,
    RightElbow = 3,
    RightWrist = 4,
    LeftShoulder = 5,
    LeftElbow = 6,
    LeftWrist = 7,
    RightHip = 8,
    RightKnee = 9,
    RightAnkle = 10,
    LeftHip = 11,
    LeftKnee = 12,
    LeftAnkle = 13,
}

impl KeypointIdx {
    /// Number of keypoint classes.
    pub const COUNT: usize = 14;

    /// All keypoint classes, in slot order.
    pub const ALL: [KeypointIdx; 14] = {
        use KeypointIdx::*;
        [
            Head,
            Neck,
            RightShoulder,
            RightElbow,
            RightWrist,
            LeftShoulder,
            LeftElbow,
            LeftWrist,
            RightHip,
            RightKnee,
            RightAnkle,
            LeftHip,
            LeftKnee,
            LeftAnkle,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns a human-readable label.
    pub fn label(self) -> &'static str {
        use KeypointIdx::*;
        match self {
            Head => "head",
            Neck => "neck",
            RightShoulder => "right shoulder",
            RightElbow => "right elbow",
            RightWrist => "right wrist",
            LeftShoulder => "left shoulder",
            LeftElbow => "left elbow",
            LeftWrist => "left wrist",
            RightHip => "right hip",
            RightKnee => "right knee",
            RightAnkle => "right ankle",
            LeftHip => "left hip",
            LeftKnee => "left knee",
            LeftAnkle => "left ankle",
        }
    }
}

/// Pairs of keypoints connected by a bone.
pub const CONNECTIVITY: &[(KeypointIdx, KeypointIdx)] = {
    use KeypointIdx::*;
    &[
        (Head, Neck),
        (Neck, RightShoulder),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (Neck, RightHip),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
        (Neck, LeftShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (Neck, LeftHip),
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
    ]
};

/// Yields the end points of every bone in [`CONNECTIVITY`] whose keypoints were both detected.
pub fn bones(keypoints: &KeypointSet) -> impl Iterator<Item = (Keypoint, Keypoint)> + '_ {
    CONNECTIVITY
        .iter()
        .filter_map(|&(a, b)| Some((keypoints.get(a.index())?, keypoints.get(b.index())?)))
}

/// Yields a `(label, description)` row for every slot of `keypoints`.
///
/// Detected keypoints are described as `(x, y), [confidence]`, missing ones as `N/A`. Slots
/// without a known label are labeled `?`.
pub fn describe(keypoints: &KeypointSet) -> impl Iterator<Item = (&'static str, String)> + '_ {
    keypoints.iter().enumerate().map(|(i, kp)| {
        let label = KeypointIdx::from_index(i).map_or("?", KeypointIdx::label);
        let text = match kp {
            Some(kp) => kp.to_string(),
            None => String::from("N/A"),
        };
        (label, text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_slots() {
        for (i, idx) in KeypointIdx::ALL.iter().enumerate() {
            assert_eq!(idx.index(), i);
            assert_eq!(KeypointIdx::from_index(i), Some(*idx));
        }
        assert_eq!(KeypointIdx::from_index(KeypointIdx::COUNT), None);
    }

    #[test]
    fn neck_is_the_hub() {
        let neck_bones = CONNECTIVITY
            .iter()
            .filter(|(a, b)| *a == KeypointIdx::Neck || *b == KeypointIdx::Neck)
            .count();
        assert_eq!(neck_bones, 5);
        assert_eq!(CONNECTIVITY.len(), KeypointIdx::COUNT - 1);
    }

    #[test]
    fn bones_skip_missing_ends() {
        let mut set = KeypointSet::new(KeypointIdx::COUNT);
        set.set(0, Some(Keypoint::new([0.5, 0.1], 1.0)));
        set.set(1, Some(Keypoint::new([0.5, 0.2], 1.0)));
        set.set(2, Some(Keypoint::new([0.4, 0.2], 1.0)));
        let found: Vec<_> = bones(&set).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0.position(), [0.5, 0.1]);
        assert_eq!(found[1].1.position(), [0.4, 0.2]);
    }

    #[test]
    fn bones_on_short_set() {
        let mut set = KeypointSet::new(1);
        set.set(0, Some(Keypoint::new([0.5, 0.5], 1.0)));
        assert_eq!(bones(&set).count(), 0);
    }

    #[test]
    fn describe_rows() {
        let mut set = KeypointSet::new(KeypointIdx::COUNT + 1);
        set.set(1, Some(Keypoint::new([0.75, 0.25], 5.0)));
        let rows: Vec<_> = describe(&set).collect();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0], ("head", String::from("N/A")));
        assert_eq!(rows[1], ("neck", String::from("(0.750, 0.250), [5.000]")));
        assert_eq!(rows[14].0, "?");
    }
}
