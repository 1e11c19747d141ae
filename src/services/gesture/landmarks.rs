use serde::{Deserialize, Serialize};

/// Number of points in the 21-point hand topology used by hand trackers
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Named hand joints, indexed by their position in the 21-point topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandJoint {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            HandJoint::Wrist => "wrist",
            HandJoint::ThumbCmc => "thumb_cmc",
            HandJoint::ThumbMcp => "thumb_mcp",
            HandJoint::ThumbIp => "thumb_ip",
            HandJoint::ThumbTip => "thumb_tip",
            HandJoint::IndexMcp => "index_mcp",
            HandJoint::IndexPip => "index_pip",
            HandJoint::IndexDip => "index_dip",
            HandJoint::IndexTip => "index_tip",
            HandJoint::MiddleMcp => "middle_mcp",
            HandJoint::MiddlePip => "middle_pip",
            HandJoint::MiddleDip => "middle_dip",
            HandJoint::MiddleTip => "middle_tip",
            HandJoint::RingMcp => "ring_mcp",
            HandJoint::RingPip => "ring_pip",
            HandJoint::RingDip => "ring_dip",
            HandJoint::RingTip => "ring_tip",
            HandJoint::PinkyMcp => "pinky_mcp",
            HandJoint::PinkyPip => "pinky_pip",
            HandJoint::PinkyDip => "pinky_dip",
            HandJoint::PinkyTip => "pinky_tip",
        }
    }
}

/// Normalized image coordinate; y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// All tracked points of one detected hand. Points the tracker did not
/// report are absent rather than defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: [Option<Landmark>; HAND_LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from points in topology order. Extra points are ignored and
    /// missing trailing points stay absent.
    pub fn from_points(points: impl IntoIterator<Item = Landmark>) -> Self {
        let mut set = Self::new();
        for (slot, point) in set.points.iter_mut().zip(points) {
            *slot = Some(point);
        }
        set
    }

    /// Like `from_points`, but `None` entries leave that joint absent.
    pub fn from_optional_points(points: impl IntoIterator<Item = Option<Landmark>>) -> Self {
        let mut set = Self::new();
        for (slot, point) in set.points.iter_mut().zip(points) {
            *slot = point;
        }
        set
    }

    pub fn with(mut self, joint: HandJoint, landmark: Landmark) -> Self {
        self.set(joint, landmark);
        self
    }

    pub fn set(&mut self, joint: HandJoint, landmark: Landmark) {
        self.points[joint.index()] = Some(landmark);
    }

    pub fn get(&self, joint: HandJoint) -> Option<Landmark> {
        self.points[joint.index()]
    }

    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
