// Rule-based sign recognition from hand landmarks
//
// Rules are evaluated in priority order and the first match wins. All
// comparisons are strict: a tip level with its joint is neither extended nor
// curled.

use crate::core::errors::GestureError;
use crate::core::types::GestureLabel;
use crate::services::gesture::landmarks::{HandJoint, Landmark, LandmarkSet};

/// Joints every rule set needs
pub const REQUIRED_JOINTS: [HandJoint; 9] = [
    HandJoint::ThumbTip,
    HandJoint::IndexTip,
    HandJoint::IndexPip,
    HandJoint::MiddleTip,
    HandJoint::MiddlePip,
    HandJoint::RingTip,
    HandJoint::RingPip,
    HandJoint::PinkyTip,
    HandJoint::PinkyPip,
];

/// The nine points the rules look at, resolved from a landmark set
struct Hand {
    thumb_tip: Landmark,
    index_tip: Landmark,
    index_pip: Landmark,
    middle_tip: Landmark,
    middle_pip: Landmark,
    ring_tip: Landmark,
    ring_pip: Landmark,
    pinky_tip: Landmark,
    pinky_pip: Landmark,
}

impl Hand {
    fn resolve(set: &LandmarkSet) -> Result<Self, GestureError> {
        let missing: Vec<&'static str> = REQUIRED_JOINTS
            .iter()
            .filter(|joint| set.get(**joint).is_none())
            .map(|joint| joint.name())
            .collect();
        if !missing.is_empty() {
            return Err(GestureError::MissingJoints { missing });
        }

        let point = |joint: HandJoint| -> Result<Landmark, GestureError> {
            let p = set
                .get(joint)
                .ok_or(GestureError::MissingJoints {
                    missing: vec![joint.name()],
                })?;
            if !p.is_finite() {
                return Err(GestureError::NonFiniteCoordinate {
                    joint: joint.name(),
                    x: p.x,
                    y: p.y,
                });
            }
            Ok(p)
        };

        Ok(Self {
            thumb_tip: point(HandJoint::ThumbTip)?,
            index_tip: point(HandJoint::IndexTip)?,
            index_pip: point(HandJoint::IndexPip)?,
            middle_tip: point(HandJoint::MiddleTip)?,
            middle_pip: point(HandJoint::MiddlePip)?,
            ring_tip: point(HandJoint::RingTip)?,
            ring_pip: point(HandJoint::RingPip)?,
            pinky_tip: point(HandJoint::PinkyTip)?,
            pinky_pip: point(HandJoint::PinkyPip)?,
        })
    }
}

fn above(a: Landmark, b: Landmark) -> bool {
    a.y < b.y
}

fn below(a: Landmark, b: Landmark) -> bool {
    a.y > b.y
}

/// Open palm: all four fingers extended
fn is_hello(h: &Hand) -> bool {
    above(h.index_tip, h.index_pip)
        && above(h.middle_tip, h.middle_pip)
        && above(h.ring_tip, h.ring_pip)
        && above(h.pinky_tip, h.pinky_pip)
}

/// Thumbs up: thumb raised over the index knuckle, index and pinky curled
fn is_yes(h: &Hand) -> bool {
    above(h.thumb_tip, h.index_pip)
        && below(h.index_tip, h.index_pip)
        && below(h.pinky_tip, h.pinky_pip)
}

/// Closed fist: index and pinky curled, thumb tucked to the side
fn is_no(h: &Hand) -> bool {
    below(h.index_tip, h.index_pip)
        && below(h.pinky_tip, h.pinky_pip)
        && h.thumb_tip.x > h.index_tip.x
}

const RULES: [(GestureLabel, fn(&Hand) -> bool); 3] = [
    (GestureLabel::Hello, is_hello),
    (GestureLabel::Yes, is_yes),
    (GestureLabel::No, is_no),
];

/// Classify one hand. Missing or non-finite required points are
/// `GestureError`, never a silent `GestureLabel::None`.
pub fn classify(landmarks: &LandmarkSet) -> Result<GestureLabel, GestureError> {
    let hand = Hand::resolve(landmarks)?;

    Ok(RULES
        .iter()
        .find(|(_, matches)| matches(&hand))
        .map(|(label, _)| *label)
        .unwrap_or(GestureLabel::None))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: f32 = 0.3;
    const DOWN: f32 = 0.7;
    const PIP: f32 = 0.5;

    /// Hand with each finger's tip at the given height relative to PIP = 0.5
    fn hand(thumb: (f32, f32), index_tip: (f32, f32), middle: f32, ring: f32, pinky: f32) -> LandmarkSet {
        LandmarkSet::new()
            .with(HandJoint::ThumbTip, Landmark::new(thumb.0, thumb.1))
            .with(HandJoint::IndexTip, Landmark::new(index_tip.0, index_tip.1))
            .with(HandJoint::IndexPip, Landmark::new(0.4, PIP))
            .with(HandJoint::MiddleTip, Landmark::new(0.5, middle))
            .with(HandJoint::MiddlePip, Landmark::new(0.5, PIP))
            .with(HandJoint::RingTip, Landmark::new(0.6, ring))
            .with(HandJoint::RingPip, Landmark::new(0.6, PIP))
            .with(HandJoint::PinkyTip, Landmark::new(0.7, pinky))
            .with(HandJoint::PinkyPip, Landmark::new(0.7, PIP))
    }

    #[test]
    fn test_open_palm_is_hello() {
        let set = hand((0.2, 0.6), (0.4, UP), UP, UP, UP);
        assert_eq!(classify(&set), Ok(GestureLabel::Hello));
    }

    #[test]
    fn test_thumbs_up_is_yes() {
        let set = hand((0.3, 0.1), (0.4, DOWN), DOWN, DOWN, DOWN);
        assert_eq!(classify(&set), Ok(GestureLabel::Yes));
    }

    #[test]
    fn test_fist_with_tucked_thumb_is_no() {
        // Thumb below the index PIP so Yes does not fire; thumb right of index tip.
        let set = hand((0.6, 0.65), (0.4, DOWN), DOWN, DOWN, DOWN);
        assert_eq!(classify(&set), Ok(GestureLabel::No));
    }

    #[test]
    fn test_yes_takes_priority_over_no() {
        // Satisfies both Yes and No geometrically.
        let set = hand((0.6, 0.1), (0.4, DOWN), DOWN, DOWN, DOWN);
        assert_eq!(classify(&set), Ok(GestureLabel::Yes));
    }

    #[test]
    fn test_unmatched_pose_is_none() {
        // Index extended, pinky curled: neither palm nor fist.
        let set = hand((0.2, 0.6), (0.4, UP), DOWN, DOWN, DOWN);
        assert_eq!(classify(&set), Ok(GestureLabel::None));

        // Fist with thumb left of the index tip and below its PIP.
        let set = hand((0.1, 0.65), (0.4, DOWN), DOWN, DOWN, DOWN);
        assert_eq!(classify(&set), Ok(GestureLabel::None));
    }

    #[test]
    fn test_level_tips_are_neither_extended_nor_curled() {
        let set = hand((0.2, 0.6), (0.4, PIP), UP, UP, UP);
        assert_eq!(classify(&set), Ok(GestureLabel::None));
    }

    #[test]
    fn test_missing_joints_are_malformed() {
        // Tracker reported only the first nine points (wrist through index tip).
        let set = LandmarkSet::from_points(vec![Landmark::new(0.5, 0.5); 9]);

        match classify(&set) {
            Err(GestureError::MissingJoints { missing }) => {
                assert!(missing.contains(&"middle_tip"));
                assert!(missing.contains(&"pinky_pip"));
                assert!(!missing.contains(&"thumb_tip"));
            }
            other => panic!("expected MissingJoints, got {:?}", other),
        }

        assert!(matches!(
            classify(&LandmarkSet::new()),
            Err(GestureError::MissingJoints { missing }) if missing.len() == REQUIRED_JOINTS.len()
        ));
    }

    #[test]
    fn test_non_finite_coordinate_is_malformed() {
        let set = hand((0.2, 0.6), (0.4, UP), UP, UP, UP)
            .with(HandJoint::RingTip, Landmark::new(f32::NAN, 0.1));
        assert!(matches!(
            classify(&set),
            Err(GestureError::NonFiniteCoordinate { joint: "ring_tip", .. })
        ));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let set = hand((0.3, 0.1), (0.4, DOWN), DOWN, DOWN, DOWN);
        let first = classify(&set);
        for _ in 0..100 {
            assert_eq!(classify(&set), first);
        }
    }
}
