pub mod classifier;
pub mod landmarks;

pub use classifier::{classify, REQUIRED_JOINTS};
pub use landmarks::{HandJoint, Landmark, LandmarkSet, HAND_LANDMARK_COUNT};
