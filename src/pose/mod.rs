pub mod keypoint;

pub use keypoint::{BodyPart, Keypoint, Pose};
