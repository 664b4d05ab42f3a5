//! Motion capture data: BVH import and export, hierarchy validation,
//! playback cursor and world matrix evaluation
mod animator;
pub mod bvh;
mod cursor;
mod evaluate;
mod export;
mod skeleton;
mod types;

pub use animator::SkeletalAnimator;
pub use cursor::{select_frame, wrap_position, AnimationCursor, LoopRange};
pub use evaluate::{
    decode_channels, decode_frame, evaluate, evaluate_blend, evaluate_pose,
};
pub use export::{write_bvh, PositionChannels};
pub use skeleton::Skeleton;
pub use types::{
    AnimError, Channel, Channels, Interpolation, Joint, Motion, MotionFrame,
};
