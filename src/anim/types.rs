use nalgebra_glm as glm;
use serde::Deserialize;
use smallvec::SmallVec;
use std::{error, fmt};

/// One BVH channel. Position channels are in file units, rotation channels
/// in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Xposition" => Some(Self::Xposition),
            "Yposition" => Some(Self::Yposition),
            "Zposition" => Some(Self::Zposition),
            "Xrotation" => Some(Self::Xrotation),
            "Yrotation" => Some(Self::Yrotation),
            "Zrotation" => Some(Self::Zrotation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Xposition => "Xposition",
            Self::Yposition => "Yposition",
            Self::Zposition => "Zposition",
            Self::Xrotation => "Xrotation",
            Self::Yrotation => "Yrotation",
            Self::Zrotation => "Zrotation",
        }
    }

    #[must_use]
    pub const fn is_position(self) -> bool {
        matches!(self, Self::Xposition | Self::Yposition | Self::Zposition)
    }

    /// Unit axis the channel acts along
    #[must_use]
    pub fn axis(self) -> glm::Vec3 {
        match self {
            Self::Xposition | Self::Xrotation => glm::vec3(1.0, 0.0, 0.0),
            Self::Yposition | Self::Yrotation => glm::vec3(0.0, 1.0, 0.0),
            Self::Zposition | Self::Zrotation => glm::vec3(0.0, 0.0, 1.0),
        }
    }
}

/// BVH allows at most six channels per joint
pub type Channels = SmallVec<[Channel; 6]>;

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    /// Bind pose offset from the parent joint
    pub offset: glm::Vec3,
    pub channels: Channels,
    /// BVH `End Site`, a leaf that only has an offset
    pub end_site: bool,
}

impl Joint {
    #[must_use]
    pub fn new(name: &str, parent: Option<usize>, offset: glm::Vec3) -> Self {
        Self {
            name: name.to_owned(),
            parent,
            offset,
            channels: Channels::new(),
            end_site: false,
        }
    }

    #[must_use]
    pub fn has_position(&self) -> bool {
        self.channels.iter().any(|c| c.is_position())
    }
}

/// One sampled time step. `values` are the raw channel values in hierarchy
/// declaration order. `rotations` and `translations` are decoded from them,
/// one entry per joint.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionFrame {
    pub values: Vec<f32>,
    pub rotations: Vec<glm::Quat>,
    pub translations: Vec<Option<glm::Vec3>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    /// Seconds per frame as recorded
    pub frame_time: f32,
    pub frames: Vec<MotionFrame>,
}

impl Motion {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Recorded frames per second, falling back to 30 for a zero frame time
    #[must_use]
    pub fn fps(&self) -> f64 {
        if self.frame_time > 0.0 {
            1.0 / f64::from(self.frame_time)
        } else {
            30.0
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Step,
    Linear,
}

/// Errors from loading, validating, evaluating or exporting motion data
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimError {
    Syntax { line: usize, message: String },
    UnexpectedEnd,
    EmptyHierarchy,
    EmptyMotion,
    ParentOutOfRange { joint: usize, parent: usize },
    CyclicParent { joint: usize },
    CapacityExceeded { joints: usize, capacity: usize },
    ChannelCount { frame: usize, expected: usize, found: usize },
    FrameCount { declared: usize, found: usize },
    FrameOutOfRange { frame: usize, total: usize },
    InvalidRange { start: usize, end: usize, total: usize },
}

impl error::Error for AnimError {}

impl fmt::Display for AnimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Syntax { line, message } => {
                write!(f, "line {line}: {message}")
            }
            Self::UnexpectedEnd => write!(f, "unexpected end of file"),
            Self::EmptyHierarchy => write!(f, "hierarchy has no joints"),
            Self::EmptyMotion => write!(f, "motion has no frames"),
            Self::ParentOutOfRange { joint, parent } => write!(
                f,
                "joint {joint} names parent {parent} which does not exist"
            ),
            Self::CyclicParent { joint } => {
                write!(f, "parent chain of joint {joint} forms a cycle")
            }
            Self::CapacityExceeded { joints, capacity } => write!(
                f,
                "{joints} joints do not fit in a table of {capacity} joints"
            ),
            Self::ChannelCount {
                frame,
                expected,
                found,
            } => write!(
                f,
                "frame {frame} has {found} values but the hierarchy declares \
                 {expected} channels"
            ),
            Self::FrameCount { declared, found } => {
                write!(f, "{declared} frames declared but {found} found")
            }
            Self::FrameOutOfRange { frame, total } => {
                write!(f, "frame {frame} is past the last of {total} frames")
            }
            Self::InvalidRange { start, end, total } => write!(
                f,
                "range {start}..={end} is not valid for {total} frames"
            ),
        }
    }
}
