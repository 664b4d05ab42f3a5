use super::{
    cursor::AnimationCursor,
    evaluate::{evaluate, evaluate_blend},
    export::{write_bvh, PositionChannels},
    skeleton::Skeleton,
    types::{AnimError, Interpolation, Motion},
};
use crate::matrix_table::MatrixTable;
use log::info;

/// Owns a validated skeleton, its motion and the playback cursor. Turns the
/// cursor position into world matrices.
#[derive(Clone, Debug)]
pub struct SkeletalAnimator {
    skeleton: Skeleton,
    motion: Motion,
    cursor: AnimationCursor,
    interpolation: Interpolation,
}

impl SkeletalAnimator {
    /// `timeline_fps` overrides the frame rate recorded in the motion
    ///
    /// # Errors
    /// Returns `AnimError::EmptyMotion` if there are no frames, or
    /// `AnimError::ChannelCount` if the frames were decoded for another
    /// skeleton
    pub fn new(
        skeleton: Skeleton,
        motion: Motion,
        timeline_fps: Option<f64>,
        interpolation: Interpolation,
    ) -> Result<Self, AnimError> {
        if motion.is_empty() {
            return Err(AnimError::EmptyMotion);
        }
        if let Some((i, f)) = motion
            .frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.rotations.len() != skeleton.len())
        {
            return Err(AnimError::ChannelCount {
                frame: i,
                expected: skeleton.len(),
                found: f.rotations.len(),
            });
        }
        let fps = timeline_fps.unwrap_or_else(|| motion.fps());
        info!(
            "Animator ready: {} joints, {} frames, {:.2} fps",
            skeleton.len(),
            motion.len(),
            fps
        );
        Ok(Self {
            cursor: AnimationCursor::new(motion.len(), fps),
            skeleton,
            motion,
            interpolation,
        })
    }

    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[must_use]
    pub const fn motion(&self) -> &Motion {
        &self.motion
    }

    #[must_use]
    pub const fn cursor(&self) -> &AnimationCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut AnimationCursor {
        &mut self.cursor
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Advances the cursor by `delta` seconds of wall time
    pub fn advance(&mut self, delta: f64) {
        self.cursor.advance(delta);
    }

    /// World matrices for a whole frame
    ///
    /// # Errors
    /// Returns `AnimError::FrameOutOfRange` past the last frame
    pub fn evaluate_frame(
        &self,
        index: usize,
    ) -> Result<MatrixTable, AnimError> {
        let frame = self.motion.frames.get(index).ok_or(
            AnimError::FrameOutOfRange {
                frame: index,
                total: self.motion.len(),
            },
        )?;
        evaluate(&self.skeleton, frame)
    }

    /// World matrices at the cursor. With linear interpolation the
    /// fractional position blends towards the next frame in the loop.
    ///
    /// # Errors
    /// Returns `AnimError` if the cursor is past the recording
    #[allow(clippy::cast_possible_truncation)]
    pub fn evaluate(&self) -> Result<MatrixTable, AnimError> {
        let index = self.cursor.frame_index();
        let position = self.cursor.position();
        let t = (position - position.floor()) as f32;
        if self.interpolation == Interpolation::Step || t <= 0.0 {
            return self.evaluate_frame(index);
        }
        let range = self.cursor.loop_range();
        let next = if index >= range.end {
            range.start
        } else {
            index + 1
        };
        let (Some(a), Some(b)) =
            (self.motion.frames.get(index), self.motion.frames.get(next))
        else {
            return self.evaluate_frame(index);
        };
        evaluate_blend(&self.skeleton, a, b, t)
    }

    /// BVH text for the current loop range
    ///
    /// # Errors
    /// Returns `AnimError::InvalidRange` for a range outside the recording
    pub fn export_loop(
        &self,
        include_all_positions: bool,
    ) -> Result<String, AnimError> {
        let range = self.cursor.loop_range();
        write_bvh(
            &self.skeleton,
            &self.motion,
            range.start..=range.end,
            PositionChannels::from_flag(include_all_positions),
        )
    }
}
