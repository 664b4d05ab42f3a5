use crate::anim::AnimError;
use nalgebra_glm as glm;

/// Number of model matrices in the vertex shader uniform. Must match the
/// array length in `shaders/skeleton.vert`.
pub const MATRIX_CAPACITY: usize = 128;

/// Model matrix slots that are not joints
pub const RESERVED_SLOTS: usize = 2;

/// Largest joint count (including end sites) a recording may have
pub const JOINT_CAPACITY: usize = MATRIX_CAPACITY - RESERVED_SLOTS;

/// Which model matrix a piece of geometry follows. Vertices carry the
/// `index` of their group so the shader can pick the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotId {
    Floor,
    DebugAxes,
    Joint(usize),
}

impl SlotId {
    /// Position of this group in the model matrix array
    ///
    /// # Errors
    /// Returns `AnimError::CapacityExceeded` for a joint that does not fit
    pub const fn index(self) -> Result<usize, AnimError> {
        match self {
            Self::Floor => Ok(0),
            Self::DebugAxes => Ok(1),
            Self::Joint(j) => {
                if j < JOINT_CAPACITY {
                    Ok(RESERVED_SLOTS + j)
                } else {
                    Err(AnimError::CapacityExceeded {
                        joints: j + 1,
                        capacity: JOINT_CAPACITY,
                    })
                }
            }
        }
    }
}

/// Fixed capacity table of world matrices, one per group. Recomputed every
/// frame and handed around by value.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixTable {
    matrices: [glm::Mat4; MATRIX_CAPACITY],
}

impl Default for MatrixTable {
    fn default() -> Self {
        Self {
            matrices: [glm::Mat4::identity(); MATRIX_CAPACITY],
        }
    }
}

impl MatrixTable {
    /// A table where every group is collapsed to the zero matrix
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            matrices: [glm::Mat4::zeros(); MATRIX_CAPACITY],
        }
    }

    /// # Errors
    /// Returns `AnimError::CapacityExceeded` for a joint that does not fit
    pub fn set(
        &mut self,
        slot: SlotId,
        matrix: glm::Mat4,
    ) -> Result<(), AnimError> {
        self.matrices[slot.index()?] = matrix;
        Ok(())
    }

    /// # Errors
    /// Returns `AnimError::CapacityExceeded` for a joint that does not fit
    pub fn get(&self, slot: SlotId) -> Result<&glm::Mat4, AnimError> {
        Ok(&self.matrices[slot.index()?])
    }

    /// Premultiplies the first `joint_count` joint matrices
    pub fn transform_joints(&mut self, joint_count: usize, global: &glm::Mat4) {
        let end = (RESERVED_SLOTS + joint_count).min(MATRIX_CAPACITY);
        for m in &mut self.matrices[RESERVED_SLOTS..end] {
            *m = global * *m;
        }
    }

    /// Column major arrays in slot order, ready for upload
    #[must_use]
    pub fn to_arrays(&self) -> [[[f32; 4]; 4]; MATRIX_CAPACITY] {
        let mut out = [[[0.0f32; 4]; 4]; MATRIX_CAPACITY];
        for (o, m) in out.iter_mut().zip(self.matrices.iter()) {
            *o = (*m).into();
        }
        out
    }
}
