use crate::{
    backend::Backend,
    matrix_table::{MatrixTable, MATRIX_CAPACITY},
    mv_error::MvError,
    resource_table::ResourceKey,
};
use bytemuck::{Pod, Zeroable};
use log::{info, trace};
use nalgebra_glm as glm;
use std::mem::size_of;

/// Binding 0 of the skeleton pipeline: one matrix per group
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[[f32; 4]; 4]; MATRIX_CAPACITY],
}

impl From<&MatrixTable> for ModelUniform {
    fn from(table: &MatrixTable) -> Self {
        Self {
            model: table.to_arrays(),
        }
    }
}

/// Binding 1 of the skeleton pipeline
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl SceneUniform {
    #[must_use]
    pub fn new(view: &glm::Mat4, proj: &glm::Mat4) -> Self {
        Self {
            view: (*view).into(),
            proj: (*proj).into(),
        }
    }
}

/// Buffers read by one frame in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub model: ResourceKey,
    pub scene: ResourceKey,
}

/// One set of host visible uniform buffers per frame in flight. A slot is
/// only written after its frame fence has been waited on, so the GPU never
/// reads a buffer while it is being overwritten.
#[derive(Debug)]
pub struct UniformStreamer {
    slots: Vec<UniformSlot>,
}

impl UniformStreamer {
    /// # Errors
    /// Allocation failure is fatal
    pub fn new<B: Backend>(
        backend: &mut B,
        slot_count: usize,
    ) -> Result<Self, MvError> {
        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            slots.push(UniformSlot {
                model: backend.create_buffer(size_of::<ModelUniform>())?,
                scene: backend.create_buffer(size_of::<SceneUniform>())?,
            });
        }
        info!(
            "Uniform streamer with {} slots of {} bytes",
            slot_count,
            size_of::<ModelUniform>() + size_of::<SceneUniform>()
        );
        Ok(Self { slots })
    }

    #[must_use]
    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// # Errors
    /// Returns `MvError::SlotOutOfRange` for a slot that does not exist
    pub fn slot(&self, slot: usize) -> Result<&UniformSlot, MvError> {
        self.slots.get(slot).ok_or(MvError::SlotOutOfRange {
            slot,
            count: self.slots.len(),
        })
    }

    /// Overwrites the buffers of `slot`. The caller must have waited on the
    /// fence of the frame that last used it.
    ///
    /// # Errors
    /// Returns `MvError` for a bad slot or a failed buffer write
    pub fn update_uniform_buffer<B: Backend>(
        &self,
        backend: &mut B,
        slot: usize,
        model: &MatrixTable,
        scene: &SceneUniform,
    ) -> Result<(), MvError> {
        let keys = *self.slot(slot)?;
        let model = ModelUniform::from(model);
        backend.write_buffer(keys.model, bytemuck::bytes_of(&model))?;
        backend.write_buffer(keys.scene, bytemuck::bytes_of(scene))?;
        trace!("update_uniform_buffer slot={}", slot);
        Ok(())
    }

    /// # Errors
    /// Returns `MvError::StaleHandle` if a buffer was already destroyed
    pub fn destroy<B: Backend>(self, backend: &mut B) -> Result<(), MvError> {
        for slot in self.slots {
            backend.destroy_buffer(slot.model)?;
            backend.destroy_buffer(slot.scene)?;
        }
        Ok(())
    }
}
