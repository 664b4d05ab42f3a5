use crate::{
    backend::{Acquired, Backend},
    mv_error::MvError,
};
use log::{debug, info, trace, warn};

/// Synchronization objects owned by one frame in flight
pub struct FrameSlot<B: Backend> {
    pub fence: B::Fence,
    pub image_available: B::Semaphore,
    pub render_finished: B::Semaphore,
}

/// What a frame is being recorded for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTarget {
    /// Frame slot, also the uniform slot to write
    pub slot: usize,
    pub image_index: u32,
}

/// Outcome of `FrameControl::draw_frame`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Presented(FrameTarget),
    /// The swapchain was out of date and has been rebuilt. Nothing was
    /// drawn and the slot did not advance.
    Rebuilt,
    /// The surface has no area
    Skipped,
}

/// Drives acquire, record, submit and present with up to `frames_in_flight`
/// frames queued on the GPU. Waiting on a slot's fence before reusing it is
/// the only point where the CPU blocks on the GPU.
pub struct FrameControl<B: Backend> {
    slots: Vec<FrameSlot<B>>,
    swapchain: Option<B::Swapchain>,
    fence_index: usize,
    previous_fence_index: usize,
    frame_count: usize,
    rebuild_count: usize,
    rebuild_requested: bool,
}

impl<B: Backend> FrameControl<B> {
    /// Creates the per-slot synchronization objects and the first swapchain
    ///
    /// # Errors
    /// May return `MvError`
    pub fn new(
        backend: &mut B,
        frames_in_flight: usize,
    ) -> Result<Self, MvError> {
        let frames_in_flight = if frames_in_flight == 0 {
            warn!("frames_in_flight of 0 is not usable, setting to 1");
            1
        } else {
            frames_in_flight
        };

        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            slots.push(FrameSlot {
                fence: backend.create_fence()?,
                image_available: backend.create_semaphore()?,
                render_finished: backend.create_semaphore()?,
            });
        }
        let swapchain = backend.create_swapchain(None)?;
        info!("Frames in flight set to {}", frames_in_flight);

        Ok(Self {
            slots,
            swapchain: Some(swapchain),
            fence_index: 0,
            previous_fence_index: 0,
            frame_count: 0,
            rebuild_count: 0,
            rebuild_requested: false,
        })
    }

    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next frame will use
    #[must_use]
    pub const fn fence_index(&self) -> usize {
        self.fence_index
    }

    #[must_use]
    pub const fn previous_fence_index(&self) -> usize {
        self.previous_fence_index
    }

    /// Number of frames presented
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of times the swapchain was rebuilt since creation
    #[must_use]
    pub const fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    #[must_use]
    pub const fn swapchain(&self) -> Option<&B::Swapchain> {
        self.swapchain.as_ref()
    }

    /// Schedules a rebuild, for example after the window was resized
    pub fn request_rebuild(&mut self) {
        trace!("request_rebuild");
        self.rebuild_requested = true;
    }

    /// Draws one frame. `record` is called after the slot's fence has been
    /// waited on, so it may write that slot's uniforms before recording the
    /// commands that read them.
    ///
    /// # Errors
    /// Returns any backend failure other than an out-of-date or suboptimal
    /// swapchain, or any error from `record`
    pub fn draw_frame<F>(
        &mut self,
        backend: &mut B,
        record: F,
    ) -> Result<FrameStatus, MvError>
    where
        F: FnOnce(
            &mut B,
            &B::Swapchain,
            FrameTarget,
        ) -> Result<B::Commands, MvError>,
    {
        let [width, height] = backend.surface_extent()?;
        if width == 0 || height == 0 {
            trace!("draw_frame skipped for zero extent");
            return Ok(FrameStatus::Skipped);
        }
        if self.rebuild_requested || self.swapchain.is_none() {
            self.rebuild(backend)?;
        }

        let slot_index = self.fence_index;
        let slot = &mut self.slots[slot_index];
        let swapchain = self.swapchain.as_ref().ok_or(MvError::NoSwapchain)?;

        backend.wait_fence(&mut slot.fence)?;

        let (image_index, acquire_suboptimal) = match backend
            .acquire_next_image(swapchain, &mut slot.image_available)?
        {
            Acquired::Image { index, suboptimal } => (index, suboptimal),
            Acquired::OutOfDate => {
                debug!("acquire_next_image says swapchain is out of date");
                self.rebuild(backend)?;
                return Ok(FrameStatus::Rebuilt);
            }
        };
        if acquire_suboptimal {
            debug!("rebuild after present for suboptimal acquire");
        }

        // Only reset once something is certain to signal it again
        backend.reset_fence(&mut slot.fence)?;

        let target = FrameTarget {
            slot: slot_index,
            image_index,
        };
        let commands = record(backend, swapchain, target)?;
        backend.submit(
            commands,
            &mut slot.image_available,
            &mut slot.render_finished,
            &mut slot.fence,
        )?;
        let presented = backend.present(
            swapchain,
            image_index,
            &mut slot.render_finished,
            &mut slot.fence,
        )?;
        if presented.needs_rebuild() {
            debug!("present says swapchain is {:?}", presented);
        }
        if presented.needs_rebuild() || acquire_suboptimal {
            self.rebuild_requested = true;
        }

        self.advance();
        if self.rebuild_requested {
            self.rebuild(backend)?;
        }
        Ok(FrameStatus::Presented(target))
    }

    /// Waits for every slot to finish, then replaces the swapchain and every
    /// resource of its generation. Does nothing while the surface has no
    /// area, leaving the rebuild pending.
    ///
    /// # Errors
    /// May return `MvError`
    pub fn rebuild(&mut self, backend: &mut B) -> Result<(), MvError> {
        let [width, height] = backend.surface_extent()?;
        if width == 0 || height == 0 {
            self.rebuild_requested = true;
            return Ok(());
        }
        for slot in &mut self.slots {
            backend.wait_fence(&mut slot.fence)?;
        }
        let previous = self.swapchain.take();
        self.swapchain = Some(backend.create_swapchain(previous)?);
        self.rebuild_requested = false;
        self.rebuild_count += 1;
        debug!("swapchain rebuilt at {}x{}", width, height);
        Ok(())
    }

    /// Waits for the GPU to go idle and destroys everything this object
    /// owns
    ///
    /// # Errors
    /// May return `MvError`
    pub fn shutdown(mut self, backend: &mut B) -> Result<(), MvError> {
        for slot in &mut self.slots {
            backend.wait_fence(&mut slot.fence)?;
        }
        if let Some(swapchain) = self.swapchain.take() {
            backend.destroy_swapchain(swapchain)?;
        }
        for slot in self.slots.drain(..) {
            backend.destroy_fence(slot.fence)?;
            backend.destroy_semaphore(slot.image_available)?;
            backend.destroy_semaphore(slot.render_finished)?;
        }
        info!("Frame control shut down after {} frames", self.frame_count);
        Ok(())
    }

    fn advance(&mut self) {
        self.previous_fence_index = self.fence_index;
        self.fence_index = (self.fence_index + 1) % self.slots.len();
        self.frame_count += 1;
        trace!(
            "advance previous_fence_index={} fence_index={} frame_count={}",
            self.previous_fence_index,
            self.fence_index,
            self.frame_count
        );
    }
}
