//! The set of rasterization operations the frame engine and uniform streamer
//! orchestrate. `VulkanoBackend` implements it for real hardware, tests
//! implement it with a scripted fake.
use crate::{mv_error::MvError, resource_table::ResourceKey};

/// Result of asking the swapchain for an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquired {
    /// The image is usable. A suboptimal image can still be drawn but the
    /// swapchain should be rebuilt afterwards.
    Image { index: u32, suboptimal: bool },
    /// The surface changed and nothing can be drawn until a rebuild
    OutOfDate,
}

/// Result of presenting an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presented {
    Done,
    Suboptimal,
    OutOfDate,
}

impl Presented {
    #[must_use]
    pub const fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Done)
    }
}

pub trait Backend {
    /// GPU to CPU completion signal, created signalled
    type Fence;
    /// GPU to GPU ordering signal
    type Semaphore;
    /// Presentable images and every attachment that shares their lifetime
    type Swapchain;
    /// A recorded command buffer ready for submission
    type Commands;

    /// Current drawable size. Zero in either dimension while minimized.
    ///
    /// # Errors
    /// May return `MvError` if the window is gone
    fn surface_extent(&self) -> Result<[u32; 2], MvError>;

    /// Builds a swapchain for the current surface size. A `previous`
    /// swapchain is consumed and its whole generation released.
    ///
    /// # Errors
    /// May return `MvError`
    fn create_swapchain(
        &mut self,
        previous: Option<Self::Swapchain>,
    ) -> Result<Self::Swapchain, MvError>;

    /// # Errors
    /// May return `MvError`
    fn destroy_swapchain(
        &mut self,
        swapchain: Self::Swapchain,
    ) -> Result<(), MvError>;

    /// # Errors
    /// May return `MvError`
    fn create_fence(&mut self) -> Result<Self::Fence, MvError>;

    /// Blocks until the fence is signalled
    ///
    /// # Errors
    /// May return `MvError`
    fn wait_fence(&mut self, fence: &mut Self::Fence) -> Result<(), MvError>;

    /// # Errors
    /// May return `MvError`
    fn reset_fence(&mut self, fence: &mut Self::Fence) -> Result<(), MvError>;

    /// # Errors
    /// May return `MvError`
    fn destroy_fence(&mut self, fence: Self::Fence) -> Result<(), MvError>;

    /// # Errors
    /// May return `MvError`
    fn create_semaphore(&mut self) -> Result<Self::Semaphore, MvError>;

    /// # Errors
    /// May return `MvError`
    fn destroy_semaphore(
        &mut self,
        semaphore: Self::Semaphore,
    ) -> Result<(), MvError>;

    /// Requests the next image, signalling `image_available` when it is
    /// ready
    ///
    /// # Errors
    /// Any failure other than an out-of-date surface
    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        image_available: &mut Self::Semaphore,
    ) -> Result<Acquired, MvError>;

    /// Submits `commands` after `wait`, signalling `signal` and `fence` on
    /// completion
    ///
    /// # Errors
    /// May return `MvError`
    fn submit(
        &mut self,
        commands: Self::Commands,
        wait: &mut Self::Semaphore,
        signal: &mut Self::Semaphore,
        fence: &mut Self::Fence,
    ) -> Result<(), MvError>;

    /// Presents `image_index` after `wait`. Backends that can only signal a
    /// fence when work is flushed do so into `fence` here.
    ///
    /// # Errors
    /// Any failure other than an out-of-date or suboptimal surface
    fn present(
        &mut self,
        swapchain: &Self::Swapchain,
        image_index: u32,
        wait: &mut Self::Semaphore,
        fence: &mut Self::Fence,
    ) -> Result<Presented, MvError>;

    /// Host visible buffer of `size` bytes
    ///
    /// # Errors
    /// Allocation failure is fatal
    fn create_buffer(&mut self, size: usize) -> Result<ResourceKey, MvError>;

    /// Maps the buffer, copies `bytes` in and unmaps it
    ///
    /// # Errors
    /// Returns `MvError` for a stale handle or a size mismatch
    fn write_buffer(
        &mut self,
        buffer: ResourceKey,
        bytes: &[u8],
    ) -> Result<(), MvError>;

    /// # Errors
    /// Returns `MvError::StaleHandle` if already destroyed
    fn destroy_buffer(&mut self, buffer: ResourceKey) -> Result<(), MvError>;
}
