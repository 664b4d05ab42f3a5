//! `Backend` for real hardware through vulkano
//!
//! vulkano expresses GPU ordering with futures rather than raw semaphores,
//! so a `GpuSignal` holds the future that stands in for the semaphore and a
//! `GpuFence` holds the fence signalled when the frame's work is flushed.
use crate::{
    backend::{Acquired, Backend, Presented},
    config::ViewerConfig,
    memory::Memory,
    mv_error::MvError,
    resource_table::{Lifetime, ResourceKey, ResourceTable},
    types::RenderFormat,
    util,
    vk_window::VkWindow,
};
use log::{debug, error, info, trace};
use std::sync::Arc;
use vulkano::{
    buffer::{BufferUsage, Subbuffer},
    command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
    device::{Device, Queue},
    image::{view::ImageView, SampleCount},
    swapchain::{
        self, PresentMode, Swapchain, SwapchainCreateInfo,
        SwapchainPresentInfo,
    },
    sync::{self, future::FenceSignalFuture, GpuFuture},
    Validated, VulkanError,
};

/// Objects owned by the resource table
pub enum GpuResource {
    Buffer(Subbuffer<[u8]>),
    ImageView(Arc<ImageView>),
}

/// Empty means signalled
#[derive(Default)]
pub struct GpuFence(Option<FenceSignalFuture<Box<dyn GpuFuture>>>);

/// Empty means nothing is pending
#[derive(Default)]
pub struct GpuSignal(Option<Box<dyn GpuFuture>>);

/// A swapchain and the handles of the attachments built with it
pub struct VkSwapchain {
    swapchain: Arc<Swapchain>,
    generation: u64,
    image_views: Vec<ResourceKey>,
    depth: ResourceKey,
    msaa: Option<ResourceKey>,
}

impl VkSwapchain {
    #[must_use]
    pub const fn swapchain(&self) -> &Arc<Swapchain> {
        &self.swapchain
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn extent(&self) -> [u32; 2] {
        self.swapchain.image_extent()
    }

    /// # Errors
    /// Returns `MvError::SlotOutOfRange` for an index the swapchain didn't
    /// hand out
    pub fn image_view(
        &self,
        image_index: u32,
    ) -> Result<ResourceKey, MvError> {
        let index = image_index as usize;
        self.image_views
            .get(index)
            .copied()
            .ok_or(MvError::SlotOutOfRange {
                slot: index,
                count: self.image_views.len(),
            })
    }

    #[must_use]
    pub const fn depth(&self) -> ResourceKey {
        self.depth
    }

    #[must_use]
    pub const fn msaa(&self) -> Option<ResourceKey> {
        self.msaa
    }
}

pub struct VulkanoBackend {
    window: VkWindow,
    memory: Memory,
    resources: ResourceTable<GpuResource>,
    render_format: RenderFormat,
    present_mode: PresentMode,
}

impl VulkanoBackend {
    /// Settles the formats the swapchain and pipeline share
    ///
    /// # Errors
    /// May return `MvError` if no supported format is found or the sample
    /// count in `config` is invalid
    pub fn new(
        window: VkWindow,
        config: &ViewerConfig,
    ) -> Result<Self, MvError> {
        let memory = Memory::new(window.device());
        let colour_format = util::find_swapchain_format(
            window.physical(),
            window.surface(),
            &util::SWAPCHAIN_FORMATS,
        )?;
        let depth_format =
            util::find_depth_format(window.physical(), &util::DEPTH_FORMATS)?;
        let sample_count = util::supported_sample_count(
            window.physical(),
            config.sample_count()?,
        );
        let present_mode = util::choose_present_mode(&window, config.vsync);
        info!(
            "Render format {:?} depth {:?} samples {:?} present {:?}",
            colour_format, depth_format, sample_count, present_mode
        );
        Ok(Self {
            window,
            memory,
            resources: ResourceTable::new(),
            render_format: RenderFormat {
                colour_format,
                depth_format,
                sample_count,
            },
            present_mode,
        })
    }

    #[must_use]
    pub const fn window(&self) -> &VkWindow {
        &self.window
    }

    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub const fn device(&self) -> &Arc<Device> {
        self.window.device()
    }

    #[must_use]
    pub const fn graphics_queue(&self) -> &Arc<Queue> {
        self.window.graphics_queue()
    }

    #[must_use]
    pub const fn render_format(&self) -> RenderFormat {
        self.render_format
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourceTable<GpuResource> {
        &self.resources
    }

    /// # Errors
    /// Returns `MvError::StaleHandle` or `MvError::WrongResourceKind`
    pub fn buffer(
        &self,
        key: ResourceKey,
    ) -> Result<Subbuffer<[u8]>, MvError> {
        match self.resources.get(key)? {
            GpuResource::Buffer(buffer) => Ok(buffer.clone()),
            GpuResource::ImageView(_) => Err(MvError::WrongResourceKind),
        }
    }

    /// # Errors
    /// Returns `MvError::StaleHandle` or `MvError::WrongResourceKind`
    pub fn image_view(
        &self,
        key: ResourceKey,
    ) -> Result<Arc<ImageView>, MvError> {
        match self.resources.get(key)? {
            GpuResource::ImageView(view) => Ok(view.clone()),
            GpuResource::Buffer(_) => Err(MvError::WrongResourceKind),
        }
    }

    /// # Errors
    /// May return `MvError`
    pub fn create_primary_cbb(
        &self,
    ) -> Result<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>, MvError>
    {
        util::create_primary_cbb(
            &self.memory.command_buffer_allocator,
            self.graphics_queue(),
        )
    }

    pub fn set_title(&self, title: &str) {
        self.window.window().set_title(title);
    }

    fn wait_idle(&self) -> Result<(), MvError> {
        self.graphics_queue().with(|mut q| q.wait_idle())?;
        Ok(())
    }

    fn release_generation(&mut self, generation: u64) {
        let released = self.resources.release_generation(generation);
        debug!(
            "Released {} resources of swapchain generation {}",
            released.len(),
            generation
        );
    }
}

impl Backend for VulkanoBackend {
    type Fence = GpuFence;
    type Semaphore = GpuSignal;
    type Swapchain = VkSwapchain;
    type Commands = Arc<PrimaryAutoCommandBuffer>;

    fn surface_extent(&self) -> Result<[u32; 2], MvError> {
        Ok(self.window.dimensions().into())
    }

    fn create_swapchain(
        &mut self,
        previous: Option<VkSwapchain>,
    ) -> Result<VkSwapchain, MvError> {
        self.wait_idle()?;
        // The surface may report a fixed size that differs from the window
        let window_extent = self.surface_extent()?;
        let extent = self
            .window
            .surface_caps()?
            .current_extent
            .unwrap_or(window_extent);

        let (swapchain, images) = if let Some(previous) = previous {
            let recreated = previous
                .swapchain
                .recreate(SwapchainCreateInfo {
                    image_extent: extent,
                    ..previous.swapchain.create_info()
                })
                .map_err(|e| {
                    error!("Swapchain recreate failed: {e:?}");
                    MvError::RecreateFailed
                })?;
            self.release_generation(previous.generation);
            recreated
        } else {
            util::create_swapchain(
                &self.window,
                extent,
                self.render_format.colour_format,
                self.present_mode,
            )?
        };

        let generation = self.resources.next_generation();
        let lifetime = Lifetime::Swapchain(generation);
        let image_views = util::create_image_views(&images)?
            .into_iter()
            .map(|v| {
                self.resources.insert(GpuResource::ImageView(v), lifetime)
            })
            .collect();
        let depth = util::create_depth(
            self.memory.memory_allocator.clone(),
            extent,
            self.render_format.depth_format,
            self.render_format.sample_count,
        )?;
        let depth =
            self.resources.insert(GpuResource::ImageView(depth), lifetime);
        let msaa = if self.render_format.sample_count == SampleCount::Sample1 {
            None
        } else {
            let msaa = util::create_msaa(
                self.memory.memory_allocator.clone(),
                extent,
                self.render_format.colour_format,
                self.render_format.sample_count,
            )?;
            Some(self.resources.insert(GpuResource::ImageView(msaa), lifetime))
        };
        info!(
            "Swapchain generation {} at {}x{} with {} images",
            generation,
            extent[0],
            extent[1],
            images.len()
        );

        Ok(VkSwapchain {
            swapchain,
            generation,
            image_views,
            depth,
            msaa,
        })
    }

    fn destroy_swapchain(
        &mut self,
        swapchain: VkSwapchain,
    ) -> Result<(), MvError> {
        self.wait_idle()?;
        self.release_generation(swapchain.generation);
        Ok(())
    }

    fn create_fence(&mut self) -> Result<GpuFence, MvError> {
        Ok(GpuFence::default())
    }

    fn wait_fence(&mut self, fence: &mut GpuFence) -> Result<(), MvError> {
        if let Some(future) = &fence.0 {
            future.wait(None)?;
        }
        Ok(())
    }

    fn reset_fence(&mut self, fence: &mut GpuFence) -> Result<(), MvError> {
        if let Some(mut future) = fence.0.take() {
            future.cleanup_finished();
        }
        Ok(())
    }

    fn destroy_fence(&mut self, mut fence: GpuFence) -> Result<(), MvError> {
        self.wait_fence(&mut fence)
    }

    fn create_semaphore(&mut self) -> Result<GpuSignal, MvError> {
        Ok(GpuSignal::default())
    }

    fn destroy_semaphore(
        &mut self,
        semaphore: GpuSignal,
    ) -> Result<(), MvError> {
        drop(semaphore);
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &VkSwapchain,
        image_available: &mut GpuSignal,
    ) -> Result<Acquired, MvError> {
        match swapchain::acquire_next_image(swapchain.swapchain.clone(), None)
        {
            Ok((index, suboptimal, future)) => {
                trace!("acquired image {} suboptimal={}", index, suboptimal);
                image_available.0 = Some(future.boxed());
                Ok(Acquired::Image { index, suboptimal })
            }
            Err(Validated::Error(VulkanError::OutOfDate)) => {
                Ok(Acquired::OutOfDate)
            }
            Err(e) => {
                error!("Could not acquire next image: {e:?}");
                Err(e.into())
            }
        }
    }

    fn submit(
        &mut self,
        commands: Arc<PrimaryAutoCommandBuffer>,
        wait: &mut GpuSignal,
        signal: &mut GpuSignal,
        _fence: &mut GpuFence,
    ) -> Result<(), MvError> {
        let before = wait
            .0
            .take()
            .unwrap_or_else(|| sync::now(self.device().clone()).boxed());
        let after =
            before.then_execute(self.graphics_queue().clone(), commands)?;
        signal.0 = Some(after.boxed());
        Ok(())
    }

    fn present(
        &mut self,
        swapchain: &VkSwapchain,
        image_index: u32,
        wait: &mut GpuSignal,
        fence: &mut GpuFence,
    ) -> Result<Presented, MvError> {
        trace!("present image_index={}", image_index);
        let before = wait
            .0
            .take()
            .unwrap_or_else(|| sync::now(self.device().clone()).boxed());
        let after = before
            .then_swapchain_present(
                self.graphics_queue().clone(),
                SwapchainPresentInfo::swapchain_image_index(
                    swapchain.swapchain.clone(),
                    image_index,
                ),
            )
            .boxed()
            .then_signal_fence_and_flush();

        match after {
            Ok(future) => {
                fence.0 = Some(future);
                Ok(Presented::Done)
            }
            Err(Validated::Error(VulkanError::OutOfDate)) => {
                // Nothing will signal the fence. The rebuild that follows
                // waits for the queue to go idle instead.
                fence.0 = None;
                Ok(Presented::OutOfDate)
            }
            Err(Validated::Error(e)) => {
                error!("Couldn't flush future: {e:?}");
                Err(MvError::FutureFlush(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create_buffer(&mut self, size: usize) -> Result<ResourceKey, MvError> {
        let buffer = self
            .memory
            .streaming_buffer(BufferUsage::UNIFORM_BUFFER, size)?;
        Ok(self
            .resources
            .insert(GpuResource::Buffer(buffer), Lifetime::Persistent))
    }

    fn write_buffer(
        &mut self,
        buffer: ResourceKey,
        bytes: &[u8],
    ) -> Result<(), MvError> {
        let buffer = self.buffer(buffer)?;
        let expected = usize::try_from(buffer.len()).unwrap_or(usize::MAX);
        if expected != bytes.len() {
            return Err(MvError::BufferSizeMismatch {
                expected,
                found: bytes.len(),
            });
        }
        buffer.write()?.copy_from_slice(bytes);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: ResourceKey) -> Result<(), MvError> {
        // Image views belong to a swapchain generation
        self.buffer(buffer)?;
        self.resources.release(buffer)?;
        Ok(())
    }
}
