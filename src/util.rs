//! Helpers for the Vulkan objects that are rebuilt with the swapchain
use crate::{mv_error::MvError, vk_window::VkWindow};
use log::{debug, info};
use std::sync::Arc;
use vulkano::{
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder,
        CommandBufferUsage, PrimaryAutoCommandBuffer, RenderingAttachmentInfo,
        RenderingAttachmentResolveInfo,
    },
    device::{physical::PhysicalDevice, Queue},
    format::{Format, FormatFeatures},
    image::{view::ImageView, Image, ImageCreateInfo, ImageUsage, SampleCount},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator},
    render_pass::{AttachmentLoadOp, AttachmentStoreOp},
    swapchain::{
        ColorSpace, PresentMode, Surface, SurfaceInfo, Swapchain,
        SwapchainCreateInfo,
    },
};

/// Preferred formats for the depth attachment, best first
pub const DEPTH_FORMATS: [Format; 3] = [
    Format::D32_SFLOAT,
    Format::D32_SFLOAT_S8_UINT,
    Format::D24_UNORM_S8_UINT,
];

/// Preferred formats for the presented images, best first
pub const SWAPCHAIN_FORMATS: [Format; 2] =
    [Format::B8G8R8A8_SRGB, Format::R8G8B8A8_SRGB];

fn attachment_image(
    allocator: Arc<dyn MemoryAllocator>,
    extent: [u32; 2],
    format: Format,
    samples: SampleCount,
    usage: ImageUsage,
) -> Result<Arc<ImageView>, MvError> {
    let image = Image::new(
        allocator,
        ImageCreateInfo {
            format,
            extent: [extent[0], extent[1], 1],
            samples,
            usage: usage | ImageUsage::TRANSIENT_ATTACHMENT,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )?;
    Ok(ImageView::new_default(image)?)
}

/// Creates a depth buffer
///
/// # Errors
/// May return `MvError`
pub fn create_depth(
    allocator: Arc<dyn MemoryAllocator>,
    extent: [u32; 2],
    format: Format,
    samples: SampleCount,
) -> Result<Arc<ImageView>, MvError> {
    attachment_image(
        allocator,
        extent,
        format,
        samples,
        ImageUsage::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// Creates a multisampled colour target that resolves into a swapchain image
///
/// # Errors
/// May return `MvError`
pub fn create_msaa(
    allocator: Arc<dyn MemoryAllocator>,
    extent: [u32; 2],
    format: Format,
    samples: SampleCount,
) -> Result<Arc<ImageView>, MvError> {
    attachment_image(
        allocator,
        extent,
        format,
        samples,
        ImageUsage::COLOR_ATTACHMENT,
    )
}

/// Selects first supported format for depth attachment from an array of
/// candidates
///
/// # Errors
/// Returns `MvError::UnsupportedDepthFormat` if none fit
pub fn find_depth_format(
    physical: &PhysicalDevice,
    candidates: &[Format],
) -> Result<Format, MvError> {
    for candidate in candidates {
        if physical
            .format_properties(*candidate)?
            .optimal_tiling_features
            .intersects(FormatFeatures::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(*candidate);
        }
    }
    Err(MvError::UnsupportedDepthFormat)
}

/// Selects first format from `candidates` the surface can present in sRGB
///
/// # Errors
/// Returns `MvError::UnsupportedSwapchainFormat` if none fit
pub fn find_swapchain_format(
    physical: &PhysicalDevice,
    surface: &Surface,
    candidates: &[Format],
) -> Result<Format, MvError> {
    let supported =
        physical.surface_formats(surface, SurfaceInfo::default())?;
    candidates
        .iter()
        .copied()
        .find(|c| {
            supported
                .iter()
                .any(|f| f.0 == *c && f.1 == ColorSpace::SrgbNonLinear)
        })
        .ok_or(MvError::UnsupportedSwapchainFormat)
}

/// Highest sample count up to `requested` that both colour and depth
/// attachments support
#[must_use]
pub fn supported_sample_count(
    physical: &PhysicalDevice,
    requested: SampleCount,
) -> SampleCount {
    let limits = physical.properties();
    let counts = limits.framebuffer_color_sample_counts
        & limits.framebuffer_depth_sample_counts;
    let chosen = [
        SampleCount::Sample64,
        SampleCount::Sample32,
        SampleCount::Sample16,
        SampleCount::Sample8,
        SampleCount::Sample4,
        SampleCount::Sample2,
    ]
    .into_iter()
    .filter(|c| (*c as u32) <= (requested as u32))
    .find(|c| counts.contains_enum(*c))
    .unwrap_or(SampleCount::Sample1);
    if chosen != requested {
        info!("MSAA reduced from {:?} to {:?}", requested, chosen);
    }
    chosen
}

/// # Errors
/// May return `MvError`
pub fn create_primary_cbb(
    cmd_allocator: &StandardCommandBufferAllocator,
    queue: &Queue,
) -> Result<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>, MvError> {
    Ok(AutoCommandBufferBuilder::primary(
        cmd_allocator,
        queue.queue_family_index(),
        CommandBufferUsage::OneTimeSubmit,
    )?)
}

/// Fifo is always available. Immediate is the only mode without vsync and
/// Vulkan doesn't require it.
#[must_use]
pub fn choose_present_mode(window: &VkWindow, vsync: bool) -> PresentMode {
    if vsync {
        return PresentMode::Fifo;
    }
    window
        .physical()
        .surface_present_modes(window.surface(), SurfaceInfo::default())
        .map_or(PresentMode::Fifo, |mut modes| {
            modes
                .find(|&m| m == PresentMode::Immediate)
                .unwrap_or(PresentMode::Fifo)
        })
}

/// Swapchain with one more image than the surface minimum
///
/// # Errors
/// May return `MvError`
pub fn create_swapchain(
    window: &VkWindow,
    extent: [u32; 2],
    format: Format,
    present_mode: PresentMode,
) -> Result<(Arc<Swapchain>, Vec<Arc<Image>>), MvError> {
    let caps = window.surface_caps()?;
    let image_count = caps.max_image_count.map_or(
        caps.min_image_count + 1,
        |max| (caps.min_image_count + 1).min(max),
    );
    let composite_alpha = caps
        .supported_composite_alpha
        .into_iter()
        .next()
        .ok_or(MvError::NoCompositeAlpha)?;
    debug!(
        "Swapchain with {} images {:?} {:?}",
        image_count, format, present_mode
    );
    Ok(Swapchain::new(
        window.device().clone(),
        window.surface().clone(),
        SwapchainCreateInfo {
            min_image_count: image_count,
            image_format: format,
            image_extent: extent,
            image_color_space: ColorSpace::SrgbNonLinear,
            image_usage: ImageUsage::COLOR_ATTACHMENT,
            composite_alpha,
            present_mode,
            ..Default::default()
        },
    )?)
}

/// Colour attachment that clears to `background`. With MSAA the samples are
/// discarded after resolving into `target_image_view`.
#[must_use]
pub fn attachment_info(
    background: [f32; 4],
    target_image_view: Arc<ImageView>,
    msaa_option: Option<Arc<ImageView>>,
) -> RenderingAttachmentInfo {
    let clear_value = Some(background.into());
    if let Some(msaa_image_view) = msaa_option {
        RenderingAttachmentInfo {
            load_op: AttachmentLoadOp::Clear,
            store_op: AttachmentStoreOp::DontCare,
            clear_value,
            resolve_info: Some(RenderingAttachmentResolveInfo::image_view(
                target_image_view,
            )),
            ..RenderingAttachmentInfo::image_view(msaa_image_view)
        }
    } else {
        RenderingAttachmentInfo {
            load_op: AttachmentLoadOp::Clear,
            store_op: AttachmentStoreOp::Store,
            clear_value,
            ..RenderingAttachmentInfo::image_view(target_image_view)
        }
    }
}

/// # Errors
/// May return `MvError`
pub fn create_image_views(
    images: &[Arc<Image>],
) -> Result<Vec<Arc<ImageView>>, MvError> {
    images
        .iter()
        .map(|image| Ok(ImageView::new_default(image.clone())?))
        .collect()
}
