use crate::anim::AnimError;
use std::{error, fmt};
use vulkano::{
    buffer::AllocateBufferError, command_buffer::CommandBufferExecError,
    image::AllocateImageError, library::LoadingError,
    pipeline::layout::IntoPipelineLayoutCreateInfoError, sync::HostAccessError,
    Validated, ValidationError, VulkanError,
};
use winit::error::OsError;

/// Unified error type
///
/// Many vulkano functions return `Validated<E>` which holds either some
/// vulkano error type or a boxed `ValidationError`. Both halves convert into
/// `MvError` so they can be propagated with `?` instead of panicking. The
/// same goes for the lower level functions that return a boxed
/// `ValidationError` directly.
///
/// Some vulkano error types are very large so are boxed.
#[derive(Debug)]
pub enum MvError {
    QueueNotFound,
    DeviceNotFound,
    ValidationLayerMissing,
    NoCompositeAlpha,
    RecreateFailed,
    FutureFlush(VulkanError),
    FenceError,
    SemaphoreNotSignalled,
    StaleHandle,
    WrongResourceKind,
    BufferSizeMismatch { expected: usize, found: usize },
    SlotOutOfRange { slot: usize, count: usize },
    NoSwapchain,
    UnsupportedDepthFormat,
    UnsupportedSwapchainFormat,
    UnsupportedSampleCount(u32),
    VertexShaderError,
    FragmentShaderError,
    PipelineError,
    IndexCountTooLarge,
    Anim(AnimError),
    WinitOsError(OsError),
    SerdeYamlError(Box<serde_yaml::Error>),
    StdIoError(std::io::Error),
    VkValidation(Box<ValidationError>),
    VkVulkanError(VulkanError),
    VkLoadingError(Box<LoadingError>),
    VkCommandBufferExecError(Box<CommandBufferExecError>),
    VkAllocateBufferError(AllocateBufferError),
    VkAllocateImageError(AllocateImageError),
    VkHostAccessError(HostAccessError),
    VkIntoPipelineLayoutCreateInfoError(IntoPipelineLayoutCreateInfoError),
}

impl error::Error for MvError {}

impl fmt::Display for MvError {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::QueueNotFound => write!(f, "Vulkan queue not found"),
            Self::DeviceNotFound => {
                write!(f, "no Vulkan 1.3 compatible device found")
            }
            Self::ValidationLayerMissing => {
                write!(f, "Vulkan validation layer requested but not found")
            }
            Self::NoCompositeAlpha => {
                write!(f, "surface supports no composite alpha mode")
            }
            Self::RecreateFailed => write!(f, "swapchain recreation failed"),
            Self::FutureFlush(e) => write!(f, "could not flush future: {e}"),
            Self::FenceError => {
                write!(f, "waited on a fence that nothing will signal")
            }
            Self::SemaphoreNotSignalled => {
                write!(f, "waited on a semaphore that nothing will signal")
            }
            Self::StaleHandle => {
                write!(f, "resource handle was already released")
            }
            Self::WrongResourceKind => {
                write!(f, "resource handle names a different kind of object")
            }
            Self::BufferSizeMismatch { expected, found } => write!(
                f,
                "buffer write of {found} bytes into a {expected} byte buffer"
            ),
            Self::SlotOutOfRange { slot, count } => {
                write!(f, "frame slot {slot} out of range for {count} slots")
            }
            Self::NoSwapchain => write!(f, "no swapchain is currently built"),
            Self::UnsupportedDepthFormat => {
                write!(f, "depth format is not supported")
            }
            Self::UnsupportedSwapchainFormat => {
                write!(f, "swapchain format is not supported")
            }
            Self::UnsupportedSampleCount(n) => {
                write!(f, "{n} is not a supported MSAA sample count")
            }
            Self::VertexShaderError => write!(f, "vertex shader error"),
            Self::FragmentShaderError => write!(f, "fragment shader error"),
            Self::PipelineError => {
                write!(f, "pipeline is missing a descriptor set layout")
            }
            Self::IndexCountTooLarge => {
                write!(f, "index count does not fit in 32 bits")
            }
            Self::Anim(e) => write!(f, "animation error: {e}"),
            Self::WinitOsError(e) => write!(f, "OsError {e}"),
            Self::SerdeYamlError(e) => {
                write!(f, "serde_yaml::Error: {e}")
            }
            Self::StdIoError(e) => write!(f, "std::io::Error: {e}"),
            Self::VkValidation(e) => {
                write!(f, "vulkano ValidationError: {e}")
            }
            Self::VkVulkanError(e) => write!(f, "vulkano VulkanError: {e}"),
            Self::VkLoadingError(e) => write!(f, "vulkano LoadingError: {e}"),
            Self::VkCommandBufferExecError(e) => {
                write!(f, "vulkano CommandBufferExecError: {e}")
            }
            Self::VkAllocateBufferError(e) => {
                write!(f, "vulkano AllocateBufferError: {e}")
            }
            Self::VkAllocateImageError(e) => {
                write!(f, "vulkano AllocateImageError: {e}")
            }
            Self::VkHostAccessError(e) => {
                write!(f, "vulkano HostAccessError: {e}")
            }
            Self::VkIntoPipelineLayoutCreateInfoError(e) => {
                write!(f, "vulkano IntoPipelineLayoutCreateInfoError: {e}")
            }
        }
    }
}

impl From<AnimError> for MvError {
    fn from(e: AnimError) -> Self {
        Self::Anim(e)
    }
}

impl From<serde_yaml::Error> for MvError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::SerdeYamlError(Box::new(e))
    }
}

impl From<std::io::Error> for MvError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl From<Box<ValidationError>> for MvError {
    fn from(e: Box<ValidationError>) -> Self {
        Self::VkValidation(e)
    }
}

impl<E> From<Validated<E>> for MvError
where
    E: Into<Self>,
{
    fn from(e: Validated<E>) -> Self {
        match e {
            Validated::Error(e) => e.into(),
            Validated::ValidationError(v) => Self::VkValidation(v),
        }
    }
}

impl From<LoadingError> for MvError {
    fn from(e: LoadingError) -> Self {
        Self::VkLoadingError(Box::new(e))
    }
}

impl From<VulkanError> for MvError {
    fn from(e: VulkanError) -> Self {
        Self::VkVulkanError(e)
    }
}

impl From<CommandBufferExecError> for MvError {
    fn from(e: CommandBufferExecError) -> Self {
        Self::VkCommandBufferExecError(Box::new(e))
    }
}

impl From<AllocateBufferError> for MvError {
    fn from(e: AllocateBufferError) -> Self {
        Self::VkAllocateBufferError(e)
    }
}

impl From<HostAccessError> for MvError {
    fn from(e: HostAccessError) -> Self {
        Self::VkHostAccessError(e)
    }
}

impl From<AllocateImageError> for MvError {
    fn from(e: AllocateImageError) -> Self {
        Self::VkAllocateImageError(e)
    }
}

impl From<IntoPipelineLayoutCreateInfoError> for MvError {
    fn from(e: IntoPipelineLayoutCreateInfoError) -> Self {
        Self::VkIntoPipelineLayoutCreateInfoError(e)
    }
}

impl From<OsError> for MvError {
    fn from(e: OsError) -> Self {
        Self::WinitOsError(e)
    }
}
