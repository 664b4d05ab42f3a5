use crate::{
    config::WindowProperties, mv_error::MvError, validation::LogMessenger,
};
use log::{info, warn};
use std::sync::Arc;
use vulkano::{
    device::{
        physical::{PhysicalDevice, PhysicalDeviceType},
        Device, DeviceCreateInfo, DeviceExtensions, Features, Queue,
        QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateInfo},
    swapchain::{Surface, SurfaceCapabilities, SurfaceInfo},
    Validated, VulkanError, VulkanLibrary,
};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// The window, its surface and the Vulkan objects needed to draw into it
pub struct VkWindow {
    window: Arc<Window>,
    surface: Arc<Surface>,
    physical: Arc<PhysicalDevice>,
    device: Arc<Device>,
    graphics_queue: Arc<Queue>,
    _messenger: Option<LogMessenger>,
    instance: Arc<Instance>,
}

impl VkWindow {
    /// Opens the window and picks a Vulkan 1.3 device that can present to
    /// it, preferring discrete GPUs
    ///
    /// # Errors
    /// Returns `MvError::ValidationLayerMissing` if validation was requested
    /// but the layer isn't installed, `MvError::DeviceNotFound` if no device
    /// fits, or any error from Vulkan or winit
    pub fn new(
        properties: &WindowProperties,
        event_loop: &EventLoop<()>,
        validation: bool,
    ) -> Result<Self, MvError> {
        let library = VulkanLibrary::new()?;
        let enabled_layers = if validation {
            let found = library
                .layer_properties()?
                .any(|l| l.name() == VALIDATION_LAYER);
            if !found {
                return Err(MvError::ValidationLayerMissing);
            }
            vec![VALIDATION_LAYER.to_string()]
        } else {
            Vec::new()
        };
        let mut enabled_extensions = Surface::required_extensions(event_loop);
        enabled_extensions.ext_debug_utils = validation;
        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                enabled_layers,
                enabled_extensions,
                ..Default::default()
            },
        )?;
        let messenger = if validation {
            LogMessenger::new(instance.clone())
                .map_err(|e| warn!("No validation messenger: {e:?}"))
                .ok()
        } else {
            None
        };

        let window = Arc::new(
            WindowBuilder::new()
                .with_title(properties.title.clone())
                .with_inner_size(LogicalSize::new(
                    f64::from(properties.dimensions[0]),
                    f64::from(properties.dimensions[1]),
                ))
                .build(event_loop)?,
        );
        let surface = Surface::from_window(instance.clone(), window.clone())?;

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };
        let (physical, queue_family_index) =
            pick_device(&instance, &surface, &device_extensions)?;
        info!(
            "Using device {} ({:?})",
            physical.properties().device_name,
            physical.properties().device_type
        );
        let (device, mut queues) = Device::new(
            physical.clone(),
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                enabled_features: Features {
                    dynamic_rendering: true,
                    synchronization2: true,
                    ..Features::empty()
                },
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )?;
        info!("Using Vulkan version {}", device.api_version());
        let graphics_queue = queues.next().ok_or(MvError::QueueNotFound)?;

        Ok(Self {
            window,
            surface,
            physical,
            device,
            graphics_queue,
            _messenger: messenger,
            instance,
        })
    }

    #[must_use]
    pub const fn window(&self) -> &Arc<Window> {
        &self.window
    }

    #[must_use]
    pub const fn physical(&self) -> &Arc<PhysicalDevice> {
        &self.physical
    }

    #[must_use]
    pub const fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[must_use]
    pub const fn graphics_queue(&self) -> &Arc<Queue> {
        &self.graphics_queue
    }

    #[must_use]
    pub const fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    #[must_use]
    pub const fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    /// # Errors
    /// May return `Validated<VulkanError>`
    pub fn surface_caps(
        &self,
    ) -> Result<SurfaceCapabilities, Validated<VulkanError>> {
        self.physical
            .surface_capabilities(&self.surface, SurfaceInfo::default())
    }

    #[must_use]
    pub fn dimensions(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }
}

fn pick_device(
    instance: &Arc<Instance>,
    surface: &Surface,
    extensions: &DeviceExtensions,
) -> Result<(Arc<PhysicalDevice>, u32), MvError> {
    instance
        .enumerate_physical_devices()?
        .filter(|p| p.api_version() >= vulkano::Version::V1_3)
        .filter(|p| p.supported_extensions().contains(extensions))
        .filter_map(|p| {
            p.queue_family_properties()
                .iter()
                .enumerate()
                .position(|(i, q)| {
                    q.queue_flags.intersects(QueueFlags::GRAPHICS)
                        && u32::try_from(i).is_ok_and(|i| {
                            p.surface_support(i, surface).unwrap_or(false)
                        })
                })
                .and_then(|i| u32::try_from(i).ok())
                .map(|i| (p, i))
        })
        .min_by_key(|(p, _)| match p.properties().device_type {
            PhysicalDeviceType::DiscreteGpu => 0,
            PhysicalDeviceType::IntegratedGpu => 1,
            PhysicalDeviceType::VirtualGpu => 2,
            PhysicalDeviceType::Cpu => 3,
            _ => 4,
        })
        .ok_or(MvError::DeviceNotFound)
}
