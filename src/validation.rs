//! Routes Vulkan validation layer messages into the `log` facade under the
//! `vulkan` target.
//!
//! The messenger is created through the raw `ash` entry points instead of
//! vulkano's `DebugUtilsMessenger` because the vulkano 0.34 trampoline reads
//! callback data fields that drivers may leave null. Only the message id
//! name and the message text are read here.
use log::Level;
use std::{
    ffi::{c_void, CStr},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use vulkano::{
    instance::{
        debug::{DebugUtilsMessageSeverity, DebugUtilsMessageType},
        Instance,
    },
    VulkanError, VulkanObject,
};

/// Debug utils messenger that lives as long as this value
#[must_use]
pub struct LogMessenger {
    handle: ash::vk::DebugUtilsMessengerEXT,
    instance: Arc<Instance>,
}

impl LogMessenger {
    /// The instance must have been created with `ext_debug_utils` enabled
    ///
    /// # Errors
    /// Returns a `VulkanError` if creation fails
    pub fn new(instance: Arc<Instance>) -> Result<Self, VulkanError> {
        let severity = DebugUtilsMessageSeverity::ERROR
            | DebugUtilsMessageSeverity::WARNING
            | DebugUtilsMessageSeverity::INFO
            | DebugUtilsMessageSeverity::VERBOSE;
        let types = DebugUtilsMessageType::GENERAL
            | DebugUtilsMessageType::VALIDATION
            | DebugUtilsMessageType::PERFORMANCE;
        let create_info = ash::vk::DebugUtilsMessengerCreateInfoEXT {
            message_severity: severity.into(),
            message_type: types.into(),
            pfn_user_callback: Some(log_callback),
            ..Default::default()
        };

        let mut handle = ash::vk::DebugUtilsMessengerEXT::null();
        // SAFETY: the create info is fully initialized and `handle` is a
        // valid output location
        unsafe {
            (instance.fns().ext_debug_utils.create_debug_utils_messenger_ext)(
                instance.handle(),
                &create_info,
                std::ptr::null(),
                &mut handle,
            )
            .result()
            .map_err(VulkanError::from)?;
        }
        Ok(Self { handle, instance })
    }
}

impl Drop for LogMessenger {
    fn drop(&mut self) {
        // SAFETY: the handle was created from this instance and is destroyed
        // exactly once
        unsafe {
            (self
                .instance
                .fns()
                .ext_debug_utils
                .destroy_debug_utils_messenger_ext)(
                self.instance.handle(),
                self.handle,
                std::ptr::null(),
            );
        }
    }
}

fn level(severity: DebugUtilsMessageSeverity) -> Level {
    if severity.intersects(DebugUtilsMessageSeverity::ERROR) {
        Level::Error
    } else if severity.intersects(DebugUtilsMessageSeverity::WARNING) {
        Level::Warn
    } else if severity.intersects(DebugUtilsMessageSeverity::INFO) {
        Level::Info
    } else {
        Level::Debug
    }
}

fn type_name(ty: DebugUtilsMessageType) -> &'static str {
    if ty.intersects(DebugUtilsMessageType::VALIDATION) {
        "validation"
    } else if ty.intersects(DebugUtilsMessageType::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

/// Null pointers become placeholders instead of being dereferenced
unsafe fn c_str<'a>(
    ptr: *const std::ffi::c_char,
    fallback: &'a str,
) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or(fallback)
    }
}

unsafe extern "system" fn log_callback(
    severity: ash::vk::DebugUtilsMessageSeverityFlagsEXT,
    types: ash::vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const ash::vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> ash::vk::Bool32 {
    // Unwinding across the FFI boundary is undefined
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let Some(data) = data.as_ref() else {
            return;
        };
        let name = c_str(data.p_message_id_name, "unknown");
        let message = c_str(data.p_message, "(no message)");
        log::log!(
            target: "vulkan",
            level(severity.into()),
            "{} {}: {}",
            name,
            type_name(types.into()),
            message
        );
    }));
    ash::vk::FALSE
}
