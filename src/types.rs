use nalgebra_glm as glm;
use vulkano::{format::Format, image::SampleCount};
use winit::event::{ElementState, VirtualKeyCode};

/// Formats every pipeline and attachment of the main pass agrees on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderFormat {
    pub colour_format: Format,
    pub depth_format: Format,
    pub sample_count: SampleCount,
}

/// Trait for something that handles keyboard input events
pub trait KeyboardHandler {
    fn input(&mut self, keycode: VirtualKeyCode, state: ElementState);
}

/// Trait for camera matrices, needed for rendering
pub trait CameraTrait {
    fn view_matrix(&self) -> glm::Mat4;
    fn proj_matrix(&self) -> glm::Mat4;
}
