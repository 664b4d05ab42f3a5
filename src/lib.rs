//! Vulkan viewer for BVH motion capture recordings
//!
//! The frame engine in `frame_control` and the uniform streamer in `uniform`
//! only talk to the GPU through the `backend::Backend` trait.
//! `vk_backend::VulkanoBackend` implements it on vulkano; the skeletal
//! evaluator in `anim` has no GPU dependency at all.
pub mod anim;
pub mod backend;
pub mod boss;
pub mod camera;
pub mod clock;
pub mod config;
pub mod controls;
pub mod frame_control;
pub mod indicator;
pub mod input;
pub mod keyboard;
pub mod matrix_table;
pub mod memory;
pub mod mv_error;
pub mod pipeline;
pub mod resource_table;
pub mod shapes;
pub mod types;
pub mod uniform;
pub mod util;
pub mod validation;
pub mod vertex;
pub mod vk_backend;
pub mod vk_window;
