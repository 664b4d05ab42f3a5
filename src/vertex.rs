use bytemuck::{Pod, Zeroable};
use vulkano::pipeline::graphics::vertex_input::Vertex;

/// Vertex of every shape the viewer draws. `group` selects the model matrix
/// the vertex follows.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod, Vertex)]
pub struct BasicVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub colour: [f32; 3],
    #[format(R32_UINT)]
    pub group: u32,
}
