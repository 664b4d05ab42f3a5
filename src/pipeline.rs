use crate::{
    frame_control::FrameTarget,
    mv_error::MvError,
    shapes::MeshBatch,
    uniform::UniformStreamer,
    util,
    vertex::BasicVertex,
    vk_backend::{VkSwapchain, VulkanoBackend},
};
use log::info;
use std::sync::Arc;
use vulkano::{
    buffer::{BufferUsage, Subbuffer},
    command_buffer::{
        PrimaryAutoCommandBuffer, RenderingAttachmentInfo, RenderingInfo,
    },
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    pipeline::{
        graphics::{
            color_blend::{ColorBlendAttachmentState, ColorBlendState},
            depth_stencil::{DepthState, DepthStencilState},
            input_assembly::InputAssemblyState,
            multisample::MultisampleState,
            rasterization::RasterizationState,
            subpass::PipelineRenderingCreateInfo,
            vertex_input::{Vertex, VertexDefinition},
            viewport::{Viewport, ViewportState},
            GraphicsPipelineCreateInfo,
        },
        layout::PipelineDescriptorSetLayoutCreateInfo,
        DynamicState, GraphicsPipeline, Pipeline, PipelineBindPoint,
        PipelineLayout, PipelineShaderStageCreateInfo,
    },
    render_pass::{AttachmentLoadOp, AttachmentStoreOp},
};

/// Draws the whole scene, skeleton, floor and axes, in one indexed draw.
/// Geometry is uploaded once; only the uniforms change per frame.
pub struct SkeletonPipeline {
    pipeline: Arc<GraphicsPipeline>,
    vertex_buffer: Subbuffer<[BasicVertex]>,
    index_buffer: Subbuffer<[u32]>,
    index_count: u32,
    /// One per uniform slot
    descriptor_sets: Vec<Arc<PersistentDescriptorSet>>,
}

impl SkeletonPipeline {
    /// # Errors
    /// May return `MvError`
    pub fn new(
        backend: &VulkanoBackend,
        batch: &MeshBatch,
        uniforms: &UniformStreamer,
    ) -> Result<Self, MvError> {
        let device = backend.device();
        let format = backend.render_format();

        let pipeline = {
            let vs = vs::load(device.clone())?
                .entry_point("main")
                .ok_or(MvError::VertexShaderError)?;
            let fs = fs::load(device.clone())?
                .entry_point("main")
                .ok_or(MvError::FragmentShaderError)?;

            let vertex_input_state = BasicVertex::per_vertex()
                .definition(&vs.info().input_interface)?;

            let stages = [
                PipelineShaderStageCreateInfo::new(vs),
                PipelineShaderStageCreateInfo::new(fs),
            ];

            let layout = PipelineLayout::new(
                device.clone(),
                PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
                    .into_pipeline_layout_create_info(device.clone())?,
            )?;

            let subpass = PipelineRenderingCreateInfo {
                color_attachment_formats: vec![Some(format.colour_format)],
                depth_attachment_format: Some(format.depth_format),
                ..PipelineRenderingCreateInfo::default()
            };

            GraphicsPipeline::new(
                device.clone(),
                None,
                GraphicsPipelineCreateInfo {
                    stages: stages.into_iter().collect(),
                    vertex_input_state: Some(vertex_input_state),
                    input_assembly_state: Some(InputAssemblyState::default()),
                    viewport_state: Some(ViewportState::default()),
                    rasterization_state: Some(RasterizationState::default()),
                    multisample_state: Some(MultisampleState {
                        rasterization_samples: format.sample_count,
                        ..MultisampleState::default()
                    }),
                    depth_stencil_state: Some(DepthStencilState {
                        depth: Some(DepthState::simple()),
                        ..DepthStencilState::default()
                    }),
                    color_blend_state: Some(
                        ColorBlendState::with_attachment_states(
                            1,
                            ColorBlendAttachmentState::default(),
                        ),
                    ),
                    dynamic_state: std::iter::once(DynamicState::Viewport)
                        .collect(),
                    subpass: Some(subpass.into()),
                    ..GraphicsPipelineCreateInfo::layout(layout)
                },
            )?
        };

        let memory = backend.memory();
        let vertex_buffer = memory.static_buffer(
            BufferUsage::VERTEX_BUFFER,
            batch.vertices().iter().copied(),
        )?;
        let index_buffer = memory.static_buffer(
            BufferUsage::INDEX_BUFFER,
            batch.indices().iter().copied(),
        )?;
        let index_count = batch.index_count()?;

        let set_layout = pipeline
            .layout()
            .set_layouts()
            .first()
            .ok_or(MvError::PipelineError)?;
        let mut descriptor_sets = Vec::with_capacity(uniforms.slots().len());
        for slot in uniforms.slots() {
            descriptor_sets.push(PersistentDescriptorSet::new(
                &memory.set_allocator,
                set_layout.clone(),
                [
                    WriteDescriptorSet::buffer(0, backend.buffer(slot.model)?),
                    WriteDescriptorSet::buffer(1, backend.buffer(slot.scene)?),
                ],
                [],
            )?);
        }
        info!(
            "Skeleton pipeline with {} vertices and {} indices",
            batch.vertices().len(),
            index_count
        );

        Ok(Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count,
            descriptor_sets,
        })
    }

    /// Records the main pass into the image `target` was acquired for,
    /// reading the uniforms of `target.slot`
    ///
    /// # Errors
    /// May return `MvError`
    #[allow(clippy::cast_precision_loss)]
    pub fn record(
        &self,
        backend: &VulkanoBackend,
        swapchain: &VkSwapchain,
        target: FrameTarget,
        background: [f32; 4],
    ) -> Result<Arc<PrimaryAutoCommandBuffer>, MvError> {
        let descriptor_set = self
            .descriptor_sets
            .get(target.slot)
            .ok_or(MvError::SlotOutOfRange {
                slot: target.slot,
                count: self.descriptor_sets.len(),
            })?
            .clone();
        let colour =
            backend.image_view(swapchain.image_view(target.image_index)?)?;
        let msaa = swapchain
            .msaa()
            .map(|key| backend.image_view(key))
            .transpose()?;
        let depth = backend.image_view(swapchain.depth())?;
        let extent = swapchain.extent();
        let viewport = Viewport {
            offset: [0.0, 0.0],
            extent: [extent[0] as f32, extent[1] as f32],
            depth_range: 0.0..=1.0,
        };

        let mut cbb = backend.create_primary_cbb()?;
        cbb.begin_rendering(RenderingInfo {
            color_attachments: vec![Some(util::attachment_info(
                background, colour, msaa,
            ))],
            depth_attachment: Some(RenderingAttachmentInfo {
                load_op: AttachmentLoadOp::Clear,
                store_op: AttachmentStoreOp::DontCare,
                clear_value: Some(1.0f32.into()),
                ..RenderingAttachmentInfo::image_view(depth)
            }),
            ..Default::default()
        })?
        .set_viewport(0, std::iter::once(viewport).collect())?
        .bind_pipeline_graphics(self.pipeline.clone())?
        .bind_descriptor_sets(
            PipelineBindPoint::Graphics,
            self.pipeline.layout().clone(),
            0, // first_set
            descriptor_set,
        )?
        .bind_vertex_buffers(0, self.vertex_buffer.clone())?
        .bind_index_buffer(self.index_buffer.clone())?
        .draw_indexed(
            self.index_count,
            1, // instance_count
            0, // first_index
            0, // vertex_offset
            0, // first_instance
        )?
        .end_rendering()?;
        Ok(cbb.build()?)
    }
}

mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "shaders/skeleton.vert",
    }
}

mod fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "shaders/skeleton.frag",
    }
}
