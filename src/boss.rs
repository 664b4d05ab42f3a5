use crate::{
    anim::{SkeletalAnimator, Skeleton},
    backend::Backend,
    camera::OrbitCamera,
    clock::Clock,
    config::ViewerConfig,
    controls::{Command, DisplayFlags, PlaybackControls},
    frame_control::{FrameControl, FrameStatus},
    indicator::TitleIndicator,
    input::InputState,
    keyboard::Keyboard,
    matrix_table::SlotId,
    mv_error::MvError,
    pipeline::SkeletonPipeline,
    shapes::{self, MeshBatch},
    types::{CameraTrait, KeyboardHandler},
    uniform::{SceneUniform, UniformStreamer},
    vk_backend::VulkanoBackend,
    vk_window::VkWindow,
};
use log::{error, info, trace};
use nalgebra_glm as glm;
use std::time::Duration;
use winit::{
    event::{Event, KeyboardInput, StartCause, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
};

/// Floor side length in world units
const FLOOR_HALF_SIZE: f32 = 20.0;
const FLOOR_DIVISIONS: u32 = 20;
const AXES_LENGTH: f32 = 5.0;

/// Owns every part of the viewer and runs one frame per pass of the event
/// loop
pub struct Boss {
    backend: VulkanoBackend,
    frame_control: FrameControl<VulkanoBackend>,
    uniforms: UniformStreamer,
    pipeline: SkeletonPipeline,
    animator: SkeletalAnimator,
    camera: OrbitCamera,
    input: InputState,
    keyboard: Keyboard,
    controls: PlaybackControls,
    clock: Clock,
    indicator: TitleIndicator,
    global_transform: glm::Mat4,
    background: [f32; 4],
}

impl Boss {
    /// Opens the window and builds every GPU object the viewer needs
    ///
    /// # Errors
    /// May return `MvError`
    pub fn new(
        event_loop: &EventLoop<()>,
        config: &ViewerConfig,
        animator: SkeletalAnimator,
    ) -> Result<Self, MvError> {
        let window = VkWindow::new(
            &config.window,
            event_loop,
            config.validation_layers,
        )?;
        let mut backend = VulkanoBackend::new(window, config)?;
        let frame_control =
            FrameControl::new(&mut backend, config.frames_in_flight)?;
        let slot_count = frame_control.frames_in_flight();
        let uniforms = UniformStreamer::new(&mut backend, slot_count)?;

        let batch = scene_batch(animator.skeleton())?;
        let pipeline = SkeletonPipeline::new(&backend, &batch, &uniforms)?;

        let mut camera = OrbitCamera::new(config.camera);
        camera.set_aspect_ratio(backend.surface_extent()?);
        let joint_count = animator.skeleton().len();
        let indicator = TitleIndicator::new(&config.window.title, joint_count);

        Ok(Self {
            backend,
            frame_control,
            uniforms,
            pipeline,
            animator,
            camera,
            input: InputState::new(),
            keyboard: Keyboard::new(),
            controls: PlaybackControls::new(
                DisplayFlags {
                    floor: config.show_floor,
                    axes: config.show_axes,
                },
                config.interpolation,
            ),
            clock: Clock::new(config.target_fps),
            indicator,
            global_transform: config.global_transform(),
            background: config.background,
        })
    }

    /// Runs the event loop until the window closes, then shuts down. Exits
    /// the process with code 1 if a frame fails.
    pub fn run(self, event_loop: EventLoop<()>) -> ! {
        let mut boss = Some(self);
        event_loop.run(move |event, _, control_flow| {
            if matches!(event, Event::LoopDestroyed) {
                if let Some(boss) = boss.take() {
                    if let Err(e) = boss.shutdown() {
                        error!("Shutdown failed: {e}");
                    }
                }
            } else if let Some(boss) = &mut boss {
                boss.handle_event(&event, control_flow);
            }
        })
    }

    /// Handles events for the event loop
    pub fn handle_event(
        &mut self,
        event: &Event<()>,
        control_flow: &mut ControlFlow,
    ) {
        match event {
            Event::NewEvents(StartCause::Init) => {
                control_flow.set_poll();
            }

            Event::WindowEvent { event, .. } => {
                self.input.handle_window_event(event);
                match event {
                    WindowEvent::Resized(size) => {
                        trace!("Resized to {:?}", size);
                        self.frame_control.request_rebuild();
                    }

                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode: Some(keycode),
                                state,
                                ..
                            },
                        ..
                    } => self.keyboard.input(*keycode, *state),

                    WindowEvent::Focused(false) => self.keyboard.clear(),

                    WindowEvent::CloseRequested => {
                        info!("CloseRequested event");
                        control_flow.set_exit();
                    }

                    _ => {}
                }
            }

            Event::MainEventsCleared => match self.frame() {
                Ok(Command::Continue) => {}
                Ok(Command::Quit) => control_flow.set_exit(),
                Err(e) => {
                    error!("Frame failed: {e}");
                    control_flow.set_exit_with_code(1);
                }
            },

            _ => (),
        }
    }

    /// Advances playback and the camera, then draws and presents
    ///
    /// # Errors
    /// Any failure other than an out-of-date swapchain
    pub fn frame(&mut self) -> Result<Command, MvError> {
        let tick = self.clock.tick();
        let extent = self.backend.surface_extent()?;

        let command = self.controls.update(
            &self.keyboard,
            &self.input,
            extent[0],
            tick.delta,
            self.animator.cursor_mut(),
        );
        if command == Command::Quit {
            return Ok(command);
        }
        self.animator.set_interpolation(self.controls.interpolation());
        self.animator.advance(tick.delta);
        self.camera.set_aspect_ratio(extent);
        self.camera.update(&self.input);

        let mut table = self.animator.evaluate()?;
        table.transform_joints(
            self.animator.skeleton().len(),
            &self.global_transform,
        );
        let flags = self.controls.flags();
        if !flags.floor {
            table.set(SlotId::Floor, glm::Mat4::zeros())?;
        }
        if !flags.axes {
            table.set(SlotId::DebugAxes, glm::Mat4::zeros())?;
        }
        let scene = SceneUniform::new(
            &self.camera.view_matrix(),
            &self.camera.proj_matrix(),
        );

        let uniforms = &self.uniforms;
        let pipeline = &self.pipeline;
        let background = self.background;
        let status = self.frame_control.draw_frame(
            &mut self.backend,
            |backend, swapchain, target| {
                uniforms.update_uniform_buffer(
                    backend,
                    target.slot,
                    &table,
                    &scene,
                )?;
                pipeline.record(backend, swapchain, target, background)
            },
        )?;
        if matches!(status, FrameStatus::Presented(_)) {
            self.indicator.frame_presented();
        }
        if let Some(title) = self.indicator.update(
            Duration::from_secs_f64(tick.delta),
            self.animator.cursor(),
        ) {
            self.backend.set_title(&title);
        }

        self.keyboard.tick();
        self.input.end_frame();
        self.clock.vsync();
        Ok(Command::Continue)
    }

    /// Waits for the GPU and releases every GPU object
    ///
    /// # Errors
    /// May return `MvError`
    pub fn shutdown(mut self) -> Result<(), MvError> {
        self.frame_control.shutdown(&mut self.backend)?;
        self.uniforms.destroy(&mut self.backend)?;
        info!(
            "Shut down after {:.1}s, {} resources left",
            self.clock.elapsed().as_secs_f64(),
            self.backend.resources().len()
        );
        Ok(())
    }
}

/// Joint spheres scaled to the skeleton, a fraction of the mean bone length
fn joint_radius(skeleton: &Skeleton) -> f32 {
    let lengths: Vec<f32> = skeleton
        .joints()
        .iter()
        .map(|j| glm::length(&j.offset))
        .filter(|l| *l > f32::EPSILON)
        .collect();
    if lengths.is_empty() {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = lengths.iter().sum::<f32>() / lengths.len() as f32;
    mean * 0.12
}

/// Everything drawn, each part in its own group
fn scene_batch(skeleton: &Skeleton) -> Result<MeshBatch, MvError> {
    let mut batch = MeshBatch::new();
    batch.push(&shapes::floor(FLOOR_HALF_SIZE, FLOOR_DIVISIONS)?);
    batch.push(&shapes::direction_axes(AXES_LENGTH)?);
    let radius = joint_radius(skeleton);
    batch.push_all(&shapes::skeleton_meshes(skeleton, radius)?);
    Ok(batch)
}
