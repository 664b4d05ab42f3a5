//! Frame engine behaviour against a scripted backend

mod common;

use common::{init_tests, record, MockBackend, MockResource, Op};
use log::info;
use motion_viewer::{
    backend::{Acquired, Presented},
    frame_control::{FrameControl, FrameStatus},
    matrix_table::{MatrixTable, SlotId},
    mv_error::MvError,
    uniform::{SceneUniform, UniformStreamer},
};
use nalgebra_glm as glm;
use vulkano::VulkanError;

fn presented(status: FrameStatus) -> bool {
    matches!(status, FrameStatus::Presented(_))
}

#[test]
fn in_flight_frames_are_bounded() {
    init_tests();
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    for _ in 0..5 {
        assert!(presented(fc.draw_frame(&mut backend, record).unwrap()));
    }
    // Only frames past the first N have to wait for an earlier one
    assert_eq!(backend.blocked_waits(), 3);
    assert_eq!(backend.max_in_flight, 2);
    assert_eq!(backend.submits(), 5);
    assert_eq!(backend.presents(), 5);
    assert_eq!(fc.frame_count(), 5);
    assert_eq!(fc.fence_index(), 1);
    assert_eq!(fc.previous_fence_index(), 0);
    info!("ops: {:?}", backend.ops);
}

#[test]
fn three_frames_in_flight() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 3).unwrap();
    for _ in 0..10 {
        fc.draw_frame(&mut backend, record).unwrap();
    }
    assert_eq!(backend.blocked_waits(), 7);
    assert_eq!(backend.max_in_flight, 3);
}

#[test]
fn zero_frames_in_flight_becomes_one() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 0).unwrap();
    assert_eq!(fc.frames_in_flight(), 1);
    fc.draw_frame(&mut backend, record).unwrap();
    fc.draw_frame(&mut backend, record).unwrap();
    assert_eq!(backend.blocked_waits(), 1);
}

#[test]
fn out_of_date_acquire_rebuilds_without_drawing() {
    init_tests();
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    fc.draw_frame(&mut backend, record).unwrap();
    let old_images = fc.swapchain().unwrap().images.clone();

    backend.acquire_script.push_back(Ok(Acquired::OutOfDate));
    backend.clear_ops();
    let status = fc.draw_frame(&mut backend, record).unwrap();
    assert_eq!(status, FrameStatus::Rebuilt);
    assert_eq!(backend.submits(), 0);
    assert_eq!(backend.presents(), 0);
    assert_eq!(backend.count(|op| matches!(op, Op::Reset(_))), 0);
    assert_eq!(fc.rebuild_count(), 1);
    assert_eq!(fc.frame_count(), 1);

    // The old generation is gone and its handles stay dead
    for key in &old_images {
        assert!(matches!(
            backend.resources.get(*key),
            Err(MvError::StaleHandle)
        ));
    }
    let new_images = &fc.swapchain().unwrap().images;
    assert!(new_images.iter().all(|k| !old_images.contains(k)));

    // The aborted slot is retried with the new swapchain and its fence was
    // left signalled
    let status = fc.draw_frame(&mut backend, record).unwrap();
    let FrameStatus::Presented(target) = status else {
        unreachable!("expected a presented frame, got {status:?}");
    };
    assert_eq!(target.slot, 1);
    assert_eq!(backend.last_commands().unwrap().generation, 2);
}

#[test]
fn suboptimal_present_rebuilds_after_presenting() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    backend.present_script.push_back(Presented::Suboptimal);
    backend.clear_ops();
    assert!(presented(fc.draw_frame(&mut backend, record).unwrap()));
    assert_eq!(fc.rebuild_count(), 1);

    let present = backend
        .ops
        .iter()
        .position(|op| matches!(op, Op::Present(_)))
        .unwrap();
    let rebuild = backend
        .ops
        .iter()
        .position(|op| matches!(op, Op::CreateSwapchain(_)))
        .unwrap();
    assert!(present < rebuild);
}

#[test]
fn out_of_date_present_rebuilds() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    backend.present_script.push_back(Presented::OutOfDate);
    assert!(presented(fc.draw_frame(&mut backend, record).unwrap()));
    assert_eq!(fc.rebuild_count(), 1);
    fc.draw_frame(&mut backend, record).unwrap();
    assert_eq!(backend.last_commands().unwrap().generation, 2);
}

#[test]
fn suboptimal_acquire_still_draws() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    backend.acquire_script.push_back(Ok(Acquired::Image {
        index: 2,
        suboptimal: true,
    }));
    let status = fc.draw_frame(&mut backend, record).unwrap();
    let FrameStatus::Presented(target) = status else {
        unreachable!("expected a presented frame, got {status:?}");
    };
    assert_eq!(target.image_index, 2);
    assert_eq!(backend.last_commands().unwrap().generation, 1);
    assert_eq!(fc.rebuild_count(), 1);
}

#[test]
fn resize_request_rebuilds_before_drawing() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    fc.request_rebuild();
    fc.draw_frame(&mut backend, record).unwrap();
    assert_eq!(fc.rebuild_count(), 1);
    assert_eq!(backend.last_commands().unwrap().generation, 2);
}

#[test]
fn minimized_window_skips_frames() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    fc.draw_frame(&mut backend, record).unwrap();

    backend.extent = [0, 0];
    fc.request_rebuild();
    backend.clear_ops();
    for _ in 0..3 {
        let status = fc.draw_frame(&mut backend, record).unwrap();
        assert_eq!(status, FrameStatus::Skipped);
    }
    assert!(backend.ops.is_empty());
    assert_eq!(fc.rebuild_count(), 0);

    backend.extent = [640, 480];
    assert!(presented(fc.draw_frame(&mut backend, record).unwrap()));
    assert_eq!(fc.rebuild_count(), 1);
}

#[test]
fn rebuild_while_minimized_stays_pending() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    backend.extent = [1024, 0];
    fc.rebuild(&mut backend).unwrap();
    assert_eq!(fc.rebuild_count(), 0);
    backend.extent = [1024, 768];
    fc.draw_frame(&mut backend, record).unwrap();
    assert_eq!(fc.rebuild_count(), 1);
}

#[test]
fn uniforms_are_written_between_wait_and_submit() {
    init_tests();
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    let uniforms =
        UniformStreamer::new(&mut backend, fc.frames_in_flight()).unwrap();
    let mut table = MatrixTable::default();
    table
        .set(SlotId::Joint(0), glm::translation(&glm::vec3(1.0, 0.0, 0.0)))
        .unwrap();
    let scene =
        SceneUniform::new(&glm::Mat4::identity(), &glm::Mat4::identity());

    for frame in 0..4 {
        backend.clear_ops();
        let status = fc
            .draw_frame(&mut backend, |backend, swapchain, target| {
                uniforms.update_uniform_buffer(
                    backend,
                    target.slot,
                    &table,
                    &scene,
                )?;
                record(backend, swapchain, target)
            })
            .unwrap();
        let FrameStatus::Presented(target) = status else {
            unreachable!("expected a presented frame, got {status:?}");
        };
        assert_eq!(target.slot, frame % 2);

        let slot = uniforms.slot(target.slot).unwrap();
        let kinds: Vec<&str> = backend
            .ops
            .iter()
            .map(|op| match op {
                Op::Wait { .. } => "wait",
                Op::Acquire(_) => "acquire",
                Op::Reset(_) => "reset",
                Op::Write(key) => {
                    assert!(*key == slot.model || *key == slot.scene);
                    "write"
                }
                Op::Submit { .. } => "submit",
                Op::Present(_) => "present",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            ["wait", "acquire", "reset", "write", "write", "submit", "present"]
        );
    }

    let slot = uniforms.slot(1).unwrap();
    let Ok(MockResource::Buffer(bytes)) = backend.resources.get(slot.scene)
    else {
        unreachable!("scene uniform is not a buffer");
    };
    assert_eq!(bytes.as_slice(), bytemuck::bytes_of(&scene));
}

#[test]
fn record_error_propagates() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    let result =
        fc.draw_frame(&mut backend, |_, _, _| Err(MvError::NoSwapchain));
    assert!(matches!(result, Err(MvError::NoSwapchain)));
    assert_eq!(backend.submits(), 0);
}

#[test]
fn acquire_failure_is_fatal() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 2).unwrap();
    backend
        .acquire_script
        .push_back(Err(MvError::VkVulkanError(VulkanError::DeviceLost)));
    assert!(matches!(
        fc.draw_frame(&mut backend, record),
        Err(MvError::VkVulkanError(VulkanError::DeviceLost))
    ));
    assert_eq!(fc.rebuild_count(), 0);
}

#[test]
fn shutdown_releases_everything() {
    let mut backend = MockBackend::new();
    let mut fc = FrameControl::new(&mut backend, 3).unwrap();
    let uniforms =
        UniformStreamer::new(&mut backend, fc.frames_in_flight()).unwrap();
    for _ in 0..4 {
        fc.draw_frame(&mut backend, record).unwrap();
    }
    assert_eq!(backend.resources.len(), 3 + 2 * 3);

    fc.shutdown(&mut backend).unwrap();
    uniforms.destroy(&mut backend).unwrap();
    assert!(backend.resources.is_empty());
    assert_eq!(backend.fence_count, 0);
    assert_eq!(backend.semaphore_count, 0);
}
