//! Loading, evaluating and exporting generated recordings

mod common;

use common::init_tests;
use motion_viewer::{
    anim::{
        bvh, evaluate, select_frame, Channel, Interpolation, Joint, LoopRange,
        SkeletalAnimator, Skeleton,
    },
    matrix_table::SlotId,
};
use nalgebra_glm as glm;
use smallvec::smallvec;
use std::fmt::Write;

const EPSILON: f32 = 0.0001;

/// A chain of `depth` joints under a root, every joint with position and
/// rotation channels, ending in an End Site
fn generated_bvh(depth: usize, frames: usize) -> String {
    let mut text = String::from("HIERARCHY\n");
    for level in 0..=depth {
        let indent = "  ".repeat(level);
        let keyword = if level == 0 { "ROOT" } else { "JOINT" };
        let _ = writeln!(text, "{indent}{keyword} j{level}");
        let _ = writeln!(text, "{indent}{{");
        let _ = writeln!(text, "{indent}  OFFSET 0 {level} 0");
        let _ = writeln!(
            text,
            "{indent}  CHANNELS 6 Xposition Yposition Zposition \
             Zrotation Xrotation Yrotation"
        );
    }
    let indent = "  ".repeat(depth + 1);
    let _ = writeln!(text, "{indent}End Site");
    let _ = writeln!(text, "{indent}{{");
    let _ = writeln!(text, "{indent}  OFFSET 0 1 0");
    let _ = writeln!(text, "{indent}}}");
    for level in (0..=depth).rev() {
        let _ = writeln!(text, "{}}}", "  ".repeat(level));
    }

    let _ = writeln!(text, "MOTION\nFrames: {frames}\nFrame Time: 0.04");
    for frame in 0..frames {
        let values: Vec<String> = (0..=depth)
            .flat_map(|level| {
                let angle = (frame * (level + 1)) % 360;
                [
                    "0".to_owned(),
                    format!("{level}"),
                    "0".to_owned(),
                    format!("{angle}"),
                    "0".to_owned(),
                    "0".to_owned(),
                ]
            })
            .collect();
        let _ = writeln!(text, "{}", values.join(" "));
    }
    text
}

#[test]
fn generated_recording_loads() {
    init_tests();
    let (skeleton, motion) = bvh::parse(&generated_bvh(4, 100)).unwrap();
    // Five joints plus the End Site
    assert_eq!(skeleton.len(), 6);
    assert_eq!(skeleton.channel_count(), 30);
    assert_eq!(motion.len(), 100);
    assert!((motion.fps() - 25.0).abs() < 0.001);
    let end = skeleton.find("j4_End").unwrap();
    assert!(skeleton.joints()[end].end_site);
    assert_eq!(skeleton.joints()[end].parent, skeleton.find("j4"));
}

#[test]
fn export_keeps_only_the_loop_range() {
    init_tests();
    let (skeleton, motion) = bvh::parse(&generated_bvh(4, 100)).unwrap();
    let mut animator =
        SkeletalAnimator::new(skeleton, motion, None, Interpolation::Step)
            .unwrap();
    animator.cursor_mut().set_loop_start(10);
    animator.cursor_mut().set_loop_end(20);

    let text = animator.export_loop(false).unwrap();
    let (exported, clip) = bvh::parse(&text).unwrap();
    assert_eq!(clip.len(), 11);
    assert_eq!(exported.len(), 6);
    for joint in exported.joints() {
        if joint.parent.is_some() {
            assert!(!joint.has_position(), "{} kept positions", joint.name);
        } else {
            assert_eq!(joint.channels.len(), 6);
        }
    }

    // The first exported frame is frame 10 of the recording
    let source = &animator.motion().frames[10];
    let j1 = exported.find("j1").unwrap();
    let offset = exported.channel_offset(j1);
    assert!((clip.frames[0].values[offset] - 20.0).abs() < EPSILON);
    assert!(
        (clip.frames[0].rotations[j1].coords - source.rotations[1].coords)
            .norm()
            < EPSILON
    );
}

#[test]
fn full_export_reads_back_unchanged() {
    let (skeleton, motion) = bvh::parse(&generated_bvh(3, 12)).unwrap();
    let animator = SkeletalAnimator::new(
        skeleton.clone(),
        motion.clone(),
        None,
        Interpolation::Step,
    )
    .unwrap();
    let (again, motion_again) =
        bvh::parse(&animator.export_loop(true).unwrap()).unwrap();
    assert_eq!(again.joints(), skeleton.joints());
    assert_eq!(motion_again, motion);
}

#[test]
fn forward_parents_are_ordered_parent_first() {
    let rotating = |name: &str, parent: Option<usize>| Joint {
        channels: smallvec![Channel::Zrotation],
        ..Joint::new(name, parent, glm::vec3(1.0, 0.0, 0.0))
    };
    // hand -> arm -> root, declared leaf first
    let skeleton = Skeleton::new(vec![
        rotating("hand", Some(1)),
        rotating("arm", Some(2)),
        rotating("root", None),
    ])
    .unwrap();

    let order = skeleton.order();
    let mut seen = order.to_vec();
    seen.sort_unstable();
    assert_eq!(seen, [0, 1, 2]);
    let at = |j: usize| order.iter().position(|&o| o == j).unwrap();
    for (j, joint) in skeleton.joints().iter().enumerate() {
        if let Some(parent) = joint.parent {
            assert!(at(parent) < at(j));
        }
    }
}

#[test]
fn evaluation_is_deterministic() {
    let (skeleton, motion) = bvh::parse(&generated_bvh(8, 30)).unwrap();
    for frame in &motion.frames {
        let a = evaluate(&skeleton, frame).unwrap();
        let b = evaluate(&skeleton, frame).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn leaf_follows_the_chain() {
    let (skeleton, motion) = bvh::parse(&generated_bvh(2, 1)).unwrap();
    let table = evaluate(&skeleton, &motion.frames[0]).unwrap();
    let end = skeleton.find("j2_End").unwrap();
    let origin =
        table.get(SlotId::Joint(end)).unwrap() * glm::vec4(0.0, 0.0, 0.0, 1.0);
    // Frame 0 has no rotation and each joint's position channel replaces its
    // offset: root at 0 + 0, j1 at +1, j2 at +2, End Site offset +1
    assert!((origin.xyz() - glm::vec3(0.0, 4.0, 0.0)).norm() < EPSILON);
}

#[test]
fn loop_wraps_back_to_its_start() {
    let range = LoopRange { start: 10, end: 20 };
    assert_eq!(select_frame(21.0, 1.0, range), 10);
    assert_eq!(select_frame(20.5, 1.0, range), 20);
    assert_eq!(select_frame(5.0, 1.0, range), 10);
    assert_eq!(select_frame(1.1, 30.0, range), 11);
}

#[test]
fn animator_advances_inside_the_loop() {
    let (skeleton, motion) = bvh::parse(&generated_bvh(2, 50)).unwrap();
    let mut animator =
        SkeletalAnimator::new(skeleton, motion, Some(10.0), Interpolation::Step)
            .unwrap();
    animator.cursor_mut().set_loop_start(10);
    animator.cursor_mut().set_loop_end(20);
    animator.advance(2.15);
    assert_eq!(animator.cursor().frame_index(), 10);
    assert_eq!(
        animator.evaluate().unwrap(),
        animator.evaluate_frame(10).unwrap()
    );
}
