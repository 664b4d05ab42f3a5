use super::{
    skeleton::Skeleton,
    types::{AnimError, Channel, Joint, MotionFrame},
};
use crate::matrix_table::{MatrixTable, SlotId};
use nalgebra_glm as glm;

/// Decodes one joint's channel values into a rotation and, when the joint
/// has position channels, a translation. Rotations compose in the order the
/// channels are declared.
#[must_use]
pub fn decode_channels(
    joint: &Joint,
    values: &[f32],
) -> (glm::Quat, Option<glm::Vec3>) {
    let mut rotation = glm::Quat::identity();
    let mut translation = None;
    for (channel, value) in joint.channels.iter().zip(values) {
        if channel.is_position() {
            let t = translation.get_or_insert_with(glm::Vec3::zeros);
            match channel {
                Channel::Xposition => t.x = *value,
                Channel::Yposition => t.y = *value,
                _ => t.z = *value,
            }
        } else {
            rotation *= glm::quat_angle_axis(
                value.to_radians(),
                &channel.axis(),
            );
        }
    }
    (rotation, translation)
}

/// Decodes a whole frame of raw values
///
/// # Errors
/// Returns `AnimError::ChannelCount` if the value count does not match the
/// skeleton
pub fn decode_frame(
    skeleton: &Skeleton,
    index: usize,
    values: Vec<f32>,
) -> Result<MotionFrame, AnimError> {
    if values.len() != skeleton.channel_count() {
        return Err(AnimError::ChannelCount {
            frame: index,
            expected: skeleton.channel_count(),
            found: values.len(),
        });
    }
    let mut rotations = Vec::with_capacity(skeleton.len());
    let mut translations = Vec::with_capacity(skeleton.len());
    for (j, joint) in skeleton.joints().iter().enumerate() {
        let start = skeleton.channel_offset(j);
        let end = start + joint.channels.len();
        let (r, t) = decode_channels(joint, &values[start..end]);
        rotations.push(r);
        translations.push(t);
    }
    Ok(MotionFrame {
        values,
        rotations,
        translations,
    })
}

/// Joint local matrix. Roots place their translation channels ahead of the
/// bind offset, other joints use translation channels in place of it.
fn local_matrix(
    joint: &Joint,
    rotation: &glm::Quat,
    translation: Option<&glm::Vec3>,
) -> glm::Mat4 {
    let r = glm::quat_to_mat4(rotation);
    match (joint.parent, translation) {
        (None, Some(t)) => {
            glm::translation(t) * glm::translation(&joint.offset) * r
        }
        (Some(_), Some(t)) => glm::translation(t) * r,
        (_, None) => glm::translation(&joint.offset) * r,
    }
}

/// Computes world matrices in parent-first order, calling `visit` once per
/// joint after its matrix is known. `pose` supplies each joint's rotation
/// and optional translation.
///
/// # Errors
/// Returns `AnimError` if a joint does not fit the matrix table
pub fn evaluate_pose<P, V>(
    skeleton: &Skeleton,
    mut pose: P,
    mut visit: V,
) -> Result<MatrixTable, AnimError>
where
    P: FnMut(usize) -> (glm::Quat, Option<glm::Vec3>),
    V: FnMut(usize, &glm::Mat4),
{
    let mut table = MatrixTable::default();
    let mut world = vec![glm::Mat4::identity(); skeleton.len()];
    for &j in skeleton.order() {
        let joint = &skeleton.joints()[j];
        let (rotation, translation) = pose(j);
        let local = local_matrix(joint, &rotation, translation.as_ref());
        world[j] = joint.parent.map_or(local, |p| world[p] * local);
        visit(j, &world[j]);
        table.set(SlotId::Joint(j), world[j])?;
    }
    Ok(table)
}

/// World matrices for one frame
///
/// # Errors
/// Returns `AnimError::ChannelCount` for a frame decoded against a different
/// skeleton
pub fn evaluate(
    skeleton: &Skeleton,
    frame: &MotionFrame,
) -> Result<MatrixTable, AnimError> {
    check_frame(skeleton, frame)?;
    evaluate_pose(
        skeleton,
        |j| (frame.rotations[j], frame.translations[j]),
        |_, _| {},
    )
}

/// World matrices between two frames, `t` in `[0, 1]` from `a` to `b`
///
/// # Errors
/// Returns `AnimError::ChannelCount` for a frame decoded against a different
/// skeleton
pub fn evaluate_blend(
    skeleton: &Skeleton,
    a: &MotionFrame,
    b: &MotionFrame,
    t: f32,
) -> Result<MatrixTable, AnimError> {
    check_frame(skeleton, a)?;
    check_frame(skeleton, b)?;
    let t = t.clamp(0.0, 1.0);
    evaluate_pose(
        skeleton,
        |j| {
            let rotation =
                glm::quat_slerp(&a.rotations[j], &b.rotations[j], t);
            let translation = match (a.translations[j], b.translations[j]) {
                (Some(ta), Some(tb)) => Some(glm::lerp(&ta, &tb, t)),
                (ta, _) => ta,
            };
            (rotation, translation)
        },
        |_, _| {},
    )
}

fn check_frame(
    skeleton: &Skeleton,
    frame: &MotionFrame,
) -> Result<(), AnimError> {
    if frame.rotations.len() == skeleton.len()
        && frame.translations.len() == skeleton.len()
    {
        Ok(())
    } else {
        Err(AnimError::ChannelCount {
            frame: 0,
            expected: skeleton.len(),
            found: frame.rotations.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    const EPSILON: f32 = 0.0001;

    fn rotating_joint(parent: Option<usize>, offset: glm::Vec3) -> Joint {
        Joint {
            channels: smallvec![
                Channel::Zrotation,
                Channel::Xrotation,
                Channel::Yrotation
            ],
            ..Joint::new("j", parent, offset)
        }
    }

    #[test]
    fn quarter_turn_about_z_is_pure_rotation() {
        let skeleton =
            Skeleton::new(vec![rotating_joint(None, glm::Vec3::zeros())])
                .unwrap();
        let frame = decode_frame(&skeleton, 0, vec![90.0, 0.0, 0.0]).unwrap();
        let table = evaluate(&skeleton, &frame).unwrap();
        let expected = glm::rotation(
            std::f32::consts::FRAC_PI_2,
            &glm::vec3(0.0, 0.0, 1.0),
        );
        assert!(glm::equal_columns_eps(
            table.get(SlotId::Joint(0)).unwrap(),
            &expected,
            EPSILON
        )
        .iter()
        .all(|&c| c));
    }

    #[test]
    fn channel_order_is_respected() {
        let joint = rotating_joint(None, glm::Vec3::zeros());
        let (q, t) = decode_channels(&joint, &[90.0, 90.0, 0.0]);
        assert!(t.is_none());
        // Z then X: the local X axis ends up along world Y
        let x = glm::quat_rotate_vec3(&q, &glm::vec3(1.0, 0.0, 0.0));
        assert!((x - glm::vec3(0.0, 1.0, 0.0)).norm() < EPSILON);
        let y = glm::quat_rotate_vec3(&q, &glm::vec3(0.0, 1.0, 0.0));
        assert!((y - glm::vec3(0.0, 0.0, 1.0)).norm() < EPSILON);
    }

    #[test]
    fn child_follows_parent() {
        let skeleton = Skeleton::new(vec![
            rotating_joint(None, glm::Vec3::zeros()),
            rotating_joint(Some(0), glm::vec3(1.0, 0.0, 0.0)),
        ])
        .unwrap();
        let frame =
            decode_frame(&skeleton, 0, vec![90.0, 0.0, 0.0, 0.0, 0.0, 0.0])
                .unwrap();
        let table = evaluate(&skeleton, &frame).unwrap();
        let child = table.get(SlotId::Joint(1)).unwrap();
        let origin = child * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((origin.xyz() - glm::vec3(0.0, 1.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn root_translation_comes_before_offset() {
        let joint = Joint {
            channels: smallvec![
                Channel::Xposition,
                Channel::Yposition,
                Channel::Zposition
            ],
            ..Joint::new("root", None, glm::vec3(0.0, 2.0, 0.0))
        };
        let skeleton = Skeleton::new(vec![joint]).unwrap();
        let frame = decode_frame(&skeleton, 0, vec![1.0, 0.0, 3.0]).unwrap();
        let table = evaluate(&skeleton, &frame).unwrap();
        let m = table.get(SlotId::Joint(0)).unwrap();
        let origin = m * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((origin.xyz() - glm::vec3(1.0, 2.0, 3.0)).norm() < EPSILON);
    }

    #[test]
    fn blend_halfway() {
        let skeleton =
            Skeleton::new(vec![rotating_joint(None, glm::Vec3::zeros())])
                .unwrap();
        let a = decode_frame(&skeleton, 0, vec![0.0, 0.0, 0.0]).unwrap();
        let b = decode_frame(&skeleton, 1, vec![90.0, 0.0, 0.0]).unwrap();
        let table = evaluate_blend(&skeleton, &a, &b, 0.5).unwrap();
        let expected = glm::rotation(
            std::f32::consts::FRAC_PI_4,
            &glm::vec3(0.0, 0.0, 1.0),
        );
        assert!(glm::equal_columns_eps(
            table.get(SlotId::Joint(0)).unwrap(),
            &expected,
            EPSILON
        )
        .iter()
        .all(|&c| c));
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn visits_each_joint_once_after_its_parent() {
        // Two trees, parents declared after their children
        let skeleton = Skeleton::new(vec![
            rotating_joint(Some(2), glm::vec3(1.0, 0.0, 0.0)),
            rotating_joint(None, glm::vec3(0.0, 0.0, 1.0)),
            rotating_joint(Some(1), glm::vec3(0.0, 2.0, 0.0)),
            rotating_joint(Some(4), glm::vec3(0.0, 0.0, 3.0)),
            rotating_joint(None, glm::vec3(5.0, 0.0, 0.0)),
        ])
        .unwrap();
        let values = (0..skeleton.channel_count())
            .map(|c| c as f32 * 10.0)
            .collect();
        let frame = decode_frame(&skeleton, 0, values).unwrap();

        let mut visited: Vec<(usize, glm::Mat4)> = Vec::new();
        let table = evaluate_pose(
            &skeleton,
            |j| (frame.rotations[j], frame.translations[j]),
            |j, world| visited.push((j, *world)),
        )
        .unwrap();

        let mut joints: Vec<usize> = visited.iter().map(|(j, _)| *j).collect();
        joints.sort_unstable();
        assert_eq!(joints, [0, 1, 2, 3, 4]);
        let at = |j: usize| visited.iter().position(|(v, _)| *v == j).unwrap();
        for (j, joint) in skeleton.joints().iter().enumerate() {
            if let Some(parent) = joint.parent {
                assert!(at(parent) < at(j), "joint {j} before its parent");
            }
        }
        for (j, world) in &visited {
            assert_eq!(table.get(SlotId::Joint(*j)).unwrap(), world);
        }
        assert_eq!(table, evaluate(&skeleton, &frame).unwrap());
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let skeleton =
            Skeleton::new(vec![rotating_joint(None, glm::Vec3::zeros())])
                .unwrap();
        assert_eq!(
            decode_frame(&skeleton, 4, vec![1.0]).unwrap_err(),
            AnimError::ChannelCount {
                frame: 4,
                expected: 3,
                found: 1
            }
        );
    }
}
