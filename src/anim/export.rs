use super::{
    skeleton::Skeleton,
    types::{AnimError, Channel, Motion},
};
use itertools::Itertools;
use std::{fmt::Write, ops::RangeInclusive};

/// Which position channels an export keeps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionChannels {
    /// Every joint keeps the channels it was loaded with
    All,
    /// Only root joints keep position channels
    RootOnly,
}

impl PositionChannels {
    #[must_use]
    pub const fn from_flag(include_all: bool) -> Self {
        if include_all {
            Self::All
        } else {
            Self::RootOnly
        }
    }
}

/// Serializes `range` of `motion` as BVH text. Joints are written depth
/// first from each root, which is the order BVH requires for motion values.
/// Floats use the shortest text that reads back to the same value so a
/// full export parses back to an equal recording.
///
/// # Errors
/// Returns `AnimError::InvalidRange` if the range is empty or past the end
pub fn write_bvh(
    skeleton: &Skeleton,
    motion: &Motion,
    range: RangeInclusive<usize>,
    positions: PositionChannels,
) -> Result<String, AnimError> {
    let (start, end) = range.into_inner();
    if start > end || end >= motion.len() {
        return Err(AnimError::InvalidRange {
            start,
            end,
            total: motion.len(),
        });
    }

    let kept = kept_channels(skeleton, positions);
    let mut out = String::from("HIERARCHY\n");
    let mut order = Vec::with_capacity(skeleton.len());
    for root in skeleton.roots() {
        write_joint(skeleton, &kept, root, 0, &mut out, &mut order);
    }

    // `fmt::Write` for `String` does not fail
    let _ = writeln!(out, "MOTION");
    let _ = writeln!(out, "Frames: {}", end - start + 1);
    let _ = writeln!(out, "Frame Time: {}", motion.frame_time);
    for frame in &motion.frames[start..=end] {
        let line = order
            .iter()
            .flat_map(|&j| {
                let offset = skeleton.channel_offset(j);
                kept[j].iter().map(move |&(c, _)| frame.values[offset + c])
            })
            .join(" ");
        let _ = writeln!(out, "{line}");
    }
    Ok(out)
}

/// For each joint, the (position in the joint's channel list, channel) pairs
/// that survive the export
fn kept_channels(
    skeleton: &Skeleton,
    positions: PositionChannels,
) -> Vec<Vec<(usize, Channel)>> {
    skeleton
        .joints()
        .iter()
        .map(|joint| {
            joint
                .channels
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, c)| {
                    !c.is_position()
                        || positions == PositionChannels::All
                        || joint.parent.is_none()
                })
                .collect()
        })
        .collect()
}

fn write_joint(
    skeleton: &Skeleton,
    kept: &[Vec<(usize, Channel)>],
    index: usize,
    depth: usize,
    out: &mut String,
    order: &mut Vec<usize>,
) {
    let joint = &skeleton.joints()[index];
    let indent = "\t".repeat(depth);
    let o = joint.offset;
    if joint.end_site {
        let _ = writeln!(out, "{indent}End Site");
        let _ = writeln!(out, "{indent}{{");
        let _ = writeln!(out, "{indent}\tOFFSET {} {} {}", o.x, o.y, o.z);
        let _ = writeln!(out, "{indent}}}");
        return;
    }

    let keyword = if joint.parent.is_none() { "ROOT" } else { "JOINT" };
    let _ = writeln!(out, "{indent}{keyword} {}", joint.name);
    let _ = writeln!(out, "{indent}{{");
    let _ = writeln!(out, "{indent}\tOFFSET {} {} {}", o.x, o.y, o.z);
    let channels = &kept[index];
    if !channels.is_empty() {
        let _ = writeln!(
            out,
            "{indent}\tCHANNELS {} {}",
            channels.len(),
            channels.iter().map(|(_, c)| c.name()).join(" ")
        );
    }
    order.push(index);
    for &child in skeleton.children(index) {
        write_joint(skeleton, kept, child, depth + 1, out, order);
    }
    let _ = writeln!(out, "{indent}}}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::bvh;

    const TWO_JOINTS: &str = "HIERARCHY
ROOT Hips
{
\tOFFSET 0 0 0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Chest
\t{
\t\tOFFSET 0 5.5 0
\t\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0 3 0
\t\t}
\t}
}
MOTION
Frames: 3
Frame Time: 0.0083333
1 2 3 4 5 6 7 8 9 10 11 12
1.5 2 3 4 5 6 7 8 9 10 11 12.25
-1 -2 -3 -4 -5 -6 -7 -8 -9 -10 -11 -12
";

    #[test]
    fn full_export_round_trips() {
        let (skeleton, motion) = bvh::parse(TWO_JOINTS).unwrap();
        let text =
            write_bvh(&skeleton, &motion, 0..=2, PositionChannels::All)
                .unwrap();
        let (skeleton2, motion2) = bvh::parse(&text).unwrap();
        assert_eq!(skeleton.joints(), skeleton2.joints());
        assert_eq!(motion, motion2);
    }

    #[test]
    fn root_only_drops_child_positions() {
        let (skeleton, motion) = bvh::parse(TWO_JOINTS).unwrap();
        let text =
            write_bvh(&skeleton, &motion, 1..=1, PositionChannels::RootOnly)
                .unwrap();
        let (skeleton2, motion2) = bvh::parse(&text).unwrap();
        assert_eq!(motion2.len(), 1);
        assert_eq!(skeleton2.joints()[0].channels.len(), 6);
        assert_eq!(skeleton2.joints()[1].channels.len(), 3);
        assert_eq!(
            motion2.frames[0].values,
            vec![1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 11.0, 12.25]
        );
    }

    #[test]
    fn range_past_end_is_rejected() {
        let (skeleton, motion) = bvh::parse(TWO_JOINTS).unwrap();
        assert!(matches!(
            write_bvh(&skeleton, &motion, 2..=3, PositionChannels::All),
            Err(AnimError::InvalidRange { .. })
        ));
    }
}
