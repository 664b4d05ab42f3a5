use super::types::{AnimError, Joint};
use crate::matrix_table::{JOINT_CAPACITY, RESERVED_SLOTS};
use ahash::{HashMap, HashMapExt};
use log::{debug, warn};
use smallvec::SmallVec;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Done,
}

/// A validated joint hierarchy. Construction checks parents, cycles and
/// table capacity so evaluation never has to.
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: Vec<Joint>,
    /// Parent before child
    order: Vec<usize>,
    children: Vec<SmallVec<[usize; 4]>>,
    channel_offsets: Vec<usize>,
    channel_count: usize,
    names: HashMap<String, usize>,
}

impl Skeleton {
    /// Validates a joint list. Parents may be declared after their children.
    ///
    /// # Errors
    /// Returns `AnimError` for an empty list, a list that does not fit the
    /// matrix table, a parent index naming no joint, or a cyclic parent chain
    pub fn new(joints: Vec<Joint>) -> Result<Self, AnimError> {
        if joints.is_empty() {
            return Err(AnimError::EmptyHierarchy);
        }
        if joints.len() > JOINT_CAPACITY {
            return Err(AnimError::CapacityExceeded {
                joints: joints.len() + RESERVED_SLOTS,
                capacity: JOINT_CAPACITY + RESERVED_SLOTS,
            });
        }
        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= joints.len() {
                    return Err(AnimError::ParentOutOfRange {
                        joint: index,
                        parent,
                    });
                }
            }
        }
        check_cycles(&joints)?;

        let mut children = vec![SmallVec::<[usize; 4]>::new(); joints.len()];
        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                children[parent].push(index);
            }
        }
        let order = topological_order(&joints, &children);

        let mut channel_offsets = Vec::with_capacity(joints.len());
        let mut channel_count = 0;
        for joint in &joints {
            channel_offsets.push(channel_count);
            channel_count += joint.channels.len();
        }

        let mut names = HashMap::with_capacity(joints.len());
        for (index, joint) in joints.iter().enumerate() {
            if names.insert(joint.name.clone(), index).is_some() {
                warn!("duplicate joint name {}", joint.name);
            }
        }
        debug!(
            "skeleton has {} joints and {} channels",
            joints.len(),
            channel_count
        );

        Ok(Self {
            joints,
            order,
            children,
            channel_offsets,
            channel_count,
            names,
        })
    }

    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint indices with every parent ahead of its children
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub fn children(&self, joint: usize) -> &[usize] {
        self.children.get(joint).map_or(&[][..], |c| c.as_slice())
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Index of this joint's first value in a frame
    #[must_use]
    pub fn channel_offset(&self, joint: usize) -> usize {
        self.channel_offsets[joint]
    }

    /// Values per frame
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }
}

/// Walks every ancestor chain once, marking joints on the current path
fn check_cycles(joints: &[Joint]) -> Result<(), AnimError> {
    let mut state = vec![Visit::New; joints.len()];
    let mut path = Vec::new();
    for start in 0..joints.len() {
        let mut cursor = Some(start);
        while let Some(j) = cursor {
            match state[j] {
                Visit::Done => break,
                Visit::OnPath => {
                    return Err(AnimError::CyclicParent { joint: j })
                }
                Visit::New => {
                    state[j] = Visit::OnPath;
                    path.push(j);
                    cursor = joints[j].parent;
                }
            }
        }
        for j in path.drain(..) {
            state[j] = Visit::Done;
        }
    }
    Ok(())
}

/// Depth first from each root, children in declaration order
fn topological_order(
    joints: &[Joint],
    children: &[SmallVec<[usize; 4]>],
) -> Vec<usize> {
    let mut order = Vec::with_capacity(joints.len());
    let mut stack: Vec<usize> = joints
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, j)| j.parent.is_none())
        .map(|(i, _)| i)
        .collect();
    while let Some(j) = stack.pop() {
        order.push(j);
        stack.extend(children[j].iter().rev());
    }
    order
}
