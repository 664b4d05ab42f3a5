//! Geometry for everything the viewer draws. Each shape is a free function
//! returning a `MeshDescriptor` in the local space of the group it belongs
//! to; the group's model matrix places it in the world.
use crate::{
    anim::{AnimError, Skeleton},
    matrix_table::SlotId,
    mv_error::MvError,
    vertex::BasicVertex,
};
use nalgebra_glm as glm;
use std::f32::consts::{PI, TAU};

pub const JOINT_COLOUR: [f32; 3] = [0.9, 0.75, 0.3];
pub const END_SITE_COLOUR: [f32; 3] = [0.6, 0.6, 0.6];
pub const BONE_COLOUR: [f32; 3] = [0.85, 0.85, 0.9];
const FLOOR_LIGHT: [f32; 3] = [0.35, 0.35, 0.38];
const FLOOR_DARK: [f32; 3] = [0.25, 0.25, 0.28];

/// Triangle list for one group
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescriptor {
    pub vertices: Vec<BasicVertex>,
    pub indices: Vec<u32>,
}

impl MeshDescriptor {
    fn with_group(group: SlotId) -> Result<(Self, u32), AnimError> {
        let group = u32::try_from(group.index()?).unwrap_or(u32::MAX);
        Ok((Self::default(), group))
    }

    fn push_vertex(
        &mut self,
        position: glm::Vec3,
        colour: [f32; 3],
        group: u32,
    ) {
        self.vertices.push(BasicVertex {
            position: position.into(),
            colour,
            group,
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    fn base(&self) -> u32 {
        self.vertices.len() as u32
    }
}

/// Axis aligned cube centred on the origin
///
/// # Errors
/// Returns `AnimError::CapacityExceeded` for a group past the table
pub fn cube(
    size: f32,
    colour: [f32; 3],
    group: SlotId,
) -> Result<MeshDescriptor, AnimError> {
    let h = size * 0.5;
    box_between(glm::vec3(-h, -h, -h), glm::vec3(h, h, h), colour, group)
}

/// Axis aligned box between two corners
///
/// # Errors
/// Returns `AnimError::CapacityExceeded` for a group past the table
pub fn box_between(
    min: glm::Vec3,
    max: glm::Vec3,
    colour: [f32; 3],
    group: SlotId,
) -> Result<MeshDescriptor, AnimError> {
    let (mut mesh, g) = MeshDescriptor::with_group(group)?;
    for i in 0..8 {
        let corner = glm::vec3(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        mesh.push_vertex(corner, colour, g);
    }
    // Two triangles per face, corners numbered by their max bits
    mesh.indices.extend_from_slice(&[
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ]);
    Ok(mesh)
}

/// UV sphere centred on the origin
///
/// # Errors
/// Returns `AnimError::CapacityExceeded` for a group past the table
#[allow(clippy::cast_precision_loss)]
pub fn sphere(
    radius: f32,
    rings: u32,
    segments: u32,
    colour: [f32; 3],
    group: SlotId,
) -> Result<MeshDescriptor, AnimError> {
    let (mut mesh, g) = MeshDescriptor::with_group(group)?;
    let rings = rings.max(2);
    let segments = segments.max(3);
    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let phi = TAU * segment as f32 / segments as f32;
            let position = radius
                * glm::vec3(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                );
            mesh.push_vertex(position, colour, g);
        }
    }
    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            mesh.indices
                .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    Ok(mesh)
}

/// Double pyramid from the origin to `tip`, widest a fifth of the way along
///
/// # Errors
/// Returns `AnimError::CapacityExceeded` for a group past the table
pub fn bone(
    tip: glm::Vec3,
    width: f32,
    colour: [f32; 3],
    group: SlotId,
) -> Result<MeshDescriptor, AnimError> {
    let (mut mesh, g) = MeshDescriptor::with_group(group)?;
    let length = glm::length(&tip);
    if length <= f32::EPSILON {
        return Ok(mesh);
    }
    let dir = tip / length;
    let helper = if dir.z.abs() < 0.9 {
        glm::vec3(0.0, 0.0, 1.0)
    } else {
        glm::vec3(1.0, 0.0, 0.0)
    };
    let u = glm::normalize(&glm::cross(&dir, &helper)) * width;
    let v = glm::cross(&dir, &u);
    let waist = dir * (length * 0.2);

    mesh.push_vertex(glm::Vec3::zeros(), colour, g);
    mesh.push_vertex(tip, colour, g);
    for corner in [waist + u, waist + v, waist - u, waist - v] {
        mesh.push_vertex(corner, colour, g);
    }
    for i in 0..4 {
        let c0 = 2 + i;
        let c1 = 2 + (i + 1) % 4;
        mesh.indices.extend_from_slice(&[0, c1, c0, 1, c0, c1]);
    }
    Ok(mesh)
}

/// Checkerboard in the XY plane, `divisions` squares along each side
///
/// # Errors
/// Only fails if the floor slot is out of the table, which it never is
#[allow(clippy::cast_precision_loss)]
pub fn floor(
    half_size: f32,
    divisions: u32,
) -> Result<MeshDescriptor, AnimError> {
    let (mut mesh, g) = MeshDescriptor::with_group(SlotId::Floor)?;
    let divisions = divisions.max(1);
    let step = 2.0 * half_size / divisions as f32;
    for row in 0..divisions {
        for col in 0..divisions {
            let x = -half_size + col as f32 * step;
            let y = -half_size + row as f32 * step;
            let colour = if (row + col) % 2 == 0 {
                FLOOR_LIGHT
            } else {
                FLOOR_DARK
            };
            let base = mesh.base();
            mesh.push_vertex(glm::vec3(x, y, 0.0), colour, g);
            mesh.push_vertex(glm::vec3(x + step, y, 0.0), colour, g);
            mesh.push_vertex(glm::vec3(x, y + step, 0.0), colour, g);
            mesh.push_vertex(glm::vec3(x + step, y + step, 0.0), colour, g);
            mesh.indices.extend_from_slice(&[
                base,
                base + 1,
                base + 2,
                base + 2,
                base + 1,
                base + 3,
            ]);
        }
    }
    Ok(mesh)
}

/// Red, green and blue bars along X, Y and Z
///
/// # Errors
/// Only fails if the axes slot is out of the table, which it never is
pub fn direction_axes(length: f32) -> Result<MeshDescriptor, AnimError> {
    let t = length * 0.02;
    let group = SlotId::DebugAxes;
    let bars = [
        box_between(
            glm::vec3(0.0, -t, -t),
            glm::vec3(length, t, t),
            [0.9, 0.2, 0.2],
            group,
        )?,
        box_between(
            glm::vec3(-t, 0.0, -t),
            glm::vec3(t, length, t),
            [0.2, 0.9, 0.2],
            group,
        )?,
        box_between(
            glm::vec3(-t, -t, 0.0),
            glm::vec3(t, t, length),
            [0.2, 0.2, 0.9],
            group,
        )?,
    ];
    let mut batch = MeshBatch::new();
    batch.push_all(&bars);
    Ok(batch.into_mesh())
}

/// A sphere on every joint and a bone from every joint to each child, all
/// in the joint's own group
///
/// # Errors
/// Returns `AnimError::CapacityExceeded` if the skeleton doesn't fit
pub fn skeleton_meshes(
    skeleton: &Skeleton,
    joint_radius: f32,
) -> Result<Vec<MeshDescriptor>, AnimError> {
    let mut meshes = Vec::with_capacity(skeleton.len() * 2);
    for (index, joint) in skeleton.joints().iter().enumerate() {
        let group = SlotId::Joint(index);
        let (radius, colour) = if joint.end_site {
            (joint_radius * 0.5, END_SITE_COLOUR)
        } else {
            (joint_radius, JOINT_COLOUR)
        };
        meshes.push(sphere(radius, 6, 8, colour, group)?);
        for &child in skeleton.children(index) {
            let tip = skeleton.joints()[child].offset;
            meshes.push(bone(tip, joint_radius * 0.6, BONE_COLOUR, group)?);
        }
    }
    Ok(meshes)
}

/// Concatenates meshes into one vertex and index list for a single draw
#[derive(Clone, Debug, Default)]
pub struct MeshBatch {
    mesh: MeshDescriptor,
}

impl MeshBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mesh: &MeshDescriptor) {
        let base = self.mesh.base();
        self.mesh.vertices.extend_from_slice(&mesh.vertices);
        self.mesh
            .indices
            .extend(mesh.indices.iter().map(|i| base + i));
    }

    pub fn push_all<'a>(
        &mut self,
        meshes: impl IntoIterator<Item = &'a MeshDescriptor>,
    ) {
        for mesh in meshes {
            self.push(mesh);
        }
    }

    #[must_use]
    pub fn vertices(&self) -> &[BasicVertex] {
        &self.mesh.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    /// # Errors
    /// Returns `MvError::IndexCountTooLarge` past `u32::MAX` indices
    pub fn index_count(&self) -> Result<u32, MvError> {
        u32::try_from(self.mesh.indices.len())
            .map_err(|_| MvError::IndexCountTooLarge)
    }

    #[must_use]
    pub fn into_mesh(self) -> MeshDescriptor {
        self.mesh
    }
}
