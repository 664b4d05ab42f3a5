use crate::{input::InputState, types::CameraTrait};
use nalgebra_glm as glm;
use serde::Deserialize;
use std::f32::consts::{FRAC_PI_2, TAU};

/// Radians of orbit per pixel of mouse movement
pub const ROTATION_DIFF_RATIO: f32 = 0.01;
/// Scene units of pan per pixel of mouse movement
pub const SHIFT_DIFF_RATIO: f32 = 0.1;
/// Distance factor per scroll line
pub const SCROLL_RATIO: f32 = 1.1;
/// Keeps the elevation off the poles where the view matrix degenerates
pub const POLE_EPSILON: f32 = 0.0001;

const NEAR_CLIP: f32 = 0.01;
const FAR_CLIP: f32 = 1000.0;

/// Starting state, angles in degrees
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraProperties {
    pub center: [f32; 3],
    pub h_degrees: f32,
    pub v_degrees: f32,
    pub distance: f32,
    pub fovy_degrees: f32,
}

impl Default for CameraProperties {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 5.0],
            h_degrees: 0.0,
            v_degrees: 20.0,
            distance: 50.0,
            fovy_degrees: 45.0,
        }
    }
}

/// Camera orbiting a centre point in a Z up world. Left drag orbits,
/// shift + left drag pans the centre, scrolling changes the distance.
#[derive(Clone, Copy, Debug)]
pub struct OrbitCamera {
    center: glm::Vec3,
    h_rotation: f32,
    v_rotation: f32,
    distance: f32,
    fovy: f32,
    aspect_ratio: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraProperties::default())
    }
}

impl CameraTrait for OrbitCamera {
    fn view_matrix(&self) -> glm::Mat4 {
        glm::look_at_rh(
            &self.position(),
            &self.center,
            &glm::vec3(0.0, 0.0, 1.0),
        )
    }

    fn proj_matrix(&self) -> glm::Mat4 {
        let mut proj = glm::perspective_rh_zo(
            self.aspect_ratio,
            self.fovy,
            NEAR_CLIP,
            FAR_CLIP,
        );
        // Vulkan clip space has Y pointing down
        proj[(1, 1)] *= -1.0;
        proj
    }
}

impl OrbitCamera {
    #[must_use]
    pub fn new(properties: CameraProperties) -> Self {
        Self {
            center: glm::make_vec3(&properties.center),
            h_rotation: properties.h_degrees.to_radians(),
            v_rotation: clamp_elevation(properties.v_degrees.to_radians()),
            distance: properties.distance,
            fovy: properties.fovy_degrees.to_radians(),
            aspect_ratio: 16.0 / 9.0,
        }
    }

    /// Applies one frame of mouse input. Does nothing while the UI has
    /// focus.
    #[allow(clippy::cast_possible_truncation)]
    pub fn update(&mut self, input: &InputState) {
        if input.ui_focused() {
            return;
        }
        let [dx, dy] = input.delta();
        let (dx, dy) = (dx as f32, dy as f32);
        if input.left() {
            if input.shift() {
                self.pan(dx * SHIFT_DIFF_RATIO, dy * SHIFT_DIFF_RATIO);
            } else {
                self.orbit(dx * ROTATION_DIFF_RATIO, dy * ROTATION_DIFF_RATIO);
            }
        }
        self.zoom(input.scroll_delta()[1] as f32);
    }

    /// Rotates about the centre, `dx` and `dy` in radians
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.h_rotation = (self.h_rotation - dx) % TAU;
        self.v_rotation = clamp_elevation((self.v_rotation + dy) % TAU);
    }

    /// Moves the centre in the camera's screen plane
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let r = glm::rotate_z(&glm::Mat4::identity(), self.h_rotation);
        let r = glm::rotate_y(&r, -self.v_rotation);
        let shift = r * glm::vec4(0.0, -dx, dy, 0.0);
        self.center += shift.xyz();
    }

    /// Scales the distance by `SCROLL_RATIO` per line, scrolling up moves
    /// closer
    pub fn zoom(&mut self, lines: f32) {
        self.distance *= SCROLL_RATIO.powf(-lines);
    }

    pub fn set_aspect_ratio(&mut self, extent: [u32; 2]) {
        if extent[0] > 0 && extent[1] > 0 {
            #[allow(clippy::cast_precision_loss)]
            let ratio = extent[0] as f32 / extent[1] as f32;
            self.aspect_ratio = ratio;
        }
    }

    /// Eye position in world space
    #[must_use]
    pub fn position(&self) -> glm::Vec3 {
        let (h, v) = (self.h_rotation, self.v_rotation);
        self.center
            + self.distance
                * glm::vec3(h.cos() * v.cos(), h.sin() * v.cos(), v.sin())
    }

    #[must_use]
    pub const fn center(&self) -> glm::Vec3 {
        self.center
    }

    #[must_use]
    pub const fn distance(&self) -> f32 {
        self.distance
    }

    #[must_use]
    pub const fn h_rotation(&self) -> f32 {
        self.h_rotation
    }

    #[must_use]
    pub const fn v_rotation(&self) -> f32 {
        self.v_rotation
    }
}

fn clamp_elevation(v: f32) -> f32 {
    v.clamp(-FRAC_PI_2 + POLE_EPSILON, FRAC_PI_2 - POLE_EPSILON)
}
