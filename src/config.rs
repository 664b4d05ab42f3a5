use crate::{anim::Interpolation, camera::CameraProperties, mv_error::MvError};
use log::info;
use nalgebra_glm as glm;
use serde::Deserialize;
use std::{f32::consts::FRAC_PI_2, path::Path};
use vulkano::image::SampleCount;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowProperties {
    pub dimensions: [u32; 2],
    pub title: String,
}

impl Default for WindowProperties {
    fn default() -> Self {
        Self {
            dimensions: [1280, 720],
            title: "motion-viewer".to_string(),
        }
    }
}

/// Viewer settings. Every field has a default so a YAML file only needs the
/// fields it changes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub window: WindowProperties,
    pub frames_in_flight: usize,
    /// Frame pacing target, `None` to draw as fast as presentation allows
    pub target_fps: Option<f64>,
    pub vsync: bool,
    pub msaa_samples: u32,
    pub validation_layers: bool,
    pub background: [f32; 4],
    /// Uniform scale applied to the skeleton
    pub model_scale: f32,
    /// Recordings are Y up; the viewer world is Z up
    pub y_up: bool,
    pub interpolation: Interpolation,
    /// Overrides the frame rate stored in the recording
    pub timeline_fps: Option<f64>,
    pub show_floor: bool,
    pub show_axes: bool,
    pub camera: CameraProperties,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowProperties::default(),
            frames_in_flight: 2,
            target_fps: Some(60.0),
            vsync: true,
            msaa_samples: 4,
            validation_layers: cfg!(debug_assertions),
            background: [0.08, 0.08, 0.1, 1.0],
            model_scale: 0.1,
            y_up: true,
            interpolation: Interpolation::default(),
            timeline_fps: None,
            show_floor: true,
            show_axes: false,
            camera: CameraProperties::default(),
        }
    }
}

impl ViewerConfig {
    /// # Errors
    /// Returns `MvError::SerdeYamlError` for malformed YAML or unknown
    /// fields
    pub fn from_yaml(text: &str) -> Result<Self, MvError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// # Errors
    /// Returns `MvError` if the file can't be read or parsed
    pub fn load(path: &Path) -> Result<Self, MvError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Transform applied to every joint matrix before upload
    #[must_use]
    pub fn global_transform(&self) -> glm::Mat4 {
        let s = self.model_scale;
        let scale = glm::scaling(&glm::vec3(s, s, s));
        if self.y_up {
            glm::rotate_x(&scale, FRAC_PI_2)
        } else {
            scale
        }
    }

    /// # Errors
    /// Returns `MvError::UnsupportedSampleCount` for a count that is not a
    /// power of two up to 64
    pub const fn sample_count(&self) -> Result<SampleCount, MvError> {
        match self.msaa_samples {
            1 => Ok(SampleCount::Sample1),
            2 => Ok(SampleCount::Sample2),
            4 => Ok(SampleCount::Sample4),
            8 => Ok(SampleCount::Sample8),
            16 => Ok(SampleCount::Sample16),
            32 => Ok(SampleCount::Sample32),
            64 => Ok(SampleCount::Sample64),
            n => Err(MvError::UnsupportedSampleCount(n)),
        }
    }
}
