use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use framekit_core::{
    detector::{ComponentWeights, ContentDetectorOptions, DEFAULT_MIN_SCENE_LEN},
    scene_detect::{DEFAULT_MAX_SCENES, DEFAULT_THRESHOLD, MAX_SCENE_OUTPUTS},
    timecode::FrameRate,
    SegmentOptions,
    WavEncoding,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{frame_io::ImageFormat, FramekitCliError};

pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub scene_detection: SceneDetectionConfig,
    pub output:          OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDetectionConfig {
    pub threshold:     f64,
    pub max_scenes:    usize,
    pub fps:           f64,
    pub min_scene_len: usize,
    pub weights:       ComponentWeights,
    /// Directory for the temporary container. Defaults to the system temp
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir:      Option<PathBuf>,
}

impl Default for SceneDetectionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            threshold:     DEFAULT_THRESHOLD,
            max_scenes:    DEFAULT_MAX_SCENES,
            fps:           DEFAULT_FPS,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            weights:       ComponentWeights::default(),
            temp_dir:      None,
        }
    }
}

impl SceneDetectionConfig {
    pub fn validate(&self) -> Result<(), FramekitCliError> {
        if !(1..=MAX_SCENE_OUTPUTS).contains(&self.max_scenes) {
            return Err(FramekitCliError::InvalidMaxScenes(self.max_scenes));
        }
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(FramekitCliError::InvalidThreshold(self.threshold));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(FramekitCliError::InvalidFps(self.fps));
        }
        Ok(())
    }

    pub fn segment_options(&self) -> Result<SegmentOptions, FramekitCliError> {
        self.validate()?;
        let max_scenes = NonZeroUsize::new(self.max_scenes)
            .ok_or(FramekitCliError::InvalidMaxScenes(self.max_scenes))?;
        let frame_rate =
            FrameRate::from_fps(self.fps).map_err(|_| FramekitCliError::InvalidFps(self.fps))?;
        Ok(SegmentOptions {
            threshold: self.threshold,
            max_scenes,
            frame_rate,
        })
    }

    pub fn detector_options(&self) -> ContentDetectorOptions {
        ContentDetectorOptions {
            min_scene_len: self.min_scene_len,
            weights:       self.weights,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub image_format: ImageFormat,
    pub wav_encoding: WavEncoding,
}

impl Configuration {
    #[inline]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        Self::save_data(self, path)?;
        Ok(())
    }

    #[inline]
    pub fn save_data(data: &Configuration, path: &Path) -> Result<(), ConfigError> {
        let mut buffer = vec![];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        data.serialize(&mut serializer).map_err(ConfigError::Serialize)?;
        let directory = path.parent();
        if let Some(directory) = directory {
            std::fs::create_dir_all(directory).map_err(ConfigError::Save)?;
        }
        std::fs::write(path, buffer).map_err(ConfigError::Save)?;
        Ok(())
    }

    #[inline]
    pub fn load(config_path: &Path) -> Result<Option<Configuration>, ConfigError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(config_path)
            .map_err(|_| ConfigError::Load(config_path.to_path_buf()))?;
        let data = serde_json::from_str(&data)
            .map_err(|_| ConfigError::Load(config_path.to_path_buf()))?;

        Ok(Some(data))
    }

    /// The stored configuration, or the defaults when there is no file.
    #[inline]
    pub fn load_or_default(config_path: &Path) -> Result<Configuration, ConfigError> {
        Ok(Self::load(config_path)?.unwrap_or_default())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    Load(PathBuf),
    #[error("Failed to serialize config file: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to save config file: {0}")]
    Save(#[from] std::io::Error),
}
