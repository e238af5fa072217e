use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use framekit_core::{ContentDetector, FrameBatch, FrameShape, SceneBundle, SceneSegmenter};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    configuration::SceneDetectionConfig,
    frame_io::{load_frames, save_frames, FrameIoError, ImageFormat},
};

/// Command line overrides for the `scene_detection` config section.
#[derive(Debug, Default)]
pub struct SceneDetectionOverrides {
    pub threshold:     Option<f64>,
    pub max_scenes:    Option<usize>,
    pub fps:           Option<f64>,
    pub min_scene_len: Option<usize>,
    pub temp_dir:      Option<PathBuf>,
}

impl SceneDetectionOverrides {
    pub fn apply(&self, config: &mut SceneDetectionConfig) {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(max_scenes) = self.max_scenes {
            config.max_scenes = max_scenes;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(min_scene_len) = self.min_scene_len {
            config.min_scene_len = min_scene_len;
        }
        if let Some(temp_dir) = &self.temp_dir {
            config.temp_dir = Some(temp_dir.clone());
        }
    }
}

#[derive(Debug, Serialize)]
struct SceneReport<'a> {
    scene_count:      usize,
    emitted:          usize,
    remaining_frames: usize,
    ranges:           &'a [framekit_core::Scene],
    summary:          &'a str,
}

pub fn detect_scenes_handler(
    input: &Path,
    output: &Path,
    config: &SceneDetectionConfig,
    image_format: ImageFormat,
    json: bool,
) -> Result<SceneBundle> {
    let options = config.segment_options()?;
    let frames = match load_frames(input) {
        Ok(frames) => frames,
        // An empty directory is an empty batch; the segmenter reports it.
        Err(FrameIoError::NoImages(directory)) => {
            warn!("No images found in {}", directory.display());
            FrameBatch::empty(FrameShape::new(0, 0, 3)?)
        },
        Err(err) => return Err(err.into()),
    };
    debug!("Segmenting {} frames with {:?}", frames.len(), options);

    let detector = ContentDetector::new(config.detector_options());
    let mut segmenter = SceneSegmenter::new(detector, options);
    if let Some(temp_dir) = &config.temp_dir {
        segmenter = segmenter.with_temp_dir(temp_dir);
    }
    let bundle = segmenter.segment(&frames);
    if bundle.scene_count == 0 {
        warn!("No scenes produced: {}", bundle.summary);
    }

    for (index, scene) in bundle.scenes.iter().enumerate() {
        if let Some(scene) = scene {
            let directory = output.join(format!("scene_{:02}", index + 1));
            save_frames(scene, &directory, "frame", image_format)
                .with_context(|| format!("failed to write scene {}", index + 1))?;
        }
    }
    if let Some(remaining) = &bundle.remaining {
        save_frames(remaining, &output.join("remaining"), "frame", image_format)?;
    }
    if let Some(preview) = &bundle.preview {
        save_frames(preview, &output.join("preview"), "frame", image_format)?;
    }

    if json {
        let report = SceneReport {
            scene_count:      bundle.scene_count,
            emitted:          bundle.emitted(),
            remaining_frames: bundle.remaining.as_ref().map_or(0, |r| r.len()),
            ranges:           &bundle.ranges,
            summary:          &bundle.summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", bundle.summary);
        println!("Scenes: {}", bundle.scene_count);
    }

    Ok(bundle)
}
