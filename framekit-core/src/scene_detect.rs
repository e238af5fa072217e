//! Scene segmentation of a frame batch.
//!
//! The batch is written to a temporary container, a [`SceneDetector`] reports
//! scene boundaries as timecodes, and the boundaries are turned into
//! inclusive frame ranges. The first `max_scenes` scenes are emitted as their
//! own batches; the frames after the last emitted scene are handed back so a
//! second pass can continue where this one stopped.
//!
//! Every failure is reported through the returned [`SceneBundle`] rather than
//! as an error, so a failing batch never aborts the caller's pipeline.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    container::{write_container, write_container_in, ContainerError},
    detector::{SceneDetector, SceneList},
    frames::{FrameBatch, FrameError},
    timecode::FrameRate,
};

pub const DEFAULT_THRESHOLD: f64 = 27.0;
pub const DEFAULT_MAX_SCENES: usize = 5;
/// Upper bound on individually emitted scenes.
pub const MAX_SCENE_OUTPUTS: usize = 50;

/// Inclusive frame range of one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scene {
    pub start_frame: usize, // Inclusive
    pub end_frame:   usize, // Inclusive
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentOptions {
    /// Detector sensitivity. Higher values merge more frames into fewer
    /// scenes.
    pub threshold:  f64,
    pub max_scenes: NonZeroUsize,
    /// Frame rate written into the temporary container.
    pub frame_rate: FrameRate,
}

impl Default for SegmentOptions {
    #[inline]
    fn default() -> Self {
        Self {
            threshold:  DEFAULT_THRESHOLD,
            max_scenes: NonZeroUsize::new(DEFAULT_MAX_SCENES).unwrap_or(NonZeroUsize::MIN),
            frame_rate: FrameRate::default(),
        }
    }
}

/// Everything one segmentation pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBundle {
    /// Exactly `max_scenes` slots; slots past the detected scenes are `None`.
    pub scenes:      Vec<Option<FrameBatch>>,
    /// Frames after the last emitted scene.
    pub remaining:   Option<FrameBatch>,
    /// First and last frame of every detected scene, without repeats.
    pub preview:     Option<FrameBatch>,
    pub summary:     String,
    /// Number of detected scenes, which may exceed the emitted slots.
    pub scene_count: usize,
    /// Ranges of every detected scene.
    pub ranges:      Vec<Scene>,
}

impl SceneBundle {
    /// The bundle returned when segmentation could not run.
    #[inline]
    pub fn failed(max_scenes: NonZeroUsize, summary: impl Into<String>) -> Self {
        Self {
            scenes:      vec![None; max_scenes.get()],
            remaining:   None,
            preview:     None,
            summary:     summary.into(),
            scene_count: 0,
            ranges:      Vec::new(),
        }
    }

    #[inline]
    pub fn emitted(&self) -> usize {
        self.scenes.iter().filter(|scene| scene.is_some()).count()
    }
}

pub struct SceneSegmenter<D> {
    detector: D,
    options:  SegmentOptions,
    /// Where the temporary container is written. `None` uses the system
    /// temp directory.
    temp_dir: Option<PathBuf>,
}

impl<D: SceneDetector> SceneSegmenter<D> {
    #[inline]
    pub fn new(detector: D, options: SegmentOptions) -> Self {
        Self {
            detector,
            options,
            temp_dir: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_temp_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(directory.into());
        self
    }

    #[inline]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    #[inline]
    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }

    #[inline]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Split `frames` into scenes. Never fails; problems are described in
    /// the bundle summary.
    #[tracing::instrument(level = "debug", skip_all, fields(frames = frames.len()))]
    #[inline]
    pub fn segment(&mut self, frames: &FrameBatch) -> SceneBundle {
        match self.try_segment(frames) {
            Ok(bundle) => bundle,
            Err(err) => {
                error!("Scene detection failed: {}", err);
                SceneBundle::failed(self.options.max_scenes, err.to_string())
            },
        }
    }

    fn try_segment(&mut self, frames: &FrameBatch) -> Result<SceneBundle, SegmentError> {
        if frames.is_empty() {
            return Err(SegmentError::EmptyInput);
        }
        let threshold = self.options.threshold;
        if threshold.is_nan() || threshold < 0.0 {
            return Err(SegmentError::InvalidThreshold(threshold));
        }

        let scene_list = {
            let container = match &self.temp_dir {
                Some(directory) => write_container_in(frames, self.options.frame_rate, directory)?,
                None => write_container(frames, self.options.frame_rate)?,
            };
            // `container` is dropped, and the file removed, on both arms.
            self.detector
                .detect_scenes(container.path(), threshold)
                .map_err(SegmentError::Detector)?
        };
        debug!("Detector reported {} scenes", scene_list.len());

        let bundle = build_bundle(frames, &scene_list, self.options.max_scenes)?;
        info!(
            "Detected {} scenes in {} frames, emitting {}",
            bundle.scene_count,
            frames.len(),
            bundle.emitted()
        );
        Ok(bundle)
    }
}

/// Assemble the bundle from a detector's scene list.
#[inline]
pub fn build_bundle(
    frames: &FrameBatch,
    scene_list: &SceneList,
    max_scenes: NonZeroUsize,
) -> Result<SceneBundle, SegmentError> {
    let total_frames = frames.len();
    let synthesized = scene_list.is_empty();
    let ranges = scene_ranges(scene_list, total_frames);
    let scene_count = ranges.len();
    let emitted = max_scenes.get().min(scene_count);

    let mut scenes: Vec<Option<FrameBatch>> = ranges
        .iter()
        .take(emitted)
        .map(|scene| Some(frames.slice(scene.start_frame..scene.end_frame + 1)))
        .collect();
    scenes.resize(max_scenes.get(), None);

    let remaining = remaining_start(&ranges, max_scenes)
        .filter(|&start| start < total_frames)
        .map(|start| frames.slice(start..total_frames));

    let preview_indices = preview_indices(&ranges);
    let preview = if preview_indices.is_empty() {
        None
    } else {
        Some(frames.select(&preview_indices)?)
    };

    let remaining_frames = remaining.as_ref().map_or(0, FrameBatch::len);
    let summary = build_summary(
        total_frames,
        &ranges,
        max_scenes,
        remaining_frames,
        synthesized,
    );

    Ok(SceneBundle {
        scenes,
        remaining,
        preview,
        summary,
        scene_count,
        ranges,
    })
}

/// Convert detector timecodes into inclusive frame ranges inside
/// `[0, total_frames - 1]`.
///
/// The last reported scene always runs to the final frame, and an empty
/// scene list becomes a single scene over the whole batch.
#[inline]
pub fn scene_ranges(scene_list: &SceneList, total_frames: usize) -> Vec<Scene> {
    if total_frames == 0 {
        return Vec::new();
    }
    let last_frame = total_frames - 1;
    if scene_list.is_empty() {
        return vec![Scene {
            start_frame: 0,
            end_frame:   last_frame,
        }];
    }

    let last_index = scene_list.len() - 1;
    scene_list
        .iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let start_frame = start.frame_num().min(last_frame);
            let end_frame = if index == last_index {
                last_frame
            } else {
                end.frame_num().min(total_frames).saturating_sub(1)
            };
            Scene {
                start_frame,
                end_frame: end_frame.max(start_frame),
            }
        })
        .collect()
}

/// Start and end frame of every scene, first occurrence kept.
#[inline]
pub fn preview_indices(ranges: &[Scene]) -> Vec<usize> {
    ranges
        .iter()
        .flat_map(|scene| [scene.start_frame, scene.end_frame])
        .unique()
        .collect()
}

/// First frame after the last scene that gets its own slot.
#[inline]
pub fn remaining_start(ranges: &[Scene], max_scenes: NonZeroUsize) -> Option<usize> {
    let emitted = max_scenes.get().min(ranges.len());
    emitted
        .checked_sub(1)
        .and_then(|index| ranges.get(index))
        .map(|scene| scene.end_frame + 1)
}

#[inline]
pub fn build_summary(
    total_frames: usize,
    ranges: &[Scene],
    max_scenes: NonZeroUsize,
    remaining_frames: usize,
    synthesized: bool,
) -> String {
    let detected = ranges.len();
    let emitted = max_scenes.get().min(detected);

    let mut lines = vec![format!(
        "Processed: {} frames | Detected: {} scenes | Output: {} scenes",
        total_frames, detected, emitted
    )];
    if remaining_frames > 0 {
        lines.push(format!("Remaining: {} frames (for chaining)", remaining_frames));
    }
    lines.push("---".to_owned());
    lines.extend(ranges.iter().take(emitted).enumerate().map(|(index, scene)| {
        let note = if synthesized {
            " (No scene changes detected)"
        } else {
            ""
        };
        format!(
            "Scene {}: Frames {}-{}{}",
            index + 1,
            scene.start_frame,
            scene.end_frame,
            note
        )
    }));
    if detected > max_scenes.get() {
        lines.push(format!(
            "... ({} more scenes detected but not output)",
            detected - max_scenes.get()
        ));
    }

    lines.join("\n")
}

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Empty image batch")]
    EmptyInput,
    #[error("Invalid detection threshold {0}, expected a non-negative number")]
    InvalidThreshold(f64),
    #[error("Failed to create temporary video: {0}")]
    Encoding(#[from] ContainerError),
    #[error("Error: {0:#}")]
    Detector(#[source] anyhow::Error),
    #[error("Failed to assemble scene outputs: {0}")]
    Frames(#[from] FrameError),
}
