//! Frame batch processing: scene segmentation, cropping, sharpness
//! selection, resolution planning, WAV export and text helpers.

pub mod audio;
pub mod container;
pub mod crop;
pub mod detector;
pub mod frames;
pub mod nodes;
pub mod resolution;
pub mod scene_detect;
pub mod sharpness;
pub mod text;
pub mod timecode;

pub use crate::{
    audio::{AudioClip, AudioError, AudioInput, WavEncoding},
    crop::{crop, stitch, CropError, CropInfo, CropRequest},
    detector::{ContentDetector, ContentDetectorOptions, SceneDetector, SceneList},
    frames::{FrameBatch, FrameError, FrameShape},
    scene_detect::{Scene, SceneBundle, SceneSegmenter, SegmentError, SegmentOptions},
    timecode::{FrameRate, Timecode},
};
