//! Rectangular crop of a frame batch and the matching stitch back.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::frames::{FrameBatch, FrameShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRequest {
    pub x:                 usize,
    pub y:                 usize,
    pub width:             usize,
    pub height:            usize,
    /// Round the crop size up to this multiple. `0` and `1` leave it as is.
    pub round_to_multiple: usize,
}

/// Where a crop was taken from, enough to put it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropInfo {
    pub x:                   usize,
    pub y:                   usize,
    pub width:               usize,
    pub height:              usize,
    pub original_width:      usize,
    pub original_height:     usize,
    pub requested_width:     usize,
    pub requested_height:    usize,
    pub rounded_to_multiple: usize,
}

impl CropInfo {
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse crop info {}", path.display()))
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Clamp the requested region into a `width`×`height` frame.
#[inline]
pub fn crop_region(request: &CropRequest, width: usize, height: usize) -> CropInfo {
    let multiple = request.round_to_multiple.max(1);
    let x = request.x.min(width.saturating_sub(1));
    let y = request.y.min(height.saturating_sub(1));
    let max_width = width - x;
    let max_height = height - y;

    let fit = |value: usize, limit: usize| {
        let value = value.min(limit).max(1);
        if multiple > 1 {
            value.div_ceil(multiple).saturating_mul(multiple).min(limit).max(1)
        } else {
            value
        }
    };

    CropInfo {
        x,
        y,
        width: fit(request.width, max_width),
        height: fit(request.height, max_height),
        original_width: width,
        original_height: height,
        requested_width: request.width.min(max_width).max(1),
        requested_height: request.height.min(max_height).max(1),
        rounded_to_multiple: multiple,
    }
}

#[inline]
pub fn crop(frames: &FrameBatch, request: &CropRequest) -> Result<(FrameBatch, CropInfo), CropError> {
    let shape = frames.shape();
    if shape.is_degenerate() {
        return Err(CropError::EmptyFrame);
    }
    let info = crop_region(request, shape.width, shape.height);
    debug!(
        "Cropping {} frames to {}x{} at ({}, {})",
        frames.len(),
        info.width,
        info.height,
        info.x,
        info.y
    );

    let out_shape = FrameShape {
        height: info.height,
        width: info.width,
        ..shape
    };
    let row = shape.width * shape.channels;
    let out_row = info.width * shape.channels;
    let mut data = Vec::with_capacity(frames.len() * out_shape.samples());
    for frame in frames.iter() {
        for line in frame.chunks_exact(row).skip(info.y).take(info.height) {
            let start = info.x * shape.channels;
            data.extend_from_slice(&line[start..start + out_row]);
        }
    }

    Ok((FrameBatch::new(out_shape, data)?, info))
}

/// Paste `cropped` back over a copy of `original` at the crop position.
#[inline]
pub fn stitch(
    original: &FrameBatch,
    cropped: &FrameBatch,
    info: &CropInfo,
) -> Result<FrameBatch, CropError> {
    let count = original.len().min(cropped.len());
    if count == 0 {
        return Err(CropError::NoFrames);
    }
    let base = original.shape();
    let patch = cropped.shape();
    if base.channels != patch.channels {
        return Err(CropError::ChannelMismatch {
            original: base.channels,
            cropped:  patch.channels,
        });
    }
    if info.x + patch.width > base.width || info.y + patch.height > base.height {
        return Err(CropError::OutOfBounds {
            x:      info.x,
            y:      info.y,
            width:  patch.width,
            height: patch.height,
            frame:  base,
        });
    }

    let mut output = original.slice(0..count);
    let row = base.width * base.channels;
    let patch_row = patch.width * patch.channels;
    for index in 0..count {
        let (Some(target), Some(source)) = (output.frame_mut(index), cropped.frame(index)) else {
            continue;
        };
        for (line, patch_line) in target
            .chunks_exact_mut(row)
            .skip(info.y)
            .zip(source.chunks_exact(patch_row))
        {
            let start = info.x * base.channels;
            line[start..start + patch_row].copy_from_slice(patch_line);
        }
    }
    debug!("Stitched {} frames at ({}, {})", count, info.x, info.y);

    Ok(output)
}

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Cannot crop frames with zero width or height")]
    EmptyFrame,
    #[error("No frames to stitch")]
    NoFrames,
    #[error("Cropped region {width}x{height} at ({x}, {y}) does not fit in frames of shape {frame}")]
    OutOfBounds {
        x:      usize,
        y:      usize,
        width:  usize,
        height: usize,
        frame:  FrameShape,
    },
    #[error("Channel mismatch: original has {original}, cropped has {cropped}")]
    ChannelMismatch { original: usize, cropped: usize },
    #[error(transparent)]
    Frames(#[from] crate::frames::FrameError),
}
