use std::path::Path;

use anyhow::{Context, Result};
use framekit_core::{crop, stitch, CropInfo, CropRequest};
use tracing::info;

use crate::frame_io::{load_frames, save_frames, ImageFormat};

pub const CROP_INFO_FILE: &str = "crop_info.json";

pub fn crop_handler(
    input: &Path,
    output: &Path,
    request: &CropRequest,
    image_format: ImageFormat,
) -> Result<CropInfo> {
    let frames = load_frames(input)?;
    let (cropped, crop_info) = crop(&frames, request)?;
    save_frames(&cropped, output, "frame", image_format)?;
    crop_info.save(&output.join(CROP_INFO_FILE))?;
    info!(
        "Cropped {} frames to {}x{} at ({}, {})",
        cropped.len(),
        crop_info.width,
        crop_info.height,
        crop_info.x,
        crop_info.y
    );
    println!("{}", serde_json::to_string_pretty(&crop_info)?);

    Ok(crop_info)
}

pub fn stitch_handler(
    original: &Path,
    cropped: &Path,
    output: &Path,
    crop_info: Option<&Path>,
    image_format: ImageFormat,
) -> Result<()> {
    let info_path = crop_info.map_or_else(|| cropped.join(CROP_INFO_FILE), Path::to_path_buf);
    let crop_info = CropInfo::load(&info_path)?;
    let original_frames = load_frames(original)?;
    let cropped_frames = load_frames(cropped)?;

    let stitched = stitch(&original_frames, &cropped_frames, &crop_info)
        .context("failed to stitch cropped frames")?;
    save_frames(&stitched, output, "frame", image_format)?;
    println!("Stitched {} frames", stitched.len());

    Ok(())
}
