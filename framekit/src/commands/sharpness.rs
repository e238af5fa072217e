use std::path::Path;

use anyhow::{bail, Result};
use framekit_core::sharpness::{select_sharpest, sharpest_frame};

use crate::{
    frame_io::{load_frames, save_frames, ImageFormat},
    FramekitCliError,
};

pub fn sharpest_handler(input: &Path, output: &Path, image_format: ImageFormat) -> Result<usize> {
    let frames = load_frames(input)?;
    let Some(index) = sharpest_frame(&frames) else {
        bail!(FramekitCliError::NoFrames(input.to_path_buf()));
    };
    save_frames(&frames.select(&[index])?, output, "sharpest", image_format)?;
    println!("Sharpest frame: {}", index);

    Ok(index)
}

pub fn select_sharpest_handler(
    input: &Path,
    output: &Path,
    interval: usize,
    window: usize,
    image_format: ImageFormat,
) -> Result<Vec<usize>> {
    let frames = load_frames(input)?;
    let selected = select_sharpest(&frames, interval, window)?;
    save_frames(&frames.select(&selected)?, output, "frame", image_format)?;
    println!(
        "Selected frames: {}",
        selected.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );

    Ok(selected)
}
