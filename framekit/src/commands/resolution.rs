use std::path::Path;

use anyhow::Result;
use framekit_core::resolution::{calculate_resolution, Resolution, ResolutionRequest};
use tracing::debug;

use crate::frame_io::load_frames;

pub fn resolution_handler(
    mut request: ResolutionRequest,
    source: Option<&Path>,
    json: bool,
) -> Result<Resolution> {
    if let Some(source) = source {
        let frames = load_frames(source)?;
        let shape = frames.shape();
        debug!("Using {} frames of {} from {}", frames.len(), shape, source.display());
        request = request.with_source(frames.len(), shape.width, shape.height);
    }

    let resolution = calculate_resolution(&request)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("Width: {}", resolution.width);
        println!("Height: {}", resolution.height);
        println!("Frames: {}", resolution.frame_count);
        println!("{}", resolution.info);
    }

    Ok(resolution)
}
