use std::{
    fs,
    path::{Path, PathBuf},
};

use framekit_core::{FrameBatch, FrameError, FrameShape};
use serde::{Deserialize, Serialize};
use strum::{Display as DisplayMacro, EnumString};
use thiserror::Error;
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    DisplayMacro,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[strum(to_string = "jpg", serialize = "jpeg")]
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }

    fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpg => image::ImageFormat::Jpeg,
        }
    }
}

/// Image files in `directory`, sorted by file name.
pub fn list_images(directory: &Path) -> Result<Vec<PathBuf>, FrameIoError> {
    if !directory.is_dir() {
        return Err(FrameIoError::NotADirectory(directory.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in fs::read_dir(directory).map_err(FrameIoError::Io)? {
        let path = entry.map_err(FrameIoError::Io)?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if is_image && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Load every image in `directory` as one RGB batch.
pub fn load_frames(directory: &Path) -> Result<FrameBatch, FrameIoError> {
    let images = list_images(directory)?;
    let Some(first) = images.first() else {
        return Err(FrameIoError::NoImages(directory.to_path_buf()));
    };
    let first = image::open(first)
        .map_err(|source| FrameIoError::Decode {
            path: first.clone(),
            source,
        })?
        .to_rgb8();
    let (width, height) = first.dimensions();
    let shape = FrameShape::new(height as usize, width as usize, 3)?;

    let mut bytes = Vec::with_capacity(shape.samples() * images.len());
    bytes.extend_from_slice(first.as_raw());
    for path in images.iter().skip(1) {
        let frame = image::open(path)
            .map_err(|source| FrameIoError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        if frame.dimensions() != (width, height) {
            return Err(FrameIoError::ShapeMismatch {
                path:     path.clone(),
                expected: (width, height),
                found:    frame.dimensions(),
            });
        }
        bytes.extend_from_slice(frame.as_raw());
    }
    debug!("Loaded {} frames ({}) from {}", images.len(), shape, directory.display());

    Ok(FrameBatch::from_bytes(shape, &bytes)?)
}

/// Write every frame as `{prefix}_{index:05}.{ext}` into `directory`.
pub fn save_frames(
    frames: &FrameBatch,
    directory: &Path,
    prefix: &str,
    format: ImageFormat,
) -> Result<Vec<PathBuf>, FrameIoError> {
    fs::create_dir_all(directory).map_err(FrameIoError::Io)?;
    let shape = frames.shape();
    let (width, height) = (shape.width as u32, shape.height as u32);

    let mut written = Vec::with_capacity(frames.len());
    for index in 0..frames.len() {
        let rgb = frames.frame_rgb8(index).ok_or(FrameError::IndexOutOfRange {
            index,
            len: frames.len(),
        })?;
        let image = image::RgbImage::from_raw(width, height, rgb).ok_or(FrameIoError::Encode {
            path:   directory.to_path_buf(),
            source: None,
        })?;
        let path = directory.join(format!("{prefix}_{index:05}.{}", format.extension()));
        image
            .save_with_format(&path, format.as_image_format())
            .map_err(|source| FrameIoError::Encode {
                path:   path.clone(),
                source: Some(source),
            })?;
        written.push(path);
    }
    info!("Wrote {} frames to {}", written.len(), directory.display());

    Ok(written)
}

#[derive(Debug, Error)]
pub enum FrameIoError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("No PNG or JPEG images found in {0}")]
    NoImages(PathBuf),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {path}")]
    Encode {
        path:   PathBuf,
        #[source]
        source: Option<image::ImageError>,
    },
    #[error("{path} is {found:?}, expected {expected:?} like the first frame")]
    ShapeMismatch {
        path:     PathBuf,
        expected: (u32, u32),
        found:    (u32, u32),
    },
    #[error(transparent)]
    Frames(#[from] FrameError),
    #[error(transparent)]
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32, value: u8) {
        image::RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn loads_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 3, 2, 255);
        write_png(&dir.path().join("a.png"), 3, 2, 0);
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let frames = load_frames(dir.path()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.shape(), FrameShape::new(2, 3, 3).unwrap());
        assert_eq!(frames.frame(0).unwrap()[0], 0.0);
        assert_eq!(frames.frame(1).unwrap()[0], 1.0);
    }

    #[test]
    fn rejects_mixed_sizes_and_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_frames(dir.path()), Err(FrameIoError::NoImages(_))));
        write_png(&dir.path().join("a.png"), 3, 2, 0);
        write_png(&dir.path().join("b.png"), 2, 2, 0);
        assert!(matches!(load_frames(dir.path()), Err(FrameIoError::ShapeMismatch { .. })));
    }

    #[test]
    fn saved_frames_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let shape = FrameShape::new(2, 2, 3).unwrap();
        let frames = FrameBatch::from_bytes(shape, &[255; 24]).unwrap();
        let written = save_frames(&frames, &dir.path().join("out"), "frame", ImageFormat::Png).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("frame_00001.png"));
        assert_eq!(load_frames(&dir.path().join("out")).unwrap(), frames);
    }

    #[test]
    fn parses_format_names() {
        assert_eq!(ImageFormat::from_str("png").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::from_str("jpeg").unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::Jpg.to_string(), "jpg");
    }
}
