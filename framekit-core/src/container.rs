//! Temporary y4m container used to hand a frame batch to a scene detector.
//!
//! Frames are written as 8-bit 4:4:4 full-range BT.601 Y'CbCr. The file
//! lives exactly as long as its [`TempContainer`] guard.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use tempfile::{Builder, TempPath};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{frames::FrameBatch, timecode::FrameRate};

const TEMP_PREFIX: &str = "scenedetect_";
const TEMP_SUFFIX: &str = ".y4m";

/// Owns the on-disk container. The file is removed when the guard drops.
#[must_use = "dropping the container deletes the file"]
#[derive(Debug)]
pub struct TempContainer {
    path:       Option<TempPath>,
    frames:     usize,
    frame_rate: FrameRate,
}

impl TempContainer {
    #[inline]
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }
}

impl Drop for TempContainer {
    #[inline]
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => trace!("Removed temporary container {}", shown),
                Err(err) => warn!("Could not delete temporary container {}: {}", shown, err),
            }
        }
    }
}

/// Serialize `frames` into a fresh temporary y4m file.
#[inline]
pub fn write_container(
    frames: &FrameBatch,
    frame_rate: FrameRate,
) -> Result<TempContainer, ContainerError> {
    write_container_to(frames, frame_rate, None)
}

/// Like [`write_container`], but creates the file inside `directory`.
#[inline]
pub fn write_container_in(
    frames: &FrameBatch,
    frame_rate: FrameRate,
    directory: &Path,
) -> Result<TempContainer, ContainerError> {
    write_container_to(frames, frame_rate, Some(directory))
}

fn write_container_to(
    frames: &FrameBatch,
    frame_rate: FrameRate,
    directory: Option<&Path>,
) -> Result<TempContainer, ContainerError> {
    if frames.is_empty() {
        return Err(ContainerError::EmptyBatch);
    }
    let shape = frames.shape();
    if shape.is_degenerate() {
        return Err(ContainerError::DegenerateFrames {
            width:  shape.width,
            height: shape.height,
        });
    }

    let mut builder = Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
    let file = match directory {
        Some(directory) => builder.tempfile_in(directory),
        None => builder.tempfile(),
    }
    .map_err(ContainerError::Create)?;
    let (file, path) = file.into_parts();
    // From here on `container` owns the path, so any early return removes it.
    let container = TempContainer {
        path: Some(path),
        frames: frames.len(),
        frame_rate,
    };
    debug!(
        "Writing {} frames ({}) at {} fps to {}",
        frames.len(),
        shape,
        frame_rate,
        container.path().display()
    );

    let mut writer = BufWriter::new(file);
    let mut encoder = y4m::encode(
        shape.width,
        shape.height,
        y4m::Ratio::new(frame_rate.num, frame_rate.den),
    )
    .with_colorspace(y4m::Colorspace::C444)
    .write_header(&mut writer)
    .map_err(|err| ContainerError::Y4m(format!("{err:?}")))?;

    let pixels = shape.pixels();
    let mut planes = [vec![0u8; pixels], vec![0u8; pixels], vec![0u8; pixels]];
    for index in 0..frames.len() {
        let rgb = frames.frame_rgb8(index).ok_or(ContainerError::MissingFrame(index))?;
        for (i, pixel) in rgb.chunks_exact(3).enumerate() {
            let (y, cb, cr) = rgb_to_ycbcr(pixel[0], pixel[1], pixel[2]);
            planes[0][i] = y;
            planes[1][i] = cb;
            planes[2][i] = cr;
        }
        encoder
            .write_frame(&y4m::Frame::new(
                [planes[0].as_slice(), planes[1].as_slice(), planes[2].as_slice()],
                None,
            ))
            .map_err(|err| ContainerError::Y4m(format!("{err:?}")))?;
    }
    drop(encoder);
    writer.flush().map_err(ContainerError::Write)?;

    Ok(container)
}

/// Stream the frames of a y4m file as packed RGB8.
///
/// The callback receives the frame index and the pixels of each frame.
#[inline]
pub fn read_container<F>(path: &Path, mut on_frame: F) -> Result<ContainerInfo, ContainerError>
where
    F: FnMut(usize, &[u8]) -> Result<(), ContainerError>,
{
    let file = File::open(path).map_err(ContainerError::Open)?;
    let mut decoder = y4m::decode(BufReader::new(file))
        .map_err(|err| ContainerError::Y4m(format!("{err:?}")))?;
    if !matches!(decoder.get_colorspace(), y4m::Colorspace::C444) {
        return Err(ContainerError::UnsupportedColorspace(format!(
            "{:?}",
            decoder.get_colorspace()
        )));
    }

    let width = decoder.get_width();
    let height = decoder.get_height();
    let rate = decoder.get_framerate();
    let frame_rate = FrameRate::new(rate.num, rate.den)
        .map_err(|err| ContainerError::Y4m(err.to_string()))?;

    let mut rgb = vec![0u8; width * height * 3];
    let mut frames = 0;
    loop {
        let frame = match decoder.read_frame() {
            Ok(frame) => frame,
            Err(y4m::Error::EOF) => break,
            Err(err) => return Err(ContainerError::Y4m(format!("{err:?}"))),
        };
        let planes = frame
            .get_y_plane()
            .iter()
            .zip(frame.get_u_plane())
            .zip(frame.get_v_plane());
        for (pixel, ((&y, &cb), &cr)) in rgb.chunks_exact_mut(3).zip(planes) {
            let (r, g, b) = ycbcr_to_rgb(y, cb, cr);
            pixel.copy_from_slice(&[r, g, b]);
        }
        on_frame(frames, &rgb)?;
        frames += 1;
    }

    Ok(ContainerInfo {
        width,
        height,
        frames,
        frame_rate,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    pub width:      usize,
    pub height:     usize,
    pub frames:     usize,
    pub frame_rate: FrameRate,
}

/// Full-range BT.601 (JFIF) forward transform.
#[inline]
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (clamp_u8(y), clamp_u8(cb), clamp_u8(cr))
}

#[inline]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> (u8, u8, u8) {
    let (y, cb, cr) = (f64::from(y), f64::from(cb) - 128.0, f64::from(cr) - 128.0);
    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    (clamp_u8(r), clamp_u8(g), clamp_u8(b))
}

fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Empty image batch")]
    EmptyBatch,
    #[error("Cannot encode frames of size {width}x{height}")]
    DegenerateFrames { width: usize, height: usize },
    #[error("Frame {0} missing from batch")]
    MissingFrame(usize),
    #[error("Could not create temporary container: {0}")]
    Create(#[source] std::io::Error),
    #[error("Could not write temporary container: {0}")]
    Write(#[source] std::io::Error),
    #[error("Could not open container: {0}")]
    Open(#[source] std::io::Error),
    #[error("y4m stream error: {0}")]
    Y4m(String),
    #[error("Unsupported y4m colorspace {0}, expected 4:4:4")]
    UnsupportedColorspace(String),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::frames::FrameShape;

    fn solid_rgb(frames: &[[u8; 3]], height: usize, width: usize) -> FrameBatch {
        let shape = FrameShape::new(height, width, 3).unwrap();
        let bytes: Vec<u8> = frames
            .iter()
            .flat_map(|color| color.iter().copied().cycle().take(height * width * 3))
            .collect();
        FrameBatch::from_bytes(shape, &bytes).unwrap()
    }

    #[test]
    fn ycbcr_round_trip_stays_close() {
        for (r, g, b) in [(0, 0, 0), (255, 255, 255), (10, 200, 90), (255, 0, 0)] {
            let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
            let (r2, g2, b2) = ycbcr_to_rgb(y, cb, cr);
            assert!(r.abs_diff(r2) <= 2, "{r} vs {r2}");
            assert!(g.abs_diff(g2) <= 2, "{g} vs {g2}");
            assert!(b.abs_diff(b2) <= 2, "{b} vs {b2}");
        }
    }

    #[test]
    fn writes_and_reads_back_frames() {
        let batch = solid_rgb(&[[0, 0, 0], [255, 255, 255], [0, 0, 255]], 4, 6);
        let container = write_container(&batch, FrameRate::new(25, 1).unwrap()).unwrap();
        assert_eq!(container.frames(), 3);

        let mut first_pixels = Vec::new();
        let info = read_container(container.path(), |_, rgb| {
            first_pixels.push([rgb[0], rgb[1], rgb[2]]);
            Ok(())
        })
        .unwrap();

        assert_eq!(info.width, 6);
        assert_eq!(info.height, 4);
        assert_eq!(info.frames, 3);
        assert_eq!(info.frame_rate, FrameRate::new(25, 1).unwrap());
        assert_eq!(first_pixels[0], [0, 0, 0]);
        assert_eq!(first_pixels[1], [255, 255, 255]);
        assert!(first_pixels[2][2] >= 253 && first_pixels[2][0] <= 2);
    }

    #[test]
    fn file_is_removed_when_guard_drops() {
        let batch = solid_rgb(&[[1, 2, 3]], 2, 2);
        let container = write_container(&batch, FrameRate::default()).unwrap();
        let path: PathBuf = container.path().to_path_buf();
        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)));
        drop(container);
        assert!(!path.exists());
    }

    #[test]
    fn container_is_created_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let batch = solid_rgb(&[[9, 9, 9]], 2, 2);
        let container = write_container_in(&batch, FrameRate::default(), dir.path()).unwrap();
        assert_eq!(container.path().parent(), Some(dir.path()));

        let missing = dir.path().join("missing");
        assert!(matches!(
            write_container_in(&batch, FrameRate::default(), &missing),
            Err(ContainerError::Create(_))
        ));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let shape = FrameShape::new(2, 2, 3).unwrap();
        assert!(matches!(
            write_container(&FrameBatch::empty(shape), FrameRate::default()),
            Err(ContainerError::EmptyBatch)
        ));
    }
}
