use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Height, width and channel count shared by every frame of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub height:   usize,
    pub width:    usize,
    pub channels: usize,
}

impl FrameShape {
    #[inline]
    pub fn new(height: usize, width: usize, channels: usize) -> Result<Self, FrameError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(FrameError::UnsupportedChannels(channels));
        }

        Ok(Self {
            height,
            width,
            channels,
        })
    }

    /// Number of samples in a single frame.
    #[inline]
    pub fn samples(&self) -> usize {
        self.height * self.width * self.channels
    }

    #[inline]
    pub fn pixels(&self) -> usize {
        self.height * self.width
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

impl std::fmt::Display for FrameShape {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// An ordered batch of equally shaped frames.
///
/// Frames are stored contiguously in height × width × channel order as
/// `f32` samples, nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    shape: FrameShape,
    data:  Vec<f32>,
}

impl FrameBatch {
    #[inline]
    pub fn new(shape: FrameShape, data: Vec<f32>) -> Result<Self, FrameError> {
        let samples = shape.samples();
        if samples == 0 {
            if !data.is_empty() {
                return Err(FrameError::DataLength {
                    len: data.len(),
                    shape,
                });
            }
        } else if data.len() % samples != 0 {
            return Err(FrameError::DataLength {
                len: data.len(),
                shape,
            });
        }

        Ok(Self {
            shape,
            data,
        })
    }

    #[inline]
    pub fn empty(shape: FrameShape) -> Self {
        Self {
            shape,
            data: Vec::new(),
        }
    }

    /// Build a batch from 8-bit samples, scaling them into `[0, 1]`.
    #[inline]
    pub fn from_bytes(shape: FrameShape, bytes: &[u8]) -> Result<Self, FrameError> {
        Self::new(shape, bytes.iter().map(|&b| f32::from(b) / 255.0).collect())
    }

    /// Build a batch frame by frame. Every frame must match `shape`.
    #[inline]
    pub fn from_frames<I, F>(shape: FrameShape, frames: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[f32]>,
    {
        let mut batch = Self::empty(shape);
        for frame in frames {
            batch.push(frame.as_ref())?;
        }
        Ok(batch)
    }

    #[inline]
    pub fn push(&mut self, frame: &[f32]) -> Result<(), FrameError> {
        if frame.len() != self.shape.samples() {
            return Err(FrameError::FrameLength {
                len:      frame.len(),
                expected: self.shape.samples(),
            });
        }
        self.data.extend_from_slice(frame);
        Ok(())
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self.shape.samples() {
            0 => 0,
            samples => self.data.len() / samples,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let samples = self.shape.samples();
        let start = index.checked_mul(samples)?;
        self.data.get(start..start + samples)
    }

    #[inline]
    pub fn frame_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let samples = self.shape.samples();
        let start = index.checked_mul(samples)?;
        self.data.get_mut(start..start + samples)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.shape.samples().max(1))
    }

    /// Copy out a contiguous range of frames, clamped to the batch.
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> Self {
        let len = self.len();
        let end = range.end.min(len);
        let start = range.start.min(end);
        let samples = self.shape.samples();
        Self {
            shape: self.shape,
            data:  self.data[start * samples..end * samples].to_vec(),
        }
    }

    /// Copy out the frames at `indices`, in the given order.
    #[inline]
    pub fn select(&self, indices: &[usize]) -> Result<Self, FrameError> {
        let mut batch = Self::empty(self.shape);
        batch.data.reserve(indices.len() * self.shape.samples());
        for &index in indices {
            let frame = self.frame(index).ok_or(FrameError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
            batch.data.extend_from_slice(frame);
        }
        Ok(batch)
    }

    /// Rescale `[0, 255]` data into `[0, 1]`. Batches already in range are
    /// returned unchanged.
    #[inline]
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.data.iter().any(|&v| v > 1.0) {
            for v in &mut self.data {
                *v /= 255.0;
            }
        }
        self
    }

    /// 8-bit RGB view of one frame. Gray is replicated, alpha is dropped.
    #[inline]
    pub fn frame_rgb8(&self, index: usize) -> Option<Vec<u8>> {
        let frame = self.frame(index)?;
        let channels = self.shape.channels;
        let mut rgb = Vec::with_capacity(self.shape.pixels() * 3);
        for pixel in frame.chunks_exact(channels) {
            match channels {
                1 => {
                    let v = to_u8(pixel[0]);
                    rgb.extend_from_slice(&[v, v, v]);
                },
                _ => rgb.extend(pixel[..3].iter().map(|&v| to_u8(v))),
            }
        }
        Some(rgb)
    }

    /// 8-bit grayscale view of one frame.
    #[inline]
    pub fn frame_gray8(&self, index: usize) -> Option<Vec<u8>> {
        let frame = self.frame(index)?;
        let channels = self.shape.channels;
        Some(
            frame
                .chunks_exact(channels)
                .map(|pixel| match channels {
                    1 => to_u8(pixel[0]),
                    _ => rgb_to_gray(to_u8(pixel[0]), to_u8(pixel[1]), to_u8(pixel[2])),
                })
                .collect(),
        )
    }
}

/// Truncating conversion of a `[0, 1]` sample to 8 bits.
#[inline]
pub fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// ITU-R BT.601 luma, rounded.
#[inline]
pub fn rgb_to_gray(r: u8, g: u8, b: u8) -> u8 {
    let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    luma.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Unsupported channel count {0}, expected 1, 3 or 4")]
    UnsupportedChannels(usize),
    #[error("Sample buffer of length {len} does not divide into frames of shape {shape}")]
    DataLength { len: usize, shape: FrameShape },
    #[error("Frame has {len} samples, expected {expected}")]
    FrameLength { len: usize, expected: usize },
    #[error("Frame index {index} out of range for a batch of {len} frames")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_batch(values: &[f32]) -> FrameBatch {
        let shape = FrameShape::new(1, 1, 1).unwrap();
        FrameBatch::new(shape, values.to_vec()).unwrap()
    }

    #[test]
    fn rejects_unsupported_channels() {
        assert!(matches!(
            FrameShape::new(2, 2, 2),
            Err(FrameError::UnsupportedChannels(2))
        ));
    }

    #[test]
    fn rejects_ragged_data() {
        let shape = FrameShape::new(2, 2, 3).unwrap();
        assert!(FrameBatch::new(shape, vec![0.0; 13]).is_err());
        assert_eq!(FrameBatch::new(shape, vec![0.0; 24]).unwrap().len(), 2);
    }

    #[test]
    fn push_checks_frame_length() {
        let shape = FrameShape::new(1, 2, 1).unwrap();
        let mut batch = FrameBatch::empty(shape);
        assert!(batch.push(&[0.5]).is_err());
        batch.push(&[0.5, 0.25]).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.frame(0), Some(&[0.5, 0.25][..]));
    }

    #[test]
    fn slice_is_clamped() {
        let batch = gray_batch(&[0.0, 0.1, 0.2, 0.3]);
        assert_eq!(batch.slice(2..10).as_slice(), &[0.2, 0.3]);
        assert!(batch.slice(7..9).is_empty());
    }

    #[test]
    fn select_keeps_order_and_duplicates() {
        let batch = gray_batch(&[0.0, 0.1, 0.2, 0.3]);
        let picked = batch.select(&[3, 0, 3]).unwrap();
        assert_eq!(picked.as_slice(), &[0.3, 0.0, 0.3]);
        assert!(matches!(
            batch.select(&[4]),
            Err(FrameError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn normalizes_byte_range() {
        let batch = gray_batch(&[0.0, 255.0]).normalized();
        assert_eq!(batch.as_slice(), &[0.0, 1.0]);
        let unit = gray_batch(&[0.0, 0.5]).normalized();
        assert_eq!(unit.as_slice(), &[0.0, 0.5]);
    }

    #[test]
    fn rgb8_view_replicates_gray_and_drops_alpha() {
        let gray = gray_batch(&[1.0]);
        assert_eq!(gray.frame_rgb8(0).unwrap(), vec![255, 255, 255]);

        let shape = FrameShape::new(1, 1, 4).unwrap();
        let rgba = FrameBatch::new(shape, vec![1.0, 0.0, 0.5, 0.25]).unwrap();
        assert_eq!(rgba.frame_rgb8(0).unwrap(), vec![255, 0, 127]);
    }

    #[test]
    fn gray8_uses_bt601_weights() {
        let shape = FrameShape::new(1, 1, 3).unwrap();
        let red = FrameBatch::new(shape, vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(red.frame_gray8(0).unwrap(), vec![76]);
    }
}
