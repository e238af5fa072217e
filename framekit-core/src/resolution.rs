//! Largest model-friendly frame size that fits a VRAM budget.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixels per frame per GB of VRAM, spread over the whole clip.
pub const PIXELS_PER_GB: f64 = 6.1e6;
/// Output sides are floored to this multiple.
pub const SIDE_MULTIPLE: usize = 16;
pub const DEFAULT_VRAM_GB: f64 = 24.0;
pub const DEFAULT_FRAME_COUNT: usize = 16;
pub const DEFAULT_ASPECT_RATIO: f64 = 1.147;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub vram_gb:           f64,
    pub frame_count:       usize,
    /// `0` asks for the largest size the budget allows.
    pub target_megapixels: f64,
    pub aspect_ratio:      f64,
}

impl Default for ResolutionRequest {
    #[inline]
    fn default() -> Self {
        Self {
            vram_gb:           DEFAULT_VRAM_GB,
            frame_count:       DEFAULT_FRAME_COUNT,
            target_megapixels: 0.0,
            aspect_ratio:      DEFAULT_ASPECT_RATIO,
        }
    }
}

impl ResolutionRequest {
    /// Take frame count and aspect ratio from existing footage.
    #[inline]
    #[must_use]
    pub fn with_source(mut self, frames: usize, width: usize, height: usize) -> Self {
        self.frame_count = frames;
        if height > 0 {
            self.aspect_ratio = width as f64 / height as f64;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width:       usize,
    pub height:      usize,
    pub frame_count: usize,
    pub info:        String,
}

#[inline]
pub fn calculate_resolution(request: &ResolutionRequest) -> Result<Resolution, ResolutionError> {
    let ResolutionRequest {
        vram_gb,
        frame_count,
        target_megapixels,
        aspect_ratio,
    } = *request;
    if !(vram_gb.is_finite() && vram_gb > 0.0) {
        return Err(ResolutionError::InvalidVram(vram_gb));
    }
    if frame_count == 0 {
        return Err(ResolutionError::NoFrames);
    }
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        return Err(ResolutionError::InvalidAspectRatio(aspect_ratio));
    }
    if !(target_megapixels.is_finite() && target_megapixels >= 0.0) {
        return Err(ResolutionError::InvalidTarget(target_megapixels));
    }

    let max_pixels = vram_gb * PIXELS_PER_GB / frame_count as f64;
    let (pixels, message) = if target_megapixels > 0.0 {
        let target = target_megapixels * 1e6;
        if target > max_pixels {
            (
                max_pixels,
                format!(
                    "Target {:.1}MP exceeds VRAM limit. Capped to {:.2}MP per frame.",
                    target_megapixels,
                    max_pixels / 1e6
                ),
            )
        } else {
            (
                target,
                format!("Target {:.1}MP achieved within VRAM limit.", target_megapixels),
            )
        }
    } else {
        (
            max_pixels,
            format!(
                "Maximum resolution calculated: {:.2}MP per frame.",
                max_pixels / 1e6
            ),
        )
    };

    let height = (pixels / aspect_ratio).sqrt();
    let width = height * aspect_ratio;
    let width = floor_to_multiple(width);
    let height = floor_to_multiple(height);

    let megapixels = (width * height) as f64 / 1e6;
    let total = megapixels * frame_count as f64;
    let vram = total / (PIXELS_PER_GB / 1e6);
    let info = format!(
        "{} Final: {}x{} ({:.2}MP), {} frames, Total: {:.1}MP, Est. VRAM: {:.1}GB",
        message, width, height, megapixels, frame_count, total, vram
    );

    Ok(Resolution {
        width,
        height,
        frame_count,
        info,
    })
}

fn floor_to_multiple(value: f64) -> usize {
    (value / SIDE_MULTIPLE as f64).floor() as usize * SIDE_MULTIPLE
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("VRAM must be a positive number of GB, got {0}")]
    InvalidVram(f64),
    #[error("Frame count must be at least 1")]
    NoFrames,
    #[error("Aspect ratio must be positive, got {0}")]
    InvalidAspectRatio(f64),
    #[error("Target megapixels must not be negative, got {0}")]
    InvalidTarget(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximum_for_default_budget() {
        let result = calculate_resolution(&ResolutionRequest::default()).unwrap();
        // 24 * 6.1e6 / 16 = 9.15e6 px; h = sqrt(9.15e6 / 1.147) = 2824.4.
        assert_eq!(result.width, 3232);
        assert_eq!(result.height, 2816);
        assert_eq!(result.frame_count, 16);
        assert!(result
            .info
            .starts_with("Maximum resolution calculated: 9.15MP per frame. Final: 3232x2816"));
    }

    #[test]
    fn target_within_budget_is_used() {
        let request = ResolutionRequest {
            target_megapixels: 1.0,
            aspect_ratio: 1.0,
            ..ResolutionRequest::default()
        };
        let result = calculate_resolution(&request).unwrap();
        assert_eq!((result.width, result.height), (992, 992));
        assert_eq!(
            result.info,
            "Target 1.0MP achieved within VRAM limit. Final: 992x992 (0.98MP), 16 frames, \
             Total: 15.7MP, Est. VRAM: 2.6GB"
        );
    }

    #[test]
    fn target_over_budget_is_capped() {
        let request = ResolutionRequest {
            vram_gb: 8.0,
            frame_count: 81,
            target_megapixels: 2.0,
            aspect_ratio: 16.0 / 9.0,
        };
        let result = calculate_resolution(&request).unwrap();
        assert!(result
            .info
            .starts_with("Target 2.0MP exceeds VRAM limit. Capped to 0.60MP per frame."));
        assert_eq!(result.width % SIDE_MULTIPLE, 0);
        assert_eq!(result.height % SIDE_MULTIPLE, 0);
        assert!((result.width * result.height) as f64 <= 8.0 * PIXELS_PER_GB / 81.0);
    }

    #[test]
    fn source_overrides_frames_and_aspect() {
        let request = ResolutionRequest::default().with_source(33, 1280, 720);
        assert_eq!(request.frame_count, 33);
        assert!((request.aspect_ratio - 1280.0 / 720.0).abs() < 1e-12);
        let result = calculate_resolution(&request).unwrap();
        assert_eq!(result.frame_count, 33);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let base = ResolutionRequest::default();
        assert!(matches!(
            calculate_resolution(&ResolutionRequest {
                vram_gb: 0.0,
                ..base
            }),
            Err(ResolutionError::InvalidVram(_))
        ));
        assert!(matches!(
            calculate_resolution(&ResolutionRequest {
                frame_count: 0,
                ..base
            }),
            Err(ResolutionError::NoFrames)
        ));
        assert!(matches!(
            calculate_resolution(&ResolutionRequest {
                aspect_ratio: -1.0,
                ..base
            }),
            Err(ResolutionError::InvalidAspectRatio(_))
        ));
    }
}
