use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    container::read_container,
    timecode::{FrameRate, Timecode},
};

pub const DEFAULT_MIN_SCENE_LEN: usize = 15;

/// Ordered `(start, end)` pairs, where each `end` is the start of the next
/// scene.
pub type SceneList = Vec<(Timecode, Timecode)>;

/// Something that can find scene boundaries in an encoded container.
pub trait SceneDetector {
    fn detect_scenes(&mut self, container: &Path, threshold: f64) -> Result<SceneList>;
}

impl<D: SceneDetector + ?Sized> SceneDetector for &mut D {
    #[inline]
    fn detect_scenes(&mut self, container: &Path, threshold: f64) -> Result<SceneList> {
        (**self).detect_scenes(container, threshold)
    }
}

impl<D: SceneDetector + ?Sized> SceneDetector for Box<D> {
    #[inline]
    fn detect_scenes(&mut self, container: &Path, threshold: f64) -> Result<SceneList> {
        (**self).detect_scenes(container, threshold)
    }
}

/// Relative weight of each HSV component in the frame score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub hue:        f64,
    pub saturation: f64,
    pub luma:       f64,
}

impl Default for ComponentWeights {
    #[inline]
    fn default() -> Self {
        Self {
            hue:        1.0,
            saturation: 1.0,
            luma:       1.0,
        }
    }
}

impl ComponentWeights {
    #[inline]
    pub fn total(&self) -> f64 {
        self.hue + self.saturation + self.luma
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentDetectorOptions {
    /// Minimum distance, in frames, between two cuts.
    pub min_scene_len: usize,
    pub weights:       ComponentWeights,
}

impl Default for ContentDetectorOptions {
    #[inline]
    fn default() -> Self {
        Self {
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            weights:       ComponentWeights::default(),
        }
    }
}

/// Content-difference detector.
///
/// Scores every frame by the weighted mean absolute HSV difference to the
/// previous frame and cuts where the score reaches the threshold, keeping
/// cuts at least `min_scene_len` frames apart.
#[derive(Debug, Clone, Default)]
pub struct ContentDetector {
    pub options: ContentDetectorOptions,
    scores:      Vec<f64>,
}

impl ContentDetector {
    #[inline]
    pub fn new(options: ContentDetectorOptions) -> Self {
        Self {
            options,
            scores: Vec::new(),
        }
    }

    /// Frame scores from the last run. Frame 0 has no score.
    #[inline]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    fn score(&self, previous: &[[u8; 3]], current: &[[u8; 3]]) -> f64 {
        let pixels = current.len().max(1) as f64;
        let mut sums = [0u64; 3];
        for (a, b) in previous.iter().zip(current) {
            for channel in 0..3 {
                sums[channel] += u64::from(a[channel].abs_diff(b[channel]));
            }
        }
        let [hue, saturation, luma] = sums.map(|sum| sum as f64 / pixels);
        let weights = self.options.weights;
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        (hue * weights.hue + saturation * weights.saturation + luma * weights.luma) / total
    }
}

impl SceneDetector for ContentDetector {
    #[tracing::instrument(level = "debug", skip(self))]
    #[inline]
    fn detect_scenes(&mut self, container: &Path, threshold: f64) -> Result<SceneList> {
        ensure!(
            self.options.weights.total() > 0.0,
            "content detector weights must not all be zero"
        );
        self.scores.clear();

        let min_scene_len = self.options.min_scene_len;
        let mut previous: Vec<[u8; 3]> = Vec::new();
        let mut current: Vec<[u8; 3]> = Vec::new();
        let mut cuts: Vec<usize> = Vec::new();
        let mut last_cut = 0;

        let info = read_container(container, |index, rgb| {
            current.clear();
            current.extend(rgb.chunks_exact(3).map(|p| rgb_to_hsv(p[0], p[1], p[2])));
            if index > 0 {
                let score = self.score(&previous, &current);
                trace!("frame {} content score {:.3}", index, score);
                self.scores.push(score);
                if score >= threshold && index - last_cut >= min_scene_len {
                    debug!("Scene cut at frame {} (score {:.3})", index, score);
                    cuts.push(index);
                    last_cut = index;
                }
            }
            std::mem::swap(&mut previous, &mut current);
            Ok(())
        })
        .with_context(|| format!("failed to analyze {}", container.display()))?;

        Ok(scenes_from_cuts(&cuts, info.frames, info.frame_rate))
    }
}

/// Turn cut positions into `(start, end)` pairs covering `[0, frames)`.
/// No cuts means no scenes.
#[inline]
pub fn scenes_from_cuts(cuts: &[usize], frames: usize, frame_rate: FrameRate) -> SceneList {
    if cuts.is_empty() {
        return Vec::new();
    }
    std::iter::once(0)
        .chain(cuts.iter().copied())
        .zip(cuts.iter().copied().chain(std::iter::once(frames)))
        .map(|(start, end)| (Timecode::new(start, frame_rate), Timecode::new(end, frame_rate)))
        .collect()
}

/// 8-bit HSV with hue in `0..180`.
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return [0, 0, max];
    }
    let delta = f64::from(max - min);
    let s = (255.0 * delta / f64::from(max)).round() as u8;
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let mut h = if max == r {
        60.0 * (gf - bf) / delta
    } else if max == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    let h = (h / 2.0).round() as u16 % 180;
    [h as u8, s, max]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        container::write_container,
        frames::{FrameBatch, FrameShape},
    };

    fn solid_batch(colors: &[([u8; 3], usize)]) -> FrameBatch {
        let shape = FrameShape::new(8, 8, 3).unwrap();
        let mut bytes = Vec::new();
        for (color, count) in colors {
            for _ in 0..(count * 64) {
                bytes.extend_from_slice(color);
            }
        }
        FrameBatch::from_bytes(shape, &bytes).unwrap()
    }

    #[test]
    fn hsv_matches_8bit_conventions() {
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(255, 255, 255), [0, 0, 255]);
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
    }

    #[test]
    fn cuts_become_contiguous_scenes() {
        let rate = FrameRate::default();
        let scenes = scenes_from_cuts(&[20, 40], 60, rate);
        let frames: Vec<(usize, usize)> =
            scenes.iter().map(|(s, e)| (s.frame_num(), e.frame_num())).collect();
        assert_eq!(frames, vec![(0, 20), (20, 40), (40, 60)]);
        assert!(scenes_from_cuts(&[], 60, rate).is_empty());
    }

    #[test]
    fn detects_hard_cuts_between_solid_colors() {
        let batch = solid_batch(&[([0, 0, 0], 20), ([255, 255, 255], 20), ([255, 0, 0], 20)]);
        let container = write_container(&batch, FrameRate::default()).unwrap();
        let mut detector = ContentDetector::default();
        let scenes = detector.detect_scenes(container.path(), 27.0).unwrap();
        let frames: Vec<(usize, usize)> =
            scenes.iter().map(|(s, e)| (s.frame_num(), e.frame_num())).collect();
        assert_eq!(frames, vec![(0, 20), (20, 40), (40, 60)]);
        assert_eq!(detector.scores().len(), 59);
    }

    #[test]
    fn min_scene_len_suppresses_close_cuts() {
        let batch = solid_batch(&[([0, 0, 0], 5), ([255, 255, 255], 30)]);
        let container = write_container(&batch, FrameRate::default()).unwrap();
        let mut detector = ContentDetector::default();
        assert!(detector.detect_scenes(container.path(), 27.0).unwrap().is_empty());

        detector.options.min_scene_len = 1;
        let scenes = detector.detect_scenes(container.path(), 27.0).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].0.frame_num(), 5);
    }

    #[test]
    fn high_threshold_finds_nothing() {
        let batch = solid_batch(&[([0, 0, 0], 20), ([255, 255, 255], 20)]);
        let container = write_container(&batch, FrameRate::default()).unwrap();
        let mut detector = ContentDetector::default();
        assert!(detector.detect_scenes(container.path(), 255.0).unwrap().is_empty());
    }

    #[test]
    fn missing_container_is_an_error() {
        let mut detector = ContentDetector::default();
        let err = detector
            .detect_scenes(Path::new("/nonexistent/scenedetect_missing.y4m"), 27.0)
            .unwrap_err();
        assert!(err.to_string().contains("failed to analyze"));
    }
}
