//! Frame sharpness from the variance of the Laplacian.

use thiserror::Error;
use tracing::debug;

use crate::frames::FrameBatch;

/// Population variance of the 4-neighbour Laplacian of an 8-bit gray image.
///
/// Borders are reflected without repeating the edge pixel. Higher means
/// sharper.
#[inline]
pub fn laplacian_variance(gray: &[u8], width: usize, height: usize) -> f64 {
    let pixels = width * height;
    if pixels == 0 || gray.len() < pixels {
        return 0.0;
    }
    let at = |row: isize, col: isize| -> f64 {
        let r = reflect_101(row, height);
        let c = reflect_101(col, width);
        f64::from(gray[r * width + c])
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for row in 0..height as isize {
        for col in 0..width as isize {
            let response = at(row - 1, col) + at(row + 1, col) + at(row, col - 1) + at(row, col + 1)
                - 4.0 * at(row, col);
            sum += response;
            sum_sq += response * response;
        }
    }
    let n = pixels as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn reflect_101(index: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let mut index = index;
    if index < 0 {
        index = -index;
    }
    if index >= len {
        index = 2 * len - 2 - index;
    }
    index.clamp(0, len - 1) as usize
}

/// Sharpness of every frame in the batch.
#[inline]
pub fn sharpness_scores(frames: &FrameBatch) -> Vec<f64> {
    let shape = frames.shape();
    (0..frames.len())
        .filter_map(|index| frames.frame_gray8(index))
        .map(|gray| laplacian_variance(&gray, shape.width, shape.height))
        .collect()
}

/// Index of the sharpest frame; the earliest wins ties.
#[inline]
pub fn sharpest_frame(frames: &FrameBatch) -> Option<usize> {
    let scores = sharpness_scores(frames);
    let best = first_max(&scores, 0..scores.len());
    if let Some(index) = best {
        debug!("Sharpest of {} frames is {}", scores.len(), index);
    }
    best
}

/// Sample every `interval` frames, swapping each sample for the sharpest
/// frame in a `window`-wide neighbourhood around it.
#[inline]
pub fn select_sharpest(
    frames: &FrameBatch,
    interval: usize,
    window: usize,
) -> Result<Vec<usize>, SharpnessError> {
    if interval == 0 {
        return Err(SharpnessError::ZeroInterval);
    }
    if window == 0 {
        return Err(SharpnessError::ZeroWindow);
    }

    let scores = sharpness_scores(frames);
    let total = scores.len();
    let half = window / 2;
    let selected: Vec<usize> = (0..total)
        .step_by(interval)
        .map(|center| {
            let start = center.saturating_sub(half);
            let end = total.min(center + half + window % 2);
            first_max(&scores, start..end).unwrap_or(center)
        })
        .collect();
    debug!(
        "Selected {} of {} frames (interval {}, window {})",
        selected.len(),
        total,
        interval,
        window
    );
    Ok(selected)
}

fn first_max(scores: &[f64], range: std::ops::Range<usize>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for index in range {
        let Some(&score) = scores.get(index) else {
            break;
        };
        match best {
            Some((_, best_score)) if score <= best_score => {},
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

#[derive(Debug, Error)]
pub enum SharpnessError {
    #[error("Interval must be at least 1")]
    ZeroInterval,
    #[error("Window size must be at least 1")]
    ZeroWindow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FrameShape;

    fn flat(value: u8) -> Vec<u8> {
        vec![value; 16]
    }

    fn checker() -> Vec<u8> {
        (0..16).map(|i| if (i / 4 + i % 4) % 2 == 0 { 255 } else { 0 }).collect()
    }

    fn batch_of(frames: &[Vec<u8>]) -> FrameBatch {
        let shape = FrameShape::new(4, 4, 1).unwrap();
        let bytes: Vec<u8> = frames.concat();
        FrameBatch::from_bytes(shape, &bytes).unwrap()
    }

    #[test]
    fn flat_image_has_no_variance() {
        assert_eq!(laplacian_variance(&flat(128), 4, 4), 0.0);
        assert_eq!(laplacian_variance(&[], 0, 0), 0.0);
        assert_eq!(laplacian_variance(&[9], 1, 1), 0.0);
    }

    #[test]
    fn single_spike_matches_hand_computation() {
        // 3x3 with a 4 in the middle; reflect-101 mirrors the spike onto
        // the edges.
        let gray = [0, 0, 0, 0, 4, 0, 0, 0, 0];
        // Responses: corners 0, edges 8, center -16.
        let responses = [0.0, 8.0, 0.0, 8.0, -16.0, 8.0, 0.0, 8.0, 0.0];
        let mean: f64 = responses.iter().sum::<f64>() / 9.0;
        let expected = responses.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / 9.0;
        assert!((laplacian_variance(&gray, 3, 3) - expected).abs() < 1e-9);
    }

    #[test]
    fn reflect_101_skips_the_edge() {
        assert_eq!(reflect_101(-1, 4), 1);
        assert_eq!(reflect_101(4, 4), 2);
        assert_eq!(reflect_101(2, 4), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }

    #[test]
    fn picks_the_sharp_frame() {
        let frames = batch_of(&[flat(10), checker(), flat(200)]);
        assert_eq!(sharpest_frame(&frames), Some(1));
    }

    #[test]
    fn ties_go_to_the_earliest_frame() {
        let frames = batch_of(&[flat(10), flat(20), flat(30)]);
        assert_eq!(sharpest_frame(&frames), Some(0));
        assert_eq!(sharpest_frame(&FrameBatch::empty(frames.shape())), None);
    }

    #[test]
    fn selects_sharpest_within_each_window() {
        let mut frames = vec![flat(0); 10];
        frames[1] = checker();
        frames[6] = checker();
        let batch = batch_of(&frames);
        // Centers 0, 4, 8 with window 3: [0,2), [3,6), [7,10).
        assert_eq!(select_sharpest(&batch, 4, 3).unwrap(), vec![1, 3, 7]);
        // Window 4: [0,2), [2,6), [6,10).
        assert_eq!(select_sharpest(&batch, 4, 4).unwrap(), vec![1, 2, 6]);
    }

    #[test]
    fn selection_may_repeat_frames() {
        let mut frames = vec![flat(0); 4];
        frames[1] = checker();
        let batch = batch_of(&frames);
        assert_eq!(select_sharpest(&batch, 1, 3).unwrap(), vec![1, 1, 1, 2]);
    }

    #[test]
    fn rejects_zero_interval_and_window() {
        let batch = batch_of(&[flat(0)]);
        assert!(matches!(select_sharpest(&batch, 0, 3), Err(SharpnessError::ZeroInterval)));
        assert!(matches!(select_sharpest(&batch, 1, 0), Err(SharpnessError::ZeroWindow)));
    }
}
