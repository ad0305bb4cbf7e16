//! Non-Maximum Averaging.
//!
//! Single-Shot MultiBox Detectors (SSD) produce many duplicate detections for individual objects.
//! Non-Maximum Suppression (NMS) filters these duplicates out, leaving only a single detection
//! with high confidence for each object.
//!
//! The variant implemented here replaces each group of overlapping detections with their
//! confidence-weighted average instead of just keeping the most confident one, which reduces
//! jitter between frames.

use crate::{num::TotalF32, rect::Rect};

use super::{Keypoint, RawDetection};

/// Intersection-over-union threshold above which two detections are considered overlapping.
const IOU_THRESH: f32 = 0.3;

/// A non-maximum suppression algorithm that averages overlapping detections.
pub struct NonMaxSuppression {
    seed_thresh: f32,
    avg_buf: Vec<RawDetection>,
}

impl NonMaxSuppression {
    /// Creates a new non-maximum suppressor.
    ///
    /// # Parameters
    ///
    /// - `seed_thresh`: required detection confidence to "seed" an NMS round with a detection.
    pub fn new(seed_thresh: f32) -> Self {
        Self {
            seed_thresh,
            avg_buf: Vec::new(),
        }
    }

    /// Filters `detections`, returning the averaged detections ordered by descending confidence.
    ///
    /// `detections` is drained in the process.
    pub fn process(&mut self, detections: &mut Vec<RawDetection>) -> Vec<RawDetection> {
        let mut out = Vec::new();

        // Sort by ascending confidence, process highest confidence first by starting at the back.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

        while let Some(seed) = detections.pop() {
            if seed.confidence() < self.seed_thresh {
                // no more significant detections left
                break;
            }

            let seed_rect = seed.bounding_rect();
            self.avg_buf.clear();
            let mut i = 0;
            while i < detections.len() {
                if seed_rect.iou(&detections[i].bounding_rect()) >= IOU_THRESH {
                    self.avg_buf.push(detections.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            // `swap_remove` scrambles the order
            detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

            self.avg_buf.push(seed.clone());
            out.push(weighted_average(seed.confidence(), &self.avg_buf));
        }

        detections.clear();
        out
    }
}

/// Computes the confidence-weighted average of the rectangles and keypoints of `dets`.
fn weighted_average(confidence: f32, dets: &[RawDetection]) -> RawDetection {
    let keypoint_count = dets.iter().map(|d| d.keypoints().len()).min().unwrap_or(0);
    let mut keypoints = vec![[0.0f32; 2]; keypoint_count];
    let [mut xc, mut yc, mut w, mut h] = [0.0f32; 4];
    let mut divisor = 0.0;

    for det in dets {
        let factor = det.confidence();
        divisor += factor;
        for (acc, kp) in keypoints.iter_mut().zip(det.keypoints()) {
            acc[0] += kp.x() * factor;
            acc[1] += kp.y() * factor;
        }
        let rect = det.bounding_rect();
        xc += rect.x_center() * factor;
        yc += rect.y_center() * factor;
        w += rect.width() * factor;
        h += rect.height() * factor;
    }

    if divisor <= 0.0 {
        return dets[dets.len() - 1].clone();
    }

    RawDetection::with_keypoints(
        confidence,
        Rect::from_center(xc / divisor, yc / divisor, w / divisor, h / divisor),
        keypoints
            .into_iter()
            .map(|[x, y]| Keypoint::new(x / divisor, y / divisor))
            .collect(),
    )
}
