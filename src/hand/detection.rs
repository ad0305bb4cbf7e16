//! Palm detection.
//!
//! Uses MediaPipe's palm detection network, which outputs a box and 7 keypoints for each of its
//! 2016 SSD anchors.

use anyhow::bail;

use crate::{
    detection::{
        nms::NonMaxSuppression,
        ssd::{Anchors, LayerInfo},
        Keypoint, RawDetection,
    },
    image::{Resolution, RgbFrame},
    nn::Cnn,
    num::sigmoid,
    rect::{Rect, RotatedRect},
    timer::Timer,
};

use super::{expand_roi, hand_rotation};

const ANCHOR_LAYERS: &[LayerInfo] = &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)];

/// Box center, size, and 7 keypoints.
const BOX_PARAMS: usize = 4 + 7 * 2;

/// Raw scores are clamped to this range before the sigmoid is applied.
const SCORE_CLIP: f32 = 100.0;

/// Detects palms in whole frames.
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    nms: NonMaxSuppression,
    min_confidence: f32,
    t_infer: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    /// Creates a palm detector from the palm detection network.
    ///
    /// Detections with a confidence below `min_confidence` are discarded.
    pub fn new(cnn: Cnn, min_confidence: f32) -> Self {
        Self {
            cnn,
            anchors: Anchors::new(ANCHOR_LAYERS),
            nms: NonMaxSuppression::new(min_confidence),
            min_confidence,
            t_infer: Timer::new("palm"),
            t_nms: Timer::new("NMS"),
        }
    }

    /// Detects palms in `frame`, returning them in descending order of confidence.
    ///
    /// The frame is letterboxed to fit the square network input, and all returned coordinates are
    /// in pixels of `frame`.
    pub fn detect(&mut self, frame: &RgbFrame) -> anyhow::Result<Vec<PalmDetection>> {
        let input_res = self.cnn.input_resolution();
        let square = frame.resolution().letterbox_square();
        let (sx, sy) = (
            square.width() / input_res.width() as f32,
            square.height() / input_res.height() as f32,
        );

        let cnn = &self.cnn;
        let outputs = self.t_infer.time(|| {
            cnn.estimate(|x, y| {
                frame.sample(
                    square.x() + (x as f32 + 0.5) * sx,
                    square.y() + (y as f32 + 0.5) * sy,
                )
            })
        })?;

        let boxes = outputs.slice(0)?;
        let scores = outputs.slice(1)?;
        let count = self.anchors.anchor_count();
        if boxes.len() != count * BOX_PARAMS || scores.len() != count {
            bail!(
                "unexpected palm detector output shapes {:?} and {:?}",
                outputs.shape(0)?,
                outputs.shape(1)?,
            );
        }

        let mut raw = decode(&self.anchors, input_res, boxes, scores, self.min_confidence);
        log::trace!("{} palm candidates", raw.len());

        let nms = &mut self.nms;
        let detections = self.t_nms.time(|| nms.process(&mut raw));
        Ok(detections
            .into_iter()
            .map(|det| PalmDetection {
                raw: det.map_to(input_res, &square),
            })
            .collect())
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_nms].into_iter()
    }
}

/// Turns raw network outputs into detections in network input coordinates.
fn decode(
    anchors: &Anchors,
    input_res: Resolution,
    boxes: &[f32],
    scores: &[f32],
    min_confidence: f32,
) -> Vec<RawDetection> {
    anchors
        .iter()
        .zip(boxes.chunks_exact(BOX_PARAMS))
        .zip(scores)
        .filter_map(|((anchor, params), &score)| {
            let confidence = sigmoid(score.clamp(-SCORE_CLIP, SCORE_CLIP));
            if confidence < min_confidence {
                return None;
            }

            let [ax, ay] = anchor.position(input_res);
            let rect = Rect::from_center(params[0] + ax, params[1] + ay, params[2], params[3]);
            let keypoints = params[4..]
                .chunks_exact(2)
                .map(|kp| Keypoint::new(kp[0] + ax, kp[1] + ay))
                .collect();
            Some(RawDetection::with_keypoints(confidence, rect, keypoints))
        })
        .collect()
}

/// A detected palm, in frame pixel coordinates.
#[derive(Debug, Clone)]
pub struct PalmDetection {
    raw: RawDetection,
}

impl PalmDetection {
    /// Index of the wrist keypoint.
    const KP_WRIST: usize = 0;
    /// Index of the keypoint at the middle finger's MCP.
    const KP_MIDDLE_FINGER: usize = 2;

    pub fn confidence(&self) -> f32 {
        self.raw.confidence()
    }

    /// Returns the axis-aligned bounding rectangle of the palm.
    pub fn bounding_rect(&self) -> Rect {
        self.raw.bounding_rect()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        self.raw.keypoints()
    }

    /// Computes the clockwise rotation of the hand compared to an upright position.
    pub fn rotation_radians(&self) -> f32 {
        let kps = self.raw.keypoints();
        match (kps.get(Self::KP_WRIST), kps.get(Self::KP_MIDDLE_FINGER)) {
            (Some(wrist), Some(finger)) => {
                hand_rotation([wrist.x(), wrist.y()], [finger.x(), finger.y()])
            }
            _ => 0.0,
        }
    }

    /// Computes the region of interest for the landmark network.
    ///
    /// The palm box is rotated to align with the hand, moved towards the fingers and enlarged so
    /// that the whole hand fits inside.
    pub fn hand_roi(&self) -> RotatedRect {
        let roi = RotatedRect::new(self.bounding_rect(), self.rotation_radians());
        expand_roi(roi, -0.5, 2.6)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn outputs_with_hit(anchor: usize, params: [f32; BOX_PARAMS]) -> (Vec<f32>, Vec<f32>) {
        let mut boxes = vec![0.0; 2016 * BOX_PARAMS];
        let mut scores = vec![-10.0; 2016];
        boxes[anchor * BOX_PARAMS..][..BOX_PARAMS].copy_from_slice(&params);
        scores[anchor] = 5.0;
        (boxes, scores)
    }

    #[test]
    fn decode_relative_to_anchor() {
        let anchors = Anchors::new(ANCHOR_LAYERS);
        let mut params = [0.0; BOX_PARAMS];
        params[..4].copy_from_slice(&[2.0, -3.0, 30.0, 40.0]);
        params[4..8].copy_from_slice(&[1.0, 1.0, -1.0, -1.0]);
        let (boxes, scores) = outputs_with_hit(1152, params);

        let dets = decode(&anchors, Resolution::new(192, 192), &boxes, &scores, 0.5);
        assert_eq!(dets.len(), 1);

        let det = &dets[0];
        assert_relative_eq!(det.confidence(), sigmoid(5.0));
        // first anchor of the 12x12 layer sits at (8, 8)
        assert_relative_eq!(det.bounding_rect().x_center(), 10.0, epsilon = 1e-4);
        assert_relative_eq!(det.bounding_rect().y_center(), 5.0, epsilon = 1e-4);
        assert_relative_eq!(det.bounding_rect().width(), 30.0);
        assert_eq!(det.keypoints().len(), 7);
        assert_relative_eq!(det.keypoints()[1].x(), 7.0, epsilon = 1e-4);
        assert_relative_eq!(det.keypoints()[6].y(), 8.0, epsilon = 1e-4);
    }

    #[test]
    fn roi_follows_fingers() {
        // Wrist below the middle finger: upright hand.
        let raw = RawDetection::with_keypoints(
            0.9,
            Rect::from_center(100.0, 100.0, 20.0, 20.0),
            vec![
                Keypoint::new(100.0, 110.0),
                Keypoint::new(0.0, 0.0),
                Keypoint::new(100.0, 90.0),
            ],
        );
        let palm = PalmDetection { raw };
        assert_relative_eq!(palm.rotation_radians(), 0.0);
        let roi = palm.hand_roi();
        assert_relative_eq!(roi.center()[0], 100.0);
        assert_relative_eq!(roi.center()[1], 90.0);
        assert_relative_eq!(roi.rect().width(), 52.0, epsilon = 1e-4);

        // Hand pointing left.
        let raw = RawDetection::with_keypoints(
            0.9,
            Rect::from_center(100.0, 100.0, 20.0, 20.0),
            vec![
                Keypoint::new(110.0, 100.0),
                Keypoint::new(0.0, 0.0),
                Keypoint::new(90.0, 100.0),
            ],
        );
        let roi = PalmDetection { raw }.hand_roi();
        assert_relative_eq!(roi.center()[0], 90.0, epsilon = 1e-4);
        assert_relative_eq!(roi.center()[1], 100.0, epsilon = 1e-4);
    }
}
