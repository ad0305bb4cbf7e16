//! Object detection output handling.
//!
//! Contains the detection type produced by single-shot detectors (like the palm detector), along
//! with anchor generation ([`ssd`]) and duplicate removal ([`nms`]).

pub mod nms;
pub mod ssd;

use crate::{image::Resolution, rect::Rect};

/// A detected object.
///
/// A [`RawDetection`] consists of a [`Rect`] enclosing the detected object, a confidence value,
/// and a set of located keypoints.
///
/// Per convention, the confidence value lies between 0.0 and 1.0, which can be achieved by passing
/// the raw network output through [`crate::num::sigmoid`]. The confidence is used as the weight
/// during non-maximum averaging (see [`nms`]), so it has to have the expected range there.
///
/// Called "raw" because the coordinate system depends on where the detection came from. Freshly
/// decoded detections are in network input pixels; [`RawDetection::map_to`] moves them into frame
/// pixels.
#[derive(Debug, Clone)]
pub struct RawDetection {
    confidence: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl RawDetection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self {
            confidence,
            rect,
            keypoints: Vec::new(),
        }
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Maps a detection made on an input image of size `input` to the region `target`, which is
    /// the area of the original frame that was scaled to form the input image.
    ///
    /// `target` may extend outside of the frame (see [`Resolution::letterbox_square`]).
    pub fn map_to(&self, input: Resolution, target: &Rect) -> Self {
        let sx = target.width() / input.width() as f32;
        let sy = target.height() / input.height() as f32;
        let map = |x: f32, y: f32| (target.x() + x * sx, target.y() + y * sy);

        let (x, y) = map(self.rect.x(), self.rect.y());
        Self {
            confidence: self.confidence,
            rect: Rect::from_top_left(x, y, self.rect.width() * sx, self.rect.height() * sy),
            keypoints: self
                .keypoints
                .iter()
                .map(|kp| {
                    let (x, y) = map(kp.x, kp.y);
                    Keypoint::new(x, y)
                })
                .collect(),
        }
    }
}

/// A 2D keypoint produced as part of a [`RawDetection`].
///
/// The meaning of a keypoint depends on the detector and on its index in the keypoint list. The
/// palm detector uses them to determine the rotation of the hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn map_letterboxed() {
        // A VGA frame is letterboxed into a 192x192 network input.
        let input = Resolution::new(192, 192);
        let square = Resolution::RES_VGA.letterbox_square();
        let det = RawDetection::with_keypoints(
            0.9,
            Rect::from_center(96.0, 96.0, 48.0, 24.0),
            vec![Keypoint::new(0.0, 0.0), Keypoint::new(192.0, 192.0)],
        );

        let mapped = det.map_to(input, &square);
        let rect = mapped.bounding_rect();
        assert_eq!(mapped.confidence(), 0.9);
        assert_relative_eq!(rect.x_center(), 320.0, epsilon = 1e-3);
        assert_relative_eq!(rect.y_center(), 240.0, epsilon = 1e-3);
        assert_relative_eq!(rect.width(), 160.0, epsilon = 1e-3);
        assert_relative_eq!(rect.height(), 80.0, epsilon = 1e-3);

        let [a, b] = [mapped.keypoints()[0], mapped.keypoints()[1]];
        assert_eq!((a.x(), a.y()), (0.0, -80.0));
        assert_relative_eq!(b.x(), 640.0, epsilon = 1e-3);
        assert_relative_eq!(b.y(), 560.0, epsilon = 1e-3);
    }
}
