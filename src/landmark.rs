//! Hand landmarks and their topology.
//!
//! A hand is described by 21 landmarks, in the order defined by [`LandmarkIdx`]. Landmark
//! coordinates are *normalized*: `x` and `y` are relative to the width and height of the frame
//! they were computed on, and `z` is the depth relative to the wrist, in roughly the same scale
//! as `x`.

use std::fmt;

use crate::image::Resolution;

/// Number of landmarks of a hand.
pub const NUM_LANDMARKS: usize = 21;

/// A single normalized landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    x: f32,
    y: f32,
    z: f32,
}

impl Landmark {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.z
    }

    /// Converts the normalized position to integer pixel coordinates in a frame of size `res`.
    pub fn to_pixel(&self, res: Resolution) -> (i32, i32) {
        (
            (self.x * res.width() as f32).round() as i32,
            (self.y * res.height() as f32).round() as i32,
        )
    }
}

/// The 21 landmarks of one detected hand, plus the scores the landmark network assigned to it.
#[derive(Clone, PartialEq)]
pub struct HandLandmarks {
    landmarks: [Landmark; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl HandLandmarks {
    /// Creates a hand from its landmarks, with full presence and undecided handedness.
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self {
            landmarks,
            presence: 1.0,
            raw_handedness: 0.5,
        }
    }

    /// Sets the presence score and the raw handedness score of this hand.
    pub fn with_scores(self, presence: f32, raw_handedness: f32) -> Self {
        Self {
            presence,
            raw_handedness,
            ..self
        }
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    #[inline]
    pub fn landmark(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx as usize]
    }

    /// Returns the presence flag, indicating the confidence of whether a hand was in the input
    /// image.
    ///
    /// The value is between 0.0 and 1.0, with higher values indicating higher confidence that a
    /// hand was present.
    #[inline]
    pub fn presence(&self) -> f32 {
        self.presence
    }

    #[inline]
    pub fn raw_handedness(&self) -> f32 {
        self.raw_handedness
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes that the camera image is passed in as-is (not mirrored).
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    /// Computes the pixel coordinates of all landmarks in a frame of size `res`.
    pub fn to_pixels(&self, res: Resolution) -> Vec<PixelLandmark> {
        self.landmarks
            .iter()
            .enumerate()
            .map(|(index, lm)| {
                let (x, y) = lm.to_pixel(res);
                PixelLandmark { index, x, y }
            })
            .collect()
    }
}

impl fmt::Debug for HandLandmarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandLandmarks")
            .field("presence", &self.presence)
            .field("handedness", &self.handedness())
            .field("wrist", &self.landmarks[0])
            .finish_non_exhaustive()
    }
}

/// A landmark in integer pixel coordinates of a specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLandmark {
    /// Landmark index (`0..=20`, see [`LandmarkIdx`]).
    pub index: usize,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The connections between hand landmarks that make up the hand skeleton.
pub const HAND_CONNECTIONS: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Palm:
        (Wrist, ThumbCmc),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (Wrist, PinkyMcp),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology() {
        assert_eq!(HAND_CONNECTIONS.len(), 21);
        assert_eq!(LandmarkIdx::PinkyTip as usize, NUM_LANDMARKS - 1);

        // Every landmark takes part in the skeleton.
        let mut seen = [false; NUM_LANDMARKS];
        for (a, b) in HAND_CONNECTIONS {
            seen[*a as usize] = true;
            seen[*b as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn pixel_rounding() {
        let res = Resolution::RES_VGA;
        assert_eq!(Landmark::new(0.5, 0.5, 0.0).to_pixel(res), (320, 240));
        assert_eq!(Landmark::new(0.0, 1.0, 0.0).to_pixel(res), (0, 480));
        assert_eq!(Landmark::new(0.1001, 0.2999, 0.0).to_pixel(res), (64, 144));
        // Out-of-frame landmarks are not clamped.
        assert_eq!(Landmark::new(-0.1, 1.1, 0.0).to_pixel(res), (-64, 528));
    }

    #[test]
    fn to_pixels_is_ordered() {
        let hand = HandLandmarks::new(std::array::from_fn(|i| {
            Landmark::new(i as f32 / 20.0, 0.25, 0.0)
        }));
        let pixels = hand.to_pixels(Resolution::new(200, 100));
        assert_eq!(pixels.len(), NUM_LANDMARKS);
        for (i, lm) in pixels.iter().enumerate() {
            assert_eq!(lm.index, i);
            assert_eq!(lm.x, i as i32 * 10);
            assert_eq!(lm.y, 25);
        }
    }

    #[test]
    fn handedness() {
        let hand = HandLandmarks::new([Landmark::default(); NUM_LANDMARKS]);
        assert_eq!(hand.presence(), 1.0);
        assert_eq!(hand.handedness(), Handedness::Left);
        let hand = hand.with_scores(0.9, 0.8);
        assert_eq!(hand.presence(), 0.9);
        assert_eq!(hand.handedness(), Handedness::Right);
    }
}
