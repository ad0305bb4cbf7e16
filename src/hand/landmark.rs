//! Hand landmark prediction.

use anyhow::bail;

use crate::{
    image::{Resolution, RgbFrame},
    landmark::{HandLandmarks, Landmark, LandmarkIdx, NUM_LANDMARKS},
    nn::Cnn,
    rect::RotatedRect,
    timer::Timer,
};

use super::{expand_roi, hand_rotation};

/// Landmarks that, together, outline the whole hand well enough to derive the next ROI from.
const ROI_LANDMARKS: &[LandmarkIdx] = {
    use LandmarkIdx::*;
    &[
        Wrist,
        ThumbCmc,
        ThumbMcp,
        ThumbIp,
        IndexFingerMcp,
        IndexFingerPip,
        MiddleFingerMcp,
        MiddleFingerPip,
        RingFingerMcp,
        RingFingerPip,
        PinkyMcp,
        PinkyPip,
    ]
};

/// Estimates hand landmarks inside a region of interest.
pub struct Landmarker {
    cnn: Cnn,
    t_infer: Timer,
}

impl Landmarker {
    pub fn new(cnn: Cnn) -> Self {
        Self {
            cnn,
            t_infer: Timer::new("landmarks"),
        }
    }

    /// Returns the expected input resolution of the internal neural network.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Computes the landmarks of the hand inside `roi` (in pixels of `frame`).
    ///
    /// The returned landmarks are normalized to the frame's size.
    pub fn compute(&mut self, frame: &RgbFrame, roi: &RotatedRect) -> anyhow::Result<HandLandmarks> {
        let input_res = self.input_resolution();
        let (w, h) = (roi.rect().width(), roi.rect().height());
        let (sx, sy) = (
            w / input_res.width() as f32,
            h / input_res.height() as f32,
        );

        let cnn = &self.cnn;
        let outputs = self.t_infer.time(|| {
            cnn.estimate(|x, y| {
                let [fx, fy] = roi.transform_out((x as f32 + 0.5) * sx, (y as f32 + 0.5) * sy);
                frame.sample(fx, fy)
            })
        })?;

        let screen_landmarks = outputs.slice(0)?;
        let presence = outputs.slice(1)?;
        let handedness = outputs.slice(2)?;
        if screen_landmarks.len() != NUM_LANDMARKS * 3 || presence.len() != 1 || handedness.len() != 1
        {
            bail!(
                "unexpected hand landmark output shapes {:?}, {:?}, {:?}",
                outputs.shape(0)?,
                outputs.shape(1)?,
                outputs.shape(2)?,
            );
        }

        Ok(decode(
            screen_landmarks,
            input_res,
            roi,
            frame.resolution(),
        )
        .with_scores(presence[0], handedness[0]))
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer].into_iter()
    }
}

/// Maps landmarks from network input pixels back to normalized frame coordinates.
fn decode(
    screen_landmarks: &[f32],
    input_res: Resolution,
    roi: &RotatedRect,
    frame_res: Resolution,
) -> HandLandmarks {
    let (w, h) = (roi.rect().width(), roi.rect().height());
    let (fw, fh) = (frame_res.width() as f32, frame_res.height() as f32);
    let (iw, ih) = (input_res.width() as f32, input_res.height() as f32);

    let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
    for (coords, out) in screen_landmarks.chunks_exact(3).zip(&mut landmarks) {
        let [x, y] = roi.transform_out(coords[0] / iw * w, coords[1] / ih * h);
        let z = coords[2] / iw * w / fw;
        *out = Landmark::new(x / fw, y / fh, z);
    }

    HandLandmarks::new(landmarks)
}

/// Derives the region of interest to search for `hand` in the next frame.
///
/// Returns [`None`] if the frame has no area.
pub fn landmarks_to_roi(hand: &HandLandmarks, frame_res: Resolution) -> Option<RotatedRect> {
    let (fw, fh) = (frame_res.width() as f32, frame_res.height() as f32);
    if fw <= 0.0 || fh <= 0.0 {
        return None;
    }
    let px = |idx: LandmarkIdx| {
        let lm = hand.landmark(idx);
        [lm.x() * fw, lm.y() * fh]
    };

    // Point from the wrist to the middle of the index, middle and ring finger knuckles.
    let [ix, iy] = px(LandmarkIdx::IndexFingerMcp);
    let [rx, ry] = px(LandmarkIdx::RingFingerMcp);
    let [mx, my] = px(LandmarkIdx::MiddleFingerMcp);
    let fingers = [((ix + rx) / 2.0 + mx) / 2.0, ((iy + ry) / 2.0 + my) / 2.0];
    let rotation = hand_rotation(px(LandmarkIdx::Wrist), fingers);

    let roi = RotatedRect::bounding(rotation, ROI_LANDMARKS.iter().map(|idx| px(*idx)))?;
    Some(expand_roi(roi, -0.1, 2.0))
}
