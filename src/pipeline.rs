//! The hand landmark pipeline interface.
//!
//! A [`HandPipeline`] turns an RGB frame into the landmarks of every hand visible in it. The
//! shipped implementation is [`mediapipe::MediaPipeHands`]; tests drive the rest of the crate with
//! scripted pipelines instead.

pub mod mediapipe;

use crate::{
    image::{draw, Color, Image, RgbFrame},
    landmark::{HandLandmarks, LandmarkIdx},
    timer::Timer,
    Error,
};

pub use crate::landmark::HAND_CONNECTIONS;

/// A perception pipeline locating hands and their landmarks.
pub trait HandPipeline {
    /// Processes one frame, returning all hands found in it.
    fn process(&mut self, frame: &RgbFrame) -> anyhow::Result<HandResults>;

    /// Returns profiling timers of the pipeline's stages, for periodic logging.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<P: HandPipeline + ?Sized> HandPipeline for Box<P> {
    fn process(&mut self, frame: &RgbFrame) -> anyhow::Result<HandResults> {
        (**self).process(frame)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

/// The hands found in one frame, in no particular order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandResults {
    hands: Vec<HandLandmarks>,
}

impl HandResults {
    pub fn new(hands: Vec<HandLandmarks>) -> Self {
        Self { hands }
    }

    /// Returns the landmarks of every detected hand (empty if there are none).
    #[inline]
    pub fn hands(&self) -> &[HandLandmarks] {
        &self.hands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hands.len()
    }
}

/// Configuration of a hand pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct HandOptions {
    image_mode: bool,
    max_hands: usize,
    model_complexity: u8,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
}

impl Default for HandOptions {
    fn default() -> Self {
        Self {
            image_mode: false,
            max_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl HandOptions {
    /// Treats every frame as an unrelated still image, running palm detection on each one.
    ///
    /// By default, frames are treated as a video stream and hands are tracked between them.
    pub fn image_mode(self, image_mode: bool) -> Self {
        Self { image_mode, ..self }
    }

    /// Sets the maximum number of hands to report per frame.
    pub fn max_hands(self, max_hands: usize) -> Self {
        Self { max_hands, ..self }
    }

    /// Selects the landmark model: 0 for the lite model, 1 for the full one.
    pub fn model_complexity(self, model_complexity: u8) -> Self {
        Self {
            model_complexity,
            ..self
        }
    }

    /// Sets the minimum palm detection confidence for a detection to be considered a hand.
    pub fn min_detection_confidence(self, min_detection_confidence: f32) -> Self {
        Self {
            min_detection_confidence,
            ..self
        }
    }

    /// Sets the minimum landmark presence score for a hand to be reported and tracked.
    pub fn min_tracking_confidence(self, min_tracking_confidence: f32) -> Self {
        Self {
            min_tracking_confidence,
            ..self
        }
    }

    #[inline]
    pub fn is_image_mode(&self) -> bool {
        self.image_mode
    }

    #[inline]
    pub fn get_max_hands(&self) -> usize {
        self.max_hands
    }

    #[inline]
    pub fn get_model_complexity(&self) -> u8 {
        self.model_complexity
    }

    #[inline]
    pub fn get_min_detection_confidence(&self) -> f32 {
        self.min_detection_confidence
    }

    #[inline]
    pub fn get_min_tracking_confidence(&self) -> f32 {
        self.min_tracking_confidence
    }

    /// Checks that all values are within their valid ranges.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_hands == 0 {
            return Err(Error::InvalidOptions("`max_hands` must be at least 1".into()));
        }
        if self.model_complexity > 1 {
            return Err(Error::InvalidOptions(format!(
                "`model_complexity` must be 0 or 1, got {}",
                self.model_complexity
            )));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidOptions(format!(
                    "`{name}` must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Draws the skeleton of `hand` onto `frame`.
///
/// Every connection is drawn as a green line, and every landmark as a red dot. Landmark
/// coordinates are scaled by the dimensions of `frame`.
pub fn draw_landmarks(
    frame: &mut Image,
    hand: &HandLandmarks,
    connections: &[(LandmarkIdx, LandmarkIdx)],
) {
    let res = frame.resolution();
    for (a, b) in connections {
        let (ax, ay) = hand.landmark(*a).to_pixel(res);
        let (bx, by) = hand.landmark(*b).to_pixel(res);
        draw::line(frame, ax, ay, bx, by)
            .color(Color::GREEN)
            .stroke_width(2);
    }
    for lm in hand.landmarks() {
        let (x, y) = lm.to_pixel(res);
        draw::circle(frame, x, y, 2).color(Color::RED).filled();
    }
}

#[cfg(test)]
mod tests {
    use crate::landmark::{Landmark, NUM_LANDMARKS};

    use super::*;

    #[test]
    fn default_options() {
        let opts = HandOptions::default();
        assert!(!opts.is_image_mode());
        assert_eq!(opts.get_max_hands(), 2);
        assert_eq!(opts.get_model_complexity(), 1);
        assert_eq!(opts.get_min_detection_confidence(), 0.5);
        assert_eq!(opts.get_min_tracking_confidence(), 0.5);
        assert_eq!(opts.validate(), Ok(()));
    }

    #[test]
    fn invalid_options() {
        for opts in [
            HandOptions::default().max_hands(0),
            HandOptions::default().model_complexity(2),
            HandOptions::default().min_detection_confidence(1.5),
            HandOptions::default().min_tracking_confidence(-0.1),
            HandOptions::default().min_tracking_confidence(f32::NAN),
        ] {
            assert!(
                matches!(opts.validate(), Err(Error::InvalidOptions(_))),
                "{opts:?}"
            );
        }
        assert!(HandOptions::default()
            .image_mode(true)
            .max_hands(1)
            .model_complexity(0)
            .validate()
            .is_ok());
    }

    #[test]
    fn draws_skeleton() {
        let mut landmarks = [Landmark::new(0.8, 0.8, 0.0); NUM_LANDMARKS];
        landmarks[0] = Landmark::new(0.2, 0.2, 0.0);
        let hand = HandLandmarks::new(landmarks);

        let mut frame = Image::filled(100, 100, Color::BLACK);
        draw_landmarks(&mut frame, &hand, HAND_CONNECTIONS);
        assert_eq!(frame.get(20, 20), Color::RED);
        assert_eq!(frame.get(80, 80), Color::RED);
        assert_eq!(frame.get(50, 50), Color::GREEN);

        // Without connections, only the landmark dots are drawn.
        let mut frame = Image::filled(100, 100, Color::BLACK);
        draw_landmarks(&mut frame, &hand, &[]);
        assert_eq!(frame.get(20, 20), Color::RED);
        assert_eq!(frame.get(50, 50), Color::BLACK);
    }
}
