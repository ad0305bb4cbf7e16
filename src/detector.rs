//! Hand landmark extraction from camera frames.
//!
//! [`HandDetector`] wraps a [`HandPipeline`], keeps the result of the most recent detection pass,
//! and converts the landmarks of a chosen hand to pixel coordinates.

use crate::{
    image::{draw, Color, Image},
    landmark::{HandLandmarks, PixelLandmark},
    pipeline::{draw_landmarks, HandPipeline, HandResults, HAND_CONNECTIONS},
    timer::Timer,
    Error,
};

/// Radius of the circle drawn around each extracted landmark.
const MARKER_RADIUS: u32 = 15;
const MARKER_STROKE: u32 = 2;

/// Finds hands in frames and extracts their landmarks.
pub struct HandDetector<P> {
    pipeline: P,
    results: Option<HandResults>,
    t_convert: Timer,
    t_process: Timer,
}

impl<P: HandPipeline> HandDetector<P> {
    /// Creates a detector running `pipeline` on every frame passed to [`find_hands`].
    ///
    /// [`find_hands`]: HandDetector::find_hands
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            results: None,
            t_convert: Timer::new("convert"),
            t_process: Timer::new("process"),
        }
    }

    /// Runs the hand pipeline on `frame` and remembers the result.
    ///
    /// If `draw` is `true`, the skeleton of every detected hand is drawn onto `frame`. Frames
    /// without hands are returned unmodified.
    pub fn find_hands<'a>(
        &mut self,
        frame: &'a mut Image,
        draw: bool,
    ) -> anyhow::Result<&'a mut Image> {
        let rgb = self.t_convert.time(|| frame.to_rgb());
        let pipeline = &mut self.pipeline;
        let results = self.t_process.time(|| pipeline.process(&rgb))?;
        log::trace!("{} hands in {:?}", results.len(), frame);

        if draw {
            for hand in results.hands() {
                draw_landmarks(frame, hand, HAND_CONNECTIONS);
            }
        }

        self.results = Some(results);
        Ok(frame)
    }

    /// Returns the pixel coordinates of every landmark of hand `hand_index` found by the last
    /// [`find_hands`] call.
    ///
    /// Coordinates are computed from the dimensions of `frame`. If `draw` is `true`, a circle is
    /// drawn around every landmark.
    ///
    /// Returns an empty list when no hand with index `hand_index` was found (including when no
    /// hand was found at all). Fails with [`Error::NoInferenceAvailable`] if [`find_hands`] was
    /// never called.
    ///
    /// [`find_hands`]: HandDetector::find_hands
    pub fn find_landmark(
        &mut self,
        frame: &mut Image,
        hand_index: usize,
        draw: bool,
    ) -> Result<Vec<PixelLandmark>, Error> {
        let hand = match self.hand(hand_index) {
            Ok(hand) => hand,
            Err(e @ Error::HandIndexOutOfRange { .. }) => {
                log::trace!("no landmarks: {e}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let landmarks = hand.to_pixels(frame.resolution());
        if draw {
            for lm in &landmarks {
                draw_marker(frame, lm);
            }
        }
        Ok(landmarks)
    }

    /// Returns the landmarks of hand `index` from the last detection pass.
    pub fn hand(&self, index: usize) -> Result<&HandLandmarks, Error> {
        let results = self.results.as_ref().ok_or(Error::NoInferenceAvailable)?;
        results
            .hands()
            .get(index)
            .ok_or(Error::HandIndexOutOfRange {
                index,
                count: results.len(),
            })
    }

    /// Returns the result of the last detection pass, or [`None`] if there was none.
    pub fn results(&self) -> Option<&HandResults> {
        self.results.as_ref()
    }

    /// Returns the number of hands found by the last detection pass (0 if there was none).
    pub fn hand_count(&self) -> usize {
        self.results.as_ref().map_or(0, HandResults::len)
    }

    /// Returns the profiling timers of the detector and its pipeline.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_convert, &self.t_process]
            .into_iter()
            .chain(self.pipeline.timers())
    }
}

/// Circles a single extracted landmark.
pub fn draw_marker(frame: &mut Image, lm: &PixelLandmark) {
    draw::circle(frame, lm.x, lm.y, MARKER_RADIUS)
        .color(Color::YELLOW)
        .stroke_width(MARKER_STROKE);
}
