//! A hand pipeline running MediaPipe's palm detection and hand landmark networks.
//!
//! The networks are loaded from ONNX conversions of the MediaPipe models:
//!
//! - `palm_detection_lite.onnx` / `palm_detection_full.onnx`
//! - `hand_landmark_lite.onnx` / `hand_landmark_full.onnx`
//!
//! The lite variants are used for model complexity 0, the full ones for complexity 1.

use std::path::Path;

use anyhow::Context;

use crate::{
    hand::{
        detection::PalmDetector,
        landmark::{landmarks_to_roi, Landmarker},
    },
    image::RgbFrame,
    nn::{Cnn, CnnInputShape, NeuralNetwork},
    rect::RotatedRect,
    timer::Timer,
};

use super::{HandOptions, HandPipeline, HandResults};

/// Palm detections overlapping a tracked hand's region by at least this much are assumed to be
/// that same hand.
const TRACKED_IOU_THRESH: f32 = 0.3;

/// The MediaPipe Hands pipeline.
///
/// In video mode (the default), the landmarks of each hand are used to predict where the hand is
/// in the next frame, and palm detection only runs while fewer than `max_hands` hands are being
/// tracked. In image mode, every frame runs palm detection.
pub struct MediaPipeHands {
    options: HandOptions,
    detector: PalmDetector,
    landmarker: Landmarker,
    tracked: Vec<RotatedRect>,
}

impl MediaPipeHands {
    /// Loads the networks from `model_dir` and configures the pipeline with `options`.
    pub fn open(options: &HandOptions, model_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::open_impl(options, model_dir.as_ref())
    }

    fn open_impl(options: &HandOptions, model_dir: &Path) -> anyhow::Result<Self> {
        options.validate()?;

        let variant = match options.get_model_complexity() {
            0 => "lite",
            _ => "full",
        };
        let load = |name: String| -> anyhow::Result<Cnn> {
            let path = model_dir.join(&name);
            log::debug!("loading {}", path.display());
            let nn = NeuralNetwork::load(&path)
                .with_context(|| format!("failed to load network '{}'", path.display()))?;
            Cnn::new(nn, CnnInputShape::NCHW, 0.0..=1.0)
        };

        let palm = load(format!("palm_detection_{variant}.onnx"))?;
        let landmark = load(format!("hand_landmark_{variant}.onnx"))?;
        log::info!(
            "loaded {variant} hand models (palm input {}, landmark input {})",
            palm.input_resolution(),
            landmark.input_resolution(),
        );

        Ok(Self {
            options: options.clone(),
            detector: PalmDetector::new(palm, options.get_min_detection_confidence()),
            landmarker: Landmarker::new(landmark),
            tracked: Vec::new(),
        })
    }

    /// Returns the options this pipeline was configured with.
    pub fn options(&self) -> &HandOptions {
        &self.options
    }
}

impl HandPipeline for MediaPipeHands {
    fn process(&mut self, frame: &RgbFrame) -> anyhow::Result<HandResults> {
        let max_hands = self.options.get_max_hands();
        let image_mode = self.options.is_image_mode();

        let mut rois = if image_mode {
            Vec::new()
        } else {
            std::mem::take(&mut self.tracked)
        };

        if rois.len() < max_hands {
            for palm in self.detector.detect(frame)? {
                if rois.len() >= max_hands {
                    break;
                }
                let roi = palm.hand_roi();
                if overlaps_any(&rois, &roi) {
                    log::trace!("palm {:?} is already tracked", palm.bounding_rect());
                    continue;
                }
                rois.push(roi);
            }
        }

        let mut hands = Vec::with_capacity(rois.len());
        for roi in &rois {
            let hand = self.landmarker.compute(frame, roi)?;
            if hand.presence() < self.options.get_min_tracking_confidence() {
                log::trace!("lost hand in {:?} (presence={})", roi, hand.presence());
                continue;
            }

            if !image_mode {
                if let Some(next) = landmarks_to_roi(&hand, frame.resolution()) {
                    // two regions that drifted onto the same hand
                    if overlaps_any(&self.tracked, &next) {
                        log::trace!("dropping duplicate hand in {:?}", next);
                        continue;
                    }
                    self.tracked.push(next);
                }
            }
            hands.push(hand);
        }

        Ok(HandResults::new(hands))
    }

    fn timers(&self) -> Vec<&Timer> {
        self.detector
            .timers()
            .chain(self.landmarker.timers())
            .collect()
    }
}

/// Returns whether `roi` overlaps any of `rois` enough to be considered the same hand.
fn overlaps_any(rois: &[RotatedRect], roi: &RotatedRect) -> bool {
    let bounds = roi.bounding_rect();
    rois.iter()
        .any(|r| r.bounding_rect().iou(&bounds) >= TRACKED_IOU_THRESH)
}
