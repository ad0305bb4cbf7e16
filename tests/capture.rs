//! End-to-end checks of the capture loop with stand-ins for the camera, networks and window.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use handcam::{
    capture::{CancellationToken, CaptureLoop, FrameSink, FrameSource, LoopOptions, Step},
    detector::HandDetector,
    hud::{fps_between, FpsOverlay},
    image::{Color, Image, RgbFrame},
    landmark::{HandLandmarks, Landmark, NUM_LANDMARKS},
    pipeline::{HandPipeline, HandResults},
    Error,
};

struct FixedHands(Vec<HandLandmarks>);

impl HandPipeline for FixedHands {
    fn process(&mut self, _frame: &RgbFrame) -> anyhow::Result<HandResults> {
        Ok(HandResults::new(self.0.clone()))
    }
}

struct Frames {
    frames: VecDeque<Result<Image, Error>>,
    token: CancellationToken,
}

impl FrameSource for Frames {
    fn read(&mut self) -> Result<Image, Error> {
        let frame = self
            .frames
            .pop_front()
            .unwrap_or_else(|| Err(Error::FrameReadFailure("no more frames".into())));
        if self.frames.is_empty() {
            self.token.cancel();
        }
        frame
    }
}

#[derive(Default)]
struct Shown(Vec<Image>);

impl FrameSink for Shown {
    fn show(&mut self, frame: &Image) -> anyhow::Result<()> {
        self.0.push(frame.clone());
        Ok(())
    }
}

fn black(width: u32, height: u32) -> Image {
    Image::filled(width, height, Color::BLACK)
}

fn centered_hand() -> HandLandmarks {
    HandLandmarks::new([Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS])
}

#[test]
fn frames_without_hands_are_unchanged() {
    let mut detector = HandDetector::new(FixedHands(Vec::new()));
    let mut frame = black(320, 240);
    let out = detector.find_hands(&mut frame, true).unwrap();
    assert_eq!(*out, black(320, 240));
    assert_eq!(detector.find_landmark(&mut frame, 0, true), Ok(Vec::new()));
    assert_eq!(frame, black(320, 240));
}

#[test]
fn landmarks_need_a_detection_pass() {
    let mut detector = HandDetector::new(FixedHands(vec![centered_hand()]));
    let mut frame = black(10, 10);
    assert_eq!(
        detector.find_landmark(&mut frame, 0, false),
        Err(Error::NoInferenceAvailable)
    );
}

#[test]
fn centered_hand_maps_to_frame_center() {
    let mut detector = HandDetector::new(FixedHands(vec![centered_hand()]));
    let mut frame = black(640, 480);
    detector.find_hands(&mut frame, false).unwrap();

    let landmarks = detector.find_landmark(&mut frame, 0, false).unwrap();
    assert_eq!(landmarks.len(), 21);
    assert!(landmarks.iter().all(|lm| (lm.x, lm.y) == (320, 240)));
    assert!(landmarks.iter().enumerate().all(|(i, lm)| lm.index == i));

    assert_eq!(detector.find_landmark(&mut frame, 1, false), Ok(Vec::new()));
    assert_eq!(
        detector.hand(1).err(),
        Some(Error::HandIndexOutOfRange { index: 1, count: 1 })
    );
}

#[test]
fn fps_overlay() {
    let t = Instant::now();
    assert_eq!(fps_between(t, t), Err(Error::DegenerateTimeDelta));

    let mut overlay = FpsOverlay::new();
    assert_eq!(overlay.tick(t), None);
    assert_eq!(overlay.tick(t + Duration::from_millis(20)), Some(50));
    assert_eq!(overlay.tick(t + Duration::from_millis(20)), None);
    assert_eq!(overlay.tick(t + Duration::from_millis(120)), Some(10));
}

#[test]
fn loop_skips_bad_frames_and_stops_on_cancel() {
    let token = CancellationToken::new();
    let frames = Frames {
        frames: VecDeque::from(vec![
            Ok(black(64, 64)),
            Err(Error::FrameReadFailure("corrupt".into())),
            Ok(black(64, 64)),
        ]),
        token: token.clone(),
    };
    let mut capture = CaptureLoop::new(
        frames,
        HandDetector::new(FixedHands(vec![centered_hand()])),
        Shown::default(),
        LoopOptions::default(),
    );
    capture.run(&token).unwrap();

    assert!(token.is_cancelled());
    assert_eq!(capture.sink().0.len(), 2);
    assert_eq!(capture.detector().hand_count(), 1);
}

#[test]
fn step_reports_outcome() {
    let token = CancellationToken::new();
    let frames = Frames {
        frames: VecDeque::from(vec![
            Err(Error::FrameReadFailure("corrupt".into())),
            Ok(black(100, 100)),
        ]),
        token: token.clone(),
    };
    let mut capture = CaptureLoop::new(
        frames,
        HandDetector::new(FixedHands(Vec::new())),
        Shown::default(),
        LoopOptions::default(),
    );

    assert_eq!(capture.step(Instant::now()).unwrap(), Step::Skipped);
    assert_eq!(
        capture.step(Instant::now()).unwrap(),
        Step::Displayed {
            hands: 0,
            landmarks: Vec::new(),
        }
    );
}

#[test]
fn camera_errors_are_fatal() {
    let token = CancellationToken::new();
    let frames = Frames {
        frames: VecDeque::from(vec![
            Err(Error::CameraUnavailable {
                index: 0,
                reason: "unplugged".into(),
            }),
            Ok(black(8, 8)),
        ]),
        token: token.clone(),
    };
    let mut capture = CaptureLoop::new(
        frames,
        HandDetector::new(FixedHands(Vec::new())),
        Shown::default(),
        LoopOptions::default(),
    );
    let err = capture.run(&token).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CameraUnavailable { .. })
    ));
    assert!(capture.sink().0.is_empty());
}
