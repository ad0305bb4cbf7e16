//! The capture loop: read a frame, find hands, annotate, display.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use anyhow::bail;

use crate::{
    detector::{draw_marker, HandDetector},
    hud::FpsOverlay,
    image::Image,
    landmark::PixelLandmark,
    pipeline::HandPipeline,
    timer::{FpsCounter, Timer},
    Error,
};

/// Number of consecutive failed reads after which the source is considered dead.
const MAX_CONSECUTIVE_FAILURES: u32 = 50;

/// A shared flag requesting the capture loop to stop.
///
/// Cloned tokens share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels the token when the process receives `signal` (eg. `SIGINT` on Ctrl+C).
    ///
    /// If the signal arrives again after the token was cancelled, the process exits immediately
    /// with status 1.
    pub fn cancel_on_signal(&self, signal: i32) -> io::Result<()> {
        // The shutdown check has to be registered first, so that the first signal only sets the
        // flag.
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&self.cancelled))?;
        signal_hook::flag::register(signal, Arc::clone(&self.cancelled))?;
        Ok(())
    }
}

/// Something frames can be read from, like a camera.
pub trait FrameSource {
    /// Blocks until the next frame is available and returns it.
    ///
    /// Failing to obtain a single frame should be reported as [`Error::FrameReadFailure`], which
    /// the capture loop skips over.
    fn read(&mut self) -> Result<Image, Error>;

    /// Returns profiling timers of the source, for periodic logging.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

/// Something frames can be displayed on, like a window.
pub trait FrameSink {
    fn show(&mut self, frame: &Image) -> anyhow::Result<()>;
}

/// What the capture loop draws and extracts each iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    draw_skeleton: bool,
    draw_markers: bool,
    hand_index: usize,
    highlight: Option<usize>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            draw_skeleton: true,
            draw_markers: true,
            hand_index: 0,
            highlight: None,
        }
    }
}

impl LoopOptions {
    /// Whether to draw the skeleton of every detected hand.
    pub fn draw_skeleton(self, draw_skeleton: bool) -> Self {
        Self {
            draw_skeleton,
            ..self
        }
    }

    /// Whether to circle the extracted landmarks.
    pub fn draw_markers(self, draw_markers: bool) -> Self {
        Self {
            draw_markers,
            ..self
        }
    }

    /// Selects the hand whose landmarks are extracted.
    pub fn hand_index(self, hand_index: usize) -> Self {
        Self { hand_index, ..self }
    }

    /// Only circles the landmark with index `landmark` instead of all of them.
    pub fn highlight(self, landmark: Option<usize>) -> Self {
        Self {
            highlight: landmark,
            ..self
        }
    }
}

/// Outcome of a single capture loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A frame was processed and displayed.
    Displayed {
        /// Number of hands found in the frame.
        hands: usize,
        /// Landmarks extracted for the selected hand (empty if it was not found).
        landmarks: Vec<PixelLandmark>,
    },
    /// The frame could not be read and was skipped.
    Skipped,
}

/// Drives a [`FrameSource`] through a [`HandDetector`] and into a [`FrameSink`].
pub struct CaptureLoop<S, P, D> {
    source: S,
    detector: HandDetector<P>,
    sink: D,
    options: LoopOptions,
    overlay: FpsOverlay,
    fps: FpsCounter,
    failures: u32,
}

impl<S: FrameSource, P: HandPipeline, D: FrameSink> CaptureLoop<S, P, D> {
    pub fn new(source: S, detector: HandDetector<P>, sink: D, options: LoopOptions) -> Self {
        Self {
            source,
            detector,
            sink,
            options,
            overlay: FpsOverlay::new(),
            fps: FpsCounter::new("capture"),
            failures: 0,
        }
    }

    /// Runs one iteration of the loop, using `now` as the frame's timestamp.
    ///
    /// Frame read failures skip the iteration, unless too many of them happen in a row. Any other
    /// error is returned.
    pub fn step(&mut self, now: Instant) -> anyhow::Result<Step> {
        let mut frame = match self.source.read() {
            Ok(frame) => {
                self.failures = 0;
                frame
            }
            Err(e @ Error::FrameReadFailure(_)) => {
                self.failures += 1;
                if self.failures >= MAX_CONSECUTIVE_FAILURES {
                    bail!("giving up after {} failed reads in a row: {e}", self.failures);
                }
                log::warn!("{e}; skipping frame");
                return Ok(Step::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        let opts = &self.options;
        self.detector.find_hands(&mut frame, opts.draw_skeleton)?;
        let landmarks = self.detector.find_landmark(
            &mut frame,
            opts.hand_index,
            opts.draw_markers && opts.highlight.is_none(),
        )?;
        if let Some(index) = opts.highlight {
            match landmarks.get(index) {
                Some(lm) => {
                    log::trace!("landmark {index} at ({}, {})", lm.x, lm.y);
                    if opts.draw_markers {
                        draw_marker(&mut frame, lm);
                    }
                }
                None => log::trace!("landmark {index} not available"),
            }
        }

        if let Some(fps) = self.overlay.tick(now) {
            self.overlay.draw(&mut frame, fps);
        }

        self.sink.show(&frame)?;
        self.fps
            .tick_with(self.source.timers().into_iter().chain(self.detector.timers()));

        Ok(Step::Displayed {
            hands: self.detector.hand_count(),
            landmarks,
        })
    }

    /// Runs the loop until `token` is cancelled or an unrecoverable error occurs.
    ///
    /// The token is checked once per iteration, before reading a frame.
    pub fn run(&mut self, token: &CancellationToken) -> anyhow::Result<()> {
        while !token.is_cancelled() {
            self.step(Instant::now())?;
        }
        log::info!("capture loop cancelled");
        Ok(())
    }

    pub fn detector(&self) -> &HandDetector<P> {
        &self.detector
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }
}
