//! Frames-per-second overlay.

use std::time::Instant;

use crate::{
    image::{draw, Color, Image},
    Error,
};

/// Position of the left end of the FPS text's baseline.
const TEXT_POS: (i32, i32) = (10, 70);

/// Computes the instantaneous frame rate between two frame timestamps.
///
/// Fails with [`Error::DegenerateTimeDelta`] if `current` is not after `previous`.
pub fn fps_between(previous: Instant, current: Instant) -> Result<f32, Error> {
    let delta = match current.checked_duration_since(previous) {
        Some(delta) if !delta.is_zero() => delta,
        _ => return Err(Error::DegenerateTimeDelta),
    };
    Ok(1.0 / delta.as_secs_f32())
}

/// Computes and draws the instantaneous FPS of the capture loop.
///
/// No smoothing is applied: the displayed value is computed from the two most recent frames
/// only.
#[derive(Debug, Default)]
pub struct FpsOverlay {
    previous: Option<Instant>,
}

impl FpsOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `now` and returns the FPS since the previous frame, rounded to the
    /// nearest integer.
    ///
    /// Returns [`None`] for the first frame, and when `now` is not after the previous frame (in
    /// which case the previous timestamp is kept).
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let Some(previous) = self.previous else {
            self.previous = Some(now);
            return None;
        };

        match fps_between(previous, now) {
            Ok(fps) => {
                self.previous = Some(now);
                Some(fps.round() as u32)
            }
            Err(e) => {
                log::trace!("skipping FPS update: {e}");
                None
            }
        }
    }

    /// Draws `fps` onto `frame`.
    pub fn draw(&self, frame: &mut Image, fps: u32) {
        let (x, y) = TEXT_POS;
        draw::text(frame, x, y, &fps.to_string())
            .color(Color::YELLOW)
            .large()
            .align_left()
            .align_bottom();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn fps_from_delta() {
        let t = Instant::now();
        let fps = fps_between(t, t + Duration::from_millis(40)).unwrap();
        approx::assert_relative_eq!(fps, 25.0, epsilon = 1e-3);
        assert_eq!(fps_between(t, t), Err(Error::DegenerateTimeDelta));
        assert_eq!(
            fps_between(t + Duration::from_millis(1), t),
            Err(Error::DegenerateTimeDelta)
        );
    }

    #[test]
    fn tick_rounds() {
        let t = Instant::now();
        let mut overlay = FpsOverlay::new();
        assert_eq!(overlay.tick(t), None);
        assert_eq!(overlay.tick(t + Duration::from_millis(33)), Some(30));
        assert_eq!(overlay.tick(t + Duration::from_millis(33 + 1000)), Some(1));
    }

    #[test]
    fn tick_survives_degenerate_delta() {
        let t = Instant::now();
        let mut overlay = FpsOverlay::new();
        overlay.tick(t);
        assert_eq!(overlay.tick(t), None);
        assert_eq!(overlay.tick(t + Duration::from_millis(50)), Some(20));
    }

    #[test]
    fn draws_yellow_text() {
        let mut frame = Image::filled(200, 100, Color::BLACK);
        FpsOverlay::new().draw(&mut frame, 30);
        assert_ne!(frame, Image::filled(200, 100, Color::BLACK));
        for y in 0..100 {
            for x in 0..200 {
                let c = frame.get(x, y);
                assert!(c == Color::BLACK || c == Color::YELLOW);
                if c == Color::YELLOW {
                    assert!(x >= 10 && y <= 70, "text pixel at ({x}, {y})");
                }
            }
        }
    }
}
