//! Performance measurement tools.

use std::{
    cell::Cell,
    fmt, iter,
    time::{Duration, Instant},
};

use itertools::Itertools;

/// Weight of a new sample in the exponential moving average.
const EMA_ALPHA: f32 = 0.1;

/// A timer that measures how long an operation takes.
///
/// Timings are smoothed with an exponential moving average. Displaying the timer with `{}`
/// ([`std::fmt::Display`]) prints the average and the number of samples taken since it was last
/// displayed.
pub struct Timer {
    name: &'static str,
    avg_ms: Option<f32>,
    samples: Cell<u32>,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            avg_ms: None,
            samples: Cell::new(0),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the averaged duration of the timed operation, if any was recorded.
    pub fn average(&self) -> Option<Duration> {
        self.avg_ms
            .map(|ms| Duration::from_secs_f32(ms.max(0.0) / 1000.0))
    }

    fn record(&mut self, duration: Duration) {
        let ms = duration.as_secs_f32() * 1000.0;
        self.avg_ms = Some(match self.avg_ms {
            Some(avg) => avg + (ms - avg) * EMA_ALPHA,
            None => ms,
        });
        self.samples.set(self.samples.get() + 1);
    }
}

/// Displays the average recorded time and resets the sample count.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let samples = self.samples.replace(0);
        match self.avg_ms {
            Some(avg_ms) => write!(f, "{}: {samples}x{avg_ms:.01}ms", self.name),
            None => write!(f, "{}: -", self.name),
        }
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs frames per second with optional extra data.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.tick_with(iter::empty::<&str>());
    }

    /// Advances the frame counter by 1 and logs FPS and `extra` data if one second has passed.
    ///
    /// `extra` is only formatted when a line is logged.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) {
        self.frames += 1;
        if self.start.elapsed() <= Duration::from_secs(1) {
            return;
        }

        let extra = extra.into_iter().join(", ");
        if extra.is_empty() {
            log::debug!("{}: {} FPS", self.name, self.frames);
        } else {
            log::debug!("{}: {} FPS ({})", self.name, self.frames, extra);
        }

        self.frames = 0;
        self.start = Instant::now();
    }

    /// Returns the number of frames counted since FPS was last logged.
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_averages() {
        let mut timer = Timer::new("op");
        assert_eq!(timer.to_string(), "op: -");
        assert!(timer.average().is_none());

        timer.record(Duration::from_millis(10));
        let avg = timer.average().unwrap().as_secs_f32() * 1000.0;
        approx::assert_relative_eq!(avg, 10.0, epsilon = 1e-3);
        timer.record(Duration::from_millis(20));
        let avg = timer.average().unwrap().as_secs_f32() * 1000.0;
        approx::assert_relative_eq!(avg, 11.0, epsilon = 1e-3);

        assert_eq!(timer.to_string(), "op: 2x11.0ms");
        assert_eq!(timer.to_string(), "op: 0x11.0ms");
    }

    #[test]
    fn fps_counter_counts_frames() {
        let timer = Timer::new("t");
        let mut fps = FpsCounter::new("test");
        fps.tick();
        fps.tick_with([&timer]);
        assert_eq!(fps.frames(), 2);
        // the samples are only consumed when a line is logged
        assert_eq!(timer.to_string(), "t: -");
    }

    #[test]
    fn timer_guard_records() {
        let mut timer = Timer::new("guarded");
        let value = timer.time(|| 42);
        assert_eq!(value, 42);
        assert!(timer.average().is_some());
    }
}
