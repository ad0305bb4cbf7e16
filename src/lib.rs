//! Webcam hand tracking.
//!
//! Reads frames from a camera, finds hands in them with MediaPipe's palm detection and hand
//! landmark networks, and displays each frame with the hand skeletons, the landmarks of one hand
//! and the current frame rate drawn on top.
//!
//! # Coordinates
//!
//! Landmarks produced by the hand pipeline are normalized: X and Y are in range 0 to 1 relative to
//! the frame's width and height, with Y pointing *down*. Z is relative depth with the same scale as
//! X, smaller values being closer to the camera. [`detector::HandDetector`] converts them to integer
//! pixel coordinates of the frame they are drawn onto.
//!
//! # Environment Variables
//!
//! * `HANDCAM_DEVICE`: Index of the V4L2 camera device to open (`/dev/video{index}`). Defaults to
//!   `0`.
//! * `HANDCAM_MODEL_DIR`: Directory containing the ONNX models. Defaults to `models`.
//! * `HANDCAM_JPEG_BACKEND`: Configures the JPEG image decoder to use. Allowed values are:
//!   * `zune-jpeg` (the default): uses the [zune-jpeg] crate.
//!   * `jpeg-decoder`: uses the [jpeg-decoder] crate.
//! * `RUST_LOG`: Overrides the log levels set by [`init_logger!`].
//!
//! [zune-jpeg]: https://github.com/etemesi254/zune-jpeg
//! [jpeg-decoder]: https://github.com/image-rs/jpeg-decoder/

use log::LevelFilter;

pub mod capture;
pub mod detection;
pub mod detector;
mod error;
pub mod gui;
pub mod hand;
pub mod hud;
pub mod image;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod pipeline;
pub mod rect;
pub mod timer;
pub mod video;

#[cfg(test)]
mod test;

pub use error::Error;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and handcam log at *debug* level, `wgpu` at *warn* level. `RUST_LOG`
/// overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
