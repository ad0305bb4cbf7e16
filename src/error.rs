//! Error conditions of the hand tracking loop.
//!
//! Most fallible operations in this crate return [`anyhow::Result`], since there is nothing a
//! caller could do about a broken model file or GPU. The conditions listed in [`Error`] are the
//! ones the capture loop (or a user of [`HandDetector`]) is expected to react to.
//!
//! [`HandDetector`]: crate::detector::HandDetector

/// Conditions with defined recovery behavior.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The camera device could not be opened or configured. Fatal at startup.
    #[error("camera {index} is unavailable: {reason}")]
    CameraUnavailable { index: u32, reason: String },

    /// A single frame could not be read from the camera. The iteration is skipped.
    #[error("failed to read frame: {0}")]
    FrameReadFailure(String),

    /// Landmarks were requested before any detection pass ran.
    #[error("no inference result available (`find_hands` has not been called yet)")]
    NoInferenceAvailable,

    /// A hand was requested by index, but fewer hands were detected.
    #[error("hand index {index} is out of range ({count} hands detected)")]
    HandIndexOutOfRange { index: usize, count: usize },

    /// Two consecutive timestamps were equal or went backwards.
    #[error("timestamp delta is zero or negative")]
    DegenerateTimeDelta,

    /// A configuration value is outside of its valid range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl Error {
    /// Returns whether the capture loop can continue with the next iteration after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FrameReadFailure(_) | Error::HandIndexOutOfRange { .. } | Error::DegenerateTimeDelta
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverability() {
        assert!(Error::FrameReadFailure("eof".into()).is_recoverable());
        assert!(Error::DegenerateTimeDelta.is_recoverable());
        assert!(Error::HandIndexOutOfRange { index: 1, count: 1 }.is_recoverable());
        assert!(!Error::NoInferenceAvailable.is_recoverable());
        assert!(!Error::CameraUnavailable {
            index: 0,
            reason: "busy".into()
        }
        .is_recoverable());
    }

    #[test]
    fn messages() {
        let e = Error::HandIndexOutOfRange { index: 2, count: 1 };
        assert_eq!(e.to_string(), "hand index 2 is out of range (1 hands detected)");
    }
}
