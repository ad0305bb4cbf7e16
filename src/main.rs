use std::env;

use anyhow::Context;
use handcam::{
    capture::{CancellationToken, CaptureLoop, LoopOptions},
    detector::HandDetector,
    gui::Window,
    landmark::LandmarkIdx,
    pipeline::{mediapipe::MediaPipeHands, HandOptions},
    video::webcam::{Webcam, WebcamOptions},
};
use signal_hook::consts::{SIGINT, SIGTERM};

const ENV_VAR_DEVICE: &str = "HANDCAM_DEVICE";
const ENV_VAR_MODEL_DIR: &str = "HANDCAM_MODEL_DIR";

fn main() -> anyhow::Result<()> {
    handcam::init_logger!();

    let index = match env::var(ENV_VAR_DEVICE) {
        Ok(s) => s
            .parse()
            .with_context(|| format!("invalid value for `{ENV_VAR_DEVICE}`: '{s}'"))?,
        Err(_) => 0,
    };
    let model_dir = env::var(ENV_VAR_MODEL_DIR).unwrap_or_else(|_| "models".into());

    let webcam = Webcam::open(WebcamOptions::default().index(index))?;
    let pipeline = MediaPipeHands::open(&HandOptions::default(), &model_dir)?;

    let token = CancellationToken::new();
    token.cancel_on_signal(SIGINT)?;
    token.cancel_on_signal(SIGTERM)?;
    let window = Window::new("Video", &token);
    let options = LoopOptions::default().highlight(Some(LandmarkIdx::MiddleFingerPip as usize));

    let mut capture = CaptureLoop::new(webcam, HandDetector::new(pipeline), window, options);
    capture.run(&token)
}
