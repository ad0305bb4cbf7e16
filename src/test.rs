//! Test fixtures: scripted inputs standing in for the camera, the networks and the window.

use std::collections::VecDeque;

use crate::{
    capture::{CancellationToken, FrameSink, FrameSource},
    image::{Color, Image, RgbFrame},
    landmark::HandLandmarks,
    pipeline::{HandPipeline, HandResults},
    Error,
};

/// A pipeline returning predetermined results.
pub struct ScriptedPipeline {
    script: VecDeque<anyhow::Result<HandResults>>,
    fallback: Vec<HandLandmarks>,
    pub calls: usize,
}

impl ScriptedPipeline {
    /// Never finds any hands.
    pub fn empty() -> Self {
        Self::repeat(Vec::new())
    }

    /// Finds `hands` in every frame.
    pub fn repeat(hands: Vec<HandLandmarks>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: hands,
            calls: 0,
        }
    }

    /// Returns `result` for the next frame, before falling back to the repeated hands.
    pub fn then(mut self, result: anyhow::Result<HandResults>) -> Self {
        self.script.push_back(result);
        self
    }
}

impl HandPipeline for ScriptedPipeline {
    fn process(&mut self, _frame: &RgbFrame) -> anyhow::Result<HandResults> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(result) => result,
            None => Ok(HandResults::new(self.fallback.clone())),
        }
    }
}

/// A frame source replaying a list of read results, then cancelling the loop.
pub struct ScriptedSource {
    frames: VecDeque<Result<Image, Error>>,
    token: CancellationToken,
}

impl ScriptedSource {
    pub fn new(token: &CancellationToken) -> Self {
        Self {
            frames: VecDeque::new(),
            token: token.clone(),
        }
    }

    pub fn frame(mut self, width: u32, height: u32) -> Self {
        self.frames
            .push_back(Ok(Image::filled(width, height, Color::BLACK)));
        self
    }

    pub fn failure(mut self) -> Self {
        self.frames
            .push_back(Err(Error::FrameReadFailure("scripted failure".into())));
        self
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Result<Image, Error> {
        let next = self.frames.pop_front();
        if self.frames.is_empty() {
            self.token.cancel();
        }
        next.unwrap_or_else(|| Err(Error::FrameReadFailure("end of script".into())))
    }
}

/// A frame source whose reads always fail, like an unplugged camera that still reports errors.
#[derive(Default)]
pub struct BrokenSource {
    pub reads: usize,
}

impl FrameSource for BrokenSource {
    fn read(&mut self) -> Result<Image, Error> {
        self.reads += 1;
        Err(Error::FrameReadFailure("device vanished".into()))
    }
}

/// A sink remembering every frame shown.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Image>,
}

impl FrameSink for RecordingSink {
    fn show(&mut self, frame: &Image) -> anyhow::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}
