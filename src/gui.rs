//! A window displaying the annotated camera feed.
//!
//! The window is driven by the capture loop: each [`Window::show`] call uploads a frame and then
//! handles the window events that arrived since the previous call, without blocking.

mod renderer;

use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
};

use crate::{
    capture::{CancellationToken, FrameSink},
    image::Image,
};

use self::renderer::Renderer;

/// A window showing the frames passed to [`FrameSink::show`].
///
/// The OS window is created when the first frame arrives, sized to that frame. Pressing Escape
/// or `q`, or closing the window, cancels the token passed to [`Window::new`].
pub struct Window {
    title: String,
    token: CancellationToken,
    // Declared before `event_loop` so the surface and window go away first.
    renderer: Option<Renderer>,
    event_loop: Option<EventLoop<()>>,
}

impl Window {
    pub fn new(title: impl Into<String>, token: &CancellationToken) -> Self {
        Self {
            title: title.into(),
            token: token.clone(),
            renderer: None,
            event_loop: None,
        }
    }

    /// Returns whether the OS window has been created yet.
    pub fn is_open(&self) -> bool {
        self.renderer.is_some()
    }

    fn pump_events(&mut self) {
        let (Some(event_loop), Some(renderer)) = (&mut self.event_loop, &self.renderer) else {
            return;
        };
        let window_id = renderer.window().id();
        let token = &self.token;
        event_loop.run_return(|event, _target, flow| {
            *flow = ControlFlow::Poll;
            match event {
                Event::WindowEvent { window_id: id, event } if id == window_id => match event {
                    WindowEvent::CloseRequested => {
                        log::debug!("window closed");
                        token.cancel();
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(key),
                                ..
                            },
                        ..
                    } if is_exit_key(key) => {
                        log::debug!("{:?} pressed", key);
                        token.cancel();
                    }
                    _ => {}
                },
                Event::MainEventsCleared => *flow = ControlFlow::Exit,
                _ => {}
            }
        });
    }
}

fn is_exit_key(key: VirtualKeyCode) -> bool {
    matches!(key, VirtualKeyCode::Escape | VirtualKeyCode::Q)
}

impl FrameSink for Window {
    fn show(&mut self, frame: &Image) -> anyhow::Result<()> {
        let renderer = match self.renderer.take() {
            Some(renderer) => renderer,
            None => {
                log::debug!("creating window '{}' at {}", self.title, frame.resolution());
                let event_loop = self.event_loop.get_or_insert_with(EventLoop::new);
                Renderer::open(event_loop, &self.title, frame.resolution())?
            }
        };
        let renderer = self.renderer.insert(renderer);

        renderer.update_texture(frame.resolution(), frame.data());
        renderer.redraw()?;
        self.pump_events();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keys() {
        assert!(is_exit_key(VirtualKeyCode::Escape));
        assert!(is_exit_key(VirtualKeyCode::Q));
        assert!(!is_exit_key(VirtualKeyCode::W));
        assert!(!is_exit_key(VirtualKeyCode::Space));
    }

    #[test]
    fn window_opens_lazily() {
        let token = CancellationToken::new();
        let window = Window::new("Video", &token);
        assert!(!window.is_open());
        assert!(!token.is_cancelled());
    }
}
