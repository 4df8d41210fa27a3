use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use swatch::UniformBridge;
use tracing::{error, info, trace};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::gpu::GpuState;
use crate::motion::normalize_cursor;
use crate::render_loop::{RenderLoop, TickOutcome};
use crate::runtime::{FramePacer, SystemTimeSource};
use crate::types::{RenderSetupError, RendererConfig};

/// Fraction of the viewport scrolled per wheel line or arrow key.
pub const LINE_SCROLL: f32 = 0.15;

/// Input the window forwards to whoever drives the producers.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    ToggleGallery,
    TogglePicker,
    /// Positive values scroll down, in viewport heights.
    Scroll { viewports: f32 },
    Resized { width: u32, height: u32 },
    /// The window was closed by the user; the runtime is winding down.
    Closed,
    /// The background hit an unrecoverable surface error and was disposed.
    Fatal(String),
}

#[derive(Debug, Clone)]
enum WindowCommand {
    Shutdown,
}

/// Handle to the window thread that owns the render loop.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    events: Receiver<ShellEvent>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window, mounts the background and publishes its palette
    /// through `bridge`. Returns once the first mount either succeeded or
    /// failed.
    pub fn spawn(config: RendererConfig, bridge: UniformBridge) -> Result<Self, RenderSetupError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (event_tx, event_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("heroshade-window".into())
            .spawn(move || run_window_thread(config, bridge, ready_tx, event_tx))
            .map_err(|err| RenderSetupError::Thread(err.to_string()))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| RenderSetupError::Thread(format!("window thread exited early: {err}")))??;

        Ok(Self {
            proxy,
            events: event_rx,
            join_handle: Some(handle),
        })
    }

    pub fn events(&self) -> &Receiver<ShellEvent> {
        &self.events
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    config: RendererConfig,
    bridge: UniformBridge,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, RenderSetupError>>,
    event_tx: Sender<ShellEvent>,
) -> Result<()> {
    let fail = |err: RenderSetupError| {
        let message = err.to_string();
        let _ = ready_tx.send(Err(err));
        anyhow!(message)
    };

    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = builder
        .build()
        .map_err(|err| fail(RenderSetupError::EventLoop(err.to_string())))?;
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.surface_size.0, config.surface_size.1))
        .with_visible(config.show_window)
        .build(&event_loop)
        .map_err(|err| fail(RenderSetupError::Window(err.to_string())))?;
    let window = Arc::new(window);

    let mut render_loop = RenderLoop::new(
        bridge,
        config.motion,
        config.reduced_motion,
        Box::new(SystemTimeSource::new()),
    );
    let size = window.inner_size();
    render_loop
        .mount((size.width, size.height), || {
            GpuState::new(window.as_ref(), size, config.antialiasing, config.color_space)
        })
        .map_err(|err| {
            error!(error = %err, "failed to mount background");
            fail(err)
        })?;

    let mut pacer = FramePacer::new(config.target_fps);
    window.request_redraw();
    let _ = ready_tx.send(Ok(proxy));

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(WindowCommand::Shutdown) => {
            info!("window shutdown requested");
            elwt.exit();
        }
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                let _ = event_tx.send(ShellEvent::Closed);
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                match key_action(&event.logical_key) {
                    Some(KeyAction::Close) => {
                        let _ = event_tx.send(ShellEvent::Closed);
                        elwt.exit();
                    }
                    Some(KeyAction::Forward(shell_event)) => {
                        // Toggles fire once per press; scrolling repeats.
                        let is_toggle = matches!(
                            shell_event,
                            ShellEvent::ToggleGallery | ShellEvent::TogglePicker
                        );
                        if !(is_toggle && event.repeat) {
                            let _ = event_tx.send(shell_event);
                        }
                    }
                    None => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let viewports = wheel_viewports(delta, render_loop.size().1);
                if viewports != 0.0 {
                    let _ = event_tx.send(ShellEvent::Scroll { viewports });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (width, height) = render_loop.size();
                render_loop.set_pointer(normalize_cursor(position.x, position.y, width, height));
            }
            WindowEvent::Resized(new_size) => {
                render_loop.resize(new_size.width, new_size.height);
                let _ = event_tx.send(ShellEvent::Resized {
                    width: new_size.width,
                    height: new_size.height,
                });
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let (width, height) = render_loop.size();
                let _ = inner_size_writer.request_inner_size(PhysicalSize::new(width, height));
            }
            WindowEvent::RedrawRequested => match render_loop.tick() {
                TickOutcome::Drawn | TickOutcome::Skipped | TickOutcome::Reconfigured => {
                    pacer.mark_rendered(Instant::now());
                }
                TickOutcome::Fatal => {
                    let _ = event_tx.send(ShellEvent::Fatal("surface out of memory".into()));
                    elwt.exit();
                }
                TickOutcome::Idle => {}
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if pacer.ready_for_frame(now) {
                trace!("pacer: issuing redraw now");
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = pacer.next_deadline() {
                trace!(
                    deadline_ms = deadline.saturating_duration_since(now).as_millis(),
                    "pacer: waiting until next frame"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        Event::LoopExiting => {
            // GPU resources must go before the window they were created from.
            render_loop.dispose();
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

#[derive(Debug, Clone, PartialEq)]
enum KeyAction {
    Close,
    Forward(ShellEvent),
}

fn key_action(key: &Key) -> Option<KeyAction> {
    let forward = |event| Some(KeyAction::Forward(event));
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        Key::Named(NamedKey::PageDown) => forward(ShellEvent::Scroll { viewports: 1.0 }),
        Key::Named(NamedKey::PageUp) => forward(ShellEvent::Scroll { viewports: -1.0 }),
        Key::Named(NamedKey::ArrowDown) => forward(ShellEvent::Scroll {
            viewports: LINE_SCROLL,
        }),
        Key::Named(NamedKey::ArrowUp) => forward(ShellEvent::Scroll {
            viewports: -LINE_SCROLL,
        }),
        Key::Character(value) => match value.as_str() {
            "1" => forward(ShellEvent::ToggleGallery),
            ":" => forward(ShellEvent::TogglePicker),
            _ => None,
        },
        _ => None,
    }
}

fn wheel_viewports(delta: MouseScrollDelta, height: u32) -> f32 {
    match delta {
        // Wheel away from the user reports a positive line delta.
        MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_SCROLL,
        MouseScrollDelta::PixelDelta(position) => (-position.y / f64::from(height.max(1))) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn keys_map_to_shell_events() {
        assert_eq!(
            key_action(&Key::Character("1".into())),
            Some(KeyAction::Forward(ShellEvent::ToggleGallery))
        );
        assert_eq!(
            key_action(&Key::Character(":".into())),
            Some(KeyAction::Forward(ShellEvent::TogglePicker))
        );
        assert_eq!(
            key_action(&Key::Named(NamedKey::Escape)),
            Some(KeyAction::Close)
        );
        assert_eq!(
            key_action(&Key::Named(NamedKey::PageDown)),
            Some(KeyAction::Forward(ShellEvent::Scroll { viewports: 1.0 }))
        );
        assert_eq!(key_action(&Key::Character("x".into())), None);
    }

    #[test]
    fn wheel_scrolls_down_when_pulled_toward_user() {
        assert_eq!(
            wheel_viewports(MouseScrollDelta::LineDelta(0.0, -2.0), 600),
            2.0 * LINE_SCROLL
        );
        let pixels = wheel_viewports(
            MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -300.0)),
            600,
        );
        assert!((pixels - 0.5).abs() < 1e-6);
    }
}
