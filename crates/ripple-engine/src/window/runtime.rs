use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::core::{DeviceCtx, DeviceLifecycleHandlers, FrameCtx, LoopControl};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputEvent, InputFrame, InputState, Key, KeyState};
use crate::time::FrameClock;

/// Framework key bindings handled before the application sees a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Hotkeys {
    /// Escape closes the window.
    pub escape_exits: bool,
    /// Alt+Enter toggles borderless fullscreen.
    pub alt_enter_fullscreen: bool,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            escape_exits: true,
            alt_enter_fullscreen: true,
        }
    }
}

impl Hotkeys {
    fn action(&self, ev: &InputEvent) -> Option<HotkeyAction> {
        let InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers,
            repeat: false,
        } = ev
        else {
            return None;
        };

        match key {
            Key::Escape if self.escape_exits => Some(HotkeyAction::Exit),
            Key::Enter if self.alt_enter_fullscreen && modifiers.alt => Some(HotkeyAction::ToggleFullscreen),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HotkeyAction {
    Exit,
    ToggleFullscreen,
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub hotkeys: Hotkeys,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "ripple".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            hotkeys: Hotkeys::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, creates the device and runs until exit.
    ///
    /// Returns the first fatal error raised by device creation or a handler.
    pub fn run<H>(config: RuntimeConfig, gpu_init: GpuInit, handlers: H) -> Result<()>
    where
        H: DeviceLifecycleHandlers + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, handlers);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Where the device currently stands in its lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum DeviceStage {
    /// No device objects exist on the application side.
    Destroyed,
    /// `on_device_create` ran; surface resources are not valid.
    Created,
    /// Fully usable.
    Reset,
}

struct AppState<H>
where
    H: DeviceLifecycleHandlers + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    handlers: H,

    entry: Option<WindowEntry>,
    stage: DeviceStage,

    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    fatal: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<H> AppState<H>
where
    H: DeviceLifecycleHandlers + 'static,
{
    fn new(config: RuntimeConfig, mut gpu_init: GpuInit, mut handlers: H) -> Self {
        handlers.modify_device_settings(&mut gpu_init);
        Self {
            config,
            gpu_init,
            handlers,
            entry: None,
            stage: DeviceStage::Destroyed,
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            fatal: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn fail(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        self.request_exit();
    }

    fn build_entry(window: Window, gpu_init: GpuInit, handlers: &H) -> Result<WindowEntry> {
        WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init, |caps| handlers.is_device_acceptable(caps))),
        }
        .try_build()
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = Self::build_entry(window, self.gpu_init.clone(), &self.handlers)
            .context("GPU initialization failed")?;
        self.entry = Some(entry);

        self.create_and_reset()
    }

    /// `on_device_create` then `on_device_reset` against the current device.
    fn create_and_reset(&mut self) -> Result<()> {
        let Some(entry) = self.entry.as_ref() else {
            return Ok(());
        };
        let handlers = &mut self.handlers;

        entry.with_gpu(|gpu| -> Result<()> {
            let ctx = DeviceCtx::from_gpu(gpu);
            handlers.on_device_create(&ctx).context("device create failed")?;
            self.stage = DeviceStage::Created;
            handlers.on_device_reset(&ctx).context("device reset failed")?;
            self.stage = DeviceStage::Reset;
            Ok(())
        })?;

        log::info!("device ready");
        self.clock.reset();
        Ok(())
    }

    /// `on_device_reset` after the surface was reconfigured.
    fn reset(&mut self) -> Result<()> {
        if self.stage == DeviceStage::Destroyed {
            return Ok(());
        }
        let Some(entry) = self.entry.as_ref() else {
            return Ok(());
        };
        let handlers = &mut self.handlers;

        entry.with_gpu(|gpu| handlers.on_device_reset(&DeviceCtx::from_gpu(gpu)))
            .context("device reset failed")?;
        self.stage = DeviceStage::Reset;
        Ok(())
    }

    fn lose(&mut self) {
        if self.stage == DeviceStage::Reset {
            self.handlers.on_device_lost();
            self.stage = DeviceStage::Created;
        }
    }

    fn destroy(&mut self) {
        self.lose();
        if self.stage == DeviceStage::Created {
            self.handlers.on_device_destroy();
            self.stage = DeviceStage::Destroyed;
        }
    }

    /// Rebuilds the GPU for the same window after wgpu reported device loss.
    fn recreate_device(&mut self) -> Result<()> {
        log::warn!("graphics device lost; recreating");
        self.destroy();

        let Some(entry) = self.entry.take() else {
            return Ok(());
        };
        let window = entry.into_heads().window;

        let entry = Self::build_entry(window, self.gpu_init.clone(), &self.handlers)
            .context("GPU re-initialization after device loss failed")?;
        self.entry = Some(entry);

        self.create_and_reset()
    }

    /// Surface reconfiguration: lost, then reset once the new configuration is live.
    fn reconfigure(&mut self, new_size: Option<winit::dpi::PhysicalSize<u32>>) -> Result<()> {
        self.lose();

        if let (Some(size), Some(entry)) = (new_size, self.entry.as_mut()) {
            entry.with_gpu_mut(|gpu| gpu.resize(size));
        }

        self.reset()
    }

    fn toggle_fullscreen(&self) {
        let Some(entry) = self.entry.as_ref() else { return };
        entry.with_window(|w| {
            let next = match w.fullscreen() {
                Some(_) => None,
                None => Some(Fullscreen::Borderless(None)),
            };
            log::info!("fullscreen {}", if next.is_some() { "on" } else { "off" });
            w.set_fullscreen(next);
        });
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.destroy();
        self.entry = None;
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<LoopControl> {
        let is_lost = self.entry.as_ref().is_some_and(|e| e.with_gpu(|gpu| gpu.is_lost()));
        if is_lost {
            self.recreate_device()?;
        }
        if self.stage != DeviceStage::Reset {
            return Ok(LoopControl::Continue);
        }

        let time = self.clock.tick();

        if self.handlers.on_frame_move(time, &self.input_state) == LoopControl::Exit {
            return Ok(LoopControl::Exit);
        }

        let Some(entry) = self.entry.as_mut() else {
            return Ok(LoopControl::Continue);
        };

        let handlers = &mut self.handlers;
        let input_state = &self.input_state;
        let input_frame = &self.input_frame;

        let (control, surface_action) = entry.with_mut(|fields| -> Result<_> {
            let mut ctx = FrameCtx::new(fields.window, fields.gpu, input_state, input_frame, time);
            let control = handlers.on_frame_render(&mut ctx)?;
            Ok((control, ctx.surface_action()))
        })?;

        self.input_frame.clear();

        match surface_action {
            Some(SurfaceErrorAction::Reconfigured) => {
                // The surface was reconfigured in place; surface resources follow.
                self.lose();
                self.reset()?;
            }
            Some(SurfaceErrorAction::Fatal) => anyhow::bail!("surface failed irrecoverably"),
            Some(SurfaceErrorAction::SkipFrame) | None => {}
        }

        Ok(control)
    }
}

impl<H> ApplicationHandler for AppState<H>
where
    H: DeviceLifecycleHandlers + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.open_window(event_loop) {
            self.fail(e);
            self.shutdown(event_loop);
            return;
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            self.shutdown(event_loop);
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);

        // Continuous redraw: the effect animates every frame.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            self.shutdown(event_loop);
            return;
        }

        if let Some(ev) = translate_window_event(&self.input_state, &event) {
            match self.config.hotkeys.action(&ev) {
                Some(HotkeyAction::Exit) => self.request_exit(),
                Some(HotkeyAction::ToggleFullscreen) => self.toggle_fullscreen(),
                None => {}
            }
            self.input_state.apply_event(&mut self.input_frame, ev);
        }

        if self.handlers.on_message(&event) == LoopControl::Exit {
            self.request_exit();
        }

        match &event {
            WindowEvent::CloseRequested => self.request_exit(),

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    if let Err(e) = self.reconfigure(Some(*new_size)) {
                        self.fail(e);
                    }
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size()));
                if let Some(size) = new_size.filter(|s| s.width > 0 && s.height > 0) {
                    if let Err(e) = self.reconfigure(Some(size)) {
                        self.fail(e);
                    }
                }
            }

            WindowEvent::RedrawRequested => match self.redraw() {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => self.request_exit(),
                Err(e) => self.fail(e),
            },

            _ => {}
        }

        if self.exit_requested {
            self.shutdown(event_loop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn press(key: Key, alt: bool, repeat: bool) -> InputEvent {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers {
                alt,
                ..Modifiers::default()
            },
            repeat,
        }
    }

    #[test]
    fn escape_and_alt_enter_are_recognized() {
        let hk = Hotkeys::default();
        assert_eq!(hk.action(&press(Key::Escape, false, false)), Some(HotkeyAction::Exit));
        assert_eq!(hk.action(&press(Key::Enter, true, false)), Some(HotkeyAction::ToggleFullscreen));
        assert_eq!(hk.action(&press(Key::Enter, false, false)), None);
    }

    #[test]
    fn repeats_and_releases_are_ignored() {
        let hk = Hotkeys::default();
        assert_eq!(hk.action(&press(Key::Escape, false, true)), None);

        let release = InputEvent::Key {
            key: Key::Escape,
            state: KeyState::Released,
            modifiers: Modifiers::default(),
            repeat: false,
        };
        assert_eq!(hk.action(&release), None);
    }

    #[test]
    fn disabled_hotkeys_do_nothing() {
        let hk = Hotkeys {
            escape_exits: false,
            alt_enter_fullscreen: false,
        };
        assert_eq!(hk.action(&press(Key::Escape, false, false)), None);
        assert_eq!(hk.action(&press(Key::Enter, true, false)), None);
    }
}
