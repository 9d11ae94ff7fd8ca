use winit::event::WindowEvent;

use crate::device::{DeviceCaps, GpuInit};
use crate::input::InputState;
use crate::time::FrameTime;

use super::ctx::{DeviceCtx, FrameCtx};

/// Control directive returned by per-frame callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Callbacks the runtime drives over the life of the graphics device.
///
/// Order of calls:
/// - startup: `modify_device_settings`, `is_device_acceptable`, `on_device_create`,
///   `on_device_reset`;
/// - each frame: `on_frame_move`, then `on_frame_render`;
/// - surface lost or resized: `on_device_lost`, `on_device_reset`;
/// - device lost: `on_device_lost`, `on_device_destroy`, `on_device_create`,
///   `on_device_reset`;
/// - shutdown: `on_device_lost`, `on_device_destroy`.
///
/// Errors from `on_device_create`, `on_device_reset` and `on_frame_render` stop the
/// runtime; `Runtime::run` returns them.
pub trait DeviceLifecycleHandlers {
    /// Rejecting an adapter aborts startup.
    fn is_device_acceptable(&self, caps: &DeviceCaps) -> bool {
        let _ = caps;
        true
    }

    /// Adjusts device settings before the device is created.
    fn modify_device_settings(&mut self, init: &mut GpuInit) {
        let _ = init;
    }

    /// Creates resources that live as long as the device.
    fn on_device_create(&mut self, ctx: &DeviceCtx<'_>) -> anyhow::Result<()>;

    /// Creates or refreshes resources tied to the surface configuration.
    fn on_device_reset(&mut self, ctx: &DeviceCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Releases resources created by `on_device_reset`.
    fn on_device_lost(&mut self) {}

    /// Releases resources created by `on_device_create`.
    fn on_device_destroy(&mut self) {}

    /// Updates simulation state. Runs before `on_frame_render` every frame.
    fn on_frame_move(&mut self, time: FrameTime, input: &InputState) -> LoopControl {
        let _ = (time, input);
        LoopControl::Continue
    }

    fn on_frame_render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<LoopControl>;

    /// Sees every window event before the runtime handles it.
    fn on_message(&mut self, event: &WindowEvent) -> LoopControl {
        let _ = event;
        LoopControl::Continue
    }
}
