use winit::window::Window;

use crate::device::{DeviceCaps, Gpu, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::render::{RenderCtx, SurfaceTarget};
use crate::time::FrameTime;

/// Context passed to device create/reset callbacks.
pub struct DeviceCtx<'a> {
    pub render: RenderCtx<'a>,
    pub caps: &'a DeviceCaps,
    /// Drawable size in physical pixels.
    pub surface_size: (u32, u32),
}

impl<'a> DeviceCtx<'a> {
    pub(crate) fn from_gpu(gpu: &'a Gpu<'_>) -> Self {
        let size = gpu.size();
        Self {
            render: RenderCtx::from_gpu(gpu),
            caps: gpu.caps(),
            surface_size: (size.width, size.height),
        }
    }
}

/// What became of a frame handed to `FrameCtx::render`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Presented,
    /// No surface texture was available; the runtime acts on the error.
    Skipped(SurfaceErrorAction),
    /// The device went away; the frame was dropped unsubmitted.
    DeviceLost,
}

/// Per-frame context passed to `DeviceLifecycleHandlers::on_frame_render`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    window: &'a Window,
    gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    surface_action: Option<SurfaceErrorAction>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    pub(crate) fn new(
        window: &'a Window,
        gpu: &'a mut Gpu<'w>,
        input: &'a InputState,
        input_frame: &'a InputFrame,
        time: FrameTime,
    ) -> Self {
        Self {
            window,
            gpu,
            input,
            input_frame,
            time,
            surface_action: None,
        }
    }

    pub fn window(&self) -> &Window {
        self.window
    }

    pub fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::from_gpu(self.gpu)
    }

    /// Drawable size in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let s = self.gpu.size();
        (s.width, s.height)
    }

    /// Surface error hit by `render`, if any.
    pub(crate) fn surface_action(&self) -> Option<SurfaceErrorAction> {
        self.surface_action
    }

    /// Acquires the next surface texture, lets `draw` record into it, then submits
    /// and presents.
    ///
    /// If `draw` fails, or the device is lost while it runs, the frame is dropped
    /// without being submitted.
    pub fn render<E, F>(&mut self, draw: F) -> Result<FrameStatus, E>
    where
        F: FnOnce(RenderCtx<'_>, SurfaceTarget<'_>) -> Result<(), E>,
    {
        if self.gpu.is_lost() {
            return Ok(FrameStatus::DeviceLost);
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                self.surface_action = Some(action);
                return Ok(FrameStatus::Skipped(action));
            }
        };

        let gpu: &Gpu<'w> = self.gpu;
        let size = gpu.size();

        let result = draw(
            RenderCtx::from_gpu(gpu),
            SurfaceTarget {
                encoder: &mut frame.encoder,
                view: &frame.view,
                size: (size.width, size.height),
                device_lost: gpu.lost_flag(),
            },
        );

        match result {
            Ok(()) if !gpu.is_lost() => {
                self.window.pre_present_notify();
                gpu.submit(frame);
                Ok(FrameStatus::Presented)
            }
            Ok(()) => {
                gpu.discard(frame);
                Ok(FrameStatus::DeviceLost)
            }
            Err(e) => {
                gpu.discard(frame);
                Err(e)
            }
        }
    }
}
