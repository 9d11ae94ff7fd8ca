use anyhow::Context;

use ripple_engine::core::{DeviceCtx, DeviceLifecycleHandlers, FrameCtx, FrameStatus, LoopControl};
use ripple_engine::device::{DeviceCaps, GpuInit};
use ripple_engine::input::InputState;
use ripple_engine::render::{WgpuRenderDevice, OFFSCREEN_FORMAT};
use ripple_engine::time::FrameTime;

use crate::config::DemoConfig;
use crate::frame::{FrameController, FrameError, FramePhase};
use crate::player::DirectionalKeys;
use crate::state::RenderState;

/// The demo's side of the device lifecycle.
pub struct ReflectionDemo {
    config: DemoConfig,
    controller: FrameController,
    state: Option<RenderState>,
}

impl ReflectionDemo {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            controller: FrameController::new(config.clone()),
            config,
            state: None,
        }
    }
}

impl DeviceLifecycleHandlers for ReflectionDemo {
    fn is_device_acceptable(&self, caps: &DeviceCaps) -> bool {
        let (w, h) = self.config.output_size;
        let blendable = caps.supports_blendable_render_target(OFFSCREEN_FORMAT);
        let fits = caps.fits_texture(w, h);
        if !blendable {
            log::warn!("{} cannot blend into {OFFSCREEN_FORMAT:?} render targets", caps.adapter_name);
        }
        if !fits {
            log::warn!("{} cannot allocate {w}x{h} textures", caps.adapter_name);
        }
        blendable && fits
    }

    fn modify_device_settings(&mut self, init: &mut GpuInit) {
        // Layers and the surface share one linear encoding.
        init.prefer_srgb = false;
        if !init.query_formats.contains(&OFFSCREEN_FORMAT) {
            init.query_formats.push(OFFSCREEN_FORMAT);
        }
    }

    fn on_device_create(&mut self, ctx: &DeviceCtx<'_>) -> anyhow::Result<()> {
        let state = RenderState::create(&ctx.render, &self.config).context("failed to create render resources")?;
        self.state = Some(state);
        Ok(())
    }

    fn on_device_lost(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.release_device_objects();
        }
    }

    fn on_device_destroy(&mut self) {
        if let Some(state) = self.state.take() {
            state.destroy();
        }
    }

    fn on_frame_move(&mut self, _time: FrameTime, input: &InputState) -> LoopControl {
        self.controller.update_input(DirectionalKeys::poll(input));
        LoopControl::Continue
    }

    fn on_frame_render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<LoopControl> {
        let Some(state) = self.state.as_mut() else {
            return Ok(LoopControl::Continue);
        };

        let scene = state.scene();
        let elapsed = ctx.time.elapsed;
        let controller = &mut self.controller;

        let status = ctx.render(|rctx, surface| -> Result<(), FrameError> {
            let mut device = WgpuRenderDevice::new(rctx, surface, state.resources());
            controller.render(&mut device, &scene, elapsed)?;
            device.finish().map_err(|source| FrameError {
                phase: FramePhase::Present,
                source,
            })
        });

        match status {
            Ok(FrameStatus::Presented) => self.controller.finish(),
            Ok(FrameStatus::Skipped(action)) => {
                log::debug!("frame skipped: {action:?}");
                self.controller.finish();
            }
            Ok(FrameStatus::DeviceLost) => {
                log::warn!("frame dropped: graphics device lost");
                self.controller.finish();
            }
            Err(err) if err.is_device_lost() => log::warn!("{err}; waiting for device reset"),
            Err(err) => return Err(err.into()),
        }

        Ok(LoopControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_request_linear_surface_and_query_layer_format() {
        let mut demo = ReflectionDemo::new(DemoConfig::default());
        let mut init = GpuInit {
            query_formats: Vec::new(),
            ..GpuInit::default()
        };
        demo.modify_device_settings(&mut init);
        assert!(!init.prefer_srgb);
        assert_eq!(init.query_formats, vec![OFFSCREEN_FORMAT]);

        demo.modify_device_settings(&mut init);
        assert_eq!(init.query_formats.len(), 1);
    }

    #[test]
    fn adapter_without_queried_layer_format_is_rejected() {
        let demo = ReflectionDemo::new(DemoConfig::default());
        let caps = DeviceCaps {
            adapter_name: "test".into(),
            max_texture_dimension_2d: 8192,
            ..DeviceCaps::default()
        };
        assert!(!demo.is_device_acceptable(&caps));
    }

    #[test]
    fn lifecycle_notifications_without_resources_are_harmless() {
        let mut demo = ReflectionDemo::new(DemoConfig::default());
        demo.on_device_lost();
        demo.on_device_destroy();
        demo.on_device_lost();
        assert!(demo.state.is_none());
    }
}
