use std::sync::atomic::{AtomicBool, Ordering};

use crate::coords::{ColorRgba, Viewport};

use super::guard::BindingGuard;
use super::{
    CompositeEffect, CompositeParams, OffscreenTargets, RenderCtx, RenderDevice, RenderError, SpriteBatcher,
    SpriteDraw, SpriteTransform, TargetSlot, Texture, TextureId, TextureRef, TextureStore,
};

/// Long-lived render objects a frame draws with.
pub struct FrameResources<'r> {
    pub textures: &'r TextureStore,
    pub targets: &'r OffscreenTargets,
    pub sprites: &'r mut SpriteBatcher,
    pub effect: &'r mut CompositeEffect,
}

/// The swap-chain side of one frame.
pub struct SurfaceTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    /// Drawable size in physical pixels.
    pub size: (u32, u32),
    /// Raised by the device-lost callback.
    pub device_lost: &'a AtomicBool,
}

/// `RenderDevice` recording into one frame's command encoder.
///
/// Starts bound to the main target. Nothing reaches the GPU until the owner of
/// the encoder submits it.
pub struct WgpuRenderDevice<'a> {
    ctx: RenderCtx<'a>,
    encoder: &'a mut wgpu::CommandEncoder,
    main_view: &'a wgpu::TextureView,
    main_size: (u32, u32),
    device_lost: &'a AtomicBool,
    resources: FrameResources<'a>,
    bound: TargetSlot,
}

impl<'a> WgpuRenderDevice<'a> {
    /// The surface view must be in `ctx.surface_format`.
    pub fn new(ctx: RenderCtx<'a>, surface: SurfaceTarget<'a>, resources: FrameResources<'a>) -> Self {
        Self {
            ctx,
            encoder: surface.encoder,
            main_view: surface.view,
            main_size: surface.size,
            device_lost: surface.device_lost,
            resources,
            bound: TargetSlot::Main,
        }
    }

    /// Checks that no batch or effect run was left open.
    pub fn finish(self) -> Result<(), RenderError> {
        self.guard().check_finish()
    }

    fn guard(&self) -> BindingGuard {
        BindingGuard::observe(self.bound, self.resources.sprites, self.resources.effect)
    }

    fn target(&self, slot: TargetSlot) -> (&'a wgpu::TextureView, (u32, u32), wgpu::TextureFormat) {
        match slot {
            TargetSlot::Main => (self.main_view, self.main_size, self.ctx.surface_format),
            TargetSlot::Offscreen(s) => {
                let targets: &'a OffscreenTargets = self.resources.targets;
                let t = targets.get(s);
                (t.view(), t.size(), t.format())
            }
        }
    }

    /// Fails once the device is gone; recording further work would be wasted.
    fn ensure_device(&self) -> Result<(), RenderError> {
        if self.device_lost.load(Ordering::Acquire) {
            return Err(RenderError::DeviceLost);
        }
        Ok(())
    }

}

impl<'a> RenderDevice for WgpuRenderDevice<'a> {
    fn bind_target(&mut self, slot: TargetSlot) -> Result<(), RenderError> {
        self.guard().check_bind(slot)?;
        self.bound = slot;
        Ok(())
    }

    fn bound_target(&self) -> TargetSlot {
        self.bound
    }

    fn clear(&mut self, color: ColorRgba) -> Result<(), RenderError> {
        self.guard().check_clear()?;
        self.ensure_device()?;

        let (view, _, _) = self.target(self.bound);
        let _rpass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ripple clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.into()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Ok(())
    }

    fn begin_sprites(&mut self) -> Result<(), RenderError> {
        self.resources.sprites.begin()
    }

    fn draw_sprite(&mut self, texture: TextureId, transform: SpriteTransform) -> Result<(), RenderError> {
        let size = self
            .resources
            .textures
            .size(texture)
            .ok_or(RenderError::InvalidState("sprite texture is not in the store"))?;
        self.resources.sprites.draw(SpriteDraw::new(texture, size, transform))
    }

    fn end_sprites(&mut self) -> Result<(), RenderError> {
        if !self.resources.sprites.is_open() {
            return Err(RenderError::InvalidState("sprite batch end without begin"));
        }
        if let Err(e) = self.ensure_device() {
            let _ = self.resources.sprites.take();
            return Err(e);
        }
        let (view, (w, h), format) = self.target(self.bound);
        let drawn = self.resources.sprites.end(
            &self.ctx,
            self.encoder,
            view,
            format,
            Viewport::new(w as f32, h as f32),
            self.resources.textures,
        )?;
        log::trace!("{drawn} sprite(s) onto {:?}", self.bound);
        Ok(())
    }

    fn set_composite_params(&mut self, params: CompositeParams) -> Result<(), RenderError> {
        self.resources.effect.set_parameters(params)
    }

    fn begin_composite(&mut self) -> Result<u32, RenderError> {
        self.guard().check_begin_composite()?;
        self.ensure_device()?;

        let count = self.resources.effect.begin()?;

        let (_, _, format) = self.target(self.bound);
        let textures: &'a TextureStore = self.resources.textures;
        let targets: &'a OffscreenTargets = self.resources.targets;
        let prepared = self.resources.effect.prepare(&self.ctx, format, |r| match r {
            TextureRef::Stored(id) => textures.get(id).map(Texture::view),
            TextureRef::Target(slot) => Some(targets.get(slot).view()),
        });

        if let Err(e) = prepared {
            // No pass is open yet, so ending cannot fail.
            let _ = self.resources.effect.end();
            return Err(e);
        }

        Ok(count)
    }

    fn begin_composite_pass(&mut self, index: u32) -> Result<(), RenderError> {
        self.resources.effect.begin_pass(index)
    }

    fn draw_full_target(&mut self) -> Result<(), RenderError> {
        self.ensure_device()?;
        let (view, _, _) = self.target(self.bound);
        self.resources.effect.draw_pass(self.encoder, view)
    }

    fn end_composite_pass(&mut self) -> Result<(), RenderError> {
        self.resources.effect.end_pass()
    }

    fn end_composite(&mut self) -> Result<(), RenderError> {
        self.resources.effect.end()
    }
}
