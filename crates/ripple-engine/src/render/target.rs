use super::texture::check_extent;
use super::{RenderCtx, RenderError};

/// Color format of every offscreen target: 8-bit RGBA with alpha, blendable and
/// sampleable on every adapter the demo accepts.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Names the two offscreen layers of a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OffscreenSlot {
    /// Background plus player: the directly visible scene.
    Scene,
    /// What the water surface reflects.
    Reflection,
}

impl OffscreenSlot {
    pub const ALL: [OffscreenSlot; 2] = [OffscreenSlot::Scene, OffscreenSlot::Reflection];

    pub fn label(self) -> &'static str {
        match self {
            OffscreenSlot::Scene => "ripple scene target",
            OffscreenSlot::Reflection => "ripple reflection target",
        }
    }
}

/// A fixed-size color surface that can be drawn into and sampled from.
///
/// The texture and its view are created together, so the surface and the
/// sampled texture always refer to the same pixels.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Allocates a `width` × `height` target in `OFFSCREEN_FORMAT`.
    ///
    /// Fails with `DeviceResource` if the size is zero or beyond the device limit.
    pub fn create(ctx: &RenderCtx<'_>, label: &str, width: u32, height: u32) -> Result<Self, RenderError> {
        check_extent(label, width, height, ctx.max_texture_dimension())?;

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            width,
            height,
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        OFFSCREEN_FORMAT
    }
}

/// The scene and reflection layers.
///
/// Created once per device at the fixed output resolution. They are not tied to
/// the swap chain, so surface resizes and reconfigurations leave them intact.
pub struct OffscreenTargets {
    scene: RenderTarget,
    reflection: RenderTarget,
}

impl OffscreenTargets {
    pub fn create(ctx: &RenderCtx<'_>, width: u32, height: u32) -> Result<Self, RenderError> {
        let scene = RenderTarget::create(ctx, OffscreenSlot::Scene.label(), width, height)?;
        let reflection = RenderTarget::create(ctx, OffscreenSlot::Reflection.label(), width, height)?;

        log::debug!("created offscreen targets ({width}x{height}, {OFFSCREEN_FORMAT:?})");

        Ok(Self { scene, reflection })
    }

    pub fn get(&self, slot: OffscreenSlot) -> &RenderTarget {
        match slot {
            OffscreenSlot::Scene => &self.scene,
            OffscreenSlot::Reflection => &self.reflection,
        }
    }

    /// Shared size of both targets.
    pub fn size(&self) -> (u32, u32) {
        self.scene.size()
    }
}
