use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::{ColorRgba, Vec2, Viewport};

use super::common::{
    linear_sampler, sampler_entry, straight_alpha_blend, texture_entry, triangle_list, QuadVertex,
    QUAD_INDICES, QUAD_VERTICES,
};
use super::{RenderCtx, RenderError, TextureId, TextureStore};

/// Per-draw placement of a sprite: scale, then rotation, then translation.
///
/// The sprite's pivot is its geometric center, so `translation` is where the
/// sprite's center lands in target pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteTransform {
    pub scale: Vec2,
    /// Radians; positive turns clockwise on screen (+Y down).
    pub rotation: f32,
    pub translation: Vec2,
}

impl SpriteTransform {
    /// Identity scale/rotation, centered at `position`.
    #[inline]
    pub const fn at(position: Vec2) -> Self {
        Self {
            scale: Vec2::splat(1.0),
            rotation: 0.0,
            translation: position,
        }
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    /// Maps a point relative to the sprite center into target pixels.
    #[inline]
    pub fn apply(&self, local: Vec2) -> Vec2 {
        local.scale(self.scale).rotate(self.rotation) + self.translation
    }

    /// Corners of a `size` sprite in target pixels: top-left, top-right,
    /// bottom-right, bottom-left (in texture orientation).
    pub fn corners(&self, size: (u32, u32)) -> [Vec2; 4] {
        let half = Vec2::new(size.0 as f32, size.1 as f32) * 0.5;
        [
            self.apply(Vec2::new(-half.x, -half.y)),
            self.apply(Vec2::new(half.x, -half.y)),
            self.apply(Vec2::new(half.x, half.y)),
            self.apply(Vec2::new(-half.x, half.y)),
        ]
    }
}

/// One queued sprite.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteDraw {
    pub texture: TextureId,
    /// Texture size in pixels; the sprite is drawn at this size before `transform`.
    pub size: (u32, u32),
    pub transform: SpriteTransform,
    pub tint: ColorRgba,
}

impl SpriteDraw {
    pub fn new(texture: TextureId, size: (u32, u32), transform: SpriteTransform) -> Self {
        Self {
            texture,
            size,
            transform,
            tint: ColorRgba::white(),
        }
    }
}

/// GPU instance record: the sprite's quad as an NDC parallelogram.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub axis_x: [f32; 2],
    pub axis_y: [f32; 2],
    pub origin: [f32; 2],
    pub tint: [f32; 4],
}

impl SpriteInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2, // axis_x
        2 => Float32x2, // axis_y
        3 => Float32x2, // origin
        4 => Float32x4  // tint
    ];

    /// Projects a queued sprite onto a target of `viewport` size.
    pub fn new(draw: &SpriteDraw, viewport: Viewport) -> Self {
        let [tl, tr, _, bl] = draw.transform.corners(draw.size);
        Self {
            axis_x: ndc_array(viewport.dir_to_ndc(tr - tl)),
            axis_y: ndc_array(viewport.dir_to_ndc(bl - tl)),
            origin: ndc_array(viewport.to_ndc(tl)),
            tint: draw.tint.to_array(),
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

fn ndc_array(v: Vec2) -> [f32; 2] {
    [v.x, v.y]
}

/// Batched, alpha-blended sprite drawing.
///
/// Usage is scoped: `begin`, any number of `draw`, then `end` into a target.
/// Batches do not nest. Draws render in submission order, so later sprites cover
/// earlier ones. Consecutive draws of the same texture share one draw call.
///
/// GPU objects are created lazily and dropped by `release_device_objects`; after
/// that the batcher is immediately usable again on the same or a new device.
#[derive(Default)]
pub struct SpriteBatcher {
    open: Option<Vec<SpriteDraw>>,

    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    bind_groups: HashMap<TextureId, wgpu::BindGroup>,
}

impl SpriteBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is currently open.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Opens a batch.
    pub fn begin(&mut self) -> Result<(), RenderError> {
        if self.open.is_some() {
            return Err(RenderError::InvalidState("sprite batches cannot be nested"));
        }
        self.open = Some(Vec::new());
        Ok(())
    }

    /// Queues a sprite in the open batch.
    pub fn draw(&mut self, draw: SpriteDraw) -> Result<(), RenderError> {
        let Some(batch) = self.open.as_mut() else {
            return Err(RenderError::InvalidState("sprite draw outside begin/end"));
        };
        batch.push(draw);
        Ok(())
    }

    /// Closes the batch and hands back its draws without touching the GPU.
    pub fn take(&mut self) -> Result<Vec<SpriteDraw>, RenderError> {
        self.open
            .take()
            .ok_or(RenderError::InvalidState("sprite batch end without begin"))
    }

    /// Closes the batch and records it into `target_view`, loading (not clearing)
    /// its existing contents. Returns the number of sprites drawn.
    pub fn end(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        viewport: Viewport,
        textures: &TextureStore,
    ) -> Result<usize, RenderError> {
        let draws = self.take()?;
        if draws.is_empty() {
            return Ok(0);
        }
        if !viewport.is_valid() {
            return Err(RenderError::InvalidState("sprite target has no area"));
        }

        self.ensure_pipeline(ctx, target_format);
        self.ensure_static_buffers(ctx);
        for d in &draws {
            self.ensure_bind_group(ctx, textures, d.texture)?;
        }

        let instances: Vec<SpriteInstance> = draws.iter().map(|d| SpriteInstance::new(d, viewport)).collect();

        // Fresh buffer per batch: several batches per frame must not share contents.
        let instance_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ripple sprite instance vbo"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (Some(pipeline), Some(quad_vbo), Some(quad_ibo)) = (
            self.pipelines.get(&target_format),
            self.quad_vbo.as_ref(),
            self.quad_ibo.as_ref(),
        ) else {
            return Err(RenderError::InvalidState("sprite pipeline unavailable"));
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ripple sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        for (texture, range) in texture_runs(&draws) {
            let Some(bind_group) = self.bind_groups.get(&texture) else { continue };
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, range);
        }

        Ok(draws.len())
    }

    /// Drops every GPU object and abandons an open batch.
    ///
    /// Called on device loss; everything is rebuilt lazily by the next `end`.
    pub fn release_device_objects(&mut self) {
        if let Some(batch) = self.open.take() {
            log::debug!("sprite batch of {} abandoned on device release", batch.len());
        }
        self.pipelines.clear();
        self.bind_group_layout = None;
        self.sampler = None;
        self.quad_vbo = None;
        self.quad_ibo = None;
        self.bind_groups.clear();
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }

        let bind_group_layout: &wgpu::BindGroupLayout = self.bind_group_layout.get_or_insert_with(|| {
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("ripple sprite bgl"),
                entries: &[texture_entry(0), sampler_entry(1)],
            })
        });

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ripple sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ripple sprite pipeline layout"),
            bind_group_layouts: &[bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ripple sprite pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), SpriteInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(straight_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built sprite pipeline for {format:?}");
        self.pipelines.insert(format, pipeline);
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ripple sprite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ripple sprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_bind_group(
        &mut self,
        ctx: &RenderCtx<'_>,
        textures: &TextureStore,
        id: TextureId,
    ) -> Result<(), RenderError> {
        if self.bind_groups.contains_key(&id) {
            return Ok(());
        }

        let texture = textures
            .get(id)
            .ok_or(RenderError::InvalidState("sprite references a released texture"))?;
        let Some(layout) = self.bind_group_layout.as_ref() else {
            return Err(RenderError::InvalidState("sprite bind group layout unavailable"));
        };
        let sampler = self
            .sampler
            .get_or_insert_with(|| linear_sampler(ctx.device, "ripple sprite sampler", wgpu::AddressMode::ClampToEdge));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ripple sprite bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.bind_groups.insert(id, bind_group);
        Ok(())
    }
}

/// Splits draws into runs of consecutive equal textures: `(texture, instance range)`.
fn texture_runs(draws: &[SpriteDraw]) -> Vec<(TextureId, std::ops::Range<u32>)> {
    let mut runs = Vec::new();
    let mut i = 0usize;
    while i < draws.len() {
        let texture = draws[i].texture;
        let mut j = i + 1;
        while j < draws.len() && draws[j].texture == texture {
            j += 1;
        }
        runs.push((texture, i as u32..j as u32));
        i = j;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    fn tex(n: u32) -> TextureId {
        TextureId::from_raw(n)
    }

    #[test]
    fn position_is_the_sprite_center() {
        let t = SpriteTransform::at(Vec2::new(640.0, 360.0));
        let [tl, tr, br, bl] = t.corners((64, 32));
        assert_eq!(tl, Vec2::new(608.0, 344.0));
        assert_eq!(tr, Vec2::new(672.0, 344.0));
        assert_eq!(br, Vec2::new(672.0, 376.0));
        assert_eq!(bl, Vec2::new(608.0, 376.0));
    }

    #[test]
    fn rotation_and_scale_pivot_on_center() {
        let t = SpriteTransform::at(Vec2::new(100.0, 100.0))
            .with_scale(Vec2::new(2.0, 1.0))
            .with_rotation(core::f32::consts::FRAC_PI_2);
        // Center never moves.
        assert!(close(t.apply(Vec2::zero()), Vec2::new(100.0, 100.0)));
        // +X edge midpoint: scaled to 20, then turned onto +Y.
        assert!(close(t.apply(Vec2::new(10.0, 0.0)), Vec2::new(100.0, 120.0)));
    }

    #[test]
    fn negative_scale_mirrors_about_center() {
        let t = SpriteTransform::at(Vec2::new(50.0, 50.0)).with_scale(Vec2::new(1.0, -1.0));
        let [tl, _, _, bl] = t.corners((10, 10));
        assert_eq!(tl, Vec2::new(45.0, 55.0));
        assert_eq!(bl, Vec2::new(45.0, 45.0));
    }

    #[test]
    fn instance_spans_sprite_in_ndc() {
        let vp = Viewport::new(1280.0, 720.0);
        let draw = SpriteDraw::new(tex(0), (1280, 720), SpriteTransform::at(vp.center()));
        let inst = SpriteInstance::new(&draw, vp);
        // A full-target sprite covers NDC exactly.
        assert_eq!(inst.origin, [-1.0, 1.0]);
        assert_eq!(inst.axis_x, [2.0, 0.0]);
        assert_eq!(inst.axis_y, [0.0, -2.0]);
        assert_eq!(inst.tint, [1.0; 4]);
    }

    #[test]
    fn begin_draw_take_preserves_order() {
        let mut b = SpriteBatcher::new();
        b.begin().unwrap();
        let bg = SpriteDraw::new(tex(1), (1280, 720), SpriteTransform::at(Vec2::new(640.0, 360.0)));
        let player = SpriteDraw::new(tex(0), (64, 64), SpriteTransform::at(Vec2::new(10.0, 10.0)));
        b.draw(bg).unwrap();
        b.draw(player).unwrap();
        assert_eq!(b.take().unwrap(), vec![bg, player]);
        assert!(!b.is_open());
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut b = SpriteBatcher::new();
        b.begin().unwrap();
        assert!(matches!(b.begin(), Err(RenderError::InvalidState(_))));
        // The original batch is still open.
        assert!(b.is_open());
    }

    #[test]
    fn draw_and_end_require_open_batch() {
        let mut b = SpriteBatcher::new();
        let d = SpriteDraw::new(tex(0), (1, 1), SpriteTransform::at(Vec2::zero()));
        assert!(matches!(b.draw(d), Err(RenderError::InvalidState(_))));
        assert!(matches!(b.take(), Err(RenderError::InvalidState(_))));
    }

    #[test]
    fn release_abandons_open_batch_and_stays_usable() {
        let mut b = SpriteBatcher::new();
        b.begin().unwrap();
        b.draw(SpriteDraw::new(tex(0), (1, 1), SpriteTransform::at(Vec2::zero())))
            .unwrap();

        b.release_device_objects();
        assert!(!b.is_open());

        b.begin().unwrap();
        assert!(b.take().unwrap().is_empty());
    }

    #[test]
    fn runs_group_consecutive_textures_only() {
        let at = SpriteTransform::at(Vec2::zero());
        let draws = [
            SpriteDraw::new(tex(1), (1, 1), at),
            SpriteDraw::new(tex(1), (1, 1), at),
            SpriteDraw::new(tex(2), (1, 1), at),
            SpriteDraw::new(tex(1), (1, 1), at),
        ];
        assert_eq!(
            texture_runs(&draws),
            vec![(tex(1), 0..2), (tex(2), 2..3), (tex(1), 3..4)]
        );
    }
}
