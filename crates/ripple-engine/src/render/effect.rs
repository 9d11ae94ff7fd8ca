//! Multi-pass composite effect.
//!
//! An effect is a WGSL file following these conventions:
//! - `vs_main`: vertex entry point that emits a full-target triangle from
//!   `@builtin(vertex_index)` (three vertices, no vertex buffers);
//! - `fs_pass0`, `fs_pass1`, …: one fragment entry point per pass, numbered
//!   contiguously from zero. The pass count is discovered, never assumed;
//! - named parameters in `@group(0)`:
//!   `g_light_texture` (0), `g_dark_texture` (1), `g_noise_texture` (2),
//!   `g_clamp_sampler` (3), `g_wrap_sampler` (4), `g_params` (5, uniform whose
//!   first field is `time: f32`, padded to 16 bytes).
//!
//! Sources are parsed and validated with naga when loaded, so a broken effect fails
//! at startup with the compiler's diagnostics instead of at draw time.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::common::{linear_sampler, sampler_entry, straight_alpha_blend, texture_entry, triangle_list};
use super::{OffscreenSlot, RenderCtx, RenderError, TextureRef};

const VERTEX_ENTRY: &str = "vs_main";
const PASS_ENTRY_PREFIX: &str = "fs_pass";

/// Required parameters: `(name, binding)` in group 0.
const PARAMETERS: [(&str, u32); 6] = [
    ("g_light_texture", 0),
    ("g_dark_texture", 1),
    ("g_noise_texture", 2),
    ("g_clamp_sampler", 3),
    ("g_wrap_sampler", 4),
    ("g_params", 5),
];

/// A compiled effect: validated source plus its pass entry points in order.
#[derive(Debug, Clone)]
pub struct EffectSource {
    path: PathBuf,
    source: String,
    passes: Vec<String>,
}

impl EffectSource {
    /// Reads and compiles an effect file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| RenderError::load(path, e))?;
        Self::compile(path, source)
    }

    /// Compiles effect source. `path` labels diagnostics.
    pub fn compile(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self, RenderError> {
        let path = path.into();
        let source = source.into();

        let fail = |diagnostics: String| RenderError::ShaderCompile {
            path: path.clone(),
            diagnostics,
        };

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| fail(e.emit_to_string(&source)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| fail(e.emit_to_string(&source)))?;

        let has_vertex = module
            .entry_points
            .iter()
            .any(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == VERTEX_ENTRY);
        if !has_vertex {
            return Err(fail(format!("error: missing vertex entry point `{VERTEX_ENTRY}`")));
        }

        let passes = discover_passes(
            module
                .entry_points
                .iter()
                .filter(|ep| ep.stage == naga::ShaderStage::Fragment)
                .map(|ep| ep.name.as_str()),
        )
        .map_err(fail)?;

        for (name, binding) in PARAMETERS {
            let global = module
                .global_variables
                .iter()
                .map(|(_, g)| g)
                .find(|g| g.name.as_deref() == Some(name));

            match global.and_then(|g| g.binding.as_ref()) {
                None => return Err(fail(format!("error: missing effect parameter `{name}`"))),
                Some(b) if b.group != 0 || b.binding != binding => {
                    return Err(fail(format!(
                        "error: effect parameter `{name}` must be bound at @group(0) @binding({binding})"
                    )));
                }
                Some(_) => {}
            }
        }

        log::debug!("compiled effect {} ({} passes)", path.display(), passes.len());

        Ok(Self { path, source, passes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pass_count(&self) -> u32 {
        self.passes.len() as u32
    }

    /// Fragment entry point of pass `index`.
    pub fn pass_entry(&self, index: u32) -> Option<&str> {
        self.passes.get(index as usize).map(String::as_str)
    }
}

/// Orders `fs_passN` entry points and checks they run 0..n without gaps.
fn discover_passes<'a>(fragment_entries: impl Iterator<Item = &'a str>) -> Result<Vec<String>, String> {
    let mut indexed: Vec<(u32, &str)> = fragment_entries
        .filter_map(|name| {
            let index = name.strip_prefix(PASS_ENTRY_PREFIX)?.parse::<u32>().ok()?;
            Some((index, name))
        })
        .collect();
    indexed.sort_unstable_by_key(|(i, _)| *i);

    if indexed.is_empty() {
        return Err(format!(
            "error: no pass entry points; expected `{PASS_ENTRY_PREFIX}0`, `{PASS_ENTRY_PREFIX}1`, …"
        ));
    }

    for (expected, (index, name)) in indexed.iter().enumerate() {
        if *index != expected as u32 {
            return Err(format!(
                "error: pass entry points must be numbered from 0 without gaps; found `{name}` where `{PASS_ENTRY_PREFIX}{expected}` was expected"
            ));
        }
    }

    Ok(indexed.into_iter().map(|(_, name)| name.to_owned()).collect())
}

/// Inputs of one composite run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositeParams {
    /// Directly visible layer.
    pub light: TextureRef,
    /// Layer seen through the reflection.
    pub dark: TextureRef,
    /// Distortion noise; sampled with wrapping.
    pub noise: TextureRef,
    /// Animation time, in effect units.
    pub time: f32,
}

impl CompositeParams {
    pub fn inputs(&self) -> [TextureRef; 3] {
        [self.light, self.dark, self.noise]
    }

    /// Whether the effect reads from `slot`.
    pub fn samples(&self, slot: OffscreenSlot) -> bool {
        self.inputs().contains(&TextureRef::Target(slot))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
enum SequenceState {
    #[default]
    Idle,
    Running {
        pass_count: u32,
        open: Option<OpenPass>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct OpenPass {
    index: u32,
    drawn: bool,
}

/// Call-order bookkeeping for an effect run:
/// `begin` → (`begin_pass(i)` → one draw → `end_pass`)* → `end`.
#[derive(Debug, Clone, Default)]
pub struct PassSequencer {
    state: SequenceState,
}

impl PassSequencer {
    pub fn is_running(&self) -> bool {
        matches!(self.state, SequenceState::Running { .. })
    }

    /// Pass currently open, if any.
    pub fn open_pass(&self) -> Option<u32> {
        match self.state {
            SequenceState::Running { open: Some(p), .. } => Some(p.index),
            _ => None,
        }
    }

    pub fn begin(&mut self, pass_count: u32) -> Result<u32, RenderError> {
        if self.is_running() {
            return Err(RenderError::InvalidState("effect begin while already running"));
        }
        self.state = SequenceState::Running {
            pass_count,
            open: None,
        };
        Ok(pass_count)
    }

    pub fn begin_pass(&mut self, index: u32) -> Result<(), RenderError> {
        match &mut self.state {
            SequenceState::Idle => Err(RenderError::InvalidState("effect pass outside begin/end")),
            SequenceState::Running { open: Some(_), .. } => {
                Err(RenderError::InvalidState("effect pass begun while another is open"))
            }
            SequenceState::Running { pass_count, .. } if index >= *pass_count => {
                Err(RenderError::InvalidState("effect pass index out of range"))
            }
            SequenceState::Running { open, .. } => {
                *open = Some(OpenPass { index, drawn: false });
                Ok(())
            }
        }
    }

    /// Records the pass's single draw; returns the pass index.
    pub fn record_draw(&mut self) -> Result<u32, RenderError> {
        match &mut self.state {
            SequenceState::Running { open: Some(pass), .. } if !pass.drawn => {
                pass.drawn = true;
                Ok(pass.index)
            }
            SequenceState::Running { open: Some(_), .. } => {
                Err(RenderError::InvalidState("effect pass already drew its quad"))
            }
            _ => Err(RenderError::InvalidState("effect draw outside a pass")),
        }
    }

    pub fn end_pass(&mut self) -> Result<(), RenderError> {
        match &mut self.state {
            SequenceState::Running { open, .. } if open.is_some() => {
                *open = None;
                Ok(())
            }
            _ => Err(RenderError::InvalidState("effect end_pass without an open pass")),
        }
    }

    pub fn end(&mut self) -> Result<(), RenderError> {
        match self.state {
            SequenceState::Running { open: None, .. } => {
                self.state = SequenceState::Idle;
                Ok(())
            }
            SequenceState::Running { open: Some(_), .. } => {
                Err(RenderError::InvalidState("effect end while a pass is open"))
            }
            SequenceState::Idle => Err(RenderError::InvalidState("effect end without begin")),
        }
    }

    pub fn reset(&mut self) {
        self.state = SequenceState::Idle;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct EffectUniform {
    time: f32,
    _pad: [f32; 3], // 16-byte uniform size
}

/// GPU side of a compiled effect.
///
/// Mirrors the classic effect API: `set_parameters`, `begin` (returns the pass
/// count), then for each pass `begin_pass` / one full-target draw / `end_pass`,
/// then `end`. Pipelines are built lazily per target format and dropped by
/// `release_device_objects`.
pub struct CompositeEffect {
    source: EffectSource,
    params: Option<CompositeParams>,
    sequencer: PassSequencer,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipelines: Vec<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    clamp_sampler: Option<wgpu::Sampler>,
    wrap_sampler: Option<wgpu::Sampler>,

    /// Built for the current run's parameters; dropped at `end`.
    bind_group: Option<wgpu::BindGroup>,
}

impl CompositeEffect {
    pub fn new(source: EffectSource) -> Self {
        Self {
            source,
            params: None,
            sequencer: PassSequencer::default(),
            pipeline_format: None,
            pipelines: Vec::new(),
            bind_group_layout: None,
            clamp_sampler: None,
            wrap_sampler: None,
            bind_group: None,
        }
    }

    pub fn source(&self) -> &EffectSource {
        &self.source
    }

    pub fn pass_count(&self) -> u32 {
        self.source.pass_count()
    }

    pub fn parameters(&self) -> Option<&CompositeParams> {
        self.params.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.sequencer.is_running()
    }

    pub fn open_pass(&self) -> Option<u32> {
        self.sequencer.open_pass()
    }

    /// Binds the four named inputs for the next run.
    pub fn set_parameters(&mut self, params: CompositeParams) -> Result<(), RenderError> {
        if self.is_running() {
            return Err(RenderError::InvalidState("effect parameters changed while running"));
        }
        if !params.time.is_finite() {
            return Err(RenderError::InvalidState("effect time is not finite"));
        }
        self.params = Some(params);
        Ok(())
    }

    /// Starts a run; returns how many passes the caller must execute.
    pub fn begin(&mut self) -> Result<u32, RenderError> {
        if self.params.is_none() {
            return Err(RenderError::InvalidState("effect begin without parameters"));
        }
        self.sequencer.begin(self.source.pass_count())
    }

    pub fn begin_pass(&mut self, index: u32) -> Result<(), RenderError> {
        self.sequencer.begin_pass(index)
    }

    pub fn end_pass(&mut self) -> Result<(), RenderError> {
        self.sequencer.end_pass()
    }

    pub fn end(&mut self) -> Result<(), RenderError> {
        self.sequencer.end()?;
        self.bind_group = None;
        Ok(())
    }

    /// Builds pipelines for `format` and the bind group for the current
    /// parameters. Call after `begin`, before the first pass draws.
    pub fn prepare<'v>(
        &mut self,
        ctx: &RenderCtx<'_>,
        format: wgpu::TextureFormat,
        resolve: impl Fn(TextureRef) -> Option<&'v wgpu::TextureView>,
    ) -> Result<(), RenderError> {
        let params = self
            .params
            .ok_or(RenderError::InvalidState("effect prepared without parameters"))?;

        self.ensure_pipelines(ctx, format);

        let unresolved = || RenderError::InvalidState("effect input does not resolve to a texture");
        let light = resolve(params.light).ok_or_else(unresolved)?;
        let dark = resolve(params.dark).ok_or_else(unresolved)?;
        let noise = resolve(params.noise).ok_or_else(unresolved)?;

        let clamp = self
            .clamp_sampler
            .get_or_insert_with(|| linear_sampler(ctx.device, "ripple effect clamp sampler", wgpu::AddressMode::ClampToEdge));
        let wrap = self
            .wrap_sampler
            .get_or_insert_with(|| linear_sampler(ctx.device, "ripple effect wrap sampler", wgpu::AddressMode::Repeat));

        let Some(layout) = self.bind_group_layout.as_ref() else {
            return Err(RenderError::InvalidState("effect bind group layout unavailable"));
        };

        let uniform = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ripple effect params ubo"),
            contents: bytemuck::bytes_of(&EffectUniform {
                time: params.time,
                _pad: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ripple effect bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(light),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(dark),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(noise),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(clamp),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(wrap),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: uniform.as_entire_binding(),
                },
            ],
        }));

        Ok(())
    }

    /// Records the open pass's full-target draw into `target_view`.
    pub fn draw_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        let pass = self.sequencer.record_draw()?;

        let (Some(pipeline), Some(bind_group)) = (self.pipelines.get(pass as usize), self.bind_group.as_ref())
        else {
            return Err(RenderError::InvalidState("effect drawn before prepare"));
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ripple effect pass"),
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
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);

        Ok(())
    }

    /// Drops GPU objects and aborts a run in progress. Parameters are kept; they
    /// are re-bound on the next `prepare`.
    pub fn release_device_objects(&mut self) {
        if self.sequencer.is_running() {
            log::debug!("effect run aborted on device release");
        }
        self.sequencer.reset();
        self.pipeline_format = None;
        self.pipelines.clear();
        self.bind_group_layout = None;
        self.clamp_sampler = None;
        self.wrap_sampler = None;
        self.bind_group = None;
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipelines.len() == self.source.passes.len() {
            return;
        }

        let bind_group_layout: &wgpu::BindGroupLayout = self.bind_group_layout.get_or_insert_with(|| {
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("ripple effect bgl"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                    sampler_entry(4),
                    wgpu::BindGroupLayoutEntry {
                        binding: 5,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            })
        });

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ripple effect shader"),
            source: wgpu::ShaderSource::Wgsl(self.source.source.as_str().into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ripple effect pipeline layout"),
            bind_group_layouts: &[bind_group_layout],
            immediate_size: 0,
        });

        let pipelines = self
            .source
            .passes
            .iter()
            .map(|entry| {
                ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(entry.as_str()),
                    layout: Some(&pipeline_layout),

                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some(VERTEX_ENTRY),
                        compilation_options: Default::default(),
                        buffers: &[],
                    },

                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(entry.as_str()),
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
                })
            })
            .collect();

        log::debug!(
            "built {} effect pipeline(s) for {format:?} from {}",
            self.source.passes.len(),
            self.source.path.display()
        );

        self.pipelines = pipelines;
        self.pipeline_format = Some(format);
    }
}
