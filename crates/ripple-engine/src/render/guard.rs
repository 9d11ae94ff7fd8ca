use super::{CompositeEffect, CompositeParams, RenderError, SpriteBatcher, TargetSlot};

/// What a frame has bound and opened, as seen before the next command.
///
/// Taken fresh from the batcher and effect before each check, so it never
/// drifts from their state. Enforces that an offscreen target is never drawn
/// into while the effect samples it, and that targets do not change under an
/// open sprite batch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BindingGuard {
    pub bound: TargetSlot,
    pub batch_open: bool,
    pub params: Option<CompositeParams>,
    pub effect_running: bool,
}

impl BindingGuard {
    pub fn observe(bound: TargetSlot, sprites: &SpriteBatcher, effect: &CompositeEffect) -> Self {
        Self {
            bound,
            batch_open: sprites.is_open(),
            params: effect.parameters().copied(),
            effect_running: effect.is_running(),
        }
    }

    fn samples(&self, slot: TargetSlot) -> bool {
        match (slot, self.params) {
            (TargetSlot::Offscreen(s), Some(params)) => params.samples(s),
            _ => false,
        }
    }

    pub fn check_bind(&self, slot: TargetSlot) -> Result<(), RenderError> {
        if self.batch_open {
            return Err(RenderError::InvalidState("target changed inside a sprite batch"));
        }
        if self.effect_running && self.samples(slot) {
            return Err(RenderError::InvalidState("effect input bound as target while the effect runs"));
        }
        Ok(())
    }

    pub fn check_clear(&self) -> Result<(), RenderError> {
        if self.batch_open || self.effect_running {
            return Err(RenderError::InvalidState("clear inside a sprite batch or effect run"));
        }
        Ok(())
    }

    pub fn check_begin_composite(&self) -> Result<(), RenderError> {
        if self.params.is_none() {
            return Err(RenderError::InvalidState("effect begin without parameters"));
        }
        if self.samples(self.bound) {
            return Err(RenderError::InvalidState("effect samples the bound target"));
        }
        if self.batch_open {
            return Err(RenderError::InvalidState("effect begin inside a sprite batch"));
        }
        Ok(())
    }

    pub fn check_finish(&self) -> Result<(), RenderError> {
        if self.batch_open {
            return Err(RenderError::InvalidState("frame ended inside a sprite batch"));
        }
        if self.effect_running {
            return Err(RenderError::InvalidState("frame ended inside the composite effect"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{EffectSource, OffscreenSlot, TextureId, TextureRef};

    const SCENE: TargetSlot = TargetSlot::Offscreen(OffscreenSlot::Scene);
    const REFLECTION: TargetSlot = TargetSlot::Offscreen(OffscreenSlot::Reflection);

    fn params() -> CompositeParams {
        CompositeParams {
            light: TextureRef::Target(OffscreenSlot::Scene),
            dark: TextureRef::Target(OffscreenSlot::Reflection),
            noise: TextureRef::Stored(TextureId::from_raw(0)),
            time: 0.0,
        }
    }

    fn idle(bound: TargetSlot) -> BindingGuard {
        BindingGuard {
            bound,
            batch_open: false,
            params: None,
            effect_running: false,
        }
    }

    fn compositing() -> BindingGuard {
        BindingGuard {
            params: Some(params()),
            effect_running: true,
            ..idle(TargetSlot::Main)
        }
    }

    fn is_invalid_state(r: Result<(), RenderError>) -> bool {
        matches!(r, Err(RenderError::InvalidState(_)))
    }

    #[test]
    fn idle_frame_allows_binding_and_clearing_anything() {
        let g = idle(TargetSlot::Main);
        for slot in [TargetSlot::Main, SCENE, REFLECTION] {
            assert!(g.check_bind(slot).is_ok());
        }
        assert!(g.check_clear().is_ok());
        assert!(g.check_finish().is_ok());
    }

    #[test]
    fn target_cannot_change_inside_a_sprite_batch() {
        let g = BindingGuard {
            batch_open: true,
            ..idle(SCENE)
        };
        assert!(is_invalid_state(g.check_bind(TargetSlot::Main)));
        assert!(is_invalid_state(g.check_bind(SCENE)));
        assert!(is_invalid_state(g.check_clear()));
        assert!(is_invalid_state(g.check_begin_composite()));
        assert!(is_invalid_state(g.check_finish()));
    }

    #[test]
    fn effect_inputs_cannot_be_bound_while_compositing() {
        let g = compositing();
        assert!(is_invalid_state(g.check_bind(SCENE)));
        assert!(is_invalid_state(g.check_bind(REFLECTION)));
        assert!(g.check_bind(TargetSlot::Main).is_ok());
        assert!(is_invalid_state(g.check_clear()));
        assert!(is_invalid_state(g.check_finish()));
    }

    #[test]
    fn unsampled_target_may_be_bound_while_compositing() {
        let g = BindingGuard {
            params: Some(CompositeParams {
                dark: TextureRef::Stored(TextureId::from_raw(1)),
                ..params()
            }),
            ..compositing()
        };
        assert!(g.check_bind(REFLECTION).is_ok());
        assert!(is_invalid_state(g.check_bind(SCENE)));
    }

    #[test]
    fn composite_needs_parameters() {
        assert!(is_invalid_state(idle(TargetSlot::Main).check_begin_composite()));
    }

    #[test]
    fn composite_cannot_start_on_a_sampled_target() {
        for bound in [SCENE, REFLECTION] {
            let g = BindingGuard {
                params: Some(params()),
                ..idle(bound)
            };
            assert!(is_invalid_state(g.check_begin_composite()), "{bound:?}");
        }

        let g = BindingGuard {
            params: Some(params()),
            ..idle(TargetSlot::Main)
        };
        assert!(g.check_begin_composite().is_ok());
    }

    #[test]
    fn observes_live_batcher_and_effect_state() {
        let source = EffectSource::compile(
            "guard.wgsl",
            r#"
struct EffectParams { time: f32, _pad0: f32, _pad1: f32, _pad2: f32 }
@group(0) @binding(0) var g_light_texture: texture_2d<f32>;
@group(0) @binding(1) var g_dark_texture: texture_2d<f32>;
@group(0) @binding(2) var g_noise_texture: texture_2d<f32>;
@group(0) @binding(3) var g_clamp_sampler: sampler;
@group(0) @binding(4) var g_wrap_sampler: sampler;
@group(0) @binding(5) var<uniform> g_params: EffectParams;

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(f32(i), 0.0, 0.0, 1.0);
}

@fragment
fn fs_pass0() -> @location(0) vec4<f32> {
    return vec4<f32>(g_params.time);
}
"#,
        )
        .expect("compiles");

        let mut sprites = SpriteBatcher::new();
        let mut effect = CompositeEffect::new(source);

        sprites.begin().unwrap();
        let g = BindingGuard::observe(SCENE, &sprites, &effect);
        assert!(g.batch_open);
        assert!(is_invalid_state(g.check_bind(REFLECTION)));
        sprites.take().unwrap();

        effect.set_parameters(params()).unwrap();
        let g = BindingGuard::observe(SCENE, &sprites, &effect);
        assert!(is_invalid_state(g.check_begin_composite()));

        effect.begin().unwrap();
        let g = BindingGuard::observe(TargetSlot::Main, &sprites, &effect);
        assert!(g.effect_running);
        assert!(is_invalid_state(g.check_bind(SCENE)));

        effect.end().unwrap();
        let g = BindingGuard::observe(TargetSlot::Main, &sprites, &effect);
        assert!(g.check_bind(SCENE).is_ok());
    }
}
