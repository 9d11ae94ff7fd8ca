use std::fmt;

use ripple_engine::coords::{ColorRgba, Vec2};
use ripple_engine::render::{
    CompositeParams, OffscreenSlot, RenderDevice, RenderError, SpriteTransform, TargetSlot, TextureRef,
};

use crate::config::DemoConfig;
use crate::player::{DirectionalKeys, PlayerPosition};
use crate::state::SceneTextures;

/// Steps of one frame, in order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    /// Between frames. The main target's opening clear also runs here, ahead
    /// of the scene layer.
    Idle,
    UpdateInput,
    RenderSceneLayer,
    RenderReflectionLayer,
    RestoreMainTarget,
    Composite,
    Present,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePhase::Idle => "idle",
            FramePhase::UpdateInput => "input update",
            FramePhase::RenderSceneLayer => "scene layer",
            FramePhase::RenderReflectionLayer => "reflection layer",
            FramePhase::RestoreMainTarget => "main target restore",
            FramePhase::Composite => "composite",
            FramePhase::Present => "present",
        };
        f.write_str(name)
    }
}

/// A frame abandoned part-way. Nothing of it is presented.
#[derive(Debug, thiserror::Error)]
#[error("frame aborted during {phase}")]
pub struct FrameError {
    pub phase: FramePhase,
    #[source]
    pub source: RenderError,
}

impl FrameError {
    pub fn is_device_lost(&self) -> bool {
        matches!(self.source, RenderError::DeviceLost)
    }
}

/// Per-frame sequence: move the player, draw the scene and reflection layers
/// offscreen, then composite both onto the main target through the effect.
pub struct FrameController {
    phase: FramePhase,
    player: PlayerPosition,
    config: DemoConfig,
}

impl FrameController {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            phase: FramePhase::Idle,
            player: PlayerPosition::new(config.player_start),
            config,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn player(&self) -> Vec2 {
        self.player.get()
    }

    /// Applies one frame of movement.
    pub fn update_input(&mut self, keys: DirectionalKeys) {
        self.phase = FramePhase::UpdateInput;
        self.player.apply(keys, self.config.player_step);
    }

    /// Records the frame's draws. Returns the number of effect passes run.
    ///
    /// The first failure aborts the frame; the controller returns to `Idle` and
    /// the next frame starts from scratch.
    pub fn render<D: RenderDevice>(
        &mut self,
        device: &mut D,
        scene: &SceneTextures,
        elapsed: f64,
    ) -> Result<u32, FrameError> {
        let result = self.render_phases(device, scene, elapsed);
        match &result {
            Ok(passes) => {
                log::trace!("frame recorded: {passes} effect pass(es), player at {:?}", self.player());
                self.phase = FramePhase::Present;
            }
            Err(e) => {
                log::debug!("{e}: {}", e.source);
                self.phase = FramePhase::Idle;
            }
        }
        result
    }

    /// Marks the presented frame complete.
    pub fn finish(&mut self) {
        self.phase = FramePhase::Idle;
    }

    fn enter(&mut self, phase: FramePhase) {
        log::trace!("frame phase: {phase}");
        self.phase = phase;
    }

    fn render_phases<D: RenderDevice>(
        &mut self,
        device: &mut D,
        scene: &SceneTextures,
        elapsed: f64,
    ) -> Result<u32, FrameError> {
        let center = self.config.output_center();

        self.enter(FramePhase::Idle);
        self.in_phase(|this| {
            device.bind_target(TargetSlot::Main)?;
            device.clear(this.config.clear_color)
        })?;

        self.enter(FramePhase::RenderSceneLayer);
        self.in_phase(|this| {
            device.bind_target(TargetSlot::Offscreen(OffscreenSlot::Scene))?;
            device.clear(ColorRgba::transparent())?;
            device.begin_sprites()?;
            device.draw_sprite(scene.background, SpriteTransform::at(center))?;
            device.draw_sprite(scene.player, SpriteTransform::at(this.player.get()))?;
            device.end_sprites()
        })?;

        self.enter(FramePhase::RenderReflectionLayer);
        self.in_phase(|_| {
            device.bind_target(TargetSlot::Offscreen(OffscreenSlot::Reflection))?;
            device.clear(ColorRgba::transparent())?;
            device.begin_sprites()?;
            device.draw_sprite(scene.waterhole, SpriteTransform::at(center))?;
            device.end_sprites()
        })?;

        self.enter(FramePhase::RestoreMainTarget);
        self.in_phase(|_| device.bind_target(TargetSlot::Main))?;

        self.enter(FramePhase::Composite);
        self.in_phase(|this| {
            device.set_composite_params(CompositeParams {
                light: TextureRef::Target(OffscreenSlot::Scene),
                dark: TextureRef::Target(OffscreenSlot::Reflection),
                noise: TextureRef::Stored(scene.noise),
                time: this.config.effect_time(elapsed),
            })?;

            let passes = device.begin_composite()?;
            for pass in 0..passes {
                device.begin_composite_pass(pass)?;
                device.draw_full_target()?;
                device.end_composite_pass()?;
            }
            device.end_composite()?;
            Ok(passes)
        })
    }

    fn in_phase<T>(&self, f: impl FnOnce(&Self) -> Result<T, RenderError>) -> Result<T, FrameError> {
        f(self).map_err(|source| FrameError {
            phase: self.phase,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_engine::render::TextureId;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Bind(TargetSlot),
        Clear(ColorRgba),
        BeginSprites,
        Sprite(TextureId, Vec2),
        EndSprites,
        Params(CompositeParams),
        BeginComposite,
        BeginPass(u32),
        DrawFullTarget,
        EndPass,
        EndComposite,
    }

    struct RecordingDevice {
        calls: Vec<Call>,
        bound: TargetSlot,
        pass_count: u32,
        lose_device_at: Option<usize>,
    }

    impl RecordingDevice {
        fn new(pass_count: u32) -> Self {
            Self {
                calls: Vec::new(),
                bound: TargetSlot::Main,
                pass_count,
                lose_device_at: None,
            }
        }

        fn record(&mut self, call: Call) -> Result<(), RenderError> {
            if self.lose_device_at == Some(self.calls.len()) {
                return Err(RenderError::DeviceLost);
            }
            self.calls.push(call);
            Ok(())
        }

        fn params(&self) -> Vec<CompositeParams> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Params(p) => Some(*p),
                    _ => None,
                })
                .collect()
        }
    }

    impl RenderDevice for RecordingDevice {
        fn bind_target(&mut self, slot: TargetSlot) -> Result<(), RenderError> {
            self.record(Call::Bind(slot))?;
            self.bound = slot;
            Ok(())
        }

        fn bound_target(&self) -> TargetSlot {
            self.bound
        }

        fn clear(&mut self, color: ColorRgba) -> Result<(), RenderError> {
            self.record(Call::Clear(color))
        }

        fn begin_sprites(&mut self) -> Result<(), RenderError> {
            self.record(Call::BeginSprites)
        }

        fn draw_sprite(&mut self, texture: TextureId, transform: SpriteTransform) -> Result<(), RenderError> {
            assert_eq!(transform.scale, Vec2::splat(1.0));
            assert_eq!(transform.rotation, 0.0);
            self.record(Call::Sprite(texture, transform.translation))
        }

        fn end_sprites(&mut self) -> Result<(), RenderError> {
            self.record(Call::EndSprites)
        }

        fn set_composite_params(&mut self, params: CompositeParams) -> Result<(), RenderError> {
            self.record(Call::Params(params))
        }

        fn begin_composite(&mut self) -> Result<u32, RenderError> {
            self.record(Call::BeginComposite)?;
            Ok(self.pass_count)
        }

        fn begin_composite_pass(&mut self, index: u32) -> Result<(), RenderError> {
            self.record(Call::BeginPass(index))
        }

        fn draw_full_target(&mut self) -> Result<(), RenderError> {
            self.record(Call::DrawFullTarget)
        }

        fn end_composite_pass(&mut self) -> Result<(), RenderError> {
            self.record(Call::EndPass)
        }

        fn end_composite(&mut self) -> Result<(), RenderError> {
            self.record(Call::EndComposite)
        }
    }

    fn scene() -> SceneTextures {
        SceneTextures {
            player: TextureId::from_raw(0),
            background: TextureId::from_raw(1),
            waterhole: TextureId::from_raw(2),
            noise: TextureId::from_raw(3),
        }
    }

    fn right() -> DirectionalKeys {
        DirectionalKeys {
            right: true,
            ..DirectionalKeys::default()
        }
    }

    #[test]
    fn first_frame_call_sequence() {
        let config = DemoConfig::default();
        let clear = config.clear_color;
        let mut controller = FrameController::new(config);
        let mut device = RecordingDevice::new(1);
        let s = scene();
        let center = Vec2::new(640.0, 360.0);

        controller.update_input(DirectionalKeys::default());
        let passes = controller.render(&mut device, &s, 0.0).unwrap();
        assert_eq!(passes, 1);
        assert_eq!(controller.phase(), FramePhase::Present);

        let scene_slot = TargetSlot::Offscreen(OffscreenSlot::Scene);
        let reflection_slot = TargetSlot::Offscreen(OffscreenSlot::Reflection);
        let expected = vec![
            Call::Bind(TargetSlot::Main),
            Call::Clear(clear),
            Call::Bind(scene_slot),
            Call::Clear(ColorRgba::transparent()),
            Call::BeginSprites,
            Call::Sprite(s.background, center),
            Call::Sprite(s.player, center),
            Call::EndSprites,
            Call::Bind(reflection_slot),
            Call::Clear(ColorRgba::transparent()),
            Call::BeginSprites,
            Call::Sprite(s.waterhole, center),
            Call::EndSprites,
            Call::Bind(TargetSlot::Main),
            Call::Params(CompositeParams {
                light: TextureRef::Target(OffscreenSlot::Scene),
                dark: TextureRef::Target(OffscreenSlot::Reflection),
                noise: TextureRef::Stored(s.noise),
                time: 0.0,
            }),
            Call::BeginComposite,
            Call::BeginPass(0),
            Call::DrawFullTarget,
            Call::EndPass,
            Call::EndComposite,
        ];
        assert_eq!(device.calls, expected);

        controller.finish();
        assert_eq!(controller.phase(), FramePhase::Idle);
    }

    #[test]
    fn every_reported_pass_is_run() {
        let mut controller = FrameController::new(DemoConfig::default());
        let mut device = RecordingDevice::new(3);

        assert_eq!(controller.render(&mut device, &scene(), 0.0).unwrap(), 3);

        let passes: Vec<u32> = device
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::BeginPass(i) => Some(*i),
                _ => None,
            })
            .collect();
        assert_eq!(passes, vec![0, 1, 2]);
        assert_eq!(device.calls.iter().filter(|c| **c == Call::DrawFullTarget).count(), 3);
    }

    #[test]
    fn holding_right_for_ten_frames() {
        let mut controller = FrameController::new(DemoConfig::default());
        for _ in 0..10 {
            controller.update_input(right());
            controller.render(&mut RecordingDevice::new(1), &scene(), 0.0).unwrap();
            controller.finish();
        }
        assert_eq!(controller.player(), Vec2::new(670.0, 360.0));
    }

    #[test]
    fn up_and_down_together_stand_still() {
        let mut controller = FrameController::new(DemoConfig::default());
        let keys = DirectionalKeys {
            up: true,
            down: true,
            ..DirectionalKeys::default()
        };
        controller.update_input(keys);
        assert_eq!(controller.player(), Vec2::new(640.0, 360.0));
    }

    #[test]
    fn player_is_drawn_after_background_at_its_position() {
        let mut controller = FrameController::new(DemoConfig::default());
        controller.update_input(right());

        let mut device = RecordingDevice::new(1);
        let s = scene();
        controller.render(&mut device, &s, 0.0).unwrap();

        let sprites: Vec<&Call> = device.calls.iter().filter(|c| matches!(c, Call::Sprite(..))).collect();
        assert_eq!(sprites[0], &Call::Sprite(s.background, Vec2::new(640.0, 360.0)));
        assert_eq!(sprites[1], &Call::Sprite(s.player, Vec2::new(643.0, 360.0)));
    }

    #[test]
    fn no_offscreen_target_is_bound_while_compositing() {
        let mut controller = FrameController::new(DemoConfig::default());
        let mut device = RecordingDevice::new(2);
        controller.render(&mut device, &scene(), 3.0).unwrap();

        let mut bound = TargetSlot::Main;
        let mut compositing = false;
        for call in &device.calls {
            match call {
                Call::Bind(slot) => {
                    assert!(!compositing, "target bound during composite");
                    bound = *slot;
                }
                Call::BeginComposite => {
                    assert_eq!(bound, TargetSlot::Main);
                    compositing = true;
                }
                Call::EndComposite => compositing = false,
                _ => {}
            }
        }
    }

    #[test]
    fn effect_time_is_elapsed_over_twenty() {
        let mut controller = FrameController::new(DemoConfig::default());
        let mut device = RecordingDevice::new(1);
        controller.render(&mut device, &scene(), 10.0).unwrap();

        let params = device.params();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].time, 0.5);
    }

    #[test]
    fn device_loss_aborts_the_frame() {
        let mut controller = FrameController::new(DemoConfig::default());
        let mut device = RecordingDevice::new(1);
        // Fail the reflection layer's clear.
        device.lose_device_at = Some(9);

        let err = controller.render(&mut device, &scene(), 0.0).unwrap_err();
        assert!(err.is_device_lost());
        assert_eq!(err.phase, FramePhase::RenderReflectionLayer);
        assert_eq!(controller.phase(), FramePhase::Idle);
        assert!(!device.calls.contains(&Call::BeginComposite));

        // The next frame runs from the top.
        let mut device = RecordingDevice::new(1);
        assert_eq!(controller.render(&mut device, &scene(), 0.0).unwrap(), 1);
    }

    #[test]
    fn failed_main_clear_is_reported_before_the_scene_layer() {
        let mut controller = FrameController::new(DemoConfig::default());
        controller.update_input(right());
        let mut device = RecordingDevice::new(1);
        device.lose_device_at = Some(1);

        let err = controller.render(&mut device, &scene(), 0.0).unwrap_err();
        assert!(err.is_device_lost());
        assert_eq!(err.phase, FramePhase::Idle);
        assert_eq!(device.calls, vec![Call::Bind(TargetSlot::Main)]);
    }

    #[test]
    fn failed_scene_clear_is_reported_in_the_scene_layer() {
        let mut controller = FrameController::new(DemoConfig::default());
        let mut device = RecordingDevice::new(1);
        device.lose_device_at = Some(3);

        let err = controller.render(&mut device, &scene(), 0.0).unwrap_err();
        assert_eq!(err.phase, FramePhase::RenderSceneLayer);
        assert_eq!(device.calls.last(), Some(&Call::Bind(TargetSlot::Offscreen(OffscreenSlot::Scene))));
    }
}
