use ripple_engine::render::{
    CompositeEffect, EffectSource, FrameResources, OffscreenTargets, RenderCtx, RenderError, SpriteBatcher,
    TextureId, TextureStore,
};

use crate::config::DemoConfig;

/// Handles of the four loaded images.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SceneTextures {
    pub player: TextureId,
    pub background: TextureId,
    pub waterhole: TextureId,
    pub noise: TextureId,
}

/// Everything the frame draws with, created together when the device appears.
pub struct RenderState {
    textures: TextureStore,
    scene: SceneTextures,
    targets: OffscreenTargets,
    sprites: SpriteBatcher,
    effect: CompositeEffect,
}

impl RenderState {
    /// Loads the images and the effect and allocates both offscreen layers.
    ///
    /// Any missing asset, effect compile error or oversized resource fails the
    /// whole creation.
    pub fn create(ctx: &RenderCtx<'_>, config: &DemoConfig) -> Result<Self, RenderError> {
        let assets = &config.assets;

        let mut textures = TextureStore::new();
        let scene = SceneTextures {
            player: textures.load(ctx, &assets.player)?,
            background: textures.load(ctx, &assets.background)?,
            waterhole: textures.load(ctx, &assets.waterhole)?,
            noise: textures.load(ctx, &assets.noise)?,
        };

        let (w, h) = config.output_size;
        let targets = OffscreenTargets::create(ctx, w, h)?;

        let effect = CompositeEffect::new(EffectSource::load(&assets.effect)?);
        log::info!(
            "render state ready: {} textures, {w}x{h} layers, {} effect pass(es)",
            textures.len(),
            effect.pass_count()
        );

        Ok(Self {
            textures,
            scene,
            targets,
            sprites: SpriteBatcher::new(),
            effect,
        })
    }

    pub fn scene(&self) -> SceneTextures {
        self.scene
    }

    pub fn resources(&mut self) -> FrameResources<'_> {
        FrameResources {
            textures: &self.textures,
            targets: &self.targets,
            sprites: &mut self.sprites,
            effect: &mut self.effect,
        }
    }

    /// Drops the batcher's and effect's device objects; both rebuild on next use.
    pub fn release_device_objects(&mut self) {
        self.sprites.release_device_objects();
        self.effect.release_device_objects();
    }

    /// Tears everything down. Release order does not matter.
    pub fn destroy(mut self) {
        self.release_device_objects();
        let released = self.textures.release_all();
        log::debug!("released {released} texture(s)");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ripple_engine::render::DecodedImage;

    use super::*;
    use crate::config::AssetPaths;

    fn shipped_assets() -> AssetPaths {
        AssetPaths::in_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../Resources"))
    }

    #[test]
    fn shipped_effect_compiles_with_two_passes() {
        let effect = EffectSource::load(shipped_assets().effect).expect("effect compiles");
        assert_eq!(effect.pass_count(), 2);
    }

    #[test]
    fn shipped_images_decode() {
        let assets = shipped_assets();
        let background = DecodedImage::open(&assets.background).expect("background");
        assert_eq!((background.width, background.height), (1280, 720));

        for path in [&assets.player, &assets.waterhole, &assets.noise] {
            let image = DecodedImage::open(path).expect("decodes");
            assert!(image.width > 0 && image.height > 0);
        }
    }
}
