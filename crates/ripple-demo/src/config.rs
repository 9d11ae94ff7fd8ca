use std::path::{Path, PathBuf};

use ripple_engine::coords::{ColorRgba, Vec2};

/// Files read once when the device is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub player: PathBuf,
    pub background: PathBuf,
    pub waterhole: PathBuf,
    pub noise: PathBuf,
    pub effect: PathBuf,
}

impl AssetPaths {
    /// The standard asset names under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            player: dir.join("Player.png"),
            background: dir.join("Background.png"),
            waterhole: dir.join("Waterhole.png"),
            noise: dir.join("noise2.png"),
            effect: dir.join("Reflaction.wgsl"),
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::in_dir("./Resources")
    }
}

/// Demo constants.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub assets: AssetPaths,
    /// Size of both offscreen layers, in pixels.
    pub output_size: (u32, u32),
    /// Displacement per frame per held direction key.
    pub player_step: f32,
    pub player_start: Vec2,
    /// Elapsed seconds are divided by this before reaching the effect.
    pub time_divisor: f64,
    /// Main target clear color.
    pub clear_color: ColorRgba,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            output_size: (1280, 720),
            player_step: 3.0,
            player_start: Vec2::new(640.0, 360.0),
            time_divisor: 20.0,
            clear_color: ColorRgba::from_rgba_u8(45, 50, 170, 255),
        }
    }
}

impl DemoConfig {
    /// Where the background and reflection sprites are centered.
    pub fn output_center(&self) -> Vec2 {
        Vec2::new(self.output_size.0 as f32, self.output_size.1 as f32) * 0.5
    }

    /// Time value handed to the effect for `elapsed` seconds.
    pub fn effect_time(&self, elapsed: f64) -> f32 {
        (elapsed / self.time_divisor) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assets_live_under_resources() {
        let assets = AssetPaths::default();
        assert_eq!(assets.player, Path::new("./Resources/Player.png"));
        assert_eq!(assets.noise, Path::new("./Resources/noise2.png"));
        assert_eq!(assets.effect, Path::new("./Resources/Reflaction.wgsl"));
    }

    #[test]
    fn start_position_is_the_output_center() {
        let config = DemoConfig::default();
        assert_eq!(config.output_center(), config.player_start);
    }

    #[test]
    fn effect_time_is_slowed() {
        let config = DemoConfig::default();
        assert_eq!(config.effect_time(0.0), 0.0);
        assert_eq!(config.effect_time(40.0), 2.0);
    }
}
