use super::Vec2;

/// Size of the render target being drawn into, in pixels.
///
/// Sprite instances are converted from pixel space to NDC against this.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Center point of the viewport.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Maps a pixel-space point (top-left origin, +Y down) to NDC (+Y up).
    #[inline]
    pub fn to_ndc(self, p: Vec2) -> Vec2 {
        Vec2::new(p.x / self.width * 2.0 - 1.0, 1.0 - p.y / self.height * 2.0)
    }

    /// Maps a pixel-space direction to NDC; translation is not applied.
    #[inline]
    pub fn dir_to_ndc(self, d: Vec2) -> Vec2 {
        Vec2::new(d.x / self.width * 2.0, -d.y / self.height * 2.0)
    }
}
