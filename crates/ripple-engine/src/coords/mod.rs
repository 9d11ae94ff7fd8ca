//! Coordinate and geometry types shared across the engine and the demo.
//!
//! Canonical CPU space:
//! - Pixels of the render target being drawn into
//! - Origin top-left
//! - +X right, +Y down
//!
//! Sprite instances are converted to NDC on the CPU against a `Viewport`.

mod color;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use vec2::Vec2;
pub use viewport::Viewport;
