use crate::coords::ColorRgba;

use super::{CompositeParams, OffscreenSlot, RenderError, SpriteTransform, TextureId};

/// Surface a frame's draws land on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetSlot {
    /// The swap-chain surface.
    Main,
    Offscreen(OffscreenSlot),
}

/// A texture the composite effect can sample.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureRef {
    /// An image from the texture store.
    Stored(TextureId),
    /// The texture behind an offscreen target.
    Target(OffscreenSlot),
}

/// Per-frame drawing commands.
///
/// The frame loop is written against this trait so that the call sequence can be
/// checked without a GPU. Every method fails with `InvalidState` when called out
/// of order:
/// - sprite batches cannot nest, and `bind_target`/`clear` are rejected while one
///   is open;
/// - `begin_composite` needs parameters and a bound target the effect does not
///   sample; an effect input cannot be bound while the effect runs;
/// - each composite pass draws exactly once, inside `begin_composite_pass` /
///   `end_composite_pass`.
pub trait RenderDevice {
    /// Redirects subsequent draws to `slot`.
    fn bind_target(&mut self, slot: TargetSlot) -> Result<(), RenderError>;

    fn bound_target(&self) -> TargetSlot;

    /// Clears the bound target.
    fn clear(&mut self, color: ColorRgba) -> Result<(), RenderError>;

    fn begin_sprites(&mut self) -> Result<(), RenderError>;

    /// Queues `texture` centered on its own middle, placed by `transform`.
    fn draw_sprite(&mut self, texture: TextureId, transform: SpriteTransform) -> Result<(), RenderError>;

    /// Draws the queued sprites onto the bound target in submission order.
    fn end_sprites(&mut self) -> Result<(), RenderError>;

    fn set_composite_params(&mut self, params: CompositeParams) -> Result<(), RenderError>;

    /// Starts the composite effect; returns its pass count.
    fn begin_composite(&mut self) -> Result<u32, RenderError>;

    fn begin_composite_pass(&mut self, index: u32) -> Result<(), RenderError>;

    /// Draws one quad covering the bound target with the current pass.
    fn draw_full_target(&mut self) -> Result<(), RenderError>;

    fn end_composite_pass(&mut self) -> Result<(), RenderError>;

    fn end_composite(&mut self) -> Result<(), RenderError>;
}
