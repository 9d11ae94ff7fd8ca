//! GPU rendering subsystem.
//!
//! Building blocks for a render-to-texture frame:
//! - `TextureStore`: immutable sampled textures decoded from image files
//! - `OffscreenTargets`: fixed-size surfaces that are drawn into, then sampled
//! - `SpriteBatcher`: centered, transformed, alpha-blended textured quads
//! - `CompositeEffect`: multi-pass full-target shader sampling the offscreen layers
//! - `RenderDevice`: the per-frame command vocabulary over all of the above, with
//!   `WgpuRenderDevice` as the GPU implementation
//!
//! Convention:
//! - CPU geometry is in target pixels (top-left origin, +Y down).
//! - Sprite instances are converted to NDC on the CPU per batch.

mod common;
mod ctx;
mod device;
mod effect;
mod error;
mod frame;
mod guard;
mod sprite;
mod target;
mod texture;

pub use ctx::RenderCtx;
pub use device::{RenderDevice, TargetSlot, TextureRef};
pub use effect::{CompositeEffect, CompositeParams, EffectSource, PassSequencer};
pub use error::RenderError;
pub use frame::{FrameResources, SurfaceTarget, WgpuRenderDevice};
pub use sprite::{SpriteBatcher, SpriteDraw, SpriteInstance, SpriteTransform};
pub use target::{OffscreenSlot, OffscreenTargets, RenderTarget, OFFSCREEN_FORMAT};
pub use texture::{DecodedImage, Texture, TextureId, TextureStore};
