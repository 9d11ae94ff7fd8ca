//! Ripple engine crate.
//!
//! Owns the platform + GPU runtime (window, device lifecycle, input, timing) and the
//! render-to-texture building blocks used by the demo: texture store, offscreen
//! targets, sprite batcher and composite effect.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
