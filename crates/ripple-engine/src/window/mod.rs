//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single window, and drives the device
//! lifecycle callbacks around the GPU layer.

mod runtime;

pub use runtime::{Hotkeys, Runtime, RuntimeConfig};
pub use winit::dpi::LogicalSize;
