//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the runtime (platform loop)
//! and the application: the device-lifecycle callbacks it implements and the
//! contexts handed to them.

mod ctx;
mod handlers;

pub use ctx::{DeviceCtx, FrameCtx, FrameStatus};
pub use handlers::{DeviceLifecycleHandlers, LoopControl};
