//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - reporting adapter capabilities so callers can reject unsuitable devices
//! - creating & configuring the Surface (swapchain)
//! - acquiring and presenting frames
//! - observing device loss

mod caps;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use caps::DeviceCaps;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
