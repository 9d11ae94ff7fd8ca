//! Time subsystem.
//!
//! One `FrameClock` per render loop; call `tick()` once per frame to obtain
//! `FrameTime` (delta time plus time elapsed since the clock started).

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
