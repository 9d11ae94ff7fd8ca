/// Represents a single acquired swap-chain frame.
///
/// Short-lived: hand it back to `Gpu::submit` (present) or `Gpu::discard`
/// promptly. Holding the surface texture blocks acquisition of the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
