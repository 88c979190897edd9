/// Acquired surface texture and the view the grid pass renders into.
///
/// Short-lived: holding the surface texture blocks acquisition of the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    /// Presents the texture. Call after the frame's commands were submitted.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
