use wgpu::SurfaceError;
use winit::window::Window;

use super::surface::{self, ViewportMetrics};
use super::{GpuFrame, GpuInit, SurfaceErrorAction, WgpuDevice};
use crate::error::{RenderError, Result};

/// Owns the wgpu instance, adapter, device/queue and the configured surface.
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of the surface.
    _instance: wgpu::Instance,

    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; the window must outlive the `Gpu`.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,

    device: WgpuDevice,

    init: GpuInit,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,
}

impl<'w> Gpu<'w> {
    /// Acquires adapter + device for `window` and configures its surface once.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, metrics: ViewportMetrics, init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        // No surface means the host exposes no usable graphics API for this window.
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::UnsupportedPlatform(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::NoAdapterFound(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("cellgrid device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::DeviceRequestFailed(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb).ok_or_else(|| {
            RenderError::SurfaceUnsupported("adapter reports no surface formats".into())
        })?;
        let alpha_mode = surface::choose_alpha_mode(&caps, init.alpha_mode);
        let config = surface::surface_config(format, metrics.physical_size(), alpha_mode, &init);

        surface.configure(&device, &config);
        log::info!(
            "surface configured: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device: WgpuDevice::new(device, queue),
            init,
            config,
        })
    }

    /// Re-runs surface configuration with new metrics and, optionally, a new format.
    ///
    /// For embedders that reconfigure explicitly; the window runtime never does.
    /// Pipelines built for the previous format must be rebuilt by the caller with
    /// `RenderContext::rebuild_pipeline`. Encoding a pass with a stale pipeline
    /// fails with `TargetFormatMismatch`.
    pub fn configure_surface(
        &mut self,
        metrics: ViewportMetrics,
        format: Option<wgpu::TextureFormat>,
    ) -> Result<()> {
        let caps = self.surface.get_capabilities(&self.adapter);
        let format = match format {
            Some(f) if caps.formats.contains(&f) => f,
            Some(f) => {
                return Err(RenderError::SurfaceUnsupported(format!(
                    "format {f:?} is not supported by this surface"
                )));
            }
            None => self.config.format,
        };

        if format != self.config.format {
            log::warn!(
                "surface format changed {:?} -> {:?}; pipelines need a rebuild",
                self.config.format,
                format
            );
        }

        let alpha_mode = surface::choose_alpha_mode(&caps, self.init.alpha_mode);
        self.config =
            surface::surface_config(format, metrics.physical_size(), alpha_mode, &self.init);
        self.surface.configure(self.device.device(), &self.config);
        log::info!(
            "surface configured: {}x{} {:?}",
            self.config.width,
            self.config.height,
            self.config.format
        );
        Ok(())
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the device + queue as a [`RenderDevice`](super::RenderDevice).
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }

    /// Acquires the next surface texture and its view.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuFrame {
            surface_texture,
            view,
        })
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        log::warn!("surface error: {err}");
        surface::map_surface_error(&self.surface, self.device.device(), &self.config, err)
    }
}
