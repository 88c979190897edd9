use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::{GpuInit, SurfaceErrorAction};

/// Host viewport size in logical pixels plus the display's pixel density.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportMetrics {
    pub logical_width: f64,
    pub logical_height: f64,
    pub scale_factor: f64,
}

impl ViewportMetrics {
    pub fn new(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            scale_factor,
        }
    }

    /// Reads the window's current size and scale factor.
    pub fn from_window(window: &Window) -> Self {
        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale_factor);
        Self::new(logical.width, logical.height, scale_factor)
    }

    /// Surface size in physical pixels, at least 1x1.
    ///
    /// A non-finite or non-positive scale factor counts as 1.
    pub fn physical_size(&self) -> PhysicalSize<u32> {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        let px = |logical: f64| {
            let v = (logical * scale).round();
            if v.is_finite() && v >= 1.0 {
                v.min(u32::MAX as f64) as u32
            } else {
                1
            }
        };
        PhysicalSize::new(px(self.logical_width), px(self.logical_height))
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn surface_config(
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
    alpha_mode: wgpu::CompositeAlphaMode,
    init: &GpuInit,
) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: init.present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: init.desired_maximum_frame_latency,
    }
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            surface.configure(device, config);
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    // ── ViewportMetrics ───────────────────────────────────────────────────

    #[test]
    fn physical_size_scales_by_pixel_density() {
        let m = ViewportMetrics::new(800.0, 600.0, 2.0);
        assert_eq!(m.physical_size(), PhysicalSize::new(1600, 1200));
    }

    #[test]
    fn physical_size_rounds_fractional_scale() {
        let m = ViewportMetrics::new(101.0, 33.0, 1.5);
        assert_eq!(m.physical_size(), PhysicalSize::new(152, 50));
    }

    #[test]
    fn physical_size_is_never_zero() {
        let m = ViewportMetrics::new(0.0, 0.0, 1.0);
        assert_eq!(m.physical_size(), PhysicalSize::new(1, 1));
    }

    #[test]
    fn bad_scale_factor_counts_as_one() {
        let m = ViewportMetrics::new(640.0, 480.0, f64::NAN);
        assert_eq!(m.physical_size(), PhysicalSize::new(640, 480));
        let m = ViewportMetrics::new(640.0, 480.0, -2.0);
        assert_eq!(m.physical_size(), PhysicalSize::new(640, 480));
    }

    // ── format selection ──────────────────────────────────────────────────

    #[test]
    fn device_preferred_format_is_first() {
        let c = caps(vec![
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(
            choose_surface_format(&c, false),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            choose_surface_format(&c, true),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn no_formats_yields_none() {
        assert_eq!(choose_surface_format(&caps(vec![]), false), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(vec![wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn surface_config_uses_init_settings() {
        let init = GpuInit::default();
        let config = surface_config(
            wgpu::TextureFormat::Rgba8Unorm,
            PhysicalSize::new(0, 720),
            wgpu::CompositeAlphaMode::Opaque,
            &init,
        );
        assert_eq!(config.width, 1);
        assert_eq!(config.height, 720);
        assert_eq!(config.present_mode, wgpu::PresentMode::Fifo);
        assert_eq!(config.usage, wgpu::TextureUsages::RENDER_ATTACHMENT);
    }
}
