use winit::dpi::PhysicalSize;

use crate::rendering::{config::RenderConfig, global_uniform::GlobalUniform};

pub type Resolution = PhysicalSize<u32>;

/// Size of the scene render target for a window. The window's scale factor is honoured up
/// to `max_pixel_ratio`; beyond that the scene is rendered at lower density and upscaled.
pub fn render_resolution(
    window_size: Resolution,
    scale_factor: f64,
    max_pixel_ratio: f64,
) -> Resolution {
    if scale_factor <= 0.0 || scale_factor <= max_pixel_ratio {
        return window_size;
    }

    let ratio = max_pixel_ratio.max(f64::EPSILON) / scale_factor;

    PhysicalSize::new(
        ((window_size.width as f64 * ratio).round() as u32).max(1),
        ((window_size.height as f64 * ratio).round() as u32).max(1),
    )
}

pub fn surface_config(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    size: Resolution,
    config: &RenderConfig,
) -> wgpu::SurfaceConfiguration {
    let surface_caps = surface.get_capabilities(adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);

    let present_mode = if config.vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    };

    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width,
        height: size.height,
        present_mode,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

/// State shared by every pass.
pub struct RenderCommon {
    pub surface_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
    pub global_uniform: GlobalUniform,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_density_is_unchanged() {
        let size = PhysicalSize::new(1280, 720);
        assert_eq!(render_resolution(size, 1.0, 2.0), size);
        assert_eq!(render_resolution(size, 2.0, 2.0), size);
    }

    #[test]
    fn high_density_is_capped() {
        // 1000x500 logical pixels on a 3x display
        let size = PhysicalSize::new(3000, 1500);
        assert_eq!(render_resolution(size, 3.0, 2.0), PhysicalSize::new(2000, 1000));
    }

    #[test]
    fn fractional_scale_rounds() {
        let size = PhysicalSize::new(1001, 501);
        let scaled = render_resolution(size, 2.5, 2.0);
        assert_eq!(scaled, PhysicalSize::new(801, 401));
    }

    #[test]
    fn never_returns_empty_size() {
        let size = PhysicalSize::new(1, 1);
        assert_eq!(render_resolution(size, 4.0, 1.0), PhysicalSize::new(1, 1));
    }
}
