use imgui_wgpu::RendererConfig;

/// Draws the finished imgui frame over the presented scene, at native surface
/// resolution.
pub struct GuiOverlay {
    renderer: imgui_wgpu::Renderer,
}

impl GuiOverlay {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        context: &mut imgui::Context,
    ) -> Self {
        let config = RendererConfig {
            texture_format: surface_format,
            ..Default::default()
        };

        Self {
            renderer: imgui_wgpu::Renderer::new(context, device, queue, config),
        }
    }

    /// Ends the imgui frame and records its draw lists. Must run once per
    /// `Context::new_frame`.
    pub fn draw(
        &mut self,
        context: &mut imgui::Context,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
    ) {
        let draw_data = context.render();

        // imgui-rs crashes on empty draw data, see imgui-rs/imgui-rs#325
        if draw_data.draw_lists_count() == 0 {
            return;
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI overlay"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(e) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::error!("Drawing the GUI overlay failed: {}", e);
        }
    }
}
