use std::sync::Arc;

use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPass,
    RenderPassDescriptor, ShaderSource, StencilState,
};

use crate::rendering::{
    instance::InstanceData,
    passes::pass::Pass,
    render_common::RenderCommon,
    render_model::{MODEL_PRIMITIVE_STATE, RENDER_MODEL_VBL},
    shader_loader::{PipelineCache, PipelineCacheBuilder, PipelineId, ShaderDefinition},
    texture::{ColorTarget, DepthTexture},
};

const STANDARD_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Standard",
    path: "standard.wgsl",
};

/// Lit scene pass. Opaque and transparent meshes share a shader and differ only in
/// blending.
pub struct ForwardPass {
    opaque_pipeline_id: PipelineId,
    transparent_pipeline_id: PipelineId,
    common: Arc<RenderCommon>,
}

pub struct ForwardPassTextureViews {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
}

impl ForwardPass {
    pub fn pipeline<'c>(
        &self,
        pipeline_cache: &'c PipelineCache,
        transparent: bool,
    ) -> Option<&'c wgpu::RenderPipeline> {
        if transparent {
            pipeline_cache.get(self.transparent_pipeline_id)
        } else {
            pipeline_cache.get(self.opaque_pipeline_id)
        }
    }

    fn add_pipeline(
        cache_builder: &mut PipelineCacheBuilder,
        layout: wgpu::PipelineLayout,
        label: &'static str,
        blend: wgpu::BlendState,
    ) -> PipelineId {
        cache_builder.add_shader(
            STANDARD_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(shader_def.name),
                        source: ShaderSource::Wgsl(source.into()),
                    });

                    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some(label),
                        layout: Some(&layout),
                        vertex: wgpu::VertexState {
                            module: &shader,
                            entry_point: Some("vs_main"),
                            buffers: &[RENDER_MODEL_VBL, InstanceData::descriptor()],
                            compilation_options: PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: ColorTarget::FORMAT,
                                blend: Some(blend),
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            compilation_options: PipelineCompilationOptions::default(),
                        }),
                        primitive: MODEL_PRIMITIVE_STATE,
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DepthTexture::DEPTH_FORMAT,
                            depth_write_enabled: true,
                            depth_compare: wgpu::CompareFunction::Less,
                            stencil: StencilState::default(),
                            bias: DepthBiasState::default(),
                        }),
                        multisample: MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    });

                    Ok(pipeline)
                },
            ),
        )
    }
}

impl Pass for ForwardPass {
    const LABEL: &'static str = "Forward pass";

    type TextureViews = ForwardPassTextureViews;

    fn create(
        device: &Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self> {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Forward pass pipeline layout"),
            bind_group_layouts: &[
                &common.global_uniform.bind_group_layout,
                &common.material_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let opaque_pipeline_id = Self::add_pipeline(
            cache_builder,
            layout.clone(),
            "Forward pass pipeline (opaque)",
            wgpu::BlendState::REPLACE,
        );
        let transparent_pipeline_id = Self::add_pipeline(
            cache_builder,
            layout,
            "Forward pass pipeline (transparent)",
            wgpu::BlendState::ALPHA_BLENDING,
        );

        Ok(Self {
            opaque_pipeline_id,
            transparent_pipeline_id,
            common,
        })
    }

    fn render<'a, F>(
        &self,
        texture_views: &Self::TextureViews,
        encoder: &mut wgpu::CommandEncoder,
        _pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a,
    {
        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(Self::LABEL),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &texture_views.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.common.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &texture_views.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &self.common.global_uniform.bind_group, &[]);

        // Pipelines and materials change per batch, so the callback sets them
        render_callback(&mut render_pass);
    }
}
