use std::sync::Arc;

use wgpu::RenderPass;

use crate::rendering::{
    render_common::RenderCommon,
    shader_loader::{PipelineCache, PipelineCacheBuilder},
};

/// A render pass whose pipelines live in the hot-reloaded [`PipelineCache`]. Pipelines
/// are registered in `create`; `render` skips drawing while they are still missing.
pub trait Pass {
    /// Attachments the pass renders into, recreated with the window
    type TextureViews;

    const LABEL: &'static str;

    fn create(
        device: &wgpu::Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn render<'a, F>(
        &self,
        texture_views: &Self::TextureViews,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a;
}
