use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::window::Window;

use crate::{
    camera::CameraUniform,
    geometry::GeometryId,
    haunted_house::HauntedHouse,
    lights::LightsUniform,
    rendering::{
        config::RenderConfig,
        global_uniform::GlobalUniform,
        gui_overlay::GuiOverlay,
        instance::{render_batch, FrameInstances, InstanceBuffer},
        passes::{
            forward_pass::{ForwardPass, ForwardPassTextureViews},
            pass::Pass,
            present_pass::{PresentPass, PresentPassTextureViews},
        },
        render_common::{render_resolution, surface_config, RenderCommon, Resolution},
        render_material_manager::RenderMaterialManager,
        render_model::RenderMesh,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::{ColorTarget, DepthTexture},
    },
};

pub struct Renderer {
    pub window: Arc<Window>,
    /// Surface size in physical pixels
    pub size: Resolution,
    /// Scene target size, see [`render_resolution`]
    render_size: Resolution,
    config: RenderConfig,

    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    scene_target: ColorTarget,

    meshes: HashMap<GeometryId, RenderMesh>,
    materials: RenderMaterialManager,
    instance_buffer: InstanceBuffer,

    shader_loader: ShaderLoader,

    forward_pass: ForwardPass,
    present_pass: PresentPass,
    present_source: wgpu::BindGroup,

    gui_overlay: Option<GuiOverlay>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        config: RenderConfig,
        imgui_context: Option<&mut imgui::Context>,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        log::info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let surface_config = surface_config(&adapter, &surface, size, &config);
        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &surface_config);
        }

        let materials = RenderMaterialManager::new(&device, &queue);

        let common = Arc::new(RenderCommon {
            surface_format: surface_config.format,
            clear_color: config.clear_color,
            global_uniform: GlobalUniform::new(&device),
            material_bind_group_layout: materials.bind_group_layout().clone(),
        });

        let render_size = render_resolution(size, window.scale_factor(), config.max_pixel_ratio);
        let depth_texture = DepthTexture::new(&device, render_size, "Depth Texture");
        let scene_target = ColorTarget::new(&device, render_size, "Scene Target");

        let mut cache_builder = PipelineCacheBuilder::new();

        let forward_pass = ForwardPass::create(&device, common.clone(), &mut cache_builder)?;
        let present_pass = PresentPass::create(&device, common.clone(), &mut cache_builder)?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder, &config.shader_folder)
            .context("Failed to load shaders")?;

        let present_source = present_pass.source_bind_group(&device, scene_target.view());

        let gui_overlay = imgui_context
            .map(|context| GuiOverlay::new(&device, &queue, surface_config.format, context));

        let instance_buffer = InstanceBuffer::new(&device);

        Ok(Self {
            window,
            size,
            render_size,
            config,
            surface,
            surface_config,
            device,
            queue,
            common,
            depth_texture,
            scene_target,
            meshes: HashMap::new(),
            materials,
            instance_buffer,
            shader_loader,
            forward_pass,
            present_pass,
            present_source,
            gui_overlay,
        })
    }

    /// Uploads geometries, textures and materials the GPU doesn't have yet.
    pub fn load_scene(&mut self, house: &HauntedHouse) {
        for (id, geometry) in house.scene.geometries.iter() {
            self.meshes
                .entry(id)
                .or_insert_with(|| RenderMesh::from_geometry(&self.device, geometry));
        }

        self.materials.load_all(&house.materials);

        log::info!("Loaded {} geometries", self.meshes.len());
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);

        self.render_size = render_resolution(
            new_size,
            self.window.scale_factor(),
            self.config.max_pixel_ratio,
        );
        self.depth_texture.resize(&self.device, self.render_size);
        self.scene_target.resize(&self.device, self.render_size);
        self.present_source = self
            .present_pass
            .source_bind_group(&self.device, self.scene_target.view());

        log::debug!(
            "Resized to {}x{}, scene at {}x{}",
            new_size.width,
            new_size.height,
            self.render_size.width,
            self.render_size.height
        );
    }

    pub fn render(
        &mut self,
        house: &HauntedHouse,
        imgui_context: Option<&mut imgui::Context>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(&house.camera);

        self.common.global_uniform.update(
            &self.queue,
            &camera_uniform,
            &LightsUniform::new(&house.lights),
        );
        self.materials.update_params(&house.materials);

        let frame = FrameInstances::gather(
            &house.scene.visible_meshes(),
            &house.materials,
            house.camera.eye,
        );
        self.instance_buffer
            .write(&self.device, &self.queue, &frame.instances);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                // The GUI frame still has to end before the next one can begin
                if let Some(context) = imgui_context {
                    context.render();
                }
                return Err(e);
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let pipeline_cache = &self.shader_loader.cache;

        self.forward_pass.render(
            &ForwardPassTextureViews {
                color: self.scene_target.view().clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                self.instance_buffer.bind(render_pass);

                for batch in &frame.batches {
                    let Some(pipeline) = self.forward_pass.pipeline(pipeline_cache, batch.transparent)
                    else {
                        continue;
                    };
                    let Some(render_mesh) = self.meshes.get(&batch.mesh.geometry) else {
                        continue;
                    };

                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(
                        1,
                        &self.materials.material(batch.mesh.material).bind_group,
                        &[],
                    );
                    render_batch(render_pass, render_mesh, batch);
                }
            },
        );

        self.present_pass.render(
            &PresentPassTextureViews {
                color: view.clone(),
                source: self.present_source.clone(),
            },
            &mut encoder,
            pipeline_cache,
            |_| {},
        );

        if let (Some(overlay), Some(context)) = (self.gui_overlay.as_mut(), imgui_context) {
            overlay.draw(context, &self.device, &self.queue, &mut encoder, &view);
        }

        self.queue.submit([encoder.finish()]);

        output.present();

        Ok(())
    }
}
