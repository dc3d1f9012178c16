use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use itertools::iproduct;
use wgpu::util::DeviceExt;

use crate::{
    material::{MaterialId, MaterialManager, StandardMaterial, TextureSlot},
    rendering::{
        texture::{address_mode, GpuTexture},
        util::bind_group_builder::BindGroupBuilder,
    },
    texture::{TextureId, WrapMode},
};

/// This should match the `MaterialParams` struct in standard.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialParams {
    /// Linear rgb, w unused
    pub color: [f32; 4],
    /// roughness, metalness, ao intensity, opacity
    pub surface: [f32; 4],
    /// displacement scale, displacement bias, normal scale xy
    pub displacement: [f32; 4],
    /// UV scale per texture slot, two slots per vec4 in slot order
    pub uv_repeat: [[f32; 4]; 4],
}

impl MaterialParams {
    pub fn new(material: &StandardMaterial, manager: &MaterialManager) -> Self {
        let mut uv_repeat = [[1.0; 4]; 4];
        for (index, slot) in TextureSlot::ALL.iter().enumerate() {
            let repeat = manager.uv_repeat(material, *slot);
            let half = (index % 2) * 2;
            uv_repeat[index / 2][half] = repeat.x;
            uv_repeat[index / 2][half + 1] = repeat.y;
        }

        Self {
            color: material.color.linear().extend(1.0).to_array(),
            surface: [
                material.roughness,
                material.metalness,
                material.ao_map_intensity,
                material.opacity,
            ],
            displacement: [
                material.displacement_scale,
                material.displacement_bias,
                material.normal_scale.x,
                material.normal_scale.y,
            ],
            uv_repeat,
        }
    }
}

pub struct RenderMaterial {
    params_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Fallbacks for empty slots. A white colour, ao, roughness or metalness map leaves
/// the scalar factor unchanged; the normal map is flat and displacement zero.
struct DefaultTextures {
    white: GpuTexture,
    flat_normal: GpuTexture,
    black: GpuTexture,
}

impl DefaultTextures {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            white: GpuTexture::solid(device, queue, "Default texture (white)", [255; 4]),
            flat_normal: GpuTexture::solid(
                device,
                queue,
                "Default texture (normal)",
                [127, 127, 255, 255],
            ),
            black: GpuTexture::solid(device, queue, "Default texture (black)", [0, 0, 0, 255]),
        }
    }

    fn for_slot(&self, slot: TextureSlot) -> &GpuTexture {
        match slot {
            TextureSlot::Normal => &self.flat_normal,
            TextureSlot::Displacement => &self.black,
            _ => &self.white,
        }
    }
}

struct LoadedTexture {
    texture: GpuTexture,
    wrap: (WrapMode, WrapMode),
}

/// Everything a material bind group can point at.
struct TextureBindings {
    textures: HashMap<TextureId, LoadedTexture>,
    defaults: DefaultTextures,
    samplers: HashMap<(WrapMode, WrapMode), wgpu::Sampler>,
}

const WRAP_MODES: [WrapMode; 3] = [
    WrapMode::ClampToEdge,
    WrapMode::Repeat,
    WrapMode::MirroredRepeat,
];

impl TextureBindings {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let samplers = iproduct!(WRAP_MODES, WRAP_MODES)
            .map(|(wrap_s, wrap_t)| ((wrap_s, wrap_t), create_sampler(device, wrap_s, wrap_t)))
            .collect();

        Self {
            textures: HashMap::new(),
            defaults: DefaultTextures::new(device, queue),
            samplers,
        }
    }

    fn slot(
        &self,
        material: &StandardMaterial,
        slot: TextureSlot,
    ) -> (&wgpu::TextureView, &wgpu::Sampler) {
        let loaded = material.texture(slot).and_then(|id| self.textures.get(&id));
        let (texture, wrap) = match loaded {
            Some(loaded) => (&loaded.texture, loaded.wrap),
            None => (self.defaults.for_slot(slot), Default::default()),
        };

        // Every wrap combination is created up front
        (&texture.view, &self.samplers[&wrap])
    }

    /// Binding 0 holds the parameters, then each slot takes a texture and a sampler.
    fn builder<'a>(
        &'a self,
        material: &'a StandardMaterial,
        params_buffer: &'a wgpu::Buffer,
    ) -> BindGroupBuilder<'a> {
        let mut builder =
            BindGroupBuilder::new(&material.name, wgpu::ShaderStages::VERTEX_FRAGMENT)
                .uniform(0, params_buffer);

        for (index, slot) in TextureSlot::ALL.iter().enumerate() {
            let binding = 1 + index as u32 * 2;
            let (view, sampler) = self.slot(material, *slot);
            builder = builder.texture(binding, view).sampler(binding + 1, sampler);
        }

        builder
    }
}

pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,

    bindings: TextureBindings,
    materials: HashMap<MaterialId, RenderMaterial>,
    fallback: RenderMaterial,

    bind_group_layout: wgpu::BindGroupLayout,
}

impl RenderMaterialManager {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let bindings = TextureBindings::new(device, queue);

        // The layout is derived from a plain material so it always matches the builder
        let fallback_material = StandardMaterial {
            name: String::from("Fallback"),
            ..Default::default()
        };
        let params = MaterialParams::new(&fallback_material, &MaterialManager::new());
        let params_buffer = create_params_buffer(device, &fallback_material.name, params);

        let builder = bindings.builder(&fallback_material, &params_buffer);
        let bind_group_layout = builder.layout(device);
        let bind_group = builder.bind_group(device, &bind_group_layout);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            bindings,
            materials: HashMap::new(),
            fallback: RenderMaterial {
                params_buffer,
                bind_group,
            },
            bind_group_layout,
        }
    }

    /// Uploads every texture and material in the manager. Already uploaded ones are kept.
    pub fn load_all(&mut self, manager: &MaterialManager) {
        for (id, texture) in manager.textures() {
            if self.bindings.textures.contains_key(&id) {
                continue;
            }

            log::debug!("Uploading texture {}", texture.name);
            let loaded = LoadedTexture {
                texture: GpuTexture::from_asset(&self.device, &self.queue, texture),
                wrap: (texture.wrap_s, texture.wrap_t),
            };
            self.bindings.textures.insert(id, loaded);
        }

        for (id, material) in manager.materials() {
            if self.materials.contains_key(&id) {
                continue;
            }

            let params = MaterialParams::new(material, manager);
            let params_buffer = create_params_buffer(&self.device, &material.name, params);
            let bind_group = self
                .bindings
                .builder(material, &params_buffer)
                .bind_group(&self.device, &self.bind_group_layout);

            self.materials.insert(
                id,
                RenderMaterial {
                    params_buffer,
                    bind_group,
                },
            );
        }

        log::info!(
            "Loaded {} materials and {} textures",
            self.materials.len(),
            self.bindings.textures.len()
        );
    }

    /// Rewrites material parameters so edits made at runtime show up.
    pub fn update_params(&self, manager: &MaterialManager) {
        for (id, material) in manager.materials() {
            if let Some(render_material) = self.materials.get(&id) {
                self.queue.write_buffer(
                    &render_material.params_buffer,
                    0,
                    bytemuck::cast_slice(&[MaterialParams::new(material, manager)]),
                );
            }
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// GPU material for `id`, or a plain white material if it was never loaded.
    pub fn material(&self, id: MaterialId) -> &RenderMaterial {
        self.materials.get(&id).unwrap_or(&self.fallback)
    }
}

fn create_params_buffer(
    device: &wgpu::Device,
    name: &str,
    params: MaterialParams,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Material params ({})", name)),
        contents: bytemuck::cast_slice(&[params]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn create_sampler(device: &wgpu::Device, wrap_s: WrapMode, wrap_t: WrapMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("Sampler ({:?}, {:?})", wrap_s, wrap_t)),
        address_mode_u: address_mode(wrap_s),
        address_mode_v: address_mode(wrap_t),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        lod_min_clamp: 0.0,
        lod_max_clamp: 32.0,
        compare: None,
        anisotropy_clamp: 1,
        border_color: None,
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::{color::Color, texture::TextureAsset};

    #[test]
    fn params_pack_scalars() {
        let material = StandardMaterial {
            color: Color::from_hex("#ffffff").unwrap(),
            roughness: 0.25,
            metalness: 0.5,
            ao_map_intensity: 0.75,
            opacity: 0.9,
            displacement_scale: 0.3,
            displacement_bias: -0.2,
            normal_scale: Vec2::new(1.0, -1.0),
            ..Default::default()
        };

        let params = MaterialParams::new(&material, &MaterialManager::new());

        assert_eq!(params.surface, [0.25, 0.5, 0.75, 0.9]);
        assert_eq!(params.displacement, [0.3, -0.2, 1.0, -1.0]);
        assert!((params.color[0] - 1.0).abs() < 1e-5);
        assert_eq!(params.uv_repeat, [[1.0; 4]; 4]);
    }

    #[test]
    fn uv_repeat_is_packed_in_slot_order() {
        let mut manager = MaterialManager::new();
        let mut tiled = TextureAsset::placeholder("tiled");
        tiled.set_repeat_wrapping(Vec2::splat(8.0));
        let tiled = manager.add_texture(tiled);
        let alpha = manager.add_texture(TextureAsset::placeholder("alpha"));

        let material = StandardMaterial {
            map: Some(tiled),
            alpha_map: Some(alpha),
            normal_map: Some(tiled),
            displacement_map: Some(tiled),
            ..Default::default()
        };

        let params = MaterialParams::new(&material, &manager);

        // color | alpha
        assert_eq!(params.uv_repeat[0], [8.0, 8.0, 1.0, 1.0]);
        // metalness | normal
        assert_eq!(params.uv_repeat[2], [1.0, 1.0, 8.0, 8.0]);
        // displacement | unused
        assert_eq!(params.uv_repeat[3], [8.0, 8.0, 1.0, 1.0]);
    }

    #[test]
    fn params_size_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<MaterialParams>(), 112);
    }
}
