use glam::Vec2;
use id_arena::{Arena, Id};

use crate::{
    color::Color,
    texture::{TextureAsset, TextureId},
};

pub type MaterialId = Id<StandardMaterial>;

/// Metallic/roughness material. Map channels follow the usual conventions: alpha from
/// green, ambient occlusion from red, roughness from green, metalness from blue and
/// displacement from red.
#[derive(Debug, Clone)]
pub struct StandardMaterial {
    pub name: String,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub roughness: f32,
    pub metalness: f32,

    pub map: Option<TextureId>,
    pub alpha_map: Option<TextureId>,
    pub ao_map: Option<TextureId>,
    pub ao_map_intensity: f32,
    pub roughness_map: Option<TextureId>,
    pub metalness_map: Option<TextureId>,
    pub normal_map: Option<TextureId>,
    pub normal_scale: Vec2,
    pub displacement_map: Option<TextureId>,
    pub displacement_scale: f32,
    pub displacement_bias: f32,
}

impl StandardMaterial {
    pub fn with_color(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            ..Default::default()
        }
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<TextureId> {
        match slot {
            TextureSlot::Color => self.map,
            TextureSlot::Alpha => self.alpha_map,
            TextureSlot::AmbientOcclusion => self.ao_map,
            TextureSlot::Roughness => self.roughness_map,
            TextureSlot::Metalness => self.metalness_map,
            TextureSlot::Normal => self.normal_map,
            TextureSlot::Displacement => self.displacement_map,
        }
    }
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            name: String::from("Standard"),
            color: Color::WHITE,
            opacity: 1.0,
            transparent: false,
            roughness: 1.0,
            metalness: 0.0,
            map: None,
            alpha_map: None,
            ao_map: None,
            ao_map_intensity: 1.0,
            roughness_map: None,
            metalness_map: None,
            normal_map: None,
            normal_scale: Vec2::ONE,
            displacement_map: None,
            displacement_scale: 1.0,
            displacement_bias: 0.0,
        }
    }
}

/// Texture inputs of [`StandardMaterial`], in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Alpha,
    AmbientOcclusion,
    Roughness,
    Metalness,
    Normal,
    Displacement,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 7] = [
        TextureSlot::Color,
        TextureSlot::Alpha,
        TextureSlot::AmbientOcclusion,
        TextureSlot::Roughness,
        TextureSlot::Metalness,
        TextureSlot::Normal,
        TextureSlot::Displacement,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextureSlot::Color => "map",
            TextureSlot::Alpha => "alphaMap",
            TextureSlot::AmbientOcclusion => "aoMap",
            TextureSlot::Roughness => "roughnessMap",
            TextureSlot::Metalness => "metalnessMap",
            TextureSlot::Normal => "normalMap",
            TextureSlot::Displacement => "displacementMap",
        }
    }
}

pub struct MaterialManager {
    materials: Arena<StandardMaterial>,
    textures: Arena<TextureAsset>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
            textures: Arena::new(),
        }
    }

    pub fn add_material(&mut self, material: StandardMaterial) -> MaterialId {
        self.materials.alloc(material)
    }

    pub fn add_texture(&mut self, texture: TextureAsset) -> TextureId {
        self.textures.alloc(texture)
    }

    pub fn material(&self, id: MaterialId) -> Option<&StandardMaterial> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut StandardMaterial> {
        self.materials.get_mut(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureAsset> {
        self.textures.get(id)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &StandardMaterial)> {
        self.materials.iter()
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureId, &TextureAsset)> {
        self.textures.iter()
    }

    /// UV scale of the texture bound to `slot`, or 1x1 when the slot is empty.
    pub fn uv_repeat(&self, material: &StandardMaterial, slot: TextureSlot) -> Vec2 {
        material
            .texture(slot)
            .and_then(|id| self.texture(id))
            .map_or(Vec2::ONE, |texture| texture.repeat)
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        if let Some(_node) = ui.tree_node("Materials") {
            for (id, material) in self.materials.iter() {
                let maps = TextureSlot::ALL
                    .iter()
                    .filter(|slot| material.texture(**slot).is_some())
                    .map(|slot| slot.label())
                    .collect::<Vec<_>>();

                ui.text(format!("{}: {}", id.index(), material.name));
                if !maps.is_empty() {
                    ui.text_disabled(format!("   {}", maps.join(", ")));
                }
            }
        }

        if let Some(_node) = ui.tree_node("Textures") {
            for (_, texture) in self.textures.iter() {
                let (width, height) = texture.size();
                ui.text(format!("{} ({}x{})", texture.name, width, height));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_material() {
        let material = StandardMaterial::default();
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.metalness, 0.0);
        assert_eq!(material.opacity, 1.0);
        assert!(!material.transparent);
        assert!(TextureSlot::ALL.iter().all(|s| material.texture(*s).is_none()));
    }

    #[test]
    fn uv_repeat_follows_bound_texture() {
        let mut manager = MaterialManager::new();

        let mut tiled = TextureAsset::placeholder("tiled");
        tiled.set_repeat_wrapping(Vec2::splat(8.0));
        let tiled = manager.add_texture(tiled);
        let plain = manager.add_texture(TextureAsset::placeholder("plain"));

        let material = StandardMaterial {
            map: Some(tiled),
            alpha_map: Some(plain),
            ..Default::default()
        };

        assert_eq!(manager.uv_repeat(&material, TextureSlot::Color), Vec2::splat(8.0));
        assert_eq!(manager.uv_repeat(&material, TextureSlot::Alpha), Vec2::ONE);
        assert_eq!(manager.uv_repeat(&material, TextureSlot::Normal), Vec2::ONE);
    }

    #[test]
    fn one_texture_can_feed_several_slots() {
        let mut manager = MaterialManager::new();
        let arm = manager.add_texture(TextureAsset::placeholder("arm"));

        let material = StandardMaterial {
            ao_map: Some(arm),
            roughness_map: Some(arm),
            metalness_map: Some(arm),
            ..Default::default()
        };
        let id = manager.add_material(material);

        let material = manager.material(id).unwrap();
        assert_eq!(material.texture(TextureSlot::AmbientOcclusion), Some(arm));
        assert_eq!(material.texture(TextureSlot::Metalness), Some(arm));
        assert_eq!(manager.textures().count(), 1);
    }
}
