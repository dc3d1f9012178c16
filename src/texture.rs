use std::path::{Path, PathBuf};

use anyhow::Context;
use glam::Vec2;
use id_arena::Id;
use image::{imageops::FilterType, ImageBuffer, Pixel, Rgba, Rgba32FImage, RgbaImage};
use rayon::prelude::*;

use crate::color::{linear_to_srgb, srgb_to_linear};

pub type TextureId = Id<TextureAsset>;

/// How the texel values should be interpreted when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Colour data authored in sRGB, decoded to linear by the sampler
    Srgb,
    /// Non-colour data (normals, roughness, heights) used as-is
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Decoded image plus the sampling settings the material system needs.
#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub name: String,
    pub image: RgbaImage,
    pub color_space: ColorSpace,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub repeat: Vec2,
}

impl TextureAsset {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
            color_space: ColorSpace::default(),
            wrap_s: WrapMode::default(),
            wrap_t: WrapMode::default(),
            repeat: Vec2::ONE,
        }
    }

    /// 1x1 white texture standing in for an image that could not be loaded.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])))
    }

    /// Tiles the texture `repeat` times and switches both axes to repeat wrapping.
    pub fn set_repeat_wrapping(&mut self, repeat: Vec2) {
        self.repeat = repeat;
        self.wrap_s = WrapMode::Repeat;
        self.wrap_t = WrapMode::Repeat;
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn mip_level_count(&self) -> u32 {
        let (width, height) = self.size();
        32 - width.max(height).max(1).leading_zeros()
    }

    /// Full mip chain, level 0 first, down to 1x1. sRGB textures are filtered in
    /// linear space.
    pub fn mip_chain(&self) -> Vec<RgbaImage> {
        let level_count = self.mip_level_count();

        match self.color_space {
            ColorSpace::Linear => downsample_chain(self.image.clone(), level_count),
            ColorSpace::Srgb => downsample_chain(decode_srgb(&self.image), level_count)
                .iter()
                .map(encode_srgb)
                .collect(),
        }
    }
}

fn downsample_chain<P>(
    base: ImageBuffer<P, Vec<P::Subpixel>>,
    level_count: u32,
) -> Vec<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let mut levels = Vec::with_capacity(level_count as usize);
    levels.push(base);

    for level in 1..level_count as usize {
        let previous = &levels[level - 1];
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }

    levels
}

/// Alpha is stored linearly and passes through unchanged.
fn decode_srgb(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        Rgba([
            srgb_to_linear(r as f32 / 255.0),
            srgb_to_linear(g as f32 / 255.0),
            srgb_to_linear(b as f32 / 255.0),
            a as f32 / 255.0,
        ])
    })
}

fn encode_srgb(image: &Rgba32FImage) -> RgbaImage {
    let to_unorm8 = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;

    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        Rgba([
            to_unorm8(linear_to_srgb(r)),
            to_unorm8(linear_to_srgb(g)),
            to_unorm8(linear_to_srgb(b)),
            to_unorm8(a),
        ])
    })
}

/// Reads textures relative to an asset root.
pub struct TextureLoader {
    root: PathBuf,
}

impl TextureLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads a texture, falling back to a white placeholder if the file can't be read.
    pub fn load(&self, path: impl AsRef<Path>) -> TextureAsset {
        let path = path.as_ref();

        match self.try_load(path) {
            Ok(texture) => {
                log::debug!(
                    "Loaded texture {} ({}x{})",
                    texture.name,
                    texture.image.width(),
                    texture.image.height()
                );
                texture
            }
            Err(e) => {
                log::error!("{:#}", e);
                TextureAsset::placeholder(path.display().to_string())
            }
        }
    }

    /// Decodes several textures in parallel, preserving the input order.
    pub fn load_all<P>(&self, paths: &[P]) -> Vec<TextureAsset>
    where
        P: AsRef<Path> + Sync,
    {
        paths.par_iter().map(|path| self.load(path)).collect()
    }

    fn try_load(&self, path: &Path) -> anyhow::Result<TextureAsset> {
        let full_path = self.root.join(path);
        let image = image::open(&full_path)
            .with_context(|| format!("Failed to load texture {}", full_path.display()))?
            .to_rgba8();

        Ok(TextureAsset::new(path.display().to_string(), image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_single_white_texel() {
        let texture = TextureAsset::placeholder("missing");
        assert_eq!(texture.size(), (1, 1));
        assert_eq!(texture.image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(texture.mip_level_count(), 1);
    }

    #[test]
    fn mip_chain_halves_down_to_one_texel() {
        let texture = TextureAsset::new("rect", RgbaImage::new(8, 4));
        let sizes: Vec<_> = texture
            .mip_chain()
            .iter()
            .map(|level| level.dimensions())
            .collect();

        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
    }

    fn black_and_white(color_space: ColorSpace) -> TextureAsset {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));

        let mut texture = TextureAsset::new("checker", image);
        texture.color_space = color_space;
        texture
    }

    #[test]
    fn srgb_mips_average_in_linear_space() {
        let chain = black_and_white(ColorSpace::Srgb).mip_chain();
        let Rgba([r, g, b, a]) = *chain[1].get_pixel(0, 0);

        // Linear 0.5 encodes to roughly 188, not the encoded midpoint 128
        assert!((186..=190).contains(&r));
        assert!(r == g && g == b);
        assert!((127..=128).contains(&a));
    }

    #[test]
    fn linear_mips_average_raw_values() {
        let chain = black_and_white(ColorSpace::Linear).mip_chain();
        let Rgba([r, _, _, a]) = *chain[1].get_pixel(0, 0);

        assert!((127..=128).contains(&r));
        assert_eq!(r, a);
    }

    #[test]
    fn non_power_of_two_mip_count() {
        let texture = TextureAsset::new("npot", RgbaImage::new(1000, 3));
        assert_eq!(texture.mip_level_count(), 10);
        assert_eq!(texture.mip_chain().last().unwrap().dimensions(), (1, 1));
    }

    #[test]
    fn repeat_wrapping_sets_both_axes() {
        let mut texture = TextureAsset::placeholder("floor");
        assert_eq!(texture.wrap_s, WrapMode::ClampToEdge);

        texture.set_repeat_wrapping(Vec2::splat(8.0));

        assert_eq!(texture.repeat, Vec2::splat(8.0));
        assert_eq!(texture.wrap_s, WrapMode::Repeat);
        assert_eq!(texture.wrap_t, WrapMode::Repeat);
    }

    #[test]
    fn missing_file_falls_back_to_placeholder() {
        let loader = TextureLoader::new(std::env::temp_dir());
        let texture = loader.load("haunted-house-does-not-exist.png");
        assert_eq!(texture.size(), (1, 1));
    }

    #[test]
    fn loads_files_in_order() {
        let dir = std::env::temp_dir().join("haunted-house-texture-test");
        std::fs::create_dir_all(&dir).unwrap();

        RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]))
            .save(dir.join("a.png"))
            .unwrap();
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))
            .save(dir.join("b.png"))
            .unwrap();

        let loader = TextureLoader::new(&dir);
        let textures = loader.load_all(&["a.png", "missing.png", "b.png"]);

        assert_eq!(textures[0].size(), (4, 2));
        assert_eq!(textures[0].image.get_pixel(3, 1), &Rgba([10, 20, 30, 255]));
        assert_eq!(textures[1].size(), (1, 1));
        assert_eq!(textures[2].size(), (2, 2));
    }
}
