use anyhow::{bail, Context};
use glam::Vec3;

/// Linear RGB colour. Hex strings are interpreted as sRGB and converted on parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub Vec3);

impl Color {
    pub const WHITE: Color = Color(Vec3::ONE);

    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("Expected a colour of the form #rrggbb, got {hex:?}");
        }

        let value = u32::from_str_radix(digits, 16)
            .with_context(|| format!("Invalid hex colour {hex:?}"))?;

        Ok(Self::from_srgb8(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }

    pub fn from_srgb8(r: u8, g: u8, b: u8) -> Self {
        Color(Vec3::new(
            srgb_to_linear(r as f32 / 255.0),
            srgb_to_linear(g as f32 / 255.0),
            srgb_to_linear(b as f32 / 255.0),
        ))
    }

    pub fn linear(&self) -> Vec3 {
        self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}
