use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// The scene target never uses more device pixels per logical pixel than this
    pub max_pixel_ratio: f64,
    pub shader_folder: PathBuf,
    pub clear_color: wgpu::Color,
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            shader_folder: PathBuf::from("assets/shaders"),
            clear_color: wgpu::Color::BLACK,
            vsync: true,
        }
    }
}
