use std::path::PathBuf;

use clap::Parser;

use crate::{graveyard::DEFAULT_GRAVE_COUNT, rendering::config::RenderConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "haunted-house")]
#[command(about = "Procedural haunted house scene", long_about = None)]
pub struct Cli {
    /// Directory containing `shaders/` and the floor textures
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Seed for the graveyard layout. A random seed is used when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of graves scattered around the house
    #[arg(long, default_value_t = DEFAULT_GRAVE_COUNT)]
    pub graves: usize,

    /// Upper bound for the device pixel ratio used for the scene render target
    #[arg(long, default_value_t = 2.0)]
    pub max_pixel_ratio: f64,

    /// Start without the debug panel
    #[arg(long = "no-gui")]
    pub no_gui: bool,
}

impl Cli {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            max_pixel_ratio: self.max_pixel_ratio,
            shader_folder: self.assets.join("shaders"),
            ..RenderConfig::default()
        }
    }
}
