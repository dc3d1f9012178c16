use anyhow::Result;
use clap::Parser;

mod camera;
mod cli;
mod color;
mod controls;
mod debug_gui;
mod engine;
mod geometry;
mod graveyard;
mod haunted_house;
mod lights;
mod material;
mod rendering;
mod scene_graph;
mod texture;
mod timer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let cli = cli::Cli::parse();

    pollster::block_on(window::run(cli))?;

    Ok(())
}
