use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use moonshine_scene::{RenderSettings, Scene, SceneDescription};

#[derive(Parser)]
#[command(name = "scene-converter")]
#[command(about = "Convert JSON scene descriptions to .msne scene files")]
#[command(version)]
struct Cli {
    /// Input scene description (.json)
    input: PathBuf,

    /// Output path (defaults to the input filename with .msne extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render resolution as WIDTHxHEIGHT, overriding the description
    #[arg(long, value_parser = parse_resolution)]
    resolution: Option<RenderSettings>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.input.extension().and_then(|e| e.to_str()) {
        Some("json") => {}
        _ => bail!("Unsupported file type: {}", cli.input.display()),
    }
    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension(moonshine_scene::format::EXTENSION));

    eprintln!("Loading {}...", cli.input.display());
    let description = SceneDescription::from_path(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let mut scene = description.into_scene()?;

    if let Some(render) = cli.resolution {
        scene.render = render;
    }

    print_stats(&scene);

    eprintln!("Saving to {}...", output.display());
    scene
        .save_msne(&output)
        .with_context(|| format!("Failed to export {}", output.display()))?;

    let file_size = std::fs::metadata(&output)?.len();
    log::debug!("Wrote {} bytes to {}", file_size, output.display());
    eprintln!("Done. Output: {} ({})", output.display(), format_bytes(file_size));

    Ok(())
}

fn parse_resolution(value: &str) -> Result<RenderSettings, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width
        .trim()
        .parse()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;
    Ok(RenderSettings::new(width, height))
}

fn print_stats(scene: &Scene) {
    eprintln!("  Meshes:     {}", scene.meshes.len());
    eprintln!("  Materials:  {}", scene.materials.len());
    eprintln!("  Instances:  {}", scene.instances.len());
    eprintln!("  Cameras:    {}", scene.cameras.len());
    eprintln!("  Resolution: {}x{}", scene.render.width, scene.render.height);
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
