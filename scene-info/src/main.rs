//! Scene file analyzer tool.
//!
//! Displays detailed information about .msne scene files including:
//! - Section sizes
//! - Texture pool and material variant statistics
//! - Mesh, instance and camera details
//!
//! Usage: cargo run -p scene-info -- <file.msne> [--verbose|-v]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use moonshine_scene::format::reader::{MsneFile, SectionOffsets};
use moonshine_scene::{read_msne, VariantKind};

#[derive(Parser)]
#[command(name = "scene-info")]
#[command(about = "Inspect .msne scene files")]
#[command(version)]
struct Cli {
    /// Scene file to inspect
    file: PathBuf,

    /// List every texture, material, mesh and instance
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    analyze_scene(&cli.file, cli.verbose)
}

fn analyze_scene(path: &Path, verbose: bool) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_size = bytes.len() as u64;
    let file = read_msne(&bytes).with_context(|| format!("Invalid scene file {}", path.display()))?;
    log::debug!("Decoded {} bytes from {}", file_size, path.display());

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    println!("Scene File: {}", file_name);
    println!("File Size: {}", format_bytes(file_size));
    println!();

    print_section_breakdown(&file.offsets, file_size);
    print_scene_summary(&file);
    print_camera(&file);

    if verbose {
        println!();
        print_verbose_details(&file);
    }

    Ok(())
}

fn print_section_breakdown(offsets: &SectionOffsets, file_size: u64) {
    println!("Sections:");
    println!("  {:<12} {:>10} {:>12} {:>10}", "Section", "Offset", "Size", "% of File");
    println!("  {}", "-".repeat(48));

    let sections = [
        ("Textures", offsets.textures, offsets.variants),
        ("Variants", offsets.variants, offsets.materials),
        ("Materials", offsets.materials, offsets.meshes),
        ("Meshes", offsets.meshes, offsets.instances),
        ("Instances", offsets.instances, offsets.camera),
        ("Camera", offsets.camera, offsets.end),
    ];
    for (name, start, end) in sections {
        let size = end - start;
        let percent = if file_size > 0 {
            size as f64 / file_size as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "  {:<12} {:>10} {:>12} {:>9.1}%",
            name,
            start,
            format_bytes(size),
            percent
        );
    }
    println!();
}

fn print_scene_summary(file: &MsneFile) {
    println!("Scene Contents:");

    let textures = &file.textures;
    println!(
        "  Textures: {} ({} scalar, {} pair, {} triple)",
        textures.total_count(),
        textures.scalars.len(),
        textures.pairs.len(),
        textures.triples.len()
    );

    let variants = &file.variants;
    println!(
        "  Variants: {} glass, {} lambert, {} mirror, {} pbr",
        variants.glass.len(),
        variants.lambert.len(),
        variants.mirror_count,
        variants.pbr.len()
    );

    let count_kind = |kind: VariantKind| file.materials.iter().filter(|m| m.kind == kind).count();
    println!(
        "  Materials: {} ({} glass, {} lambert, {} mirror, {} pbr)",
        file.materials.len(),
        count_kind(VariantKind::Glass),
        count_kind(VariantKind::Lambert),
        count_kind(VariantKind::PerfectMirror),
        count_kind(VariantKind::StandardPbr)
    );

    let total_vertices: usize = file.meshes.iter().map(|m| m.positions.len()).sum();
    let total_triangles: usize = file.meshes.iter().map(|m| m.triangles.len()).sum();
    let with_normals = file.meshes.iter().filter(|m| m.normals.is_some()).count();
    println!(
        "  Meshes: {} ({} vertices, {} triangles, {} with normals)",
        file.meshes.len(),
        format_number(total_vertices),
        format_number(total_triangles),
        with_normals
    );

    let rendered_triangles: usize = file
        .instances
        .iter()
        .filter_map(|i| file.meshes.get(i.mesh as usize))
        .map(|m| m.triangles.len())
        .sum();
    println!(
        "  Instances: {} ({} triangles rendered)",
        file.instances.len(),
        format_number(rendered_triangles)
    );
    println!();
}

fn print_camera(file: &MsneFile) {
    let camera = &file.camera;
    println!("Camera:");
    println!("  Origin:   {}", format_vec3(camera.origin));
    println!("  Forward:  {}", format_vec3(camera.forward));
    println!("  Up:       {}", format_vec3(camera.up));
    println!(
        "  VFOV:     {:.2}° ({:.4} rad)",
        camera.vfov.to_degrees(),
        camera.vfov
    );
    println!("  Aspect:   {:.4}", camera.aspect);
    println!("  Aperture: {:.5}", camera.aperture);
    println!("  Focus:    {:.3}", camera.focus_distance);
}

fn print_verbose_details(file: &MsneFile) {
    println!("Textures:");
    let mut index = 0;
    for value in &file.textures.scalars {
        println!("  {:>4}  scalar {:.4}", index, value);
        index += 1;
    }
    for [u, v] in &file.textures.pairs {
        println!("  {:>4}  pair   ({:.4}, {:.4})", index, u, v);
        index += 1;
    }
    for value in &file.textures.triples {
        println!("  {:>4}  triple {}", index, format_vec3(*value));
        index += 1;
    }

    println!();
    println!("Materials:");
    println!(
        "  {:>4} {:<14} {:>6} {:>7} {:>8}",
        "#", "Kind", "Index", "Normal", "Emissive"
    );
    println!("  {}", "-".repeat(43));
    for (i, material) in file.materials.iter().enumerate() {
        println!(
            "  {:>4} {:<14} {:>6} {:>7} {:>8}",
            i,
            format!("{:?}", material.kind),
            material.variant_index,
            material.normal,
            material.emissive
        );
    }

    println!();
    println!("Meshes:");
    println!("  {:>4} {:>10} {:>10} {:>8}", "#", "Vertices", "Triangles", "Normals");
    println!("  {}", "-".repeat(36));
    for (i, mesh) in file.meshes.iter().enumerate() {
        println!(
            "  {:>4} {:>10} {:>10} {:>8}",
            i,
            format_number(mesh.positions.len()),
            format_number(mesh.triangles.len()),
            if mesh.normals.is_some() { "yes" } else { "no" }
        );
    }

    println!();
    println!("Instances:");
    for (i, instance) in file.instances.iter().enumerate() {
        let t = &instance.transform;
        println!(
            "  {:>4}  mesh {:>3}  material {:>3}  translation ({:.3}, {:.3}, {:.3})",
            i, instance.mesh, instance.material, t[3], t[7], t[11]
        );
    }
}

fn format_vec3(v: [f32; 3]) -> String {
    format!("({:.4}, {:.4}, {:.4})", v[0], v[1], v[2])
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
