//! MSNE scene file encoding.
//!
//! This module serializes a [`Scene`] into the MSNE binary scene-interchange
//! format read by the offline renderer. The format is a fixed grammar of
//! little-endian sections with no table of contents; a reader must know the
//! section order.
//!
//! # File Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Magic: b"MSNE"                                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ TEXTURES   u32 total, scalar/pair/triple pools, u32 dds (=0) │
//! │ VARIANTS   glass, lambert, mirror (count only), standard pbr │
//! │ MATERIALS  normal tex, emissive tex, u64 kind, u64 index     │
//! │ MESHES     triangles, positions, optional normals, no uvs    │
//! │ INSTANCES  3x4 row-major transform, visibility, geometry     │
//! │ CAMERA     origin, forward, up, vfov, aspect, aperture, focus│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Texture references use global indices: the scalar pool comes first, then
//! the pair pool, then the triple pool.

pub mod classify;
pub mod interner;
pub mod reader;
pub mod writer;

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::camera::Camera;
use crate::material::MaterialId;
use crate::mesh::{Mesh, MeshId};
use crate::Scene;

use classify::{classify_material, ClassifiedMaterial, MaterialVariant};
use interner::{TextureHandle, TextureInterner};
use writer::MsneWriter;

// ============================================================================
// Constants
// ============================================================================

/// Magic number identifying MSNE files: "MSNE" in ASCII
pub const MAGIC: [u8; 4] = *b"MSNE";

/// File extension used for MSNE scene files.
pub const EXTENSION: &str = "msne";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while encoding or decoding MSNE files.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Scene must have exactly one camera, found {0}")]
    InvalidCameraCount(usize),

    #[error("Material '{material}': unsupported surface node '{node}'")]
    UnsupportedMaterial { material: String, node: String },

    #[error("Material '{material}': input '{input}' is linked, only constant inputs are supported")]
    LinkedInputUnsupported { material: String, input: String },

    #[error("Material '{material}': unsupported shading graph: {reason}")]
    UnsupportedGraph { material: String, reason: String },

    #[error("Material '{material}': input '{input}' must be a {expected}")]
    InvalidInputType {
        material: String,
        input: String,
        expected: &'static str,
    },

    #[error("Mesh {mesh}: {reason}")]
    InvalidMesh { mesh: String, reason: String },

    #[error("Instance #{instance}: {reason}")]
    InvalidReference { instance: u32, reason: String },

    #[error("Invalid render resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("IO error: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("Invalid magic number")]
    InvalidMagic,

    #[error("Invalid boolean byte: {0}")]
    InvalidBool(u8),

    #[error("Invalid material variant kind: {0}")]
    InvalidVariantKind(u64),

    #[error("Texture count mismatch: header declares {declared}, pools hold {actual}")]
    TextureCountMismatch { declared: u32, actual: u32 },

    #[error("Unsupported DDS textures: {0}")]
    UnsupportedDdsTextures(u32),

    #[error("{0} trailing bytes after camera record")]
    TrailingBytes(usize),
}

// ============================================================================
// Material Variant Kinds
// ============================================================================

/// Analytic BSDF family of a material. The discriminant is the on-disk code.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Glass = 0,
    Lambert = 1,
    PerfectMirror = 2,
    StandardPbr = 3,
}

impl VariantKind {
    pub fn code(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u64> for VariantKind {
    type Error = FormatError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VariantKind::Glass),
            1 => Ok(VariantKind::Lambert),
            2 => Ok(VariantKind::PerfectMirror),
            3 => Ok(VariantKind::StandardPbr),
            _ => Err(FormatError::InvalidVariantKind(value)),
        }
    }
}

/// Variant records grouped by kind, in emission order.
#[derive(Debug, Default)]
struct VariantArrays {
    glass: Vec<f32>,
    lambert: Vec<TextureHandle>,
    mirror_count: u64,
    pbr: Vec<(TextureHandle, TextureHandle, TextureHandle, f32)>,
}

impl VariantArrays {
    /// Appends a variant and returns its index within its kind.
    fn push(&mut self, variant: &MaterialVariant) -> u64 {
        match *variant {
            MaterialVariant::Glass { ior } => {
                self.glass.push(ior);
                self.glass.len() as u64 - 1
            }
            MaterialVariant::Lambert { color } => {
                self.lambert.push(color);
                self.lambert.len() as u64 - 1
            }
            MaterialVariant::PerfectMirror => {
                self.mirror_count += 1;
                self.mirror_count - 1
            }
            MaterialVariant::StandardPbr {
                color,
                metalness,
                roughness,
                ior,
            } => {
                self.pbr.push((color, metalness, roughness, ior));
                self.pbr.len() as u64 - 1
            }
        }
    }
}

/// Shared per-material record.
#[derive(Debug, Clone, Copy)]
struct MaterialEntry {
    normal: TextureHandle,
    emissive: TextureHandle,
    kind: VariantKind,
    variant_index: u64,
}

// ============================================================================
// Export Plan
// ============================================================================

/// Export-scoped state built before any bytes are written.
///
/// Classification runs first so the texture pools are final when the
/// texture section is written.
struct ExportPlan<'a> {
    camera: &'a Camera,
    textures: TextureInterner,
    variants: VariantArrays,
    materials: Vec<MaterialEntry>,
    material_slots: HashMap<MaterialId, u32>,
    meshes: Vec<(MeshId, &'a Mesh)>,
    mesh_slots: HashMap<MeshId, u32>,
}

impl<'a> ExportPlan<'a> {
    fn build(scene: &'a Scene) -> Result<Self, FormatError> {
        let camera = match scene.cameras.as_slice() {
            [camera] => camera,
            cameras => return Err(FormatError::InvalidCameraCount(cameras.len())),
        };

        let render = scene.render;
        if render.width == 0 || render.height == 0 {
            return Err(FormatError::InvalidResolution {
                width: render.width,
                height: render.height,
            });
        }

        // Meshes in first-reference order, deduplicated by id.
        let mut meshes = Vec::new();
        let mut mesh_slots = HashMap::new();
        let mut referenced_materials = HashSet::new();
        for instance in &scene.instances {
            let mesh = scene.get_mesh(instance.mesh).ok_or_else(|| FormatError::InvalidReference {
                instance: instance.id,
                reason: format!("mesh {} does not exist", instance.mesh),
            })?;
            if scene.get_material(instance.material).is_none() {
                return Err(FormatError::InvalidReference {
                    instance: instance.id,
                    reason: format!("material {} does not exist", instance.material),
                });
            }

            if !mesh_slots.contains_key(&instance.mesh) {
                mesh_slots.insert(instance.mesh, meshes.len() as u32);
                meshes.push((instance.mesh, mesh));
            }
            referenced_materials.insert(instance.material);
        }

        for &(id, mesh) in &meshes {
            mesh.validate().map_err(|reason| FormatError::InvalidMesh {
                mesh: mesh.label(id),
                reason,
            })?;
        }

        // Materials in scene order; never deduplicated, even when parameters match.
        let mut textures = TextureInterner::new();
        let mut variants = VariantArrays::default();
        let mut materials = Vec::new();
        let mut material_slots = HashMap::new();
        for (id, material) in scene.materials.iter().enumerate() {
            let id = id as MaterialId;
            if !referenced_materials.contains(&id) {
                continue;
            }

            let ClassifiedMaterial {
                normal,
                emissive,
                variant,
            } = classify_material(material, &mut textures)?;
            material_slots.insert(id, materials.len() as u32);
            materials.push(MaterialEntry {
                normal,
                emissive,
                kind: variant.kind(),
                variant_index: variants.push(&variant),
            });
        }

        Ok(Self {
            camera,
            textures,
            variants,
            materials,
            material_slots,
            meshes,
            mesh_slots,
        })
    }
}

// ============================================================================
// Section Writers
// ============================================================================

fn write_textures<W: Write>(
    textures: &TextureInterner,
    writer: &mut MsneWriter<W>,
) -> Result<(), FormatError> {
    writer.write_count(textures.total_count())?;

    writer.write_count(textures.scalars().len())?;
    for value in textures.scalars().values() {
        writer.write_f32s(value)?;
    }
    writer.write_count(textures.pairs().len())?;
    for value in textures.pairs().values() {
        writer.write_f32s(value)?;
    }
    writer.write_count(textures.triples().len())?;
    for value in textures.triples().values() {
        writer.write_f32s(value)?;
    }

    // DDS textures are not supported
    writer.write_u32(0)?;
    Ok(())
}

fn write_variants<W: Write>(
    variants: &VariantArrays,
    textures: &TextureInterner,
    writer: &mut MsneWriter<W>,
) -> Result<(), FormatError> {
    writer.write_count(variants.glass.len())?;
    for &ior in &variants.glass {
        writer.write_f32(ior)?;
    }

    writer.write_count(variants.lambert.len())?;
    for &color in &variants.lambert {
        writer.write_u32(textures.global_index(color))?;
    }

    // Perfect mirrors carry no parameters.
    writer.write_count(variants.mirror_count as usize)?;

    writer.write_count(variants.pbr.len())?;
    for &(color, metalness, roughness, ior) in &variants.pbr {
        writer.write_u32(textures.global_index(color))?;
        writer.write_u32(textures.global_index(metalness))?;
        writer.write_u32(textures.global_index(roughness))?;
        writer.write_f32(ior)?;
    }
    Ok(())
}

fn write_materials<W: Write>(
    materials: &[MaterialEntry],
    textures: &TextureInterner,
    writer: &mut MsneWriter<W>,
) -> Result<(), FormatError> {
    writer.write_count(materials.len())?;
    for entry in materials {
        writer.write_u32(textures.global_index(entry.normal))?;
        writer.write_u32(textures.global_index(entry.emissive))?;
        writer.write_u64(entry.kind.code())?;
        writer.write_u64(entry.variant_index)?;
    }
    Ok(())
}

/// Writes one mesh record. The mesh must already be validated.
fn write_mesh<W: Write>(id: MeshId, mesh: &Mesh, writer: &mut MsneWriter<W>) -> Result<(), FormatError> {
    writer.write_count(mesh.triangles.len())?;
    for triangle in &mesh.triangles {
        for &index in triangle {
            writer.write_u32(index)?;
        }
    }

    writer.write_count(mesh.positions.len())?;
    for position in &mesh.positions {
        writer.write_f32s(position)?;
    }

    let normals = match (&mesh.normals, mesh.is_smooth_shaded()) {
        (Some(normals), true) => Some(normals),
        (None, true) => {
            log::warn!(
                "Mesh {} is smooth shaded but has no normals; writing it without normals",
                mesh.label(id)
            );
            None
        }
        (_, false) => None,
    };
    writer.write_bool(normals.is_some())?;
    if let Some(normals) = normals {
        for normal in normals {
            writer.write_f32s(normal)?;
        }
    }

    // Texture coordinates are not exported yet
    writer.write_bool(false)?;

    log::debug!(
        "Wrote mesh {}: {} triangles, {} vertices, normals: {}",
        mesh.label(id),
        mesh.triangles.len(),
        mesh.positions.len(),
        normals.is_some()
    );
    Ok(())
}

fn write_instances<W: Write>(
    scene: &Scene,
    plan: &ExportPlan,
    writer: &mut MsneWriter<W>,
) -> Result<(), FormatError> {
    writer.write_count(scene.instances.len())?;
    for instance in &scene.instances {
        writer.write_f32s(&instance.transform_rows())?;
        // visibility
        writer.write_bool(true)?;
        // geometry count
        writer.write_u32(1)?;
        writer.write_u32(plan.mesh_slots[&instance.mesh])?;
        writer.write_u32(plan.material_slots[&instance.material])?;
        // sampled
        writer.write_u32(0)?;
    }
    Ok(())
}

fn write_camera<W: Write>(scene: &Scene, camera: &Camera, writer: &mut MsneWriter<W>) -> Result<(), FormatError> {
    let lens = camera.lens(&scene.render);
    writer.write_point3(lens.origin)?;
    writer.write_vector3(lens.forward)?;
    writer.write_vector3(lens.up)?;
    writer.write_f32(lens.vfov)?;
    writer.write_f32(lens.aspect)?;
    writer.write_f32(lens.aperture)?;
    writer.write_f32(lens.focus_distance)?;
    Ok(())
}

// ============================================================================
// Assembly
// ============================================================================

/// Writes a complete MSNE file for `scene` to `writer`.
///
/// All validation and material classification happens before the first byte
/// is written, so a failing scene leaves the writer untouched. Only I/O
/// errors can interrupt the output once writing starts.
pub fn write_scene<W: Write>(scene: &Scene, writer: W) -> Result<(), FormatError> {
    let plan = ExportPlan::build(scene)?;
    write_sections(scene, &plan, &mut MsneWriter::new(writer))
}

fn write_sections<W: Write>(
    scene: &Scene,
    plan: &ExportPlan,
    writer: &mut MsneWriter<W>,
) -> Result<(), FormatError> {
    writer.write_bytes(&MAGIC)?;
    write_textures(&plan.textures, writer)?;
    write_variants(&plan.variants, &plan.textures, writer)?;
    write_materials(&plan.materials, &plan.textures, writer)?;
    log::debug!(
        "Wrote {} materials, {} textures ({} bytes)",
        plan.materials.len(),
        plan.textures.total_count(),
        writer.position()
    );

    writer.write_count(plan.meshes.len())?;
    for &(id, mesh) in &plan.meshes {
        write_mesh(id, mesh, writer)?;
    }

    write_instances(scene, plan, writer)?;
    write_camera(scene, plan.camera, writer)?;
    log::debug!(
        "Wrote {} meshes, {} instances ({} bytes total)",
        plan.meshes.len(),
        scene.instances.len(),
        writer.position()
    );
    Ok(())
}

/// Encodes `scene` into an in-memory MSNE file.
pub fn encode_scene(scene: &Scene) -> Result<Vec<u8>, FormatError> {
    let plan = ExportPlan::build(scene)?;
    let mut writer = MsneWriter::new(Vec::new());
    write_sections(scene, &plan, &mut writer)?;
    Ok(writer.into_inner())
}

/// Writes `bytes` to `path` through a uniquely named temporary file in the
/// same directory, persisted over `path` only once fully written and synced.
fn write_file_atomically(path: &Path, bytes: &[u8]) -> Result<(), FormatError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| FormatError::IoFailure(e.error))?;
    Ok(())
}

impl Scene {
    /// Serializes the scene to bytes in MSNE format.
    pub fn to_msne_bytes(&self) -> Result<Vec<u8>, FormatError> {
        encode_scene(self)
    }

    /// Encodes the scene and saves it to `path`.
    ///
    /// Nothing is written unless encoding succeeds; the file is replaced
    /// atomically.
    pub fn save_msne(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let bytes = self.to_msne_bytes()?;
        write_file_atomically(path.as_ref(), &bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
