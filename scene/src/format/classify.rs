//! Reduces shading graphs to the analytic BSDF variants the format supports.
//!
//! Only the parameters a variant needs are extracted. Every parameter must
//! be a literal constant; constants that are stored as textures are interned
//! into the export's [`TextureInterner`].

use crate::material::{inputs, InputSource, Material, ShaderNode, ShaderNodeKind, ShaderValue};

use super::interner::{TextureHandle, TextureInterner};
use super::{FormatError, VariantKind};

/// Flat tangent-space normal used for every material.
pub const FLAT_NORMAL: [f32; 2] = [0.5, 0.5];

/// Emission of materials that do not emit.
pub const NO_EMISSION: [f32; 3] = [0.0, 0.0, 0.0];

// Defaults for inputs the host did not provide.
const DEFAULT_COLOR: [f32; 3] = [0.8, 0.8, 0.8];
const DEFAULT_METALLIC: f32 = 0.0;
const DEFAULT_ROUGHNESS: f32 = 0.5;
const DEFAULT_IOR: f32 = 1.5;
const DEFAULT_EMISSION_STRENGTH: f32 = 1.0;

/// A material reduced to one analytic BSDF family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialVariant {
    Glass {
        ior: f32,
    },
    Lambert {
        color: TextureHandle,
    },
    PerfectMirror,
    StandardPbr {
        color: TextureHandle,
        metalness: TextureHandle,
        roughness: TextureHandle,
        ior: f32,
    },
}

impl MaterialVariant {
    pub fn kind(&self) -> VariantKind {
        match self {
            MaterialVariant::Glass { .. } => VariantKind::Glass,
            MaterialVariant::Lambert { .. } => VariantKind::Lambert,
            MaterialVariant::PerfectMirror => VariantKind::PerfectMirror,
            MaterialVariant::StandardPbr { .. } => VariantKind::StandardPbr,
        }
    }
}

/// Classification result: the variant plus the fields every material shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedMaterial {
    pub normal: TextureHandle,
    pub emissive: TextureHandle,
    pub variant: MaterialVariant,
}

/// Classifies one material, interning its constant textures.
pub fn classify_material(
    material: &Material,
    textures: &mut TextureInterner,
) -> Result<ClassifiedMaterial, FormatError> {
    let surface = resolve_surface(material)?;
    let slots = SurfaceInputs {
        material,
        node: surface,
    };

    let classified = match surface.kind {
        ShaderNodeKind::PrincipledBsdf => {
            let color = slots.rgb(inputs::BASE_COLOR, DEFAULT_COLOR)?;
            let metallic = slots.float(inputs::METALLIC, DEFAULT_METALLIC)?;
            let roughness = slots.float(inputs::ROUGHNESS, DEFAULT_ROUGHNESS)?;
            let ior = slots.float(inputs::IOR, DEFAULT_IOR)?;
            let emission = slots.rgb(inputs::EMISSION, NO_EMISSION)?;
            let strength = slots.float(inputs::EMISSION_STRENGTH, DEFAULT_EMISSION_STRENGTH)?;

            let variant = MaterialVariant::StandardPbr {
                color: textures.intern_triple(color),
                metalness: textures.intern_scalar(metallic),
                roughness: textures.intern_scalar(roughness),
                ior,
            };
            ClassifiedMaterial {
                normal: textures.intern_pair(FLAT_NORMAL),
                emissive: textures.intern_triple(emission.map(|c| c * strength)),
                variant,
            }
        }
        ShaderNodeKind::GlossyBsdf => {
            let roughness = slots.float(inputs::ROUGHNESS, DEFAULT_ROUGHNESS)?;
            if roughness != 0.0 {
                return Err(FormatError::UnsupportedGraph {
                    material: material.name.clone(),
                    reason: format!(
                        "glossy roughness is {}; only ideal mirrors (roughness 0) are supported",
                        roughness
                    ),
                });
            }
            ClassifiedMaterial {
                normal: textures.intern_pair(FLAT_NORMAL),
                emissive: textures.intern_triple(NO_EMISSION),
                variant: MaterialVariant::PerfectMirror,
            }
        }
        ShaderNodeKind::GlassBsdf => {
            let ior = slots.float(inputs::IOR, DEFAULT_IOR)?;
            ClassifiedMaterial {
                normal: textures.intern_pair(FLAT_NORMAL),
                emissive: textures.intern_triple(NO_EMISSION),
                variant: MaterialVariant::Glass { ior },
            }
        }
        ShaderNodeKind::DiffuseBsdf => {
            let color = slots.rgb(inputs::COLOR, DEFAULT_COLOR)?;
            let variant = MaterialVariant::Lambert {
                color: textures.intern_triple(color),
            };
            ClassifiedMaterial {
                normal: textures.intern_pair(FLAT_NORMAL),
                emissive: textures.intern_triple(NO_EMISSION),
                variant,
            }
        }
        ShaderNodeKind::MaterialOutput | ShaderNodeKind::Other(_) => {
            return Err(FormatError::UnsupportedMaterial {
                material: material.name.clone(),
                node: surface.kind.name().to_string(),
            })
        }
    };

    // Custom normals are not supported; a flat normal is written instead.
    slots.require_unlinked(inputs::NORMAL)?;

    log::debug!(
        "Classified material '{}' as {:?}",
        material.name,
        classified.variant.kind()
    );
    Ok(classified)
}

/// Finds the node feeding the single material output's surface slot.
fn resolve_surface(material: &Material) -> Result<&ShaderNode, FormatError> {
    let unsupported = |reason: String| FormatError::UnsupportedGraph {
        material: material.name.clone(),
        reason,
    };

    let outputs: Vec<_> = material.graph.output_nodes().collect();
    let output = match outputs.as_slice() {
        [] => return Err(unsupported("no material output node".to_string())),
        [(_, output)] => *output,
        many => {
            return Err(unsupported(format!(
                "{} material output nodes, expected exactly one",
                many.len()
            )))
        }
    };

    let surface_id = match output.input(inputs::SURFACE).map(|input| &input.source) {
        Some(InputSource::Link(id)) => *id,
        _ => return Err(unsupported("material output has no surface link".to_string())),
    };

    material
        .graph
        .node(surface_id)
        .ok_or_else(|| unsupported(format!("surface link points at missing node {}", surface_id)))
}

/// Typed access to the constant inputs of one surface node.
struct SurfaceInputs<'a> {
    material: &'a Material,
    node: &'a ShaderNode,
}

impl SurfaceInputs<'_> {
    /// The constant held by `name`, or `None` when the slot is absent.
    fn constant(&self, name: &str) -> Result<Option<ShaderValue>, FormatError> {
        match self.node.input(name).map(|input| &input.source) {
            None => Ok(None),
            Some(InputSource::Constant(value)) => Ok(Some(*value)),
            Some(InputSource::Link(_)) => Err(FormatError::LinkedInputUnsupported {
                material: self.material.name.clone(),
                input: name.to_string(),
            }),
        }
    }

    fn require_unlinked(&self, name: &str) -> Result<(), FormatError> {
        self.constant(name).map(|_| ())
    }

    fn float(&self, name: &str, default: f32) -> Result<f32, FormatError> {
        match self.constant(name)? {
            None => Ok(default),
            Some(value) => value.as_float().ok_or_else(|| self.invalid_type(name, "float")),
        }
    }

    fn rgb(&self, name: &str, default: [f32; 3]) -> Result<[f32; 3], FormatError> {
        match self.constant(name)? {
            None => Ok(default),
            Some(value) => value.as_rgb().ok_or_else(|| self.invalid_type(name, "colour")),
        }
    }

    fn invalid_type(&self, name: &str, expected: &'static str) -> FormatError {
        FormatError::InvalidInputType {
            material: self.material.name.clone(),
            input: name.to_string(),
            expected,
        }
    }
}
