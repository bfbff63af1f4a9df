//! Scene snapshot and MSNE exporter for the Moonshine offline renderer.

pub mod camera;
pub mod description;
pub mod format;
pub mod instance;
pub mod material;
pub mod mesh;
mod scene;

pub use camera::{Camera, Lens, RenderSettings};
pub use description::{DescriptionError, SceneDescription};
pub use format::reader::{read_msne, MsneFile};
pub use format::{FormatError, VariantKind};
pub use instance::Instance;
pub use material::{Material, ShaderGraph, ShaderNode, ShaderNodeKind, ShaderValue};
pub use mesh::Mesh;
pub use scene::Scene;
