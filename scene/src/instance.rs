use cgmath::{Matrix4, SquareMatrix};

use super::material::MaterialId;
use super::mesh::MeshId;

/// Unique identifier for a mesh instance
pub type InstanceId = u32;

/// A mesh-bearing object: one placement of a mesh with a material.
///
/// Instances are flat; `transform` is already the world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: InstanceId,
    pub name: Option<String>,
    pub mesh: MeshId,
    pub material: MaterialId,
    pub transform: Matrix4<f32>,
}

impl Instance {
    /// Creates a new instance referencing the given mesh and material at the origin.
    pub fn new(id: InstanceId, mesh: MeshId, material: MaterialId) -> Self {
        Self {
            id,
            name: None,
            mesh,
            material,
            transform: Matrix4::identity(),
        }
    }

    /// The top three rows of the world transform, row-major, translation last.
    pub fn transform_rows(&self) -> [f32; 12] {
        transform_rows(&self.transform)
    }
}

/// Flattens an affine transform into its top 3 rows (row-major).
///
/// The omitted 4th row is (0, 0, 0, 1) for affine transforms.
pub fn transform_rows(m: &Matrix4<f32>) -> [f32; 12] {
    // cgmath matrices are column-major: m[col][row]
    let mut rows = [0.0; 12];
    for row in 0..3 {
        for col in 0..4 {
            rows[row * 4 + col] = m[col][row];
        }
    }
    rows
}
