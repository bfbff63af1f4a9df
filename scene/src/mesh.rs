/// Unique identifier for meshes.
///
/// Mesh IDs are assigned sequentially by the Scene starting from 0.
pub type MeshId = u32;

/// A triangle as three indices into the mesh's vertex buffer.
pub type Triangle = [u32; 3];

/// Triangulated mesh geometry as supplied by the host.
///
/// Polygon triangulation happens upstream; the mesh only carries a flat
/// triangle list, vertex positions and optionally one normal per vertex.
/// Shading smoothness is tracked per face so the encoder can apply its
/// representative-face policy (see [`Mesh::is_smooth_shaded`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub triangles: Vec<Triangle>,
    pub positions: Vec<[f32; 3]>,
    /// Vertex-indexed normals. Must have the same length as `positions`.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Smooth-shading flag per source face.
    pub smooth_faces: Vec<bool>,
}

impl Mesh {
    /// Creates a flat-shaded mesh without normals.
    pub fn new(positions: Vec<[f32; 3]>, triangles: Vec<Triangle>) -> Self {
        Self {
            name: None,
            triangles,
            positions,
            normals: None,
            smooth_faces: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Marks every triangle as a smooth or flat face.
    pub fn with_smooth_shading(mut self, smooth: bool) -> Self {
        self.smooth_faces = vec![smooth; self.triangles.len()];
        self
    }

    pub fn with_smooth_faces(mut self, smooth_faces: Vec<bool>) -> Self {
        self.smooth_faces = smooth_faces;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh is treated as smooth shaded.
    ///
    /// Only the first face is inspected and its flag is applied to the whole
    /// mesh. Mixed flat/smooth meshes are therefore approximated.
    pub fn is_smooth_shaded(&self) -> bool {
        self.smooth_faces.first().copied().unwrap_or(false)
    }

    /// Returns a human readable label for error messages and logs.
    pub fn label(&self, id: MeshId) -> String {
        match &self.name {
            Some(name) => format!("'{}'", name),
            None => format!("#{}", id),
        }
    }

    /// Checks the structural invariants the encoder relies on.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    self.positions.len()
                ));
            }
        }

        let vertex_count = self.positions.len() as u64;
        for (i, triangle) in self.triangles.iter().enumerate() {
            if let Some(&index) = triangle.iter().find(|&&idx| idx as u64 >= vertex_count) {
                return Err(format!(
                    "triangle {} references vertex {} but mesh has {} vertices",
                    i, index, vertex_count
                ));
            }
        }

        Ok(())
    }

    /// A single axis-aligned unit quad in the XY plane, facing +Z.
    pub fn quad(size: f32) -> Self {
        let h = size / 2.0;
        Mesh::new(
            vec![[-h, -h, 0.0], [h, -h, 0.0], [h, h, 0.0], [-h, h, 0.0]],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .with_normals(vec![[0.0, 0.0, 1.0]; 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_mesh_is_flat() {
        let mesh = Mesh::quad(1.0);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.is_smooth_shaded());
    }

    #[test]
    fn test_representative_face_decides_shading() {
        let smooth_first = Mesh::quad(1.0).with_smooth_faces(vec![true, false]);
        assert!(smooth_first.is_smooth_shaded());

        let flat_first = Mesh::quad(1.0).with_smooth_faces(vec![false, true]);
        assert!(!flat_first.is_smooth_shaded());
    }

    #[test]
    fn test_empty_mesh_is_not_smooth() {
        let mesh = Mesh::new(Vec::new(), Vec::new()).with_smooth_shading(true);
        assert!(!mesh.is_smooth_shaded());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_normals_length() {
        let mesh = Mesh::quad(1.0).with_normals(vec![[0.0, 0.0, 1.0]; 3]);
        let err = mesh.validate().unwrap_err();
        assert!(err.contains("3 normals for 4 vertices"));
    }

    #[test]
    fn test_validate_out_of_range_index() {
        let mesh = Mesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 3]]);
        let err = mesh.validate().unwrap_err();
        assert!(err.contains("vertex 3"));
    }

    #[test]
    fn test_label() {
        assert_eq!(Mesh::quad(1.0).label(4), "#4");
        assert_eq!(Mesh::quad(1.0).with_name("floor").label(4), "'floor'");
    }
}
