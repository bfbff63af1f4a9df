//! JSON scene descriptions.
//!
//! A small, host-independent way to author scenes for the exporter. The
//! converter tool reads one of these and writes an MSNE file.
//!
//! ```json
//! {
//!   "resolution": [1280, 720],
//!   "meshes": [{ "positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]] }],
//!   "materials": [{
//!     "name": "Red",
//!     "nodes": [
//!       { "kind": "principled", "inputs": { "Base Color": [0.8, 0.1, 0.1] } },
//!       { "kind": "output", "inputs": { "Surface": { "link": 0 } } }
//!     ]
//!   }],
//!   "objects": [{ "mesh": 0, "material": 0, "translation": [0, 0, -5] }],
//!   "cameras": [{ "translation": [0, 1, 5], "focal_length": 35 }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cgmath::{InnerSpace, Matrix4, Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{Camera, RenderSettings};
use crate::material::{inputs, InputSource, Material, ShaderGraph, ShaderNode, ShaderNodeKind, ShaderValue};
use crate::mesh::Mesh;
use crate::Scene;

const DEFAULT_SENSOR_HEIGHT: f32 = 24.0;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{owner} references unknown {kind} {index}")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        index: usize,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Output image size as `[width, height]`.
    #[serde(default)]
    pub resolution: Option<[u32; 2]>,
    #[serde(default)]
    pub meshes: Vec<MeshDescription>,
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default)]
    pub cameras: Vec<CameraDescription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    pub smooth: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    pub nodes: Vec<NodeDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    /// `output`, `principled`, `diffuse`, `glossy`, `glass`, or any other
    /// node type name.
    pub kind: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputDescription {
    Link { link: usize },
    Float(f32),
    /// Three components for RGB (or a vector on `Normal`), four for RGBA.
    Components(Vec<f32>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub mesh: usize,
    pub material: usize,
    /// Full transform, row-major. Takes precedence over translation/rotation/scale.
    #[serde(default)]
    pub matrix: Option<[[f32; 4]; 4]>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion as `[x, y, z, w]`.
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    /// Vertical field of view in radians. Derived from the sensor otherwise.
    #[serde(default)]
    pub vfov: Option<f32>,
    #[serde(default)]
    pub sensor_height: Option<f32>,
    #[serde(default)]
    pub focal_length: Option<f32>,
    #[serde(default)]
    pub dof: bool,
    #[serde(default)]
    pub f_stop: Option<f32>,
    #[serde(default)]
    pub focus_distance: Option<f32>,
}

impl SceneDescription {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptionError> {
        let text = fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the exporter's scene snapshot.
    pub fn into_scene(self) -> Result<Scene, DescriptionError> {
        let mut scene = Scene::new();

        if let Some([width, height]) = self.resolution {
            scene.render = RenderSettings::new(width, height);
        }

        for mesh in self.meshes {
            scene.add_mesh(build_mesh(mesh));
        }

        for material in self.materials {
            scene.add_material(build_material(material)?);
        }

        for (i, object) in self.objects.into_iter().enumerate() {
            let owner = match &object.name {
                Some(name) => format!("object '{}'", name),
                None => format!("object {}", i),
            };
            if object.mesh >= scene.meshes.len() {
                return Err(DescriptionError::UnknownReference {
                    owner,
                    kind: "mesh",
                    index: object.mesh,
                });
            }
            if object.material >= scene.materials.len() {
                return Err(DescriptionError::UnknownReference {
                    owner,
                    kind: "material",
                    index: object.material,
                });
            }

            let transform = match object.matrix {
                Some(rows) => matrix_from_rows(rows),
                None => compose_transform(object.translation, object.rotation, object.scale)?,
            };
            let id = scene.add_instance_with_transform(
                object.mesh as u32,
                object.material as u32,
                transform,
            );
            scene.instances[id as usize].name = object.name;
        }

        for camera in self.cameras {
            scene.add_camera(build_camera(camera)?);
        }

        log::debug!(
            "Built scene: {} meshes, {} materials, {} instances, {} cameras",
            scene.meshes.len(),
            scene.materials.len(),
            scene.instances.len(),
            scene.cameras.len()
        );
        Ok(scene)
    }
}

fn build_mesh(description: MeshDescription) -> Mesh {
    let mut mesh = Mesh::new(description.positions, description.triangles)
        .with_smooth_shading(description.smooth);
    mesh.name = description.name;
    mesh.normals = description.normals;
    mesh
}

fn build_material(description: MaterialDescription) -> Result<Material, DescriptionError> {
    let node_count = description.nodes.len();
    let mut graph = ShaderGraph::new();

    for node in description.nodes {
        let kind = match node.kind.as_str() {
            "output" => ShaderNodeKind::MaterialOutput,
            "principled" => ShaderNodeKind::PrincipledBsdf,
            "diffuse" => ShaderNodeKind::DiffuseBsdf,
            "glossy" => ShaderNodeKind::GlossyBsdf,
            "glass" => ShaderNodeKind::GlassBsdf,
            _ => ShaderNodeKind::Other(node.kind.clone()),
        };

        let mut shader_node = ShaderNode::new(kind);
        for (name, input) in node.inputs {
            let source = match input {
                InputDescription::Link { link } => {
                    if link >= node_count {
                        return Err(DescriptionError::UnknownReference {
                            owner: format!("material '{}' input '{}'", description.name, name),
                            kind: "node",
                            index: link,
                        });
                    }
                    InputSource::Link(link)
                }
                InputDescription::Float(value) => InputSource::Constant(ShaderValue::Float(value)),
                InputDescription::Components(values) => match values.as_slice() {
                    &[x, y, z] if name == inputs::NORMAL => {
                        InputSource::Constant(ShaderValue::Vector([x, y, z]))
                    }
                    &[r, g, b] => InputSource::Constant(ShaderValue::Rgb([r, g, b])),
                    &[r, g, b, a] => InputSource::Constant(ShaderValue::Rgba([r, g, b, a])),
                    _ => {
                        return Err(DescriptionError::InvalidValue(format!(
                            "material '{}' input '{}' has {} components, expected 3 or 4",
                            description.name,
                            name,
                            values.len()
                        )))
                    }
                },
            };
            shader_node.set_input(&name, source);
        }
        graph.add_node(shader_node);
    }

    Ok(Material::new(description.name, graph))
}

fn build_camera(description: CameraDescription) -> Result<Camera, DescriptionError> {
    let defaults = Camera::default();
    let focal_length = description.focal_length.unwrap_or(defaults.focal_length);
    if focal_length <= 0.0 {
        return Err(DescriptionError::InvalidValue(format!(
            "camera focal length must be positive, got {}",
            focal_length
        )));
    }

    let vfov = description.vfov.unwrap_or_else(|| {
        Camera::vfov_from_sensor(
            description.sensor_height.unwrap_or(DEFAULT_SENSOR_HEIGHT),
            focal_length,
        )
    });
    let transform = compose_transform(description.translation, description.rotation, None)?;

    let mut camera = Camera::new(transform, vfov);
    camera.name = description.name;
    camera.focal_length = focal_length;
    camera.use_dof = description.dof;
    if let Some(f_stop) = description.f_stop {
        if f_stop <= 0.0 {
            return Err(DescriptionError::InvalidValue(format!(
                "camera f-stop must be positive, got {}",
                f_stop
            )));
        }
        camera.f_stop = f_stop;
    }
    if let Some(focus_distance) = description.focus_distance {
        camera.focus_distance = focus_distance;
    }
    Ok(camera)
}

/// Converts a row-major matrix into cgmath's column-major layout.
fn matrix_from_rows(rows: [[f32; 4]; 4]) -> Matrix4<f32> {
    let mut m = Matrix4::from_scale(1.0);
    for (row, values) in rows.iter().enumerate() {
        for (col, &value) in values.iter().enumerate() {
            m[col][row] = value;
        }
    }
    m
}

/// Translation * rotation * scale.
fn compose_transform(
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
) -> Result<Matrix4<f32>, DescriptionError> {
    let [tx, ty, tz] = translation.unwrap_or([0.0; 3]);
    let [x, y, z, w] = rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]);
    let [sx, sy, sz] = scale.unwrap_or([1.0; 3]);

    let rotation = Quaternion::new(w, x, y, z);
    if rotation.magnitude2() == 0.0 {
        return Err(DescriptionError::InvalidValue(
            "rotation quaternion has zero length".to_string(),
        ));
    }

    Ok(Matrix4::from_translation(Vector3::new(tx, ty, tz))
        * Matrix4::from(rotation.normalize())
        * Matrix4::from_nonuniform_scale(sx, sy, sz))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_SCENE: &str = r#"{
        "resolution": [640, 480],
        "meshes": [
            { "name": "Tri", "positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]] }
        ],
        "materials": [{
            "name": "Red",
            "nodes": [
                { "kind": "principled", "inputs": { "Base Color": [0.8, 0.1, 0.1], "Roughness": 0.3 } },
                { "kind": "output", "inputs": { "Surface": { "link": 0 } } }
            ]
        }],
        "objects": [
            { "name": "A", "mesh": 0, "material": 0, "translation": [1, 2, 3] }
        ],
        "cameras": [
            { "translation": [0, 0, 5], "focal_length": 50, "dof": true, "f_stop": 2.0 }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let scene = SceneDescription::from_str(TRIANGLE_SCENE)
            .unwrap()
            .into_scene()
            .unwrap();

        assert_eq!(scene.render, RenderSettings::new(640, 480));
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].name.as_deref(), Some("Tri"));
        assert!(!scene.meshes[0].is_smooth_shaded());

        let material = &scene.materials[0];
        assert_eq!(material.name, "Red");
        assert_eq!(material.graph.nodes.len(), 2);
        let surface = material.graph.node(0).unwrap();
        assert_eq!(surface.kind, ShaderNodeKind::PrincipledBsdf);
        assert_eq!(
            surface.input("Roughness").map(|i| &i.source),
            Some(&InputSource::Constant(ShaderValue::Float(0.3)))
        );

        let instance = &scene.instances[0];
        assert_eq!(instance.name.as_deref(), Some("A"));
        assert_eq!(instance.transform_rows()[3], 1.0);
        assert_eq!(instance.transform_rows()[7], 2.0);
        assert_eq!(instance.transform_rows()[11], 3.0);

        let camera = &scene.cameras[0];
        assert!(camera.use_dof);
        assert_eq!(camera.f_stop, 2.0);
        assert!((camera.vfov - Camera::vfov_from_sensor(24.0, 50.0)).abs() < 1e-6);
    }

    #[test]
    fn test_described_scene_exports() {
        let scene = SceneDescription::from_str(TRIANGLE_SCENE)
            .unwrap()
            .into_scene()
            .unwrap();
        let bytes = scene.to_msne_bytes().unwrap();
        let file = crate::format::reader::read_msne(&bytes).unwrap();

        assert_eq!(file.variants.pbr.len(), 1);
        assert_eq!(file.instances.len(), 1);
        assert_eq!(file.camera.origin, [0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_matrix_is_row_major() {
        let rows = [
            [1.0, 0.0, 0.0, 4.0],
            [0.0, 1.0, 0.0, 5.0],
            [0.0, 0.0, 1.0, 6.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = matrix_from_rows(rows);
        assert_eq!(m.w.x, 4.0);
        assert_eq!(m.w.y, 5.0);
        assert_eq!(m.w.z, 6.0);
    }

    #[test]
    fn test_unknown_mesh_reference() {
        let json = r#"{ "objects": [{ "mesh": 3, "material": 0 }] }"#;
        let result = SceneDescription::from_str(json).unwrap().into_scene();
        assert!(matches!(
            result,
            Err(DescriptionError::UnknownReference { kind: "mesh", index: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_node_link() {
        let json = r#"{ "materials": [{ "name": "M", "nodes": [
            { "kind": "output", "inputs": { "Surface": { "link": 5 } } }
        ] }] }"#;
        let result = SceneDescription::from_str(json).unwrap().into_scene();
        assert!(matches!(
            result,
            Err(DescriptionError::UnknownReference { kind: "node", index: 5, .. })
        ));
    }

    #[test]
    fn test_bad_color_arity() {
        let json = r#"{ "materials": [{ "name": "M", "nodes": [
            { "kind": "diffuse", "inputs": { "Color": [0.1, 0.2] } }
        ] }] }"#;
        let result = SceneDescription::from_str(json).unwrap().into_scene();
        assert!(matches!(result, Err(DescriptionError::InvalidValue(_))));
    }

    #[test]
    fn test_unknown_node_kind_is_preserved() {
        let json = r#"{ "materials": [{ "name": "M", "nodes": [
            { "kind": "Emission" }
        ] }] }"#;
        let scene = SceneDescription::from_str(json).unwrap().into_scene().unwrap();
        assert_eq!(
            scene.materials[0].graph.nodes[0].kind,
            ShaderNodeKind::Other("Emission".to_string())
        );
    }

    #[test]
    fn test_normal_slot_is_a_vector() {
        let json = r#"{ "materials": [{ "name": "M", "nodes": [
            { "kind": "diffuse", "inputs": { "Color": [0.1, 0.2, 0.3], "Normal": [0, 0, 1] } }
        ] }] }"#;
        let scene = SceneDescription::from_str(json).unwrap().into_scene().unwrap();
        let node = &scene.materials[0].graph.nodes[0];

        assert_eq!(
            node.input(inputs::NORMAL).map(|i| &i.source),
            Some(&InputSource::Constant(ShaderValue::Vector([0.0, 0.0, 1.0])))
        );
        assert_eq!(
            node.input(inputs::COLOR).map(|i| &i.source),
            Some(&InputSource::Constant(ShaderValue::Rgb([0.1, 0.2, 0.3])))
        );
    }

    #[test]
    fn test_constant_normal_still_exports() {
        let json = r#"{
            "meshes": [{ "positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]] }],
            "materials": [{ "name": "M", "nodes": [
                { "kind": "diffuse", "inputs": { "Normal": [0, 0, 1] } },
                { "kind": "output", "inputs": { "Surface": { "link": 0 } } }
            ] }],
            "objects": [{ "mesh": 0, "material": 0 }],
            "cameras": [{}]
        }"#;
        let scene = SceneDescription::from_str(json).unwrap().into_scene().unwrap();
        assert!(scene.to_msne_bytes().is_ok());
    }

    #[test]
    fn test_non_positive_f_stop_rejected() {
        let json = r#"{ "cameras": [{ "dof": true, "f_stop": 0 }] }"#;
        let result = SceneDescription::from_str(json).unwrap().into_scene();
        assert!(matches!(result, Err(DescriptionError::InvalidValue(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SceneDescription::from_str("{ not json"),
            Err(DescriptionError::Json(_))
        ));
    }
}
