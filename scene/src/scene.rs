use cgmath::Matrix4;

use crate::camera::{Camera, CameraId, RenderSettings};
use crate::instance::{Instance, InstanceId};
use crate::material::{Material, MaterialId};
use crate::mesh::{Mesh, MeshId};

/// A read-only snapshot of the host scene handed to the exporter.
///
/// Meshes, materials and cameras live in flat tables indexed by their ids.
/// Instances reference meshes and materials by id, so two instances can share
/// one mesh.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub instances: Vec<Instance>,
    pub cameras: Vec<Camera>,
    pub render: RenderSettings,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        (self.meshes.len() - 1) as MeshId
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        (self.materials.len() - 1) as MaterialId
    }

    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        self.cameras.push(camera);
        (self.cameras.len() - 1) as CameraId
    }

    /// Adds an instance at the origin.
    pub fn add_instance(&mut self, mesh: MeshId, material: MaterialId) -> InstanceId {
        self.add_instance_with_transform(mesh, material, Matrix4::from_scale(1.0))
    }

    pub fn add_instance_with_transform(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        transform: Matrix4<f32>,
    ) -> InstanceId {
        let id = self.instances.len() as InstanceId;
        let mut instance = Instance::new(id, mesh, material);
        instance.transform = transform;
        self.instances.push(instance);
        id
    }

    pub fn get_mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id as usize)
    }

    pub fn get_material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id as usize)
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
