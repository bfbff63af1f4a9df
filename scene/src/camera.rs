use cgmath::{EuclideanSpace, InnerSpace, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector3};

/// Unique identifier for cameras.
pub type CameraId = u32;

/// Render output settings the exported lens depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl RenderSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Output aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// A scene camera as configured in the host.
///
/// The camera looks down its local -Z axis with +Y up. Lens settings use
/// the host's units: focal length in millimeters, focus distance in scene
/// units.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    /// Camera-to-world transform.
    pub transform: Matrix4<f32>,
    /// Vertical field of view in radians.
    pub vfov: f32,
    /// Whether depth of field is enabled.
    pub use_dof: bool,
    /// Focal length in millimeters.
    pub focal_length: f32,
    /// Aperture f-number.
    pub f_stop: f32,
    /// Distance to the focal plane in scene units.
    pub focus_distance: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: None,
            transform: Matrix4::identity(),
            vfov: Self::vfov_from_sensor(24.0, 50.0),
            use_dof: false,
            focal_length: 50.0,
            f_stop: 2.8,
            focus_distance: 10.0,
        }
    }
}

impl Camera {
    pub fn new(transform: Matrix4<f32>, vfov: f32) -> Self {
        Self {
            transform,
            vfov,
            ..Default::default()
        }
    }

    /// Enables depth of field with the given lens settings.
    pub fn with_depth_of_field(mut self, focal_length: f32, f_stop: f32, focus_distance: f32) -> Self {
        self.use_dof = true;
        self.focal_length = focal_length;
        self.f_stop = f_stop;
        self.focus_distance = focus_distance;
        self
    }

    /// Vertical field of view (radians) of a sensor of the given height behind
    /// a lens of the given focal length. Both in millimeters.
    pub fn vfov_from_sensor(sensor_height: f32, focal_length: f32) -> f32 {
        2.0 * (sensor_height / (2.0 * focal_length)).atan()
    }

    /// Thin-lens aperture radius in scene units, or 0 when depth of field is off.
    ///
    /// `focal_length / f_stop` is the aperture diameter in millimeters.
    pub fn aperture_radius(&self) -> f32 {
        if self.use_dof {
            self.focal_length / (2.0 * 1000.0 * self.f_stop)
        } else {
            0.0
        }
    }

    /// Rotation part of the transform with any scale removed.
    fn rotation(&self) -> Matrix3<f32> {
        let m = &self.transform;
        let basis = [m.x.truncate(), m.y.truncate(), m.z.truncate()];
        let [x, y, z] = basis.map(|axis| {
            if axis.magnitude2() > 0.0 {
                axis.normalize()
            } else {
                axis
            }
        });
        Matrix3::from_cols(x, y, z)
    }

    /// Derives the physically-parameterized lens written to scene files.
    pub fn lens(&self, render: &RenderSettings) -> Lens {
        let rotation = self.rotation();
        Lens {
            origin: self.transform.transform_point(Point3::origin()),
            forward: rotation * -Vector3::unit_z(),
            up: rotation * Vector3::unit_y(),
            vfov: self.vfov,
            aspect: render.aspect(),
            aperture: self.aperture_radius(),
            focus_distance: self.focus_distance,
        }
    }
}

/// World-space pinhole/thin-lens camera record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    pub origin: Point3<f32>,
    pub forward: Vector3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians.
    pub vfov: f32,
    pub aspect: f32,
    /// Aperture radius in scene units.
    pub aperture: f32,
    pub focus_distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Quaternion, Rotation3};

    const EPSILON: f32 = 1e-5;

    fn assert_vec_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < EPSILON, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_identity_camera_lens() {
        let camera = Camera::default();
        let lens = camera.lens(&RenderSettings::new(1920, 1080));

        assert_eq!(lens.origin, Point3::new(0.0, 0.0, 0.0));
        assert_vec_eq(lens.forward, Vector3::new(0.0, 0.0, -1.0));
        assert_vec_eq(lens.up, Vector3::new(0.0, 1.0, 0.0));
        assert!((lens.aspect - 1920.0 / 1080.0).abs() < EPSILON);
        assert_eq!(lens.aperture, 0.0);
        assert_eq!(lens.focus_distance, 10.0);
    }

    #[test]
    fn test_translated_rotated_camera() {
        let rotation = Quaternion::from_angle_y(Deg(90.0));
        let transform = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from(rotation);
        let lens = Camera::new(transform, 0.8).lens(&RenderSettings::default());

        assert!((lens.origin - Point3::new(1.0, 2.0, 3.0)).magnitude() < EPSILON);
        // Rotating -Z by 90 degrees about +Y yields -X.
        assert_vec_eq(lens.forward, Vector3::new(-1.0, 0.0, 0.0));
        assert_vec_eq(lens.up, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(lens.vfov, 0.8);
    }

    #[test]
    fn test_scale_does_not_affect_directions() {
        let transform = Matrix4::from_nonuniform_scale(2.0, 3.0, 4.0);
        let lens = Camera::new(transform, 0.5).lens(&RenderSettings::default());

        assert_vec_eq(lens.forward, Vector3::new(0.0, 0.0, -1.0));
        assert_vec_eq(lens.up, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_aperture_radius_from_lens_settings() {
        let camera = Camera::default().with_depth_of_field(50.0, 2.0, 4.0);
        // 50mm / f2 = 25mm diameter = 0.0125m radius
        assert!((camera.aperture_radius() - 0.0125).abs() < EPSILON);

        let lens = camera.lens(&RenderSettings::default());
        assert_eq!(lens.focus_distance, 4.0);
    }

    #[test]
    fn test_aperture_zero_without_dof() {
        let mut camera = Camera::default().with_depth_of_field(50.0, 2.0, 4.0);
        camera.use_dof = false;
        assert_eq!(camera.aperture_radius(), 0.0);
    }

    #[test]
    fn test_vfov_from_sensor() {
        // 24mm sensor behind a 12mm lens: 2 * atan(1) = 90 degrees.
        let vfov = Camera::vfov_from_sensor(24.0, 12.0);
        assert!((vfov - std::f32::consts::FRAC_PI_2).abs() < EPSILON);
    }
}
