use nalgebra::{Point3, Vector3};

/// Editable scene contents. Spheres refer to materials by index into
/// `materials`; every `material_index` must stay in bounds, which the editing
/// UI enforces by clamping.
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    /// Starting scene: a matte sphere, a large ground sphere and an emissive
    /// sphere next to them.
    pub fn demo() -> Self {
        let materials = vec![
            Material {
                albedo: Vector3::new(1.0, 0.0, 1.0),
                roughness: 0.0,
                ..Default::default()
            },
            Material {
                albedo: Vector3::new(0.2, 0.3, 1.0),
                roughness: 0.1,
                ..Default::default()
            },
            Material {
                albedo: Vector3::new(0.8, 0.5, 0.2),
                emission_color: Vector3::new(0.8, 0.5, 0.2),
                emission_power: 2.0,
                ..Default::default()
            },
        ];

        let spheres = vec![
            Sphere {
                position: Point3::new(0.0, 0.0, 0.0),
                radius: 1.0,
                material_index: 0,
            },
            Sphere {
                position: Point3::new(0.0, -101.0, 0.0),
                radius: 100.0,
                material_index: 1,
            },
            Sphere {
                position: Point3::new(2.0, 0.0, 0.0),
                radius: 1.0,
                material_index: 2,
            },
        ];

        Self { spheres, materials }
    }
}

#[derive(Clone, Copy)]
pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 1.0,
            material_index: 0,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Material {
    pub albedo: Vector3<f32>,
    /// Only read by the reflective scatter mode.
    pub roughness: f32,
    /// Reserved.
    pub metallic: f32,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_material_indices_are_valid() {
        let scene = Scene::demo();
        for sphere in &scene.spheres {
            assert!(sphere.material_index < scene.materials.len());
        }
    }

    #[test]
    fn emission_scales_color_by_power() {
        let material = Material {
            emission_color: Vector3::new(0.5, 0.25, 1.0),
            emission_power: 2.0,
            ..Default::default()
        };
        assert_eq!(material.emission(), Vector3::new(1.0, 0.5, 2.0));

        let dark = Material::default();
        assert_eq!(dark.emission(), Vector3::zeros());
    }
}
