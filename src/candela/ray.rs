use nalgebra::{Point3, Unit, Vector3};

#[derive(Clone)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    /// Point reached after travelling `distance` along the ray.
    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction.as_ref() * distance
    }
}
