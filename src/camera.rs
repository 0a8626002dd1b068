use std::ops::Add;

use nalgebra::{
    Matrix4, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3, Vector4,
};
use rayon::prelude::*;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};

/// Fly camera. Owns the flattened per-pixel ray-direction buffer the renderer
/// indexes with `x + y * width`; it is rebuilt whenever the view, projection
/// or resolution changes.
pub struct Camera {
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    inverse_projection: Matrix4<f32>,
    inverse_view: Matrix4<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    pub position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    pub rays: Vec<Unit<Vector3<f32>>>,
    last_mouse: PhysicalPosition<f64>,

    viewport_size: PhysicalSize<u32>,

    // W A S D Space LShift
    inputs: [bool; 6],
    pub grab_mouse: bool,
}

impl Camera {
    pub fn new(vertical_fov: f32, near: f32, far: f32, viewport_size: PhysicalSize<u32>) -> Self {
        let aspect = viewport_size.width as f32 / viewport_size.height as f32;
        let projection =
            Perspective3::new(aspect, vertical_fov.to_radians(), near, far).to_homogeneous();

        let position = Point3::new(0.0, 0.0, 6.0);
        let forward = -Vector3::z_axis();
        let view = Matrix4::look_at_rh(
            &position,
            &position.add(forward.into_inner()),
            &Vector3::y_axis(),
        );

        let inverse_projection = projection.try_inverse().unwrap();
        let inverse_view = view.try_inverse().unwrap();

        let mut camera = Self {
            projection,
            view,
            inverse_projection,
            inverse_view,
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            last_mouse: Default::default(),
            viewport_size,
            inputs: [false; 6],
            grab_mouse: false,
        };
        camera.reevaluate_rays();

        camera
    }

    /// Returns true when the event changed the view, which invalidates any
    /// accumulated frames.
    pub fn input(&mut self, event: &WindowEvent, is_hovering_ui: bool) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let delta = Vector2::new(
                    (position.x - self.last_mouse.x) as f32,
                    (position.y - self.last_mouse.y) as f32,
                ) * 0.002;
                self.last_mouse = *position;

                if !self.grab_mouse || is_hovering_ui {
                    return false;
                }

                let up: Unit<Vector3<f32>> = Vector3::y_axis();
                let right = Unit::new_normalize(up.cross(&self.forward));

                let pitch_delta = delta.y * self.rotation_speed();
                let yaw_delta = delta.x * self.rotation_speed();

                let rotation = UnitQuaternion::from_axis_angle(&right, pitch_delta)
                    * UnitQuaternion::from_axis_angle(&up, yaw_delta);
                self.forward = rotation * self.forward;
                self.forward.renormalize_fast();

                self.reevaluate_view();
                self.reevaluate_rays();

                true
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                let is_press = matches!(state, ElementState::Pressed);
                match key {
                    VirtualKeyCode::W => self.inputs[0] = is_press,
                    VirtualKeyCode::A => self.inputs[1] = is_press,
                    VirtualKeyCode::S => self.inputs[2] = is_press,
                    VirtualKeyCode::D => self.inputs[3] = is_press,
                    VirtualKeyCode::Space => self.inputs[4] = is_press,
                    VirtualKeyCode::LShift => self.inputs[5] = is_press,
                    VirtualKeyCode::C if is_press => {
                        self.grab_mouse = !self.grab_mouse;
                    }
                    _ => return false,
                }

                // Key state alone does not move the camera until update().
                false
            }
            _ => false,
        }
    }

    /// Applies held movement keys. Returns true when the camera moved.
    pub fn update(&mut self, frame_time_ms: u128) -> bool {
        let time_step = ((frame_time_ms as f32) / 1000.0).min(1.0 / 60.0);

        let up: Unit<Vector3<f32>> = Vector3::y_axis();
        let right = up.cross(&self.forward);
        let step = self.movement_speed() * time_step;
        let mut moved = false;

        if self.inputs[0] {
            self.position += self.forward.scale(step);
            moved = true;
        }
        if self.inputs[1] {
            self.position -= right.scale(step);
            moved = true;
        }
        if self.inputs[2] {
            self.position -= self.forward.scale(step);
            moved = true;
        }
        if self.inputs[3] {
            self.position += right.scale(step);
            moved = true;
        }
        if self.inputs[4] {
            self.position += up.scale(step);
            moved = true;
        }
        if self.inputs[5] {
            self.position -= up.scale(step);
            moved = true;
        }

        if moved {
            self.reevaluate_view();
            self.reevaluate_rays();
        }

        moved
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || new_size == self.viewport_size {
            return;
        }

        self.viewport_size = new_size;
        self.reevaluate_projection();
        self.reevaluate_rays();
    }

    pub fn rotation_speed(&self) -> f32 {
        0.7
    }

    pub fn movement_speed(&self) -> f32 {
        5.0
    }

    fn reevaluate_projection(&mut self) {
        let aspect = self.viewport_size.width as f32 / self.viewport_size.height as f32;
        self.projection =
            Perspective3::new(aspect, self.vertical_fov.to_radians(), self.near, self.far)
                .to_homogeneous();
        self.inverse_projection = self.projection.try_inverse().unwrap();
    }

    fn reevaluate_view(&mut self) {
        let target = self.position.add(self.forward.into_inner());
        self.view = Matrix4::look_at_rh(&self.position, &target, &Vector3::y_axis());
        self.inverse_view = self.view.try_inverse().unwrap();
    }

    fn reevaluate_rays(&mut self) {
        let width = self.viewport_size.width;
        let height = self.viewport_size.height;

        self.rays = (0..width * height)
            .into_par_iter()
            .map(|index| {
                let x = index % width;
                let y = index / width;

                let coord = Vector2::new(
                    x as f32 / width as f32,
                    y as f32 / height as f32,
                ) * 2.0
                    - Vector2::new(1.0, 1.0);

                // Unproject the pixel onto the far plane, then rotate the
                // view-space direction back into the world.
                let mut target =
                    self.inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);
                target /= target.w;

                let mut direction = target;
                direction.w = 0.0;
                direction = direction.normalize();

                Unit::new_normalize((self.inverse_view * direction).xyz())
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_buffer_matches_resolution() {
        let camera = Camera::new(45.0, 0.1, 100.0, PhysicalSize::new(16, 9));
        assert_eq!(camera.rays.len(), 16 * 9);
    }

    #[test]
    fn center_ray_points_down_the_forward_axis() {
        // Odd resolution puts a pixel column/row through the view center.
        let size = PhysicalSize::new(101, 101);
        let camera = Camera::new(45.0, 0.1, 100.0, size);

        let center = camera.rays[(50 * size.width + 50) as usize];
        assert!(center.z < -0.99, "expected a -z ray, got {center:?}");
    }

    #[test]
    fn resize_to_same_or_zero_size_keeps_rays() {
        let size = PhysicalSize::new(8, 8);
        let mut camera = Camera::new(45.0, 0.1, 100.0, size);

        camera.resize(size);
        assert_eq!(camera.rays.len(), 64);

        camera.resize(PhysicalSize::new(0, 8));
        assert_eq!(camera.rays.len(), 64);

        camera.resize(PhysicalSize::new(4, 4));
        assert_eq!(camera.rays.len(), 16);
    }

    #[test]
    fn all_rays_are_unit_length() {
        let camera = Camera::new(60.0, 0.1, 100.0, PhysicalSize::new(8, 4));
        for ray in &camera.rays {
            assert!((ray.magnitude() - 1.0).abs() < 1e-5);
        }
    }
}
