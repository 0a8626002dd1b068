use std::mem;
use std::path::Path;

use bytemuck::cast_slice;
use nalgebra::{Point3, Reflection3, Unit, Vector3, Vector4};
use rayon::prelude::*;
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::candela::ray::Ray;
use crate::candela::scene::Scene;
use crate::util::{pack_rgba, random_vec};

pub mod ray;
pub mod sampler;
pub mod scene;
pub mod texture;

/// How the per-pixel work is fanned out. Both modes produce bit-identical
/// buffers because the sampler is seeded from pixel coordinates, never from
/// execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    Parallel,
    Sequential,
}

/// Bounce-direction strategy. `Diffuse` is the canonical seeded
/// scatter-plus-emission integrator; `Reflective` is the earlier
/// mirror-with-perturbation model kept as an alternate, and draws its jitter
/// from the thread RNG, so it carries no determinism guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScatterMode {
    Diffuse,
    Reflective,
}

#[derive(Clone, Copy)]
pub struct Settings {
    pub accumulate: bool,
    pub dispatch: DispatchMode,
    pub scatter: ScatterMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            dispatch: DispatchMode::Parallel,
            scatter: ScatterMode::Diffuse,
        }
    }
}

/// Result of a ray/scene intersection query. Only produced for actual hits;
/// a miss is `None` at the `trace_ray` boundary.
pub struct HitPayload {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
    pub sphere_index: usize,
}

/// Progressive path tracer. Owns the packed display buffer and the per-pixel
/// radiance sums; a frame index of 1 marks the start of a fresh accumulation
/// run.
pub struct Candela {
    pub image_data: Vec<u32>,
    accumulation: Vec<Vector4<f32>>,
    size: PhysicalSize<u32>,
    frame_index: u32,
    pub settings: Settings,
}

impl Candela {
    const BOUNCES: u32 = 5;
    /// Re-origin offset along the surface normal so the next segment cannot
    /// immediately hit the sphere it just left.
    const NORMAL_BIAS: f32 = 1e-4;

    pub fn new(size: PhysicalSize<u32>) -> Self {
        let pixels = (size.width * size.height) as usize;

        Self {
            image_data: vec![0; pixels],
            accumulation: vec![Vector4::zeros(); pixels],
            size,
            frame_index: 1,
            settings: Settings::default(),
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Number of samples the current accumulation run has summed, counting
    /// the one in flight.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Reallocates both buffers for the new resolution and restarts
    /// accumulation. Zero dimensions are rejected and a same-size call leaves
    /// everything untouched.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if self.size == new_size {
            return;
        }

        let pixels = (new_size.width * new_size.height) as usize;
        self.size = new_size;
        self.image_data = vec![0; pixels];
        self.accumulation = vec![Vector4::zeros(); pixels];
        self.frame_index = 1;
    }

    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    /// Traces one sample for every pixel and folds it into the accumulation
    /// buffer. The scene and camera are read-only for the whole call; edits
    /// must happen between frames.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) {
        if self.image_data.is_empty() {
            return;
        }
        debug_assert_eq!(
            camera.rays.len(),
            self.image_data.len(),
            "camera ray buffer out of sync with render resolution"
        );

        if self.frame_index == 1 {
            self.accumulation.fill(Vector4::zeros());
        }

        let width = self.size.width as usize;
        let mut image_data = mem::take(&mut self.image_data);
        let mut accumulation = mem::take(&mut self.accumulation);

        {
            let renderer = &*self;
            // Row chunks partition both buffers, so every pixel task owns a
            // disjoint accumulation slot and display slot. No locks.
            match renderer.settings.dispatch {
                DispatchMode::Parallel => {
                    image_data
                        .par_chunks_mut(width)
                        .zip(accumulation.par_chunks_mut(width))
                        .enumerate()
                        .for_each(|(y, (pixel_row, slot_row))| {
                            pixel_row
                                .par_iter_mut()
                                .zip(slot_row.par_iter_mut())
                                .enumerate()
                                .for_each(|(x, (pixel, slot))| {
                                    *pixel =
                                        renderer.shade(scene, camera, x as u32, y as u32, slot);
                                });
                        });
                }
                DispatchMode::Sequential => {
                    for (y, (pixel_row, slot_row)) in image_data
                        .chunks_mut(width)
                        .zip(accumulation.chunks_mut(width))
                        .enumerate()
                    {
                        for (x, (pixel, slot)) in
                            pixel_row.iter_mut().zip(slot_row.iter_mut()).enumerate()
                        {
                            *pixel = renderer.shade(scene, camera, x as u32, y as u32, slot);
                        }
                    }
                }
            }
        }

        self.image_data = image_data;
        self.accumulation = accumulation;

        self.frame_index = if self.settings.accumulate {
            self.frame_index + 1
        } else {
            1
        };
    }

    fn shade(
        &self,
        scene: &Scene,
        camera: &Camera,
        x: u32,
        y: u32,
        slot: &mut Vector4<f32>,
    ) -> u32 {
        *slot += self.per_pixel(scene, camera, x, y);

        let average = (*slot / self.frame_index as f32).map(|channel| channel.clamp(0.0, 1.0));
        pack_rgba(&average)
    }

    /// Raygen: estimates the radiance arriving at one pixel for the current
    /// sample.
    pub fn per_pixel(&self, scene: &Scene, camera: &Camera, x: u32, y: u32) -> Vector4<f32> {
        let index = (y * self.size.width + x) as usize;
        let mut ray = Ray {
            origin: camera.position,
            direction: camera.rays[index],
        };

        let mut light = Vector3::zeros();
        let mut contribution = Vector3::repeat(1.0);
        let mut seed = (index as u32).wrapping_mul(self.frame_index);

        for bounce in 0..Self::BOUNCES {
            seed = seed.wrapping_add(bounce);

            let Some(payload) = Self::trace_ray(&ray, scene) else {
                let sky = Vector3::new(0.6, 0.7, 0.9);
                light += sky.component_mul(&contribution);
                break;
            };

            let sphere = &scene.spheres[payload.sphere_index];
            debug_assert!(
                sphere.material_index < scene.materials.len(),
                "sphere references a missing material"
            );
            let material = &scene.materials[sphere.material_index];

            ray.origin = payload.position + payload.normal.as_ref() * Self::NORMAL_BIAS;

            match self.settings.scatter {
                ScatterMode::Diffuse => {
                    contribution.component_mul_assign(&material.albedo);
                    // Emission is added unattenuated: emitters contribute
                    // their full radiance at the bounce that reaches them.
                    light += material.emission();

                    ray.direction = Unit::new_normalize(
                        payload.normal.as_ref() + sampler::in_unit_sphere(&mut seed),
                    );
                }
                ScatterMode::Reflective => {
                    let light_direction = Vector3::new(-1.0, -1.0, -1.0).normalize();
                    let intensity = payload.normal.dot(&-light_direction).max(0.0);
                    light += (material.albedo * intensity).component_mul(&contribution);
                    contribution *= 0.5;

                    let reflection_axis = Unit::new_normalize(
                        payload.normal.as_ref() + material.roughness * random_vec(-0.5..0.5),
                    );
                    Reflection3::new(reflection_axis, 0.0)
                        .reflect(ray.direction.as_mut_unchecked());
                }
            }
        }

        Vector4::new(light.x, light.y, light.z, 1.0)
    }

    /// Nearest positive-distance sphere hit, or `None` when the ray escapes
    /// the scene. Linear scan; the scenes this renderer targets hold tens of
    /// spheres.
    pub fn trace_ray(ray: &Ray, scene: &Scene) -> Option<HitPayload> {
        let mut closest: Option<(usize, f32)> = None;

        for (index, sphere) in scene.spheres.iter().enumerate() {
            // Solve |origin + t * direction|^2 = radius^2 with the origin
            // shifted into sphere-local space.
            let origin = ray.origin - sphere.position;

            let a = ray.direction.magnitude_squared();
            let b = 2.0 * origin.dot(&ray.direction);
            let c = origin.magnitude_squared() - sphere.radius * sphere.radius;

            let discriminant = b * b - 4.0 * a * c;
            if discriminant < 0.0 {
                continue;
            }

            // Smaller root only; the far side of a sphere is never the
            // closest visible surface.
            let distance = (-b - discriminant.sqrt()) / (2.0 * a);
            if distance <= 0.0 {
                continue;
            }

            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((index, distance));
            }
        }

        closest.map(|(index, distance)| Self::closest_hit(ray, scene, index, distance))
    }

    fn closest_hit(ray: &Ray, scene: &Scene, sphere_index: usize, distance: f32) -> HitPayload {
        let sphere = &scene.spheres[sphere_index];

        let origin = ray.origin - sphere.position;
        let local_hit = origin + ray.direction.as_ref() * distance;
        // The local-space hit vector is the outward normal of a sphere
        // centered at the local origin.
        let normal = Unit::new_normalize(local_hit);

        HitPayload {
            distance,
            position: sphere.position + local_hit,
            normal,
            sphere_index,
        }
    }

    /// Writes the displayed buffer to `path` as a PNG, flipped to match the
    /// on-screen orientation.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        let bytes: &[u8] = cast_slice(&self.image_data);
        let row = self.size.width as usize * 4;
        let mut flipped = Vec::with_capacity(bytes.len());
        for chunk in bytes.chunks(row).rev() {
            flipped.extend_from_slice(chunk);
        }

        image::save_buffer(
            path,
            &flipped,
            self.size.width,
            self.size.height,
            image::ColorType::Rgba8,
        )
    }
}
