//! End-to-end properties of the public renderer API: execution-order
//! independence of the dispatch modes, and sample accumulation across frames.

use candela::camera::Camera;
use candela::candela::scene::Scene;
use candela::candela::{Candela, DispatchMode};
use nalgebra::Point3;
use winit::dpi::PhysicalSize;

fn demo_camera(size: PhysicalSize<u32>) -> Camera {
    let mut camera = Camera::new(45.0, 0.1, 100.0, size);
    camera.position = Point3::new(0.0, 0.0, 6.0);
    camera
}

#[test]
fn dispatch_modes_produce_bit_identical_frames() {
    let size = PhysicalSize::new(24, 16);
    let scene = Scene::demo();
    let camera = demo_camera(size);

    let mut parallel = Candela::new(size);
    let mut sequential = Candela::new(size);
    sequential.settings.dispatch = DispatchMode::Sequential;

    for frame in 1..=4 {
        parallel.render(&scene, &camera);
        sequential.render(&scene, &camera);
        assert_eq!(
            parallel.image_data, sequential.image_data,
            "buffers diverged at frame {frame}"
        );
    }
}

#[test]
fn repeated_runs_are_deterministic() {
    let size = PhysicalSize::new(16, 16);
    let scene = Scene::demo();
    let camera = demo_camera(size);

    let render_three = || {
        let mut renderer = Candela::new(size);
        for _ in 0..3 {
            renderer.render(&scene, &camera);
        }
        renderer.image_data
    };

    assert_eq!(render_three(), render_three());
}

#[test]
fn reset_matches_a_fresh_renderer() {
    let size = PhysicalSize::new(8, 8);
    let scene = Scene::demo();
    let camera = demo_camera(size);

    let mut seasoned = Candela::new(size);
    for _ in 0..5 {
        seasoned.render(&scene, &camera);
    }
    seasoned.reset_frame_index();
    seasoned.render(&scene, &camera);

    let mut fresh = Candela::new(size);
    fresh.render(&scene, &camera);

    assert_eq!(seasoned.image_data, fresh.image_data);
    assert_eq!(seasoned.frame_index(), fresh.frame_index());
}

#[test]
fn accumulation_refines_toward_a_stable_image() {
    // With a static scene the displayed estimate is a running mean, so
    // successive frames move each pixel by strictly shrinking steps.
    let size = PhysicalSize::new(12, 12);
    let scene = Scene::demo();
    let camera = demo_camera(size);

    let mut renderer = Candela::new(size);
    renderer.render(&scene, &camera);
    let first = renderer.image_data.clone();

    for _ in 0..15 {
        renderer.render(&scene, &camera);
    }
    let settled = renderer.image_data.clone();

    renderer.render(&scene, &camera);
    let next = renderer.image_data.clone();

    let delta = |a: &[u32], b: &[u32]| -> u64 {
        a.iter()
            .zip(b)
            .flat_map(|(x, y)| x.to_le_bytes().into_iter().zip(y.to_le_bytes()))
            .map(|(x, y)| (x as i64 - y as i64).unsigned_abs())
            .sum()
    };

    // A single late sample moves the mean far less than the early frames did.
    assert!(delta(&settled, &next) <= delta(&first, &settled));
    assert_eq!(renderer.frame_index(), 18);
}
