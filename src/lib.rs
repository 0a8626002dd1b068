use log::{info, warn};
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub mod app;
pub mod camera;
pub mod candela;
pub mod util;

use app::Application;

pub fn run() {
    env_logger::init();

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Candela: Path Tracer")
        .build(&event_loop)
        .unwrap();

    let mut application = pollster::block_on(Application::new(window, &event_loop));
    info!("window up, entering event loop");

    event_loop.run(move |event, _target, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == application.window.id() => {
            if application.input(event) {
                return;
            }

            match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::ExitWithCode(0),

                WindowEvent::Resized(new_size) => application.resize(*new_size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    application.resize(**new_inner_size)
                }

                _ => {}
            }
        }

        Event::RedrawRequested(window_id) if window_id == application.window.id() => {
            match application.render() {
                Ok(_) => {}
                // The surface comes back on the next configure.
                Err(wgpu::SurfaceError::Lost) => application.resize(application.size),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    *control_flow = ControlFlow::ExitWithCode(1)
                }
                Err(error) => warn!("frame skipped: {error:?}"),
            }
        }

        Event::MainEventsCleared => application.window.request_redraw(),

        _ => {}
    });
}
