use std::iter;
use std::time::Instant;

use bytemuck::cast_slice;
use eframe::egui::{
    self, ClippedPrimitive, ComboBox, DragValue, Slider, TextureId,
};
use log::{debug, error, info};
use nalgebra::Vector3;
use wgpu::{
    Backends, Color, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode, Device,
    DeviceDescriptor, Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError,
    TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::camera::Camera;
use crate::candela::scene::Scene;
use crate::candela::texture::DisplayTexture;
use crate::candela::{Candela, DispatchMode, ScatterMode};

pub struct Application {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub window: Window,

    egui_state: egui_winit::State,
    egui_context: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,

    renderer: Candela,
    camera: Camera,
    scene: Scene,

    viewport: DisplayTexture,
    viewport_id: TextureId,
    // Desired render resolution, fed back from the UI's central panel.
    viewport_size: PhysicalSize<u32>,

    last_frame: Instant,
    last_render_ms: f32,
}

impl Application {
    pub async fn new(window: Window, event_loop: &EventLoop<()>) -> Self {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // The window outlives the surface; Application owns both.
        let surface = unsafe { instance.create_surface(&window) }.unwrap();

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .unwrap();
        info!("rendering on {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: Limits::default(),
                    label: Some("Candela GPU"),
                },
                None,
            )
            .await
            .unwrap();

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = egui::Context::default();
        let mut egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1);
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: egui_context.pixels_per_point(),
        };

        let viewport_size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let renderer = Candela::new(viewport_size);
        let camera = Camera::new(45.0, 0.1, 100.0, viewport_size);
        let scene = Scene::demo();

        let viewport = DisplayTexture::new(&device, viewport_size, "Candela Output");
        let viewport_id =
            egui_renderer.register_native_texture(&device, &viewport.view, FilterMode::Linear);

        Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            renderer,
            camera,
            scene,
            viewport,
            viewport_id,
            viewport_size,
            last_frame: Instant::now(),
            last_render_ms: 0.0,
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        debug!("surface resize to {}x{}", new_size.width, new_size.height);
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.egui_context.pixels_per_point();
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];
    }

    /// Window events. Returns true when the event is consumed here (UI or
    /// camera) and needs no further handling.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_event(&self.egui_context, event);
        if response.consumed {
            return true;
        }

        if self
            .camera
            .input(event, self.egui_context.is_pointer_over_area())
        {
            self.renderer.reset_frame_index();
            return true;
        }

        false
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let frame_time = self.last_frame.elapsed().as_millis();
        self.last_frame = Instant::now();

        if self.camera.update(frame_time) {
            self.renderer.reset_frame_index();
        }

        // The UI viewport drives the render resolution; a change restarts
        // accumulation with freshly sized buffers.
        if self.viewport_size != self.renderer.size() {
            self.renderer.resize(self.viewport_size);
            self.camera.resize(self.viewport_size);
            self.viewport.resize(&self.device, self.viewport_size);

            self.egui_renderer.free_texture(&self.viewport_id);
            self.viewport_id = self.egui_renderer.register_native_texture(
                &self.device,
                &self.viewport.view,
                FilterMode::Linear,
            );
        }

        let traced = Instant::now();
        self.renderer.render(&self.scene, &self.camera);
        self.last_render_ms = traced.elapsed().as_secs_f32() * 1000.0;

        self.viewport
            .upload(&self.queue, cast_slice(&self.renderer.image_data));

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Candela Encoder"),
        });

        {
            let primitives = self.update_egui(&mut encoder);
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("UI Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer
                .render(&mut render_pass, &primitives, &self.egui_screen);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn update_egui(&mut self, encoder: &mut CommandEncoder) -> Vec<ClippedPrimitive> {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        let renderer = &mut self.renderer;
        let camera = &mut self.camera;
        let scene = &mut self.scene;
        let viewport_size = &mut self.viewport_size;
        let viewport_id = self.viewport_id;
        let last_render_ms = self.last_render_ms;

        let mut invalidated = false;

        let full_output = self.egui_context.run(raw_input, |ctx| {
            egui::SidePanel::right("settings")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    ui.heading("Settings");
                    ui.label(format!("Last render: {last_render_ms:.3} ms"));
                    ui.label(format!("Accumulated frames: {}", renderer.frame_index()));

                    ui.checkbox(&mut renderer.settings.accumulate, "Accumulate");
                    if ui.button("Reset").clicked() {
                        renderer.reset_frame_index();
                    }

                    ComboBox::from_label("Dispatch")
                        .selected_text(format!("{:?}", renderer.settings.dispatch))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(
                                &mut renderer.settings.dispatch,
                                DispatchMode::Parallel,
                                "Parallel",
                            );
                            ui.selectable_value(
                                &mut renderer.settings.dispatch,
                                DispatchMode::Sequential,
                                "Sequential",
                            );
                        });

                    let scatter_before = renderer.settings.scatter;
                    ComboBox::from_label("Scatter")
                        .selected_text(format!("{:?}", renderer.settings.scatter))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(
                                &mut renderer.settings.scatter,
                                ScatterMode::Diffuse,
                                "Diffuse",
                            );
                            ui.selectable_value(
                                &mut renderer.settings.scatter,
                                ScatterMode::Reflective,
                                "Reflective",
                            );
                        });
                    invalidated |= renderer.settings.scatter != scatter_before;

                    if ui.button("Save image").clicked() {
                        if let Err(err) = renderer.save_image("render.png") {
                            error!("failed to save render.png: {err}");
                        } else {
                            info!("saved render.png");
                        }
                    }

                    ui.separator();
                    ui.label("C toggles mouse look, WASD/Space/Shift to fly.");
                    ui.checkbox(&mut camera.grab_mouse, "Mouse look");

                    ui.separator();
                    ui.heading("Scene");
                    let material_count = scene.materials.len();
                    for (i, sphere) in scene.spheres.iter_mut().enumerate() {
                        ui.push_id(("sphere", i), |ui| {
                            ui.label(format!("Sphere {i}"));
                            ui.horizontal(|ui| {
                                invalidated |= ui
                                    .add(DragValue::new(&mut sphere.position.x).speed(0.1))
                                    .changed();
                                invalidated |= ui
                                    .add(DragValue::new(&mut sphere.position.y).speed(0.1))
                                    .changed();
                                invalidated |= ui
                                    .add(DragValue::new(&mut sphere.position.z).speed(0.1))
                                    .changed();
                            });
                            invalidated |= ui
                                .add(
                                    DragValue::new(&mut sphere.radius)
                                        .speed(0.1)
                                        .clamp_range(0.01..=f32::MAX)
                                        .prefix("radius "),
                                )
                                .changed();
                            invalidated |= ui
                                .add(
                                    DragValue::new(&mut sphere.material_index)
                                        .clamp_range(0..=material_count.saturating_sub(1))
                                        .prefix("material "),
                                )
                                .changed();
                            ui.separator();
                        });
                    }

                    for (i, material) in scene.materials.iter_mut().enumerate() {
                        ui.push_id(("material", i), |ui| {
                            ui.label(format!("Material {i}"));

                            let mut albedo = [
                                material.albedo.x,
                                material.albedo.y,
                                material.albedo.z,
                            ];
                            if ui.color_edit_button_rgb(&mut albedo).changed() {
                                material.albedo = Vector3::from(albedo);
                                invalidated = true;
                            }

                            invalidated |= ui
                                .add(Slider::new(&mut material.roughness, 0.0..=1.0)
                                    .text("roughness"))
                                .changed();
                            invalidated |= ui
                                .add(Slider::new(&mut material.metallic, 0.0..=1.0)
                                    .text("metallic"))
                                .changed();

                            let mut emission = [
                                material.emission_color.x,
                                material.emission_color.y,
                                material.emission_color.z,
                            ];
                            if ui.color_edit_button_rgb(&mut emission).changed() {
                                material.emission_color = Vector3::from(emission);
                                invalidated = true;
                            }
                            invalidated |= ui
                                .add(
                                    DragValue::new(&mut material.emission_power)
                                        .speed(0.05)
                                        .clamp_range(0.0..=f32::MAX)
                                        .prefix("emission "),
                                )
                                .changed();
                            ui.separator();
                        });
                    }
                });

            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| {
                    let available = ui.available_size();
                    *viewport_size = PhysicalSize::new(
                        (available.x.max(1.0)) as u32,
                        (available.y.max(1.0)) as u32,
                    );

                    // Flip vertically at presentation time; row 0 of the
                    // buffer is the bottom of the image.
                    ui.add(
                        egui::Image::new(viewport_id, available).uv(egui::Rect::from_min_max(
                            egui::pos2(0.0, 1.0),
                            egui::pos2(1.0, 0.0),
                        )),
                    );
                });
        });

        if invalidated {
            self.renderer.reset_frame_index();
        }

        self.egui_state.handle_platform_output(
            &self.window,
            &self.egui_context,
            full_output.platform_output,
        );

        let primitives = self.egui_context.tessellate(full_output.shapes);
        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &primitives,
            &self.egui_screen,
        );
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        primitives
    }
}
