use wgpu::{
    Device, Extent3d, FilterMode, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Sampler,
    SamplerDescriptor, Texture, TextureAspect, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;

/// GPU-side surface the traced pixel buffer is uploaded to once per frame.
/// The UI layer samples it like any other texture.
pub struct DisplayTexture {
    pub texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    label: String,
}

impl DisplayTexture {
    pub fn new(device: &Device, size: PhysicalSize<u32>, label: &str) -> Self {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{label} view")),
            ..Default::default()
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&format!("{label} sampler")),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            label: label.to_string(),
        }
    }

    /// Full-buffer upload of packed RGBA pixels in row-major order.
    pub fn upload(&self, queue: &Queue, rgba: &[u8]) {
        let pixels = (self.texture.width() * self.texture.height()) as usize;
        assert_eq!(pixels * 4, rgba.len(), "pixel buffer does not match texture size");

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.texture.width()),
                rows_per_image: Some(self.texture.height()),
            },
            self.texture.size(),
        )
    }

    /// Recreates the texture at the new resolution; same-size calls keep the
    /// existing one.
    pub fn resize(&mut self, device: &Device, new_size: PhysicalSize<u32>) {
        if self.size() == new_size {
            return;
        }

        let new = Self::new(device, new_size, &self.label);
        self.texture = new.texture;
        self.view = new.view;
        self.sampler = new.sampler;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.texture.width(), self.texture.height())
    }
}
