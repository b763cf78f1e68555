use std::collections::HashMap;

use crate::{
    foundation::error::{GlintError, GlintResult},
    gpu::{
        GlFlavor, GpuDevice, GpuParam, GpuVersion, RawTarget, TargetDesc, TextureId,
        caps::{EXT_BGRA8888, EXT_FRAMEBUFFER_BLIT},
    },
};

struct TargetSlot {
    texture: wgpu::Texture,
    _view: wgpu::TextureView,
    external: Option<TextureId>,
}

/// [`GpuDevice`] over a `wgpu` adapter. Render targets are 2D textures usable as render
/// attachments and copy sources.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    limits: wgpu::Limits,
    imported: HashMap<TextureId, wgpu::Texture>,
    targets: HashMap<RawTarget, TargetSlot>,
    next_texture: u64,
    next_target: u64,
}

impl WgpuDevice {
    /// Open the default high-performance adapter.
    pub fn new() -> GlintResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                GlintError::unsupported_backend("no gpu adapter available")
            }
            other => GlintError::gpu(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("glint"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GlintError::gpu(format!("wgpu request_device failed: {e:?}")))?;

        let limits = device.limits();
        tracing::info!(
            adapter = %adapter.get_info().name,
            max_texture = limits.max_texture_dimension_2d,
            "wgpu device opened"
        );
        Ok(Self {
            device,
            queue,
            limits,
            imported: HashMap::new(),
            targets: HashMap::new(),
            next_texture: 1,
            next_target: 1,
        })
    }

    /// Hand a texture created elsewhere to the device so it can be bound with
    /// [`GpuDevice::bind_texture`].
    pub fn import_texture(&mut self, texture: wgpu::Texture) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.imported.insert(id, texture);
        id
    }

    /// Texture behind `target`.
    pub fn texture(&self, target: RawTarget) -> Option<&wgpu::Texture> {
        self.targets.get(&target).map(|s| &s.texture)
    }

    fn insert_target(&mut self, texture: wgpu::Texture, external: Option<TextureId>) -> RawTarget {
        let raw = RawTarget(self.next_target);
        self.next_target += 1;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.targets.insert(
            raw,
            TargetSlot {
                texture,
                _view: view,
                external,
            },
        );
        raw
    }
}

fn format_for_depth(depth: u8) -> GlintResult<wgpu::TextureFormat> {
    match depth {
        8 => Ok(wgpu::TextureFormat::R8Unorm),
        15 | 16 => Ok(wgpu::TextureFormat::Rgba8Unorm),
        24 | 32 => Ok(wgpu::TextureFormat::Bgra8Unorm),
        30 => Ok(wgpu::TextureFormat::Rgb10a2Unorm),
        other => Err(GlintError::unsupported_format(format!(
            "no texture format for depth {other}"
        ))),
    }
}

impl GpuDevice for WgpuDevice {
    fn version(&self) -> GpuVersion {
        GpuVersion::new(3, 3)
    }

    fn flavor(&self) -> GlFlavor {
        GlFlavor::Desktop
    }

    fn has_extension(&self, name: &str) -> bool {
        name == EXT_BGRA8888 || name == EXT_FRAMEBUFFER_BLIT
    }

    fn get_integer(&self, param: GpuParam) -> i64 {
        match param {
            GpuParam::MaxRenderbufferSize | GpuParam::MaxTextureSize => {
                i64::from(self.limits.max_texture_dimension_2d)
            }
        }
    }

    fn flush(&mut self) {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glint_flush"),
            });
        self.queue.submit(Some(encoder.finish()));
    }

    fn finish(&mut self) -> GlintResult<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GlintError::gpu(format!("wgpu poll failed: {e:?}")))?;
        Ok(())
    }

    fn create_render_target(&mut self, desc: TargetDesc) -> GlintResult<RawTarget> {
        let max = self.limits.max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(GlintError::out_of_resources(format!(
                "{}x{} is outside 1..={max}",
                desc.width, desc.height
            )));
        }
        let format = format_for_depth(desc.depth)?;
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glint_target"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        Ok(self.insert_target(texture, None))
    }

    fn bind_texture(&mut self, texture: TextureId, desc: TargetDesc) -> GlintResult<RawTarget> {
        let tex = self
            .imported
            .get(&texture)
            .cloned()
            .ok_or_else(|| GlintError::gpu(format!("unknown texture {}", texture.0)))?;
        if tex.width() < desc.width || tex.height() < desc.height {
            return Err(GlintError::gpu(format!(
                "texture {} is {}x{}, smaller than {}x{}",
                texture.0,
                tex.width(),
                tex.height(),
                desc.width,
                desc.height
            )));
        }
        Ok(self.insert_target(tex, Some(texture)))
    }

    fn destroy_render_target(&mut self, target: RawTarget) {
        let Some(slot) = self.targets.remove(&target) else {
            tracing::warn!(raw = target.0, "destroying unknown render target");
            return;
        };
        if slot.external.is_none() {
            slot.texture.destroy();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/wgpu_device.rs"]
mod tests;
