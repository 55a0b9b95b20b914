//! Headless wgpu backend.
//!
//! Clears are recorded as render passes into a pending command encoder.
//! Region writes go through `Queue::write_texture`, which the queue stages
//! ahead of the *next* submission, so the pending encoder is always submitted
//! first to keep clear-then-draw ordering intact.

use glam::Vec4;
use slotmap::SlotMap;

use super::{GpuBackend, Region, SurfaceKey};
use crate::errors::{BakeError, Result};
use crate::resources::format::SurfaceDescriptor;

struct GpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: SurfaceDescriptor,
}

/// Surfaces backed by wgpu textures on a headless device.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surfaces: SlotMap<SurfaceKey, GpuSurface>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuBackend {
    /// Wraps an existing device and queue.
    #[must_use]
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            surfaces: SlotMap::with_key(),
            encoder: None,
        }
    }

    /// Requests an adapter and device without a presentation surface.
    pub async fn request(power_preference: wgpu::PowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| BakeError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Texture Baker Device"),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                ..Default::default()
            })
            .await?;

        log::info!("Texture baker using adapter: {}", adapter.get_info().name);
        Ok(Self::from_device(device, queue))
    }

    /// Blocking variant of [`request`](Self::request).
    pub fn new_headless() -> Result<Self> {
        pollster::block_on(Self::request(wgpu::PowerPreference::default()))
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn surface(&self, key: SurfaceKey) -> Result<&GpuSurface> {
        self.surfaces.get(key).ok_or(BakeError::UnknownSurface)
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture Baker Encoder"),
            })
        })
    }

    fn flush_encoder(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }

    /// Waits for the device to go idle, then takes the signal from `rx`.
    fn block_on_signal<T>(&self, rx: &flume::Receiver<T>) -> Result<T> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| BakeError::Readback(format!("device poll failed: {e}")))?;
        rx.recv()
            .map_err(|_| BakeError::Readback("device signal dropped".to_string()))
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn max_surface_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceKey> {
        let format = desc
            .format
            .to_wgpu(desc.srgb)
            .ok_or(BakeError::UnsupportedFormat(desc.format))?;
        desc.validate(self.max_surface_dimension())
            .map_err(|e| BakeError::SurfaceAllocationFailed {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                reason: e.to_string(),
            })?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Texture Baker Surface"),
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
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(self.surfaces.insert(GpuSurface {
            texture,
            view,
            desc: *desc,
        }))
    }

    fn destroy_surface(&mut self, key: SurfaceKey) {
        if let Some(surface) = self.surfaces.remove(key) {
            // Pending work may still reference the texture.
            self.flush_encoder();
            surface.texture.destroy();
        }
    }

    fn clear_surface(&mut self, key: SurfaceKey, color: Vec4) -> Result<()> {
        let view = self.surface(key)?.view.clone();
        let encoder = self.encoder();
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Texture Baker Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(color.x),
                        g: f64::from(color.y),
                        b: f64::from(color.z),
                        a: f64::from(color.w),
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        Ok(())
    }

    fn write_region(&mut self, key: SurfaceKey, region: Region, bytes: &[u8]) -> Result<()> {
        let desc = self.surface(key)?.desc;
        let bpp = desc.format.bytes_per_pixel() as u32;
        let expected = (region.width * bpp) as usize * region.height as usize;
        if bytes.len() != expected {
            return Err(BakeError::InvalidPixelData {
                expected,
                actual: bytes.len(),
            });
        }

        self.flush_encoder();
        let surface = self.surface(key)?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * bpp),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        self.flush_encoder();
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.flush_encoder();
        let (tx, rx) = flume::bounded(1);
        self.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        self.block_on_signal(&rx)
    }

    fn read_pixels(&mut self, key: SurfaceKey) -> Result<Vec<u8>> {
        let desc = self.surface(key)?.desc;
        let bpp = desc.format.bytes_per_pixel() as u32;
        let row_bytes = desc.width * bpp;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Texture Baker Readback"),
            size: u64::from(padded_row_bytes) * u64::from(desc.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let surface = self.surface(key)?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture Baker Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            surface.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(desc.height),
                },
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );

        self.flush_encoder();
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.block_on_signal(&rx)?
            .map_err(|e| BakeError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity(desc.byte_size());
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_row_bytes as usize) {
                pixels.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        readback.unmap();
        Ok(pixels)
    }

    fn live_surface_count(&self) -> usize {
        self.surfaces.len()
    }
}
