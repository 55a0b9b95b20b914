//! Canvas draw context.
//!
//! A [`Canvas`] records [`DrawCommand`]s against the surface it is bound to.
//! Nothing touches the backend until [`Canvas::flush`], which rasterises each
//! command into a tightly packed patch and uploads it with
//! [`GpuBackend::write_region`]. Clears go through
//! [`GpuBackend::clear_surface`] so backends can use their native fast path.
//!
//! ```text
//! record ─► [Clear, FillRect, DrawTexture, Placeholder, ...]
//!                              │
//! flush(backend, surface) ─────┘─► clear_surface / write_region ... ─► submit
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{UVec2, Vec4};

use crate::backend::{GpuBackend, Region};
use crate::errors::Result;
use crate::renderer::pool::PooledSurface;
use crate::resources::format::{PixelFormat, SurfaceDescriptor};
use crate::resources::texture::Texture;

static NEXT_CANVAS_ID: AtomicU64 = AtomicU64::new(1);

/// Colour of the "missing handler" checker cells.
pub const PLACEHOLDER_COLOR: Vec4 = Vec4::new(1.0, 0.0, 1.0, 1.0);
const PLACEHOLDER_BACKGROUND: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// A recorded draw operation. Regions are clipped to the target at flush time.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Fill the whole target with a linear colour.
    Clear(Vec4),
    FillRect { region: Region, color: Vec4 },
    /// Stretch mip 0 of `texture` over `region` (nearest sampling),
    /// modulated by `tint`.
    DrawTexture {
        region: Region,
        texture: Texture,
        tint: Vec4,
    },
    /// Magenta/black checkerboard with `cell`-sized squares.
    Placeholder { region: Region, cell: u32 },
}

/// Lightweight, recyclable draw context.
#[derive(Debug)]
pub struct Canvas {
    id: u64,
    target: Option<SurfaceDescriptor>,
    commands: Vec<DrawCommand>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_CANVAS_ID.fetch_add(1, Ordering::Relaxed),
            target: None,
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Binds the canvas to a surface layout, dropping any stale commands.
    pub fn bind(&mut self, target: SurfaceDescriptor) {
        self.target = Some(target);
        self.commands.clear();
    }

    /// Returns the canvas to its pristine state.
    pub fn reset(&mut self) {
        self.target = None;
        self.commands.clear();
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    #[must_use]
    pub fn target(&self) -> Option<&SurfaceDescriptor> {
        self.target.as_ref()
    }

    /// Size of the bound target, or zero when unbound.
    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.target.map_or(UVec2::ZERO, |t| t.size())
    }

    #[must_use]
    pub fn pending_commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    // ── Recording ──────────────────────────────────────────────────────────

    pub fn clear(&mut self, color: Vec4) {
        self.commands.push(DrawCommand::Clear(color));
    }

    pub fn fill_rect(&mut self, region: Region, color: Vec4) {
        self.commands.push(DrawCommand::FillRect { region, color });
    }

    pub fn draw_texture(&mut self, region: Region, texture: &Texture, tint: Vec4) {
        self.commands.push(DrawCommand::DrawTexture {
            region,
            texture: texture.clone(),
            tint,
        });
    }

    /// Draws `texture` stretched over the whole target.
    pub fn draw_texture_fullscreen(&mut self, texture: &Texture) {
        let size = self.size();
        self.draw_texture(Region::full(size.x, size.y), texture, Vec4::ONE);
    }

    pub fn draw_placeholder(&mut self, region: Region, cell: u32) {
        self.commands.push(DrawCommand::Placeholder { region, cell });
    }

    // ── Execution ──────────────────────────────────────────────────────────

    /// Executes and drains every recorded command against `surface`, then
    /// submits the work. Does not wait for completion.
    pub fn flush(&mut self, backend: &mut dyn GpuBackend, surface: &PooledSurface) -> Result<()> {
        let desc = *surface.descriptor();
        let commands = std::mem::take(&mut self.commands);
        for command in &commands {
            execute(backend, surface, &desc, command)?;
        }
        if !commands.is_empty() {
            log::trace!("Canvas {} flushed {} command(s)", self.id, commands.len());
        }
        backend.submit()
    }
}

fn execute(
    backend: &mut dyn GpuBackend,
    surface: &PooledSurface,
    desc: &SurfaceDescriptor,
    command: &DrawCommand,
) -> Result<()> {
    let key = surface.key();
    match command {
        DrawCommand::Clear(color) => backend.clear_surface(key, *color),
        DrawCommand::FillRect { region, color } => {
            let Some(region) = region.clip(desc.width, desc.height) else {
                return Ok(());
            };
            let patch = rasterize(desc, region, |_, _| *color);
            backend.write_region(key, region, &patch)
        }
        DrawCommand::DrawTexture {
            region,
            texture,
            tint,
        } => {
            let Some(clipped) = region.clip(desc.width, desc.height) else {
                return Ok(());
            };
            let Some(sampler) = NearestSampler::new(texture) else {
                log::warn!("Skipping draw of texture '{}' without source art", texture.label());
                return Ok(());
            };
            let patch = rasterize(desc, clipped, |x, y| {
                // Map back into the unclipped destination rectangle.
                let u = (x - region.x) as f32 + 0.5;
                let v = (y - region.y) as f32 + 0.5;
                sampler.sample(u / region.width as f32, v / region.height as f32) * *tint
            });
            backend.write_region(key, clipped, &patch)
        }
        DrawCommand::Placeholder { region, cell } => {
            let Some(clipped) = region.clip(desc.width, desc.height) else {
                return Ok(());
            };
            let cell = (*cell).max(1);
            let patch = rasterize(desc, clipped, |x, y| {
                let cx = (x - region.x) / cell;
                let cy = (y - region.y) / cell;
                if (cx + cy) % 2 == 0 {
                    PLACEHOLDER_COLOR
                } else {
                    PLACEHOLDER_BACKGROUND
                }
            });
            backend.write_region(key, clipped, &patch)
        }
    }
}

/// Builds a tightly packed patch for `region`, shading each pixel at its
/// absolute surface coordinate.
fn rasterize(
    desc: &SurfaceDescriptor,
    region: Region,
    mut shade: impl FnMut(u32, u32) -> Vec4,
) -> Vec<u8> {
    let mut patch = Vec::with_capacity(desc.format.data_size(region.width, region.height));
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            patch.extend_from_slice(&desc.format.encode(shade(x, y), desc.srgb));
        }
    }
    patch
}

/// Point sampler over mip 0 of a texture's source art.
struct NearestSampler {
    width: u32,
    height: u32,
    format: PixelFormat,
    srgb: bool,
    pixels: Vec<u8>,
}

impl NearestSampler {
    fn new(texture: &Texture) -> Option<Self> {
        let srgb = texture.settings().srgb;
        let source = texture.source();
        let art = source.as_ref().filter(|art| art.is_valid())?;
        Some(Self {
            width: art.width,
            height: art.height,
            format: art.format,
            srgb,
            pixels: art.mip(0)?.to_vec(),
        })
    }

    /// Samples at normalised coordinates in `[0, 1)`.
    fn sample(&self, u: f32, v: f32) -> Vec4 {
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        self.pixels
            .get(offset..offset + bpp)
            .map_or(Vec4::ZERO, |texel| self.format.decode(texel, self.srgb))
    }
}
