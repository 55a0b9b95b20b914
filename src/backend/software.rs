//! CPU memory backend.

use glam::Vec4;
use slotmap::SlotMap;

use super::{GpuBackend, Region, SurfaceKey};
use crate::errors::{BakeError, Result};
use crate::resources::format::SurfaceDescriptor;

struct SoftwareSurface {
    desc: SurfaceDescriptor,
    pixels: Vec<u8>,
}

/// Surfaces backed by plain byte buffers.
///
/// Work executes immediately, so `submit` and `wait_idle` only count calls.
/// An optional allocation limit simulates device memory exhaustion.
pub struct SoftwareBackend {
    surfaces: SlotMap<SurfaceKey, SoftwareSurface>,
    max_dimension: u32,
    allocation_limit: Option<usize>,
    total_allocations: usize,
    submit_count: u64,
    fence_count: u64,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: SlotMap::with_key(),
            max_dimension: 16384,
            allocation_limit: None,
            total_allocations: 0,
            submit_count: 0,
            fence_count: 0,
        }
    }

    /// Fails every allocation after `limit` successful ones.
    #[must_use]
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = Some(limit);
        self
    }

    /// Total surfaces ever created.
    #[must_use]
    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    #[must_use]
    pub fn submit_count(&self) -> u64 {
        self.submit_count
    }

    /// Number of completed fences.
    #[must_use]
    pub fn fence_count(&self) -> u64 {
        self.fence_count
    }

    fn surface_mut(&mut self, key: SurfaceKey) -> Result<&mut SoftwareSurface> {
        self.surfaces.get_mut(key).ok_or(BakeError::UnknownSurface)
    }
}

impl GpuBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn max_surface_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceKey> {
        let exhausted = self
            .allocation_limit
            .is_some_and(|limit| self.total_allocations >= limit);
        if exhausted {
            return Err(BakeError::SurfaceAllocationFailed {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                reason: "allocation limit reached".to_string(),
            });
        }
        desc.validate(self.max_dimension)
            .map_err(|e| BakeError::SurfaceAllocationFailed {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                reason: e.to_string(),
            })?;

        self.total_allocations += 1;
        Ok(self.surfaces.insert(SoftwareSurface {
            desc: *desc,
            pixels: vec![0; desc.byte_size()],
        }))
    }

    fn destroy_surface(&mut self, key: SurfaceKey) {
        self.surfaces.remove(key);
    }

    fn clear_surface(&mut self, key: SurfaceKey, color: Vec4) -> Result<()> {
        let surface = self.surface_mut(key)?;
        let texel = surface.desc.format.encode(color, surface.desc.srgb);
        for chunk in surface.pixels.chunks_exact_mut(texel.len()) {
            chunk.copy_from_slice(&texel);
        }
        Ok(())
    }

    fn write_region(&mut self, key: SurfaceKey, region: Region, bytes: &[u8]) -> Result<()> {
        let surface = self.surface_mut(key)?;
        let desc = surface.desc;
        let bpp = desc.format.bytes_per_pixel();
        let row_bytes = region.width as usize * bpp;
        let expected = row_bytes * region.height as usize;
        if bytes.len() != expected {
            return Err(BakeError::InvalidPixelData {
                expected,
                actual: bytes.len(),
            });
        }
        if region.clip(desc.width, desc.height) != Some(region) {
            return Err(BakeError::InvalidDimensions {
                width: region.x.saturating_add(region.width),
                height: region.y.saturating_add(region.height),
                max: desc.width.max(desc.height),
            });
        }

        let stride = desc.width as usize * bpp;
        for (row, src) in bytes.chunks_exact(row_bytes).enumerate() {
            let offset = (region.y as usize + row) * stride + region.x as usize * bpp;
            surface.pixels[offset..offset + row_bytes].copy_from_slice(src);
        }
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        self.submit_count += 1;
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.fence_count += 1;
        Ok(())
    }

    fn read_pixels(&mut self, key: SurfaceKey) -> Result<Vec<u8>> {
        Ok(self.surface_mut(key)?.pixels.clone())
    }

    fn live_surface_count(&self) -> usize {
        self.surfaces.len()
    }
}
