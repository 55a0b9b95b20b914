//! Graphics Backend Abstraction
//!
//! The pool, scopes and bake driver never talk to a graphics API directly.
//! They go through [`GpuBackend`], which exposes the handful of primitives
//! baking needs:
//!
//! ```text
//! create_surface(desc) ─► SurfaceKey
//! clear_surface / write_region      (recorded, executed in order)
//! submit()                          (flush recorded work)
//! wait_idle()                       (fence: block until the GPU is done)
//! read_pixels(key)                  (fenced readback, tightly packed)
//! destroy_surface(key)
//! ```
//!
//! Two implementations ship with the crate:
//! - [`SoftwareBackend`]: CPU memory surfaces, deterministic, used by tests
//! - [`WgpuBackend`]: headless wgpu device

mod software;
mod wgpu_backend;

pub use software::SoftwareBackend;
pub use wgpu_backend::WgpuBackend;

use glam::Vec4;
use slotmap::new_key_type;

use crate::errors::Result;
use crate::resources::format::SurfaceDescriptor;

new_key_type! {
    /// Backend-side identity of an allocated surface.
    pub struct SurfaceKey;
}

/// Axis-aligned pixel rectangle, clipped to its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width` x `height` surface.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersects with a `width` x `height` surface. Returns `None` if nothing
    /// is left.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clipped = Self {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Surface allocation, drawing and readback primitives.
///
/// Callers are single-threaded and non-reentrant. All recorded work executes
/// in submission order. `read_pixels` must observe every previously recorded
/// write to the surface.
pub trait GpuBackend {
    /// Human readable name for logs.
    fn name(&self) -> &str;

    /// Largest surface axis this backend can allocate.
    fn max_surface_dimension(&self) -> u32;

    /// Allocates a surface. Failure means the device is out of resources.
    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceKey>;

    /// Frees a surface. Unknown keys are ignored.
    fn destroy_surface(&mut self, key: SurfaceKey);

    /// Fills the whole surface with a linear colour.
    fn clear_surface(&mut self, key: SurfaceKey, color: Vec4) -> Result<()>;

    /// Overwrites `region` with tightly packed pixels in the surface's format.
    fn write_region(&mut self, key: SurfaceKey, region: Region, bytes: &[u8]) -> Result<()>;

    /// Flushes recorded work to the device.
    fn submit(&mut self) -> Result<()>;

    /// Blocks until all submitted work has completed.
    fn wait_idle(&mut self) -> Result<()>;

    /// Reads back the surface contents, tightly packed.
    fn read_pixels(&mut self, key: SurfaceKey) -> Result<Vec<u8>>;

    /// Number of surfaces currently allocated on the device.
    fn live_surface_count(&self) -> usize;
}
