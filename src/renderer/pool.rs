//! Render Target Pool
//!
//! Recycles backend surfaces and canvases across bakes.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    ResourcePool                      │
//! │                                                      │
//! │  idle_surfaces: [PooledSurface]   (oldest first)     │
//! │  idle_canvases: [Canvas]          (LIFO stack)       │
//! │                                                      │
//! │  acquire_surface(desc) ─► first exact match or alloc │
//! │  release_surface(s)    ─► push unless already idle   │
//! │  trim(keep) / drain()  ─► destroy idle surfaces      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The pool owns idle resources only. Once a surface is handed out it is
//! owned by whoever holds the [`PooledSurface`]; the pool merely counts it
//! as outstanding until it comes back.

use crate::backend::{GpuBackend, SurfaceKey};
use crate::errors::Result;
use crate::renderer::canvas::Canvas;
use crate::resources::format::SurfaceDescriptor;

// ─── Pooled Surface ──────────────────────────────────────────────────────────

/// A backend surface plus its descriptor.
///
/// Not `Clone`: a surface has exactly one owner, either the
/// pool (idle) or a scope (active).
#[derive(Debug, PartialEq, Eq)]
pub struct PooledSurface {
    key: SurfaceKey,
    desc: SurfaceDescriptor,
}

impl PooledSurface {
    #[must_use]
    pub fn key(&self) -> SurfaceKey {
        self.key
    }

    #[must_use]
    pub fn descriptor(&self) -> &SurfaceDescriptor {
        &self.desc
    }
}

// ─── Pool ────────────────────────────────────────────────────────────────────

/// Free lists of surfaces and canvases.
#[derive(Debug, Default)]
pub struct ResourcePool {
    idle_surfaces: Vec<PooledSurface>,
    idle_canvases: Vec<Canvas>,
    /// Surfaces handed out and not yet returned.
    outstanding: usize,
    allocations: u64,
    reuses: u64,
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Surfaces ───────────────────────────────────────────────────────────

    /// Hands out the first idle surface whose descriptor equals `desc`, or
    /// allocates a new one.
    ///
    /// An allocation error is fatal for the batch (see
    /// [`BakeError::is_fatal`](crate::BakeError::is_fatal)).
    pub fn acquire_surface(
        &mut self,
        backend: &mut dyn GpuBackend,
        desc: &SurfaceDescriptor,
    ) -> Result<PooledSurface> {
        if let Some(index) = self.idle_surfaces.iter().position(|s| s.desc == *desc) {
            let surface = self.idle_surfaces.remove(index);
            self.reuses += 1;
            self.outstanding += 1;
            log::debug!(
                "Reusing {}x{} {} surface",
                desc.width,
                desc.height,
                desc.format
            );
            return Ok(surface);
        }

        let key = backend.create_surface(desc)?;
        self.allocations += 1;
        self.outstanding += 1;
        log::debug!(
            "Allocated {}x{} {} surface on {} backend",
            desc.width,
            desc.height,
            desc.format,
            backend.name()
        );
        Ok(PooledSurface { key, desc: *desc })
    }

    /// Returns a surface to the idle list. Releasing a surface that is
    /// already idle is a no-op; returns `false` in that case.
    pub fn release_surface(&mut self, surface: PooledSurface) -> bool {
        if self.idle_surfaces.iter().any(|s| s.key == surface.key) {
            log::debug!("Ignoring duplicate release of pooled surface");
            return false;
        }
        self.outstanding = self.outstanding.saturating_sub(1);
        self.idle_surfaces.push(surface);
        true
    }

    /// Takes ownership of a surface this pool never handed out, e.g. one
    /// acquired from another pool.
    pub fn adopt_surface(&mut self, surface: PooledSurface) -> bool {
        if self.idle_surfaces.iter().any(|s| s.key == surface.key) {
            return false;
        }
        self.idle_surfaces.push(surface);
        true
    }

    // ── Canvases ───────────────────────────────────────────────────────────

    /// Pops the most recently released canvas, or creates one.
    pub fn acquire_canvas(&mut self) -> Canvas {
        self.idle_canvases.pop().unwrap_or_default()
    }

    /// Resets and returns a canvas to the stack. Duplicate release is a
    /// no-op.
    pub fn release_canvas(&mut self, mut canvas: Canvas) -> bool {
        if self.idle_canvases.iter().any(|c| c.id() == canvas.id()) {
            return false;
        }
        canvas.reset();
        self.idle_canvases.push(canvas);
        true
    }

    // ── Maintenance ────────────────────────────────────────────────────────

    /// Destroys idle surfaces beyond `keep`, oldest first. Returns the
    /// number destroyed.
    pub fn trim(&mut self, backend: &mut dyn GpuBackend, keep: usize) -> usize {
        let excess = self.idle_surfaces.len().saturating_sub(keep);
        for surface in self.idle_surfaces.drain(..excess) {
            backend.destroy_surface(surface.key);
        }
        if excess > 0 {
            log::debug!("Trimmed {excess} idle surface(s), {keep} kept");
        }
        excess
    }

    /// Destroys every idle surface and drops every idle canvas.
    pub fn drain(&mut self, backend: &mut dyn GpuBackend) -> usize {
        self.idle_canvases.clear();
        self.trim(backend, 0)
    }

    // ── Stats ──────────────────────────────────────────────────────────────

    #[must_use]
    pub fn idle_surface_count(&self) -> usize {
        self.idle_surfaces.len()
    }

    #[must_use]
    pub fn idle_canvas_count(&self) -> usize {
        self.idle_canvases.len()
    }

    /// Descriptors of idle surfaces in idle-list order.
    pub fn idle_descriptors(&self) -> impl Iterator<Item = &SurfaceDescriptor> {
        self.idle_surfaces.iter().map(|s| &s.desc)
    }

    #[must_use]
    pub fn is_idle(&self, key: SurfaceKey) -> bool {
        self.idle_surfaces.iter().any(|s| s.key == key)
    }

    #[must_use]
    pub fn outstanding_surfaces(&self) -> usize {
        self.outstanding
    }

    /// Total surfaces this pool allocated from the backend.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Number of acquisitions served from the idle list.
    #[must_use]
    pub fn reuses(&self) -> u64 {
        self.reuses
    }
}
