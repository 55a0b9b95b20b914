//! Render Scopes
//!
//! A render scope is an allocation arena for one (possibly nested) render
//! operation. Everything a scope hands out is returned when it closes, on
//! success and error paths alike.
//!
//! # Layout
//!
//! ```text
//! RenderScopeStack
//! ├── backend: Box<dyn GpuBackend>
//! ├── pool: ResourcePool              (top-level pool)
//! ├── derived_art: DerivedArtCache
//! └── frames: [ScopeFrame]            frames[0] is the root scope
//!       ├── pool: Option<ResourcePool>      (dedicated pool, drained on close)
//!       ├── draw_targets: handle ─► (surface, canvas)
//!       ├── resident: texture ─► saved streaming flags
//!       ├── temporaries: [Texture]
//!       └── held_surfaces: [PooledSurface]
//! ```
//!
//! Frames live in the stack itself, so a child reaches its parent by index.
//! Pool lookup walks down from the top frame to the nearest frame that owns
//! a dedicated pool and falls back to the top-level pool.
//!
//! # Closing a frame
//!
//! 1. Active draw targets are flushed and discarded (surface and canvas go
//!    back to the pool). Flush errors are logged, teardown continues.
//! 2. Held surfaces go back to the pool.
//! 3. Residency pins are reverted to their saved state.
//! 4. Temporary textures are released.
//! 5. A dedicated pool is drained.

use std::ops::{Deref, DerefMut};

use glam::{UVec2, Vec4};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::backend::{GpuBackend, SurfaceKey};
use crate::errors::Result;
use crate::renderer::canvas::Canvas;
use crate::renderer::derived_art::DerivedArtCache;
use crate::renderer::pool::{PooledSurface, ResourcePool};
use crate::resources::format::{PixelFormat, SurfaceDescriptor, convert_pixels};
use crate::resources::output::DEFAULT_MAX_OUTPUT_DIMENSION;
use crate::resources::requirements::{DerivedArtMode, MipGenSettings, ResourceRequirements};
use crate::resources::texture::{Texture, TextureSettings};
use crate::settings::BakerSettings;

// ─── Public Types ────────────────────────────────────────────────────────────

/// Opaque handle to an active draw target. Never reused by the stack that
/// issued it, so a stale handle resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawTargetHandle(u64);

/// Streaming flags of a texture before it was pinned resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedStreamingState {
    pub force_mips_resident: bool,
    pub ignore_streaming_mip_bias: bool,
}

impl SavedStreamingState {
    /// Records the current flags of `texture`, then overwrites them.
    pub fn capture(texture: &Texture, force_mips_resident: bool, ignore_mip_bias: bool) -> Self {
        let saved = Self {
            force_mips_resident: texture.force_mips_resident(),
            ignore_streaming_mip_bias: texture.ignore_streaming_mip_bias(),
        };
        texture.set_force_mips_resident(force_mips_resident);
        texture.set_ignore_streaming_mip_bias(ignore_mip_bias);
        saved
    }

    pub fn revert(&self, texture: &Texture) {
        texture.set_force_mips_resident(self.force_mips_resident);
        texture.set_ignore_streaming_mip_bias(self.ignore_streaming_mip_bias);
    }
}

// ─── Internal Types ──────────────────────────────────────────────────────────

struct ActiveDrawTarget {
    surface: PooledSurface,
    canvas: Canvas,
}

#[derive(Default)]
struct ScopeFrame {
    pool: Option<ResourcePool>,
    draw_targets: FxHashMap<DrawTargetHandle, ActiveDrawTarget>,
    /// Keyed by texture id.
    resident: FxHashMap<u64, (Texture, SavedStreamingState)>,
    temporaries: Vec<Texture>,
    held_surfaces: Vec<PooledSurface>,
}

impl ScopeFrame {
    fn with_pool(pool: ResourcePool) -> Self {
        Self {
            pool: Some(pool),
            ..Default::default()
        }
    }
}

/// Nearest dedicated pool among `frames`, else `root`.
fn pool_for<'a>(frames: &'a mut [ScopeFrame], root: &'a mut ResourcePool) -> &'a mut ResourcePool {
    frames
        .iter_mut()
        .rev()
        .find_map(|frame| frame.pool.as_mut())
        .unwrap_or(root)
}

// ─── Scope Stack ─────────────────────────────────────────────────────────────

/// Stack of render scopes sharing one backend, pool and derived-art cache.
///
/// The root scope is always present. Dropping the stack closes every frame
/// and destroys all pooled surfaces.
pub struct RenderScopeStack {
    backend: Box<dyn GpuBackend>,
    pool: ResourcePool,
    derived_art: DerivedArtCache,
    frames: SmallVec<[ScopeFrame; 4]>,
    max_dimension: u32,
    derived_art_mode: DerivedArtMode,
    next_draw_target: u64,
}

impl RenderScopeStack {
    #[must_use]
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        Self::with_limits(backend, DEFAULT_MAX_OUTPUT_DIMENSION, DerivedArtMode::default())
    }

    #[must_use]
    pub fn from_settings(backend: Box<dyn GpuBackend>, settings: &BakerSettings) -> Self {
        Self::with_limits(
            backend,
            settings.max_output_dimension,
            settings.derived_art_mode,
        )
    }

    /// `max_dimension` is clamped to what the backend supports.
    #[must_use]
    pub fn with_limits(
        backend: Box<dyn GpuBackend>,
        max_dimension: u32,
        derived_art_mode: DerivedArtMode,
    ) -> Self {
        let max_dimension = max_dimension.min(backend.max_surface_dimension());
        let mut frames = SmallVec::new();
        frames.push(ScopeFrame::default());
        Self {
            backend,
            pool: ResourcePool::new(),
            derived_art: DerivedArtCache::new(),
            frames,
            max_dimension,
            derived_art_mode,
            next_draw_target: 0,
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn GpuBackend {
        self.backend.as_mut()
    }

    /// The top-level pool.
    #[must_use]
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// The pool the current scope allocates from.
    #[must_use]
    pub fn current_pool(&self) -> &ResourcePool {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.pool.as_ref())
            .unwrap_or(&self.pool)
    }

    /// Destroys idle surfaces of the top-level pool beyond `keep`.
    pub fn trim_pool(&mut self, keep: usize) -> usize {
        self.pool.trim(self.backend.as_mut(), keep)
    }

    #[must_use]
    pub fn derived_art_cache(&self) -> &DerivedArtCache {
        &self.derived_art
    }

    pub fn derived_art_cache_mut(&mut self) -> &mut DerivedArtCache {
        &mut self.derived_art
    }

    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Nesting depth; `0` at the root scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Number of draw targets open across all scopes.
    #[must_use]
    pub fn active_draw_targets(&self) -> usize {
        self.frames.iter().map(|f| f.draw_targets.len()).sum()
    }

    /// Number of temporary textures tracked by the current scope.
    #[must_use]
    pub fn temporary_textures(&self) -> usize {
        self.top().temporaries.len()
    }

    fn top(&self) -> &ScopeFrame {
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    // ── Scope Entry / Exit ─────────────────────────────────────────────────

    /// Opens a child scope that closes when the guard drops.
    pub fn enter_scope(&mut self) -> ScopeGuard<'_> {
        let depth = self.frames.len();
        self.push_scope();
        ScopeGuard { stack: self, depth }
    }

    /// Opens a child scope with its own pool. The pool is drained when the
    /// scope closes.
    pub fn enter_scope_with_pool(&mut self, pool: ResourcePool) -> ScopeGuard<'_> {
        let depth = self.frames.len();
        self.frames.push(ScopeFrame::with_pool(pool));
        log::debug!("Entered render scope {} (dedicated pool)", self.depth());
        ScopeGuard { stack: self, depth }
    }

    /// Opens a child scope without a guard. Pair with [`pop_scope`](Self::pop_scope).
    pub fn push_scope(&mut self) {
        self.frames.push(ScopeFrame::default());
        log::debug!("Entered render scope {}", self.depth());
    }

    /// Closes the current scope. The root scope cannot be closed; returns
    /// `false` in that case.
    pub fn pop_scope(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.close_top_frame();
        true
    }

    /// Closes scopes until the nesting depth is at most `depth`. Returns the
    /// number of scopes closed.
    pub fn pop_to_depth(&mut self, depth: usize) -> usize {
        let mut closed = 0;
        while self.depth() > depth && self.pop_scope() {
            closed += 1;
        }
        closed
    }

    fn close_top_frame(&mut self) {
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        let depth = self.frames.len();
        let Self {
            backend,
            pool,
            derived_art,
            frames,
            ..
        } = &mut *self;
        let backend = backend.as_mut();

        {
            let target_pool = match frame.pool.as_mut() {
                Some(dedicated) => dedicated,
                None => pool_for(frames, pool),
            };

            for (_, mut target) in frame.draw_targets.drain() {
                if let Err(e) = target.canvas.flush(backend, &target.surface) {
                    log::warn!("Failed to flush draw target during scope teardown: {e}");
                }
                target_pool.release_canvas(target.canvas);
                target_pool.release_surface(target.surface);
            }
            for surface in frame.held_surfaces.drain(..) {
                target_pool.release_surface(surface);
            }
        }

        for (_, (texture, saved)) in frame.resident.drain() {
            saved.revert(&texture);
        }
        for texture in frame.temporaries.drain(..) {
            derived_art.release(&texture);
            texture.release();
        }

        if let Some(mut dedicated) = frame.pool.take() {
            if dedicated.outstanding_surfaces() > 0 {
                log::warn!(
                    "Dedicated pool closed with {} surface(s) still handed out",
                    dedicated.outstanding_surfaces()
                );
            }
            dedicated.drain(backend);
        }
        log::debug!("Exited render scope {depth}");
    }

    // ── Draw Targets ───────────────────────────────────────────────────────

    /// Acquires and clears a surface and opens a canvas on it.
    ///
    /// `format` is the image format; the surface uses its
    /// [render target format](PixelFormat::render_target_format).
    pub fn create_draw_target(
        &mut self,
        size: UVec2,
        format: PixelFormat,
        srgb: bool,
        clear_color: Vec4,
    ) -> Result<DrawTargetHandle> {
        let desc = SurfaceDescriptor::from_size(
            size,
            format.render_target_format(),
            srgb && format.supports_srgb(),
        );
        desc.validate(self.max_dimension)?;

        let Self {
            backend,
            pool,
            frames,
            ..
        } = &mut *self;
        let backend = backend.as_mut();
        let pool = pool_for(frames, pool);

        let surface = pool.acquire_surface(backend, &desc)?;
        if let Err(e) = backend.clear_surface(surface.key(), clear_color) {
            pool.release_surface(surface);
            return Err(e);
        }
        let mut canvas = pool.acquire_canvas();
        canvas.bind(desc);

        self.next_draw_target += 1;
        let handle = DrawTargetHandle(self.next_draw_target);
        self.top_mut()
            .draw_targets
            .insert(handle, ActiveDrawTarget { surface, canvas });
        Ok(handle)
    }

    /// The canvas of an active draw target in any open scope.
    pub fn canvas(&mut self, handle: DrawTargetHandle) -> Option<&mut Canvas> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.draw_targets.get_mut(&handle))
            .map(|target| &mut target.canvas)
    }

    #[must_use]
    pub fn is_draw_target_active(&self, handle: DrawTargetHandle) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.draw_targets.contains_key(&handle))
    }

    /// Removes a draw target from whichever frame holds it.
    fn take_draw_target(&mut self, handle: DrawTargetHandle) -> Option<(usize, ActiveDrawTarget)> {
        self.frames
            .iter_mut()
            .enumerate()
            .rev()
            .find_map(|(index, frame)| frame.draw_targets.remove(&handle).map(|t| (index, t)))
    }

    /// Flushes, fences and reads back a draw target, then returns its
    /// resources to the pool. The pixels become a temporary texture of the
    /// scope that opened the target.
    ///
    /// Returns `Ok(None)` for an unknown handle.
    pub fn resolve_draw_target(&mut self, handle: DrawTargetHandle) -> Result<Option<Texture>> {
        let Some((index, mut target)) = self.take_draw_target(handle) else {
            return Ok(None);
        };
        let desc = *target.surface.descriptor();

        let pixels = self.read_back(&mut target.canvas, &target.surface);
        self.return_draw_target(index, target);
        let pixels = pixels?;

        let texture = Texture::from_pixels(
            "Resolved Draw Target",
            desc.width,
            desc.height,
            desc.format,
            pixels,
            TextureSettings::transient(desc.srgb),
        )?;
        self.frames[index].temporaries.push(texture.clone());
        Ok(Some(texture))
    }

    /// Flushes and fences a draw target and hands its surface to the caller,
    /// who becomes responsible for returning it with
    /// [`return_surface`](Self::return_surface) or
    /// [`adopt_surface`](Self::adopt_surface).
    pub fn resolve_draw_target_as_surface(
        &mut self,
        handle: DrawTargetHandle,
    ) -> Result<Option<PooledSurface>> {
        let Some((index, mut target)) = self.take_draw_target(handle) else {
            return Ok(None);
        };

        let flushed = target
            .canvas
            .flush(self.backend.as_mut(), &target.surface)
            .and_then(|()| self.backend.wait_idle());

        let pool = pool_for(&mut self.frames[..=index], &mut self.pool);
        pool.release_canvas(target.canvas);
        if let Err(e) = flushed {
            pool.release_surface(target.surface);
            return Err(e);
        }
        Ok(Some(target.surface))
    }

    /// Flushes a draw target and returns its resources to the pool without
    /// reading it back. Returns `false` for an unknown handle.
    pub fn discard_draw_target(&mut self, handle: DrawTargetHandle) -> bool {
        let Some((index, mut target)) = self.take_draw_target(handle) else {
            return false;
        };
        if let Err(e) = target.canvas.flush(self.backend.as_mut(), &target.surface) {
            log::warn!("Failed to flush discarded draw target: {e}");
        }
        self.return_draw_target(index, target);
        true
    }

    fn read_back(&mut self, canvas: &mut Canvas, surface: &PooledSurface) -> Result<Vec<u8>> {
        let backend = self.backend.as_mut();
        canvas.flush(backend, surface)?;
        backend.wait_idle()?;
        backend.read_pixels(surface.key())
    }

    fn return_draw_target(&mut self, index: usize, target: ActiveDrawTarget) {
        let pool = pool_for(&mut self.frames[..=index], &mut self.pool);
        pool.release_canvas(target.canvas);
        pool.release_surface(target.surface);
    }

    // ── Surfaces ───────────────────────────────────────────────────────────

    /// Acquires a surface owned by the current scope, optionally cleared.
    pub fn create_temporary_surface(
        &mut self,
        size: UVec2,
        format: PixelFormat,
        srgb: bool,
        clear_color: Option<Vec4>,
    ) -> Result<SurfaceKey> {
        let desc = SurfaceDescriptor::from_size(size, format, srgb && format.supports_srgb());
        desc.validate(self.max_dimension)?;

        let Self {
            backend,
            pool,
            frames,
            ..
        } = &mut *self;
        let backend = backend.as_mut();
        let pool = pool_for(frames, pool);

        let surface = pool.acquire_surface(backend, &desc)?;
        if let Some(color) = clear_color
            && let Err(e) = backend.clear_surface(surface.key(), color)
        {
            pool.release_surface(surface);
            return Err(e);
        }
        let key = surface.key();
        self.top_mut().held_surfaces.push(surface);
        Ok(key)
    }

    /// Moves a surface into the current scope; it is returned to the pool
    /// when the scope closes.
    pub fn adopt_surface(&mut self, surface: PooledSurface) -> SurfaceKey {
        let key = surface.key();
        self.top_mut().held_surfaces.push(surface);
        key
    }

    /// Returns a surface the caller owns to the current scope's pool.
    pub fn return_surface(&mut self, surface: PooledSurface) -> bool {
        pool_for(&mut self.frames, &mut self.pool).release_surface(surface)
    }

    /// Returns a scope-held surface to the pool early. Unknown keys are
    /// ignored.
    pub fn release_surface(&mut self, key: SurfaceKey) -> bool {
        let found = self.frames.iter().enumerate().rev().find_map(|(index, frame)| {
            frame
                .held_surfaces
                .iter()
                .position(|s| s.key() == key)
                .map(|position| (index, position))
        });
        let Some((index, position)) = found else {
            return false;
        };
        let surface = self.frames[index].held_surfaces.swap_remove(position);
        pool_for(&mut self.frames[..=index], &mut self.pool).release_surface(surface)
    }

    fn held_surface(&self, key: SurfaceKey) -> Option<SurfaceDescriptor> {
        self.frames
            .iter()
            .flat_map(|frame| frame.held_surfaces.iter())
            .find(|s| s.key() == key)
            .map(|s| *s.descriptor())
    }

    /// Fenced readback of a scope-held surface.
    pub fn read_surface(&mut self, key: SurfaceKey) -> Result<Option<Vec<u8>>> {
        if self.held_surface(key).is_none() {
            return Ok(None);
        }
        self.backend.submit()?;
        self.backend.wait_idle()?;
        self.backend.read_pixels(key).map(Some)
    }

    /// Copies a scope-held surface into a new temporary texture.
    pub fn create_texture_from_surface(&mut self, key: SurfaceKey) -> Result<Option<Texture>> {
        let Some(desc) = self.held_surface(key) else {
            return Ok(None);
        };
        let Some(pixels) = self.read_surface(key)? else {
            return Ok(None);
        };
        let texture = Texture::from_pixels(
            "Surface Copy",
            desc.width,
            desc.height,
            desc.format,
            pixels,
            TextureSettings::transient(desc.srgb),
        )?;
        self.top_mut().temporaries.push(texture.clone());
        Ok(Some(texture))
    }

    // ── Texture Helpers ────────────────────────────────────────────────────

    /// Renders `source` into a new temporary texture of `size`, in the
    /// source's format.
    ///
    /// Returns `Ok(None)` for an invalid source or a size outside
    /// `1..=max_dimension`.
    pub fn create_resized_texture(
        &mut self,
        source: &Texture,
        size: UVec2,
        mip_gen: MipGenSettings,
    ) -> Result<Option<Texture>> {
        if !source.is_source_valid()
            || size.min_element() == 0
            || size.max_element() > self.max_dimension
        {
            return Ok(None);
        }
        let format = source.format();
        let srgb = source.settings().srgb && format.supports_srgb();

        let handle = self.create_draw_target(size, format, srgb, Vec4::ZERO)?;
        if let Some(canvas) = self.canvas(handle) {
            canvas.draw_texture_fullscreen(source);
        }
        let Some((index, mut target)) = self.take_draw_target(handle) else {
            return Ok(None);
        };
        let surface_format = target.surface.descriptor().format;

        let pixels = self.read_back(&mut target.canvas, &target.surface);
        self.return_draw_target(index, target);
        let pixels = convert_pixels(&pixels?, surface_format, format, srgb);

        let texture = Texture::from_pixels(
            &format!("{} ({}x{})", source.label(), size.x, size.y),
            size.x,
            size.y,
            format,
            pixels,
            TextureSettings {
                mip_gen,
                ..TextureSettings::transient(source.settings().srgb)
            },
        )?;
        self.top_mut().temporaries.push(texture.clone());
        Ok(Some(texture))
    }

    /// Renders the size of source mip `mip_index` into a new temporary
    /// texture.
    pub fn downsample_texture(
        &mut self,
        source: &Texture,
        mip_index: u32,
        mip_gen: MipGenSettings,
    ) -> Result<Option<Texture>> {
        let imported = source.imported_size();
        if imported.min_element() == 0 {
            return Ok(None);
        }
        let size = UVec2::new(
            imported.x.checked_shr(mip_index).unwrap_or(0).max(1),
            imported.y.checked_shr(mip_index).unwrap_or(0).max(1),
        );
        self.create_resized_texture(source, size, mip_gen)
    }

    /// Derived art for `source` using the stack's [`DerivedArtMode`].
    pub fn derived_art(
        &mut self,
        source: &Texture,
        requirements: &ResourceRequirements,
    ) -> Option<Texture> {
        self.derived_art
            .get_or_create_with_mode(source, requirements, self.derived_art_mode)
    }

    /// Derived art for `source`, pinned resident for the current scope.
    pub fn prepare_texture(
        &mut self,
        source: &Texture,
        requirements: &ResourceRequirements,
    ) -> Option<Texture> {
        let texture = self.derived_art(source, requirements)?;
        self.set_mips_resident(&texture, true);
        Some(texture)
    }

    // ── Residency ──────────────────────────────────────────────────────────

    /// Pins or unpins full mip residency for the current scope.
    ///
    /// Pinning a texture already pinned by this or an enclosing scope does
    /// nothing, so the saved state is always the one captured by the first
    /// pin. Unpinning restores that state. Returns `true` if anything
    /// changed.
    pub fn set_mips_resident(&mut self, texture: &Texture, resident: bool) -> bool {
        if resident {
            if self.is_texture_pinned(texture) {
                return false;
            }
            let saved = SavedStreamingState::capture(texture, true, true);
            self.top_mut()
                .resident
                .insert(texture.id(), (texture.clone(), saved));
            true
        } else if let Some((texture, saved)) = self.top_mut().resident.remove(&texture.id()) {
            saved.revert(&texture);
            true
        } else {
            false
        }
    }

    /// Returns `true` if this or any enclosing scope pins `texture`.
    #[must_use]
    pub fn is_texture_pinned(&self, texture: &Texture) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.resident.contains_key(&texture.id()))
    }

    /// Saved streaming state of a pinned texture.
    #[must_use]
    pub fn saved_streaming_state(&self, texture: &Texture) -> Option<SavedStreamingState> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.resident.get(&texture.id()))
            .map(|(_, saved)| *saved)
    }

    // ── Release ────────────────────────────────────────────────────────────

    /// Releases a temporary or derived-art texture early. Releasing an
    /// unknown texture is a no-op returning `false`.
    pub fn release_texture(&mut self, texture: &Texture) -> bool {
        let mut released = self.derived_art.release(texture);
        for frame in self.frames.iter_mut().rev() {
            if let Some(index) = frame.temporaries.iter().position(|t| t == texture) {
                frame.temporaries.remove(index).release();
                released = true;
                break;
            }
        }
        released
    }

    /// Moves a temporary texture from the current scope to its parent so it
    /// outlives the current scope. Returns `false` at the root scope or if
    /// the texture is not a temporary of the current scope.
    pub fn hand_up_texture(&mut self, texture: &Texture) -> bool {
        let len = self.frames.len();
        if len < 2 {
            return false;
        }
        let Some(index) = self.frames[len - 1]
            .temporaries
            .iter()
            .position(|t| t == texture)
        else {
            return false;
        };
        let texture = self.frames[len - 1].temporaries.remove(index);
        self.frames[len - 2].temporaries.push(texture);
        true
    }
}

impl Drop for RenderScopeStack {
    fn drop(&mut self) {
        while !self.frames.is_empty() {
            self.close_top_frame();
        }
        if self.pool.outstanding_surfaces() > 0 {
            log::warn!(
                "Render scopes dropped with {} surface(s) still handed out",
                self.pool.outstanding_surfaces()
            );
        }
        self.pool.drain(self.backend.as_mut());
        self.derived_art.clear();
    }
}

// ─── Scope Guard ─────────────────────────────────────────────────────────────

/// Closes the scope it opened (and any left open inside it) on drop.
pub struct ScopeGuard<'a> {
    stack: &'a mut RenderScopeStack,
    depth: usize,
}

impl Deref for ScopeGuard<'_> {
    type Target = RenderScopeStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        while self.stack.frames.len() > self.depth.max(1) {
            self.stack.close_top_frame();
        }
    }
}
