//! Bake Driver
//!
//! [`RenderContext`] owns a cloned scenario, its registered outputs and the
//! scope stack, and turns queued output names into [`RenderResult`]s.
//!
//! # Output lifecycle
//!
//! ```text
//! Registered ──queue()──► Queued ──bake_output()──► Rendering ─┬─► Resolved
//!                                                               └─► Failed
//! ```
//!
//! Per-output problems (bad spec, bad path, callback returned `false`) yield
//! an invalid result and never abort the batch. Only errors for which
//! [`BakeError::is_fatal`](crate::BakeError::is_fatal) holds are returned as `Err`.

use glam::{UVec2, Vec4};

use crate::backend::{GpuBackend, Region};
use crate::errors::Result;
use crate::renderer::canvas::Canvas;
use crate::renderer::scope::{DrawTargetHandle, RenderScopeStack};
use crate::resources::format::{PixelFormat, convert_pixels};
use crate::resources::output::{OutputInfo, OutputWriteout, validate_asset_path};
use crate::resources::texture::Texture;
use crate::scenario::Scenario;
use crate::settings::BakerSettings;

// ─── Draw Target ─────────────────────────────────────────────────────────────

/// What a render callback draws into.
///
/// Wraps the output's draw target together with the scope stack, so
/// callbacks can open nested scopes, prepare source textures and create
/// intermediate targets of their own.
pub struct DrawTarget<'a> {
    scopes: &'a mut RenderScopeStack,
    handle: DrawTargetHandle,
    size: UVec2,
}

impl<'a> DrawTarget<'a> {
    pub fn new(scopes: &'a mut RenderScopeStack, handle: DrawTargetHandle, size: UVec2) -> Self {
        Self {
            scopes,
            handle,
            size,
        }
    }

    #[must_use]
    pub fn handle(&self) -> DrawTargetHandle {
        self.handle
    }

    #[must_use]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// The canvas, or `None` if the callback already resolved the target.
    pub fn canvas(&mut self) -> Option<&mut Canvas> {
        self.scopes.canvas(self.handle)
    }

    pub fn scopes(&mut self) -> &mut RenderScopeStack {
        &mut *self.scopes
    }

    /// Fills the whole target.
    pub fn fill(&mut self, color: Vec4) {
        if let Some(canvas) = self.canvas() {
            canvas.clear(color);
        }
    }

    pub fn fill_rect(&mut self, region: Region, color: Vec4) {
        if let Some(canvas) = self.canvas() {
            canvas.fill_rect(region, color);
        }
    }

    /// Stretches `texture` over the whole target.
    pub fn draw_texture(&mut self, texture: &Texture) {
        if let Some(canvas) = self.canvas() {
            canvas.draw_texture_fullscreen(texture);
        }
    }
}

// ─── Render Result ───────────────────────────────────────────────────────────

/// Read-back pixels of a baked output, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub srgb: bool,
    pub data: Vec<u8>,
}

impl ResolvedImage {
    /// Decoded linear colour at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        self.data
            .get(offset..offset + bpp)
            .map(|texel| self.format.decode(texel, self.srgb))
    }

    /// Raw bytes of the pixel at `(x, y)`.
    #[must_use]
    pub fn pixel_bytes(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        self.data.get(offset..offset + bpp)
    }
}

/// Outcome of baking one output.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub output_name: String,
    pub asset_path: String,
    pub info: OutputInfo,
    /// `None` when the bake failed.
    pub image: Option<ResolvedImage>,
}

impl RenderResult {
    fn failed(output_name: &str, asset_path: &str, info: OutputInfo) -> Self {
        Self {
            output_name: output_name.to_string(),
            asset_path: asset_path.to_string(),
            info,
            image: None,
        }
    }

    /// Image data present, destination path well formed and each axis in
    /// `1..=max_dimension`.
    #[must_use]
    pub fn is_valid(&self, max_dimension: u32) -> bool {
        self.image.as_ref().is_some_and(|image| !image.data.is_empty())
            && validate_asset_path(&self.asset_path).is_ok()
            && self.info.is_valid(max_dimension)
    }
}

// ─── Render Context ──────────────────────────────────────────────────────────

/// Drives the bake of one scenario.
pub struct RenderContext {
    scenario: Box<dyn Scenario>,
    /// Bound outputs in registration order; names are unique.
    outputs: Vec<OutputWriteout>,
    queue: Vec<String>,
    scopes: RenderScopeStack,
    output_directory: String,
    settings: BakerSettings,
    prepared: Option<bool>,
}

impl RenderContext {
    /// Clones `template` and registers its bound outputs against
    /// `output_directory`.
    pub fn new<S>(
        template: &S,
        output_directory: &str,
        backend: Box<dyn GpuBackend>,
        settings: BakerSettings,
    ) -> Self
    where
        S: Scenario + Clone + 'static,
    {
        let scenario: Box<dyn Scenario> = Box::new(template.clone());

        let mut outputs: Vec<OutputWriteout> = Vec::new();
        for output in scenario.register_outputs(output_directory) {
            if !output.is_bound() {
                log::debug!(
                    "Dropping output '{}' of '{}': no render callback",
                    output.name,
                    scenario.name()
                );
                continue;
            }
            if outputs.iter().any(|o| o.name == output.name) {
                log::warn!(
                    "Duplicate output name '{}' in '{}', keeping the first",
                    output.name,
                    scenario.name()
                );
                continue;
            }
            outputs.push(output);
        }

        log::info!(
            "Render context for '{}' registered {} output(s)",
            scenario.name(),
            outputs.len()
        );

        Self {
            scenario,
            outputs,
            queue: Vec::new(),
            scopes: RenderScopeStack::from_settings(backend, &settings),
            output_directory: output_directory.to_string(),
            settings,
            prepared: None,
        }
    }

    #[must_use]
    pub fn scenario(&self) -> &dyn Scenario {
        self.scenario.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &BakerSettings {
        &self.settings
    }

    #[must_use]
    pub fn output_directory(&self) -> &str {
        &self.output_directory
    }

    /// Registered output names in registration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|o| o.name.as_str())
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputWriteout> {
        self.outputs.iter().find(|o| o.name == name)
    }

    #[must_use]
    pub fn scopes(&self) -> &RenderScopeStack {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut RenderScopeStack {
        &mut self.scopes
    }

    // ── Queue ──────────────────────────────────────────────────────────────

    /// Marks a registered output for baking. Queuing twice keeps the first
    /// position. Returns `false` for an unknown name.
    pub fn queue(&mut self, name: &str) -> bool {
        if self.output(name).is_none() {
            log::warn!("Cannot queue unknown output '{name}'");
            return false;
        }
        if !self.queue.iter().any(|q| q == name) {
            self.queue.push(name.to_string());
        }
        true
    }

    /// Queues every registered output.
    pub fn queue_all(&mut self) {
        let names: Vec<String> = self.outputs.iter().map(|o| o.name.clone()).collect();
        for name in names {
            self.queue(&name);
        }
    }

    #[must_use]
    pub fn queued(&self) -> &[String] {
        &self.queue
    }

    /// Detaches an output's render callback. The output stays registered
    /// and bakes as a placeholder.
    pub fn unbind_output(&mut self, name: &str) -> bool {
        match self.outputs.iter_mut().find(|o| o.name == name) {
            Some(output) => output.on_render.take().is_some(),
            None => false,
        }
    }

    // ── Scopes ─────────────────────────────────────────────────────────────

    pub fn enter_render_scope(&mut self) {
        self.scopes.push_scope();
    }

    /// Returns `false` at the root scope.
    pub fn exit_render_scope(&mut self) -> bool {
        self.scopes.pop_scope()
    }

    // ── Baking ─────────────────────────────────────────────────────────────

    /// Runs the scenario's shared setup. Only the first call invokes the
    /// hook; later calls return its cached result.
    pub fn prepare(&mut self) -> bool {
        if let Some(prepared) = self.prepared {
            return prepared;
        }
        let prepared = self
            .scenario
            .prepare_common(&mut self.scopes, self.settings.preview);
        if !prepared {
            log::warn!("Shared setup of '{}' failed", self.scenario.name());
        }
        self.prepared = Some(prepared);
        prepared
    }

    /// Renders one output in the current scope.
    ///
    /// An output without a handler renders the placeholder pattern.
    pub fn bake_output(&mut self, name: &str) -> Result<RenderResult> {
        let Some(index) = self.outputs.iter().position(|o| o.name == name) else {
            log::warn!("Cannot bake unknown output '{name}'");
            return Ok(RenderResult::failed(name, "", OutputInfo::default()));
        };
        let max = self.scopes.max_dimension();
        let output = &mut self.outputs[index];
        let info = output.info.clone();
        let asset_path = output.asset_path.clone();

        if !info.is_valid(max) {
            log::warn!("Output '{name}' has an invalid spec: {info}");
            return Ok(RenderResult::failed(name, &asset_path, info));
        }
        if let Err(e) = validate_asset_path(&asset_path) {
            log::warn!("Output '{name}': {e}");
            return Ok(RenderResult::failed(name, &asset_path, info));
        }

        let handle = match self.scopes.create_draw_target(
            info.dimensions,
            info.format,
            info.srgb,
            info.default_color,
        ) {
            Ok(handle) => handle,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Output '{name}': {e}");
                return Ok(RenderResult::failed(name, &asset_path, info));
            }
        };

        let rendered = match output.on_render.as_mut() {
            Some(on_render) => {
                let mut target = DrawTarget::new(&mut self.scopes, handle, info.dimensions);
                on_render(&info, self.settings.preview, &mut target)
            }
            None => {
                log::warn!("Output '{name}' has no handler, baking placeholder");
                let cell = self.settings.placeholder_cell;
                if let Some(canvas) = self.scopes.canvas(handle) {
                    canvas.draw_placeholder(
                        Region::full(info.dimensions.x, info.dimensions.y),
                        cell,
                    );
                }
                true
            }
        };

        if !rendered {
            log::warn!("Render callback of '{name}' rejected the output");
            self.scopes.discard_draw_target(handle);
            return Ok(RenderResult::failed(name, &asset_path, info));
        }

        let image = match self.read_draw_target(handle, &info) {
            Ok(image) => image,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Output '{name}': {e}");
                None
            }
        };
        if image.is_none() {
            log::warn!("Output '{name}' produced no image");
        }

        Ok(RenderResult {
            output_name: name.to_string(),
            asset_path,
            info,
            image,
        })
    }

    /// Resolves a draw target and reads it back in the output's format.
    fn read_draw_target(
        &mut self,
        handle: DrawTargetHandle,
        info: &OutputInfo,
    ) -> Result<Option<ResolvedImage>> {
        let Some(surface) = self.scopes.resolve_draw_target_as_surface(handle)? else {
            return Ok(None);
        };
        let desc = *surface.descriptor();

        // The scope owns the surface until it is released below.
        let key = self.scopes.adopt_surface(surface);
        let pixels = self.scopes.read_surface(key);
        self.scopes.release_surface(key);
        let Some(pixels) = pixels? else {
            return Ok(None);
        };

        Ok(Some(ResolvedImage {
            width: desc.width,
            height: desc.height,
            format: info.format,
            srgb: desc.srgb,
            data: convert_pixels(&pixels, desc.format, info.format, desc.srgb),
        }))
    }

    /// Bakes every queued output in order, each inside its own child scope.
    ///
    /// Stops at the first fatal error.
    pub fn bake_queued(&mut self) -> Result<Vec<RenderResult>> {
        let queue = self.queue.clone();
        let mut results = Vec::with_capacity(queue.len());
        for name in &queue {
            let depth = self.scopes.depth();
            self.scopes.push_scope();
            let result = self.bake_output(name);
            // Also closes scopes a callback left open.
            self.scopes.pop_to_depth(depth);
            match result {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::error!("Baking '{name}' failed: {e}");
                    return Err(e);
                }
            }
        }
        self.scopes.trim_pool(self.settings.max_idle_surfaces);
        Ok(results)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("scenario", &self.scenario.name())
            .field("outputs", &self.outputs)
            .field("queue", &self.queue)
            .field("output_directory", &self.output_directory)
            .finish_non_exhaustive()
    }
}

