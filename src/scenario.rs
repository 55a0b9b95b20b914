//! Bake scenarios.
//!
//! A [`Scenario`] describes a set of named outputs and how to draw each one.
//! The render context clones the scenario it is given, so a template can be
//! configured once and baked many times.
//!
//! ```rust,ignore
//! #[derive(Clone)]
//! struct Solid;
//!
//! impl Scenario for Solid {
//!     fn name(&self) -> &str { "Solid" }
//!
//!     fn register_outputs(&self, directory: &str) -> Vec<OutputWriteout> {
//!         let fill: RenderCallback = Box::new(|_, _, target| {
//!             target.fill(Vec4::new(1.0, 0.5, 0.0, 1.0));
//!             true
//!         });
//!         vec![OutputWriteout::in_directory(
//!             "Albedo",
//!             directory,
//!             "T_Solid_Albedo",
//!             OutputInfo::new(256, 256, PixelFormat::Bgra8),
//!             Some(fill),
//!         )]
//!     }
//! }
//! ```

use crate::renderer::context::DrawTarget;
use crate::renderer::scope::RenderScopeStack;
use crate::resources::output::{OutputInfo, OutputWriteout};

/// Draws one output. Receives the output spec, the preview flag and the
/// draw target; returns `false` to reject the result.
pub type RenderCallback = Box<dyn FnMut(&OutputInfo, bool, &mut DrawTarget<'_>) -> bool>;

/// A scripted render-to-texture setup.
pub trait Scenario {
    /// Display name used in logs and reports.
    fn name(&self) -> &str;

    /// Returns `false` if the scenario is misconfigured and must not bake.
    fn settings_are_valid(&self) -> bool {
        true
    }

    /// Declares every output this scenario can produce. Outputs without a
    /// render callback are dropped by the caller.
    fn register_outputs(&self, directory: &str) -> Vec<OutputWriteout>;

    /// Shared setup run once before any output is baked.
    fn prepare_common(&mut self, scopes: &mut RenderScopeStack, is_preview: bool) -> bool {
        let _ = (scopes, is_preview);
        true
    }
}
