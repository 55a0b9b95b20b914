//! Render Scope & Pooling
//!
//! ```text
//! RenderContext (bake driver)
//!   └── RenderScopeStack
//!         ├── ResourcePool      surfaces + canvases
//!         ├── DerivedArtCache   content-checked texture cache
//!         └── [ScopeFrame]      per-scope draw targets, pins, temporaries
//! ```

pub mod canvas;
pub mod context;
pub mod derived_art;
pub mod pool;
pub mod scope;

pub use canvas::{Canvas, DrawCommand, PLACEHOLDER_COLOR};
pub use context::{DrawTarget, RenderContext, RenderResult, ResolvedImage};
pub use derived_art::{DerivedArtCache, DerivedArtKey};
pub use pool::{PooledSurface, ResourcePool};
pub use scope::{DrawTargetHandle, RenderScopeStack, SavedStreamingState, ScopeGuard};
