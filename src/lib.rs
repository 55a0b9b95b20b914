#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Scoped render-target pooling, derived-art caching and texture bake
//! orchestration.
//!
//! A [`Scenario`] registers named outputs; a [`RenderContext`] bakes them
//! through a [`RenderScopeStack`] that recycles surfaces from a
//! [`ResourcePool`] and guarantees their return when each scope closes.
//! [`execute_bake`] runs a whole batch and hands the results to an
//! [`AssetWriter`].

pub mod backend;
pub mod baker;
pub mod errors;
pub mod persistence;
pub mod renderer;
pub mod resources;
pub mod scenario;
pub mod settings;

pub use backend::{GpuBackend, Region, SoftwareBackend, SurfaceKey, WgpuBackend};
pub use baker::{BakeReport, FailedOutput, WrittenAsset, execute_bake};
pub use errors::{BakeError, Result};
pub use persistence::{AssetWriter, ImageAssetWriter};
pub use renderer::{
    Canvas, DerivedArtCache, DrawTarget, DrawTargetHandle, PooledSurface, RenderContext,
    RenderResult, RenderScopeStack, ResolvedImage, ResourcePool, ScopeGuard,
};
pub use resources::{
    DerivedArtMode, MipGenSettings, OutputInfo, OutputWriteout, PixelFormat, ResourceRequirements,
    SourceArt, SurfaceDescriptor, Texture, TextureSettings,
};
pub use scenario::{RenderCallback, Scenario};
pub use settings::BakerSettings;
