//! Resource types shared by the pool, cache and bake driver.

pub mod format;
pub mod output;
pub mod requirements;
pub mod texture;

pub use format::{PixelFormat, SurfaceDescriptor, convert_pixels};
pub use output::{
    DEFAULT_MAX_OUTPUT_DIMENSION, Normalization, OutputInfo, OutputWriteout, PowerOfTwoMode,
    validate_asset_path,
};
pub use requirements::{DerivedArtMode, MipGenSettings, ResourceRequirements};
pub use texture::{CompressionSettings, SourceArt, Texture, TextureSettings};
