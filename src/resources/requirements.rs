//! Resource requirements for derived art.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::resources::texture::Texture;

/// Mip chain generation policy carried by textures and requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MipGenSettings {
    #[default]
    FromTextureGroup,
    Simple,
    Sharpen,
    Blur,
    NoMipmaps,
    /// Keep whatever the source already has. As a requirement, this accepts
    /// any mip policy.
    LeaveExistingMips,
}

/// What a render operation needs from a source texture before it can sample it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Sample at the imported (source art) resolution rather than the
    /// streamed/clamped runtime size.
    pub use_imported_resolution: bool,
    /// Sample uncompressed data.
    pub require_uncompressed: bool,
    pub mip_gen: MipGenSettings,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            use_imported_resolution: true,
            require_uncompressed: true,
            mip_gen: MipGenSettings::LeaveExistingMips,
        }
    }
}

impl ResourceRequirements {
    /// Returns `true` if `texture` can be used as-is.
    #[must_use]
    pub fn is_satisfied_by(&self, texture: &Texture) -> bool {
        if !texture.is_source_valid() {
            return false;
        }
        let settings = texture.settings();
        let size = texture.size();
        let imported = texture.imported_size();

        (!self.require_uncompressed || settings.compression_none)
            && (!self.use_imported_resolution || (size.x >= imported.x && size.y >= imported.y))
            && (self.mip_gen == MipGenSettings::LeaveExistingMips
                || settings.mip_gen == self.mip_gen)
    }
}

bitflags! {
    /// Derived-art lookup behaviour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DerivedArtMode: u8 {
        /// Skip the zero-copy path even when the source already satisfies
        /// the requirements.
        const ALWAYS_CREATE = 1 << 0;
        /// Fall back to the source texture when synthesis fails.
        const FAILSAFE = 1 << 1;
    }
}

impl Default for DerivedArtMode {
    fn default() -> Self {
        Self::FAILSAFE
    }
}
