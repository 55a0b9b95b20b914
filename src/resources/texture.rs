//! Persistent textures and their source art.
//!
//! A [`Texture`] is a cheaply clonable shared handle (like an engine asset
//! reference). Identity is the process-unique `id`; the source art carries a
//! separate stable `Uuid` that survives re-imports and is what derived-art
//! keys are built from.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::UVec2;
use parking_lot::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::errors::{BakeError, Result};
use crate::resources::format::PixelFormat;
use crate::resources::requirements::MipGenSettings;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Block compression policy applied when a texture is cooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionSettings {
    #[default]
    Default,
    NormalMap,
    Masks,
    Grayscale,
    Displacement,
    Hdr,
    UserInterface2D,
    Alpha,
}

impl CompressionSettings {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::NormalMap => "NormalMap",
            Self::Masks => "Masks",
            Self::Grayscale => "Grayscale",
            Self::Displacement => "Displacement",
            Self::Hdr => "HDR",
            Self::UserInterface2D => "UserInterface2D",
            Self::Alpha => "Alpha",
        }
    }
}

// ─── Source Art ──────────────────────────────────────────────────────────────

/// Imported pixel data with its full mip chain.
#[derive(Debug, Clone)]
pub struct SourceArt {
    /// Stable per-asset identifier.
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Mip levels, largest first. Level `n` is `max(1, size >> n)`.
    pub mips: Vec<Vec<u8>>,
}

impl SourceArt {
    /// Builds single-mip source art, validating the buffer length.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        Self::with_mips(Uuid::new_v4(), width, height, format, vec![data])
    }

    /// Builds source art from an explicit mip chain.
    pub fn with_mips(
        id: Uuid,
        width: u32,
        height: u32,
        format: PixelFormat,
        mips: Vec<Vec<u8>>,
    ) -> Result<Self> {
        let art = Self {
            id,
            width,
            height,
            format,
            mips,
        };
        for (level, mip) in art.mips.iter().enumerate() {
            let expected = art.mip_size(level as u32);
            if mip.len() != expected {
                return Err(BakeError::InvalidPixelData {
                    expected,
                    actual: mip.len(),
                });
            }
        }
        Ok(art)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.format != PixelFormat::Invalid
            && !self.mips.is_empty()
    }

    #[must_use]
    pub fn mip_dimensions(&self, level: u32) -> UVec2 {
        UVec2::new(
            (self.width >> level).max(1),
            (self.height >> level).max(1),
        )
    }

    /// Byte size of mip `level`.
    #[must_use]
    pub fn mip_size(&self, level: u32) -> usize {
        let dims = self.mip_dimensions(level);
        self.format.data_size(dims.x, dims.y)
    }

    #[must_use]
    pub fn mip(&self, level: u32) -> Option<&[u8]> {
        self.mips.get(level as usize).map(Vec::as_slice)
    }

    #[must_use]
    pub fn num_mips(&self) -> u32 {
        self.mips.len() as u32
    }
}

// ─── Texture Settings ────────────────────────────────────────────────────────

/// Cook/sampling attributes of a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSettings {
    pub srgb: bool,
    pub compression: CompressionSettings,
    /// Skip block compression entirely.
    pub compression_none: bool,
    pub compress_without_alpha: bool,
    pub mip_gen: MipGenSettings,
    pub filter: wgpu::FilterMode,
    pub address_x: wgpu::AddressMode,
    pub address_y: wgpu::AddressMode,
    pub flip_green_channel: bool,
    /// Clamp on the runtime size; `0` means unlimited.
    pub max_texture_size: u32,
    /// Number of top mips dropped at runtime.
    pub lod_bias: u32,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            srgb: true,
            compression: CompressionSettings::Default,
            compression_none: false,
            compress_without_alpha: false,
            mip_gen: MipGenSettings::FromTextureGroup,
            filter: wgpu::FilterMode::Linear,
            address_x: wgpu::AddressMode::Repeat,
            address_y: wgpu::AddressMode::Repeat,
            flip_green_channel: false,
            max_texture_size: 0,
            lod_bias: 0,
        }
    }
}

impl TextureSettings {
    /// Settings for transient textures produced by resolving a surface.
    #[must_use]
    pub fn transient(srgb: bool) -> Self {
        Self {
            srgb,
            compression_none: true,
            mip_gen: MipGenSettings::NoMipmaps,
            ..Default::default()
        }
    }
}

// ─── Texture ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct TextureInner {
    id: u64,
    label: String,
    source: RwLock<Option<SourceArt>>,
    settings: RwLock<TextureSettings>,

    // Streaming flags
    force_mips_resident: AtomicBool,
    ignore_streaming_mip_bias: AtomicBool,

    /// Bumped whenever source art or settings change.
    version: AtomicU64,
}

/// Shared handle to a texture asset.
#[derive(Debug, Clone)]
pub struct Texture(Arc<TextureInner>);

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Texture {}
impl std::hash::Hash for Texture {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Texture {
    #[must_use]
    pub fn new(label: &str, source: SourceArt, settings: TextureSettings) -> Self {
        Self(Arc::new(TextureInner {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
            source: RwLock::new(Some(source)),
            settings: RwLock::new(settings),
            force_mips_resident: AtomicBool::new(false),
            ignore_streaming_mip_bias: AtomicBool::new(false),
            version: AtomicU64::new(1),
        }))
    }

    /// Creates a single-mip texture from tightly packed pixels.
    pub fn from_pixels(
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        settings: TextureSettings,
    ) -> Result<Self> {
        let source = SourceArt::new(width, height, format, data)?;
        Ok(Self::new(label, source, settings))
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    /// Read access to the source art; `None` once the texture was released.
    pub fn source(&self) -> RwLockReadGuard<'_, Option<SourceArt>> {
        self.0.source.read()
    }

    #[must_use]
    pub fn is_source_valid(&self) -> bool {
        self.0.source.read().as_ref().is_some_and(SourceArt::is_valid)
    }

    #[must_use]
    pub fn source_id(&self) -> Option<Uuid> {
        self.0.source.read().as_ref().map(|s| s.id)
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.0
            .source
            .read()
            .as_ref()
            .map_or(PixelFormat::Invalid, |s| s.format)
    }

    /// Dimensions of the imported source art.
    #[must_use]
    pub fn imported_size(&self) -> UVec2 {
        self.0
            .source
            .read()
            .as_ref()
            .map_or(UVec2::ZERO, |s| UVec2::new(s.width, s.height))
    }

    /// Runtime size after `max_texture_size` and `lod_bias` are applied.
    #[must_use]
    pub fn size(&self) -> UVec2 {
        let mut size = self.imported_size();
        if size.min_element() == 0 {
            return size;
        }
        let settings = self.settings();
        if settings.max_texture_size > 0 {
            while size.max_element() > settings.max_texture_size && size.max_element() > 1 {
                size = (size / 2).max(UVec2::ONE);
            }
        }
        for _ in 0..settings.lod_bias {
            if size.max_element() == 1 {
                break;
            }
            size = (size / 2).max(UVec2::ONE);
        }
        size
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.size().x
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.size().y
    }

    #[must_use]
    pub fn settings(&self) -> TextureSettings {
        *self.0.settings.read()
    }

    pub fn set_settings(&self, settings: TextureSettings) {
        *self.0.settings.write() = settings;
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Modifies settings in place.
    pub fn update_settings(&self, f: impl FnOnce(&mut TextureSettings)) {
        f(&mut self.0.settings.write());
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of mip `level` bytes.
    #[must_use]
    pub fn mip_data(&self, level: u32) -> Option<Vec<u8>> {
        self.0
            .source
            .read()
            .as_ref()
            .and_then(|s| s.mip(level).map(<[u8]>::to_vec))
    }

    /// Drops the source art. Stale references observe an invalid source.
    pub fn release(&self) {
        *self.0.source.write() = None;
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    // ── Streaming ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn force_mips_resident(&self) -> bool {
        self.0.force_mips_resident.load(Ordering::Acquire)
    }

    pub fn set_force_mips_resident(&self, value: bool) {
        self.0.force_mips_resident.store(value, Ordering::Release);
    }

    #[must_use]
    pub fn ignore_streaming_mip_bias(&self) -> bool {
        self.0.ignore_streaming_mip_bias.load(Ordering::Acquire)
    }

    pub fn set_ignore_streaming_mip_bias(&self, value: bool) {
        self.0.ignore_streaming_mip_bias.store(value, Ordering::Release);
    }
}
