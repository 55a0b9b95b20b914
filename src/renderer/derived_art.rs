//! Derived-Art Cache
//!
//! Source textures are often not directly usable by a bake: they may be
//! compressed, streamed at a reduced size, or carry the wrong mip policy.
//! The cache synthesises an uncompressed copy that satisfies a
//! [`ResourceRequirements`] and remembers it.
//!
//! # Keying
//!
//! ```text
//! DerivedArtKey { requirements, source_size, source_format, source_id }
//!        │
//!        ▼
//! FxHashMap<DerivedArtKey, SmallVec<[Texture; 2]>>   (multimap)
//! ```
//!
//! The key is only a candidate filter. Two sources may share a key and still
//! hold different pixels, so every candidate's mip 0 is byte-compared with
//! the request before it is reused. Only mip 0 is compared; sources that
//! agree on mip 0 but differ in later mips alias to the same entry.

use glam::UVec2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::resources::format::PixelFormat;
use crate::resources::requirements::{DerivedArtMode, MipGenSettings, ResourceRequirements};
use crate::resources::texture::{CompressionSettings, SourceArt, Texture, TextureSettings};

/// Candidate filter for cached derived art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedArtKey {
    pub requirements: ResourceRequirements,
    pub source_size: UVec2,
    pub source_format: PixelFormat,
    pub source_id: Uuid,
}

impl DerivedArtKey {
    /// Builds the key for `art` under `requirements`.
    #[must_use]
    pub fn new(requirements: ResourceRequirements, art: &SourceArt) -> Self {
        Self {
            requirements,
            source_size: UVec2::new(art.width, art.height),
            source_format: art.format,
            source_id: art.id,
        }
    }
}

/// Content-checked multimap from [`DerivedArtKey`] to synthesised textures.
#[derive(Debug, Default)]
pub struct DerivedArtCache {
    entries: FxHashMap<DerivedArtKey, SmallVec<[Texture; 2]>>,
    hits: u64,
    misses: u64,
}

impl DerivedArtCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up or synthesises derived art with the default
    /// [`DerivedArtMode`] (fast path enabled, failsafe fallback).
    pub fn get_or_create(
        &mut self,
        source: &Texture,
        requirements: &ResourceRequirements,
    ) -> Option<Texture> {
        self.get_or_create_with_mode(source, requirements, DerivedArtMode::default())
    }

    /// Returns a texture satisfying `requirements` for `source`.
    ///
    /// - the source itself when it already qualifies (unless `ALWAYS_CREATE`)
    /// - a cached entry whose key and mip 0 bytes match
    /// - otherwise a newly synthesised texture, which is inserted
    ///
    /// Returns `None` for a source without valid art. With `FAILSAFE`, a
    /// synthesis failure falls back to the source.
    pub fn get_or_create_with_mode(
        &mut self,
        source: &Texture,
        requirements: &ResourceRequirements,
        mode: DerivedArtMode,
    ) -> Option<Texture> {
        if !source.is_source_valid() {
            return None;
        }
        if !mode.contains(DerivedArtMode::ALWAYS_CREATE) && requirements.is_satisfied_by(source) {
            return Some(source.clone());
        }

        let created = self.lookup_or_synthesize(source, requirements);
        if created.is_none() && mode.contains(DerivedArtMode::FAILSAFE) {
            log::warn!(
                "Derived art for '{}' could not be created, using the source",
                source.label()
            );
            return Some(source.clone());
        }
        created
    }

    fn lookup_or_synthesize(
        &mut self,
        source: &Texture,
        requirements: &ResourceRequirements,
    ) -> Option<Texture> {
        let guard = source.source();
        let art = guard.as_ref()?;
        let reference = art.mip(0)?;
        let key = DerivedArtKey::new(*requirements, art);

        if let Some(bucket) = self.entries.get_mut(&key) {
            // Entries whose art was released are evicted while scanning.
            bucket.retain(|candidate| candidate.is_source_valid());
            let found = bucket.iter().find(|candidate| {
                candidate
                    .source()
                    .as_ref()
                    .and_then(|c| c.mip(0))
                    .is_some_and(|content| content == reference)
            });
            if let Some(found) = found {
                self.hits += 1;
                return Some(found.clone());
            }
        }

        let copy = SourceArt::with_mips(
            Uuid::new_v4(),
            art.width,
            art.height,
            art.format,
            art.mips.clone(),
        )
        .ok()?;
        drop(guard);

        let size = if requirements.use_imported_resolution {
            source.imported_size()
        } else {
            source.size()
        };
        if size.min_element() == 0 {
            return None;
        }

        let derived = Texture::new(
            &format!("{} (derived)", source.label()),
            copy,
            derived_settings(&source.settings(), requirements, size),
        );
        self.misses += 1;
        log::debug!(
            "Created derived art for '{}' ({}x{} {})",
            source.label(),
            size.x,
            size.y,
            key.source_format
        );
        self.entries.entry(key).or_default().push(derived.clone());
        Some(derived)
    }

    /// Removes every entry pointing at `texture`. Returns `true` if any was
    /// found.
    pub fn release(&mut self, texture: &Texture) -> bool {
        let mut found = false;
        self.entries.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|t| t != texture);
            found |= bucket.len() != before;
            !bucket.is_empty()
        });
        found
    }

    /// Evicts entries whose source art was destroyed. Returns the number
    /// evicted.
    pub fn purge_stale(&mut self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|t| t.is_source_valid());
            evicted += before - bucket.len();
            !bucket.is_empty()
        });
        evicted
    }

    #[must_use]
    pub fn contains(&self, texture: &Texture) -> bool {
        self.entries.values().flatten().any(|t| t == texture)
    }

    /// Number of cached textures across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(SmallVec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Attributes of a derived texture.
fn derived_settings(
    source: &TextureSettings,
    requirements: &ResourceRequirements,
    size: UVec2,
) -> TextureSettings {
    TextureSettings {
        srgb: source.srgb,
        compression: if requirements.require_uncompressed {
            CompressionSettings::Default
        } else {
            source.compression
        },
        compression_none: requirements.require_uncompressed || source.compression_none,
        compress_without_alpha: source.compress_without_alpha,
        mip_gen: if requirements.mip_gen == MipGenSettings::LeaveExistingMips {
            source.mip_gen
        } else {
            requirements.mip_gen
        },
        filter: source.filter,
        address_x: source.address_x,
        address_y: source.address_y,
        flip_green_channel: source.flip_green_channel,
        max_texture_size: if requirements.use_imported_resolution {
            size.max_element()
        } else {
            source.max_texture_size
        },
        lod_bias: 0,
    }
}
