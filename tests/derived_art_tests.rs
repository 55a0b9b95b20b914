//! Derived-Art Cache Tests
//!
//! Tests for:
//! - ResourceRequirements::is_satisfied_by and the zero-copy fast path
//! - Repeat lookups returning the cached instance
//! - Byte-compare disambiguation of colliding keys
//! - Mip 0 only comparison (known aliasing)
//! - Synthesis attributes, failure modes, DerivedArtMode flags
//! - Release and stale-entry eviction

use glam::UVec2;
use uuid::Uuid;

use texture_baker::renderer::DerivedArtCache;
use texture_baker::resources::CompressionSettings;
use texture_baker::{
    DerivedArtMode, MipGenSettings, PixelFormat, ResourceRequirements, SourceArt, Texture,
    TextureSettings,
};

fn solid(width: u32, height: u32, value: u8) -> Vec<u8> {
    vec![value; PixelFormat::Bgra8.data_size(width, height)]
}

fn compressed_settings() -> TextureSettings {
    TextureSettings {
        compression: CompressionSettings::NormalMap,
        compression_none: false,
        ..Default::default()
    }
}

fn texture_with_id(id: Uuid, value: u8) -> Texture {
    let art = SourceArt::with_mips(id, 8, 8, PixelFormat::Bgra8, vec![solid(8, 8, value)]).unwrap();
    Texture::new("source", art, compressed_settings())
}

// ============================================================================
// Requirements Tests
// ============================================================================

#[test]
fn requirements_default_to_imported_uncompressed_any_mips() {
    let req = ResourceRequirements::default();
    assert!(req.use_imported_resolution);
    assert!(req.require_uncompressed);
    assert_eq!(req.mip_gen, MipGenSettings::LeaveExistingMips);
}

#[test]
fn compressed_texture_does_not_satisfy_uncompressed_requirement() {
    let tex = texture_with_id(Uuid::new_v4(), 1);
    assert!(!ResourceRequirements::default().is_satisfied_by(&tex));

    tex.update_settings(|s| s.compression_none = true);
    assert!(ResourceRequirements::default().is_satisfied_by(&tex));
}

#[test]
fn clamped_runtime_size_fails_imported_resolution_requirement() {
    let tex = texture_with_id(Uuid::new_v4(), 1);
    tex.update_settings(|s| {
        s.compression_none = true;
        s.max_texture_size = 4;
    });
    assert_eq!(tex.size(), UVec2::new(4, 4));
    assert!(!ResourceRequirements::default().is_satisfied_by(&tex));

    let runtime_ok = ResourceRequirements {
        use_imported_resolution: false,
        ..Default::default()
    };
    assert!(runtime_ok.is_satisfied_by(&tex));
}

#[test]
fn mip_gen_requirement_must_match_unless_leave_existing() {
    let tex = texture_with_id(Uuid::new_v4(), 1);
    tex.update_settings(|s| {
        s.compression_none = true;
        s.mip_gen = MipGenSettings::Simple;
    });

    let blur = ResourceRequirements {
        mip_gen: MipGenSettings::Blur,
        ..Default::default()
    };
    let simple = ResourceRequirements {
        mip_gen: MipGenSettings::Simple,
        ..Default::default()
    };
    assert!(!blur.is_satisfied_by(&tex));
    assert!(simple.is_satisfied_by(&tex));
}

// ============================================================================
// Lookup Tests
// ============================================================================

#[test]
fn satisfied_source_is_returned_unchanged() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 1);
    tex.update_settings(|s| s.compression_none = true);

    let result = cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .unwrap();
    assert_eq!(result, tex);
    assert!(cache.is_empty());
}

#[test]
fn always_create_skips_fast_path() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 1);
    tex.update_settings(|s| s.compression_none = true);

    let result = cache
        .get_or_create_with_mode(
            &tex,
            &ResourceRequirements::default(),
            DerivedArtMode::ALWAYS_CREATE,
        )
        .unwrap();
    assert_ne!(result, tex);
    assert_eq!(cache.len(), 1);
}

#[test]
fn second_request_returns_cached_instance() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 7);
    let req = ResourceRequirements::default();

    let first = cache.get_or_create(&tex, &req).unwrap();
    let second = cache.get_or_create(&tex, &req).unwrap();

    assert_ne!(first, tex);
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), 1);
}

#[test]
fn different_requirements_create_separate_entries() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 7);

    let a = cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .unwrap();
    let b = cache
        .get_or_create(
            &tex,
            &ResourceRequirements {
                mip_gen: MipGenSettings::NoMipmaps,
                ..Default::default()
            },
        )
        .unwrap();

    assert_ne!(a, b);
    assert_eq!(cache.len(), 2);
}

#[test]
fn colliding_keys_with_different_content_never_alias() {
    let mut cache = DerivedArtCache::new();
    let shared_id = Uuid::new_v4();
    let red = texture_with_id(shared_id, 10);
    let blue = texture_with_id(shared_id, 200);
    let req = ResourceRequirements::default();

    let red_art = cache.get_or_create(&red, &req).unwrap();
    let blue_art = cache.get_or_create(&blue, &req).unwrap();

    assert_ne!(red_art, blue_art);
    assert_eq!(cache.len(), 2);
    assert_eq!(red_art.mip_data(0), red.mip_data(0));
    assert_eq!(blue_art.mip_data(0), blue.mip_data(0));

    // Each still resolves to its own entry.
    assert_eq!(cache.get_or_create(&red, &req).unwrap(), red_art);
    assert_eq!(cache.get_or_create(&blue, &req).unwrap(), blue_art);
}

#[test]
fn identical_content_under_same_key_is_shared() {
    let mut cache = DerivedArtCache::new();
    let shared_id = Uuid::new_v4();
    let a = texture_with_id(shared_id, 42);
    let b = texture_with_id(shared_id, 42);
    let req = ResourceRequirements::default();

    assert_eq!(
        cache.get_or_create(&a, &req).unwrap(),
        cache.get_or_create(&b, &req).unwrap()
    );
}

#[test]
fn sources_differing_only_past_mip0_alias() {
    let mut cache = DerivedArtCache::new();
    let id = Uuid::new_v4();
    let mip1_a = vec![1u8; PixelFormat::Bgra8.data_size(4, 4)];
    let mip1_b = vec![2u8; PixelFormat::Bgra8.data_size(4, 4)];
    let a = Texture::new(
        "a",
        SourceArt::with_mips(id, 8, 8, PixelFormat::Bgra8, vec![solid(8, 8, 9), mip1_a]).unwrap(),
        compressed_settings(),
    );
    let b = Texture::new(
        "b",
        SourceArt::with_mips(id, 8, 8, PixelFormat::Bgra8, vec![solid(8, 8, 9), mip1_b]).unwrap(),
        compressed_settings(),
    );
    let req = ResourceRequirements::default();

    let from_a = cache.get_or_create(&a, &req).unwrap();
    let from_b = cache.get_or_create(&b, &req).unwrap();
    assert_eq!(from_a, from_b);
}

// ============================================================================
// Synthesis Tests
// ============================================================================

#[test]
fn derived_texture_copies_full_mip_chain_with_new_identity() {
    let mut cache = DerivedArtCache::new();
    let id = Uuid::new_v4();
    let mips = vec![solid(8, 8, 3), vec![4u8; PixelFormat::Bgra8.data_size(4, 4)]];
    let tex = Texture::new(
        "src",
        SourceArt::with_mips(id, 8, 8, PixelFormat::Bgra8, mips).unwrap(),
        compressed_settings(),
    );

    let derived = cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .unwrap();

    assert_ne!(derived.source_id(), Some(id));
    assert_eq!(derived.source().as_ref().unwrap().num_mips(), 2);
    assert_eq!(derived.mip_data(1), tex.mip_data(1));
    assert_eq!(derived.format(), PixelFormat::Bgra8);
}

#[test]
fn derived_texture_settings_follow_requirements() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 5);
    tex.update_settings(|s| {
        s.srgb = false;
        s.flip_green_channel = true;
        s.address_x = wgpu::AddressMode::ClampToEdge;
        s.mip_gen = MipGenSettings::Sharpen;
        s.max_texture_size = 2;
    });

    let derived = cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .unwrap();
    let settings = derived.settings();

    assert!(settings.compression_none);
    assert_eq!(settings.compression, CompressionSettings::Default);
    assert_eq!(settings.mip_gen, MipGenSettings::Sharpen);
    assert!(!settings.srgb);
    assert!(settings.flip_green_channel);
    assert_eq!(settings.address_x, wgpu::AddressMode::ClampToEdge);
    assert_eq!(settings.max_texture_size, 8);
    assert_eq!(derived.size(), UVec2::new(8, 8));
}

#[test]
fn compressed_requirement_keeps_source_compression() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 5);
    tex.update_settings(|s| s.max_texture_size = 4);
    let req = ResourceRequirements {
        require_uncompressed: false,
        mip_gen: MipGenSettings::Blur,
        ..Default::default()
    };

    let derived = cache.get_or_create(&tex, &req).unwrap();
    let settings = derived.settings();
    assert_eq!(settings.compression, CompressionSettings::NormalMap);
    assert!(!settings.compression_none);
    assert_eq!(settings.mip_gen, MipGenSettings::Blur);
}

#[test]
fn invalid_source_yields_none_even_with_failsafe() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 1);
    tex.release();

    assert!(cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .is_none());
}

#[test]
fn zero_width_source_art_is_never_derived() {
    let mut cache = DerivedArtCache::new();
    let art = SourceArt::with_mips(Uuid::new_v4(), 4, 4, PixelFormat::G8, vec![vec![1u8; 16]]).unwrap();
    let broken = SourceArt {
        width: 0,
        ..art
    };
    let tex = Texture::new("broken", broken, compressed_settings());

    assert!(cache
        .get_or_create_with_mode(&tex, &ResourceRequirements::default(), DerivedArtMode::FAILSAFE)
        .is_none());
    assert!(cache.is_empty());
}

// ============================================================================
// Release Tests
// ============================================================================

#[test]
fn release_removes_every_entry_for_texture() {
    let mut cache = DerivedArtCache::new();
    let tex = texture_with_id(Uuid::new_v4(), 1);
    let derived = cache
        .get_or_create(&tex, &ResourceRequirements::default())
        .unwrap();

    assert!(cache.contains(&derived));
    assert!(cache.release(&derived));
    assert!(!cache.contains(&derived));
    assert!(!cache.release(&derived));
}

#[test]
fn stale_entries_are_evicted_lazily_and_by_sweep() {
    let mut cache = DerivedArtCache::new();
    let id = Uuid::new_v4();
    let tex = texture_with_id(id, 1);
    let req = ResourceRequirements::default();

    let derived = cache.get_or_create(&tex, &req).unwrap();
    derived.release();

    // Lookup evicts the dead entry and synthesises a replacement.
    let replacement = cache.get_or_create(&tex, &req).unwrap();
    assert_ne!(replacement, derived);
    assert_eq!(cache.len(), 1);

    replacement.release();
    assert_eq!(cache.purge_stale(), 1);
    assert!(cache.is_empty());
}
