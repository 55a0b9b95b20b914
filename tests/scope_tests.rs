//! Render Scope Tests
//!
//! Tests for:
//! - Scope entry/exit, guards and the root scope
//! - Draw targets: create, resolve (texture / surface), discard, unknown handles
//! - Leak-free teardown under nesting and abandoned renders
//! - Residency pins: idempotent capture, revert, parent lookup
//! - Temporaries: release, hand-up to parent
//! - Dedicated pools
//! - Texture helpers: resize, downsample, prepare, surface copies

use glam::{UVec2, Vec4};

use texture_baker::backend::{Region, SoftwareBackend};
use texture_baker::renderer::{RenderScopeStack, ResourcePool};
use texture_baker::{
    BakeError, DerivedArtMode, MipGenSettings, PixelFormat, ResourceRequirements, Texture,
    TextureSettings,
};

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

fn stack() -> RenderScopeStack {
    RenderScopeStack::new(Box::new(SoftwareBackend::new()))
}

fn live(stack: &RenderScopeStack) -> usize {
    stack.backend().live_surface_count()
}

fn checker_texture() -> Texture {
    // 2x2 RGBA8: red, blue / blue, red
    let mut data = Vec::new();
    for c in [RED, BLUE, BLUE, RED] {
        data.extend_from_slice(&PixelFormat::Rgba8.encode(c, false));
    }
    Texture::from_pixels(
        "checker",
        2,
        2,
        PixelFormat::Rgba8,
        data,
        TextureSettings {
            srgb: false,
            ..Default::default()
        },
    )
    .unwrap()
}

// ============================================================================
// Scope Entry / Exit
// ============================================================================

#[test]
fn root_scope_cannot_be_popped() {
    let mut scopes = stack();
    assert_eq!(scopes.depth(), 0);
    assert!(!scopes.pop_scope());

    scopes.push_scope();
    assert_eq!(scopes.depth(), 1);
    assert!(scopes.pop_scope());
    assert_eq!(scopes.depth(), 0);
}

#[test]
fn guard_closes_scope_and_anything_left_open_inside() {
    let mut scopes = stack();
    {
        let mut guard = scopes.enter_scope();
        guard.push_scope();
        guard.push_scope();
        assert_eq!(guard.depth(), 3);
    }
    assert_eq!(scopes.depth(), 0);
}

#[test]
fn pop_to_depth_closes_every_deeper_scope() {
    let mut scopes = stack();
    scopes.push_scope();
    scopes.push_scope();
    scopes.push_scope();

    assert_eq!(scopes.pop_to_depth(1), 2);
    assert_eq!(scopes.depth(), 1);
    assert_eq!(scopes.pop_to_depth(5), 0);
    assert_eq!(scopes.pop_to_depth(0), 1);
    assert_eq!(scopes.pop_to_depth(0), 0);
}

// ============================================================================
// Draw Targets
// ============================================================================

#[test]
fn resolve_returns_cleared_and_drawn_pixels() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(4, 4), PixelFormat::Rgba8, false, BLUE)
        .unwrap();
    scopes
        .canvas(handle)
        .unwrap()
        .fill_rect(Region::new(0, 0, 2, 2), RED);

    let texture = scopes.resolve_draw_target(handle).unwrap().unwrap();
    let data = texture.mip_data(0).unwrap();

    assert_eq!(texture.size(), UVec2::new(4, 4));
    assert_eq!(&data[0..4], &[255, 0, 0, 255]);
    // (3, 3) keeps the clear colour.
    let last = (3 * 4 + 3) * 4;
    assert_eq!(&data[last..last + 4], &[0, 0, 255, 255]);

    assert_eq!(scopes.active_draw_targets(), 0);
    assert_eq!(scopes.pool().idle_surface_count(), 1);
    assert_eq!(scopes.pool().idle_canvas_count(), 1);
    assert_eq!(scopes.temporary_textures(), 1);
}

#[test]
fn resolved_texture_is_transient() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
        .unwrap();
    let texture = scopes.resolve_draw_target(handle).unwrap().unwrap();

    let settings = texture.settings();
    assert!(settings.compression_none);
    assert_eq!(settings.mip_gen, MipGenSettings::NoMipmaps);
    assert!(settings.srgb);
}

#[test]
fn unknown_handle_resolves_to_nothing() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
        .unwrap();
    assert!(scopes.discard_draw_target(handle));

    assert!(scopes.resolve_draw_target(handle).unwrap().is_none());
    assert!(scopes.resolve_draw_target_as_surface(handle).unwrap().is_none());
    assert!(!scopes.discard_draw_target(handle));
    assert!(scopes.canvas(handle).is_none());
}

#[test]
fn stale_handle_does_not_reach_a_recycled_target() {
    let mut scopes = stack();
    let first = scopes
        .create_draw_target(UVec2::new(4, 4), PixelFormat::Bgra8, true, RED)
        .unwrap();
    scopes.resolve_draw_target(first).unwrap();

    // Reuses the canvas the first target gave back.
    let second = scopes
        .create_draw_target(UVec2::new(8, 8), PixelFormat::Bgra8, true, BLUE)
        .unwrap();
    assert_eq!(scopes.pool().idle_canvas_count(), 0);
    assert_ne!(first, second);

    assert!(!scopes.discard_draw_target(first));
    assert!(scopes.resolve_draw_target(first).unwrap().is_none());
    assert!(scopes.canvas(first).is_none());
    assert!(scopes.is_draw_target_active(second));
    assert_eq!(scopes.canvas(second).unwrap().size(), UVec2::new(8, 8));
}

#[test]
fn resolve_as_surface_transfers_ownership() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(8, 8), PixelFormat::Bgra8, true, RED)
        .unwrap();

    let surface = scopes.resolve_draw_target_as_surface(handle).unwrap().unwrap();
    assert_eq!(surface.descriptor().size(), UVec2::new(8, 8));
    assert_eq!(scopes.pool().outstanding_surfaces(), 1);
    assert_eq!(scopes.pool().idle_canvas_count(), 1);

    assert!(scopes.return_surface(surface));
    assert_eq!(scopes.pool().outstanding_surfaces(), 0);
}

#[test]
fn sixteen_bit_unorm_targets_render_through_half_float() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(2, 2), PixelFormat::Rgba16, false, RED)
        .unwrap();
    let surface = scopes.resolve_draw_target_as_surface(handle).unwrap().unwrap();
    assert_eq!(surface.descriptor().format, PixelFormat::Rgba16F);
    scopes.adopt_surface(surface);
}

#[test]
fn invalid_draw_target_size_is_not_fatal() {
    let mut scopes = stack();
    let err = scopes
        .create_draw_target(UVec2::new(0, 16), PixelFormat::Bgra8, true, RED)
        .unwrap_err();
    assert!(matches!(err, BakeError::InvalidDimensions { .. }));
    assert!(!err.is_fatal());

    let err = scopes
        .create_draw_target(UVec2::new(4097, 16), PixelFormat::Bgra8, true, RED)
        .unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(live(&scopes), 0);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn nested_scopes_leave_no_outstanding_surfaces() {
    let mut scopes = stack();
    {
        let mut outer = scopes.enter_scope();
        outer
            .create_draw_target(UVec2::new(16, 16), PixelFormat::Bgra8, true, RED)
            .unwrap();
        outer
            .create_temporary_surface(UVec2::new(8, 8), PixelFormat::G8, false, None)
            .unwrap();
        {
            let mut inner = outer.enter_scope();
            inner
                .create_draw_target(UVec2::new(16, 16), PixelFormat::Bgra8, true, BLUE)
                .unwrap();
            inner
                .create_draw_target(UVec2::new(32, 32), PixelFormat::Rgba16F, false, BLUE)
                .unwrap();
            {
                let mut innermost = inner.enter_scope();
                innermost
                    .create_draw_target(UVec2::new(4, 4), PixelFormat::R16F, false, RED)
                    .unwrap();
            }
            assert_eq!(inner.active_draw_targets(), 3);
        }
        assert_eq!(outer.active_draw_targets(), 1);
    }

    assert_eq!(scopes.active_draw_targets(), 0);
    assert_eq!(scopes.pool().outstanding_surfaces(), 0);
    assert_eq!(scopes.pool().idle_surface_count(), live(&scopes));
}

#[test]
fn abandoned_render_returns_surfaces_to_pool() {
    fn render_that_fails(scopes: &mut RenderScopeStack) -> Result<(), BakeError> {
        let mut scope = scopes.enter_scope();
        let handle = scope.create_draw_target(UVec2::new(8, 8), PixelFormat::Bgra8, true, RED)?;
        scope
            .canvas(handle)
            .unwrap()
            .fill_rect(Region::new(0, 0, 4, 4), BLUE);
        scope.create_temporary_surface(UVec2::new(4, 4), PixelFormat::G8, false, Some(RED))?;
        // Fails before resolve.
        scope.create_draw_target(UVec2::new(0, 0), PixelFormat::Bgra8, true, RED)?;
        unreachable!()
    }

    let mut scopes = stack();
    assert!(render_that_fails(&mut scopes).is_err());

    assert_eq!(scopes.depth(), 0);
    assert_eq!(scopes.pool().outstanding_surfaces(), 0);
    assert_eq!(scopes.pool().idle_surface_count(), 2);
    assert_eq!(live(&scopes), 2);
}

#[test]
fn surfaces_are_reused_across_sibling_scopes() {
    let mut scopes = stack();
    for _ in 0..5 {
        let mut scope = scopes.enter_scope();
        let handle = scope
            .create_draw_target(UVec2::new(64, 64), PixelFormat::Bgra8, true, RED)
            .unwrap();
        scope.resolve_draw_target(handle).unwrap();
    }
    assert_eq!(scopes.pool().allocations(), 1);
    assert_eq!(scopes.pool().reuses(), 4);
}

#[test]
fn temporaries_are_released_when_scope_closes() {
    let mut scopes = stack();
    let texture = {
        let mut scope = scopes.enter_scope();
        let handle = scope
            .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
            .unwrap();
        scope.resolve_draw_target(handle).unwrap().unwrap()
    };
    assert!(!texture.is_source_valid());
}

#[test]
fn handed_up_texture_survives_child_scope() {
    let mut scopes = stack();
    let mut parent = scopes.enter_scope();
    let texture = {
        let mut child = parent.enter_scope();
        let handle = child
            .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
            .unwrap();
        let texture = child.resolve_draw_target(handle).unwrap().unwrap();
        assert!(child.hand_up_texture(&texture));
        texture
    };
    assert!(texture.is_source_valid());
    assert_eq!(parent.temporary_textures(), 1);
    drop(parent);
    assert!(!texture.is_source_valid());
}

#[test]
fn hand_up_at_root_is_refused() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
        .unwrap();
    let texture = scopes.resolve_draw_target(handle).unwrap().unwrap();
    assert!(!scopes.hand_up_texture(&texture));
}

#[test]
fn release_texture_is_early_and_idempotent() {
    let mut scopes = stack();
    let handle = scopes
        .create_draw_target(UVec2::new(2, 2), PixelFormat::Bgra8, true, RED)
        .unwrap();
    let texture = scopes.resolve_draw_target(handle).unwrap().unwrap();

    assert!(scopes.release_texture(&texture));
    assert!(!texture.is_source_valid());
    assert_eq!(scopes.temporary_textures(), 0);
    assert!(!scopes.release_texture(&texture));
    assert!(!scopes.release_texture(&checker_texture()));
}

#[test]
fn release_surface_of_unknown_key_is_noop() {
    let mut scopes = stack();
    let key = scopes
        .create_temporary_surface(UVec2::new(4, 4), PixelFormat::Bgra8, true, None)
        .unwrap();
    assert!(scopes.release_surface(key));
    assert!(!scopes.release_surface(key));
    assert_eq!(scopes.pool().idle_surface_count(), 1);
}

// ============================================================================
// Residency
// ============================================================================

#[test]
fn pin_saves_first_state_and_unpin_restores_it() {
    let mut scopes = stack();
    let texture = checker_texture();
    texture.set_force_mips_resident(false);
    texture.set_ignore_streaming_mip_bias(true);

    assert!(scopes.set_mips_resident(&texture, true));
    assert!(texture.force_mips_resident());
    assert!(texture.ignore_streaming_mip_bias());

    // Second pin must not capture the forced flags.
    assert!(!scopes.set_mips_resident(&texture, true));
    let saved = scopes.saved_streaming_state(&texture).unwrap();
    assert!(!saved.force_mips_resident);
    assert!(saved.ignore_streaming_mip_bias);

    assert!(scopes.set_mips_resident(&texture, false));
    assert!(!texture.force_mips_resident());
    assert!(texture.ignore_streaming_mip_bias());
    assert!(!scopes.is_texture_pinned(&texture));
    assert!(!scopes.set_mips_resident(&texture, false));
}

#[test]
fn closing_scope_reverts_pins() {
    let mut scopes = stack();
    let texture = checker_texture();
    {
        let mut scope = scopes.enter_scope();
        scope.set_mips_resident(&texture, true);
        assert!(texture.force_mips_resident());
    }
    assert!(!texture.force_mips_resident());
    assert!(!texture.ignore_streaming_mip_bias());
}

#[test]
fn pin_in_parent_is_visible_to_child() {
    let mut scopes = stack();
    let texture = checker_texture();
    let mut parent = scopes.enter_scope();
    parent.set_mips_resident(&texture, true);
    {
        let mut child = parent.enter_scope();
        assert!(child.is_texture_pinned(&texture));
        assert!(!child.set_mips_resident(&texture, true));
        // The child does not own the pin.
        assert!(!child.set_mips_resident(&texture, false));
    }
    assert!(texture.force_mips_resident());
}

// ============================================================================
// Dedicated Pools
// ============================================================================

#[test]
fn dedicated_pool_serves_its_scope_and_is_drained() {
    let mut scopes = stack();
    {
        let mut scope = scopes.enter_scope_with_pool(ResourcePool::new());
        let handle = scope
            .create_draw_target(UVec2::new(8, 8), PixelFormat::Bgra8, true, RED)
            .unwrap();
        scope.resolve_draw_target(handle).unwrap();
        assert_eq!(scope.current_pool().idle_surface_count(), 1);
        assert_eq!(scope.pool().idle_surface_count(), 0);

        // Nested scopes without a pool use the nearest one.
        let mut child = scope.enter_scope();
        let handle = child
            .create_draw_target(UVec2::new(8, 8), PixelFormat::Bgra8, true, RED)
            .unwrap();
        child.resolve_draw_target(handle).unwrap();
        assert_eq!(child.current_pool().reuses(), 1);
    }
    assert_eq!(live(&scopes), 0);
    assert_eq!(scopes.pool().allocations(), 0);
}

// ============================================================================
// Texture Helpers
// ============================================================================

#[test]
fn resized_texture_keeps_source_format() {
    let mut scopes = stack();
    let source = checker_texture();

    let resized = scopes
        .create_resized_texture(&source, UVec2::new(4, 4), MipGenSettings::Simple)
        .unwrap()
        .unwrap();

    assert_eq!(resized.size(), UVec2::new(4, 4));
    assert_eq!(resized.format(), PixelFormat::Rgba8);
    assert_eq!(resized.settings().mip_gen, MipGenSettings::Simple);

    let data = resized.mip_data(0).unwrap();
    let px = |x: usize, y: usize| &data[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
    assert_eq!(px(0, 0), &[255, 0, 0, 255]);
    assert_eq!(px(1, 1), &[255, 0, 0, 255]);
    assert_eq!(px(2, 0), &[0, 0, 255, 255]);
    assert_eq!(px(0, 3), &[0, 0, 255, 255]);
    assert_eq!(scopes.pool().outstanding_surfaces(), 0);
}

#[test]
fn resized_texture_rejects_out_of_range_sizes() {
    let mut scopes = stack();
    let source = checker_texture();
    for size in [UVec2::new(0, 4), UVec2::new(4, 4097)] {
        assert!(
            scopes
                .create_resized_texture(&source, size, MipGenSettings::NoMipmaps)
                .unwrap()
                .is_none()
        );
    }
}

#[test]
fn downsample_uses_mip_dimensions() {
    let mut scopes = stack();
    let source = Texture::from_pixels(
        "big",
        16,
        8,
        PixelFormat::G8,
        vec![128; 16 * 8],
        TextureSettings::default(),
    )
    .unwrap();

    let mip2 = scopes
        .downsample_texture(&source, 2, MipGenSettings::NoMipmaps)
        .unwrap()
        .unwrap();
    assert_eq!(mip2.size(), UVec2::new(4, 2));
    assert_eq!(mip2.mip_data(0).unwrap(), vec![128; 8]);

    let tiny = scopes
        .downsample_texture(&source, 10, MipGenSettings::NoMipmaps)
        .unwrap()
        .unwrap();
    assert_eq!(tiny.size(), UVec2::ONE);
}

#[test]
fn prepare_texture_pins_derived_art() {
    let mut scopes = stack();
    let source = checker_texture();

    let prepared = scopes
        .prepare_texture(&source, &ResourceRequirements::default())
        .unwrap();
    assert_ne!(prepared, source);
    assert!(scopes.is_texture_pinned(&prepared));
    assert!(prepared.force_mips_resident());
    assert_eq!(scopes.derived_art_cache().len(), 1);
}

#[test]
fn derived_art_mode_comes_from_stack() {
    let mut scopes = RenderScopeStack::with_limits(
        Box::new(SoftwareBackend::new()),
        4096,
        DerivedArtMode::ALWAYS_CREATE,
    );
    let source = checker_texture();
    source.update_settings(|s| s.compression_none = true);

    let derived = scopes
        .derived_art(&source, &ResourceRequirements::default())
        .unwrap();
    assert_ne!(derived, source);
}

#[test]
fn texture_from_temporary_surface() {
    let mut scopes = stack();
    let key = scopes
        .create_temporary_surface(UVec2::new(2, 1), PixelFormat::Rgba8, false, Some(RED))
        .unwrap();

    let texture = scopes.create_texture_from_surface(key).unwrap().unwrap();
    assert_eq!(texture.mip_data(0).unwrap(), vec![255, 0, 0, 255, 255, 0, 0, 255]);
    assert!(scopes.release_surface(key));
    assert!(scopes.create_texture_from_surface(key).unwrap().is_none());
}
