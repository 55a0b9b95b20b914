//! wgpu Backend Tests
//!
//! Run with `cargo test --features gpu-tests`. Each test skips itself when
//! no adapter is available (e.g. CI without a GPU or software rasterizer).

#![cfg(feature = "gpu-tests")]

use glam::{UVec2, Vec4};

use texture_baker::backend::{GpuBackend, Region, WgpuBackend};
use texture_baker::renderer::RenderScopeStack;
use texture_baker::{PixelFormat, SurfaceDescriptor};

fn backend() -> Option<WgpuBackend> {
    match WgpuBackend::new_headless() {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

#[test]
fn clear_and_readback_unaligned_width() {
    let Some(mut backend) = backend() else {
        return;
    };
    // 3 * 4 bytes per row forces row padding on readback.
    let key = backend
        .create_surface(&SurfaceDescriptor::new(3, 2, PixelFormat::Rgba8, false))
        .unwrap();
    backend.clear_surface(key, Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    backend.submit().unwrap();
    backend.wait_idle().unwrap();

    let pixels = backend.read_pixels(key).unwrap();
    assert_eq!(pixels.len(), 3 * 2 * 4);
    for texel in pixels.chunks_exact(4) {
        assert_eq!(texel, &[255, 0, 0, 255]);
    }
    backend.destroy_surface(key);
    assert_eq!(backend.live_surface_count(), 0);
}

#[test]
fn region_write_lands_after_clear() {
    let Some(mut backend) = backend() else {
        return;
    };
    let key = backend
        .create_surface(&SurfaceDescriptor::new(4, 4, PixelFormat::Rgba8, false))
        .unwrap();
    backend.clear_surface(key, Vec4::new(0.0, 0.0, 1.0, 1.0)).unwrap();
    backend
        .write_region(key, Region::new(1, 1, 1, 1), &[0, 255, 0, 255])
        .unwrap();
    backend.wait_idle().unwrap();

    let pixels = backend.read_pixels(key).unwrap();
    assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);
    let at = (4 + 1) * 4;
    assert_eq!(&pixels[at..at + 4], &[0, 255, 0, 255]);
}

#[test]
fn scoped_draw_target_on_gpu() {
    let Some(backend) = backend() else {
        return;
    };
    let mut scopes = RenderScopeStack::new(Box::new(backend));
    {
        let mut scope = scopes.enter_scope();
        let handle = scope
            .create_draw_target(UVec2::new(65, 3), PixelFormat::Bgra8, true, Vec4::ONE)
            .unwrap();
        scope
            .canvas(handle)
            .unwrap()
            .fill_rect(Region::new(64, 2, 1, 1), Vec4::new(1.0, 0.0, 1.0, 1.0));
        let texture = scope.resolve_draw_target(handle).unwrap().unwrap();

        let data = texture.mip_data(0).unwrap();
        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        let last = (2 * 65 + 64) * 4;
        assert_eq!(&data[last..last + 4], &[255, 0, 255, 255]);
    }
    assert_eq!(scopes.pool().outstanding_surfaces(), 0);
    assert_eq!(scopes.backend().live_surface_count(), 1);
}
