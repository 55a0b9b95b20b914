//! Texture Bake Example
//!
//! Bakes a small material set and writes the results below
//! `target/bake_demo/`:
//! - Albedo: a procedural source texture stretched over the output
//! - Mask: a low-resolution copy of the source, made in a nested scope
//! - Height: float output written as OpenEXR
//! - Roughness: handler detached, bakes the placeholder checker
//!
//! Pass `--gpu` to bake on a headless wgpu device instead of the CPU backend.
//! Set `RUST_LOG=debug` to watch scopes open and close.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{UVec2, Vec4};
use texture_baker::backend::{GpuBackend, Region, SoftwareBackend, WgpuBackend};
use texture_baker::renderer::RenderScopeStack;
use texture_baker::{
    BakerSettings, ImageAssetWriter, MipGenSettings, OutputInfo, OutputWriteout, PixelFormat,
    RenderCallback, RenderContext, ResourceRequirements, Scenario, Texture, TextureSettings,
    execute_bake,
};

#[derive(Clone)]
struct DemoMaterial {
    /// Swapped for its prepared copy before any output renders.
    source: Rc<RefCell<Texture>>,
}

impl DemoMaterial {
    fn new() -> anyhow::Result<Self> {
        let size = 16;
        let mut pixels = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let color = Vec4::new(x as f32 / 15.0, y as f32 / 15.0, 0.25, 1.0);
                pixels.extend_from_slice(&PixelFormat::Rgba8.encode(color, true));
            }
        }
        let source = Texture::from_pixels(
            "T_Demo_Source",
            size,
            size,
            PixelFormat::Rgba8,
            pixels,
            TextureSettings::default(),
        )?;
        Ok(Self {
            source: Rc::new(RefCell::new(source)),
        })
    }
}

impl Scenario for DemoMaterial {
    fn name(&self) -> &str {
        "DemoMaterial"
    }

    fn register_outputs(&self, directory: &str) -> Vec<OutputWriteout> {
        let source = Rc::clone(&self.source);
        let albedo: RenderCallback = Box::new(move |_, _, target| {
            let texture = source.borrow().clone();
            target.draw_texture(&texture);
            target.fill_rect(Region::new(0, 0, 256, 8), Vec4::ONE);
            true
        });

        let source = Rc::clone(&self.source);
        let mask: RenderCallback = Box::new(move |_, is_preview, target| {
            let texture = source.borrow().clone();
            let size = if is_preview { 2 } else { 4 };
            let small = {
                let mut scope = target.scopes().enter_scope();
                let Ok(Some(small)) = scope.create_resized_texture(
                    &texture,
                    UVec2::splat(size),
                    MipGenSettings::NoMipmaps,
                ) else {
                    return false;
                };
                // Keep it alive past the nested scope.
                scope.hand_up_texture(&small);
                small
            };
            target.draw_texture(&small);
            true
        });

        let height: RenderCallback = Box::new(|info, _, target| {
            let rows = info.dimensions.y;
            for y in 0..rows {
                let h = y as f32 / rows as f32 * 2.0;
                target.fill_rect(
                    Region::new(0, y, info.dimensions.x, 1),
                    Vec4::new(h, h, h, 1.0),
                );
            }
            true
        });

        let roughness: RenderCallback = Box::new(|_, _, target| {
            target.fill(Vec4::splat(0.5));
            true
        });

        vec![
            OutputWriteout::in_directory(
                "Albedo",
                directory,
                "T_Demo_Albedo",
                OutputInfo::new(256, 256, PixelFormat::Bgra8),
                Some(albedo),
            ),
            OutputWriteout::in_directory(
                "Mask",
                directory,
                "T_Demo_Mask",
                OutputInfo::new(64, 64, PixelFormat::G8),
                Some(mask),
            ),
            OutputWriteout::in_directory(
                "Height",
                directory,
                "T_Demo_Height",
                OutputInfo::new(128, 128, PixelFormat::R16F),
                Some(height),
            ),
            OutputWriteout::in_directory(
                "Roughness",
                directory,
                "T_Demo_Roughness",
                OutputInfo::new(64, 64, PixelFormat::Bgra8),
                Some(roughness),
            ),
        ]
    }

    fn prepare_common(&mut self, scopes: &mut RenderScopeStack, _is_preview: bool) -> bool {
        // Sample uncompressed, full-resolution art for the whole bake.
        let source = self.source.borrow().clone();
        match scopes.prepare_texture(&source, &ResourceRequirements::default()) {
            Some(prepared) => {
                *self.source.borrow_mut() = prepared;
                true
            }
            None => false,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let backend: Box<dyn GpuBackend> = if std::env::args().any(|a| a == "--gpu") {
        Box::new(WgpuBackend::new_headless()?)
    } else {
        Box::new(SoftwareBackend::new())
    };
    log::info!("Baking with the {} backend", backend.name());

    let settings = BakerSettings {
        max_idle_surfaces: 4,
        ..Default::default()
    };
    let mut context = RenderContext::new(
        &DemoMaterial::new()?,
        "/Game/Demo",
        backend,
        settings,
    );
    context.unbind_output("Roughness");
    context.queue_all();

    let mut writer = ImageAssetWriter::new("target/bake_demo");
    let report = execute_bake(&mut context, &mut writer)?;

    for asset in &report.written {
        println!("{:<10} -> {}", asset.output_name, asset.path.display());
    }
    for failure in &report.failed {
        println!("{:<10} !! {}", failure.output_name, failure.reason);
    }
    Ok(())
}
