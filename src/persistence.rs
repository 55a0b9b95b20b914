//! Asset persistence.
//!
//! [`AssetWriter`] is the seam between a finished [`RenderResult`] and
//! whatever stores texture assets. [`ImageAssetWriter`] writes plain image
//! files below a root directory:
//!
//! ```text
//! /Game/Textures/T_Albedo  ─►  <root>/Game/Textures/T_Albedo.png
//! RGBA16F / RGBA32F / R16F ─►  .exr (32-bit float)
//! everything else          ─►  .png (8 or 16 bit)
//! ```

use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageFormat, Luma, Rgba};

use crate::errors::{BakeError, Result};
use crate::renderer::context::{RenderResult, ResolvedImage};
use crate::resources::format::PixelFormat;
use crate::resources::output::validate_asset_path;

/// Persists baked results.
pub trait AssetWriter {
    /// Writes `result` and returns where it went. Fails with
    /// [`BakeError::AssetExists`] if the destination exists and `overwrite`
    /// is `false`.
    fn write(&mut self, result: &RenderResult, overwrite: bool) -> Result<PathBuf>;
}

/// Writes results as PNG or OpenEXR files.
#[derive(Debug, Clone)]
pub struct ImageAssetWriter {
    root: PathBuf,
}

impl ImageAssetWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File extension used for images of `format`.
    #[must_use]
    pub fn extension_for(format: PixelFormat) -> &'static str {
        if format.is_float() { "exr" } else { "png" }
    }

    /// Maps an asset path to its file below the root.
    pub fn resolve_path(&self, asset_path: &str, format: PixelFormat) -> Result<PathBuf> {
        validate_asset_path(asset_path)?;
        let mut path = self.root.clone();
        for segment in asset_path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            path.push(segment);
        }
        // Asset names may contain dots; keep them.
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".");
        file_name.push(Self::extension_for(format));
        path.set_file_name(file_name);
        Ok(path)
    }
}

impl AssetWriter for ImageAssetWriter {
    fn write(&mut self, result: &RenderResult, overwrite: bool) -> Result<PathBuf> {
        let Some(image) = result.image.as_ref() else {
            return Err(BakeError::UnknownOutput(result.output_name.clone()));
        };
        let path = self.resolve_path(&result.asset_path, image.format)?;
        if !overwrite && path.exists() {
            return Err(BakeError::AssetExists(path));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        encode_image(image, &path)?;
        log::info!("Wrote '{}' to {}", result.output_name, path.display());
        Ok(path)
    }
}

fn encode_image(image: &ResolvedImage, path: &Path) -> Result<()> {
    let expected = image.format.data_size(image.width, image.height);
    if image.data.len() != expected {
        return Err(BakeError::InvalidPixelData {
            expected,
            actual: image.data.len(),
        });
    }
    let (w, h) = (image.width, image.height);
    let invalid = || BakeError::ImageEncode(format!("cannot build {w}x{h} image buffer"));

    match image.format {
        PixelFormat::Invalid => return Err(BakeError::UnsupportedFormat(PixelFormat::Invalid)),
        PixelFormat::G8 => {
            ImageBuffer::<Luma<u8>, _>::from_raw(w, h, image.data.clone())
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::Png)?;
        }
        PixelFormat::G16 => {
            let data = le_u16(&image.data);
            ImageBuffer::<Luma<u16>, _>::from_raw(w, h, data)
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::Png)?;
        }
        PixelFormat::Rgba8 => {
            ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, image.data.clone())
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::Png)?;
        }
        PixelFormat::Bgra8 => {
            let mut data = image.data.clone();
            for texel in data.chunks_exact_mut(4) {
                texel.swap(0, 2);
            }
            ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, data)
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::Png)?;
        }
        PixelFormat::Rgba16 => {
            let data = le_u16(&image.data);
            ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, data)
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::Png)?;
        }
        PixelFormat::R16F | PixelFormat::Rgba16F | PixelFormat::Rgba32F => {
            let bpp = image.format.bytes_per_pixel();
            let data: Vec<f32> = image
                .data
                .chunks_exact(bpp)
                .flat_map(|texel| image.format.decode(texel, false).to_array())
                .collect();
            ImageBuffer::<Rgba<f32>, _>::from_raw(w, h, data)
                .ok_or_else(invalid)?
                .save_with_format(path, ImageFormat::OpenExr)?;
        }
    }
    Ok(())
}

fn le_u16(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
