//! Bake output declarations.

use std::fmt;

use glam::{UVec2, Vec4};

use crate::errors::{BakeError, Result};
use crate::resources::format::PixelFormat;
use crate::resources::requirements::MipGenSettings;
use crate::resources::texture::{CompressionSettings, Texture};
use crate::scenario::RenderCallback;

/// Largest legal output axis unless configured otherwise.
pub const DEFAULT_MAX_OUTPUT_DIMENSION: u32 = 4096;

/// Power-of-two padding applied when the output is cooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerOfTwoMode {
    #[default]
    None,
    PadToPowerOfTwo,
    PadToSquarePowerOfTwo,
}

/// How rendered values are mapped into the stored range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    Saturate,
    Normalize,
    Auto,
}

/// Image spec of one bake output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub dimensions: UVec2,
    pub padding: PowerOfTwoMode,
    /// Clear colour of the draw target, linear.
    pub default_color: Vec4,
    pub mip_gen: MipGenSettings,
    pub format: PixelFormat,
    pub normalization: Normalization,
    pub filter: wgpu::FilterMode,
    pub address_x: wgpu::AddressMode,
    pub address_y: wgpu::AddressMode,
    pub srgb: bool,
    pub compression: CompressionSettings,
    pub compress_without_alpha: bool,
    pub max_texture_size: u32,
    pub lod_bias: u32,
}

impl Default for OutputInfo {
    fn default() -> Self {
        Self {
            dimensions: UVec2::ONE,
            padding: PowerOfTwoMode::None,
            default_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            mip_gen: MipGenSettings::FromTextureGroup,
            format: PixelFormat::Bgra8,
            normalization: Normalization::Saturate,
            filter: wgpu::FilterMode::Linear,
            address_x: wgpu::AddressMode::Repeat,
            address_y: wgpu::AddressMode::Repeat,
            srgb: true,
            compression: CompressionSettings::Default,
            compress_without_alpha: false,
            max_texture_size: 0,
            lod_bias: 0,
        }
    }
}

impl OutputInfo {
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            dimensions: UVec2::new(width, height),
            format,
            srgb: format.supports_srgb(),
            ..Default::default()
        }
    }

    /// Mirrors the cook attributes of an existing texture at a new size.
    #[must_use]
    pub fn compatible_with(texture: &Texture, size: UVec2, normalization: Normalization) -> Self {
        let settings = texture.settings();
        Self {
            dimensions: size,
            mip_gen: settings.mip_gen,
            format: texture.format(),
            normalization,
            filter: settings.filter,
            address_x: settings.address_x,
            address_y: settings.address_y,
            srgb: settings.srgb,
            compression: settings.compression,
            compress_without_alpha: settings.compress_without_alpha,
            max_texture_size: settings.max_texture_size,
            lod_bias: settings.lod_bias,
            ..Default::default()
        }
    }

    /// Each axis in `1..=max` and a real format.
    #[must_use]
    pub fn is_valid(&self, max: u32) -> bool {
        self.dimensions.min_element() > 0
            && self.dimensions.max_element() <= max
            && self.format != PixelFormat::Invalid
    }

    /// Format of the surface this output is drawn into.
    #[must_use]
    pub fn render_target_format(&self) -> PixelFormat {
        self.format.render_target_format()
    }

    /// Copies the cook attributes onto `texture`.
    pub fn apply_to(&self, texture: &Texture) {
        texture.update_settings(|s| {
            s.compression = self.compression;
            s.mip_gen = self.mip_gen;
            s.compress_without_alpha = self.compress_without_alpha;
            s.filter = self.filter;
            s.max_texture_size = self.max_texture_size;
            s.lod_bias = self.lod_bias;
            s.address_x = self.address_x;
            s.address_y = self.address_y;
            s.srgb = self.srgb;
        });
    }
}

impl fmt::Display for OutputInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {}{} {}{}",
            self.dimensions.x,
            self.dimensions.y,
            self.format,
            if self.srgb { " (sRGB)" } else { "" },
            self.compression.name(),
            if self.compress_without_alpha {
                " (w/o alpha)"
            } else {
                ""
            },
        )
    }
}

// ─── Output Writeout ─────────────────────────────────────────────────────────

/// A named output registered by a scenario: what to render and where to save it.
pub struct OutputWriteout {
    pub name: String,
    pub asset_path: String,
    pub info: OutputInfo,
    /// `None` means unbound; unbound outputs are dropped at registration.
    pub on_render: Option<RenderCallback>,
}

impl OutputWriteout {
    pub fn new(
        name: impl Into<String>,
        asset_path: impl Into<String>,
        info: OutputInfo,
        on_render: Option<RenderCallback>,
    ) -> Self {
        Self {
            name: name.into(),
            asset_path: asset_path.into(),
            info,
            on_render,
        }
    }

    /// Places the output at `<directory>/<asset_name>`.
    pub fn in_directory(
        name: impl Into<String>,
        directory: &str,
        asset_name: &str,
        info: OutputInfo,
        on_render: Option<RenderCallback>,
    ) -> Self {
        let path = format!("{}/{}", directory.trim_end_matches('/'), asset_name);
        Self::new(name, path, info, on_render)
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.on_render.is_some()
    }
}

impl fmt::Debug for OutputWriteout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputWriteout")
            .field("name", &self.name)
            .field("asset_path", &self.asset_path)
            .field("info", &self.info)
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ─── Asset Paths ─────────────────────────────────────────────────────────────

const INVALID_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Validates a destination asset path such as `/Game/Textures/T_Albedo`.
pub fn validate_asset_path(path: &str) -> Result<()> {
    let fail = |reason| {
        Err(BakeError::InvalidAssetPath {
            path: path.to_string(),
            reason,
        })
    };

    if path.trim().is_empty() {
        return fail("path is empty");
    }
    if path.ends_with('/') {
        return fail("path names a directory");
    }
    if path.chars().any(|c| c.is_control() || INVALID_PATH_CHARS.contains(&c)) {
        return fail("path contains invalid characters");
    }
    if path.split('/').any(|segment| segment == "..") {
        return fail("path escapes its root");
    }
    if path.contains("//") {
        return fail("path contains an empty segment");
    }
    Ok(())
}
