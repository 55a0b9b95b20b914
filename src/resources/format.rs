//! Pixel formats and surface descriptors.
//!
//! Every pixel the baker touches goes through [`PixelFormat::encode`] or
//! [`PixelFormat::decode`]. Colours travel as linear `Vec4`; the sRGB
//! transfer function is applied only to 8-bit unorm formats, matching what a
//! GPU does for `*UnormSrgb` render targets.

use std::fmt;

use glam::{UVec2, Vec4};
use half::f16;
use smallvec::SmallVec;

use crate::errors::{BakeError, Result};

/// Encoded bytes of a single pixel. Never longer than 16 bytes.
pub type PixelBytes = SmallVec<[u8; 16]>;

/// Storage format of texture source art and render surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Invalid,
    /// 8-bit single channel.
    G8,
    /// 16-bit unorm single channel.
    G16,
    /// 16-bit float single channel.
    R16F,
    Bgra8,
    Rgba8,
    /// 16-bit unorm per channel.
    Rgba16,
    Rgba16F,
    Rgba32F,
}

impl PixelFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::G8 => 1,
            Self::G16 | Self::R16F => 2,
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Rgba16 | Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::R16F | Self::Rgba16F | Self::Rgba32F)
    }

    #[must_use]
    pub const fn is_single_channel(self) -> bool {
        matches!(self, Self::G8 | Self::G16 | Self::R16F)
    }

    /// Returns `true` if the sRGB transfer function applies to this format.
    #[must_use]
    pub const fn supports_srgb(self) -> bool {
        matches!(self, Self::Bgra8 | Self::Rgba8)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::G8 => "G8",
            Self::G16 => "G16",
            Self::R16F => "R16F",
            Self::Bgra8 => "BGRA8",
            Self::Rgba8 => "RGBA8",
            Self::Rgba16 => "RGBA16",
            Self::Rgba16F => "RGBA16F",
            Self::Rgba32F => "RGBA32F",
        }
    }

    /// Byte size of a tightly packed `width` x `height` image.
    #[must_use]
    pub fn data_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// Selects the drawable surface format for an image of this format.
    ///
    /// 16-bit unorm images have no renderable equivalent on every backend,
    /// so they are drawn through half-float surfaces.
    #[must_use]
    pub const fn render_target_format(self) -> PixelFormat {
        match self {
            Self::G16 | Self::R16F => Self::R16F,
            Self::Rgba16 | Self::Rgba16F => Self::Rgba16F,
            other => other,
        }
    }

    /// Maps to the wgpu texture format used for surfaces of this format.
    #[must_use]
    pub fn to_wgpu(self, srgb: bool) -> Option<wgpu::TextureFormat> {
        let format = match self {
            Self::G8 => wgpu::TextureFormat::R8Unorm,
            Self::R16F => wgpu::TextureFormat::R16Float,
            Self::Bgra8 if srgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            Self::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
            Self::Rgba8 if srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rgba16F => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba32F => wgpu::TextureFormat::Rgba32Float,
            Self::Invalid | Self::G16 | Self::Rgba16 => return None,
        };
        Some(format)
    }

    /// Encodes a linear colour into this format's byte layout.
    ///
    /// Single-channel formats store the red component.
    #[must_use]
    pub fn encode(self, color: Vec4, srgb: bool) -> PixelBytes {
        let srgb = srgb && self.supports_srgb();
        let rgb = if srgb {
            Vec4::new(
                linear_to_srgb(color.x),
                linear_to_srgb(color.y),
                linear_to_srgb(color.z),
                color.w,
            )
        } else {
            color
        };

        let mut out = PixelBytes::new();
        match self {
            Self::Invalid => {}
            Self::G8 => out.push(unorm8(rgb.x)),
            Self::G16 => out.extend_from_slice(&unorm16(rgb.x).to_le_bytes()),
            Self::R16F => out.extend_from_slice(&f16::from_f32(rgb.x).to_le_bytes()),
            Self::Bgra8 => out.extend_from_slice(&[
                unorm8(rgb.z),
                unorm8(rgb.y),
                unorm8(rgb.x),
                unorm8(rgb.w),
            ]),
            Self::Rgba8 => out.extend_from_slice(&[
                unorm8(rgb.x),
                unorm8(rgb.y),
                unorm8(rgb.z),
                unorm8(rgb.w),
            ]),
            Self::Rgba16 => {
                for c in rgb.to_array() {
                    out.extend_from_slice(&unorm16(c).to_le_bytes());
                }
            }
            Self::Rgba16F => {
                for c in rgb.to_array() {
                    out.extend_from_slice(&f16::from_f32(c).to_le_bytes());
                }
            }
            Self::Rgba32F => {
                for c in rgb.to_array() {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        out
    }

    /// Decodes one pixel into a linear colour.
    ///
    /// Single-channel formats expand to `(v, v, v, 1)`. Short input yields
    /// transparent black.
    #[must_use]
    pub fn decode(self, bytes: &[u8], srgb: bool) -> Vec4 {
        if bytes.len() < self.bytes_per_pixel() || self == Self::Invalid {
            return Vec4::ZERO;
        }
        let u16_at = |i: usize| f32::from(u16::from_le_bytes([bytes[i], bytes[i + 1]])) / 65535.0;
        let f16_at = |i: usize| f16::from_le_bytes([bytes[i], bytes[i + 1]]).to_f32();
        let f32_at = |i: usize| {
            f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        let u8_at = |i: usize| f32::from(bytes[i]) / 255.0;

        let color = match self {
            Self::Invalid => Vec4::ZERO,
            Self::G8 => gray(u8_at(0)),
            Self::G16 => gray(u16_at(0)),
            Self::R16F => gray(f16_at(0)),
            Self::Bgra8 => Vec4::new(u8_at(2), u8_at(1), u8_at(0), u8_at(3)),
            Self::Rgba8 => Vec4::new(u8_at(0), u8_at(1), u8_at(2), u8_at(3)),
            Self::Rgba16 => Vec4::new(u16_at(0), u16_at(2), u16_at(4), u16_at(6)),
            Self::Rgba16F => Vec4::new(f16_at(0), f16_at(2), f16_at(4), f16_at(6)),
            Self::Rgba32F => Vec4::new(f32_at(0), f32_at(4), f32_at(8), f32_at(12)),
        };

        if srgb && self.supports_srgb() {
            Vec4::new(
                srgb_to_linear(color.x),
                srgb_to_linear(color.y),
                srgb_to_linear(color.z),
                color.w,
            )
        } else {
            color
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn gray(v: f32) -> Vec4 {
    Vec4::new(v, v, v, 1.0)
}

#[inline]
fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn unorm16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
}

#[must_use]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[must_use]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Re-encodes tightly packed pixels from one format into another.
///
/// `srgb` is the colour-space flag of both buffers. Identical formats are
/// copied verbatim.
#[must_use]
pub fn convert_pixels(data: &[u8], from: PixelFormat, to: PixelFormat, srgb: bool) -> Vec<u8> {
    if from == to {
        return data.to_vec();
    }
    let src_bpp = from.bytes_per_pixel();
    if src_bpp == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(data.len() / src_bpp * to.bytes_per_pixel());
    for texel in data.chunks_exact(src_bpp) {
        out.extend_from_slice(&to.encode(from.decode(texel, srgb), srgb));
    }
    out
}

// ─── Surface Descriptor ──────────────────────────────────────────────────────

/// Identity of a pooled surface. Two surfaces are interchangeable iff their
/// descriptors are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Colour-space flag: `true` stores 8-bit channels sRGB-encoded.
    pub srgb: bool,
}

impl SurfaceDescriptor {
    #[must_use]
    pub const fn new(width: u32, height: u32, format: PixelFormat, srgb: bool) -> Self {
        Self {
            width,
            height,
            format,
            srgb,
        }
    }

    #[must_use]
    pub fn from_size(size: UVec2, format: PixelFormat, srgb: bool) -> Self {
        Self::new(size.x, size.y, format, srgb)
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.format.data_size(self.width, self.height)
    }

    /// Checks that both axes lie in `1..=max` and the format is drawable.
    pub fn validate(&self, max: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.width > max || self.height > max {
            return Err(BakeError::InvalidDimensions {
                width: self.width,
                height: self.height,
                max,
            });
        }
        if self.format == PixelFormat::Invalid {
            return Err(BakeError::UnsupportedFormat(self.format));
        }
        Ok(())
    }
}
