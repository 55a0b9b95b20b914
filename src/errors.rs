//! Error Types
//!
//! This module defines the error types used throughout the baker.
//!
//! # Overview
//!
//! The main error type [`BakeError`] covers:
//! - GPU surface allocation and readback failures
//! - Invalid output configuration (dimensions, asset paths, pixel data)
//! - Backend initialization failures
//! - Persistence (I/O, image encoding, settings parsing)
//!
//! Only a subset of these are fatal to a bake batch; see
//! [`BakeError::is_fatal`]. Configuration problems for a single output are
//! reported through an invalid [`RenderResult`](crate::RenderResult) instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::resources::format::PixelFormat;

/// The main error type for the texture baker.
#[derive(Error, Debug)]
pub enum BakeError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// The backend could not allocate a surface. Unrecoverable for the batch.
    #[error("Failed to allocate {width}x{height} {format:?} surface: {reason}")]
    SurfaceAllocationFailed {
        width: u32,
        height: u32,
        format: PixelFormat,
        reason: String,
    },

    /// A surface key did not refer to a live backend surface.
    #[error("Unknown surface")]
    UnknownSurface,

    /// The backend cannot represent the requested pixel format.
    #[error("Pixel format {0:?} is not supported by this backend")]
    UnsupportedFormat(PixelFormat),

    /// Reading surface contents back to the CPU failed.
    #[error("Surface readback failed: {0}")]
    Readback(String),

    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Dimensions outside the legal `1..=max` range.
    #[error("Invalid dimensions {width}x{height} (allowed 1..={max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    /// Pixel buffer length does not match the declared layout.
    #[error("Pixel data length mismatch: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Malformed destination asset path.
    #[error("Invalid asset path '{path}': {reason}")]
    InvalidAssetPath { path: String, reason: &'static str },

    /// The requested output was never registered or has no image.
    #[error("Unknown output: {0}")]
    UnknownOutput(String),

    /// The scenario refused to bake.
    #[error("Scenario '{name}' cannot bake: {reason}")]
    InvalidScenario { name: String, reason: &'static str },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The destination file exists and overwriting is disabled.
    #[error("Asset already exists: {}", .0.display())]
    AssetExists(PathBuf),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding error.
    #[error("Image encode error: {0}")]
    ImageEncode(String),
}

impl BakeError {
    /// Returns `true` for errors that must abort the whole batch.
    ///
    /// Resource exhaustion and device loss fall in this class; every other
    /// error is scoped to the output or operation that produced it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SurfaceAllocationFailed { .. }
                | Self::Readback(_)
                | Self::AdapterRequestFailed(_)
                | Self::DeviceCreateFailed(_)
        )
    }
}

impl From<image::ImageError> for BakeError {
    fn from(err: image::ImageError) -> Self {
        BakeError::ImageEncode(err.to_string())
    }
}

/// Alias for `Result<T, BakeError>`.
pub type Result<T> = std::result::Result<T, BakeError>;
