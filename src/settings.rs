//! Baker Configuration
//!
//! [`BakerSettings`] collects the knobs shared by the scope stack, the bake
//! driver and the asset writer. Every field has a default, so a settings
//! file only needs to name what it overrides:
//!
//! ```json
//! { "preview": true, "max_idle_surfaces": 8 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::resources::output::DEFAULT_MAX_OUTPUT_DIMENSION;
use crate::resources::requirements::DerivedArtMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakerSettings {
    /// Largest legal output axis.
    pub max_output_dimension: u32,
    /// Passed to scenario hooks and render callbacks.
    pub preview: bool,
    pub derived_art_mode: DerivedArtMode,
    /// Replace existing files when writing results.
    pub overwrite_existing: bool,
    /// Idle surfaces kept by the pool after a batch; the rest are destroyed.
    pub max_idle_surfaces: usize,
    /// Checker cell size of the missing-handler placeholder, in pixels.
    pub placeholder_cell: u32,
}

impl Default for BakerSettings {
    fn default() -> Self {
        Self {
            max_output_dimension: DEFAULT_MAX_OUTPUT_DIMENSION,
            preview: false,
            derived_art_mode: DerivedArtMode::FAILSAFE,
            overwrite_existing: true,
            max_idle_surfaces: 32,
            placeholder_cell: 8,
        }
    }
}

impl BakerSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        log::debug!("Loaded baker settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Writes settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
