//! Batch execution.

use std::path::PathBuf;

use crate::errors::{BakeError, Result};
use crate::persistence::AssetWriter;
use crate::renderer::context::RenderContext;

/// An output that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenAsset {
    pub output_name: String,
    pub path: PathBuf,
}

/// An output that did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOutput {
    pub output_name: String,
    pub reason: String,
}

/// Summary of one [`execute_bake`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeReport {
    pub scenario: String,
    pub written: Vec<WrittenAsset>,
    pub failed: Vec<FailedOutput>,
}

impl BakeReport {
    /// Returns `true` if every queued output was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, output_name: &str, reason: impl Into<String>) {
        self.failed.push(FailedOutput {
            output_name: output_name.to_string(),
            reason: reason.into(),
        });
    }
}

/// Prepares, bakes and writes every queued output of `context`.
///
/// Per-output failures end up in the report. `Err` means the scenario
/// refused to bake or a fatal error aborted the batch.
pub fn execute_bake(context: &mut RenderContext, writer: &mut dyn AssetWriter) -> Result<BakeReport> {
    let scenario = context.scenario().name().to_string();
    if !context.scenario().settings_are_valid() {
        return Err(BakeError::InvalidScenario {
            name: scenario,
            reason: "scenario settings are invalid",
        });
    }
    if !context.prepare() {
        return Err(BakeError::InvalidScenario {
            name: scenario,
            reason: "shared setup failed",
        });
    }

    let mut report = BakeReport {
        scenario,
        ..Default::default()
    };
    let max = context.scopes().max_dimension();
    let overwrite = context.settings().overwrite_existing;

    for result in context.bake_queued()? {
        if !result.is_valid(max) {
            report.fail(&result.output_name, "render produced no valid result");
            continue;
        }
        match writer.write(&result, overwrite) {
            Ok(path) => report.written.push(WrittenAsset {
                output_name: result.output_name,
                path,
            }),
            Err(e) => {
                log::warn!("Failed to write '{}': {e}", result.output_name);
                report.fail(&result.output_name, e.to_string());
            }
        }
    }

    log::info!(
        "Baked '{}': {} written, {} failed",
        report.scenario,
        report.written.len(),
        report.failed.len()
    );
    Ok(report)
}
