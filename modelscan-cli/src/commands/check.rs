//! `modelscan check` command handler
//!
//! Answers "would modelscan look at this file?" from extensions alone.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use modelscan_core::config::ModelScanConfig;
use modelscan_engine::ModelScan;

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// Fails with [`CliError::NothingScanned`] when no path is compatible.
pub fn execute(
    args: CheckArgs,
    config: ModelScanConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let engine = ModelScan::new(Arc::new(config));
    let report = build_check_report(&engine, &args);

    writer.render(&report)?;

    if report.compatible == 0 {
        return Err(CliError::NothingScanned);
    }
    Ok(())
}

fn build_check_report(engine: &ModelScan, args: &CheckArgs) -> CheckReport {
    let entries: Vec<CheckEntry> = args
        .paths
        .iter()
        .map(|path| CheckEntry {
            path: path.display().to_string(),
            compatible: engine.is_compatible(path),
        })
        .collect();
    let compatible = entries.iter().filter(|e| e.compatible).count();

    CheckReport {
        compatible,
        entries,
    }
}

/// Compatibility of each checked path.
#[derive(Serialize)]
pub struct CheckReport {
    pub compatible: usize,
    pub entries: Vec<CheckEntry>,
}

#[derive(Serialize)]
pub struct CheckEntry {
    pub path: String,
    pub compatible: bool,
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        for entry in &self.entries {
            let status = if entry.compatible {
                "supported".green()
            } else {
                "unsupported".dimmed()
            };
            writeln!(w, "{:<12} {}", status, entry.path)?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "{} of {} path(s) supported",
            self.compatible,
            self.entries.len()
        )?;
        Ok(())
    }
}
