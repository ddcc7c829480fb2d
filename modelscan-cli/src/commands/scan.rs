//! `modelscan scan` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use modelscan_core::config::ModelScanConfig;
use modelscan_core::error::ModelScanError;
use modelscan_core::types::Severity;
use modelscan_engine::{ModelScan, ScanReport};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// The scan itself is synchronous and runs on the blocking pool.
pub async fn execute(
    args: ScanArgs,
    config: ModelScanConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = Arc::new(config);
    let path = args.path.clone();

    info!(path = %path.display(), "starting model scan");

    let report = tokio::task::spawn_blocking(move || {
        let mut engine = ModelScan::new(config);
        engine.scan(&path)
    })
    .await
    .map_err(|e| CliError::Scan(format!("scan task failed: {}", e)))??;

    if let Some(output_file) = &args.output_file {
        let json = report.to_json_pretty().map_err(ModelScanError::from)?;
        tokio::fs::write(output_file, json).await?;
        info!(path = %output_file.display(), "report written");
    }

    let output = ScanOutput {
        report,
        show_skipped: args.show_skipped,
    };
    writer.render(&output)?;

    scan_outcome(&output.report)
}

/// Map a finished report to the command result.
///
/// Issues take precedence over errors, errors over an empty scan.
pub fn scan_outcome(report: &ScanReport) -> Result<(), CliError> {
    if report.has_issues() {
        return Err(CliError::IssuesFound {
            count: report.summary.total_issues,
        });
    }
    if report.has_errors() {
        return Err(CliError::ScanErrors {
            count: report.errors.len(),
        });
    }
    if report.summary.scanned.total_scanned == 0 {
        return Err(CliError::NothingScanned);
    }
    Ok(())
}

/// Scan report plus text rendering options.
///
/// Serializes exactly as the report itself.
#[derive(Serialize)]
pub struct ScanOutput {
    #[serde(flatten)]
    pub report: ScanReport,
    #[serde(skip)]
    pub show_skipped: bool,
}

impl Render for ScanOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let summary = &self.report.summary;

        writeln!(w, "{}", "--- Summary ---".bold())?;
        writeln!(w, "Input: {}", summary.input_path.bold())?;
        writeln!(w, "Root: {}", summary.absolute_path)?;
        writeln!(w, "Scanned: {}", summary.scanned.total_scanned)?;
        writeln!(w, "Skipped: {}", summary.skipped.total_skipped)?;
        writeln!(w)?;

        if self.report.has_issues() {
            let counts = &summary.total_issues_by_severity;
            let total_str = format!(
                "{} total (C:{} H:{} M:{} L:{})",
                summary.total_issues,
                counts.critical,
                counts.high,
                counts.medium,
                counts.low
            );
            writeln!(w, "Issues: {}", total_str.red().bold())?;
            writeln!(w)?;

            for severity in Severity::ALL.iter().rev() {
                if counts.get(*severity) == 0 {
                    continue;
                }
                let issues: Vec<_> = self
                    .report
                    .issues
                    .iter()
                    .filter(|issue| {
                        issue.get("severity").and_then(|v| v.as_str()) == Some(severity.name())
                    })
                    .collect();

                let heading = format!("--- {} ---", severity.name());
                let heading = match severity {
                    Severity::Critical => heading.red().bold(),
                    Severity::High => heading.red(),
                    Severity::Medium => heading.yellow(),
                    Severity::Low => heading.normal(),
                };
                writeln!(w, "{}", heading)?;

                for (idx, issue) in issues.iter().enumerate() {
                    writeln!(
                        w,
                        "{}. {}",
                        idx + 1,
                        issue
                            .get("description")
                            .and_then(|v| v.as_str())
                            .unwrap_or("(no description)")
                    )?;
                    if let Some(source) = issue.get("source").and_then(|v| v.as_str()) {
                        writeln!(w, "   source: {}", source)?;
                    }
                    if let Some(scanner) = issue.get("scanner").and_then(|v| v.as_str()) {
                        writeln!(w, "   scanner: {}", scanner.dimmed())?;
                    }
                }
                writeln!(w)?;
            }
        } else {
            writeln!(w, "{}", "No issues found.".green())?;
            writeln!(w)?;
        }

        if self.report.has_errors() {
            writeln!(w, "{}", "--- Errors ---".yellow().bold())?;
            for (idx, error) in self.report.errors.iter().enumerate() {
                let description = error.description.as_deref().unwrap_or("(no description)");
                match &error.source {
                    Some(source) => writeln!(w, "{}. {} ({})", idx + 1, description, source)?,
                    None => writeln!(w, "{}. {}", idx + 1, description)?,
                }
            }
            writeln!(w)?;
        }

        if self.show_skipped && !summary.skipped.skipped_files.is_empty() {
            writeln!(w, "{}", "--- Skipped ---".dimmed())?;
            for skipped in &summary.skipped.skipped_files {
                writeln!(w, "  {}", skipped)?;
            }
        } else if summary.skipped.total_skipped > 0 {
            writeln!(
                w,
                "{} file(s) skipped (use --show-skipped to list them)",
                summary.skipped.total_skipped
            )?;
        }

        Ok(())
    }
}
