use crate::runner::state::{PhaseReport, RunSummary};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Debloat run results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub session_id: String,
    pub phases: Vec<PhaseReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}

impl RunReport {
    pub fn new(phases: Vec<PhaseReport>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            summary: RunSummary::tally(&phases),
            phases,
            generated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Write the run report as pretty-printed JSON
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report dir {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!(
        "{} Report written to {}",
        "📊".blue(),
        path.display().to_string().cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{PackageReport, PackageStatus};

    #[test]
    fn test_report_tallies_summary() {
        let mut phase = PhaseReport::new("freeze");
        phase.push(PackageReport::new("a", PackageStatus::Passed, 12));
        phase.push(PackageReport::new(
            "b",
            PackageStatus::Failed {
                error: "denied".to_string(),
            },
            7,
        ));

        let report = RunReport::new(vec![phase]);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 0);
        assert!(!report.session_id.is_empty());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = RunReport::new(Vec::new());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("sessionId"));
        assert!(json.contains("generatedAt"));
    }
}
