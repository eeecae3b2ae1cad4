use serde::{Deserialize, Serialize};

/// Outcome of a single per-package operation
///
/// Batch phases never abort on a failed package; the failure is recorded
/// here and the loop moves on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PackageStatus {
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl PackageStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, PackageStatus::Failed { .. })
    }
}

/// Result of one package within a phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub package: String,
    pub status: PackageStatus,
    pub duration_ms: u64,
}

impl PackageReport {
    pub fn new(package: &str, status: PackageStatus, duration_ms: u64) -> Self {
        Self {
            package: package.to_string(),
            status,
            duration_ms,
        }
    }
}

/// Results of one phase (freeze, uninstall, install, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: String,
    pub packages: Vec<PackageReport>,
}

impl PhaseReport {
    pub fn new(phase: &str) -> Self {
        Self {
            phase: phase.to_string(),
            packages: Vec::new(),
        }
    }

    pub fn push(&mut self, report: PackageReport) {
        self.packages.push(report);
    }

    pub fn failed_count(&self) -> usize {
        self.packages
            .iter()
            .filter(|p| p.status.is_failure())
            .count()
    }
}

/// Aggregate counts across all phases
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn tally(phases: &[PhaseReport]) -> Self {
        let mut summary = RunSummary::default();
        for phase in phases {
            for package in &phase.packages {
                match package.status {
                    PackageStatus::Passed => summary.passed += 1,
                    PackageStatus::Failed { .. } => summary.failed += 1,
                    PackageStatus::Skipped { .. } => summary.skipped += 1,
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_tally() {
        let mut freeze = PhaseReport::new("freeze");
        freeze.push(PackageReport::new("a", PackageStatus::Passed, 10));
        freeze.push(PackageReport::new(
            "b",
            PackageStatus::Failed {
                error: "denied".to_string(),
            },
            20,
        ));

        let mut install = PhaseReport::new("install");
        install.push(PackageReport::new(
            "c",
            PackageStatus::Skipped {
                reason: "already installed".to_string(),
            },
            0,
        ));
        install.push(PackageReport::new("d", PackageStatus::Passed, 30));

        let summary = RunSummary::tally(&[freeze, install]);
        assert_eq!(
            summary,
            RunSummary {
                passed: 2,
                failed: 1,
                skipped: 1,
            }
        );
    }

    #[test]
    fn test_failed_count() {
        let mut phase = PhaseReport::new("uninstall");
        phase.push(PackageReport::new("a", PackageStatus::Passed, 5));
        assert_eq!(phase.failed_count(), 0);

        phase.push(PackageReport::new(
            "b",
            PackageStatus::Failed {
                error: "timeout".to_string(),
            },
            5,
        ));
        assert_eq!(phase.failed_count(), 1);
    }

    #[test]
    fn test_status_serializes_tagged() {
        let status = PackageStatus::Skipped {
            reason: "not installed".to_string(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains(r#""type":"skipped""#));
        assert!(json.contains("not installed"));
    }
}
