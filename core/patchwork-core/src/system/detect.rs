//! Patch detection via the full application.
//!
//! The patch rule set lives in the full application, not the watcher. The
//! production detector re-invokes the launcher binary in its report mode and
//! parses the JSON report from stdout. Any failure along the way yields an
//! empty (non-actionable) report.

use std::path::PathBuf;
use std::process::Command;

use tracing::warn;

use crate::probes::PatchDetector;
use crate::report::PatchReport;

/// Detector shelling out to the launcher binary's `--detect-patches` mode.
#[derive(Debug)]
pub struct LauncherPatchDetector {
    launcher_binary: PathBuf,
}

impl LauncherPatchDetector {
    pub fn new(launcher_binary: PathBuf) -> Self {
        Self { launcher_binary }
    }
}

impl PatchDetector for LauncherPatchDetector {
    fn detect(&self, hardware_model: &str) -> PatchReport {
        let output = Command::new(&self.launcher_binary)
            .args(["--detect-patches", "--json", "--model", hardware_model])
            .output();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "Failed to spawn patch detection");
                return PatchReport::default();
            }
        };
        if !output.status.success() {
            warn!(
                code = output.status.code().unwrap_or(-1),
                "Patch detection exited non-zero"
            );
            return PatchReport::default();
        }

        match serde_json::from_slice(&output.stdout) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "Patch detection produced malformed report");
                PatchReport::default()
            }
        }
    }
}
