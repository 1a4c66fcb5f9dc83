//! Hand-off to the full application and browser opening.

use std::process::Command;

use tracing::{info, warn};

use crate::paths::InstallPaths;
use crate::probes::{AppLauncher, LaunchMode};

/// Launches the staged full application in a given entry mode via
/// `open`, detached from the watcher process.
#[derive(Debug)]
pub struct StagedAppLauncher {
    paths: InstallPaths,
}

impl StagedAppLauncher {
    pub fn new(paths: InstallPaths) -> Self {
        Self { paths }
    }

    fn mode_flag(mode: LaunchMode) -> &'static str {
        match mode {
            LaunchMode::Update => "--entry=update",
            LaunchMode::BuildBootloader => "--entry=build-bootloader",
        }
    }
}

impl AppLauncher for StagedAppLauncher {
    fn launch(&self, mode: LaunchMode) {
        let app = self.paths.staged_app();
        info!(app = %app.display(), ?mode, "Handing off to full application");
        let result = Command::new("open")
            .arg(&app)
            .arg("--args")
            .arg(Self::mode_flag(mode))
            .spawn();
        if let Err(err) = result {
            warn!(error = %err, app = %app.display(), "Failed to launch full application");
        }
    }

    fn open_url(&self, url: &str) {
        info!(url, "Opening release page in browser");
        if let Err(err) = Command::new("open").arg(url).spawn() {
            warn!(error = %err, url, "Failed to open URL");
        }
    }
}
