//! Idempotent installation of the watcher itself.
//!
//! Stages the application bundle under the support directory, installs the
//! recurring launch agent descriptor, conditionally installs the
//! update-monitor daemon, and leaves a user-visible alias in /Applications.
//!
//! Every step checks current state before acting and is safe to re-run.
//! Failures are logged and do not roll back earlier steps: the install is
//! best-effort by contract, and `install_watcher` deliberately returns
//! nothing to its caller.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::context::BootContext;
use crate::monitor::DaemonBuilder;
use crate::paths::{InstallPaths, APP_BUNDLE_NAME};
use crate::probes::Elevator;

pub struct Installer<'a> {
    paths: InstallPaths,
    elevator: &'a dyn Elevator,
    monitor: &'a dyn DaemonBuilder,
}

impl<'a> Installer<'a> {
    pub fn new(
        paths: InstallPaths,
        elevator: &'a dyn Elevator,
        monitor: &'a dyn DaemonBuilder,
    ) -> Self {
        Self {
            paths,
            elevator,
            monitor,
        }
    }

    /// Installs the watcher's bundle, descriptors, and alias. Best-effort:
    /// always returns, every sub-step's exit status is logged.
    pub fn install_watcher(&self, ctx: &BootContext) {
        if ctx.running_from_source {
            info!("Running from source checkout, skipping watcher install");
            return;
        }
        if ctx.launcher_binary.starts_with(self.paths.support_dir()) {
            info!("Watcher already runs from the support directory, skipping install");
            return;
        }
        let Some(bundle) = bundle_root(&ctx.launcher_binary) else {
            warn!(
                launcher = %ctx.launcher_binary.display(),
                "Launcher binary is not inside an application bundle, skipping install"
            );
            return;
        };

        info!("Installing watcher launch agent");
        self.ensure_dir(&self.paths.support_dir());
        self.stage_app_bundle(&bundle);
        self.strip_quarantine();
        self.install_agent_descriptor(&bundle);
        self.install_daemon_descriptor(&bundle);
        self.create_app_alias();
    }

    fn stage_app_bundle(&self, bundle: &Path) {
        let staged = self.paths.staged_app();

        // Delete-then-copy, never merge. A merged bundle could mix payloads
        // from two releases.
        if staged.exists() {
            info!(staged = %staged.display(), "Deleting existing staged bundle");
            self.run_elevated_logged(&[
                "rm".into(),
                "-R".into(),
                staged.to_string_lossy().into_owned(),
            ]);
        }

        let Some(name) = bundle.file_name() else {
            warn!(bundle = %bundle.display(), "Bundle path has no file name, skipping copy");
            return;
        };

        // The user may have renamed the downloaded app ("Patchwork 2.app").
        // Copy it under that name first, then move to the canonical one.
        let copied = self.paths.support_dir().join(name);
        if copied != staged && copied.exists() {
            self.run_elevated_logged(&[
                "rm".into(),
                "-R".into(),
                copied.to_string_lossy().into_owned(),
            ]);
        }

        info!(from = %bundle.display(), to = %copied.display(), "Copying application bundle");
        self.run_elevated_logged(&[
            "ditto".into(),
            bundle.to_string_lossy().into_owned(),
            copied.to_string_lossy().into_owned(),
        ]);

        if copied != staged {
            info!(from = %copied.display(), "Renaming staged bundle to {}", APP_BUNDLE_NAME);
            self.run_elevated_logged(&[
                "mv".into(),
                copied.to_string_lossy().into_owned(),
                staged.to_string_lossy().into_owned(),
            ]);
        }
    }

    /// Removes quarantine and other extended attributes from the staged
    /// bundle so Gatekeeper does not re-prompt for a copy we made ourselves.
    fn strip_quarantine(&self) {
        let staged = self.paths.staged_app();
        let result = Command::new("xattr")
            .arg("-cr")
            .arg(&staged)
            .output();
        if let Err(err) = result {
            warn!(error = %err, "Failed to strip extended attributes from staged bundle");
        }
    }

    fn install_agent_descriptor(&self, bundle: &Path) {
        let template = self.paths.agent_plist_template(bundle);
        let installed = self.paths.agent_plist();

        info!(to = %installed.display(), "Installing launch agent descriptor");
        if installed.exists() {
            self.run_elevated_logged(&[
                "rm".into(),
                installed.to_string_lossy().into_owned(),
            ]);
        }
        self.ensure_dir(&self.paths.launch_agents_dir());
        self.run_elevated_logged(&[
            "cp".into(),
            template.to_string_lossy().into_owned(),
            installed.to_string_lossy().into_owned(),
        ]);
        self.normalize_descriptor(&installed);
    }

    fn install_daemon_descriptor(&self, bundle: &Path) {
        if !self.monitor.build_if_needed(bundle) {
            return;
        }

        let template = self.paths.daemon_plist_template(bundle);
        let installed = self.paths.daemon_plist();

        info!(to = %installed.display(), "Installing update-monitor daemon descriptor");
        if installed.exists() {
            self.run_elevated_logged(&[
                "rm".into(),
                installed.to_string_lossy().into_owned(),
            ]);
        }
        self.ensure_dir(&self.paths.launch_daemons_dir());
        self.run_elevated_logged(&[
            "cp".into(),
            template.to_string_lossy().into_owned(),
            installed.to_string_lossy().into_owned(),
        ]);
        self.normalize_descriptor(&installed);
    }

    fn create_app_alias(&self) {
        let alias = self.paths.app_alias();
        // Never overwrite: the user may have the real app, or their own
        // link, at this path already.
        if alias.exists() || alias.is_symlink() {
            return;
        }
        info!(alias = %alias.display(), "Creating application alias");
        self.run_elevated_logged(&[
            "ln".into(),
            "-s".into(),
            self.paths.staged_app().to_string_lossy().into_owned(),
            alias.to_string_lossy().into_owned(),
        ]);
    }

    fn ensure_dir(&self, dir: &Path) {
        if dir.exists() {
            return;
        }
        info!(dir = %dir.display(), "Creating directory");
        self.run_elevated_logged(&[
            "mkdir".into(),
            "-p".into(),
            dir.to_string_lossy().into_owned(),
        ]);
    }

    /// Ownership and permission bits launchd requires before it will trust
    /// a descriptor.
    fn normalize_descriptor(&self, descriptor: &Path) {
        let path = descriptor.to_string_lossy().into_owned();
        self.run_elevated_logged(&["chmod".into(), "644".into(), path.clone()]);
        self.run_elevated_logged(&["chown".into(), "root:wheel".into(), path]);
    }

    fn run_elevated_logged(&self, argv: &[String]) {
        match self.elevator.run_elevated(argv) {
            Ok(outcome) if outcome.success() => {}
            Ok(outcome) => warn!(
                command = %argv.join(" "),
                code = outcome.exit_code,
                output = %outcome.output.trim(),
                "Privileged install step failed"
            ),
            Err(err) => warn!(
                command = %argv.join(" "),
                error = %err,
                "Privileged install step could not run"
            ),
        }
    }
}

/// Walks up from the launcher binary to the enclosing `.app` bundle.
pub fn bundle_root(launcher_binary: &Path) -> Option<PathBuf> {
    launcher_binary
        .ancestors()
        .find(|ancestor| ancestor.extension().is_some_and(|ext| ext == "app"))
        .map(Path::to_path_buf)
}
