//! patchwork-agent: launchd entry point for the auto-patch watcher.
//!
//! Invoked on a schedule by the launch agent the installer registers.
//! Each invocation is a fresh process: no state survives between cycles.
//!
//! ## Subcommands
//!
//! - `run`: one decision cycle (update check, seal check, patch detection,
//!   version and boot-disk reconciliation)
//! - `install`: privileged, idempotent install of the watcher itself

mod boot;
mod logging;

use clap::{Parser, Subcommand};
use tracing::info;

use patchwork_core::system::{
    booted_volume_uuid, DiskUtilProbe, LauncherPatchDetector, ManifestUpdateProbe, NativePrompts,
    OsascriptElevator, SnapshotSealProbe, StagedAppLauncher,
};
use patchwork_core::{
    Collaborators, DecisionEngine, FilePreferences, InstallPaths, Installer, KextMonitorBuilder,
};

#[derive(Parser)]
#[command(name = "patchwork-agent")]
#[command(about = "Patchwork auto-patch watcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle (scheduled by launchd)
    Run,

    /// Install the watcher: staged bundle, launch agent, optional
    /// update-monitor daemon
    Install,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let paths = InstallPaths::default();
    let ctx = boot::boot_context(&paths);

    match cli.command {
        Commands::Run => {
            let updates = ManifestUpdateProbe::new(paths.clone(), ctx.installed_version.clone());
            let seal = SnapshotSealProbe;
            let detector = LauncherPatchDetector::new(ctx.launcher_binary.clone());
            let disks = DiskUtilProbe;
            let elevator = OsascriptElevator;
            let prompts = NativePrompts;
            let launcher = StagedAppLauncher::new(paths.clone());
            let prefs = FilePreferences::load(&paths);

            let engine = DecisionEngine::new(Collaborators {
                updates: &updates,
                seal: &seal,
                detector: &detector,
                disks: &disks,
                elevator: &elevator,
                prompts: &prompts,
                launcher: &launcher,
                prefs: &prefs,
            });
            let outcome = engine.run_cycle(&ctx);
            info!(?outcome, "Decision cycle finished");
        }
        Commands::Install => {
            let elevator = OsascriptElevator;
            let monitor = KextMonitorBuilder::new(paths.clone(), booted_volume_uuid());
            let installer = Installer::new(paths, &elevator, &monitor);
            installer.install_watcher(&ctx);
        }
    }
}
