//! The decision engine: one scheduled pass over the system state.
//!
//! The cycle is a strictly ordered pipeline. Each step either terminates the
//! cycle on one of five exits or falls through to the next step; there are no
//! retries inside a cycle - the next scheduled invocation is the retry.
//!
//! The engine never mutates persisted state. It reads the boot context,
//! drives the probes, shows prompts, and at most hands control to the full
//! application or the elevated executor. Decisions that used to live in
//! ambient flags are returned in `CycleOutcome`.

use tracing::{info, warn};

use crate::context::{BootContext, PreferenceStore, PREF_NOTIFY_MISMATCHED_DISKS};
use crate::probes::{
    AppLauncher, DiskProbe, Elevator, LaunchMode, PatchDetector, PromptGateway, SealProbe,
    UpdateChoice, UpdateProbe,
};
use crate::system::disks::{base_disk_identifier, same_physical_disk};
use crate::system::exec::shell_quote;

/// Advisory suffix appended to the patch prompt when the release API could
/// not be reached. Never gates anything.
const OFFLINE_WARNING: &str = "\n\nWARNING: Unable to verify whether a newer Patchwork release \
     exists. You may be applying patches from an outdated version for this OS. If unsure, check \
     the releases page once you are back online.";

/// Every external system the engine coordinates, as borrowed seams.
pub struct Collaborators<'a> {
    pub updates: &'a dyn UpdateProbe,
    pub seal: &'a dyn SealProbe,
    pub detector: &'a dyn PatchDetector,
    pub disks: &'a dyn DiskProbe,
    pub elevator: &'a dyn Elevator,
    pub prompts: &'a dyn PromptGateway,
    pub launcher: &'a dyn AppLauncher,
    pub prefs: &'a dyn PreferenceStore,
}

/// Terminal exit of a decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleExit {
    /// No graphical session; the cycle is intentionally a no-op.
    NoGuiSession,
    /// An update prompt was shown; whatever the user chose ends the cycle.
    UpdateHandled,
    /// Seal broken; assume the user is mid-patch or intentionally unsealed.
    SealNotIntact,
    /// Patches apply but a validation precondition failed.
    PatchingNotPossible,
    /// The patch confirmation ran, whether accepted or declined.
    PatchFlowFinished,
    /// Version and boot-disk checks ran to completion.
    Reconciled,
}

/// Result of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub exit: CycleExit,
    /// The user accepted a bootloader rebuild or relocation; the full
    /// application was launched in build mode.
    pub start_build_install: bool,
}

impl CycleOutcome {
    fn terminal(exit: CycleExit) -> Self {
        Self {
            exit,
            start_build_install: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct VersionCheck {
    matched: bool,
    start_build_install: bool,
}

pub struct DecisionEngine<'a> {
    collab: Collaborators<'a>,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(collab: Collaborators<'a>) -> Self {
        Self { collab }
    }

    /// Runs one full decision cycle against an immutable boot context.
    pub fn run_cycle(&self, ctx: &BootContext) -> CycleOutcome {
        info!("Starting decision cycle");

        if !ctx.gui_session {
            info!("No graphical session available, skipping cycle");
            return CycleOutcome::terminal(CycleExit::NoGuiSession);
        }

        // 1. Update check. Any answer to the prompt ends the cycle; stale
        // patch sets must not be applied over a pending update.
        if let Some(update) = self.collab.updates.check_for_update() {
            info!(version = %update.version, "Found new release");
            match self.collab.prompts.ask_update(
                &ctx.installed_version,
                &update.version,
                ctx.special_build,
            ) {
                UpdateChoice::DownloadAndInstall => {
                    self.collab.launcher.launch(LaunchMode::Update);
                }
                UpdateChoice::ViewOnWeb => {
                    self.collab.launcher.open_url(&update.link);
                }
                UpdateChoice::Ignore => {
                    info!("Update ignored by user");
                }
            }
            return CycleOutcome::terminal(CycleExit::UpdateHandled);
        }

        // 2. Seal check.
        if !self.collab.seal.seal_intact() {
            info!("Snapshot seal not intact, assuming patches in progress, skipping");
            return CycleOutcome::terminal(CycleExit::SealNotIntact);
        }
        info!("Snapshot seal intact, detecting patches");

        // 3/4. Patch detection and the actionable branch.
        let report = self.collab.detector.detect(&ctx.hardware_model);
        if report.actionable() {
            if !report.patching_possible() {
                info!("Applicable patches found but patching is not currently possible");
                return CycleOutcome::terminal(CycleExit::PatchingNotPossible);
            }
            self.run_patch_confirmation(ctx, &report.bullet_list());
            return CycleOutcome::terminal(CycleExit::PatchFlowFinished);
        }
        info!("No patches detected");

        // 5/6. Version reconciliation, then boot-disk reconciliation only
        // when versions already line up.
        let versions = self.versions_match(ctx);
        if !versions.matched {
            return CycleOutcome {
                exit: CycleExit::Reconciled,
                start_build_install: versions.start_build_install,
            };
        }
        let start_build_install = self.boot_disk_matches(ctx);
        CycleOutcome {
            exit: CycleExit::Reconciled,
            start_build_install,
        }
    }

    fn run_patch_confirmation(&self, ctx: &BootContext, patch_list: &str) {
        let warning = if self.collab.updates.release_host_reachable() {
            ""
        } else {
            OFFLINE_WARNING
        };

        if !self.collab.prompts.confirm_patch(patch_list, warning) {
            info!("Patch installation declined");
            return;
        }

        // Re-invoke the launcher under privilege in patch mode. The exit
        // code only gets logged; the next scheduled cycle is the retry.
        let command = format!(
            "{} --gui_patch",
            shell_quote(&ctx.launcher_binary.to_string_lossy())
        );
        match self.collab.elevator.run_shell_elevated(
            &command,
            "Patchwork would like to patch your root volume",
        ) {
            Ok(code) => info!(code, "Privileged patch invocation finished"),
            Err(err) => warn!(error = %err, "Privileged patch invocation failed"),
        }
    }

    /// Compares the booted bootloader build against the installed
    /// application version, prompting for a rebuild on a genuine mismatch.
    fn versions_match(&self, ctx: &BootContext) -> VersionCheck {
        info!("Checking booted vs installed build");

        let matched = VersionCheck {
            matched: true,
            start_build_install: false,
        };

        let Some(booted) = ctx.booted_version.as_deref() else {
            info!("No booted version recorded, nothing to reconcile");
            return matched;
        };

        if booted == ctx.installed_version {
            info!("Versions match");
            return matched;
        }

        if ctx.special_build {
            // Special builds carry no reliable ordering; assume the
            // installed build is the one the user wants booted.
            info!("Special build detected, assuming installed is newer");
            return VersionCheck {
                matched: false,
                start_build_install: false,
            };
        }

        if self.collab.updates.is_newer_than(booted) {
            info!(booted, "Booted version is newer than installed, treating as matched");
            return matched;
        }

        let accepted = self
            .collab
            .prompts
            .confirm_bootloader_rebuild(booted, &ctx.installed_version);
        if accepted {
            info!("Launching full application in build mode");
            self.collab.launcher.launch(LaunchMode::BuildBootloader);
        }
        VersionCheck {
            matched: false,
            start_build_install: accepted,
        }
    }

    /// Checks whether the bootloader disk backs the macOS volume, prompting
    /// to relocate only for a removable mismatched disk. Every ambiguous
    /// probe result resolves to the no-prompt branch.
    ///
    /// Returns whether the user accepted a relocation.
    fn boot_disk_matches(&self, ctx: &BootContext) -> bool {
        info!("Determining if macOS volume matches boot disk");

        if self.collab.prefs.read_bool(PREF_NOTIFY_MISMATCHED_DISKS) == Some(false) {
            info!("Skipping boot-disk check due to user preference");
            return false;
        }
        if ctx.host_is_hackintosh {
            info!("Skipping boot-disk check on non-Apple hardware");
            return false;
        }
        let Some(booted_disk) = ctx.booted_disk.as_deref() else {
            info!("Bootloader disk unknown, skipping boot-disk check");
            return false;
        };
        let Some(boot_base) = base_disk_identifier(booted_disk) else {
            warn!(booted_disk, "Unrecognized boot disk identifier, skipping");
            return false;
        };

        let Some(macos_disk) = self.collab.disks.macos_volume_disk() else {
            info!("Could not resolve macOS volume disk, skipping");
            return false;
        };
        let stores = self.collab.disks.apfs_physical_stores(&macos_disk);
        info!(boot = %booted_disk, macos = %macos_disk, ?stores, "Comparing physical stores");

        if stores
            .iter()
            .any(|store| same_physical_disk(store, &boot_base))
        {
            info!("Boot disk backs the macOS volume");
            return false;
        }

        // Mismatched. Only prompt when the boot disk is provably removable.
        let Some(disk_info) = self.collab.disks.disk_info(&boot_base) else {
            info!("Disk info lookup failed, cannot determine removability, skipping");
            return false;
        };
        match disk_info.ejectable {
            None => {
                info!("Removability unknown, skipping prompt");
                false
            }
            Some(false) => {
                info!("Boot disk is not removable, skipping prompt");
                false
            }
            Some(true) => {
                info!("Boot disk is removable, offering relocation");
                let accepted = self.collab.prompts.confirm_bootloader_relocate();
                if accepted {
                    info!("Launching full application in build mode");
                    self.collab.launcher.launch(LaunchMode::BuildBootloader);
                }
                accepted
            }
        }
    }
}
