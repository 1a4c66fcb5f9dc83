//! Collaborator seams for the decision engine.
//!
//! Every independently-failing external system the engine coordinates is a
//! trait here: the update check, the volume seal, patch detection, disk
//! enumeration, privileged execution, user prompting, and the hand-off to
//! the full application. Production implementations live in `system`; tests
//! substitute scripted fakes.

use crate::error::Result;
use crate::report::PatchReport;

/// A newer release of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: String,
    pub link: String,
}

/// Update availability and version ordering against the installed build.
pub trait UpdateProbe {
    /// Returns the newest known release when it is newer than the installed
    /// version, `None` otherwise (including when the check is unavailable).
    fn check_for_update(&self) -> Option<UpdateInfo>;

    /// Whether `version` is newer than the installed version.
    fn is_newer_than(&self, version: &str) -> bool;

    /// Advisory reachability of the release API. Only ever changes prompt
    /// wording, never gates a decision.
    fn release_host_reachable(&self) -> bool;
}

/// System volume seal state.
pub trait SealProbe {
    /// True when the snapshot seal is intact, i.e. no root-volume changes
    /// since the OS sealed it.
    fn seal_intact(&self) -> bool;
}

/// Hardware-specific patch applicability detection.
pub trait PatchDetector {
    fn detect(&self, hardware_model: &str) -> PatchReport;
}

/// Disk properties relevant to the boot-disk check. Keys `diskutil` did not
/// report stay `None`; the engine treats absence as "unknown, never prompt".
#[derive(Debug, Clone, Default)]
pub struct DiskInfo {
    pub ejectable: Option<bool>,
}

/// Boot-disk and macOS-volume enumeration.
pub trait DiskProbe {
    /// BSD identifier of the disk backing the booted macOS volume.
    fn macos_volume_disk(&self) -> Option<String>;

    /// Physical store disks underlying an APFS container disk.
    fn apfs_physical_stores(&self, disk: &str) -> Vec<String>;

    /// Disk properties, or `None` when the lookup itself failed.
    fn disk_info(&self, disk: &str) -> Option<DiskInfo>;
}

/// Result of a privileged command invocation.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub output: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Privileged process execution.
pub trait Elevator {
    /// Runs `argv` with administrator privileges, capturing combined output.
    fn run_elevated(&self, argv: &[String]) -> Result<ExecOutcome>;

    /// Runs a shell command line under the native administrator-password
    /// prompt, returning only the exit code.
    fn run_shell_elevated(&self, command: &str, prompt: &str) -> Result<i32>;
}

/// The user's pick from the three-way update prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChoice {
    DownloadAndInstall,
    ViewOnWeb,
    Ignore,
}

/// User-facing decision prompts. Declining any prompt is a normal path,
/// never an error.
pub trait PromptGateway {
    /// Three-way update prompt.
    fn ask_update(&self, installed: &str, available: &str, special_build: bool) -> UpdateChoice;

    /// Native confirmation listing detected patches. `warning` is an
    /// optional advisory suffix (empty when none).
    fn confirm_patch(&self, patch_list: &str, warning: &str) -> bool;

    /// Native confirmation offering to rebuild an outdated bootloader.
    fn confirm_bootloader_rebuild(&self, booted: &str, installed: &str) -> bool;

    /// Native confirmation offering to relocate the bootloader from a
    /// removable disk to the internal one.
    fn confirm_bootloader_relocate(&self) -> bool;
}

/// Entry mode for the full-application hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Update,
    BuildBootloader,
}

/// Opaque hand-off to the full application, plus browser opening.
pub trait AppLauncher {
    fn launch(&self, mode: LaunchMode);
    fn open_url(&self, url: &str);
}
