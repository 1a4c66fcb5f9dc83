//! # patchwork-core
//!
//! Core library for the Patchwork auto-patch watcher: the recurring agent
//! that notices when an OS update wiped previously-applied root patches and
//! walks the user through re-applying them or relocating the bootloader.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one scheduled invocation is one fresh process; no
//!   shared state across cycles, no async runtime.
//! - **Seams over mocks-in-prod**: every external system (update check,
//!   seal, disks, privileged exec, dialogs) is a trait in [`probes`];
//!   production implementations live in [`system`].
//! - **Safe on ambiguity**: a probe that cannot answer resolves to the
//!   no-prompt branch. Declined prompts are normal paths, never errors.
//! - **Best-effort install**: the installer logs failures and keeps going;
//!   it never rolls back or raises.

// Public modules
pub mod context;
pub mod engine;
pub mod error;
pub mod install;
pub mod monitor;
pub mod paths;
pub mod probes;
pub mod report;
pub mod system;
pub mod version;

// Re-export commonly used items at crate root
pub use context::{
    BootContext, FilePreferences, PreferenceStore, PREF_HOST_IS_HACKINTOSH,
    PREF_NOTIFY_MISMATCHED_DISKS,
};
pub use engine::{Collaborators, CycleExit, CycleOutcome, DecisionEngine};
pub use error::{Result, WatchError};
pub use install::{bundle_root, Installer};
pub use monitor::{DaemonBuilder, KextMonitorBuilder};
pub use paths::InstallPaths;
pub use probes::{
    AppLauncher, DiskInfo, DiskProbe, Elevator, ExecOutcome, LaunchMode, PatchDetector,
    PromptGateway, SealProbe, UpdateChoice, UpdateInfo, UpdateProbe,
};
pub use report::{PatchEntry, PatchReport, VALIDATION_PATCHING_POSSIBLE};
