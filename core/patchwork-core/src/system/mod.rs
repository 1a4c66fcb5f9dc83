//! Production implementations of the collaborator seams.
//!
//! Everything here shells out to macOS system tools (`diskutil`,
//! `osascript`, `launchctl`, `open`) or reads files owned by the full
//! application. The engine never depends on these types directly; it only
//! sees the traits in `probes`.

pub mod detect;
pub mod dialog;
pub mod disks;
pub mod exec;
pub mod launch;
pub mod updates;

pub use detect::LauncherPatchDetector;
pub use dialog::{gui_session_available, NativePrompts};
pub use disks::{
    base_disk_identifier, booted_volume_uuid, same_physical_disk, DiskUtilProbe, SnapshotSealProbe,
};
pub use exec::{is_root, OsascriptElevator};
pub use launch::StagedAppLauncher;
pub use updates::ManifestUpdateProbe;
