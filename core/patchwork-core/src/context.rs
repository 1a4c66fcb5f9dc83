//! Boot context and user preferences.
//!
//! `BootContext` is captured once at process start and treated as immutable
//! for the whole decision cycle. Nothing in the engine mutates it; decisions
//! that used to flip ambient flags are returned in `CycleOutcome` instead.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::paths::InstallPaths;

/// Preference key: notify when the bootloader disk does not back the macOS
/// volume. Defaults to on.
pub const PREF_NOTIFY_MISMATCHED_DISKS: &str = "notify_mismatched_disks";

/// Preference key: persisted by the full application at install time when it
/// detects non-Apple hardware. The agent only reads it.
pub const PREF_HOST_IS_HACKINTOSH: &str = "host_is_hackintosh";

/// Immutable per-cycle snapshot of how this process was started and what
/// environment it is running in.
#[derive(Debug, Clone)]
pub struct BootContext {
    /// BSD identifier of the disk the bootloader was loaded from, if the
    /// bootloader recorded one (e.g. `disk0s1`).
    pub booted_disk: Option<String>,
    /// Bootloader build version recorded at boot, if any.
    pub booted_version: Option<String>,
    /// Version of the installed application.
    pub installed_version: String,
    /// Nightly/pre-release build; carries no reliable version ordering.
    pub special_build: bool,
    /// Non-Apple hardware. Disk-mismatch prompting is meaningless there.
    pub host_is_hackintosh: bool,
    /// Whether a graphical session is available. The cycle is a no-op
    /// without one.
    pub gui_session: bool,
    /// Hardware model identifier passed to the detection probe.
    pub hardware_model: String,
    /// Path of the binary to re-invoke under privilege for patching.
    pub launcher_binary: PathBuf,
    /// Set when running from a source checkout rather than a bundled
    /// binary. The installer skips entirely in that case.
    pub running_from_source: bool,
}

/// Read-only user preference lookup.
pub trait PreferenceStore {
    /// Returns the stored flag, or `None` when the user never set it.
    fn read_bool(&self, key: &str) -> Option<bool>;
}

/// JSON-file preference store under the support directory.
///
/// A missing or unreadable file yields an empty store; the watcher never
/// fails a cycle over preferences.
#[derive(Debug, Default)]
pub struct FilePreferences {
    values: HashMap<String, bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    flags: HashMap<String, bool>,
}

impl FilePreferences {
    pub fn load(paths: &InstallPaths) -> Self {
        let path = paths.preferences_file();
        let values = fs_err::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<PreferencesFile>(&content).ok())
            .map(|file| file.flags)
            .unwrap_or_default();
        Self { values }
    }
}

impl PreferenceStore for FilePreferences {
    fn read_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }
}
