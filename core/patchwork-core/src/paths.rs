//! Filesystem layout for everything the watcher installs or inspects.
//!
//! All privileged install targets, descriptor locations, and probe
//! directories are resolved through a single `InstallPaths` value so that:
//!
//! - path decisions live in one place instead of scattered string literals
//! - tests can inject a temp root and exercise the installer and daemon
//!   builder without touching the real `/Library`
//!
//! Production code uses `InstallPaths::default()`, which roots everything at
//! `/`. Tests use `InstallPaths::with_root(temp_dir)`.

use std::path::{Path, PathBuf};

/// Canonical name of the staged application bundle.
pub const APP_BUNDLE_NAME: &str = "Patchwork.app";

/// File name of the recurring launch agent descriptor.
pub const AGENT_PLIST_NAME: &str = "org.patchwork.auto-patch.plist";

/// File name of the conditional update-monitor launch daemon descriptor.
pub const DAEMON_PLIST_NAME: &str = "org.patchwork.update-monitor.plist";

/// Central layout for all watcher filesystem targets.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    /// Prefix prepended to every absolute target (default: `/`).
    root: PathBuf,
}

impl Default for InstallPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl InstallPaths {
    /// Creates a layout rooted at an arbitrary directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root prefix.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────
    // Install Targets
    // ─────────────────────────────────────────────────────────────────────

    /// Support directory holding the staged application bundle.
    /// `/Library/Application Support/Patchwork`
    pub fn support_dir(&self) -> PathBuf {
        self.root.join("Library/Application Support/Patchwork")
    }

    /// Staged application bundle inside the support directory.
    pub fn staged_app(&self) -> PathBuf {
        self.support_dir().join(APP_BUNDLE_NAME)
    }

    /// Installed launch agent descriptor.
    pub fn agent_plist(&self) -> PathBuf {
        self.launch_agents_dir().join(AGENT_PLIST_NAME)
    }

    /// `/Library/LaunchAgents`
    pub fn launch_agents_dir(&self) -> PathBuf {
        self.root.join("Library/LaunchAgents")
    }

    /// Installed launch daemon descriptor.
    pub fn daemon_plist(&self) -> PathBuf {
        self.launch_daemons_dir().join(DAEMON_PLIST_NAME)
    }

    /// `/Library/LaunchDaemons`
    pub fn launch_daemons_dir(&self) -> PathBuf {
        self.root.join("Library/LaunchDaemons")
    }

    /// User-visible alias in `/Applications`. Never overwritten if present.
    pub fn app_alias(&self) -> PathBuf {
        self.root.join("Applications").join(APP_BUNDLE_NAME)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shipped Payload (inside the running bundle)
    // ─────────────────────────────────────────────────────────────────────

    /// Template agent descriptor shipped inside the application bundle.
    pub fn agent_plist_template(&self, bundle: &Path) -> PathBuf {
        bundle.join("Contents/Resources").join(AGENT_PLIST_NAME)
    }

    /// Template daemon descriptor shipped inside the application bundle.
    /// The conditional builder rewrites this file in place before staging.
    pub fn daemon_plist_template(&self, bundle: &Path) -> PathBuf {
        bundle.join("Contents/Resources").join(DAEMON_PLIST_NAME)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Probe Directories
    // ─────────────────────────────────────────────────────────────────────

    /// Third-party kernel extension directory scanned by the daemon builder.
    pub fn extensions_dir(&self) -> PathBuf {
        self.root.join("Library/Extensions")
    }

    /// Preboot OS image for a given volume-group UUID. Presence of this file
    /// is the trigger condition for the update-monitor daemon.
    pub fn preboot_os_image(&self, volume_uuid: &str) -> PathBuf {
        self.root
            .join("System/Volumes/Preboot")
            .join(volume_uuid)
            .join("cryptex1/current/OS.dmg")
    }

    // ─────────────────────────────────────────────────────────────────────
    // Agent-Owned Files
    // ─────────────────────────────────────────────────────────────────────

    /// Preference file backing the user-preference store.
    pub fn preferences_file(&self) -> PathBuf {
        self.support_dir().join("preferences.json")
    }

    /// Update manifest cache written by the full application's update check.
    pub fn update_manifest_file(&self) -> PathBuf {
        self.support_dir().join("update-manifest.json")
    }
}
