//! Boot context capture.
//!
//! Everything the decision cycle needs to know about this boot is gathered
//! here, once, before any decision runs. Probes that cannot answer resolve
//! to `None` or a conservative default; the engine treats absence as
//! "nothing to reconcile".

use std::env;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use patchwork_core::system::gui_session_available;
use patchwork_core::{
    bundle_root, BootContext, FilePreferences, InstallPaths, PreferenceStore,
    PREF_HOST_IS_HACKINTOSH,
};

/// NVRAM namespace the bootloader records its boot facts under.
const NVRAM_NAMESPACE: &str = "9B3C1F42-5DE0-4A8E-9C51-27D0E8A1B4F3";
/// Bootloader build version, written by the bootloader at boot.
const NVRAM_BOOT_VERSION: &str = "bootloader-version";
/// BSD identifier of the disk the bootloader was loaded from.
const NVRAM_BOOT_DISK: &str = "boot-disk";

/// Name of the main executable inside the app bundle.
const BUNDLE_BINARY_NAME: &str = "Patchwork";

pub fn boot_context(paths: &InstallPaths) -> BootContext {
    let prefs = FilePreferences::load(paths);
    let installed_version = env!("CARGO_PKG_VERSION").to_string();
    let special_build = is_special_build(&installed_version);

    let exe = env::current_exe().ok();
    let bundle = exe.as_deref().and_then(bundle_root);
    let running_from_source = bundle.is_none();
    let launcher_binary = bundle
        .map(|root| root.join("Contents/MacOS").join(BUNDLE_BINARY_NAME))
        .or(exe)
        .unwrap_or_else(|| PathBuf::from(BUNDLE_BINARY_NAME));

    BootContext {
        booted_disk: nvram_value(NVRAM_BOOT_DISK),
        booted_version: nvram_value(NVRAM_BOOT_VERSION),
        installed_version,
        special_build,
        host_is_hackintosh: prefs.read_bool(PREF_HOST_IS_HACKINTOSH).unwrap_or(false),
        gui_session: gui_session_available(),
        hardware_model: hardware_model(),
        launcher_binary,
        running_from_source,
    }
}

/// Release builds carry a plain dotted-numeric version. Anything else
/// (nightly suffix, commit hash) is a special build with no reliable
/// ordering against the release stream.
fn is_special_build(version: &str) -> bool {
    !version
        .chars()
        .all(|ch| ch.is_ascii_digit() || ch == '.')
}

fn nvram_value(variable: &str) -> Option<String> {
    let name = format!("{}:{}", NVRAM_NAMESPACE, variable);
    let output = Command::new("/usr/sbin/nvram").arg(&name).output().ok()?;
    if !output.status.success() {
        debug!(variable = %name, "NVRAM variable not set");
        return None;
    }
    parse_nvram_output(&String::from_utf8_lossy(&output.stdout))
}

/// `nvram <name>` prints `name<TAB>value`; values may carry `%00` padding.
fn parse_nvram_output(stdout: &str) -> Option<String> {
    let value = stdout.split_once('\t')?.1.trim_end();
    let value = value.trim_end_matches("%00");
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn hardware_model() -> String {
    let output = Command::new("/usr/sbin/sysctl")
        .args(["-n", "hw.model"])
        .output();
    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            warn!(code = ?output.status.code(), "sysctl hw.model failed");
            String::new()
        }
        Err(err) => {
            warn!(error = %err, "Failed to spawn sysctl");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tab_separated_nvram_output() {
        let out = "9B3C1F42-5DE0-4A8E-9C51-27D0E8A1B4F3:boot-disk\tdisk0s1\n";
        assert_eq!(parse_nvram_output(out), Some("disk0s1".to_string()));
    }

    #[test]
    fn strips_null_padding() {
        let out = "ns:bootloader-version\t1.4.0%00%00\n";
        assert_eq!(parse_nvram_output(out), Some("1.4.0".to_string()));
    }

    #[test]
    fn empty_value_is_absent() {
        assert_eq!(parse_nvram_output("ns:boot-disk\t%00\n"), None);
        assert_eq!(parse_nvram_output("garbage with no tab"), None);
    }

    #[test]
    fn dotted_numeric_versions_are_release_builds() {
        assert!(!is_special_build("1.4.0"));
        assert!(!is_special_build("2.0"));
        assert!(is_special_build("1.4.0-nightly"));
        assert!(is_special_build("1.5.0+8f3a2c"));
    }
}
