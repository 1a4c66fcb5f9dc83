//! Disk enumeration and seal probes backed by `diskutil`.
//!
//! All `diskutil` calls use `-plist` output and tolerate missing keys:
//! a key the tool did not report becomes `None`, which the engine resolves
//! to its no-prompt branch.

use std::io::Cursor;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::probes::{DiskInfo, DiskProbe, SealProbe};

static BASE_DISK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:/dev/)?(disk\d+)").expect("valid regex"));

/// Strips partition/slice suffixes from a BSD disk identifier.
///
/// `disk0s1` -> `disk0`, `/dev/disk10s2` -> `disk10`. Returns `None` for
/// strings that are not disk identifiers at all.
pub fn base_disk_identifier(identifier: &str) -> Option<String> {
    BASE_DISK_RE
        .captures(identifier.trim())
        .map(|caps| caps[1].to_string())
}

/// Whether two identifiers refer to the same physical disk.
pub fn same_physical_disk(a: &str, b: &str) -> bool {
    match (base_disk_identifier(a), base_disk_identifier(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Subset of `diskutil info -plist` output the watcher cares about.
#[derive(Debug, Default, Deserialize)]
struct DiskUtilInfo {
    #[serde(rename = "DeviceIdentifier")]
    device_identifier: Option<String>,
    #[serde(rename = "Ejectable")]
    ejectable: Option<bool>,
    #[serde(rename = "Sealed")]
    sealed: Option<String>,
    #[serde(rename = "APFSPhysicalStores")]
    physical_stores: Option<Vec<PhysicalStoreEntry>>,
    #[serde(rename = "VolumeUUID")]
    volume_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhysicalStoreEntry {
    #[serde(rename = "APFSPhysicalStore")]
    device_identifier: Option<String>,
}

fn diskutil_info(target: &str) -> Option<DiskUtilInfo> {
    let output = Command::new("diskutil")
        .args(["info", "-plist", target])
        .output();

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, target, "Failed to spawn diskutil");
            return None;
        }
    };
    if !output.status.success() {
        warn!(
            target,
            code = output.status.code().unwrap_or(-1),
            "diskutil info exited non-zero"
        );
        return None;
    }

    match plist::from_reader(Cursor::new(output.stdout)) {
        Ok(info) => Some(info),
        Err(err) => {
            warn!(error = %err, target, "Failed to parse diskutil plist output");
            None
        }
    }
}

/// UUID of the booted macOS volume, used to locate its preboot directory.
pub fn booted_volume_uuid() -> Option<String> {
    diskutil_info("/").and_then(|info| info.volume_uuid)
}

/// Production disk probe shelling out to `diskutil`.
#[derive(Debug, Default)]
pub struct DiskUtilProbe;

impl DiskProbe for DiskUtilProbe {
    fn macos_volume_disk(&self) -> Option<String> {
        let info = diskutil_info("/")?;
        debug!(disk = ?info.device_identifier, "Resolved macOS volume disk");
        info.device_identifier
    }

    fn apfs_physical_stores(&self, disk: &str) -> Vec<String> {
        let Some(info) = diskutil_info(disk) else {
            return Vec::new();
        };
        info.physical_stores
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.device_identifier)
            .collect()
    }

    fn disk_info(&self, disk: &str) -> Option<DiskInfo> {
        let info = diskutil_info(disk)?;
        Some(DiskInfo {
            ejectable: info.ejectable,
        })
    }
}

/// Seal probe reading the booted snapshot's `Sealed` property.
#[derive(Debug, Default)]
pub struct SnapshotSealProbe;

impl SealProbe for SnapshotSealProbe {
    fn seal_intact(&self) -> bool {
        match diskutil_info("/").and_then(|info| info.sealed) {
            Some(state) => state == "Yes",
            None => {
                // No Sealed key at all, e.g. HFS+ or old diskutil. Treat as
                // intact so patch detection still runs.
                debug!("diskutil reported no Sealed key, assuming intact");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_slice_suffix() {
        assert_eq!(base_disk_identifier("disk0s1"), Some("disk0".to_string()));
        assert_eq!(base_disk_identifier("disk2s1s1"), Some("disk2".to_string()));
    }

    #[test]
    fn handles_dev_prefix_and_whitespace() {
        assert_eq!(
            base_disk_identifier(" /dev/disk10s2 "),
            Some("disk10".to_string())
        );
    }

    #[test]
    fn rejects_non_disk_strings() {
        assert_eq!(base_disk_identifier(""), None);
        assert_eq!(base_disk_identifier("sda1"), None);
    }

    #[test]
    fn multi_digit_disks_do_not_prefix_match() {
        // disk1 must not match disk10
        assert!(!same_physical_disk("disk1s1", "disk10s2"));
        assert!(same_physical_disk("disk10s1", "disk10s2"));
    }

    #[test]
    fn same_disk_across_slices() {
        assert!(same_physical_disk("disk0s1", "disk0s2"));
        assert!(!same_physical_disk("disk2s1", "disk0s2"));
    }

    #[test]
    fn parses_diskutil_plist_payload() {
        let payload = br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>DeviceIdentifier</key><string>disk3s1</string>
    <key>Ejectable</key><false/>
    <key>Sealed</key><string>Yes</string>
    <key>APFSPhysicalStores</key>
    <array>
        <dict><key>APFSPhysicalStore</key><string>disk0s2</string></dict>
    </array>
</dict>
</plist>"#;
        let info: DiskUtilInfo = plist::from_reader(Cursor::new(&payload[..])).unwrap();
        assert_eq!(info.device_identifier.as_deref(), Some("disk3s1"));
        assert_eq!(info.ejectable, Some(false));
        assert_eq!(info.sealed.as_deref(), Some("Yes"));
        let stores: Vec<_> = info
            .physical_stores
            .unwrap()
            .into_iter()
            .filter_map(|e| e.device_identifier)
            .collect();
        assert_eq!(stores, vec!["disk0s2".to_string()]);
    }

    #[test]
    fn missing_ejectable_key_stays_none() {
        let payload = br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>DeviceIdentifier</key><string>disk2</string>
</dict>
</plist>"#;
        let info: DiskUtilInfo = plist::from_reader(Cursor::new(&payload[..])).unwrap();
        assert_eq!(info.ejectable, None);
    }
}
