//! Conditional update-monitor daemon.
//!
//! Rapid security responses replace the OS image under the preboot volume
//! without a full install, which silently re-activates stock GPU kernel
//! extensions that patched systems must not load. When such extensions are
//! present, the watcher ships a launch daemon that watches the OS image and
//! force-removes them whenever it changes.
//!
//! The builder decides whether that daemon is needed and, if so, rewrites
//! the shipped descriptor template with the concrete removal targets before
//! the installer stages it.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::paths::InstallPaths;

/// Marker key in a kext's Info.plist identifying extensions with companion
/// GPU bundles, i.e. the ones the monitor must remove.
const COMPANION_BUNDLE_KEY: &str = "GPUCompanionBundles";

/// Decides whether the update-monitor daemon is needed and prepares its
/// descriptor. Seam so the installer can be tested without a kext tree.
pub trait DaemonBuilder {
    /// Returns true when the daemon descriptor was prepared and should be
    /// installed.
    fn build_if_needed(&self, bundle: &Path) -> bool;
}

/// Production builder scanning the kernel-extension directory.
#[derive(Debug)]
pub struct KextMonitorBuilder {
    paths: InstallPaths,
    /// UUID of the booted volume group, used to locate the preboot OS
    /// image. `None` when it could not be resolved.
    volume_uuid: Option<String>,
}

impl KextMonitorBuilder {
    pub fn new(paths: InstallPaths, volume_uuid: Option<String>) -> Self {
        Self { paths, volume_uuid }
    }

    /// Names of installed kexts declaring companion bundles. A bundle with
    /// a missing or malformed descriptor is skipped with a log line; a
    /// broken third-party extension must never abort the scan.
    fn companion_kexts(&self) -> Vec<String> {
        let extensions_dir = self.paths.extensions_dir();
        let entries = match fs_err::read_dir(&extensions_dir) {
            Ok(entries) => entries,
            Err(err) => {
                info!(error = %err, dir = %extensions_dir.display(), "No extensions directory to scan");
                return Vec::new();
            }
        };

        let mut kexts = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".kext") {
                continue;
            }
            let descriptor = path.join("Contents/Info.plist");
            if !descriptor.exists() {
                continue;
            }
            let value: plist::Value = match plist::Value::from_file(&descriptor) {
                Ok(value) => value,
                Err(err) => {
                    info!(kext = %name, error = %err, "Failed to parse kext descriptor, skipping");
                    continue;
                }
            };
            let has_marker = value
                .as_dictionary()
                .is_some_and(|dict| dict.contains_key(COMPANION_BUNDLE_KEY));
            if has_marker {
                info!(kext = %name, "Found kext with companion bundles");
                kexts.push(name);
            }
        }
        kexts.sort();
        kexts
    }

    /// Rewrites the shipped daemon template in place: the argument list
    /// becomes a forced recursive delete of every companion kext, and the
    /// watch list becomes the single OS image path. The descriptor is
    /// replaced wholesale so launchd never sees a half-written file.
    fn rewrite_template(
        &self,
        template: &Path,
        kexts: &[String],
        os_image: &Path,
    ) -> crate::error::Result<()> {
        let value = plist::Value::from_file(template).map_err(|source| {
            crate::error::WatchError::DescriptorMalformed {
                path: template.to_path_buf(),
                source,
            }
        })?;
        let Some(mut dict) = value.into_dictionary() else {
            return Err(crate::error::WatchError::DescriptorNotFound(
                template.to_path_buf(),
            ));
        };

        let mut arguments = vec!["rm".to_string(), "-Rfv".to_string()];
        arguments.extend(
            kexts
                .iter()
                .map(|kext| self.paths.extensions_dir().join(kext).to_string_lossy().into_owned()),
        );
        dict.insert(
            "ProgramArguments".to_string(),
            plist::Value::Array(arguments.into_iter().map(plist::Value::String).collect()),
        );
        dict.insert(
            "WatchPaths".to_string(),
            plist::Value::Array(vec![plist::Value::String(
                os_image.to_string_lossy().into_owned(),
            )]),
        );

        plist::Value::Dictionary(dict)
            .to_file_xml(template)
            .map_err(|source| crate::error::WatchError::DescriptorWriteFailed {
                path: template.to_path_buf(),
                source,
            })
    }
}

impl DaemonBuilder for KextMonitorBuilder {
    fn build_if_needed(&self, bundle: &Path) -> bool {
        info!("Checking whether the update-monitor daemon is needed");

        let Some(uuid) = self.volume_uuid.as_deref() else {
            info!("Booted volume UUID unknown, skipping update monitor");
            return false;
        };
        let os_image = self.paths.preboot_os_image(uuid);
        if !os_image.exists() {
            info!(image = %os_image.display(), "No preboot OS image, update monitor not needed");
            return false;
        }

        let kexts = self.companion_kexts();
        if kexts.is_empty() {
            info!("No kexts with companion bundles, update monitor not needed");
            return false;
        }

        let template = self.paths.daemon_plist_template(bundle);
        match self.rewrite_template(&template, &kexts, &os_image) {
            Ok(()) => {
                info!(?kexts, "Update-monitor descriptor prepared");
                true
            }
            Err(err) => {
                warn!(error = %err, "Failed to prepare update-monitor descriptor");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VOLUME_UUID: &str = "0B2F4E58-1111-2222-3333-444455556666";

    struct Fixture {
        _temp: TempDir,
        paths: InstallPaths,
        bundle: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let paths = InstallPaths::with_root(temp.path());

        let bundle = temp.path().join("Patchwork.app");
        let resources = bundle.join("Contents/Resources");
        fs_err::create_dir_all(&resources).unwrap();
        write_plist(
            &paths.daemon_plist_template(&bundle),
            &[
                ("Label", plist::Value::String("org.patchwork.update-monitor".into())),
                ("RunAtLoad", plist::Value::Boolean(false)),
                (
                    "ProgramArguments",
                    plist::Value::Array(vec![plist::Value::String("/usr/bin/true".into())]),
                ),
            ],
        );

        Fixture {
            _temp: temp,
            paths,
            bundle,
        }
    }

    fn write_plist(path: &Path, entries: &[(&str, plist::Value)]) {
        let mut dict = plist::Dictionary::new();
        for (key, value) in entries {
            dict.insert(key.to_string(), value.clone());
        }
        plist::Value::Dictionary(dict).to_file_xml(path).unwrap();
    }

    fn add_os_image(fix: &Fixture) {
        let image = fix.paths.preboot_os_image(VOLUME_UUID);
        fs_err::create_dir_all(image.parent().unwrap()).unwrap();
        fs_err::write(&image, b"dmg").unwrap();
    }

    fn add_kext(fix: &Fixture, name: &str, with_marker: bool) {
        let descriptor = fix
            .paths
            .extensions_dir()
            .join(name)
            .join("Contents/Info.plist");
        fs_err::create_dir_all(descriptor.parent().unwrap()).unwrap();
        let mut entries = vec![(
            "CFBundleIdentifier",
            plist::Value::String(format!("test.{}", name)),
        )];
        if with_marker {
            entries.push((
                COMPANION_BUNDLE_KEY,
                plist::Value::Array(vec![plist::Value::String("Companion".into())]),
            ));
        }
        write_plist(&descriptor, &entries);
    }

    fn builder(fix: &Fixture) -> KextMonitorBuilder {
        KextMonitorBuilder::new(fix.paths.clone(), Some(VOLUME_UUID.to_string()))
    }

    fn template_bytes(fix: &Fixture) -> Vec<u8> {
        fs_err::read(fix.paths.daemon_plist_template(&fix.bundle)).unwrap()
    }

    #[test]
    fn missing_os_image_means_not_needed() {
        let fix = fixture();
        add_kext(&fix, "LegacyGPU.kext", true);

        let before = template_bytes(&fix);
        assert!(!builder(&fix).build_if_needed(&fix.bundle));
        assert_eq!(template_bytes(&fix), before);
    }

    #[test]
    fn unknown_volume_uuid_means_not_needed() {
        let fix = fixture();
        let builder = KextMonitorBuilder::new(fix.paths.clone(), None);
        assert!(!builder.build_if_needed(&fix.bundle));
    }

    #[test]
    fn no_matching_kexts_means_not_needed_and_template_untouched() {
        let fix = fixture();
        add_os_image(&fix);
        add_kext(&fix, "Harmless.kext", false);

        let before = template_bytes(&fix);
        assert!(!builder(&fix).build_if_needed(&fix.bundle));
        assert_eq!(template_bytes(&fix), before);
    }

    #[test]
    fn matching_kexts_rewrite_arguments_and_watch_paths() {
        let fix = fixture();
        add_os_image(&fix);
        add_kext(&fix, "LegacyGPUA.kext", true);
        add_kext(&fix, "LegacyGPUB.kext", true);
        add_kext(&fix, "Harmless.kext", false);

        assert!(builder(&fix).build_if_needed(&fix.bundle));

        let value = plist::Value::from_file(fix.paths.daemon_plist_template(&fix.bundle)).unwrap();
        let dict = value.as_dictionary().unwrap();

        let arguments: Vec<String> = dict.get("ProgramArguments").unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_string().unwrap().to_string())
            .collect();
        assert_eq!(arguments[..2], ["rm".to_string(), "-Rfv".to_string()]);
        assert_eq!(arguments.len(), 4);
        assert!(arguments[2].ends_with("Library/Extensions/LegacyGPUA.kext"));
        assert!(arguments[3].ends_with("Library/Extensions/LegacyGPUB.kext"));

        let watch_paths: Vec<String> = dict.get("WatchPaths").unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_string().unwrap().to_string())
            .collect();
        assert_eq!(
            watch_paths,
            vec![fix
                .paths
                .preboot_os_image(VOLUME_UUID)
                .to_string_lossy()
                .into_owned()]
        );

        // Untouched template keys survive the rewrite.
        assert_eq!(
            dict.get("Label").unwrap().as_string(),
            Some("org.patchwork.update-monitor")
        );
    }

    #[test]
    fn malformed_kext_descriptor_is_skipped_not_fatal() {
        let fix = fixture();
        add_os_image(&fix);

        let broken = fix
            .paths
            .extensions_dir()
            .join("Broken.kext/Contents/Info.plist");
        fs_err::create_dir_all(broken.parent().unwrap()).unwrap();
        fs_err::write(&broken, b"not a plist at all").unwrap();
        add_kext(&fix, "LegacyGPU.kext", true);

        assert!(builder(&fix).build_if_needed(&fix.bundle));
    }

    #[test]
    fn kext_without_descriptor_is_skipped() {
        let fix = fixture();
        add_os_image(&fix);
        fs_err::create_dir_all(fix.paths.extensions_dir().join("Empty.kext/Contents")).unwrap();
        add_kext(&fix, "LegacyGPU.kext", true);

        assert!(builder(&fix).build_if_needed(&fix.bundle));

        let value = plist::Value::from_file(fix.paths.daemon_plist_template(&fix.bundle)).unwrap();
        let arguments = value.as_dictionary().unwrap().get("ProgramArguments").unwrap()
            .as_array()
            .unwrap()
            .len();
        // rm, -Rfv, and exactly one kext path.
        assert_eq!(arguments, 3);
    }
}
