//! Update availability probe.
//!
//! The watcher does not own network transport: the full application's update
//! pipeline writes a small manifest cache under the support directory and
//! this probe only reads it. Reachability of the release host is checked
//! with a bare TCP connect and is advisory only.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::paths::InstallPaths;
use crate::probes::{UpdateInfo, UpdateProbe};
use crate::version;

/// Host:port probed for the advisory reachability check.
const RELEASE_API_HOST: &str = "api.github.com:443";

const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct UpdateManifest {
    version: String,
    link: String,
}

/// Update probe reading the manifest cache left by the full application.
#[derive(Debug)]
pub struct ManifestUpdateProbe {
    paths: InstallPaths,
    installed_version: String,
}

impl ManifestUpdateProbe {
    pub fn new(paths: InstallPaths, installed_version: impl Into<String>) -> Self {
        Self {
            paths,
            installed_version: installed_version.into(),
        }
    }

    fn load_manifest(&self) -> Option<UpdateManifest> {
        let path = self.paths.update_manifest_file();
        let content = fs_err::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "Malformed update manifest, ignoring");
                None
            }
        }
    }
}

impl UpdateProbe for ManifestUpdateProbe {
    fn check_for_update(&self) -> Option<UpdateInfo> {
        let manifest = self.load_manifest()?;
        if version::is_newer(&manifest.version, &self.installed_version) {
            Some(UpdateInfo {
                version: manifest.version,
                link: manifest.link,
            })
        } else {
            debug!(
                manifest = %manifest.version,
                installed = %self.installed_version,
                "No newer release in manifest"
            );
            None
        }
    }

    fn is_newer_than(&self, candidate: &str) -> bool {
        version::is_newer(candidate, &self.installed_version)
    }

    fn release_host_reachable(&self) -> bool {
        let addrs = match RELEASE_API_HOST.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                debug!(error = %err, host = RELEASE_API_HOST, "Release host did not resolve");
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, REACHABILITY_TIMEOUT).is_ok() {
                return true;
            }
        }
        false
    }
}
