//! Native user prompts via `osascript display dialog`.
//!
//! The watcher deliberately avoids carrying a GUI toolkit: the only visible
//! surface is the system dialog primitive, which also renders fine from a
//! launch agent. A dialog dismissed with Cancel makes osascript exit
//! non-zero; that is the normal declined path, not an error.

use std::process::Command;

use tracing::{info, warn};

use crate::probes::{PromptGateway, UpdateChoice};

const BUTTON_DOWNLOAD: &str = "Download and Install";
const BUTTON_VIEW: &str = "View on Web";
const BUTTON_IGNORE: &str = "Ignore";

/// Whether a graphical session is available for dialogs.
///
/// launchd reports the session type of the current context; anything other
/// than the Aqua window server means headless operation.
pub fn gui_session_available() -> bool {
    match Command::new("launchctl").arg("managername").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim() == "Aqua"
        }
        Ok(_) => false,
        Err(err) => {
            warn!(error = %err, "Failed to query launchctl managername");
            false
        }
    }
}

fn display_dialog(message: &str, buttons: &[&str], default: &str) -> Option<String> {
    let button_list = buttons
        .iter()
        .map(|b| format!("\"{}\"", b))
        .collect::<Vec<_>>()
        .join(", ");
    let script = format!(
        r#"display dialog "{}" buttons {{{}}} default button "{}""#,
        escape(message),
        button_list,
        default,
    );

    let output = match Command::new("osascript").args(["-e", &script]).output() {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "Failed to spawn osascript for dialog");
            return None;
        }
    };
    if !output.status.success() {
        // Cancelled or dismissed.
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .strip_prefix("button returned:")
        .map(|button| button.to_string())
}

fn confirm(message: &str) -> bool {
    let script = format!(r#"display dialog "{}""#, escape(message));
    match Command::new("osascript").args(["-e", &script]).status() {
        Ok(status) => status.success(),
        Err(err) => {
            warn!(error = %err, "Failed to spawn osascript for confirmation");
            false
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Production prompt gateway backed by the system dialog primitive.
#[derive(Debug, Default)]
pub struct NativePrompts;

impl PromptGateway for NativePrompts {
    fn ask_update(&self, installed: &str, available: &str, special_build: bool) -> UpdateChoice {
        let message = format!(
            "Current version: {}{}\nNew version: {}\n\nWould you like to update Patchwork?",
            installed,
            if special_build { " (Nightly)" } else { "" },
            available,
        );
        let choice = display_dialog(
            &message,
            &[BUTTON_IGNORE, BUTTON_VIEW, BUTTON_DOWNLOAD],
            BUTTON_DOWNLOAD,
        );
        info!(choice = ?choice, "Update prompt answered");
        match choice.as_deref() {
            Some(BUTTON_DOWNLOAD) => UpdateChoice::DownloadAndInstall,
            Some(BUTTON_VIEW) => UpdateChoice::ViewOnWeb,
            _ => UpdateChoice::Ignore,
        }
    }

    fn confirm_patch(&self, patch_list: &str, warning: &str) -> bool {
        let message = format!(
            "Patchwork has detected you're running without root patches.\n\n\
             macOS removes all root patches during OS installs and updates, \
             so they need to be reinstalled.\n\n\
             The following patches apply to your system:\n{}\n\
             Would you like to apply these patches?{}",
            patch_list, warning,
        );
        confirm(&message)
    }

    fn confirm_bootloader_rebuild(&self, booted: &str, installed: &str) -> bool {
        let message = format!(
            "Patchwork has detected that you are booting an outdated bootloader build.\n\
             - Booted: {}\n- Installed: {}\n\n\
             Would you like to update the bootloader?",
            booted, installed,
        );
        confirm(&message)
    }

    fn confirm_bootloader_relocate(&self) -> bool {
        confirm(
            "Patchwork has detected that you are booting from a USB or external drive.\n\n\
             If you would like to boot your Mac normally without the external drive \
             plugged in, the bootloader can be installed to the internal disk.\n\n\
             Would you like to launch Patchwork and install to disk?",
        )
    }
}
