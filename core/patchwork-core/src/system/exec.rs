//! Privileged process execution.
//!
//! When the process is already root, commands run directly. Otherwise they
//! are wrapped in AppleScript's `do shell script ... with administrator
//! privileges`, which shows the native password prompt. There is no retry:
//! a failed or declined escalation is logged by the caller and the cycle
//! moves on.

use std::process::Command;

use tracing::debug;

use crate::error::{Result, WatchError};
use crate::probes::{Elevator, ExecOutcome};

/// Whether the current process runs with effective uid 0.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Escapes a string for embedding inside an AppleScript double-quoted
/// string literal.
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quotes one argv element for /bin/sh.
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | ':' | '='))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Joins argv into a single /bin/sh command line.
fn shell_join(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_capturing(mut command: Command, label: &str) -> Result<ExecOutcome> {
    let output = command.output().map_err(|err| WatchError::CommandSpawn {
        command: label.to_string(),
        source: err,
    })?;
    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    Ok(ExecOutcome {
        exit_code: output.status.code().unwrap_or(-1),
        output: String::from_utf8_lossy(&combined).into_owned(),
    })
}

/// Production elevator: direct execution as root, AppleScript escalation
/// otherwise.
#[derive(Debug, Default)]
pub struct OsascriptElevator;

impl Elevator for OsascriptElevator {
    fn run_elevated(&self, argv: &[String]) -> Result<ExecOutcome> {
        let Some((program, args)) = argv.split_first() else {
            return Err(WatchError::CommandFailed {
                command: String::new(),
                details: "empty argv".to_string(),
            });
        };

        if is_root() {
            debug!(command = %program, "Running privileged command directly (already root)");
            let mut command = Command::new(program);
            command.args(args);
            return run_capturing(command, program);
        }

        debug!(command = %program, "Escalating command via osascript");
        let script = format!(
            r#"do shell script "{}" with administrator privileges"#,
            applescript_escape(&shell_join(argv))
        );
        let mut command = Command::new("osascript");
        command.args(["-e", &script]);
        run_capturing(command, program)
    }

    fn run_shell_elevated(&self, command_line: &str, prompt: &str) -> Result<i32> {
        let script = format!(
            concat!(
                r#"do shell script "{}""#,
                r#" with prompt "{}""#,
                " with administrator privileges",
                " without altering line endings",
            ),
            applescript_escape(command_line),
            applescript_escape(prompt),
        );
        let outcome = run_capturing(
            {
                let mut command = Command::new("osascript");
                command.args(["-e", &script]);
                command
            },
            "osascript",
        )?;
        Ok(outcome.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_args_pass_through_unquoted() {
        assert_eq!(shell_quote("/usr/bin/true"), "/usr/bin/true");
        assert_eq!(shell_quote("--gui_patch"), "--gui_patch");
    }

    #[test]
    fn args_with_spaces_are_single_quoted() {
        assert_eq!(
            shell_quote("/Library/Application Support/Patchwork"),
            "'/Library/Application Support/Patchwork'"
        );
    }

    #[test]
    fn embedded_single_quotes_survive_quoting() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn applescript_escaping_handles_quotes_and_backslashes() {
        assert_eq!(applescript_escape(r#"say "hi\there""#), r#"say \"hi\\there\""#);
    }

    #[test]
    fn shell_join_preserves_argument_order() {
        let argv = vec![
            "rm".to_string(),
            "-R".to_string(),
            "/tmp/some dir".to_string(),
        ];
        assert_eq!(shell_join(&argv), "rm -R '/tmp/some dir'");
    }
}
