//! Patch detection report types.
//!
//! The detection probe classifies every finding up front instead of relying
//! on name prefixes: a finding is either a patch that may apply to this
//! hardware, a user setting echoed back by the detector, or a validation
//! precondition. Only `Patch` entries make a report actionable.

use serde::{Deserialize, Serialize};

/// Name of the validation entry gating whether patching can run at all.
pub const VALIDATION_PATCHING_POSSIBLE: &str = "Patching Possible";

/// One finding from the patch detection probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchEntry {
    /// A compatibility patch and whether it applies to the probed hardware.
    Patch { name: String, applies: bool },
    /// A user configuration flag surfaced by the detector. Never prompts.
    Setting { name: String, value: bool },
    /// A precondition check, e.g. "Patching Possible".
    Validation { name: String, ok: bool },
}

/// Ordered report produced fresh by the detection probe each cycle.
/// Never persisted; consumed immediately and discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    pub entries: Vec<PatchEntry>,
}

impl PatchReport {
    pub fn new(entries: Vec<PatchEntry>) -> Self {
        Self { entries }
    }

    /// A report is actionable iff at least one patch entry applies.
    /// Settings and validations never count.
    pub fn actionable(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, PatchEntry::Patch { applies: true, .. }))
    }

    /// Whether the detector judged patching safe to attempt.
    /// A missing validation entry is treated as "not possible".
    pub fn patching_possible(&self) -> bool {
        self.entries.iter().any(|e| {
            matches!(e, PatchEntry::Validation { name, ok: true }
                if name == VALIDATION_PATCHING_POSSIBLE)
        })
    }

    /// Names of the applicable patches, in report order.
    pub fn applicable_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                PatchEntry::Patch { name, applies: true } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Human-readable bullet list of applicable patches for the
    /// confirmation prompt.
    pub fn bullet_list(&self) -> String {
        self.applicable_names()
            .iter()
            .map(|name| format!("- {}\n", name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(name: &str, applies: bool) -> PatchEntry {
        PatchEntry::Patch {
            name: name.to_string(),
            applies,
        }
    }

    #[test]
    fn empty_report_is_not_actionable() {
        assert!(!PatchReport::default().actionable());
    }

    #[test]
    fn all_false_patches_are_not_actionable() {
        let report = PatchReport::new(vec![
            patch("Legacy Graphics", false),
            patch("Legacy Wireless", false),
        ]);
        assert!(!report.actionable());
    }

    #[test]
    fn settings_and_validations_never_make_a_report_actionable() {
        let report = PatchReport::new(vec![
            PatchEntry::Setting {
                name: "Kernel Debug Kit missing".to_string(),
                value: true,
            },
            PatchEntry::Validation {
                name: VALIDATION_PATCHING_POSSIBLE.to_string(),
                ok: true,
            },
        ]);
        assert!(!report.actionable());
    }

    #[test]
    fn one_applicable_patch_is_actionable() {
        let report = PatchReport::new(vec![
            patch("Legacy Graphics", false),
            patch("Legacy Audio", true),
        ]);
        assert!(report.actionable());
    }

    #[test]
    fn patching_possible_defaults_to_false_when_absent() {
        let report = PatchReport::new(vec![patch("Legacy Audio", true)]);
        assert!(!report.patching_possible());
    }

    #[test]
    fn patching_possible_reads_the_named_validation() {
        let report = PatchReport::new(vec![
            patch("Legacy Audio", true),
            PatchEntry::Validation {
                name: VALIDATION_PATCHING_POSSIBLE.to_string(),
                ok: true,
            },
        ]);
        assert!(report.patching_possible());
    }

    #[test]
    fn bullet_list_renders_only_applicable_patches() {
        let report = PatchReport::new(vec![
            patch("Legacy Graphics", true),
            patch("Legacy Wireless", false),
            PatchEntry::Setting {
                name: "Verbose Boot".to_string(),
                value: true,
            },
            patch("Legacy Audio", true),
        ]);
        assert_eq!(report.bullet_list(), "- Legacy Graphics\n- Legacy Audio\n");
    }
}
