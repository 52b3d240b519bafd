//! Conflict detection and whole-line resolution.
//!
//! A conflict is a line that both sides changed since the shared baseline,
//! and changed differently. Conflicts are plain data: detection never fails.

use crate::script::EditOperation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How a conflict was (or was not) settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    #[default]
    Manual,
    PreferWebapp,
    PreferVscode,
}

/// Fixed policies for settling conflicts.
///
/// The issuer is the side that produced the edit script; the live side is
/// the one whose current buffer the script is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    #[default]
    #[serde(rename = "prefer-webapp", alias = "prefer-issuer")]
    PreferIssuer,
    #[serde(rename = "prefer-vscode", alias = "prefer-live")]
    PreferLive,
}

/// A line changed independently on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// 1-indexed line in the baseline.
    pub line: usize,
    pub original: String,
    /// The live side's current text.
    pub vscode_version: String,
    /// The issuer's intended text, `None` when the issuer deletes the line.
    pub web_app_version: Option<String>,
    pub resolution: Resolution,
    /// Chosen text once resolved. `None` on a resolved conflict means the
    /// line is removed.
    #[serde(default)]
    pub resolved: Option<String>,
}

impl Conflict {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution != Resolution::Manual
    }
}

/// Check a planned edit script against the live buffer.
///
/// Only deletes and replaces can stomp a line, so inserts are never
/// flagged. Lines beyond either buffer are skipped rather than flagged.
pub fn detect_conflicts<A, B>(original: &[A], current: &[B], script: &[EditOperation]) -> Vec<Conflict>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut conflicts = Vec::new();

    for op in script.iter().filter(|op| !op.is_insert()) {
        let idx = op.line().wrapping_sub(1);
        let (Some(base), Some(live)) = (original.get(idx), current.get(idx)) else {
            continue;
        };
        let (base, live) = (base.as_ref(), live.as_ref());

        if live != base && op.intended() != Some(live) {
            conflicts.push(Conflict {
                line: op.line(),
                original: base.to_string(),
                vscode_version: live.to_string(),
                web_app_version: op.intended().map(str::to_string),
                resolution: Resolution::Manual,
                resolved: None,
            });
        }
    }

    if !conflicts.is_empty() {
        debug!(count = conflicts.len(), "detected edit conflicts");
    }
    conflicts
}

/// Settle every conflict with one policy.
pub fn resolve_conflicts(conflicts: &[Conflict], strategy: ResolutionStrategy) -> Vec<Conflict> {
    conflicts
        .iter()
        .cloned()
        .map(|mut c| {
            match strategy {
                ResolutionStrategy::PreferIssuer => {
                    c.resolved = c.web_app_version.clone();
                    c.resolution = Resolution::PreferWebapp;
                }
                ResolutionStrategy::PreferLive => {
                    c.resolved = Some(c.vscode_version.clone());
                    c.resolution = Resolution::PreferVscode;
                }
            }
            c
        })
        .collect()
}

/// Substitute resolved text into the edit script.
///
/// Only deletes and replaces at a resolved line are rewritten; inserts that
/// happen to share the line number are left alone, as are conflicts still
/// awaiting a manual decision.
pub fn apply_resolutions(script: &[EditOperation], resolved: &[Conflict]) -> Vec<EditOperation> {
    let choices: HashMap<usize, &Option<String>> = resolved
        .iter()
        .filter(|c| c.is_resolved())
        .map(|c| (c.line, &c.resolved))
        .collect();

    script
        .iter()
        .map(|op| {
            let Some(choice) = choices.get(&op.line()) else {
                return op.clone();
            };
            match (op, choice) {
                (EditOperation::Insert { .. }, _) => op.clone(),
                (EditOperation::Replace { line, old_content, .. }, Some(text))
                | (EditOperation::Delete { line, content: old_content }, Some(text)) => {
                    EditOperation::Replace {
                        line: *line,
                        old_content: old_content.clone(),
                        content: text.clone(),
                    }
                }
                (EditOperation::Replace { line, old_content, .. }, None)
                | (EditOperation::Delete { line, content: old_content }, None) => {
                    EditOperation::Delete {
                        line: *line,
                        content: old_content.clone(),
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(line: usize, old: &str, new: &str) -> EditOperation {
        EditOperation::Replace {
            line,
            old_content: old.into(),
            content: new.into(),
        }
    }

    #[test]
    fn test_both_sides_changed_same_line() {
        let original = ["a", "b", "c"];
        let current = ["a", "X", "c"];
        let script = vec![replace(2, "b", "Y")];

        let conflicts = detect_conflicts(&original, &current, &script);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.line, 2);
        assert_eq!(c.original, "b");
        assert_eq!(c.vscode_version, "X");
        assert_eq!(c.web_app_version.as_deref(), Some("Y"));
        assert_eq!(c.resolution, Resolution::Manual);
        assert!(!c.is_resolved());
    }

    #[test]
    fn test_converging_edit_is_not_a_conflict() {
        let conflicts = detect_conflicts(&["a", "b"], &["a", "Y"], &[replace(2, "b", "Y")]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_untouched_live_line_is_not_a_conflict() {
        let conflicts = detect_conflicts(&["a", "b"], &["a", "b"], &[replace(2, "b", "Y")]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_inserts_never_flagged() {
        let script = vec![EditOperation::Insert {
            line: 2,
            content: "new".into(),
        }];
        assert!(detect_conflicts(&["a", "b"], &["a", "X"], &script).is_empty());
    }

    #[test]
    fn test_delete_of_changed_line_conflicts() {
        let script = vec![EditOperation::Delete {
            line: 1,
            content: "a".into(),
        }];
        let conflicts = detect_conflicts(&["a"], &["A"], &script);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].web_app_version, None);
    }

    #[test]
    fn test_out_of_range_lines_skipped() {
        let script = vec![replace(3, "c", "Z")];
        assert!(detect_conflicts(&["a", "b", "c"], &["a"], &script).is_empty());
        assert!(detect_conflicts(&["a", "b", "c"], &["a"], &[replace(0, "", "Z")]).is_empty());
    }

    #[test]
    fn test_resolve_and_apply() {
        let script = vec![replace(2, "b", "Y")];
        let conflicts = detect_conflicts(&["a", "b", "c"], &["a", "X", "c"], &script);

        let issuer = resolve_conflicts(&conflicts, ResolutionStrategy::PreferIssuer);
        assert_eq!(issuer[0].resolved.as_deref(), Some("Y"));
        assert!(issuer[0].is_resolved());
        assert_eq!(apply_resolutions(&script, &issuer), vec![replace(2, "b", "Y")]);

        let live = resolve_conflicts(&conflicts, ResolutionStrategy::PreferLive);
        assert_eq!(live[0].resolved.as_deref(), Some("X"));
        assert_eq!(live[0].resolution, Resolution::PreferVscode);
        assert_eq!(apply_resolutions(&script, &live), vec![replace(2, "b", "X")]);
    }

    #[test]
    fn test_prefer_live_turns_delete_into_replace() {
        let script = vec![EditOperation::Delete {
            line: 1,
            content: "a".into(),
        }];
        let conflicts = detect_conflicts(&["a"], &["A"], &script);
        let live = resolve_conflicts(&conflicts, ResolutionStrategy::PreferLive);
        assert_eq!(apply_resolutions(&script, &live), vec![replace(1, "a", "A")]);

        let issuer = resolve_conflicts(&conflicts, ResolutionStrategy::PreferIssuer);
        assert_eq!(apply_resolutions(&script, &issuer), script);
    }

    #[test]
    fn test_manual_conflicts_leave_script_untouched() {
        let script = vec![replace(2, "b", "Y")];
        let conflicts = detect_conflicts(&["a", "b"], &["a", "X"], &script);
        assert_eq!(apply_resolutions(&script, &conflicts), script);
    }

    #[test]
    fn test_strategy_wire_names() {
        let s: ResolutionStrategy = serde_json::from_str("\"prefer-webapp\"").unwrap();
        assert_eq!(s, ResolutionStrategy::PreferIssuer);
        let s: ResolutionStrategy = serde_json::from_str("\"prefer-live\"").unwrap();
        assert_eq!(s, ResolutionStrategy::PreferLive);
        assert_eq!(
            serde_json::to_string(&Resolution::Manual).unwrap(),
            "\"manual\""
        );
    }
}
