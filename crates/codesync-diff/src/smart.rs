//! One-call three-way diff: baseline, live buffer, issuer's edit.

use crate::conflict::{detect_conflicts, Conflict};
use crate::hash::hash_lines;
use crate::lcs::{fits_table, lcs};
use crate::script::{generate_edit_script, EditOperation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Operation counts for a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditStats {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
}

impl EditStats {
    pub fn from_script(script: &[EditOperation]) -> Self {
        script.iter().fold(Self::default(), |mut stats, op| {
            match op {
                EditOperation::Insert { .. } => stats.added += 1,
                EditOperation::Delete { .. } => stats.deleted += 1,
                EditOperation::Replace { .. } => stats.modified += 1,
            }
            stats
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartDiff {
    pub edit_script: Vec<EditOperation>,
    pub conflicts: Vec<Conflict>,
    pub stats: EditStats,
}

/// Split a buffer into lines the way every client does: on `'\n'` only.
///
/// An empty buffer is one empty line, and joining with `'\n'` restores the
/// input exactly.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Diff `original` against `edited` and check the result against `current`.
pub fn smart_diff(original: &str, current: &str, edited: &str) -> SmartDiff {
    let original_lines = split_lines(original);
    let current_lines = split_lines(current);
    let edited_lines = split_lines(edited);

    let pairs = if fits_table(original_lines.len(), edited_lines.len()) {
        lcs(&hash_lines(&original_lines), &hash_lines(&edited_lines))
    } else {
        warn!(
            original = original_lines.len(),
            edited = edited_lines.len(),
            "buffers too large for line diff, emitting whole-buffer script"
        );
        Vec::new()
    };

    let edit_script = generate_edit_script(&original_lines, &edited_lines, &pairs);
    let conflicts = detect_conflicts(&original_lines, &current_lines, &edit_script);
    let stats = EditStats::from_script(&edit_script);

    debug!(
        added = stats.added,
        deleted = stats.deleted,
        modified = stats.modified,
        conflicts = conflicts.len(),
        "computed smart diff"
    );

    SmartDiff {
        edit_script,
        conflicts,
        stats,
    }
}
