//! Edit scripts: ordered insert/delete/replace operations.

use crate::lcs::LcsPair;
use serde::{Deserialize, Serialize};

/// One step of an edit script.
///
/// `line` is always 1-indexed and addresses the *original* buffer. An
/// insert at `line` goes before original line `line`; `len + 1` appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOperation {
    Insert {
        line: usize,
        content: String,
    },
    Delete {
        line: usize,
        /// The removed original text.
        content: String,
    },
    Replace {
        line: usize,
        #[serde(rename = "oldContent")]
        old_content: String,
        content: String,
    },
}

impl EditOperation {
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Insert { line, .. } | Self::Delete { line, .. } | Self::Replace { line, .. } => {
                *line
            }
        }
    }

    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    /// Text this operation leaves at its line, `None` for a delete.
    #[must_use]
    pub fn intended(&self) -> Option<&str> {
        match self {
            Self::Insert { content, .. } | Self::Replace { content, .. } => Some(content),
            Self::Delete { .. } => None,
        }
    }
}

/// Turn an LCS alignment of `original` and `edited` into an edit script.
///
/// Walks both buffers with one cursor each plus an index into `pairs`. The
/// unmatched lines in each gap before the next matched pair (or before the
/// end of both buffers once the alignment is exhausted) are paired up as
/// replaces; the rest of the gap becomes deletes when the original side is
/// longer and inserts when the edited side is.
///
/// Replaying the result in order against `original` yields `edited`.
/// Pairs that do not come from an alignment of these two buffers (past the
/// end, not strictly increasing, or joining lines with different text) are
/// skipped, so a bad alignment only makes the script longer.
pub fn generate_edit_script<A, B>(original: &[A], edited: &[B], pairs: &[LcsPair]) -> Vec<EditOperation>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut edits = Vec::new();
    let (mut orig, mut edit, mut k) = (0usize, 0usize, 0usize);

    while orig < original.len() || edit < edited.len() {
        while pairs.get(k).is_some_and(|p| {
            p.i < orig
                || p.j < edit
                || p.i >= original.len()
                || p.j >= edited.len()
                || original[p.i].as_ref() != edited[p.j].as_ref()
        }) {
            k += 1;
        }

        let (target_i, target_j) = pairs
            .get(k)
            .map_or((original.len(), edited.len()), |p| (p.i, p.j));

        if k < pairs.len() && orig == target_i && edit == target_j {
            orig += 1;
            edit += 1;
            k += 1;
        } else if orig < target_i && edit < target_j {
            edits.push(EditOperation::Replace {
                line: orig + 1,
                old_content: original[orig].as_ref().to_string(),
                content: edited[edit].as_ref().to_string(),
            });
            orig += 1;
            edit += 1;
        } else if orig < target_i {
            edits.push(EditOperation::Delete {
                line: orig + 1,
                content: original[orig].as_ref().to_string(),
            });
            orig += 1;
        } else {
            edits.push(EditOperation::Insert {
                line: orig + 1,
                content: edited[edit].as_ref().to_string(),
            });
            edit += 1;
        }
    }

    edits
}
