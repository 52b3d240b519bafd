//! Replaying an edit script against its baseline.

use crate::script::EditOperation;
use thiserror::Error;

/// Why a script could not be replayed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("operation {index} targets line {line}, outside 1..={max}")]
    OutOfRange { index: usize, line: usize, max: usize },

    #[error("operation {index} at line {line} goes backwards (already past line {cursor})")]
    OutOfOrder { index: usize, line: usize, cursor: usize },

    #[error("line {line} no longer matches the baseline: expected {expected:?}, found {found:?}")]
    StaleBaseline {
        line: usize,
        expected: String,
        found: String,
    },
}

/// Apply `script` to `original` and return the resulting lines.
///
/// Operations address `original` by line number and are taken in order, so
/// `original` is never mutated. A delete or replace whose recorded old text
/// does not match `original` means the script was computed against a
/// different baseline and is rejected.
pub fn apply_edit_script<S: AsRef<str>>(
    original: &[S],
    script: &[EditOperation],
) -> Result<Vec<String>, ApplyError> {
    let mut out = Vec::with_capacity(original.len());
    // 0-indexed position of the next original line not yet emitted.
    let mut cursor = 0usize;

    for (index, op) in script.iter().enumerate() {
        let line = op.line();
        let max = match op {
            EditOperation::Insert { .. } => original.len() + 1,
            _ => original.len(),
        };
        if line == 0 || line > max {
            return Err(ApplyError::OutOfRange { index, line, max });
        }

        let target = line - 1;
        if target < cursor {
            return Err(ApplyError::OutOfOrder {
                index,
                line,
                cursor,
            });
        }

        out.extend(original[cursor..target].iter().map(|l| l.as_ref().to_string()));
        cursor = target;

        match op {
            EditOperation::Insert { content, .. } => out.push(content.clone()),
            EditOperation::Delete { content, .. } => {
                check_baseline(line, content, original[target].as_ref())?;
                cursor = target + 1;
            }
            EditOperation::Replace {
                old_content,
                content,
                ..
            } => {
                check_baseline(line, old_content, original[target].as_ref())?;
                out.push(content.clone());
                cursor = target + 1;
            }
        }
    }

    out.extend(original[cursor..].iter().map(|l| l.as_ref().to_string()));
    Ok(out)
}

fn check_baseline(line: usize, expected: &str, found: &str) -> Result<(), ApplyError> {
    if expected == found {
        Ok(())
    } else {
        Err(ApplyError::StaleBaseline {
            line,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
