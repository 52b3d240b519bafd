//! codesync-diff: line-level diffing for editor/web buffer synchronization.
//!
//! Three snapshots take part in every reconciliation: the shared baseline
//! (`original`), the issuer's edited buffer and the other side's live
//! buffer. The pipeline is
//!
//! 1. [`hash_line`] every line (FNV-1a),
//! 2. [`lcs`] over the baseline and edited line sequences,
//! 3. [`generate_edit_script`] from the alignment,
//! 4. [`detect_conflicts`] against the live buffer,
//! 5. optionally [`resolve_conflicts`] and [`apply_resolutions`].
//!
//! [`smart_diff`] runs steps 1 to 4 in one call, and [`apply_edit_script`]
//! replays a script on the receiving side.

pub mod apply;
pub mod conflict;
pub mod hash;
pub mod lcs;
pub mod script;
pub mod smart;

pub use apply::{apply_edit_script, ApplyError};
pub use conflict::{
    apply_resolutions, detect_conflicts, resolve_conflicts, Conflict, Resolution,
    ResolutionStrategy,
};
pub use hash::{content_hash, hash_line, hash_lines, HashedLine};
pub use lcs::{fits_table, lcs, LcsPair, MAX_DIFF_CELLS};
pub use script::{generate_edit_script, EditOperation};
pub use smart::{smart_diff, split_lines, EditStats, SmartDiff};
