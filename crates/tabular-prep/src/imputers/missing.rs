//! Missing-value detection.

use crate::types::Cell;
use crate::utils::{MISSING_TOKENS, is_missing_token};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Decides which cells of a column count as missing.
///
/// Absent cells ([`Cell::Missing`] and NaN numbers) are always missing; the
/// non-default markers add further cells on top of that.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMarker {
    /// Only absent cells are missing.
    #[default]
    Absent,
    /// Cells equal to this value are missing (e.g. `-999` or `"?"`).
    Sentinel(Cell),
    /// Text cells matching one of these tokens (trimmed, ASCII
    /// case-insensitive) are missing.
    Tokens(Vec<String>),
    /// Caller-supplied predicate. Cannot be serialized.
    #[serde(skip)]
    Predicate(MissingPredicate),
}

impl MissingMarker {
    /// Marker built from a caller-supplied predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Cell) -> bool + Send + Sync + 'static,
    {
        MissingMarker::Predicate(MissingPredicate(Arc::new(f)))
    }

    /// Marker matching the usual textual placeholders (`NA`, `null`, `?`, ...).
    pub fn common_tokens() -> Self {
        MissingMarker::Tokens(MISSING_TOKENS.iter().map(|t| t.to_string()).collect())
    }

    /// Whether `cell` is missing under this marker.
    pub fn is_missing(&self, cell: &Cell) -> bool {
        if cell.is_absent() {
            return true;
        }

        match self {
            MissingMarker::Absent => false,
            MissingMarker::Sentinel(sentinel) => cell == sentinel,
            MissingMarker::Tokens(tokens) => cell
                .as_text()
                .is_some_and(|text| is_missing_token(text, tokens.as_slice())),
            MissingMarker::Predicate(p) => (p.0)(cell),
        }
    }
}

/// Shared, thread-safe "is missing" predicate.
#[derive(Clone)]
pub struct MissingPredicate(Arc<dyn Fn(&Cell) -> bool + Send + Sync>);

impl fmt::Debug for MissingPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MissingPredicate(..)")
    }
}

impl PartialEq for MissingPredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
