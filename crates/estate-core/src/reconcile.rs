//! # Entity Reconciler
//!
//! Merges an incoming record list into existing state.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────┬────────────────────┬─────────────────────────┐
//! │ id already in result?   │ skip_duplicates    │ action                  │
//! ├─────────────────────────┼────────────────────┼─────────────────────────┤
//! │ no                      │ any                │ append      imported+1  │
//! │ yes                     │ true               │ drop        skipped+1   │
//! │ yes                     │ false              │ replace in place        │
//! │                         │                    │             imported+1  │
//! └─────────────────────────┴────────────────────┴─────────────────────────┘
//! ```
//! `Merge` seeds the result with existing records, `Replace` starts empty.
//! Updates keep the original position; new records go at the end.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Identified;

/// How an import treats existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard existing records first.
    Replace,
    /// Keep existing records, update or append incoming ones.
    #[default]
    Merge,
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportMode::Replace => write!(f, "replace"),
            ImportMode::Merge => write!(f, "merge"),
        }
    }
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "merge" => Ok(ImportMode::Merge),
            other => Err(format!("Unknown import mode: {other}")),
        }
    }
}

/// Outcome of reconciling one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub result: Vec<T>,
    pub imported: usize,
    pub skipped: usize,
}

/// Reconciles `incoming` against `existing`.
///
/// Never fails. Records rejected upstream are not seen here; callers add
/// them to `skipped` themselves.
pub fn reconcile<T: Identified>(
    incoming: Vec<T>,
    existing: Vec<T>,
    mode: ImportMode,
    skip_duplicates: bool,
) -> Reconciled<T> {
    let mut result = match mode {
        ImportMode::Merge => existing,
        ImportMode::Replace => Vec::new(),
    };

    let mut positions: HashMap<String, usize> = HashMap::with_capacity(result.len() + incoming.len());
    for (idx, record) in result.iter().enumerate() {
        positions.entry(record.id().to_string()).or_insert(idx);
    }

    let mut imported = 0;
    let mut skipped = 0;

    for record in incoming {
        match positions.get(record.id()) {
            Some(_) if skip_duplicates => skipped += 1,
            Some(&idx) => {
                result[idx] = record;
                imported += 1;
            }
            None => {
                positions.insert(record.id().to_string(), result.len());
                result.push(record);
                imported += 1;
            }
        }
    }

    Reconciled {
        result,
        imported,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        id: String,
        value: u32,
    }

    impl Identified for Rec {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str, value: u32) -> Rec {
        Rec {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_merge_non_overlapping_appends() {
        let out = reconcile(vec![rec("b", 1)], vec![rec("a", 1)], ImportMode::Merge, false);
        assert_eq!(out.result, vec![rec("a", 1), rec("b", 1)]);
        assert_eq!((out.imported, out.skipped), (1, 0));
    }

    #[test]
    fn test_replace_discards_existing() {
        let out = reconcile(vec![rec("b", 1)], vec![rec("a", 1)], ImportMode::Replace, false);
        assert_eq!(out.result, vec![rec("b", 1)]);
    }

    #[test]
    fn test_update_in_place_preserves_position() {
        let out = reconcile(
            vec![rec("b", 2)],
            vec![rec("a", 1), rec("b", 1), rec("c", 1)],
            ImportMode::Merge,
            false,
        );
        assert_eq!(out.result, vec![rec("a", 1), rec("b", 2), rec("c", 1)]);
        assert_eq!(out.imported, 1);
    }

    #[test]
    fn test_skip_duplicates() {
        let out = reconcile(
            vec![rec("a", 9), rec("z", 1)],
            vec![rec("a", 1)],
            ImportMode::Merge,
            true,
        );
        assert_eq!(out.result, vec![rec("a", 1), rec("z", 1)]);
        assert_eq!((out.imported, out.skipped), (1, 1));
    }

    #[test]
    fn test_duplicate_ids_within_incoming() {
        let out = reconcile(vec![rec("a", 1), rec("a", 2)], vec![], ImportMode::Merge, false);
        assert_eq!(out.result, vec![rec("a", 2)]);
        assert_eq!(out.imported, 2);

        let out = reconcile(vec![rec("a", 1), rec("a", 2)], vec![], ImportMode::Merge, true);
        assert_eq!(out.result, vec![rec("a", 1)]);
        assert_eq!((out.imported, out.skipped), (1, 1));
    }

    #[test]
    fn test_empty_incoming_merge_is_noop() {
        let existing = vec![rec("a", 1), rec("b", 1)];
        let out = reconcile(Vec::new(), existing.clone(), ImportMode::Merge, false);
        assert_eq!(out.result, existing);
        assert_eq!((out.imported, out.skipped), (0, 0));
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!("Replace".parse::<ImportMode>(), Ok(ImportMode::Replace));
        assert_eq!("merge".parse::<ImportMode>(), Ok(ImportMode::Merge));
        assert!("append".parse::<ImportMode>().is_err());
    }
}
