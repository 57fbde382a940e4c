//! Duplicate suppression inside a single batch.
//!
//! Keys are a fast non-cryptographic hash of a row's field values, so two
//! different rows may collide and one of them be dropped; that trade is
//! accepted. Duplicates that straddle two batches are never detected: each
//! batch is squashed on its own.

use std::hash::Hasher;

use rustc_hash::{FxHashSet, FxHasher};

use crate::config::SquashPolicy;
use crate::import::reader::Row;

/// Rows that survived squashing, and how many were dropped.
#[derive(Debug, Default)]
pub struct Squashed {
    pub rows: Vec<Row>,
    pub dropped: usize,
}

/// Hash of a row's field values, concatenated in order.
pub fn duplicate_key(fields: &[String]) -> u64 {
    let mut hasher = FxHasher::default();
    for field in fields {
        hasher.write(field.as_bytes());
    }
    hasher.finish()
}

/// Apply `policy` to one batch, keeping first occurrences in input order.
pub fn squash(rows: Vec<Row>, policy: SquashPolicy) -> Squashed {
    if !policy.is_active() {
        return Squashed { rows, dropped: 0 };
    }

    let total = rows.len();
    let mut seen = FxHashSet::default();
    let mut previous: Option<u64> = None;

    let kept: Vec<Row> = rows
        .into_iter()
        .filter(|row| {
            let key = duplicate_key(&row.fields);

            if policy.all_per_batch && !seen.insert(key) {
                return false;
            }
            if policy.consecutive && previous == Some(key) {
                return false;
            }

            previous = Some(key);
            true
        })
        .collect();

    Squashed {
        dropped: total - kept.len(),
        rows: kept,
    }
}
