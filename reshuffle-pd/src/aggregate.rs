//! Frequency and recency aggregation
//!
//! Collapses raw track occurrences from every eligible playlist into one
//! record per identity: how many times it occurs and the latest parseable
//! "added" timestamp among those occurrences.

use chrono::{DateTime, Utc};
use reshuffle_common::Item;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-identity summary, rebuilt on every run
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    /// Number of raw occurrences
    pub frequency: u32,
    /// Latest parseable `added_at` across occurrences
    pub most_recent_added: Option<DateTime<Utc>>,
    /// Index into [`Aggregation::occurrences`] of the first occurrence
    pub first_seen: usize,
    /// Index of the occurrence holding `most_recent_added`
    latest_seen: Option<usize>,
}

/// Aggregated view over all fetched occurrences
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Keyed by identity. Iteration order carries no meaning.
    pub records: HashMap<String, AggregateRecord>,
    /// Raw occurrences that had a usable identity, in fetch order
    pub occurrences: Vec<Item>,
}

impl Aggregation {
    /// Aggregate `items`, discarding those without a usable identity
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let mut aggregation = Self::default();
        for item in items {
            aggregation.push(item);
        }
        aggregation
    }

    /// Fold one raw occurrence in
    pub fn push(&mut self, item: Item) {
        let Some(identity) = item.identity().map(str::to_owned) else {
            debug!("Skipping track without usable id");
            return;
        };

        let added = item.added_instant();
        if added.is_none() {
            if let Some(raw) = item.added_at.as_deref() {
                warn!(id = %identity, added_at = raw, "Unparseable added_at, ignoring for recency");
            }
        }

        let index = self.occurrences.len();
        self.occurrences.push(item);

        let record = self
            .records
            .entry(identity)
            .or_insert_with(|| AggregateRecord {
                frequency: 0,
                most_recent_added: None,
                first_seen: index,
                latest_seen: None,
            });

        record.frequency += 1;
        if let Some(added) = added {
            // Strictly later wins; on equal timestamps the earlier occurrence stays
            if record.most_recent_added.map_or(true, |prev| added > prev) {
                record.most_recent_added = Some(added);
                record.latest_seen = Some(index);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct identities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Representative occurrence for `identity`
    ///
    /// The occurrence with the latest parseable timestamp, or the first
    /// occurrence when none had one.
    pub fn representative(&self, identity: &str) -> Option<&Item> {
        let record = self.records.get(identity)?;
        let index = record.latest_seen.unwrap_or(record.first_seen);
        self.occurrences.get(index)
    }
}
