//! Weighted track selection
//!
//! Pipeline for one invocation:
//! 1. List every playlist the principal owns (minus the ignore-set)
//! 2. Fetch every track of each playlist, one playlist at a time
//! 3. Aggregate occurrences per track id (frequency, latest `added_at`)
//! 4. Score each distinct track
//! 5. Draw `n` distinct tracks by temperature-weighted sampling
//! 6. Return one concrete occurrence per drawn track, in draw order
//!
//! All intermediate state is rebuilt per call; only the cache persists.

use crate::aggregate::Aggregation;
use crate::sampler::sample_ids;
use crate::scoring::Scorer;
use crate::source::{CachedSource, CollectionSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reshuffle_common::config::SamplerConfig;
use reshuffle_common::{IgnoreSet, Item, Result, TtlCache};
use std::collections::HashMap;
use tracing::{debug, info};

/// Aggregation and sampling engine over a [`CollectionSource`]
pub struct Selector<S> {
    source: CachedSource<S>,
}

impl<S: CollectionSource> Selector<S> {
    pub fn new(source: S, cache: TtlCache, config: SamplerConfig) -> Self {
        Self {
            source: CachedSource::new(source, cache, config),
        }
    }

    pub fn source(&self) -> &CachedSource<S> {
        &self.source
    }

    /// Draw `n` tracks using an entropy-seeded RNG
    pub async fn sample(
        &self,
        principal: &str,
        n: usize,
        temperature: f64,
        scorer: &dyn Scorer,
        ignore: &IgnoreSet,
    ) -> Result<Vec<Item>> {
        // ThreadRng is !Send, so seed a StdRng from OS entropy instead
        let mut rng = StdRng::from_entropy();
        self.sample_with_rng(principal, n, temperature, scorer, ignore, &mut rng)
            .await
    }

    /// Draw `n` tracks using the supplied RNG
    pub async fn sample_with_rng<R: Rng + Send>(
        &self,
        principal: &str,
        n: usize,
        temperature: f64,
        scorer: &dyn Scorer,
        ignore: &IgnoreSet,
        rng: &mut R,
    ) -> Result<Vec<Item>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let aggregation = self.aggregate(principal, ignore).await?;
        if aggregation.is_empty() {
            info!(principal, "No tracks found across owned playlists");
            return Ok(Vec::new());
        }

        let scores = score_all(&aggregation, scorer);
        let drawn = sample_ids(&scores, n, temperature, rng);
        let tracks = materialize(&aggregation, &drawn);

        info!(
            principal,
            requested = n,
            selected = tracks.len(),
            distinct = aggregation.len(),
            temperature,
            "Track selection complete"
        );
        Ok(tracks)
    }

    /// Fetch and aggregate every eligible occurrence
    pub async fn aggregate(&self, principal: &str, ignore: &IgnoreSet) -> Result<Aggregation> {
        let playlists = self.source.owned_collections(principal, ignore).await?;
        debug!(principal, playlists = playlists.len(), "Aggregating playlists");

        let mut aggregation = Aggregation::default();
        for playlist in &playlists {
            for item in self.source.items(playlist).await? {
                aggregation.push(item);
            }
        }

        info!(
            principal,
            playlists = playlists.len(),
            occurrences = aggregation.occurrences.len(),
            distinct = aggregation.len(),
            "Aggregation complete"
        );
        Ok(aggregation)
    }
}

/// Score every distinct identity
pub fn score_all(aggregation: &Aggregation, scorer: &dyn Scorer) -> HashMap<String, f64> {
    aggregation
        .records
        .iter()
        .map(|(id, record)| {
            (
                id.clone(),
                scorer.score(record.most_recent_added, record.frequency),
            )
        })
        .collect()
}

/// Resolve drawn identities to their representative occurrences, in order
pub fn materialize(aggregation: &Aggregation, drawn: &[String]) -> Vec<Item> {
    drawn
        .iter()
        .filter_map(|id| aggregation.representative(id).cloned())
        .collect()
}
