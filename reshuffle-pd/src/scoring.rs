//! Track scoring policies
//!
//! A scorer maps `(most_recent_added, frequency)` to a real number. Higher
//! means more likely to be drawn. Scores may be negative; the sampler makes no
//! assumption about their range.

use chrono::{DateTime, Utc};
use reshuffle_common::time::days_between;
use reshuffle_common::{Error, Result};
use std::f64::consts::PI;
use std::str::FromStr;

/// Pure scoring function over an aggregate record
pub trait Scorer: Send + Sync {
    fn score(&self, most_recent_added: Option<DateTime<Utc>>, frequency: u32) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(Option<DateTime<Utc>>, u32) -> f64 + Send + Sync,
{
    fn score(&self, most_recent_added: Option<DateTime<Utc>>, frequency: u32) -> f64 {
        self(most_recent_added, frequency)
    }
}

/// Default policy: mean of a frequency term and a linear recency term
///
/// `frequency_term = min(frequency / 10, 1)`,
/// `recency_term = max(0, 1 - days_since_added / 365)` (0 without a timestamp).
#[derive(Debug, Clone, Copy)]
pub struct FrequencyRecencyScorer {
    now: DateTime<Utc>,
}

impl FrequencyRecencyScorer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Scorer for FrequencyRecencyScorer {
    fn score(&self, most_recent_added: Option<DateTime<Utc>>, frequency: u32) -> f64 {
        let frequency_term = (f64::from(frequency) / 10.0).min(1.0);

        let recency_term = match most_recent_added {
            Some(added) => {
                let days = days_between(added, self.now) as f64;
                (1.0 - days / 365.0).max(0.0)
            }
            None => 0.0,
        };

        (frequency_term + recency_term) / 2.0
    }
}

/// Seasonal policy: favors tracks added around the same time of year
///
/// A yearly cosine bump minus a slow linear decay. Tracks older than two
/// years score a flat -4 and undated tracks a flat 0.1. Frequency is ignored.
#[derive(Debug, Clone, Copy)]
pub struct SeasonalScorer {
    now: DateTime<Utc>,
}

impl SeasonalScorer {
    const MAX_AGE_DAYS: i64 = 730;
    const EXPIRED_SCORE: f64 = -4.0;
    const UNDATED_SCORE: f64 = 0.1;

    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Scorer for SeasonalScorer {
    fn score(&self, most_recent_added: Option<DateTime<Utc>>, _frequency: u32) -> f64 {
        let Some(added) = most_recent_added else {
            return Self::UNDATED_SCORE;
        };

        let days = days_between(added, self.now);
        if days > Self::MAX_AGE_DAYS {
            return Self::EXPIRED_SCORE;
        }

        let days = days as f64;
        (2.0 * PI * days / 365.0).cos() - days / 750.0
    }
}

/// Scoring policy selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    #[default]
    FrequencyRecency,
    Seasonal,
}

impl ScorerKind {
    /// Instantiate the policy with a fixed reference time
    pub fn build(self, now: DateTime<Utc>) -> Box<dyn Scorer> {
        match self {
            ScorerKind::FrequencyRecency => Box::new(FrequencyRecencyScorer::new(now)),
            ScorerKind::Seasonal => Box::new(SeasonalScorer::new(now)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScorerKind::FrequencyRecency => "frequency-recency",
            ScorerKind::Seasonal => "seasonal",
        }
    }
}

impl FromStr for ScorerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency-recency" | "default" => Ok(ScorerKind::FrequencyRecency),
            "seasonal" => Ok(ScorerKind::Seasonal),
            other => Err(Error::InvalidInput(format!(
                "Unknown scorer '{}' (expected 'frequency-recency' or 'seasonal')",
                other
            ))),
        }
    }
}
