//! Temperature-weighted sampling without replacement
//!
//! # Modes
//! - `temperature <= 0`: deterministic top-K by score.
//! - `temperature > 0`: softmax over `score / temperature`, then repeated
//!   single draws. Each drawn identity leaves the pool and the remaining
//!   probabilities are renormalized before the next draw.
//!
//! # Ordering
//! Candidates are laid out in ascending identity order (byte-wise). This order
//! breaks score ties in deterministic mode and fixes the cumulative-sum order
//! in probabilistic mode, so neither depends on hash map iteration.
//!
//! # Non-finite scores
//! NaN ranks below every real score and receives no probability mass.
//! `+inf` entries (after temperature scaling) share all of the mass.

use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Draw up to `n` distinct identities from `scores`
///
/// Returns exactly `min(n, scores.len())` identities in draw order (or rank
/// order when deterministic).
pub fn sample_ids<R>(
    scores: &HashMap<String, f64>,
    n: usize,
    temperature: f64,
    rng: &mut R,
) -> Vec<String>
where
    R: Rng,
{
    if n == 0 || scores.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<(&str, f64)> = scores
        .iter()
        .map(|(id, score)| (id.as_str(), *score))
        .collect();
    candidates.sort_unstable_by(|a, b| a.0.cmp(b.0));

    if is_deterministic(temperature) {
        return top_k(candidates, n);
    }

    let count = n.min(candidates.len());
    let mut ids: Vec<&str> = candidates.iter().map(|(id, _)| *id).collect();
    let mut adjusted: Vec<f64> = candidates
        .iter()
        .map(|(_, score)| score / temperature)
        .collect();
    let mut probabilities = softmax(&adjusted);

    let mut drawn = Vec::with_capacity(count);
    for _ in 0..count {
        let r: f64 = rng.gen();
        let idx = pick_index(&probabilities, r);

        drawn.push(ids.remove(idx).to_string());
        adjusted.remove(idx);
        probabilities.remove(idx);
        renormalize(&mut probabilities, &adjusted);
    }

    debug!(
        requested = n,
        drawn = drawn.len(),
        pool = scores.len(),
        temperature,
        "Probabilistic draw complete"
    );
    drawn
}

/// `temperature <= 0` (or NaN) means no randomness
pub fn is_deterministic(temperature: f64) -> bool {
    temperature.is_nan() || temperature <= 0.0
}

/// Deterministic selection: highest score first, ties by ascending identity
fn top_k(mut candidates: Vec<(&str, f64)>, n: usize) -> Vec<String> {
    // Stable sort over identity-ordered input keeps the tie-break
    candidates.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));

    candidates
        .into_iter()
        .take(n)
        .map(|(id, _)| id.to_string())
        .collect()
}

fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Numerically stable softmax
///
/// The maximum is subtracted before exponentiating, so large inputs do not
/// overflow. The result always sums to 1 for a non-empty input.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let max = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    let weights: Vec<f64> = if max == f64::INFINITY {
        values
            .iter()
            .map(|v| if *v == f64::INFINITY { 1.0 } else { 0.0 })
            .collect()
    } else if max == f64::NEG_INFINITY {
        // Nothing to rank by: uniform
        vec![1.0; values.len()]
    } else {
        values
            .iter()
            .map(|v| if v.is_nan() { 0.0 } else { (v - max).exp() })
            .collect()
    };

    // The max element contributes exp(0) = 1, so total >= 1
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Probabilities the first draw would use for `scores` at `temperature`
///
/// Keyed by identity. Empty for `temperature <= 0`, where nothing is random.
pub fn draw_probabilities(scores: &HashMap<String, f64>, temperature: f64) -> HashMap<String, f64> {
    if is_deterministic(temperature) || scores.is_empty() {
        return HashMap::new();
    }

    let mut candidates: Vec<(&String, f64)> = scores.iter().map(|(id, s)| (id, *s)).collect();
    candidates.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let adjusted: Vec<f64> = candidates.iter().map(|(_, s)| s / temperature).collect();
    candidates
        .into_iter()
        .zip(softmax(&adjusted))
        .map(|((id, _), p)| (id.clone(), p))
        .collect()
}

/// Inverse-CDF selection over `probabilities` for a uniform draw `r` in [0, 1)
///
/// Picks the first candidate with non-zero probability whose running
/// cumulative sum is `>= r`. If rounding leaves the total just short of `r`,
/// the last candidate with non-zero probability is chosen.
fn pick_index(probabilities: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = None;

    for (idx, p) in probabilities.iter().enumerate() {
        if *p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = Some(idx);
        if cumulative >= r {
            return idx;
        }
    }

    last_positive.unwrap_or(probabilities.len().saturating_sub(1))
}

/// Rescale the remaining pool to sum to 1
///
/// If the remaining mass underflowed to zero, the softmax is recomputed over
/// the remaining adjusted scores, which is the same distribution evaluated
/// with a fresh maximum.
fn renormalize(probabilities: &mut Vec<f64>, adjusted: &[f64]) {
    if probabilities.is_empty() {
        return;
    }

    let total: f64 = probabilities.iter().sum();
    if total > 0.0 && total.is_finite() {
        for p in probabilities.iter_mut() {
            *p /= total;
        }
    } else {
        *probabilities = softmax(adjusted);
    }
}
