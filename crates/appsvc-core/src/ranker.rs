//! Data center preference ranking
//!
//! Orders data centers for a user by observed round-trip time, falling back
//! to the West-to-East topology order where nothing has been measured.

use crate::models::UserDcHistory;
use std::cmp::Ordering;

/// Largest RTT (seconds) still considered good; baseline score for unmeasured DCs
pub const MAX_GOOD_RTT: f64 = 0.05;

/// Score increment per topology position so unmeasured DCs keep their order
const TOPOLOGY_STEP: f64 = 0.001;

/// Median of a sample set, `None` when empty
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Score every data center: topology defaults overridden by measured medians.
///
/// Topology DCs come first in topology order, followed by DCs only known
/// from history.
pub fn score_dcs(history: &UserDcHistory, known_dcs: &[String]) -> Vec<(String, f64)> {
    let mut scores: Vec<(String, f64)> = known_dcs
        .iter()
        .enumerate()
        .map(|(ix, dc)| (dc.clone(), MAX_GOOD_RTT + ix as f64 * TOPOLOGY_STEP))
        .collect();

    for (dc, samples) in history {
        // an empty sample list carries no information, keep the default
        let Some(score) = median(samples) else {
            continue;
        };
        match scores.iter_mut().find(|(known, _)| known == dc) {
            Some(entry) => entry.1 = score,
            None => scores.push((dc.clone(), score)),
        }
    }

    scores
}

/// Return data centers sorted in preferred order (fastest first).
///
/// `known_dcs` is the West-to-East topology. Users without any recorded
/// history get the topology unchanged.
pub fn rank_dcs(history: Option<&UserDcHistory>, known_dcs: &[String]) -> Vec<String> {
    let Some(history) = history else {
        return known_dcs.to_vec();
    };

    let mut scores = score_dcs(history, known_dcs);
    // stable: equal scores keep topology order
    scores.sort_by(|a, b| a.1.total_cmp(&b.1));
    scores.into_iter().map(|(dc, _)| dc).collect()
}
