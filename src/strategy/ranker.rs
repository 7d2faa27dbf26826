//! Orders fitted candidates by mean-reversion speed.

use serde::Serialize;
use tracing::debug;

use crate::domain::PairCandidate;

/// Ranking output: valid pairs fastest-first, invalid ones set aside
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedPairs {
    pub ranked: Vec<PairCandidate>,
    /// Candidates with theta <= 0, in input order
    pub excluded: Vec<PairCandidate>,
    /// Valid candidates ranked beyond `max_pairs`, in rank order
    pub truncated: Vec<PairCandidate>,
}

#[derive(Debug, Clone, Default)]
pub struct PairRanker {
    max_pairs: Option<usize>,
}

impl PairRanker {
    pub fn new(max_pairs: Option<usize>) -> Self {
        Self { max_pairs }
    }

    /// Drop invalid candidates, sort ascending by half-life.
    ///
    /// The sort is stable, so equal half-lives keep their input order.
    /// Candidates beyond `max_pairs` move from `ranked` to `truncated`.
    pub fn rank(&self, candidates: Vec<PairCandidate>) -> RankedPairs {
        let (mut ranked, excluded): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(PairCandidate::is_valid);

        ranked.sort_by(|a, b| {
            let ha = a.half_life.unwrap_or(f64::INFINITY);
            let hb = b.half_life.unwrap_or(f64::INFINITY);
            ha.total_cmp(&hb)
        });

        let truncated = match self.max_pairs {
            Some(limit) if ranked.len() > limit => ranked.split_off(limit),
            _ => Vec::new(),
        };

        debug!(
            "Ranked {} pairs, excluded {}, cut {} past max_pairs",
            ranked.len(),
            excluded.len(),
            truncated.len()
        );
        RankedPairs {
            ranked,
            excluded,
            truncated,
        }
    }
}
