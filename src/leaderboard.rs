//! Division standings.
//!
//! Ranking is a pure function over a snapshot of catch records, so it can be
//! called from any number of requests at once without touching the stores.

use std::cmp::Ordering;

use crate::models::{CatchRecord, Division, LeaderboardEntry};

/// Handicap added to any catch whose species mentions sailfish.
pub const SAILFISH_BONUS: f64 = 10.0;

/// Weight a catch is ranked by.
pub fn adjusted_weight(species: &str, weight: f64) -> f64 {
    if species.to_lowercase().contains("sailfish") {
        weight + SAILFISH_BONUS
    } else {
        weight
    }
}

/// Ranks the catches of the named division.
///
/// Division names are matched like [`Division::from_str`]; an unknown name
/// ranks nothing and yields an empty board.
///
/// [`Division::from_str`]: std::str::FromStr::from_str
pub fn compute_leaderboard(
    division: &str,
    records: &[CatchRecord],
    limit: Option<usize>,
) -> Vec<LeaderboardEntry> {
    match division.parse() {
        Ok(division) => rank(division, records, limit),
        Err(_) => Vec::new(),
    }
}

/// Ranks the catches of `division` by adjusted weight, heaviest first.
///
/// Equal weights keep submission order (lower id first).
pub fn rank(
    division: Division,
    records: &[CatchRecord],
    limit: Option<usize>,
) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<_> = records
        .iter()
        .filter(|record| record.division == division)
        .map(|record| (adjusted_weight(&record.species, record.weight), record))
        .collect();

    scored.sort_by(|(a_weight, a), (b_weight, b)| match b_weight.total_cmp(a_weight) {
        Ordering::Equal => a.id.cmp(&b.id),
        ordering => ordering,
    });

    scored
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(position, (display_weight, record))| LeaderboardEntry {
            rank: position + 1,
            user: record.username.clone(),
            species: record.species.clone(),
            display_weight,
            date: record.submitted_at.date_naive(),
        })
        .collect()
}
