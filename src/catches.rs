use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use crate::{
    leaderboard::compute_leaderboard,
    models::{blob_ref, CatchRecord, Division, LeaderboardEntry, NewCatch},
    store::CatchStore,
    Error,
};

/// Append-only log of submitted catches.
pub struct CatchLog {
    store: Arc<dyn CatchStore>,
}

impl CatchLog {
    pub fn new(store: Arc<dyn CatchStore>) -> Self {
        Self { store }
    }

    /// Validates and records a catch, stamped with the current time.
    ///
    /// Nothing is written when validation fails.
    pub async fn submit(
        &self,
        username: &str,
        division: &str,
        species: &str,
        weight: f64,
        evidence_ref: Option<String>,
    ) -> Result<CatchRecord, Error> {
        let division: Division = division.parse()?;

        if !weight.is_finite() {
            return Err(Error::validation("Weight must be a number"));
        }
        if weight < 0.0 {
            return Err(Error::validation("Weight cannot be negative"));
        }
        // turns -0.0 into 0.0
        let weight = weight + 0.0;

        let record = self
            .store
            .append_catch(NewCatch {
                username: username.to_string(),
                division,
                species: species.trim().to_string(),
                weight,
                evidence_ref: blob_ref(evidence_ref),
                submitted_at: Utc::now(),
            })
            .await?;

        info!(
            "{} logged a {:.2} lbs {} in {}",
            record.username, record.weight, record.species, record.division
        );
        Ok(record)
    }

    pub async fn all_for_division(&self, division: Division) -> Result<Vec<CatchRecord>, Error> {
        self.store.catches_in_division(division).await
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.store.count_catches().await
    }

    /// Standings of the named division; unknown names give an empty board.
    pub async fn leaderboard(
        &self,
        division: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, Error> {
        let Ok(parsed) = division.parse::<Division>() else {
            debug!("Leaderboard requested for unknown division {division:?}");
            return Ok(Vec::new());
        };

        let records = self.all_for_division(parsed).await?;
        Ok(compute_leaderboard(division, &records, limit))
    }
}
