//! Derived fields of works and units.
//!
//! `average_rating` and `rating_count` are always a full recompute from the
//! live rating rows of a work, run inside the transaction of the rating write
//! that triggered it. View counters are plain increments outside of any
//! command transaction.

use crate::{
    db::{Store, Transaction},
    error::Error,
    model::Rating,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub rating_count: i64,
}

pub fn summarize(ratings: &[Rating]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average_rating: 0.0,
            rating_count: 0,
        };
    }

    let sum: f64 = ratings.iter().map(|r| f64::from(r.score)).sum();
    let count = ratings.len();

    RatingSummary {
        average_rating: sum / count as f64,
        rating_count: count as i64,
    }
}

#[tracing::instrument(name = "recompute rating", skip(tx))]
pub async fn recompute_rating(
    tx: &mut dyn Transaction,
    work_id: i64,
) -> Result<RatingSummary, Error> {
    let ratings = tx.list_ratings_by_work(work_id).await?;
    let summary = summarize(&ratings);

    tx.update_work_rating(work_id, summary.average_rating, summary.rating_count)
        .await?;

    Ok(summary)
}

/// Adds one view to a work. Failures are logged and dropped so they never
/// fail the read that triggered them.
#[tracing::instrument(name = "record work view", skip(store))]
pub async fn record_work_view(store: &dyn Store, work_id: i64) {
    let result = async {
        let mut tx = store.begin().await?;
        tx.increment_work_views(work_id).await?;
        tx.commit().await
    }
    .await;

    if let Err(error) = result {
        tracing::warn!(err.msg = %error, err.details = ?error, "Failed to record work view");
    }
}

/// Adds one view to a unit, with the same failure policy as
/// [`record_work_view`].
#[tracing::instrument(name = "record unit view", skip(store))]
pub async fn record_unit_view(store: &dyn Store, unit_id: i64) {
    let result = async {
        let mut tx = store.begin().await?;
        tx.increment_unit_views(unit_id).await?;
        tx.commit().await
    }
    .await;

    if let Err(error) = result {
        tracing::warn!(err.msg = %error, err.details = ?error, "Failed to record unit view");
    }
}
