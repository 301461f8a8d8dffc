use chrono::Utc;

use crate::{
    db::Store,
    error::Error,
    model::{Rating, User},
    services::{aggregation::recompute_rating, invalid, load_work, lock_work},
};

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

/// Creates or replaces the actor's rating of a work and recomputes the work
/// aggregate in the same transaction. The work row is locked first so two
/// concurrent ratings of one work cannot both recompute from a stale set.
#[tracing::instrument(name = "rate work", skip(store, actor), fields(actor_id = actor.id))]
pub async fn rate_work(
    store: &dyn Store,
    actor: &User,
    work_id: i64,
    score: i16,
) -> Result<Rating, Error> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(invalid(
            "score",
            "score_range",
            "Rating must be between 1 and 5",
        ));
    }

    let mut tx = store.begin().await?;
    let work = lock_work(tx.as_mut(), work_id).await?;

    let rated_at = Utc::now();
    let rating = match tx.find_rating(actor.id, work.id).await? {
        Some(mut rating) => {
            rating.score = score;
            rating.rated_at = rated_at;
            tx.update_rating(&rating).await?;
            rating
        }
        None => {
            tx.insert_rating(Rating {
                id: 0,
                user_id: actor.id,
                work_id: work.id,
                score,
                rated_at,
            })
            .await?
        }
    };

    let summary = recompute_rating(tx.as_mut(), work.id).await?;
    tx.commit().await?;

    tracing::info!(
        average_rating = summary.average_rating,
        rating_count = summary.rating_count,
        "Work rated"
    );

    Ok(rating)
}

#[tracing::instrument(name = "delete rating", skip(store, actor), fields(actor_id = actor.id))]
pub async fn delete_rating(store: &dyn Store, actor: &User, work_id: i64) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    let work = lock_work(tx.as_mut(), work_id).await?;
    let rating = tx
        .find_rating(actor.id, work.id)
        .await?
        .ok_or(Error::NotFound("Rating"))?;

    tx.delete_rating(rating.id).await?;
    recompute_rating(tx.as_mut(), work.id).await?;
    tx.commit().await?;

    Ok(())
}

#[tracing::instrument(name = "get user rating", skip(store, actor), fields(actor_id = actor.id))]
pub async fn get_user_rating(
    store: &dyn Store,
    actor: &User,
    work_id: i64,
) -> Result<Option<Rating>, Error> {
    let mut tx = store.begin().await?;
    let work = load_work(tx.as_mut(), work_id).await?;
    let rating = tx.find_rating(actor.id, work.id).await?;
    tx.commit().await?;

    Ok(rating)
}
