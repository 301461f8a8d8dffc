use chrono::Utc;

use crate::{
    db::{Store, Transaction},
    error::Error,
    model::{Favorite, User},
    services::{load_work, lock_work},
};

async fn insert_favorite(
    tx: &mut dyn Transaction,
    user_id: i64,
    work_id: i64,
    last_read_chapter: i32,
) -> Result<Favorite, Error> {
    tx.insert_favorite(Favorite {
        id: 0,
        user_id,
        work_id,
        added_at: Utc::now(),
        last_read_chapter,
    })
    .await
}

/// Adding a work that is already a favorite returns the existing entry. The
/// work row is locked first so two concurrent adds cannot both insert.
#[tracing::instrument(name = "add favorite", skip(store, actor), fields(actor_id = actor.id))]
pub async fn add_favorite(store: &dyn Store, actor: &User, work_id: i64) -> Result<Favorite, Error> {
    let mut tx = store.begin().await?;
    let work = lock_work(tx.as_mut(), work_id).await?;

    let favorite = match tx.find_favorite(actor.id, work.id).await? {
        Some(favorite) => favorite,
        None => insert_favorite(tx.as_mut(), actor.id, work.id, 0).await?,
    };
    tx.commit().await?;

    Ok(favorite)
}

#[tracing::instrument(name = "remove favorite", skip(store, actor), fields(actor_id = actor.id))]
pub async fn remove_favorite(store: &dyn Store, actor: &User, work_id: i64) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    let favorite = tx
        .find_favorite(actor.id, work_id)
        .await?
        .ok_or(Error::NotFound("Favorite"))?;

    tx.delete_favorite(favorite.id).await?;
    tx.commit().await?;

    Ok(())
}

/// Records the chapter the actor last read, favoriting the work on the way if
/// needed. The value is overwritten, so reading an earlier chapter moves the
/// marker back.
#[tracing::instrument(name = "update read progress", skip(store, actor), fields(actor_id = actor.id))]
pub async fn update_read_progress(
    store: &dyn Store,
    actor: &User,
    work_id: i64,
    chapter_number: i32,
) -> Result<Favorite, Error> {
    let mut tx = store.begin().await?;
    let work = lock_work(tx.as_mut(), work_id).await?;
    tx.find_unit_by_number(work.id, chapter_number)
        .await?
        .ok_or(Error::NotFound("Chapter"))?;

    let favorite = match tx.find_favorite(actor.id, work.id).await? {
        Some(mut favorite) => {
            favorite.last_read_chapter = chapter_number;
            tx.update_favorite(&favorite).await?;
            favorite
        }
        None => insert_favorite(tx.as_mut(), actor.id, work.id, chapter_number).await?,
    };
    tx.commit().await?;

    Ok(favorite)
}

#[tracing::instrument(name = "list favorites", skip(store, actor), fields(actor_id = actor.id))]
pub async fn list_favorites(store: &dyn Store, actor: &User) -> Result<Vec<Favorite>, Error> {
    let mut tx = store.begin().await?;
    let favorites = tx.list_favorites_by_user(actor.id).await?;
    tx.commit().await?;

    Ok(favorites)
}

#[tracing::instrument(name = "favorite status", skip(store, actor), fields(actor_id = actor.id))]
pub async fn favorite_status(
    store: &dyn Store,
    actor: &User,
    work_id: i64,
) -> Result<Option<Favorite>, Error> {
    let mut tx = store.begin().await?;
    let favorite = tx.find_favorite(actor.id, work_id).await?;
    tx.commit().await?;

    Ok(favorite)
}

#[tracing::instrument(name = "favorite count", skip(store))]
pub async fn favorite_count(store: &dyn Store, work_id: i64) -> Result<i64, Error> {
    let mut tx = store.begin().await?;
    let work = load_work(tx.as_mut(), work_id).await?;
    let count = tx.count_favorites(work.id).await?;
    tx.commit().await?;

    Ok(count)
}
