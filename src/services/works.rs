use chrono::Utc;
use validator::Validate;

use crate::{
    db::{Store, Transaction},
    error::Error,
    model::{NewWork, Page, User, Work, WorkPatch, WorkQuery, WorkView},
    policy::{can_mutate_content, can_publish, ensure},
    services::{aggregation::record_work_view, load_work},
};

async fn view_of(
    tx: &mut dyn Transaction,
    work: Work,
    viewer: Option<&User>,
) -> Result<WorkView, Error> {
    let chapter_count = tx.count_units(work.id).await?;
    let in_user_favorites = match viewer {
        Some(viewer) => tx.find_favorite(viewer.id, work.id).await?.is_some(),
        None => false,
    };

    Ok(WorkView {
        work,
        chapter_count,
        in_user_favorites,
    })
}

#[tracing::instrument(name = "create work", skip_all, fields(actor_id = actor.id))]
pub async fn create_work(store: &dyn Store, actor: &User, input: NewWork) -> Result<Work, Error> {
    input.validate().map_err(Error::Validation)?;
    ensure(can_publish(actor), "publish works")?;

    let now = Utc::now();
    let mut tx = store.begin().await?;
    let work = tx
        .insert_work(Work {
            id: 0,
            title: input.title,
            description: input.description,
            cover_image_url: input.cover_image_url,
            creator_id: actor.id,
            genres: input.genres,
            view_count: 0,
            average_rating: 0.0,
            rating_count: 0,
            completed: false,
            created_at: now,
            updated_at: now,
        })
        .await?;
    tx.commit().await?;

    tracing::info!(work_id = work.id, "Work created");

    Ok(work)
}

/// Applies `patch` to the content fields of a work. Counters and the rating
/// aggregate are never touched here.
#[tracing::instrument(name = "update work", skip_all, fields(actor_id = actor.id, work_id = work_id))]
pub async fn update_work(
    store: &dyn Store,
    actor: &User,
    work_id: i64,
    patch: WorkPatch,
) -> Result<Work, Error> {
    patch.validate().map_err(Error::Validation)?;

    let mut tx = store.begin().await?;
    let mut work = load_work(tx.as_mut(), work_id).await?;
    ensure(can_mutate_content(actor, work.creator_id), "update this work")?;

    patch.apply(&mut work);
    work.updated_at = Utc::now();
    tx.update_work(&work).await?;
    tx.commit().await?;

    Ok(work)
}

#[tracing::instrument(name = "delete work", skip_all, fields(actor_id = actor.id, work_id = work_id))]
pub async fn delete_work(store: &dyn Store, actor: &User, work_id: i64) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    let work = load_work(tx.as_mut(), work_id).await?;
    ensure(can_mutate_content(actor, work.creator_id), "delete this work")?;

    tx.delete_work(work.id).await?;
    tx.commit().await?;

    tracing::info!("Work deleted");

    Ok(())
}

/// Reads one work and counts the view. The returned snapshot is the one read
/// before the view was recorded.
#[tracing::instrument(name = "get work", skip(store, viewer))]
pub async fn get_work(
    store: &dyn Store,
    work_id: i64,
    viewer: Option<&User>,
) -> Result<WorkView, Error> {
    let view = {
        let mut tx = store.begin().await?;
        let work = load_work(tx.as_mut(), work_id).await?;
        let view = view_of(tx.as_mut(), work, viewer).await?;
        tx.commit().await?;
        view
    };

    record_work_view(store, work_id).await;

    Ok(view)
}

#[tracing::instrument(name = "list works", skip(store, viewer))]
pub async fn list_works(
    store: &dyn Store,
    query: &WorkQuery,
    page: Page,
    viewer: Option<&User>,
) -> Result<Vec<WorkView>, Error> {
    let mut tx = store.begin().await?;
    let works = tx.list_works(query, page).await?;

    let mut views = Vec::with_capacity(works.len());
    for work in works {
        views.push(view_of(tx.as_mut(), work, viewer).await?);
    }
    tx.commit().await?;

    Ok(views)
}
