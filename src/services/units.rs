use chrono::Utc;
use validator::Validate;

use crate::{
    db::Store,
    error::Error,
    model::{NewUnit, Unit, UnitPatch, UnitSummary, User},
    policy::{can_mutate_content, can_publish, ensure},
    services::{aggregation::record_unit_view, load_unit, load_work},
};

pub const DEFAULT_RECENT_LIMIT: i64 = 20;
pub const MAX_RECENT_LIMIT: i64 = 100;

/// Publishes a unit under a work owned by the actor. Chapter numbers are
/// unique within a work.
#[tracing::instrument(
    name = "create chapter",
    skip_all,
    fields(actor_id = actor.id, work_id = input.work_id, chapter_number = input.chapter_number)
)]
pub async fn create_unit(store: &dyn Store, actor: &User, input: NewUnit) -> Result<Unit, Error> {
    input.validate().map_err(Error::Validation)?;

    let mut tx = store.begin().await?;
    let work = load_work(tx.as_mut(), input.work_id).await?;
    ensure(
        can_publish(actor) && can_mutate_content(actor, work.creator_id),
        "add chapters to this work",
    )?;

    if tx
        .find_unit_by_number(work.id, input.chapter_number)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(format!(
            "chapter {} already exists for this work",
            input.chapter_number
        )));
    }

    let now = Utc::now();
    let unit = tx
        .insert_unit(Unit {
            id: 0,
            work_id: work.id,
            title: input.title,
            chapter_number: input.chapter_number,
            description: input.description,
            publish_date: now,
            pages: input.pages,
            view_count: 0,
            draft: input.draft.unwrap_or(false),
        })
        .await?;
    tx.touch_work(work.id, now).await?;
    tx.commit().await?;

    tracing::info!(unit_id = unit.id, "Chapter created");

    Ok(unit)
}

/// Ownership is checked against the parent work.
#[tracing::instrument(name = "update chapter", skip_all, fields(actor_id = actor.id, unit_id = unit_id))]
pub async fn update_unit(
    store: &dyn Store,
    actor: &User,
    unit_id: i64,
    patch: UnitPatch,
) -> Result<Unit, Error> {
    patch.validate().map_err(Error::Validation)?;

    let mut tx = store.begin().await?;
    let mut unit = load_unit(tx.as_mut(), unit_id).await?;
    let work = load_work(tx.as_mut(), unit.work_id).await?;
    ensure(can_mutate_content(actor, work.creator_id), "update this chapter")?;

    patch.apply(&mut unit);
    tx.update_unit(&unit).await?;
    tx.touch_work(work.id, Utc::now()).await?;
    tx.commit().await?;

    Ok(unit)
}

#[tracing::instrument(name = "delete chapter", skip_all, fields(actor_id = actor.id, unit_id = unit_id))]
pub async fn delete_unit(store: &dyn Store, actor: &User, unit_id: i64) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    let unit = load_unit(tx.as_mut(), unit_id).await?;
    let work = load_work(tx.as_mut(), unit.work_id).await?;
    ensure(can_mutate_content(actor, work.creator_id), "delete this chapter")?;

    tx.delete_unit(unit.id).await?;
    tx.touch_work(work.id, Utc::now()).await?;
    tx.commit().await?;

    tracing::info!("Chapter deleted");

    Ok(())
}

#[tracing::instrument(name = "get chapter", skip(store))]
pub async fn get_unit(store: &dyn Store, unit_id: i64) -> Result<Unit, Error> {
    let unit = {
        let mut tx = store.begin().await?;
        let unit = load_unit(tx.as_mut(), unit_id).await?;
        tx.commit().await?;
        unit
    };

    record_unit_view(store, unit.id).await;

    Ok(unit)
}

#[tracing::instrument(name = "get chapter by number", skip(store))]
pub async fn get_unit_by_number(
    store: &dyn Store,
    work_id: i64,
    chapter_number: i32,
) -> Result<Unit, Error> {
    let unit = {
        let mut tx = store.begin().await?;
        load_work(tx.as_mut(), work_id).await?;
        let unit = tx
            .find_unit_by_number(work_id, chapter_number)
            .await?
            .ok_or(Error::NotFound("Chapter"))?;
        tx.commit().await?;
        unit
    };

    record_unit_view(store, unit.id).await;

    Ok(unit)
}

/// Units of a work by chapter number.
#[tracing::instrument(name = "list chapters", skip(store))]
pub async fn list_units(store: &dyn Store, work_id: i64) -> Result<Vec<UnitSummary>, Error> {
    let mut tx = store.begin().await?;
    let work = load_work(tx.as_mut(), work_id).await?;
    let units = tx.list_units(work.id).await?;
    tx.commit().await?;

    Ok(units.into_iter().map(UnitSummary::from).collect())
}

#[tracing::instrument(name = "list recent chapters", skip(store))]
pub async fn list_recent_units(store: &dyn Store, limit: i64) -> Result<Vec<UnitSummary>, Error> {
    let mut tx = store.begin().await?;
    let units = tx
        .list_recent_units(limit.clamp(1, MAX_RECENT_LIMIT))
        .await?;
    tx.commit().await?;

    Ok(units.into_iter().map(UnitSummary::from).collect())
}
