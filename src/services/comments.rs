use chrono::Utc;

use crate::{
    db::Store,
    error::Error,
    model::{Comment, User},
    policy::{can_mutate_comment, ensure},
    services::{invalid, load_unit},
};

pub const MAX_COMMENT_LENGTH: usize = 1000;

fn validate_content(content: &str) -> Result<(), Error> {
    if content.trim().is_empty() || content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(invalid(
            "content",
            "content_length",
            "Comment must be between 1 and 1000 characters",
        ));
    }

    Ok(())
}

#[tracing::instrument(name = "create comment", skip(store, actor, content), fields(actor_id = actor.id))]
pub async fn create_comment(
    store: &dyn Store,
    actor: &User,
    unit_id: i64,
    content: String,
) -> Result<Comment, Error> {
    validate_content(&content)?;

    let mut tx = store.begin().await?;
    let unit = load_unit(tx.as_mut(), unit_id).await?;
    let comment = tx
        .insert_comment(Comment {
            id: 0,
            user_id: actor.id,
            unit_id: unit.id,
            content,
            created_at: Utc::now(),
            edited: false,
        })
        .await?;
    tx.commit().await?;

    Ok(comment)
}

/// Replaces the content and marks the comment as edited.
#[tracing::instrument(name = "update comment", skip(store, actor, content), fields(actor_id = actor.id))]
pub async fn update_comment(
    store: &dyn Store,
    actor: &User,
    comment_id: i64,
    content: String,
) -> Result<Comment, Error> {
    validate_content(&content)?;

    let mut tx = store.begin().await?;
    let mut comment = tx
        .find_comment(comment_id)
        .await?
        .ok_or(Error::NotFound("Comment"))?;
    ensure(can_mutate_comment(actor, &comment), "update this comment")?;

    comment.content = content;
    comment.edited = true;
    tx.update_comment(&comment).await?;
    tx.commit().await?;

    Ok(comment)
}

#[tracing::instrument(name = "delete comment", skip(store, actor), fields(actor_id = actor.id))]
pub async fn delete_comment(store: &dyn Store, actor: &User, comment_id: i64) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    let comment = tx
        .find_comment(comment_id)
        .await?
        .ok_or(Error::NotFound("Comment"))?;
    ensure(can_mutate_comment(actor, &comment), "delete this comment")?;

    tx.delete_comment(comment.id).await?;
    tx.commit().await?;

    Ok(())
}

#[tracing::instrument(name = "list chapter comments", skip(store))]
pub async fn list_comments_by_unit(store: &dyn Store, unit_id: i64) -> Result<Vec<Comment>, Error> {
    let mut tx = store.begin().await?;
    let comments = tx.list_comments_by_unit(unit_id).await?;
    tx.commit().await?;

    Ok(comments)
}

#[tracing::instrument(name = "list user comments", skip(store))]
pub async fn list_comments_by_user(store: &dyn Store, user_id: i64) -> Result<Vec<Comment>, Error> {
    let mut tx = store.begin().await?;
    let comments = tx.list_comments_by_user(user_id).await?;
    tx.commit().await?;

    Ok(comments)
}
