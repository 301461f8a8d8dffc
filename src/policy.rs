//! Authorization predicates over already-loaded entities.
//!
//! The predicates are pure; callers turn a `false` into [`Error::Forbidden`]
//! through [`ensure`] before any write happens.

use crate::{
    error::Error,
    model::{Comment, Role, User},
};

/// Only creators and admins may publish new works and units.
pub fn can_publish(actor: &User) -> bool {
    matches!(actor.role, Role::Creator | Role::Admin)
}

/// Works and units may be changed by their owner or an admin.
pub fn can_mutate_content(actor: &User, owner_id: i64) -> bool {
    actor.id == owner_id || actor.role == Role::Admin
}

/// Comments may be changed by their author, a moderator or an admin.
pub fn can_mutate_comment(actor: &User, comment: &Comment) -> bool {
    actor.id == comment.user_id || matches!(actor.role, Role::Admin | Role::Moderator)
}

pub fn ensure(allowed: bool, action: &'static str) -> Result<(), Error> {
    if allowed {
        Ok(())
    } else {
        Err(Error::Forbidden(action))
    }
}
