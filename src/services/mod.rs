//! Core operations.
//!
//! Each operation takes the store and the authenticated actor explicitly,
//! runs its reads, policy checks and writes inside one transaction and
//! commits only when every step succeeded.

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

use crate::{
    db::Transaction,
    error::Error,
    model::{Unit, Work},
};

pub mod accounts;
pub mod aggregation;
pub mod comments;
pub mod favorites;
pub mod ratings;
pub mod units;
pub mod works;

pub(crate) async fn load_work(tx: &mut dyn Transaction, id: i64) -> Result<Work, Error> {
    tx.find_work(id).await?.ok_or(Error::NotFound("Work"))
}

/// Like [`load_work`], but holds the work row until the transaction ends so
/// writers keyed on the work run one after another.
pub(crate) async fn lock_work(tx: &mut dyn Transaction, id: i64) -> Result<Work, Error> {
    tx.lock_work(id).await?.ok_or(Error::NotFound("Work"))
}

pub(crate) async fn load_unit(tx: &mut dyn Transaction, id: i64) -> Result<Unit, Error> {
    tx.find_unit(id).await?.ok_or(Error::NotFound("Chapter"))
}

/// Builds a single-field validation failure.
pub(crate) fn invalid(field: &'static str, code: &'static str, message: &'static str) -> Error {
    let mut errors = ValidationErrors::new();
    errors.add(
        field,
        ValidationError::new(code).with_message(Cow::from(message)),
    );
    Error::Validation(errors)
}
