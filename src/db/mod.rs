//! Storage boundary.
//!
//! Every core operation opens a [`Transaction`] from a [`Store`], reads and
//! writes through it, and commits. Dropping a transaction without committing
//! discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::{Comment, Favorite, Page, Rating, Unit, User, Work, WorkQuery},
};

pub mod error;
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error>;
}

/// Row access inside one atomic unit of work.
///
/// Inserts ignore the `id` of the value passed in and return the stored row
/// with its assigned id.
#[async_trait]
pub trait Transaction: Send {
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, Error>;
    /// Returns the user together with its password hash.
    async fn find_user_credentials(
        &mut self,
        username: &str,
    ) -> Result<Option<(User, String)>, Error>;
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error>;
    async fn insert_user(&mut self, user: User, password_hash: String) -> Result<User, Error>;
    /// Writes profile fields and the device token. The role is never written.
    async fn update_user(&mut self, user: &User) -> Result<(), Error>;
    async fn update_user_password(&mut self, id: i64, password_hash: String)
    -> Result<(), Error>;

    async fn find_work(&mut self, id: i64) -> Result<Option<Work>, Error>;
    /// Like [`Transaction::find_work`], but holds the row until commit so
    /// rating writes on the same work are serialized.
    async fn lock_work(&mut self, id: i64) -> Result<Option<Work>, Error>;
    async fn list_works(&mut self, query: &WorkQuery, page: Page) -> Result<Vec<Work>, Error>;
    async fn insert_work(&mut self, work: Work) -> Result<Work, Error>;
    /// Writes content fields and `updated_at`. Counters and the rating
    /// aggregate are left as stored.
    async fn update_work(&mut self, work: &Work) -> Result<(), Error>;
    async fn touch_work(&mut self, id: i64, updated_at: DateTime<Utc>) -> Result<(), Error>;
    /// Only the aggregation engine calls this.
    async fn update_work_rating(
        &mut self,
        id: i64,
        average_rating: f64,
        rating_count: i64,
    ) -> Result<(), Error>;
    async fn increment_work_views(&mut self, id: i64) -> Result<(), Error>;
    /// Removes the work with its units, comments, ratings and favorites.
    async fn delete_work(&mut self, id: i64) -> Result<(), Error>;

    async fn find_unit(&mut self, id: i64) -> Result<Option<Unit>, Error>;
    async fn find_unit_by_number(
        &mut self,
        work_id: i64,
        chapter_number: i32,
    ) -> Result<Option<Unit>, Error>;
    /// Ordered by chapter number.
    async fn list_units(&mut self, work_id: i64) -> Result<Vec<Unit>, Error>;
    /// Published units, newest first.
    async fn list_recent_units(&mut self, limit: i64) -> Result<Vec<Unit>, Error>;
    async fn count_units(&mut self, work_id: i64) -> Result<i64, Error>;
    async fn insert_unit(&mut self, unit: Unit) -> Result<Unit, Error>;
    /// Writes content fields. The view counter is left as stored.
    async fn update_unit(&mut self, unit: &Unit) -> Result<(), Error>;
    async fn increment_unit_views(&mut self, id: i64) -> Result<(), Error>;
    /// Removes the unit with its comments.
    async fn delete_unit(&mut self, id: i64) -> Result<(), Error>;

    async fn find_comment(&mut self, id: i64) -> Result<Option<Comment>, Error>;
    /// Newest first.
    async fn list_comments_by_unit(&mut self, unit_id: i64) -> Result<Vec<Comment>, Error>;
    /// Newest first.
    async fn list_comments_by_user(&mut self, user_id: i64) -> Result<Vec<Comment>, Error>;
    async fn insert_comment(&mut self, comment: Comment) -> Result<Comment, Error>;
    async fn update_comment(&mut self, comment: &Comment) -> Result<(), Error>;
    async fn delete_comment(&mut self, id: i64) -> Result<(), Error>;

    async fn find_rating(&mut self, user_id: i64, work_id: i64) -> Result<Option<Rating>, Error>;
    async fn list_ratings_by_work(&mut self, work_id: i64) -> Result<Vec<Rating>, Error>;
    async fn insert_rating(&mut self, rating: Rating) -> Result<Rating, Error>;
    async fn update_rating(&mut self, rating: &Rating) -> Result<(), Error>;
    async fn delete_rating(&mut self, id: i64) -> Result<(), Error>;

    async fn find_favorite(
        &mut self,
        user_id: i64,
        work_id: i64,
    ) -> Result<Option<Favorite>, Error>;
    /// Most recently added first.
    async fn list_favorites_by_user(&mut self, user_id: i64) -> Result<Vec<Favorite>, Error>;
    async fn count_favorites(&mut self, work_id: i64) -> Result<i64, Error>;
    async fn insert_favorite(&mut self, favorite: Favorite) -> Result<Favorite, Error>;
    async fn update_favorite(&mut self, favorite: &Favorite) -> Result<(), Error>;
    async fn delete_favorite(&mut self, id: i64) -> Result<(), Error>;

    async fn commit(self: Box<Self>) -> Result<(), Error>;
}
