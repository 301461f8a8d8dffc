use std::{cmp::Reverse, collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::Error,
    model::{
        Comment, Favorite, MIN_RATINGS_FOR_RANKING, Page, Rating, Unit, User, Work, WorkQuery,
    },
};

use super::{Store, Transaction};

#[derive(Clone, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, (User, String)>,
    works: BTreeMap<i64, Work>,
    units: BTreeMap<i64, Unit>,
    comments: BTreeMap<i64, Comment>,
    ratings: BTreeMap<i64, Rating>,
    favorites: BTreeMap<i64, Favorite>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn remove_unit_cascade(&mut self, unit_id: i64) {
        self.units.remove(&unit_id);
        self.comments.retain(|_, c| c.unit_id != unit_id);
    }
}

/// Arena tables keyed by id, held in process memory.
///
/// A transaction owns the store lock for its whole lifetime, so transactions
/// run one at a time. Never open a second transaction while holding one.
///
/// Every `begin` copies all tables, reads included. Meant for tests and local
/// development, not for serving real traffic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

fn page_of<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(0);
    let take = usize::try_from(page.size).unwrap_or(0);

    rows.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, Error> {
        Ok(self.working.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn find_user_credentials(
        &mut self,
        username: &str,
    ) -> Result<Option<(User, String)>, Error> {
        Ok(self
            .working
            .users
            .values()
            .find(|(user, _)| user.username == username)
            .cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .working
            .users
            .values()
            .find(|(user, _)| user.username == username)
            .map(|(user, _)| user.clone()))
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .working
            .users
            .values()
            .find(|(user, _)| user.email == email)
            .map(|(user, _)| user.clone()))
    }

    async fn insert_user(&mut self, mut user: User, password_hash: String) -> Result<User, Error> {
        let duplicate = self
            .working
            .users
            .values()
            .any(|(u, _)| u.username == user.username || u.email == user.email);
        if duplicate {
            return Err(Error::Conflict("username or email already taken".to_string()));
        }

        user.id = self.working.next_id();
        self.working
            .users
            .insert(user.id, (user.clone(), password_hash));

        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> Result<(), Error> {
        let email_taken = self
            .working
            .users
            .values()
            .any(|(u, _)| u.id != user.id && u.email == user.email);
        if email_taken {
            return Err(Error::Conflict("email already taken".to_string()));
        }

        if let Some((stored, _)) = self.working.users.get_mut(&user.id) {
            let role = stored.role;
            *stored = User {
                role,
                ..user.clone()
            };
        }

        Ok(())
    }

    async fn update_user_password(
        &mut self,
        id: i64,
        password_hash: String,
    ) -> Result<(), Error> {
        if let Some((_, stored)) = self.working.users.get_mut(&id) {
            *stored = password_hash;
        }

        Ok(())
    }

    async fn find_work(&mut self, id: i64) -> Result<Option<Work>, Error> {
        Ok(self.working.works.get(&id).cloned())
    }

    async fn lock_work(&mut self, id: i64) -> Result<Option<Work>, Error> {
        // The store lock is already exclusive.
        self.find_work(id).await
    }

    async fn list_works(&mut self, query: &WorkQuery, page: Page) -> Result<Vec<Work>, Error> {
        let works = self.working.works.values().cloned();

        let mut rows: Vec<Work> = match query {
            WorkQuery::Creator(creator_id) => works.filter(|w| w.creator_id == *creator_id).collect(),
            WorkQuery::Genre(genre) => works
                .filter(|w| w.genres.iter().any(|g| g.to_lowercase() == genre.to_lowercase()))
                .collect(),
            WorkQuery::Search(term) => {
                let term = term.to_lowercase();
                works
                    .filter(|w| w.title.to_lowercase().contains(&term))
                    .collect()
            }
            WorkQuery::Popular => works.collect(),
            WorkQuery::HighestRated => works
                .filter(|w| w.rating_count > MIN_RATINGS_FOR_RANKING)
                .collect(),
        };

        match query {
            WorkQuery::Popular => rows.sort_by_key(|w| (Reverse(w.view_count), w.id)),
            WorkQuery::HighestRated => rows.sort_by(|a, b| {
                b.average_rating
                    .total_cmp(&a.average_rating)
                    .then(b.rating_count.cmp(&a.rating_count))
                    .then(a.id.cmp(&b.id))
            }),
            _ => {}
        }

        Ok(page_of(rows, page))
    }

    async fn insert_work(&mut self, mut work: Work) -> Result<Work, Error> {
        work.id = self.working.next_id();
        self.working.works.insert(work.id, work.clone());

        Ok(work)
    }

    async fn update_work(&mut self, work: &Work) -> Result<(), Error> {
        if let Some(stored) = self.working.works.get_mut(&work.id) {
            stored.title = work.title.clone();
            stored.description = work.description.clone();
            stored.cover_image_url = work.cover_image_url.clone();
            stored.genres = work.genres.clone();
            stored.completed = work.completed;
            stored.updated_at = work.updated_at;
        }

        Ok(())
    }

    async fn touch_work(&mut self, id: i64, updated_at: DateTime<Utc>) -> Result<(), Error> {
        if let Some(stored) = self.working.works.get_mut(&id) {
            stored.updated_at = updated_at;
        }

        Ok(())
    }

    async fn update_work_rating(
        &mut self,
        id: i64,
        average_rating: f64,
        rating_count: i64,
    ) -> Result<(), Error> {
        if let Some(stored) = self.working.works.get_mut(&id) {
            stored.average_rating = average_rating;
            stored.rating_count = rating_count;
        }

        Ok(())
    }

    async fn increment_work_views(&mut self, id: i64) -> Result<(), Error> {
        if let Some(stored) = self.working.works.get_mut(&id) {
            stored.view_count += 1;
        }

        Ok(())
    }

    async fn delete_work(&mut self, id: i64) -> Result<(), Error> {
        let tables = &mut self.working;

        let unit_ids: Vec<i64> = tables
            .units
            .values()
            .filter(|u| u.work_id == id)
            .map(|u| u.id)
            .collect();
        for unit_id in unit_ids {
            tables.remove_unit_cascade(unit_id);
        }

        tables.ratings.retain(|_, r| r.work_id != id);
        tables.favorites.retain(|_, f| f.work_id != id);
        tables.works.remove(&id);

        Ok(())
    }

    async fn find_unit(&mut self, id: i64) -> Result<Option<Unit>, Error> {
        Ok(self.working.units.get(&id).cloned())
    }

    async fn find_unit_by_number(
        &mut self,
        work_id: i64,
        chapter_number: i32,
    ) -> Result<Option<Unit>, Error> {
        Ok(self
            .working
            .units
            .values()
            .find(|u| u.work_id == work_id && u.chapter_number == chapter_number)
            .cloned())
    }

    async fn list_units(&mut self, work_id: i64) -> Result<Vec<Unit>, Error> {
        let mut units: Vec<Unit> = self
            .working
            .units
            .values()
            .filter(|u| u.work_id == work_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| u.chapter_number);

        Ok(units)
    }

    async fn list_recent_units(&mut self, limit: i64) -> Result<Vec<Unit>, Error> {
        let mut units: Vec<Unit> = self
            .working
            .units
            .values()
            .filter(|u| !u.draft)
            .cloned()
            .collect();
        units.sort_by_key(|u| Reverse((u.publish_date, u.id)));
        units.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(units)
    }

    async fn count_units(&mut self, work_id: i64) -> Result<i64, Error> {
        let count = self
            .working
            .units
            .values()
            .filter(|u| u.work_id == work_id)
            .count();

        Ok(count as i64)
    }

    async fn insert_unit(&mut self, mut unit: Unit) -> Result<Unit, Error> {
        let duplicate = self
            .working
            .units
            .values()
            .any(|u| u.work_id == unit.work_id && u.chapter_number == unit.chapter_number);
        if duplicate {
            return Err(Error::Conflict(format!(
                "chapter {} already exists",
                unit.chapter_number
            )));
        }

        unit.id = self.working.next_id();
        self.working.units.insert(unit.id, unit.clone());

        Ok(unit)
    }

    async fn update_unit(&mut self, unit: &Unit) -> Result<(), Error> {
        if let Some(stored) = self.working.units.get_mut(&unit.id) {
            stored.title = unit.title.clone();
            stored.description = unit.description.clone();
            stored.pages = unit.pages.clone();
            stored.draft = unit.draft;
        }

        Ok(())
    }

    async fn increment_unit_views(&mut self, id: i64) -> Result<(), Error> {
        if let Some(stored) = self.working.units.get_mut(&id) {
            stored.view_count += 1;
        }

        Ok(())
    }

    async fn delete_unit(&mut self, id: i64) -> Result<(), Error> {
        self.working.remove_unit_cascade(id);

        Ok(())
    }

    async fn find_comment(&mut self, id: i64) -> Result<Option<Comment>, Error> {
        Ok(self.working.comments.get(&id).cloned())
    }

    async fn list_comments_by_unit(&mut self, unit_id: i64) -> Result<Vec<Comment>, Error> {
        let mut comments: Vec<Comment> = self
            .working
            .comments
            .values()
            .filter(|c| c.unit_id == unit_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| Reverse((c.created_at, c.id)));

        Ok(comments)
    }

    async fn list_comments_by_user(&mut self, user_id: i64) -> Result<Vec<Comment>, Error> {
        let mut comments: Vec<Comment> = self
            .working
            .comments
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| Reverse((c.created_at, c.id)));

        Ok(comments)
    }

    async fn insert_comment(&mut self, mut comment: Comment) -> Result<Comment, Error> {
        comment.id = self.working.next_id();
        self.working.comments.insert(comment.id, comment.clone());

        Ok(comment)
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<(), Error> {
        if let Some(stored) = self.working.comments.get_mut(&comment.id) {
            stored.content = comment.content.clone();
            stored.edited = comment.edited;
        }

        Ok(())
    }

    async fn delete_comment(&mut self, id: i64) -> Result<(), Error> {
        self.working.comments.remove(&id);

        Ok(())
    }

    async fn find_rating(&mut self, user_id: i64, work_id: i64) -> Result<Option<Rating>, Error> {
        Ok(self
            .working
            .ratings
            .values()
            .find(|r| r.user_id == user_id && r.work_id == work_id)
            .cloned())
    }

    async fn list_ratings_by_work(&mut self, work_id: i64) -> Result<Vec<Rating>, Error> {
        Ok(self
            .working
            .ratings
            .values()
            .filter(|r| r.work_id == work_id)
            .cloned()
            .collect())
    }

    async fn insert_rating(&mut self, mut rating: Rating) -> Result<Rating, Error> {
        if self
            .find_rating(rating.user_id, rating.work_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("work already rated".to_string()));
        }

        rating.id = self.working.next_id();
        self.working.ratings.insert(rating.id, rating.clone());

        Ok(rating)
    }

    async fn update_rating(&mut self, rating: &Rating) -> Result<(), Error> {
        if let Some(stored) = self.working.ratings.get_mut(&rating.id) {
            stored.score = rating.score;
            stored.rated_at = rating.rated_at;
        }

        Ok(())
    }

    async fn delete_rating(&mut self, id: i64) -> Result<(), Error> {
        self.working.ratings.remove(&id);

        Ok(())
    }

    async fn find_favorite(
        &mut self,
        user_id: i64,
        work_id: i64,
    ) -> Result<Option<Favorite>, Error> {
        Ok(self
            .working
            .favorites
            .values()
            .find(|f| f.user_id == user_id && f.work_id == work_id)
            .cloned())
    }

    async fn list_favorites_by_user(&mut self, user_id: i64) -> Result<Vec<Favorite>, Error> {
        let mut favorites: Vec<Favorite> = self
            .working
            .favorites
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        favorites.sort_by_key(|f| Reverse((f.added_at, f.id)));

        Ok(favorites)
    }

    async fn count_favorites(&mut self, work_id: i64) -> Result<i64, Error> {
        let count = self
            .working
            .favorites
            .values()
            .filter(|f| f.work_id == work_id)
            .count();

        Ok(count as i64)
    }

    async fn insert_favorite(&mut self, mut favorite: Favorite) -> Result<Favorite, Error> {
        if self
            .find_favorite(favorite.user_id, favorite.work_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("work already in favorites".to_string()));
        }

        favorite.id = self.working.next_id();
        self.working.favorites.insert(favorite.id, favorite.clone());

        Ok(favorite)
    }

    async fn update_favorite(&mut self, favorite: &Favorite) -> Result<(), Error> {
        if let Some(stored) = self.working.favorites.get_mut(&favorite.id) {
            stored.last_read_chapter = favorite.last_read_chapter;
        }

        Ok(())
    }

    async fn delete_favorite(&mut self, id: i64) -> Result<(), Error> {
        self.working.favorites.remove(&id);

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;

        Ok(())
    }
}
