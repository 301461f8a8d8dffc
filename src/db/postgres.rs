use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::{PgPool, Postgres};

use crate::{
    error::Error,
    model::{
        Comment, Favorite, MIN_RATINGS_FOR_RANKING, Page, Rating, Role, Unit, User, Work,
        WorkQuery,
    },
};

use super::{Store, Transaction, error::DatabaseError};

pub type PostgresTransaction = sqlx::Transaction<'static, Postgres>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        let tx = self.pool.begin().await.map_err(database_error)?;

        Ok(Box::new(PgTransaction { tx }))
    }
}

struct PgTransaction {
    tx: PostgresTransaction,
}

fn database_error(error: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            tracing::debug!(err.details = ?db_error, "Unique constraint violated");
            return Error::Conflict(conflict_message(db_error.table()).to_string());
        }
    }

    Error::Database(DatabaseError::DatabaseError(error))
}

/// Client-facing text for a unique violation. The raw database message names
/// constraints and values, so it stays in the log.
fn conflict_message(table: Option<&str>) -> &'static str {
    match table {
        Some("users") => "username or email already taken",
        Some("units") => "chapter already exists",
        Some("ratings") => "work already rated",
        Some("favorites") => "work already in favorites",
        _ => "resource already exists",
    }
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{}%", escaped)
}

const USER_COLUMNS: &str =
    "id, username, email, role, display_name, bio, profile_image_url, device_token, created_at";
const WORK_COLUMNS: &str = "id, title, description, cover_image_url, creator_id, genres, view_count, average_rating, rating_count, completed, created_at, updated_at";
const UNIT_COLUMNS: &str =
    "id, work_id, title, chapter_number, description, publish_date, pages, view_count, draft";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    role: String,
    display_name: Option<String>,
    bio: Option<String>,
    profile_image_url: Option<String>,
    device_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: String| Error::Database(DatabaseError::Malformed(e)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
            display_name: row.display_name,
            bio: row.bio,
            profile_image_url: row.profile_image_url,
            device_token: row.device_token,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

#[derive(sqlx::FromRow)]
struct WorkRow {
    id: i64,
    title: String,
    description: Option<String>,
    cover_image_url: Option<String>,
    creator_id: i64,
    genres: Vec<String>,
    view_count: i64,
    average_rating: f64,
    rating_count: i64,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkRow> for Work {
    fn from(row: WorkRow) -> Self {
        Work {
            id: row.id,
            title: row.title,
            description: row.description,
            cover_image_url: row.cover_image_url,
            creator_id: row.creator_id,
            genres: row.genres.into_iter().collect(),
            view_count: row.view_count,
            average_rating: row.average_rating,
            rating_count: row.rating_count,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UnitRow {
    id: i64,
    work_id: i64,
    title: String,
    chapter_number: i32,
    description: Option<String>,
    publish_date: DateTime<Utc>,
    pages: Vec<String>,
    view_count: i64,
    draft: bool,
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            id: row.id,
            work_id: row.work_id,
            title: row.title,
            chapter_number: row.chapter_number,
            description: row.description,
            publish_date: row.publish_date,
            pages: row.pages,
            view_count: row.view_count,
            draft: row.draft,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    user_id: i64,
    unit_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    edited: bool,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            user_id: row.user_id,
            unit_id: row.unit_id,
            content: row.content,
            created_at: row.created_at,
            edited: row.edited,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: i64,
    user_id: i64,
    work_id: i64,
    score: i16,
    rated_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating {
            id: row.id,
            user_id: row.user_id,
            work_id: row.work_id,
            score: row.score,
            rated_at: row.rated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: i64,
    user_id: i64,
    work_id: i64,
    added_at: DateTime<Utc>,
    last_read_chapter: i32,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Favorite {
            id: row.id,
            user_id: row.user_id,
            work_id: row.work_id,
            added_at: row.added_at,
            last_read_chapter: row.last_read_chapter,
        }
    }
}

impl PgTransaction {
    async fn fetch_user_where(
        &mut self,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn fetch_work(&mut self, id: i64, for_update: bool) -> Result<Option<Work>, Error> {
        let sql = format!(
            "SELECT {} FROM works WHERE id = $1{}",
            WORK_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );

        let row = sqlx::query_as::<_, WorkRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(row.map(Work::from))
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    #[tracing::instrument(name = "find user", skip(self))]
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .map(User::try_from)
            .transpose()
    }

    #[tracing::instrument(name = "find user credentials", skip(self))]
    async fn find_user_credentials(
        &mut self,
        username: &str,
    ) -> Result<Option<(User, String)>, Error> {
        let sql = format!(
            "SELECT {}, password FROM users WHERE username = $1",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?;

        match row {
            Some(row) => Ok(Some((User::try_from(row.user)?, row.password))),
            None => Ok(None),
        }
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, Error> {
        self.fetch_user_where("username", username).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        self.fetch_user_where("email", email).await
    }

    #[tracing::instrument(name = "insert user", skip_all, fields(username = %user.username))]
    async fn insert_user(&mut self, user: User, password_hash: String) -> Result<User, Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users
                (username, email, password, role, display_name, bio, profile_image_url, device_token, created_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id;
        "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.role.as_str())
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.profile_image_url)
        .bind(&user.device_token)
        .bind(user.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(User { id, ..user })
    }

    async fn update_user(&mut self, user: &User) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                email = $1,
                display_name = $2,
                bio = $3,
                profile_image_url = $4,
                device_token = $5
            WHERE
                id = $6;
        "#,
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.profile_image_url)
        .bind(&user.device_token)
        .bind(user.id)
        .execute(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn update_user_password(
        &mut self,
        id: i64,
        password_hash: String,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2;")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_work(&mut self, id: i64) -> Result<Option<Work>, Error> {
        self.fetch_work(id, false).await
    }

    #[tracing::instrument(name = "lock work", skip(self))]
    async fn lock_work(&mut self, id: i64) -> Result<Option<Work>, Error> {
        self.fetch_work(id, true).await
    }

    #[tracing::instrument(name = "list works", skip(self))]
    async fn list_works(&mut self, query: &WorkQuery, page: Page) -> Result<Vec<Work>, Error> {
        let (filter, order) = match query {
            WorkQuery::Creator(_) => ("creator_id = $3", "id"),
            WorkQuery::Genre(_) => (
                "EXISTS (SELECT 1 FROM unnest(genres) AS g WHERE lower(g) = lower($3))",
                "id",
            ),
            WorkQuery::Search(_) => ("title ILIKE $3", "id"),
            WorkQuery::Popular => ("TRUE", "view_count DESC, id"),
            WorkQuery::HighestRated => (
                "rating_count > $3",
                "average_rating DESC, rating_count DESC, id",
            ),
        };
        let sql = format!(
            "SELECT {} FROM works WHERE {} ORDER BY {} LIMIT $1 OFFSET $2",
            WORK_COLUMNS, filter, order
        );

        let statement = sqlx::query_as::<_, WorkRow>(&sql)
            .bind(page.size)
            .bind(page.offset());
        let statement = match query {
            WorkQuery::Creator(creator_id) => statement.bind(*creator_id),
            WorkQuery::Genre(genre) => statement.bind(genre.clone()),
            WorkQuery::Search(term) => statement.bind(like_pattern(term)),
            WorkQuery::Popular => statement,
            WorkQuery::HighestRated => statement.bind(MIN_RATINGS_FOR_RANKING),
        };

        let mut stream = statement.fetch(&mut *self.tx);
        let mut works = Vec::new();
        while let Some(row) = stream.try_next().await.map_err(database_error)? {
            works.push(Work::from(row));
        }

        Ok(works)
    }

    #[tracing::instrument(name = "insert work", skip_all, fields(creator_id = work.creator_id))]
    async fn insert_work(&mut self, work: Work) -> Result<Work, Error> {
        let genres: Vec<String> = work.genres.iter().cloned().collect();

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO works
                (title, description, cover_image_url, creator_id, genres,
                 view_count, average_rating, rating_count, completed, created_at, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id;
        "#,
        )
        .bind(&work.title)
        .bind(&work.description)
        .bind(&work.cover_image_url)
        .bind(work.creator_id)
        .bind(genres)
        .bind(work.view_count)
        .bind(work.average_rating)
        .bind(work.rating_count)
        .bind(work.completed)
        .bind(work.created_at)
        .bind(work.updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(Work { id, ..work })
    }

    async fn update_work(&mut self, work: &Work) -> Result<(), Error> {
        let genres: Vec<String> = work.genres.iter().cloned().collect();

        sqlx::query(
            r#"
            UPDATE works
            SET
                title = $1,
                description = $2,
                cover_image_url = $3,
                genres = $4,
                completed = $5,
                updated_at = $6
            WHERE
                id = $7;
        "#,
        )
        .bind(&work.title)
        .bind(&work.description)
        .bind(&work.cover_image_url)
        .bind(genres)
        .bind(work.completed)
        .bind(work.updated_at)
        .bind(work.id)
        .execute(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn touch_work(&mut self, id: i64, updated_at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query("UPDATE works SET updated_at = $1 WHERE id = $2;")
            .bind(updated_at)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn update_work_rating(
        &mut self,
        id: i64,
        average_rating: f64,
        rating_count: i64,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE works SET average_rating = $1, rating_count = $2 WHERE id = $3;")
            .bind(average_rating)
            .bind(rating_count)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn increment_work_views(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE works SET view_count = view_count + 1 WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn delete_work(&mut self, id: i64) -> Result<(), Error> {
        // Dependent rows go through ON DELETE CASCADE.
        sqlx::query("DELETE FROM works WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_unit(&mut self, id: i64) -> Result<Option<Unit>, Error> {
        let sql = format!("SELECT {} FROM units WHERE id = $1", UNIT_COLUMNS);

        let row = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(row.map(Unit::from))
    }

    async fn find_unit_by_number(
        &mut self,
        work_id: i64,
        chapter_number: i32,
    ) -> Result<Option<Unit>, Error> {
        let sql = format!(
            "SELECT {} FROM units WHERE work_id = $1 AND chapter_number = $2",
            UNIT_COLUMNS
        );

        let row = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(work_id)
            .bind(chapter_number)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(row.map(Unit::from))
    }

    async fn list_units(&mut self, work_id: i64) -> Result<Vec<Unit>, Error> {
        let sql = format!(
            "SELECT {} FROM units WHERE work_id = $1 ORDER BY chapter_number",
            UNIT_COLUMNS
        );

        let rows = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(work_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(rows.into_iter().map(Unit::from).collect())
    }

    async fn list_recent_units(&mut self, limit: i64) -> Result<Vec<Unit>, Error> {
        let sql = format!(
            "SELECT {} FROM units WHERE draft = FALSE ORDER BY publish_date DESC, id DESC LIMIT $1",
            UNIT_COLUMNS
        );

        let rows = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(rows.into_iter().map(Unit::from).collect())
    }

    async fn count_units(&mut self, work_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM units WHERE work_id = $1")
            .bind(work_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(database_error)
    }

    #[tracing::instrument(name = "insert unit", skip_all, fields(work_id = unit.work_id, chapter_number = unit.chapter_number))]
    async fn insert_unit(&mut self, unit: Unit) -> Result<Unit, Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO units
                (work_id, title, chapter_number, description, publish_date, pages, view_count, draft)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id;
        "#,
        )
        .bind(unit.work_id)
        .bind(&unit.title)
        .bind(unit.chapter_number)
        .bind(&unit.description)
        .bind(unit.publish_date)
        .bind(&unit.pages)
        .bind(unit.view_count)
        .bind(unit.draft)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(Unit { id, ..unit })
    }

    async fn update_unit(&mut self, unit: &Unit) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE units
            SET
                title = $1,
                description = $2,
                pages = $3,
                draft = $4
            WHERE
                id = $5;
        "#,
        )
        .bind(&unit.title)
        .bind(&unit.description)
        .bind(&unit.pages)
        .bind(unit.draft)
        .bind(unit.id)
        .execute(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn increment_unit_views(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE units SET view_count = view_count + 1 WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn delete_unit(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM units WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_comment(&mut self, id: i64) -> Result<Option<Comment>, Error> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, user_id, unit_id, content, created_at, edited FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(row.map(Comment::from))
    }

    async fn list_comments_by_unit(&mut self, unit_id: i64) -> Result<Vec<Comment>, Error> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                id, user_id, unit_id, content, created_at, edited
            FROM
                comments
            WHERE
                unit_id = $1
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .bind(unit_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn list_comments_by_user(&mut self, user_id: i64) -> Result<Vec<Comment>, Error> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                id, user_id, unit_id, content, created_at, edited
            FROM
                comments
            WHERE
                user_id = $1
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn insert_comment(&mut self, comment: Comment) -> Result<Comment, Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments
                (user_id, unit_id, content, created_at, edited)
            VALUES
                ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
        )
        .bind(comment.user_id)
        .bind(comment.unit_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.edited)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(Comment { id, ..comment })
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<(), Error> {
        sqlx::query("UPDATE comments SET content = $1, edited = $2 WHERE id = $3;")
            .bind(&comment.content)
            .bind(comment.edited)
            .bind(comment.id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn delete_comment(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM comments WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_rating(&mut self, user_id: i64, work_id: i64) -> Result<Option<Rating>, Error> {
        let row = sqlx::query_as::<_, RatingRow>(
            "SELECT id, user_id, work_id, score, rated_at FROM ratings WHERE user_id = $1 AND work_id = $2",
        )
        .bind(user_id)
        .bind(work_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(row.map(Rating::from))
    }

    async fn list_ratings_by_work(&mut self, work_id: i64) -> Result<Vec<Rating>, Error> {
        let mut stream = sqlx::query_as::<_, RatingRow>(
            "SELECT id, user_id, work_id, score, rated_at FROM ratings WHERE work_id = $1",
        )
        .bind(work_id)
        .fetch(&mut *self.tx);

        let mut ratings = Vec::new();
        while let Some(row) = stream.try_next().await.map_err(database_error)? {
            ratings.push(Rating::from(row));
        }

        Ok(ratings)
    }

    async fn insert_rating(&mut self, rating: Rating) -> Result<Rating, Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO ratings
                (user_id, work_id, score, rated_at)
            VALUES
                ($1, $2, $3, $4)
            RETURNING id;
        "#,
        )
        .bind(rating.user_id)
        .bind(rating.work_id)
        .bind(rating.score)
        .bind(rating.rated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(Rating { id, ..rating })
    }

    async fn update_rating(&mut self, rating: &Rating) -> Result<(), Error> {
        sqlx::query("UPDATE ratings SET score = $1, rated_at = $2 WHERE id = $3;")
            .bind(rating.score)
            .bind(rating.rated_at)
            .bind(rating.id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn delete_rating(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM ratings WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_favorite(
        &mut self,
        user_id: i64,
        work_id: i64,
    ) -> Result<Option<Favorite>, Error> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, user_id, work_id, added_at, last_read_chapter FROM favorites WHERE user_id = $1 AND work_id = $2",
        )
        .bind(user_id)
        .bind(work_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(row.map(Favorite::from))
    }

    async fn list_favorites_by_user(&mut self, user_id: i64) -> Result<Vec<Favorite>, Error> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r#"
            SELECT
                id, user_id, work_id, added_at, last_read_chapter
            FROM
                favorites
            WHERE
                user_id = $1
            ORDER BY added_at DESC, id DESC
        "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn count_favorites(&mut self, work_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM favorites WHERE work_id = $1")
            .bind(work_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(database_error)
    }

    async fn insert_favorite(&mut self, favorite: Favorite) -> Result<Favorite, Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO favorites
                (user_id, work_id, added_at, last_read_chapter)
            VALUES
                ($1, $2, $3, $4)
            RETURNING id;
        "#,
        )
        .bind(favorite.user_id)
        .bind(favorite.work_id)
        .bind(favorite.added_at)
        .bind(favorite.last_read_chapter)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;

        Ok(Favorite { id, ..favorite })
    }

    async fn update_favorite(&mut self, favorite: &Favorite) -> Result<(), Error> {
        sqlx::query("UPDATE favorites SET last_read_chapter = $1 WHERE id = $2;")
            .bind(favorite.last_read_chapter)
            .bind(favorite.id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn delete_favorite(&mut self, id: i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM favorites WHERE id = $1;")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        self.tx.commit().await.map_err(database_error)
    }
}
