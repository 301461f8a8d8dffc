use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Creator,
    Reader,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "CREATOR",
            Role::Reader => "READER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Push topic every device of a user with this role is subscribed to.
    pub fn topic(&self) -> String {
        format!("role-{}", self.as_str().to_lowercase())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATOR" => Ok(Role::Creator),
            "READER" => Ok(Role::Reader),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("{} is not a known role", other)),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(skip)]
    pub device_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a profile that the owner may change. `None` leaves the stored
/// value untouched.
#[derive(serde::Deserialize, Debug, Default, Validate)]
pub struct ProfilePatch {
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub display_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

impl ProfilePatch {
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(display_name) = self.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio);
        }
        if let Some(profile_image_url) = self.profile_image_url {
            user.profile_image_url = Some(profile_image_url);
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Work {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub creator_id: i64,
    pub genres: BTreeSet<String>,
    pub view_count: i64,
    pub average_rating: f64,
    pub rating_count: i64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Validate)]
pub struct NewWork {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
}

/// Partial update of a work. Every `None` field is a no-op; `genres`, when
/// present, replaces the whole set.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, Validate)]
pub struct WorkPatch {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub genres: Option<BTreeSet<String>>,
    pub completed: Option<bool>,
}

impl WorkPatch {
    pub fn apply(self, work: &mut Work) {
        if let Some(title) = self.title {
            work.title = title;
        }
        if let Some(description) = self.description {
            work.description = Some(description);
        }
        if let Some(cover_image_url) = self.cover_image_url {
            work.cover_image_url = Some(cover_image_url);
        }
        if let Some(genres) = self.genres {
            work.genres = genres;
        }
        if let Some(completed) = self.completed {
            work.completed = completed;
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct WorkView {
    #[serde(flatten)]
    pub work: Work,
    pub chapter_count: i64,
    pub in_user_favorites: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: i64,
    pub work_id: i64,
    pub title: String,
    pub chapter_number: i32,
    pub description: Option<String>,
    pub publish_date: DateTime<Utc>,
    pub pages: Vec<String>,
    pub view_count: i64,
    pub draft: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Validate)]
pub struct NewUnit {
    pub work_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1))]
    pub chapter_number: i32,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub pages: Vec<String>,
    pub draft: Option<bool>,
}

/// Partial update of a unit. `pages`, when present, replaces the whole list
/// in the given order.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, Validate)]
pub struct UnitPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub pages: Option<Vec<String>>,
    pub draft: Option<bool>,
}

impl UnitPatch {
    pub fn apply(self, unit: &mut Unit) {
        if let Some(title) = self.title {
            unit.title = title;
        }
        if let Some(description) = self.description {
            unit.description = Some(description);
        }
        if let Some(pages) = self.pages {
            unit.pages = pages;
        }
        if let Some(draft) = self.draft {
            unit.draft = draft;
        }
    }
}

/// Listing shape of a unit, without its pages.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct UnitSummary {
    pub id: i64,
    pub work_id: i64,
    pub title: String,
    pub chapter_number: i32,
    pub publish_date: DateTime<Utc>,
    pub view_count: i64,
}

impl From<Unit> for UnitSummary {
    fn from(unit: Unit) -> Self {
        UnitSummary {
            id: unit.id,
            work_id: unit.work_id,
            title: unit.title,
            chapter_number: unit.chapter_number,
            publish_date: unit.publish_date,
            view_count: unit.view_count,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub unit_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub work_id: i64,
    pub score: i16,
    pub rated_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub work_id: i64,
    pub added_at: DateTime<Utc>,
    pub last_read_chapter: i32,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub size: i64,
}

/// Highest page index a listing accepts.
pub const MAX_PAGE: i64 = 100_000;

impl Page {
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page { page: 0, size: 10 }
    }
}

/// Catalogue listings over works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkQuery {
    /// Works of one creator, oldest first.
    Creator(i64),
    /// Works tagged with a genre, compared case-insensitively.
    Genre(String),
    /// Most viewed first.
    Popular,
    /// Best average first, only works with more than
    /// [`MIN_RATINGS_FOR_RANKING`] ratings.
    HighestRated,
    /// Case-insensitive substring match on the title.
    Search(String),
}

pub const MIN_RATINGS_FOR_RANKING: i64 = 5;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub public_id: String,
    pub url: String,
    pub secure_url: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}
