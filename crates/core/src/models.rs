//! Shared data models for catalog records and user profiles

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScoutError;

/// Catalog identifier of a game
pub type GameId = u64;

/// Catalog identifier of a genre
pub type GenreId = u64;

/// Page size sent with every list request
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// The catalog sends `null` for empty lists and missing numbers on some records.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Small id + name + slug record used for genres, developers, publishers and platforms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NamedRef {
    pub fn new(id: u64, name: &str, slug: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }
}

pub type Genre = NamedRef;
pub type Developer = NamedRef;
pub type Publisher = NamedRef;

/// Platform entry as the catalog nests it: `{"platform": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub platform: NamedRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: u64,
    pub image: String,
}

/// Short video preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub clip: String,
}

/// Game record from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating_top: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ratings_count: u32,
    #[serde(default)]
    pub metacritic: Option<u32>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<PlatformEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub developers: Vec<Developer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub publishers: Vec<Publisher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_screenshots: Vec<Screenshot>,
}

impl Game {
    /// Plain-text description, preferring the raw variant
    pub fn description_text(&self) -> &str {
        self.description_raw
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or_default()
    }

    /// Release year parsed from the `YYYY-MM-DD` release date
    pub fn release_year(&self) -> Option<i32> {
        self.released
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }

    pub fn has_genre(&self, genre_id: GenreId) -> bool {
        self.genres.iter().any(|g| g.id == genre_id)
    }

    /// Case-insensitive substring match on the title
    pub fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Paged response envelope: `{count, next, previous, results}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Single page holding every item, with no neighbours
    pub fn complete(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

pub type GamePage = Page<Game>;
pub type GenrePage = Page<Genre>;
pub type ScreenshotPage = Page<Screenshot>;

/// Sort keys offered on the browse page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "-rating")]
    HighestRated,
    #[serde(rename = "-metacritic")]
    BestMetacritic,
    #[serde(rename = "-released")]
    Newest,
    #[serde(rename = "released")]
    Oldest,
    #[serde(rename = "name")]
    NameAsc,
    #[serde(rename = "-name")]
    NameDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::HighestRated,
        SortOrder::BestMetacritic,
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
    ];

    /// Value of the catalog's `ordering` parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::HighestRated => "-rating",
            SortOrder::BestMetacritic => "-metacritic",
            SortOrder::Newest => "-released",
            SortOrder::Oldest => "released",
            SortOrder::NameAsc => "name",
            SortOrder::NameDesc => "-name",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::HighestRated => "Highest Rated",
            SortOrder::BestMetacritic => "Best Metacritic Score",
            SortOrder::Newest => "Newest",
            SortOrder::Oldest => "Oldest",
            SortOrder::NameAsc => "A-Z",
            SortOrder::NameDesc => "Z-A",
        }
    }

    /// Sort records locally the way the catalog's `ordering` parameter would
    pub fn sort_games(&self, games: &mut [Game]) {
        match self {
            SortOrder::HighestRated => games.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortOrder::BestMetacritic => games.sort_by(|a, b| b.metacritic.cmp(&a.metacritic)),
            SortOrder::Newest => games.sort_by(|a, b| b.released.cmp(&a.released)),
            SortOrder::Oldest => games.sort_by(|a, b| a.released.cmp(&b.released)),
            SortOrder::NameAsc => games.sort_by(|a, b| a.name.cmp(&b.name)),
            SortOrder::NameDesc => games.sort_by(|a, b| b.name.cmp(&a.name)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for SortOrder {
    type Err = ScoutError;

    /// Accepts either the `ordering` value or a short name such as `newest`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let order = match normalized.as_str() {
            "-rating" | "rating" | "highest-rated" => SortOrder::HighestRated,
            "-metacritic" | "metacritic" | "best-metacritic" => SortOrder::BestMetacritic,
            "-released" | "newest" => SortOrder::Newest,
            "released" | "oldest" => SortOrder::Oldest,
            "name" | "name-asc" | "a-z" => SortOrder::NameAsc,
            "-name" | "name-desc" | "z-a" => SortOrder::NameDesc,
            _ => return Err(ScoutError::InvalidData(format!("unknown sort order: {}", s))),
        };
        Ok(order)
    }
}

/// Filters of the browse page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub genre: Option<GenreId>,
    pub year: Option<i32>,
    #[serde(default)]
    pub ordering: SortOrder,
}

impl FilterState {
    /// Number of filters that differ from the defaults
    pub fn active_filter_count(&self) -> usize {
        usize::from(self.genre.is_some())
            + usize::from(self.year.is_some())
            + usize::from(self.ordering != SortOrder::default())
    }

    pub fn is_default(&self) -> bool {
        self.active_filter_count() == 0
    }
}

/// Signed-in identity as the identity provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Array fields of the profile document with set semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Favorites,
    GameHistory,
}

impl ProfileField {
    /// Field name inside the profile document
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Favorites => "favorites",
            ProfileField::GameHistory => "gameHistory",
        }
    }
}

/// Per-user profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub favorites: BTreeSet<GameId>,
    #[serde(default)]
    pub game_history: BTreeSet<GameId>,
}

impl UserProfile {
    /// Fresh profile with empty favorite and history sets
    pub fn new(user: &AuthUser, display_name: Option<&str>, created_at: DateTime<Utc>) -> Self {
        let display_name = display_name
            .filter(|name| !name.is_empty())
            .or(user.display_name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or("Anonymous");
        Self {
            uid: user.uid.clone(),
            email: user.email.clone().unwrap_or_default(),
            display_name: display_name.to_string(),
            photo_url: user.photo_url.clone(),
            created_at,
            favorites: BTreeSet::new(),
            game_history: BTreeSet::new(),
        }
    }

    pub fn is_favorite(&self, game_id: GameId) -> bool {
        self.favorites.contains(&game_id)
    }

    pub fn set(&self, field: ProfileField) -> &BTreeSet<GameId> {
        match field {
            ProfileField::Favorites => &self.favorites,
            ProfileField::GameHistory => &self.game_history,
        }
    }

    pub fn set_mut(&mut self, field: ProfileField) -> &mut BTreeSet<GameId> {
        match field {
            ProfileField::Favorites => &mut self.favorites,
            ProfileField::GameHistory => &mut self.game_history,
        }
    }

    /// Returns false when the id was already present
    pub fn insert(&mut self, field: ProfileField, game_id: GameId) -> bool {
        self.set_mut(field).insert(game_id)
    }

    /// Returns false when the id was absent
    pub fn remove(&mut self, field: ProfileField, game_id: GameId) -> bool {
        self.set_mut(field).remove(&game_id)
    }
}

/// Partial update of a profile document; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<BTreeSet<GameId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_history: Option<BTreeSet<GameId>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }

    /// Document field names touched by this update
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.email.is_some() {
            paths.push("email");
        }
        if self.display_name.is_some() {
            paths.push("displayName");
        }
        if self.photo_url.is_some() {
            paths.push("photoURL");
        }
        if self.favorites.is_some() {
            paths.push("favorites");
        }
        if self.game_history.is_some() {
            paths.push("gameHistory");
        }
        paths
    }

    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        if let Some(name) = &self.display_name {
            profile.display_name = name.clone();
        }
        if let Some(photo) = &self.photo_url {
            profile.photo_url = Some(photo.clone());
        }
        if let Some(favorites) = &self.favorites {
            profile.favorites = favorites.clone();
        }
        if let Some(history) = &self.game_history {
            profile.game_history = history.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user() -> AuthUser {
        AuthUser {
            uid: "u1".to_string(),
            email: Some("ann@example.com".to_string()),
            display_name: None,
            photo_url: None,
        }
    }

    #[test]
    fn test_game_tolerates_nulls() {
        let json = r#"{
            "id": 42,
            "name": "Quiet Game",
            "background_image": null,
            "rating": 0,
            "metacritic": null,
            "released": null,
            "platforms": null,
            "genres": [{"id": 4, "name": "Action", "slug": "action", "games_count": 10}]
        }"#;
        let game: Game = serde_json::from_str(json).expect("deserialize");
        assert_eq!(game.id, 42);
        assert!(game.platforms.is_empty());
        assert!(game.developers.is_empty());
        assert!(game.has_genre(4));
        assert_eq!(game.release_year(), None);
        assert_eq!(game.description_text(), "");
    }

    #[test]
    fn test_page_envelope() {
        let json = r#"{"count": 2, "next": "https://api.example/games?page=2", "previous": null,
            "results": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]}"#;
        let page: GamePage = serde_json::from_str(json).expect("deserialize");
        assert_eq!(page.count, 2);
        assert!(page.has_more());
        assert_eq!(page.results.len(), 2);

        let complete = GamePage::complete(page.results);
        assert_eq!(complete.count, 2);
        assert!(!complete.has_more());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("newest".parse::<SortOrder>().ok(), Some(SortOrder::Newest));
        assert_eq!("-name".parse::<SortOrder>().ok(), Some(SortOrder::NameDesc));
        assert!("sideways".parse::<SortOrder>().is_err());
        for order in SortOrder::ALL {
            assert_eq!(order.as_param().parse::<SortOrder>().ok(), Some(order));
        }
    }

    #[test]
    fn test_active_filter_count() {
        let mut filter = FilterState::default();
        assert!(filter.is_default());
        filter.genre = Some(4);
        filter.ordering = SortOrder::Oldest;
        assert_eq!(filter.active_filter_count(), 2);
    }

    #[test]
    fn test_profile_sets_ignore_duplicates() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut profile = UserProfile::new(&user(), None, created);
        assert_eq!(profile.display_name, "Anonymous");

        assert!(profile.insert(ProfileField::Favorites, 3328));
        assert!(!profile.insert(ProfileField::Favorites, 3328));
        assert_eq!(profile.favorites.len(), 1);

        assert!(!profile.remove(ProfileField::Favorites, 4200));
        assert_eq!(profile.favorites.len(), 1);
        assert!(profile.remove(ProfileField::Favorites, 3328));
        assert!(!profile.is_favorite(3328));
    }

    #[test]
    fn test_profile_document_field_names() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut profile = UserProfile::new(&user(), Some("Ann"), created);
        profile.photo_url = Some("https://img.example/ann.png".to_string());
        profile.insert(ProfileField::GameHistory, 7);

        let value = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(value["displayName"], "Ann");
        assert_eq!(value["photoURL"], "https://img.example/ann.png");
        assert_eq!(value["gameHistory"], serde_json::json!([7]));
    }

    #[test]
    fn test_profile_update_paths() {
        let update = ProfileUpdate {
            display_name: Some("Bea".to_string()),
            favorites: Some(BTreeSet::from([1, 2])),
            ..Default::default()
        };
        assert_eq!(update.field_paths(), vec!["displayName", "favorites"]);

        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut profile = UserProfile::new(&user(), Some("Ann"), created);
        update.apply(&mut profile);
        assert_eq!(profile.display_name, "Bea");
        assert_eq!(profile.favorites.len(), 2);
        assert!(ProfileUpdate::default().is_empty());
    }
}
