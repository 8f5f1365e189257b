//! RAWG catalog client with mock-data fallback

use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, NaiveDate, Utc};
use gamescout_core::{
    FilterState, GameId, GamePage, Game, GenreId, GenrePage, MockCatalog, ScreenshotPage,
    SortOrder,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::config::CatalogConfig;

pub const RAWG_BASE_URL: &str = "https://api.rawg.io/api";

const POPULAR_ORDERING: &str = "-rating,-metacritic";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("Game not found")]
    NotFound(GameId),
}

/// Catalog operations, as far as the fallback policy is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOperation {
    Popular,
    Search,
    Details,
    Screenshots,
    ByGenre,
    ByYear,
    Genres,
    Upcoming,
    BestOfYear,
}

impl CatalogOperation {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogOperation::Popular => "popular games",
            CatalogOperation::Search => "search",
            CatalogOperation::Details => "game details",
            CatalogOperation::Screenshots => "screenshots",
            CatalogOperation::ByGenre => "games by genre",
            CatalogOperation::ByYear => "games by year",
            CatalogOperation::Genres => "genres",
            CatalogOperation::Upcoming => "upcoming games",
            CatalogOperation::BestOfYear => "best games of the year",
        }
    }
}

/// Which operations answer from the mock catalog when a request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Popular list, search and game details only
    #[default]
    Core,
    /// Every read operation
    All,
    /// Never; failures always reach the caller
    Off,
}

impl FallbackPolicy {
    pub fn covers(&self, operation: CatalogOperation) -> bool {
        match self {
            FallbackPolicy::Core => matches!(
                operation,
                CatalogOperation::Popular | CatalogOperation::Search | CatalogOperation::Details
            ),
            FallbackPolicy::All => true,
            FallbackPolicy::Off => false,
        }
    }
}

/// `dates` window covering one calendar year
pub fn year_range(year: i32) -> String {
    format!("{year}-01-01,{year}-12-31")
}

/// `dates` window from `today` to the same day next year
pub fn upcoming_range(today: NaiveDate) -> String {
    let next_year = today.checked_add_months(Months::new(12)).unwrap_or(today);
    format!("{},{}", today.format("%Y-%m-%d"), next_year.format("%Y-%m-%d"))
}

/// Query parameters of the `/games` list endpoint
#[derive(Debug, Default)]
struct GameQuery {
    search: Option<String>,
    genre: Option<GenreId>,
    dates: Option<String>,
    ordering: Option<String>,
}

impl GameQuery {
    fn params(&self, page: u32, page_size: u32) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(genre) = self.genre {
            params.push(("genres", genre.to_string()));
        }
        if let Some(dates) = &self.dates {
            params.push(("dates", dates.clone()));
        }
        if let Some(ordering) = &self.ordering {
            params.push(("ordering", ordering.clone()));
        }
        params.push(("page", page.max(1).to_string()));
        params.push(("page_size", page_size.to_string()));
        params
    }
}

/// Client for the RAWG REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    fallback: FallbackPolicy,
    mock: MockCatalog,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        let api_key = Some(config.api_key.trim().to_string()).filter(|key| !key.is_empty());

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key,
                page_size: config.page_size.max(1),
                fallback: config.fallback,
                mock: MockCatalog::new(),
            }),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.inner.fallback
    }

    /// Best rated games first
    #[instrument(skip(self))]
    pub async fn popular_games(&self, page: u32) -> Result<GamePage, CatalogError> {
        let query = GameQuery {
            ordering: Some(POPULAR_ORDERING.to_string()),
            ..Default::default()
        };
        let result = self.list_games(&query, page).await;
        self.recover(CatalogOperation::Popular, result, |mock| Ok(mock.popular()))
    }

    #[instrument(skip(self))]
    pub async fn search_games(&self, query: &str, page: u32) -> Result<GamePage, CatalogError> {
        let params = GameQuery {
            search: Some(query.to_string()),
            ..Default::default()
        };
        let result = self.list_games(&params, page).await;
        self.recover(CatalogOperation::Search, result, |mock| Ok(mock.search(query)))
    }

    #[instrument(skip(self))]
    pub async fn game_details(&self, id: GameId) -> Result<Game, CatalogError> {
        let result = self.get_json(&format!("/games/{}", id), Vec::new()).await;
        self.recover(CatalogOperation::Details, result, |mock| {
            mock.find(id).ok_or(CatalogError::NotFound(id))
        })
    }

    #[instrument(skip(self))]
    pub async fn game_screenshots(&self, id: GameId) -> Result<ScreenshotPage, CatalogError> {
        let result = self
            .get_json(&format!("/games/{}/screenshots", id), Vec::new())
            .await;
        self.recover(CatalogOperation::Screenshots, result, |mock| {
            Ok(mock.screenshots(id))
        })
    }

    #[instrument(skip(self))]
    pub async fn games_by_genre(&self, genre: GenreId, page: u32) -> Result<GamePage, CatalogError> {
        self.filtered_games(&FilterState { genre: Some(genre), ..Default::default() }, None, page)
            .await
    }

    #[instrument(skip(self))]
    pub async fn games_by_year(&self, year: i32, page: u32) -> Result<GamePage, CatalogError> {
        self.filtered_games(&FilterState { year: Some(year), ..Default::default() }, None, page)
            .await
    }

    #[instrument(skip(self))]
    pub async fn genres(&self) -> Result<GenrePage, CatalogError> {
        let result = self.get_json("/genres", Vec::new()).await;
        self.recover(CatalogOperation::Genres, result, |mock| {
            Ok(GenrePage::complete(mock.genres()))
        })
    }

    /// Games releasing within the next year, soonest first
    #[instrument(skip(self))]
    pub async fn upcoming_games(&self, page: u32) -> Result<GamePage, CatalogError> {
        let query = GameQuery {
            dates: Some(upcoming_range(Utc::now().date_naive())),
            ordering: Some(SortOrder::Oldest.as_param().to_string()),
            ..Default::default()
        };
        let result = self.list_games(&query, page).await;
        self.recover(CatalogOperation::Upcoming, result, |mock| Ok(mock.upcoming()))
    }

    #[instrument(skip(self))]
    pub async fn best_games_of_year(&self, year: i32, page: u32) -> Result<GamePage, CatalogError> {
        let query = GameQuery {
            dates: Some(year_range(year)),
            ordering: Some(SortOrder::HighestRated.as_param().to_string()),
            ..Default::default()
        };
        let result = self.list_games(&query, page).await;
        self.recover(CatalogOperation::BestOfYear, result, |mock| {
            Ok(mock.best_of_year(year))
        })
    }

    /// Browse-page listing: a genre filter wins over a year filter, and
    /// with neither the popular list is shown. A non-default sort key is
    /// sent as `ordering`.
    #[instrument(skip(self))]
    pub async fn browse(&self, filter: &FilterState, page: u32) -> Result<GamePage, CatalogError> {
        let ordering = (filter.ordering != SortOrder::default()).then_some(filter.ordering);
        if filter.genre.is_none() && filter.year.is_none() {
            return match ordering {
                None => self.popular_games(page).await,
                Some(order) => {
                    let query = GameQuery {
                        ordering: Some(order.as_param().to_string()),
                        ..Default::default()
                    };
                    let result = self.list_games(&query, page).await;
                    self.recover(CatalogOperation::Popular, result, |mock| {
                        let mut page = mock.popular();
                        order.sort_games(&mut page.results);
                        Ok(page)
                    })
                }
            };
        }
        self.filtered_games(filter, ordering, page).await
    }

    async fn filtered_games(
        &self,
        filter: &FilterState,
        ordering: Option<SortOrder>,
        page: u32,
    ) -> Result<GamePage, CatalogError> {
        let mut query = GameQuery {
            ordering: ordering.map(|order| order.as_param().to_string()),
            ..Default::default()
        };
        let operation = match (filter.genre, filter.year) {
            (Some(genre), _) => {
                query.genre = Some(genre);
                CatalogOperation::ByGenre
            }
            (None, Some(year)) => {
                query.dates = Some(year_range(year));
                CatalogOperation::ByYear
            }
            (None, None) => CatalogOperation::Popular,
        };
        let result = self.list_games(&query, page).await;
        self.recover(operation, result, |mock| {
            let mut page = match (filter.genre, filter.year) {
                (Some(genre), _) => mock.by_genre(genre),
                (None, Some(year)) => mock.by_year(year),
                (None, None) => mock.popular(),
            };
            if let Some(order) = ordering {
                order.sort_games(&mut page.results);
            }
            Ok(page)
        })
    }

    async fn list_games(&self, query: &GameQuery, page: u32) -> Result<GamePage, CatalogError> {
        self.get_json("/games", query.params(page, self.inner.page_size))
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T, CatalogError> {
        if let Some(key) = &self.inner.api_key {
            params.push(("key", key.clone()));
        }
        let url = format!("{}{}", self.inner.base_url, path);

        let response = self.inner.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| CatalogError::Parse(format!("Failed to parse {}: {}", path, e)))
    }

    fn recover<T>(
        &self,
        operation: CatalogOperation,
        result: Result<T, CatalogError>,
        fallback: impl FnOnce(&MockCatalog) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if self.inner.fallback.covers(operation) => {
                warn!(
                    operation = operation.label(),
                    error = %err,
                    "catalog request failed, using mock data"
                );
                fallback(&self.inner.mock)
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl CatalogError {
    /// Human-readable reason, using the catalog's `detail`/`error` field when present
    pub fn reason(&self) -> String {
        match self {
            CatalogError::Status { status, body } => serde_json::from_str::<ApiMessage>(body)
                .ok()
                .and_then(|msg| msg.detail.or(msg.error))
                .unwrap_or_else(|| format!("HTTP {}", status)),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dead_endpoint, serve};
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    fn client(base_url: String, api_key: &str, fallback: FallbackPolicy) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url,
            api_key: api_key.to_string(),
            timeout_secs: 2,
            fallback,
            ..Default::default()
        })
        .expect("client")
    }

    async fn catalog_server(captured: Captured) -> String {
        async fn games(
            State(captured): State<Captured>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<serde_json::Value> {
            captured.lock().unwrap().push(params);
            Json(json!({
                "count": 41,
                "next": "http://next/page",
                "previous": null,
                "results": [{"id": 7, "name": "Live Game", "rating": 4.2, "platforms": null}]
            }))
        }

        async fn details(Path(id): Path<u64>) -> Result<Json<serde_json::Value>, StatusCode> {
            if id == 7 {
                Ok(Json(json!({"id": 7, "name": "Live Game", "website": "https://live.example"})))
            } else {
                Err(StatusCode::NOT_FOUND)
            }
        }

        let router = Router::new()
            .route("/games", get(games))
            .route("/games/{id}", get(details))
            .with_state(captured);
        serve(router).await
    }

    #[test]
    fn test_date_windows() {
        assert_eq!(year_range(2015), "2015-01-01,2015-12-31");
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(upcoming_range(today), "2024-02-29,2025-02-28");
    }

    #[test]
    fn test_fallback_policy_coverage() {
        assert!(FallbackPolicy::Core.covers(CatalogOperation::Search));
        assert!(!FallbackPolicy::Core.covers(CatalogOperation::ByGenre));
        assert!(FallbackPolicy::All.covers(CatalogOperation::Genres));
        assert!(!FallbackPolicy::Off.covers(CatalogOperation::Details));
    }

    #[test]
    fn test_status_reason_uses_detail() {
        let err = CatalogError::Status {
            status: 401,
            body: r#"{"error": "The key parameter is not provided"}"#.to_string(),
        };
        assert_eq!(err.reason(), "The key parameter is not provided");
        let err = CatalogError::Status {
            status: 502,
            body: "<html>".to_string(),
        };
        assert_eq!(err.reason(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_live_list_sends_key_and_paging() {
        let captured: Captured = Arc::default();
        let base = catalog_server(captured.clone()).await;
        let catalog = client(base, "secret", FallbackPolicy::Core);

        let page = catalog.popular_games(2).await.expect("popular");
        assert_eq!(page.count, 41);
        assert!(page.has_more());
        assert_eq!(page.results[0].name, "Live Game");

        catalog.games_by_year(2015, 1).await.expect("by year");

        let calls = captured.lock().unwrap().clone();
        assert_eq!(calls[0]["key"], "secret");
        assert_eq!(calls[0]["ordering"], "-rating,-metacritic");
        assert_eq!(calls[0]["page"], "2");
        assert_eq!(calls[0]["page_size"], "20");
        assert_eq!(calls[1]["dates"], "2015-01-01,2015-12-31");
        assert!(!calls[1].contains_key("ordering"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_sent() {
        let captured: Captured = Arc::default();
        let base = catalog_server(captured.clone()).await;
        let catalog = client(base, "  ", FallbackPolicy::Core);

        catalog.search_games("portal", 1).await.expect("search");
        let calls = captured.lock().unwrap().clone();
        assert_eq!(calls[0]["search"], "portal");
        assert!(!calls[0].contains_key("key"));
    }

    #[tokio::test]
    async fn test_browse_dispatch_and_ordering() {
        let captured: Captured = Arc::default();
        let base = catalog_server(captured.clone()).await;
        let catalog = client(base, "", FallbackPolicy::Core);

        let filter = FilterState {
            genre: Some(4),
            year: Some(2013),
            ordering: SortOrder::NameAsc,
        };
        catalog.browse(&filter, 1).await.expect("browse genre");
        catalog
            .browse(&FilterState { ordering: SortOrder::Newest, ..Default::default() }, 1)
            .await
            .expect("browse sorted");

        let calls = captured.lock().unwrap().clone();
        assert_eq!(calls[0]["genres"], "4");
        assert!(!calls[0].contains_key("dates"));
        assert_eq!(calls[0]["ordering"], "name");
        assert_eq!(calls[1]["ordering"], "-released");
    }

    #[tokio::test]
    async fn test_live_details_and_server_miss_falls_back() {
        let captured: Captured = Arc::default();
        let base = catalog_server(captured).await;
        let catalog = client(base, "", FallbackPolicy::Core);

        let live = catalog.game_details(7).await.expect("live details");
        assert_eq!(live.website.as_deref(), Some("https://live.example"));

        // 404 from the catalog, but the id exists in the mock fixture
        let mock = catalog.game_details(4200).await.expect("mock details");
        assert_eq!(mock.name, "Portal 2");
    }

    #[tokio::test]
    async fn test_search_offline_matches_titles_only() {
        let catalog = client(dead_endpoint().await, "", FallbackPolicy::Core);
        let page = catalog.search_games("witcher", 1).await.expect("search");
        let ids: Vec<_> = page.results.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![3328]);
        assert_eq!(page.results[0].name, "The Witcher 3: Wild Hunt");

        let page = catalog.search_games("Portal", 1).await.expect("search");
        assert!(page.results.iter().all(|g| g.name.to_lowercase().contains("portal")));
        assert_eq!(page.count, 2);
    }

    #[tokio::test]
    async fn test_details_offline() {
        let catalog = client(dead_endpoint().await, "", FallbackPolicy::Core);
        let game = catalog.game_details(3328).await.expect("details");
        assert_eq!(game, MockCatalog::new().find(3328).unwrap());

        let err = catalog.game_details(999_999).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(999_999)));
        assert_eq!(err.to_string(), "Game not found");
    }

    #[tokio::test]
    async fn test_uncovered_operations_propagate() {
        let catalog = client(dead_endpoint().await, "", FallbackPolicy::Core);
        assert!(catalog.popular_games(1).await.is_ok());
        assert!(matches!(
            catalog.games_by_genre(4, 1).await,
            Err(CatalogError::Http(_))
        ));
        assert!(catalog.game_screenshots(3328).await.is_err());
        assert!(catalog.genres().await.is_err());
        assert!(catalog.upcoming_games(1).await.is_err());
        assert!(catalog.best_games_of_year(2013, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_uniform_and_disabled_policies() {
        let all = client(dead_endpoint().await, "", FallbackPolicy::All);
        assert_eq!(all.games_by_genre(2, 1).await.expect("genre").count, 3);
        assert_eq!(all.genres().await.expect("genres").count, 3);
        assert_eq!(all.game_screenshots(3328).await.expect("shots").count, 1);
        assert!(all.upcoming_games(1).await.expect("upcoming").results.is_empty());

        let off = client(dead_endpoint().await, "", FallbackPolicy::Off);
        assert!(off.popular_games(1).await.is_err());
        assert!(matches!(off.game_details(3328).await, Err(CatalogError::Http(_))));
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out() {
        async fn stall() -> Json<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"count": 1, "next": null, "previous": null,
                "results": [{"id": 7, "name": "Live Game"}]}))
        }

        let base = serve(
            Router::new()
                .route("/games", get(stall))
                .route("/genres", get(stall)),
        )
        .await;
        let catalog = CatalogClient::new(&CatalogConfig {
            base_url: base,
            timeout_secs: 1,
            fallback: FallbackPolicy::Core,
            ..Default::default()
        })
        .expect("client");

        let started = std::time::Instant::now();
        let page = catalog.popular_games(1).await.expect("fallback");
        assert!(!page.results.is_empty());
        assert!(page.results.iter().all(|game| game.id != 7));

        match catalog.genres().await {
            Err(CatalogError::Http(err)) => assert!(err.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other.map(|p| p.count)),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
