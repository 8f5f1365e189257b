//! Fetch state machines behind each page: popular lists, search, details,
//! genres, favorites and the filtered browse list.
//!
//! Every feed publishes its state through a watch channel and tags each
//! request with a sequence number; a response that is no longer the latest
//! is dropped instead of overwriting newer results.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use gamescout_core::{FilterState, Game, GameId, GamePage, Genre, GenreId, Screenshot, SortOrder};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogError};
use crate::session::SessionContext;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

const LIST_FAILURE: &str = "Failed to load games. Please try again.";
const SEARCH_FAILURE: &str = "Failed to search games";
const DETAILS_FAILURE: &str = "Failed to fetch game details";
const GENRES_FAILURE: &str = "Failed to fetch genres";
const FAVORITES_FAILURE: &str = "Failed to load favorite games. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Paged game list
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub games: Vec<Game>,
    pub status: FetchStatus,
    pub has_more: bool,
    /// Last page merged into `games`; 0 before the first
    pub page: u32,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            status: FetchStatus::Idle,
            has_more: true,
            page: 0,
        }
    }
}

impl ListState {
    /// Page 1 replaces the list, later pages append without de-duplication
    pub fn merge_page(&mut self, page: u32, result: GamePage) {
        self.has_more = result.has_more();
        if page <= 1 {
            self.games = result.results;
        } else {
            self.games.extend(result.results);
        }
        self.page = page.max(1);
    }
}

/// Monotonic request numbers; only the most recent one may publish
#[derive(Debug, Default)]
pub struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, request: u64) -> bool {
        self.0.load(Ordering::SeqCst) == request
    }
}

/// Shared plumbing of the list feeds
#[derive(Clone)]
struct ListDriver {
    state: Arc<watch::Sender<ListState>>,
    sequence: Arc<RequestSequence>,
}

impl Default for ListDriver {
    fn default() -> Self {
        Self {
            state: Arc::new(watch::channel(ListState::default()).0),
            sequence: Arc::default(),
        }
    }
}

impl ListDriver {
    fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    fn snapshot(&self) -> ListState {
        self.state.borrow().clone()
    }

    fn start(&self, request: u64) {
        if self.sequence.is_current(request) {
            self.state.send_modify(|state| state.status = FetchStatus::Loading);
        }
    }

    fn finish(
        &self,
        request: u64,
        page: u32,
        result: Result<GamePage, CatalogError>,
        failure: &str,
    ) {
        if !self.sequence.is_current(request) {
            debug!(request, page, "discarding stale response");
            return;
        }
        match result {
            Ok(games) => self.state.send_modify(|state| {
                state.merge_page(page, games);
                state.status = FetchStatus::Success;
            }),
            Err(err) => {
                warn!(error = %err, page, "{}", failure);
                self.state
                    .send_modify(|state| state.status = FetchStatus::Error(failure.to_string()));
            }
        }
    }

    /// Empty the list and invalidate requests in flight
    fn reset(&self, has_more: bool) {
        self.sequence.next();
        self.state.send_replace(ListState {
            has_more,
            ..Default::default()
        });
    }
}

/// Catalog listings a [`GameFeed`] can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSource {
    Popular,
    Genre(GenreId),
    Year(i32),
    Upcoming,
    BestOfYear(i32),
}

impl GameSource {
    pub fn failure_message(&self) -> &'static str {
        match self {
            GameSource::Popular => "Failed to fetch popular games",
            GameSource::Genre(_) => "Failed to fetch games by genre",
            _ => LIST_FAILURE,
        }
    }

    async fn fetch(&self, catalog: &CatalogClient, page: u32) -> Result<GamePage, CatalogError> {
        match *self {
            GameSource::Popular => catalog.popular_games(page).await,
            GameSource::Genre(genre) => catalog.games_by_genre(genre, page).await,
            GameSource::Year(year) => catalog.games_by_year(year, page).await,
            GameSource::Upcoming => catalog.upcoming_games(page).await,
            GameSource::BestOfYear(year) => catalog.best_games_of_year(year, page).await,
        }
    }
}

/// Paged list for one [`GameSource`]
#[derive(Clone)]
pub struct GameFeed {
    catalog: CatalogClient,
    source: GameSource,
    list: ListDriver,
}

impl GameFeed {
    pub fn new(catalog: CatalogClient, source: GameSource) -> Self {
        Self {
            catalog,
            source,
            list: ListDriver::default(),
        }
    }

    pub fn source(&self) -> GameSource {
        self.source
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.list.subscribe()
    }

    pub fn snapshot(&self) -> ListState {
        self.list.snapshot()
    }

    pub async fn load(&self, page: u32) {
        let request = self.list.sequence.next();
        self.list.start(request);
        let result = self.source.fetch(&self.catalog, page).await;
        self.list
            .finish(request, page, result, self.source.failure_message());
    }

    /// Fetch the page after the last one loaded, if the catalog has more
    pub async fn load_more(&self) {
        let state = self.snapshot();
        if state.has_more && !state.status.is_loading() {
            self.load(state.page + 1).await;
        }
    }
}

/// Debounced title search
#[derive(Clone)]
pub struct SearchFeed {
    catalog: CatalogClient,
    debounce: Duration,
    list: ListDriver,
}

impl SearchFeed {
    pub fn new(catalog: CatalogClient, debounce: Duration) -> Self {
        Self {
            catalog,
            debounce,
            list: ListDriver::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.list.subscribe()
    }

    pub fn snapshot(&self) -> ListState {
        self.list.snapshot()
    }

    /// Wait out the debounce delay, then search unless a newer call came in.
    /// A blank query clears the results without a request.
    pub async fn search(&self, query: &str, page: u32) {
        if query.trim().is_empty() {
            self.list.reset(false);
            return;
        }

        let request = self.list.sequence.next();
        tokio::time::sleep(self.debounce).await;
        if !self.list.sequence.is_current(request) {
            debug!(query, "search superseded during debounce");
            return;
        }

        self.list.start(request);
        let result = self.catalog.search_games(query, page).await;
        self.list.finish(request, page, result, SEARCH_FAILURE);
    }

    /// Run [`SearchFeed::search`] in the background, as a keystroke handler would
    pub fn spawn_search(&self, query: impl Into<String>, page: u32) -> JoinHandle<()> {
        let feed = self.clone();
        let query = query.into();
        tokio::spawn(async move { feed.search(&query, page).await })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub game: Option<Game>,
    pub screenshots: Vec<Screenshot>,
    pub status: FetchStatus,
}

/// One game's details and screenshots
#[derive(Clone)]
pub struct GameDetailsFeed {
    catalog: CatalogClient,
    state: Arc<watch::Sender<DetailState>>,
    sequence: Arc<RequestSequence>,
}

impl GameDetailsFeed {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            state: Arc::new(watch::channel(DetailState::default()).0),
            sequence: Arc::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Load `id`, or reset to empty for `None`.
    ///
    /// A screenshot failure is logged and leaves the gallery empty.
    pub async fn load(&self, id: Option<GameId>) {
        let request = self.sequence.next();
        let Some(id) = id else {
            self.state.send_replace(DetailState::default());
            return;
        };

        self.state
            .send_modify(|state| state.status = FetchStatus::Loading);
        let (details, screenshots) = tokio::join!(
            self.catalog.game_details(id),
            self.catalog.game_screenshots(id)
        );
        if !self.sequence.is_current(request) {
            debug!(game_id = id, "discarding stale details");
            return;
        }

        let screenshots = match screenshots {
            Ok(page) => page.results,
            Err(err) => {
                warn!(game_id = id, error = %err, "failed to fetch screenshots");
                Vec::new()
            }
        };
        match details {
            Ok(game) => {
                self.state.send_replace(DetailState {
                    game: Some(game),
                    screenshots,
                    status: FetchStatus::Success,
                });
            }
            Err(err) => {
                warn!(game_id = id, error = %err, "{}", DETAILS_FAILURE);
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Error(DETAILS_FAILURE.to_string())
                });
            }
        }
    }

    /// Load `id` and, once shown, record it in the signed-in user's history
    pub async fn load_and_record(&self, id: GameId, session: &SessionContext) {
        self.load(Some(id)).await;
        let shown = self
            .state
            .borrow()
            .game
            .as_ref()
            .is_some_and(|game| game.id == id);
        if shown {
            if let Err(err) = session.add_to_game_history(id).await {
                warn!(game_id = id, error = %err, "failed to record game view");
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenresState {
    pub genres: Vec<Genre>,
    pub status: FetchStatus,
}

#[derive(Clone)]
pub struct GenresFeed {
    catalog: CatalogClient,
    state: Arc<watch::Sender<GenresState>>,
    sequence: Arc<RequestSequence>,
}

impl GenresFeed {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            state: Arc::new(watch::channel(GenresState::default()).0),
            sequence: Arc::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GenresState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> GenresState {
        self.state.borrow().clone()
    }

    pub async fn load(&self) {
        let request = self.sequence.next();
        self.state
            .send_modify(|state| state.status = FetchStatus::Loading);
        let result = self.catalog.genres().await;
        if !self.sequence.is_current(request) {
            debug!("discarding stale genres");
            return;
        }
        match result {
            Ok(page) => {
                self.state.send_replace(GenresState {
                    genres: page.results,
                    status: FetchStatus::Success,
                });
            }
            Err(err) => {
                warn!(error = %err, "{}", GENRES_FAILURE);
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Error(GENRES_FAILURE.to_string())
                });
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesState {
    pub games: Vec<Game>,
    pub status: FetchStatus,
}

/// Details of every favorite game, fetched concurrently
#[derive(Clone)]
pub struct FavoritesFeed {
    catalog: CatalogClient,
    state: Arc<watch::Sender<FavoritesState>>,
    sequence: Arc<RequestSequence>,
}

impl FavoritesFeed {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            state: Arc::new(watch::channel(FavoritesState::default()).0),
            sequence: Arc::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FavoritesState {
        self.state.borrow().clone()
    }

    /// Any single failure fails the whole load
    pub async fn load(&self, ids: &BTreeSet<GameId>) {
        let request = self.sequence.next();
        self.state
            .send_modify(|state| state.status = FetchStatus::Loading);

        let result = try_join_all(ids.iter().map(|id| self.catalog.game_details(*id))).await;
        if !self.sequence.is_current(request) {
            return;
        }
        match result {
            Ok(games) => {
                self.state.send_replace(FavoritesState {
                    games,
                    status: FetchStatus::Success,
                });
            }
            Err(err) => {
                warn!(error = %err, "error loading favorite games");
                self.state.send_modify(|state| {
                    state.status = FetchStatus::Error(FAVORITES_FAILURE.to_string())
                });
            }
        }
    }

    /// Load the favorites of the signed-in user; empty when signed out
    pub async fn load_for(&self, session: &SessionContext) {
        let ids = session
            .user_profile()
            .map(|profile| profile.favorites)
            .unwrap_or_default();
        self.load(&ids).await;
    }
}

/// Browse page listing driven by a [`FilterState`]
#[derive(Clone)]
pub struct BrowseFeed {
    catalog: CatalogClient,
    filter: Arc<watch::Sender<FilterState>>,
    list: ListDriver,
}

impl BrowseFeed {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            filter: Arc::new(watch::channel(FilterState::default()).0),
            list: ListDriver::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.list.subscribe()
    }

    pub fn snapshot(&self) -> ListState {
        self.list.snapshot()
    }

    pub fn filter(&self) -> FilterState {
        *self.filter.borrow()
    }

    /// Replace the filter, clear the list and load page 1
    pub async fn set_filter(&self, filter: FilterState) {
        self.filter.send_replace(filter);
        self.list.reset(true);
        self.load(1).await;
    }

    pub async fn set_genre(&self, genre: Option<GenreId>) {
        self.set_filter(FilterState { genre, ..self.filter() }).await;
    }

    pub async fn set_year(&self, year: Option<i32>) {
        self.set_filter(FilterState { year, ..self.filter() }).await;
    }

    pub async fn set_ordering(&self, ordering: SortOrder) {
        self.set_filter(FilterState { ordering, ..self.filter() }).await;
    }

    pub async fn clear_filters(&self) {
        self.set_filter(FilterState::default()).await;
    }

    pub async fn load(&self, page: u32) {
        let filter = self.filter();
        let request = self.list.sequence.next();
        self.list.start(request);
        let result = self.catalog.browse(&filter, page).await;
        self.list.finish(request, page, result, LIST_FAILURE);
    }

    pub async fn load_more(&self) {
        let state = self.snapshot();
        if state.has_more && !state.status.is_loading() {
            self.load(state.page + 1).await;
        }
    }
}
