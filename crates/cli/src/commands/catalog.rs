//! Catalog commands: lists, search, details, genres and routes.

use std::time::Duration;

use chrono::Datelike;
use gamescout_client::feeds::ListState;
use gamescout_client::{
    BrowseFeed, CatalogClient, Config, FetchStatus, GameDetailsFeed, GameFeed, GameSource,
    GenresFeed, SearchFeed,
};
use gamescout_core::{FilterState, GameId, GenreId, Route, SortOrder};

use crate::output::{self, CliResult};

fn client(config: &Config) -> Result<CatalogClient, Box<dyn std::error::Error>> {
    Ok(CatalogClient::new(&config.catalog)?)
}

/// Turn a feed's error state into a command failure
fn check(status: &FetchStatus) -> CliResult {
    match status.error() {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn print_list(state: &ListState, json: bool) -> CliResult {
    check(&state.status)?;
    output::print_games(&state.games, json)?;
    if !json && state.has_more {
        println!("(more on page {})", state.page + 1);
    }
    Ok(())
}

async fn list(config: &Config, source: GameSource, page: u32, json: bool) -> CliResult {
    let feed = GameFeed::new(client(config)?, source);
    feed.load(page).await;
    print_list(&feed.snapshot(), json)
}

pub async fn popular(config: &Config, page: u32, json: bool) -> CliResult {
    list(config, GameSource::Popular, page, json).await
}

pub async fn upcoming(config: &Config, page: u32, json: bool) -> CliResult {
    list(config, GameSource::Upcoming, page, json).await
}

pub async fn best(config: &Config, year: Option<i32>, page: u32, json: bool) -> CliResult {
    let year = year.unwrap_or_else(|| chrono::Utc::now().year());
    list(config, GameSource::BestOfYear(year), page, json).await
}

pub async fn search(config: &Config, query: &str, page: u32, json: bool) -> CliResult {
    // One query per run, nothing to debounce
    let feed = SearchFeed::new(client(config)?, Duration::ZERO);
    feed.search(query, page).await;
    print_list(&feed.snapshot(), json)
}

pub async fn game(config: &Config, id: GameId, json: bool) -> CliResult {
    let feed = GameDetailsFeed::new(client(config)?);
    feed.load(Some(id)).await;
    let state = feed.snapshot();
    check(&state.status)?;
    match &state.game {
        Some(game) => output::print_game(game, &state.screenshots, json),
        None => Err(format!("Game {} not found", id).into()),
    }
}

pub async fn screenshots(config: &Config, id: GameId, json: bool) -> CliResult {
    let page = client(config)?.game_screenshots(id).await?;
    if json {
        return output::print_json(&page.results);
    }
    output::print_screenshots(&page.results);
    Ok(())
}

pub async fn genres(config: &Config, json: bool) -> CliResult {
    let feed = GenresFeed::new(client(config)?);
    feed.load().await;
    let state = feed.snapshot();
    check(&state.status)?;
    output::print_genres(&state.genres, json)
}

pub async fn browse(
    config: &Config,
    genre: Option<GenreId>,
    year: Option<i32>,
    sort: &str,
    page: u32,
    json: bool,
) -> CliResult {
    let ordering: SortOrder = sort.parse()?;
    let feed = BrowseFeed::new(client(config)?);
    feed.set_filter(FilterState {
        genre,
        year,
        ordering,
    })
    .await;

    // Pages accumulate the way infinite scroll does
    loop {
        let state = feed.snapshot();
        check(&state.status)?;
        if state.page >= page || !state.has_more {
            break;
        }
        feed.load_more().await;
    }

    if !json {
        let filter = feed.filter();
        println!(
            "Sorted by {} ({} filter(s) active)",
            filter.ordering.label(),
            filter.active_filter_count()
        );
    }
    print_list(&feed.snapshot(), json)
}

pub fn route(path: &str) -> CliResult {
    let route = Route::parse(path)?;
    println!("{:?}", route);
    println!("  path:          {}", route.path());
    println!("  requires auth: {}", route.requires_auth());
    Ok(())
}
