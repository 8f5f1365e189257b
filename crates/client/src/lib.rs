//! GameScout client: RAWG catalog access, Firebase-backed accounts and
//! profiles, the session context and the per-page data feeds.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod feeds;
pub mod firebase;
pub mod memory;
pub mod session;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use catalog::{CatalogClient, CatalogError, FallbackPolicy};
pub use config::Config;
pub use feeds::{
    BrowseFeed, DetailState, FavoritesFeed, FetchStatus, GameDetailsFeed, GameFeed, GameSource,
    GenresFeed, ListState, SearchFeed,
};
pub use memory::{MemoryIdentity, MemoryProfiles};
pub use session::{SessionContext, SessionSnapshot};
