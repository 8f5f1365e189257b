//! Client-side navigation table

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScoutError};
use crate::models::GameId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// `/search?q=...`; a blank query is the empty search page
    Search { query: Option<String> },
    Browse,
    Favorites,
    Login,
    Register,
    GameDetail(GameId),
}

impl Route {
    pub fn search(query: &str) -> Self {
        let query = query.trim();
        Route::Search {
            query: (!query.is_empty()).then(|| query.to_string()),
        }
    }

    /// Pages only reachable with a signed-in session
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Favorites)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Search { query: Some(q) } => format!("/search?q={}", urlencoding::encode(q)),
            Route::Search { query: None } => "/search".to_string(),
            Route::Browse => "/browse".to_string(),
            Route::Favorites => "/favorites".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::GameDetail(id) => format!("/game/{}", id),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let (path, query) = match input.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (input, None),
        };
        let path = path.trim_end_matches('/');

        let route = match path {
            "" => Route::Home,
            "/search" => {
                let q = query.and_then(|params| query_param(params, "q")).transpose()?;
                Route::search(q.as_deref().unwrap_or_default())
            }
            "/browse" => Route::Browse,
            "/favorites" => Route::Favorites,
            "/login" => Route::Login,
            "/register" => Route::Register,
            _ => {
                let id = path
                    .strip_prefix("/game/")
                    .ok_or_else(|| ScoutError::InvalidRoute(input.to_string()))?;
                let id = id
                    .parse()
                    .map_err(|_| ScoutError::InvalidRoute(format!("bad game id in {}", input)))?;
                Route::GameDetail(id)
            }
        };
        Ok(route)
    }
}

fn query_param(params: &str, name: &str) -> Option<Result<String>> {
    params
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .map(|decoded| decoded.into_owned())
                .map_err(|e| ScoutError::InvalidRoute(format!("bad query string: {}", e)))
        })
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        Route::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_routes() {
        assert_eq!(Route::parse("/").ok(), Some(Route::Home));
        assert_eq!(Route::parse("/browse/").ok(), Some(Route::Browse));
        assert_eq!(Route::parse("/favorites").ok(), Some(Route::Favorites));
        assert_eq!(Route::parse("/game/3328").ok(), Some(Route::GameDetail(3328)));
        assert!(Route::parse("/game/abc").is_err());
        assert!(Route::parse("/nowhere").is_err());
    }

    #[test]
    fn test_search_query_is_encoded() {
        let route = Route::search("  the witcher & co ");
        assert_eq!(route.path(), "/search?q=the%20witcher%20%26%20co");
        assert_eq!(Route::parse(&route.path()).ok(), Some(route));
        assert_eq!(
            Route::parse("/search?q=portal+2").ok(),
            Some(Route::search("portal 2"))
        );
        assert_eq!(Route::parse("/search").ok(), Some(Route::Search { query: None }));
        assert_eq!(Route::parse("/search?q=%20").ok(), Some(Route::Search { query: None }));
    }

    #[test]
    fn test_requires_auth() {
        assert!(Route::Favorites.requires_auth());
        assert!(!Route::GameDetail(1).requires_auth());
    }
}
