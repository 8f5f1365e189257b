//! Static catalog records served when the live catalog cannot be reached

use std::collections::BTreeMap;

use crate::models::{
    Game, GameId, GamePage, Genre, GenreId, NamedRef, PlatformEntry, Screenshot, ScreenshotPage,
    SortOrder,
};

struct Fixture {
    id: GameId,
    name: &'static str,
    image: &'static str,
    rating: f32,
    rating_top: u8,
    ratings_count: u32,
    released: &'static str,
    metacritic: u32,
    description: &'static str,
    genre: (u64, &'static str, &'static str),
    developer: (u64, &'static str, &'static str),
    publisher: (u64, &'static str, &'static str),
}

const FIXTURES: [Fixture; 6] = [
    Fixture {
        id: 3498,
        name: "Grand Theft Auto V",
        image: "https://media.rawg.io/media/games/20a/20aa03a10cda45239fe22d035c0ebe64.jpg",
        rating: 4.47,
        rating_top: 5,
        ratings_count: 6968,
        released: "2013-09-17",
        metacritic: 96,
        description: "Rockstar Games went bigger, since their previous installment of the series...",
        genre: (4, "Action", "action"),
        developer: (3524, "Rockstar North", "rockstar-north"),
        publisher: (2155, "Rockstar Games", "rockstar-games"),
    },
    Fixture {
        id: 3328,
        name: "The Witcher 3: Wild Hunt",
        image: "https://media.rawg.io/media/games/618/618c2031a07bbff6b4f611f10b6bcdbc.jpg",
        rating: 4.66,
        rating_top: 5,
        ratings_count: 6621,
        released: "2015-05-18",
        metacritic: 93,
        description: "The third game in a series, it holds nothing back from the player...",
        genre: (5, "RPG", "role-playing-games-rpg"),
        developer: (9023, "CD PROJEKT RED", "cd-projekt-red"),
        publisher: (9023, "CD PROJEKT RED", "cd-projekt-red"),
    },
    Fixture {
        id: 4200,
        name: "Portal 2",
        image: "https://media.rawg.io/media/games/2ba/2bac0e87cf45e5b508f227d281c9252a.jpg",
        rating: 4.61,
        rating_top: 5,
        ratings_count: 2971,
        released: "2011-04-18",
        metacritic: 95,
        description: "Portal 2 draws from the award-winning formula of innovative gameplay...",
        genre: (2, "Shooter", "shooter"),
        developer: (1, "Valve Software", "valve-software"),
        publisher: (1, "Valve", "valve"),
    },
    Fixture {
        id: 5286,
        name: "Tomb Raider",
        image: "https://media.rawg.io/media/games/021/021c4e21a1824d2526f925eff6324653.jpg",
        rating: 4.05,
        rating_top: 4,
        ratings_count: 8077,
        released: "2013-03-05",
        metacritic: 86,
        description: "Tomb Raider explores the intense and gritty origin story of Lara Croft...",
        genre: (4, "Action", "action"),
        developer: (4, "Crystal Dynamics", "crystal-dynamics"),
        publisher: (17, "Square Enix", "square-enix"),
    },
    Fixture {
        id: 13536,
        name: "Portal",
        image: "https://media.rawg.io/media/games/7fa/7fa0b586293c5861ee32490e953a4996.jpg",
        rating: 4.51,
        rating_top: 5,
        ratings_count: 1613,
        released: "2007-10-09",
        metacritic: 90,
        description: "Every innovative piece of design, every spoken word, every highly...",
        genre: (2, "Shooter", "shooter"),
        developer: (1, "Valve Software", "valve-software"),
        publisher: (1, "Valve", "valve"),
    },
    Fixture {
        id: 4291,
        name: "Counter-Strike: Global Offensive",
        image: "https://media.rawg.io/media/games/736/73619bd336c894d6941d926bfd563946.jpg",
        rating: 3.57,
        rating_top: 4,
        ratings_count: 6908,
        released: "2012-08-21",
        metacritic: 81,
        description: "Counter-Strike: Global Offensive expands upon the team-based action...",
        genre: (2, "Shooter", "shooter"),
        developer: (1, "Valve Software", "valve-software"),
        publisher: (1, "Valve", "valve"),
    },
];

impl Fixture {
    fn to_game(&self) -> Game {
        let named = |(id, name, slug): (u64, &str, &str)| NamedRef::new(id, name, slug);
        Game {
            id: self.id,
            name: self.name.to_string(),
            slug: String::new(),
            background_image: Some(self.image.to_string()),
            rating: self.rating,
            rating_top: self.rating_top,
            ratings_count: self.ratings_count,
            metacritic: Some(self.metacritic),
            released: Some(self.released.to_string()),
            description_raw: Some(self.description.to_string()),
            description: None,
            platforms: vec![PlatformEntry {
                platform: NamedRef::new(1, "PC", "pc"),
            }],
            genres: vec![named(self.genre)],
            developers: vec![named(self.developer)],
            publishers: vec![named(self.publisher)],
            website: None,
            clip: None,
            short_screenshots: vec![Screenshot {
                id: 1,
                image: self.image.to_string(),
            }],
        }
    }
}

/// In-memory stand-in for the catalog, answering every read from the fixture
#[derive(Debug, Clone)]
pub struct MockCatalog {
    games: Vec<Game>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            games: FIXTURES.iter().map(Fixture::to_game).collect(),
        }
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Every fixture record, in fixture order
    pub fn popular(&self) -> GamePage {
        GamePage::complete(self.games.clone())
    }

    /// Records whose title contains `query`, ignoring case
    pub fn search(&self, query: &str) -> GamePage {
        self.filtered(|game| game.name_matches(query))
    }

    pub fn find(&self, id: GameId) -> Option<Game> {
        self.games.iter().find(|game| game.id == id).cloned()
    }

    pub fn by_genre(&self, genre_id: GenreId) -> GamePage {
        self.filtered(|game| game.has_genre(genre_id))
    }

    pub fn by_year(&self, year: i32) -> GamePage {
        self.filtered(|game| game.release_year() == Some(year))
    }

    /// Records released in `year`, best rated first
    pub fn best_of_year(&self, year: i32) -> GamePage {
        let mut page = self.by_year(year);
        SortOrder::HighestRated.sort_games(&mut page.results);
        page
    }

    /// The fixture holds no unreleased games
    pub fn upcoming(&self) -> GamePage {
        GamePage::complete(Vec::new())
    }

    pub fn screenshots(&self, id: GameId) -> ScreenshotPage {
        let shots = self
            .find(id)
            .map(|game| game.short_screenshots)
            .unwrap_or_default();
        ScreenshotPage::complete(shots)
    }

    /// Distinct genres of the fixture, ordered by id
    pub fn genres(&self) -> Vec<Genre> {
        let unique: BTreeMap<GenreId, Genre> = self
            .games
            .iter()
            .flat_map(|game| game.genres.iter().cloned())
            .map(|genre| (genre.id, genre))
            .collect();
        unique.into_values().collect()
    }

    fn filtered(&self, keep: impl Fn(&Game) -> bool) -> GamePage {
        GamePage::complete(self.games.iter().filter(|g| keep(g)).cloned().collect())
    }
}
