//! Terminal rendering of catalog and profile records

use gamescout_core::format::{
    format_date, format_rating, genre_names, platform_names, truncate_text, DEFAULT_TRUNCATE_LEN,
};
use gamescout_core::{Game, Genre, Screenshot, UserProfile};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json(value: &impl Serialize) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_games(games: &[Game], json: bool) -> CliResult {
    if json {
        return print_json(&games);
    }
    if games.is_empty() {
        println!("No games found.");
        return Ok(());
    }
    for game in games {
        println!(
            "{:>7}  {:<44} {:>4}  {:<18} {}",
            game.id,
            truncate_text(&game.name, 44),
            format_rating(game.rating),
            format_date(game.released.as_deref()),
            genre_names(&game.genres),
        );
    }
    Ok(())
}

pub fn print_game(game: &Game, screenshots: &[Screenshot], json: bool) -> CliResult {
    if json {
        return print_json(&serde_json::json!({
            "game": game,
            "screenshots": screenshots,
        }));
    }

    println!("{} ({})", game.name, game.id);
    println!("  Released:   {}", format_date(game.released.as_deref()));
    println!(
        "  Rating:     {} / {} ({} ratings)",
        format_rating(game.rating),
        game.rating_top,
        game.ratings_count
    );
    if let Some(score) = game.metacritic {
        println!("  Metacritic: {}", score);
    }
    println!("  Genres:     {}", genre_names(&game.genres));
    println!("  Platforms:  {}", platform_names(&game.platforms));
    let names = |refs: &[gamescout_core::NamedRef]| {
        refs.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", ")
    };
    if !game.developers.is_empty() {
        println!("  Developers: {}", names(&game.developers));
    }
    if !game.publishers.is_empty() {
        println!("  Publishers: {}", names(&game.publishers));
    }
    if let Some(site) = &game.website {
        println!("  Website:    {}", site);
    }

    let description = game.description_text();
    if !description.is_empty() {
        println!();
        println!("{}", truncate_text(description, DEFAULT_TRUNCATE_LEN * 4));
    }
    if !screenshots.is_empty() {
        println!();
        print_screenshots(screenshots);
    }
    Ok(())
}

pub fn print_screenshots(screenshots: &[Screenshot]) {
    println!("Screenshots:");
    for shot in screenshots {
        println!("  {}", shot.image);
    }
}

pub fn print_genres(genres: &[Genre], json: bool) -> CliResult {
    if json {
        return print_json(&genres);
    }
    for genre in genres {
        println!("{:>5}  {}", genre.id, genre.name);
    }
    Ok(())
}

pub fn print_profile(profile: &UserProfile, json: bool) -> CliResult {
    if json {
        return print_json(profile);
    }
    println!("{} <{}>", profile.display_name, profile.email);
    println!("  Member since: {}", profile.created_at.format("%B %-d, %Y"));
    println!("  Favorites:    {}", profile.favorites.len());
    println!("  Games viewed: {}", profile.game_history.len());
    Ok(())
}
