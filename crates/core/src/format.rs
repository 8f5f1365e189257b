//! Display helpers shared by every front end

use chrono::NaiveDate;

use crate::models::{Genre, PlatformEntry};

pub const DEFAULT_TRUNCATE_LEN: usize = 150;

/// `2015-05-18` becomes `May 18, 2015`; missing dates read `TBD`
pub fn format_date(date: Option<&str>) -> String {
    match date.filter(|d| !d.is_empty()) {
        None => "TBD".to_string(),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|_| raw.to_string()),
    }
}

pub fn format_rating(rating: f32) -> String {
    if rating > 0.0 {
        format!("{:.1}", rating)
    } else {
        "N/A".to_string()
    }
}

/// Cuts at a char boundary and appends `...`
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_len).collect();
    format!("{}...", cut.trim_end())
}

/// First three platform names
pub fn platform_names(platforms: &[PlatformEntry]) -> String {
    if platforms.is_empty() {
        return "Multiple Platforms".to_string();
    }
    platforms
        .iter()
        .take(3)
        .map(|p| p.platform.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First three genre names
pub fn genre_names(genres: &[Genre]) -> String {
    if genres.is_empty() {
        return "Various".to_string();
    }
    genres
        .iter()
        .take(3)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
