//! Transfermarkt profile URL parsing
//!
//! Distinguishes player profile pages from club and competition pages and
//! recovers the name to query the player database with from the URL slug.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors classifying a profile URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileUrlError {
    /// A supported domain, but a club/competition/other page, not a player
    #[error("unsupported link kind: {0}")]
    UnsupportedKind(String),

    /// Not a recognizable profile URL at all
    #[error("not a recognizable player profile link")]
    Invalid,
}

/// A parsed player profile reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfileRef {
    /// URL slug, e.g. "john-doe"
    pub slug: String,
    /// Name recovered from the slug, e.g. "John Doe"
    pub queried_name: String,
    /// Numeric profile id from the URL
    pub transfermarkt_id: u64,
}

static PLAYER_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[^/]+/([^/]+)/profil/spieler/(\d+)")
        .expect("player path regex must compile")
});

static CLUB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/verein/\d+").expect("club path regex must compile"));

static COMPETITION_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/wettbewerb/").expect("competition path regex must compile"));

/// Parse a normalized profile URL into a player reference.
///
/// Club and competition pages are rejected as unsupported; anything else
/// non-matching is invalid.
pub fn parse_player_profile(url: &str) -> Result<PlayerProfileRef, ProfileUrlError> {
    if let Some(caps) = PLAYER_PATH.captures(url) {
        let slug = caps[1].to_lowercase();
        let transfermarkt_id: u64 = caps[2]
            .parse()
            .map_err(|_| ProfileUrlError::Invalid)?;

        return Ok(PlayerProfileRef {
            queried_name: name_from_slug(&slug),
            slug,
            transfermarkt_id,
        });
    }

    if CLUB_PATH.is_match(url) {
        return Err(ProfileUrlError::UnsupportedKind("club page".to_string()));
    }
    if COMPETITION_PATH.is_match(url) {
        return Err(ProfileUrlError::UnsupportedKind("competition page".to_string()));
    }

    Err(ProfileUrlError::Invalid)
}

/// Recover a display name from a URL slug: "erling-haaland" -> "Erling Haaland"
fn name_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
