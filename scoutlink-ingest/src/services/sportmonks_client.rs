//! SportMonks football API client
//!
//! The only two calls the pipeline needs: name search for candidate
//! resolution and full player fetch for materialization. Both sit behind
//! the [`PlayerDirectory`] trait so the worker and tests can inject fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.sportmonks.com/v3/football";
const USER_AGENT: &str = concat!("scoutlink/", env!("CARGO_PKG_VERSION"));

/// Player directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(i64),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One search hit from the player directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryPlayer {
    pub id: i64,
    pub display_name: String,
    pub club_name: Option<String>,
}

/// Full player record from the directory
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: i64,
    pub display_name: String,
    pub club_name: Option<String>,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// Raw provider payload, persisted verbatim alongside the extracted fields
    pub payload: Value,
}

/// External player database, narrowed to the two calls the pipeline makes
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Search players by name, ordered by relevance
    async fn search_players(&self, name: &str) -> Result<Vec<DirectoryPlayer>, DirectoryError>;

    /// Fetch the full record for one player id
    async fn fetch_player(&self, id: i64) -> Result<PlayerRecord, DirectoryError>;
}

/// SportMonks API client
pub struct SportmonksClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl SportmonksClient {
    pub fn new(base_url: Option<String>, api_token: String) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_token,
        })
    }

    async fn get_json(&self, url: &str, player_id: Option<i64>) -> Result<Value, DirectoryError> {
        tracing::debug!(url = %url, "Querying player directory");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            if let Some(id) = player_id {
                return Err(DirectoryError::PlayerNotFound(id));
            }
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| DirectoryError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PlayerDirectory for SportmonksClient {
    async fn search_players(&self, name: &str) -> Result<Vec<DirectoryPlayer>, DirectoryError> {
        let url = format!(
            "{}/players/search/{}?api_token={}&include=teams.team",
            self.base_url,
            urlencode(name),
            self.api_token
        );

        let body = self.get_json(&url, None).await?;

        let data = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            // A search with no hits comes back with an empty or missing data array
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(DirectoryError::Parse(format!(
                    "Unexpected search payload shape: {}",
                    other
                )))
            }
        };

        let mut players = Vec::with_capacity(data.len());
        for item in &data {
            let id = item
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| DirectoryError::Parse("Search hit without id".to_string()))?;
            let display_name = extract_name(item)
                .ok_or_else(|| DirectoryError::Parse("Search hit without name".to_string()))?;

            players.push(DirectoryPlayer {
                id,
                display_name,
                club_name: extract_current_club(item),
            });
        }

        tracing::info!(query = %name, hits = players.len(), "Player directory search complete");

        Ok(players)
    }

    async fn fetch_player(&self, id: i64) -> Result<PlayerRecord, DirectoryError> {
        let url = format!(
            "{}/players/{}?api_token={}&include=teams.team;position;nationality",
            self.base_url, id, self.api_token
        );

        let body = self.get_json(&url, Some(id)).await?;
        let data = body
            .get("data")
            .cloned()
            .ok_or_else(|| DirectoryError::Parse("Player payload without data".to_string()))?;

        let record = player_record_from_payload(id, data)?;

        tracing::info!(
            player_id = id,
            name = %record.display_name,
            club = %record.club_name.as_deref().unwrap_or("unknown"),
            "Retrieved player from directory"
        );

        Ok(record)
    }
}

/// Build a [`PlayerRecord`] from a provider payload, tolerating the fields
/// the provider omits on thinner plans
pub(crate) fn player_record_from_payload(
    id: i64,
    data: Value,
) -> Result<PlayerRecord, DirectoryError> {
    let display_name = extract_name(&data)
        .ok_or_else(|| DirectoryError::Parse(format!("Player {} without name", id)))?;

    let date_of_birth = data
        .get("date_of_birth")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

    Ok(PlayerRecord {
        id,
        display_name,
        club_name: extract_current_club(&data),
        position: nested_name(&data, "position"),
        nationality: nested_name(&data, "nationality"),
        date_of_birth,
        payload: data,
    })
}

fn extract_name(item: &Value) -> Option<String> {
    for key in ["display_name", "name", "common_name"] {
        if let Some(name) = item.get(key).and_then(Value::as_str) {
            if !name.trim().is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Current club from the roster/contract data: the team entry without an
/// end date wins, otherwise the first listed team
fn extract_current_club(item: &Value) -> Option<String> {
    let teams = item.get("teams").and_then(Value::as_array)?;

    let active = teams
        .iter()
        .find(|entry| entry.get("end").map_or(true, Value::is_null))
        .or_else(|| teams.first())?;

    team_name(active)
}

fn team_name(entry: &Value) -> Option<String> {
    entry
        .get("team")
        .or(Some(entry))
        .and_then(|t| t.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn nested_name(data: &Value, key: &str) -> Option<String> {
    data.get(key)?
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "%20".to_string(),
            other => {
                let mut buf = [0u8; 4];
                other
                    .encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_extracts_fields_from_full_payload() {
        let data = json!({
            "id": 4242,
            "display_name": "John Doe",
            "date_of_birth": "2001-03-14",
            "position": {"name": "Centre-Back"},
            "nationality": {"name": "Germany"},
            "teams": [
                {"end": "2023-06-30", "team": {"name": "Old Club"}},
                {"end": null, "team": {"name": "FC Example"}}
            ]
        });

        let record = player_record_from_payload(4242, data).unwrap();
        assert_eq!(record.display_name, "John Doe");
        assert_eq!(record.club_name.as_deref(), Some("FC Example"));
        assert_eq!(record.position.as_deref(), Some("Centre-Back"));
        assert_eq!(record.nationality.as_deref(), Some("Germany"));
        assert_eq!(record.date_of_birth, NaiveDate::from_ymd_opt(2001, 3, 14));
        assert_eq!(record.payload["id"], 4242);
    }

    #[test]
    fn record_tolerates_sparse_payload() {
        let record = player_record_from_payload(7, json!({"name": "J. Doe"})).unwrap();
        assert_eq!(record.display_name, "J. Doe");
        assert!(record.club_name.is_none());
        assert!(record.position.is_none());
        assert!(record.date_of_birth.is_none());
    }

    #[test]
    fn record_without_any_name_is_a_parse_error() {
        let err = player_record_from_payload(7, json!({"id": 7})).unwrap_err();
        assert!(matches!(err, DirectoryError::Parse(_)));
    }

    #[test]
    fn urlencode_keeps_unreserved_and_escapes_the_rest() {
        assert_eq!(urlencode("John Doe"), "John%20Doe");
        assert_eq!(urlencode("Müller"), "M%C3%BCller");
        assert_eq!(urlencode("a-b_c.d"), "a-b_c.d");
    }
}
