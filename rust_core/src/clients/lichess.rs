use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::error::{RelayError, RelayResult};
use crate::models::MemberActivity;
use crate::relay::{ActivitySource, RosterSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "lichess";
pub const DEFAULT_BASE_URL: &str = "https://lichess.org";

/// Lichess API client for the team roster and per-user live status.
#[derive(Clone)]
pub struct LichessClient {
    client: Client,
    base_url: String,
    team_id: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl std::fmt::Debug for LichessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LichessClient")
            .field("base_url", &self.base_url)
            .field("team_id", &self.team_id)
            .field("circuit_breaker_state", &self.circuit_breaker.state())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TeamUser {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatus {
    id: String,
    #[serde(default)]
    playing_id: Option<String>,
}

impl LichessClient {
    pub fn new(base_url: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self::with_config(base_url, team_id, CircuitBreakerConfig::default())
    }

    pub fn with_config(
        base_url: impl Into<String>,
        team_id: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            team_id: team_id.into(),
            circuit_breaker: Arc::new(CircuitBreaker::new(SERVICE, config)),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// GET through the circuit breaker, returning the body of a 2xx response.
    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> RelayResult<String> {
        if !self.circuit_breaker.is_available() {
            return Err(RelayError::CircuitOpen { service: SERVICE });
        }

        let result = self.get_text_internal(url, query).await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            // 404 for an unknown user is not the API being down
            Err(RelayError::UpstreamStatus { status: 404, .. }) => {}
            Err(_) => self.circuit_breaker.record_failure(),
        }
        result
    }

    async fn get_text_internal(&self, url: &str, query: &[(&str, &str)]) -> RelayResult<String> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| RelayError::Http { service: SERVICE, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|source| RelayError::Http { service: SERVICE, source })
    }
}

/// Team members endpoint streams one JSON object per line.
fn parse_team_users(body: &str) -> RelayResult<Vec<String>> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<TeamUser>(line)
                .map(|u| u.id)
                .map_err(|e| RelayError::Decode {
                    service: SERVICE,
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn parse_status(member_id: &str, body: &str) -> RelayResult<MemberActivity> {
    let statuses: Vec<UserStatus> = serde_json::from_str(body).map_err(|e| RelayError::Decode {
        service: SERVICE,
        reason: e.to_string(),
    })?;

    let game_id = statuses
        .into_iter()
        .find(|s| s.id.eq_ignore_ascii_case(member_id))
        .and_then(|s| s.playing_id)
        .filter(|g| !g.is_empty());

    Ok(MemberActivity {
        member_id: member_id.to_string(),
        game_id,
    })
}

#[async_trait]
impl RosterSource for LichessClient {
    async fn fetch_team_members(&self) -> RelayResult<Vec<String>> {
        let url = format!("{}/api/team/{}/users", self.base_url, self.team_id);
        let body = self.get_text(&url, &[]).await?;
        let ids = parse_team_users(&body)?;
        tracing::debug!("Fetched {} members of team {}", ids.len(), self.team_id);
        Ok(ids)
    }
}

#[async_trait]
impl ActivitySource for LichessClient {
    async fn query_activity(&self, member_id: &str) -> RelayResult<MemberActivity> {
        let url = format!("{}/api/users/status", self.base_url);
        let body = self
            .get_text(&url, &[("ids", member_id), ("withGameIds", "true")])
            .await?;
        parse_status(member_id, &body)
    }

    fn game_link(&self, game_id: &str) -> String {
        format!("{}/{}", self.base_url, game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_team_users_ndjson() {
        let body = "{\"id\":\"alice\",\"name\":\"Alice\"}\n\n{\"id\":\"bob\",\"name\":\"Bob\",\"title\":\"FM\"}\n";
        assert_eq!(parse_team_users(body).unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_team_users_empty_body() {
        assert!(parse_team_users("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_team_users_garbage() {
        assert!(matches!(
            parse_team_users("<html>"),
            Err(RelayError::Decode { .. })
        ));
    }

    #[test]
    fn test_parse_status_playing() {
        let body = r#"[{"id":"alice","name":"Alice","online":true,"playing":true,"playingId":"abcd1234"}]"#;
        let activity = parse_status("alice", body).unwrap();
        assert!(activity.is_live());
        assert_eq!(activity.game_id.as_deref(), Some("abcd1234"));
    }

    #[test]
    fn test_parse_status_idle_or_missing() {
        let idle = r#"[{"id":"alice","name":"Alice","online":true}]"#;
        assert!(!parse_status("alice", idle).unwrap().is_live());
        assert!(!parse_status("alice", "[]").unwrap().is_live());
    }

    #[test]
    fn test_game_link() {
        let client = LichessClient::new("https://lichess.org/", "team");
        assert_eq!(client.game_link("abcd1234"), "https://lichess.org/abcd1234");
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_live_team() {
        let client = LichessClient::new(DEFAULT_BASE_URL, "lichess-swiss");
        match client.fetch_team_members().await {
            Ok(ids) => println!("Fetched {} members", ids.len()),
            Err(e) => println!("Warning: could not fetch team: {}", e),
        }
    }
}
