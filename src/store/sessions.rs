//! Game session endpoints: open a match, submit its outcome

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::reporter::SessionBackend;
use crate::game::session::{MatchResult, Rewards};

use super::api::{ArenaApiClient, ApiError};

/// Body of `POST /game/session`
#[derive(Debug, Clone, Serialize)]
pub struct NewGameSession<'a> {
    pub player_id: &'a str,
    pub character_id: &'a str,
    pub map_id: &'a str,
}

/// Session record as returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct GameSessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub character_id: Option<String>,
    #[serde(default)]
    pub map_id: Option<String>,
}

/// Response of `PUT /game/session/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedSession {
    pub xp_earned: u32,
    pub coins_earned: u32,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<CompletedSession> for Rewards {
    fn from(done: CompletedSession) -> Self {
        Rewards {
            xp_earned: done.xp_earned,
            coins_earned: done.coins_earned,
        }
    }
}

/// Session store operations
#[derive(Clone)]
pub struct SessionStore {
    client: ArenaApiClient,
}

impl SessionStore {
    pub fn new(client: ArenaApiClient) -> Self {
        Self { client }
    }

    /// Register a new match with the backend
    pub async fn create_session(
        &self,
        player_id: &str,
        character_id: &str,
        map_id: &str,
    ) -> Result<GameSessionRecord, ApiError> {
        let body = NewGameSession {
            player_id,
            character_id,
            map_id,
        };
        self.client.post("game/session", &body).await
    }

    /// Close a match and collect its rewards
    pub async fn complete_session(
        &self,
        session_id: &str,
        result: &MatchResult,
    ) -> Result<CompletedSession, ApiError> {
        let path = format!("game/session/{}", session_id);
        self.client.put(&path, result).await
    }
}

#[async_trait]
impl SessionBackend for SessionStore {
    async fn open_session(
        &self,
        player_id: &str,
        character_id: &str,
        map_id: &str,
    ) -> Result<String, ApiError> {
        let record = self.create_session(player_id, character_id, map_id).await?;
        debug!(
            session_id = %record.session_id,
            player_id = ?record.player_id,
            character_id = ?record.character_id,
            map_id = ?record.map_id,
            "Backend created session"
        );
        Ok(record.session_id)
    }

    async fn submit_outcome(
        &self,
        session_id: &str,
        result: &MatchResult,
    ) -> Result<Rewards, ApiError> {
        let done = self.complete_session(session_id, result).await?;
        if let Some(message) = done.message.as_deref() {
            debug!(session_id = %session_id, message, "Backend closed session");
        }
        Ok(done.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_session_parses_backend_reply() {
        let body = r#"{"xp_earned": 50, "coins_earned": 20, "message": "Session completed"}"#;
        let done: CompletedSession = serde_json::from_str(body).expect("parse");
        assert_eq!(
            Rewards::from(done),
            Rewards {
                xp_earned: 50,
                coins_earned: 20
            }
        );
    }

    #[test]
    fn session_record_tolerates_extra_fields() {
        let body = r#"{
            "session_id": "8c1d",
            "player_id": "p1",
            "character_id": "gato",
            "map_id": "youtube",
            "score": 0,
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let record: GameSessionRecord = serde_json::from_str(body).expect("parse");
        assert_eq!(record.session_id, "8c1d");
        assert_eq!(record.map_id.as_deref(), Some("youtube"));
    }

    #[test]
    fn new_session_body_shape() {
        let body = NewGameSession {
            player_id: "p1",
            character_id: "gato",
            map_id: "youtube",
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            serde_json::json!({"player_id": "p1", "character_id": "gato", "map_id": "youtube"})
        );
    }
}
