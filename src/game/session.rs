//! Match session record, selection validation and result payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base stats of the character chosen for a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub color: String,
    pub health: f32,
    pub attack: f32,
    pub speed: f32,
}

/// What a client must pick before a match can start
#[derive(Debug, Clone)]
pub struct MatchSelection {
    pub player_id: String,
    pub character: CharacterProfile,
    pub map_id: String,
}

impl MatchSelection {
    /// Validate a start request. Nothing is created unless both picks are present.
    pub fn validate(
        player_id: &str,
        character: Option<CharacterProfile>,
        map_id: Option<String>,
    ) -> Result<Self, MatchSetupError> {
        let character = character.ok_or(MatchSetupError::MissingCharacter)?;
        let map_id = map_id
            .filter(|m| !m.trim().is_empty())
            .ok_or(MatchSetupError::MissingMap)?;

        if character.health <= 0.0 {
            return Err(MatchSetupError::InvalidCharacter(
                "health must be positive".to_string(),
            ));
        }
        if character.speed < 0.0 || character.attack < 0.0 {
            return Err(MatchSetupError::InvalidCharacter(
                "stats must not be negative".to_string(),
            ));
        }

        Ok(Self {
            player_id: player_id.to_string(),
            character,
            map_id,
        })
    }
}

/// Pre-match validation failures; the client has to go back to selection
#[derive(Debug, thiserror::Error)]
pub enum MatchSetupError {
    #[error("No character selected")]
    MissingCharacter,

    #[error("No map selected")]
    MissingMap,

    #[error("Invalid character: {0}")]
    InvalidCharacter(String),
}

/// Terminal outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Victory,
    Defeat,
}

/// The one record that outlives the simulation
#[derive(Debug, Clone)]
pub struct MatchSession {
    /// Assigned by the backend; absent when opening failed
    pub session_id: Option<String>,
    pub player_id: String,
    pub character: CharacterProfile,
    pub map_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub score: u32,
    pub kills: u32,
    pub outcome: Option<Outcome>,
}

impl MatchSession {
    pub fn new(selection: MatchSelection) -> Self {
        Self {
            session_id: None,
            player_id: selection.player_id,
            character: selection.character,
            map_id: selection.map_id,
            started_at: Utc::now(),
            elapsed_secs: 0,
            score: 0,
            kills: 0,
            outcome: None,
        }
    }

    pub fn result(&self) -> MatchResult {
        MatchResult {
            score: self.score,
            enemies_defeated: self.kills,
            victory: self.outcome == Some(Outcome::Victory),
            duration: self.elapsed_secs,
        }
    }
}

/// Outcome payload submitted to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u32,
    pub enemies_defeated: u32,
    pub victory: bool,
    /// Whole seconds
    pub duration: u64,
}

/// Rewards granted by the backend for a submitted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rewards {
    pub xp_earned: u32,
    pub coins_earned: u32,
}

/// What the presentation layer receives once the match is done
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchHandoff {
    pub victory: bool,
    pub score: u32,
    pub enemies_defeated: u32,
    pub duration_seconds: u64,
    pub xp_earned: u32,
    pub coins_earned: u32,
    /// False when the outcome never reached the backend
    pub reported: bool,
}

impl MatchHandoff {
    pub fn new(result: &MatchResult, rewards: Option<Rewards>) -> Self {
        let reported = rewards.is_some();
        let rewards = rewards.unwrap_or_default();
        Self {
            victory: result.victory,
            score: result.score,
            enemies_defeated: result.enemies_defeated,
            duration_seconds: result.duration,
            xp_earned: rewards.xp_earned,
            coins_earned: rewards.coins_earned,
            reported,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_character() -> CharacterProfile {
    CharacterProfile {
        id: "meultra4111".to_string(),
        name: "Meultra4111".to_string(),
        color: "#00FF94".to_string(),
        health: 120.0,
        attack: 18.0,
        speed: 6.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_requires_character_and_map() {
        let err = MatchSelection::validate("p1", None, Some("roblox".into())).unwrap_err();
        assert!(matches!(err, MatchSetupError::MissingCharacter));

        let err = MatchSelection::validate("p1", Some(test_character()), None).unwrap_err();
        assert!(matches!(err, MatchSetupError::MissingMap));

        let err =
            MatchSelection::validate("p1", Some(test_character()), Some("  ".into())).unwrap_err();
        assert!(matches!(err, MatchSetupError::MissingMap));

        let ok = MatchSelection::validate("p1", Some(test_character()), Some("roblox".into()))
            .expect("valid selection");
        assert_eq!(ok.map_id, "roblox");
    }

    #[test]
    fn selection_rejects_dead_character() {
        let mut character = test_character();
        character.health = 0.0;
        let err = MatchSelection::validate("p1", Some(character), Some("roblox".into()));
        assert!(matches!(err, Err(MatchSetupError::InvalidCharacter(_))));
    }

    #[test]
    fn handoff_without_rewards_is_unreported() {
        let result = MatchResult {
            score: 300,
            enemies_defeated: 3,
            victory: false,
            duration: 12,
        };
        let handoff = MatchHandoff::new(&result, None);
        assert!(!handoff.reported);
        assert_eq!(handoff.xp_earned, 0);
        assert_eq!(handoff.coins_earned, 0);
        assert_eq!(handoff.score, 300);
    }

    #[test]
    fn result_wire_shape_matches_backend() {
        let result = MatchResult {
            score: 500,
            enemies_defeated: 5,
            victory: false,
            duration: 42,
        };
        let json = serde_json::to_value(result).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "score": 500,
                "enemies_defeated": 5,
                "victory": false,
                "duration": 42
            })
        );
    }
}
