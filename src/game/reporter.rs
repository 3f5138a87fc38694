//! Session reporting boundary: open a match, submit its outcome

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::store::ApiError;

use super::session::{MatchResult, MatchSelection, Rewards};

/// External backend that records matches
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn open_session(
        &self,
        player_id: &str,
        character_id: &str,
        map_id: &str,
    ) -> Result<String, ApiError>;

    async fn submit_outcome(
        &self,
        session_id: &str,
        result: &MatchResult,
    ) -> Result<Rewards, ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Match has no session id")]
    NoSession,

    #[error("Backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One attempt per call, bounded by a timeout, no retries
#[derive(Clone)]
pub struct SessionReporter {
    backend: Arc<dyn SessionBackend>,
    timeout: Duration,
}

impl SessionReporter {
    pub fn new(backend: Arc<dyn SessionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Open a session. Failure is not fatal: the match runs unreported.
    pub async fn open(&self, selection: &MatchSelection) -> Option<String> {
        let call = self.backend.open_session(
            &selection.player_id,
            &selection.character.id,
            &selection.map_id,
        );

        match timeout(self.timeout, call).await {
            Ok(Ok(session_id)) => {
                info!(session_id = %session_id, player_id = %selection.player_id, "Session opened");
                Some(session_id)
            }
            Ok(Err(e)) => {
                warn!(player_id = %selection.player_id, error = %e, "Failed to open session, match will not be reported");
                None
            }
            Err(_) => {
                warn!(player_id = %selection.player_id, timeout = ?self.timeout, "Opening session timed out, match will not be reported");
                None
            }
        }
    }

    /// Submit the outcome of a finished match
    pub async fn submit(
        &self,
        session_id: Option<&str>,
        result: &MatchResult,
    ) -> Result<Rewards, ReportError> {
        let session_id = session_id.ok_or(ReportError::NoSession)?;

        let rewards = timeout(self.timeout, self.backend.submit_outcome(session_id, result))
            .await
            .map_err(|_| ReportError::Timeout(self.timeout))??;

        info!(
            session_id = %session_id,
            xp_earned = rewards.xp_earned,
            coins_earned = rewards.coins_earned,
            "Match outcome submitted"
        );
        Ok(rewards)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;
    use crate::game::session::test_character;
    use tokio_test::{assert_err, assert_ok};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn selection() -> MatchSelection {
        MatchSelection::validate("p1", Some(test_character()), Some("minecraft".into()))
            .expect("valid selection")
    }

    fn result() -> MatchResult {
        MatchResult {
            score: 500,
            enemies_defeated: 5,
            victory: false,
            duration: 42,
        }
    }

    fn rewards() -> Rewards {
        Rewards {
            xp_earned: 50,
            coins_earned: 20,
        }
    }

    #[tokio::test]
    async fn open_returns_session_id() {
        let backend = Arc::new(ScriptedBackend::new("s-1", rewards()));
        let reporter = SessionReporter::new(backend.clone(), TIMEOUT);
        assert_eq!(reporter.open(&selection()).await.as_deref(), Some("s-1"));
        assert_eq!(backend.open_calls(), 1);
    }

    #[tokio::test]
    async fn failed_open_yields_no_session() {
        let backend = Arc::new(ScriptedBackend::new("s-1", rewards()).failing_open());
        let reporter = SessionReporter::new(backend, TIMEOUT);
        assert_eq!(reporter.open(&selection()).await, None);
    }

    #[tokio::test]
    async fn submit_relays_rewards_verbatim() {
        let backend = Arc::new(ScriptedBackend::new("s-1", rewards()));
        let reporter = SessionReporter::new(backend.clone(), TIMEOUT);

        let got = assert_ok!(reporter.submit(Some("s-1"), &result()).await);
        assert_eq!(got, rewards());
        assert_eq!(backend.submissions(), vec![("s-1".to_string(), result())]);
    }

    #[tokio::test]
    async fn submit_without_session_skips_backend() {
        let backend = Arc::new(ScriptedBackend::new("s-1", rewards()));
        let reporter = SessionReporter::new(backend.clone(), TIMEOUT);

        let err = assert_err!(reporter.submit(None, &result()).await);
        assert!(matches!(err, ReportError::NoSession));
        assert!(backend.submissions().is_empty());
    }

    #[tokio::test]
    async fn submit_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new("s-1", rewards()).failing_submit());
        let reporter = SessionReporter::new(backend.clone(), TIMEOUT);

        let err = assert_err!(reporter.submit(Some("s-1"), &result()).await);
        assert!(matches!(err, ReportError::Api(ApiError::Api { status: 503, .. })));
        assert_eq!(backend.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let backend =
            Arc::new(ScriptedBackend::new("s-1", rewards()).slow(Duration::from_secs(60)));
        let reporter = SessionReporter::new(backend, TIMEOUT);

        let err = assert_err!(reporter.submit(Some("s-1"), &result()).await);
        assert!(matches!(err, ReportError::Timeout(d) if d == TIMEOUT));
        assert_eq!(reporter.open(&selection()).await, None);
    }
}
