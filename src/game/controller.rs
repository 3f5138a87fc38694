//! Match state machine: Playing -> Victory | Defeat -> Reporting -> Done

use super::engine::TickReport;
use super::session::{MatchHandoff, MatchResult, MatchSession, Outcome, Rewards};
use super::tuning::VICTORY_KILLS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Playing,
    Victory,
    Defeat,
    Reporting,
    Done,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid match transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: MatchPhase,
    pub to: MatchPhase,
}

/// Owns the match session and the phase it is in
#[derive(Debug)]
pub struct MatchController {
    phase: MatchPhase,
    session: MatchSession,
}

impl MatchController {
    pub fn new(session: MatchSession) -> Self {
        Self {
            phase: MatchPhase::Playing,
            session,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    pub fn set_session_id(&mut self, session_id: String) {
        self.session.session_id = Some(session_id);
    }

    pub fn is_terminal(&self) -> bool {
        self.phase != MatchPhase::Playing
    }

    /// Fold one tick into the session and evaluate the terminal conditions.
    /// Defeat takes precedence over a victory reached in the same tick.
    pub fn record_tick(&mut self, report: &TickReport) -> Option<Outcome> {
        if self.phase != MatchPhase::Playing {
            return None;
        }

        self.session.score += report.combat.score_gained;
        self.session.kills += report.combat.kills;
        self.session.elapsed_secs = report.now_ms / 1000;

        let outcome = if report.player_health <= 0.0 {
            Outcome::Defeat
        } else if self.session.kills >= VICTORY_KILLS {
            Outcome::Victory
        } else {
            return None;
        };

        self.phase = match outcome {
            Outcome::Victory => MatchPhase::Victory,
            Outcome::Defeat => MatchPhase::Defeat,
        };
        self.session.outcome = Some(outcome);
        Some(outcome)
    }

    /// Enter Reporting. Succeeds once per match and yields the payload to submit.
    pub fn begin_reporting(&mut self) -> Result<MatchResult, TransitionError> {
        match self.phase {
            MatchPhase::Victory | MatchPhase::Defeat => {
                self.phase = MatchPhase::Reporting;
                Ok(self.session.result())
            }
            from => Err(TransitionError {
                from,
                to: MatchPhase::Reporting,
            }),
        }
    }

    /// Leave Reporting whether or not the backend granted rewards
    pub fn finish(&mut self, rewards: Option<Rewards>) -> Result<MatchHandoff, TransitionError> {
        if self.phase != MatchPhase::Reporting {
            return Err(TransitionError {
                from: self.phase,
                to: MatchPhase::Done,
            });
        }
        self.phase = MatchPhase::Done;
        Ok(MatchHandoff::new(&self.session.result(), rewards))
    }
}
