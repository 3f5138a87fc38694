//! Match task and the authoritative tick loop

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::util::time::{tick_period, Timer, DEFAULT_TICK_RATE};
use crate::ws::protocol::ServerMsg;

use super::controller::{MatchController, TransitionError};
use super::engine::UpdateEngine;
use super::input::{InputController, RawInput};
use super::physics::FieldBounds;
use super::reporter::{ReportError, SessionReporter};
use super::session::{MatchHandoff, MatchSelection, MatchSession};
use super::snapshot::SnapshotBuilder;

const INPUT_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Pacing of one match task
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    pub tick_rate: u32,
    pub result_delay: Duration,
    /// Snapshot every N ticks
    pub snapshot_interval: u32,
}

impl MatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_rate: config.tick_rate,
            result_delay: config.result_delay,
            snapshot_interval: 1,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            result_delay: Duration::from_millis(2000),
            snapshot_interval: 1,
        }
    }
}

/// How a match task ended
#[derive(Debug, Clone, PartialEq)]
pub enum MatchExit {
    /// Result handed to the client
    Completed(MatchHandoff),
    /// Outcome was submitted but the client left before the handoff
    Abandoned(MatchHandoff),
    /// Stopped before reporting; nothing was submitted
    Cancelled,
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<RawInput>,
    pub events_tx: broadcast::Sender<ServerMsg>,
}

impl MatchHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }
}

/// Fires the match's cancel signal. Dropping it cancels too.
pub struct MatchCanceller(oneshot::Sender<()>);

impl MatchCanceller {
    pub fn cancel(self) {
        let _ = self.0.send(());
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One single-player match. The task running it is the only owner of its
/// entity store.
pub struct GameMatch {
    id: Uuid,
    seed: u64,
    selection: MatchSelection,
    config: MatchConfig,
    reporter: SessionReporter,
    controller: MatchController,
    input: InputController,
    input_rx: mpsc::Receiver<RawInput>,
    events_tx: broadcast::Sender<ServerMsg>,
    cancel_rx: oneshot::Receiver<()>,
    /// Pending open-session result, polled each tick
    session_rx: Option<oneshot::Receiver<Option<String>>>,
    snapshots: SnapshotBuilder,
}

impl GameMatch {
    /// Create a new match
    pub fn new(
        selection: MatchSelection,
        reporter: SessionReporter,
        config: MatchConfig,
        seed: u64,
    ) -> (Self, MatchHandle, MatchCanceller) {
        let id = Uuid::new_v4();
        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let handle = MatchHandle {
            id,
            input_tx,
            events_tx: events_tx.clone(),
        };

        let game_match = Self {
            id,
            seed,
            controller: MatchController::new(MatchSession::new(selection.clone())),
            selection,
            config,
            reporter,
            input: InputController::new(FieldBounds::ARENA),
            input_rx,
            events_tx,
            cancel_rx,
            session_rx: None,
            snapshots: SnapshotBuilder::new(config.snapshot_interval),
        };

        (game_match, handle, MatchCanceller(cancel_tx))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run on its own task, registered for as long as it runs
    pub fn spawn(self, registry: Arc<MatchRegistry>, handle: MatchHandle) -> JoinHandle<MatchExit> {
        tokio::spawn(async move {
            let id = handle.id;
            registry.insert(handle);

            let exit = match self.run().await {
                Ok(exit) => exit,
                Err(e) => {
                    error!(match_id = %id, error = %e, "Match aborted");
                    MatchExit::Cancelled
                }
            };

            registry.remove(&id);
            exit
        })
    }

    /// Run the tick loop, then the reporting and presentation tail
    pub async fn run(mut self) -> Result<MatchExit, TransitionError> {
        info!(
            match_id = %self.id,
            player_id = %self.selection.player_id,
            character_id = %self.selection.character.id,
            map_id = %self.selection.map_id,
            seed = self.seed,
            "Match started"
        );

        let bounds = FieldBounds::ARENA;
        let _ = self.events_tx.send(ServerMsg::MatchStarted {
            match_id: self.id,
            field_width: bounds.width,
            field_height: bounds.height,
        });

        self.open_session_in_background();

        let mut engine = UpdateEngine::new(&self.selection.character, bounds, self.seed);
        let clock = Timer::new();

        let mut ticker = interval(tick_period(self.config.tick_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut self.cancel_rx => {
                    info!(match_id = %self.id, tick = engine.tick_count(), "Match cancelled during play");
                    return Ok(MatchExit::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            self.poll_session();
            self.drain_input();

            let intent = self.input.take_intent();
            let report = engine.tick(&intent, clock.elapsed_ms());
            let outcome = self.controller.record_tick(&report);

            if report.combat.kills > 0 {
                debug!(match_id = %self.id, kills = self.controller.session().kills, "Enemies defeated");
            }
            if report.ability_targets > 0 {
                debug!(match_id = %self.id, targets = report.ability_targets, "Area ability");
            }
            if report.combat.player_hits > 0 || report.combat.contact_damage > 0.0 {
                debug!(
                    match_id = %self.id,
                    bullet_hits = report.combat.player_hits,
                    contact_damage = report.combat.contact_damage,
                    health = report.player_health,
                    "Player damaged"
                );
            }
            if report.wave_spawned {
                debug!(match_id = %self.id, waves = engine.spawner().waves_spawned(), "Wave spawned");
            }

            if outcome.is_some() {
                self.snapshots.force_next();
            }
            if self.snapshots.should_send() {
                let frame = self.snapshots.build(report.tick, engine.store(), &self.controller);
                let _ = self.events_tx.send(ServerMsg::Snapshot {
                    frame: Box::new(frame),
                });
            }

            if let Some(outcome) = outcome {
                let session = self.controller.session();
                info!(
                    match_id = %self.id,
                    outcome = ?outcome,
                    score = session.score,
                    kills = session.kills,
                    elapsed_secs = session.elapsed_secs,
                    started_at = %session.started_at,
                    phase = ?self.controller.phase(),
                    enemy_shots = report.combat.enemy_shots,
                    player_shots = report.player_shots,
                    "Match ended"
                );
                break;
            }
        }

        // The simulation is over; nothing reads the store or input again
        drop(engine);
        self.input_rx.close();

        self.finish().await
    }

    /// Report the outcome, wait out the presentation delay, hand off
    async fn finish(mut self) -> Result<MatchExit, TransitionError> {
        if let Some(session_rx) = self.session_rx.take() {
            tokio::select! {
                biased;
                _ = &mut self.cancel_rx => {
                    info!(match_id = %self.id, "Match cancelled before reporting");
                    return Ok(MatchExit::Cancelled);
                }
                opened = session_rx => self.accept_session(opened.ok().flatten()),
            }
        }

        // From here the outcome is submitted even if the client goes away
        let result = self.controller.begin_reporting()?;
        let session_id = self.controller.session().session_id.clone();

        let rewards = match self.reporter.submit(session_id.as_deref(), &result).await {
            Ok(rewards) => Some(rewards),
            Err(ReportError::NoSession) => {
                info!(match_id = %self.id, "No session, match not reported");
                None
            }
            Err(e) => {
                warn!(match_id = %self.id, error = %e, "Failed to report match outcome");
                None
            }
        };

        let handoff = self.controller.finish(rewards)?;

        tokio::select! {
            biased;
            _ = &mut self.cancel_rx => {
                info!(match_id = %self.id, reported = handoff.reported, "Client left before result handoff");
                return Ok(MatchExit::Abandoned(handoff));
            }
            _ = tokio::time::sleep(self.config.result_delay) => {}
        }

        let _ = self.events_tx.send(ServerMsg::MatchResult {
            result: handoff.clone(),
        });
        info!(
            match_id = %self.id,
            victory = handoff.victory,
            xp_earned = handoff.xp_earned,
            coins_earned = handoff.coins_earned,
            reported = handoff.reported,
            "Match result delivered"
        );
        Ok(MatchExit::Completed(handoff))
    }

    fn open_session_in_background(&mut self) {
        let (tx, rx) = oneshot::channel();
        let reporter = self.reporter.clone();
        let selection = self.selection.clone();
        tokio::spawn(async move {
            let _ = tx.send(reporter.open(&selection).await);
        });
        self.session_rx = Some(rx);
    }

    /// Pick up the open-session result without blocking the tick
    fn poll_session(&mut self) {
        let Some(rx) = self.session_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(opened) => {
                self.session_rx = None;
                self.accept_session(opened);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.session_rx = None;
                warn!(match_id = %self.id, "Session task vanished, match will not be reported");
            }
        }
    }

    fn accept_session(&mut self, opened: Option<String>) {
        if let Some(session_id) = opened {
            self.controller.set_session_id(session_id.clone());
            let _ = self.events_tx.send(ServerMsg::SessionOpened { session_id });
        }
    }

    /// Process all pending raw input
    fn drain_input(&mut self) {
        while let Ok(event) = self.input_rx.try_recv() {
            self.input.apply(event);
        }
    }
}
