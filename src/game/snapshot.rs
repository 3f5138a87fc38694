//! Frame snapshots for the presentation layer

use serde::Serialize;

use super::controller::MatchController;
use super::entities::{Bullet, Enemy, EntityStore, Particle, Player};
use super::session::Outcome;

/// Immutable view of one tick, sent to the client as-is
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub particles: Vec<Particle>,
    pub hud: Hud,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hud {
    pub health: f32,
    pub max_health: f32,
    pub score: u32,
    pub kills: u32,
    pub elapsed_secs: u64,
    pub terminal: bool,
    pub outcome: Option<Outcome>,
}

/// Decides which ticks get a snapshot and builds them
pub struct SnapshotBuilder {
    /// Ticks since the last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot every N ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        let snapshot_interval = snapshot_interval.max(1);
        Self {
            // First tick always produces a frame
            ticks_since_snapshot: snapshot_interval - 1,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (terminal frame)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, tick: u64, store: &EntityStore, controller: &MatchController) -> FrameSnapshot {
        let session = controller.session();
        FrameSnapshot {
            tick,
            player: store.player.clone(),
            enemies: store.enemies.clone(),
            bullets: store.bullets.clone(),
            particles: store.particles.clone(),
            hud: Hud {
                health: store.player.health,
                max_health: store.player.max_health,
                score: session.score,
                kills: session.kills,
                elapsed_secs: session.elapsed_secs,
                terminal: controller.is_terminal(),
                outcome: session.outcome,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::FieldBounds;
    use crate::game::session::{test_character, MatchSelection, MatchSession};

    fn fixtures() -> (EntityStore, MatchController) {
        let bounds = FieldBounds::ARENA;
        let character = test_character();
        let store = EntityStore::new(Player::from_character(&character, &bounds), bounds);
        let selection = MatchSelection::validate("p1", Some(character), Some("minecraft".into()))
            .expect("valid selection");
        (store, MatchController::new(MatchSession::new(selection)))
    }

    #[test]
    fn interval_spaces_snapshots() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..7).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn forced_frame_goes_out_immediately() {
        let mut builder = SnapshotBuilder::new(10);
        assert!(builder.should_send());
        assert!(!builder.should_send());
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn frame_carries_hud_and_entities() {
        let (mut store, controller) = fixtures();
        store.spawn_burst(store.player.pos, "#FFFFFF");
        let builder = SnapshotBuilder::new(1);

        let frame = builder.build(7, &store, &controller);
        assert_eq!(frame.tick, 7);
        assert_eq!(frame.particles.len(), store.particles.len());
        assert_eq!(frame.hud.health, 120.0);
        assert_eq!(frame.hud.max_health, 120.0);
        assert!(!frame.hud.terminal);
        assert_eq!(frame.hud.outcome, None);

        let json = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(json["hud"]["outcome"], serde_json::Value::Null);
        assert!(json["player"]["pos"]["x"].is_number());
    }
}
