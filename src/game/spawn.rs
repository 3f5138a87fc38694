//! Wave spawning and pacing

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::entities::Enemy;
use super::physics::{FieldBounds, Point};
use super::tuning::*;

/// Decides wave size, placement and timing
pub struct SpawnDirector {
    rng: ChaCha8Rng,
    /// Match clock (ms) at which the pending wave appears
    pending_wave_at: Option<u64>,
    waves_spawned: u32,
}

impl SpawnDirector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending_wave_at: None,
            waves_spawned: 0,
        }
    }

    /// Roll a fresh wave along the field edges
    pub fn spawn_wave(&mut self, bounds: &FieldBounds) -> Vec<Enemy> {
        let count = self.rng.gen_range(WAVE_MIN_ENEMIES..=WAVE_MAX_ENEMIES);
        self.waves_spawned += 1;

        (0..count)
            .map(|_| {
                let pos = self.edge_point(bounds);
                let health = self.rng.gen_range(WAVE_HEALTH_MIN..WAVE_HEALTH_MAX);
                let speed = self.rng.gen_range(WAVE_SPEED_MIN..WAVE_SPEED_MAX);
                Enemy::new(pos, health, speed)
            })
            .collect()
    }

    /// Uniform edge, then a uniform point along it
    fn edge_point(&mut self, bounds: &FieldBounds) -> Point {
        match self.rng.gen_range(0..4) {
            0 => Point::new(self.rng.gen_range(0.0..bounds.width), 0.0),
            1 => Point::new(bounds.width, self.rng.gen_range(0.0..bounds.height)),
            2 => Point::new(self.rng.gen_range(0.0..bounds.width), bounds.height),
            _ => Point::new(0.0, self.rng.gen_range(0.0..bounds.height)),
        }
    }

    /// Schedule the next wave if the field is (nearly) clear and none is pending.
    /// Returns true when a wave was scheduled by this call.
    pub fn schedule_if_depleted(&mut self, live_enemies: usize, now_ms: u64) -> bool {
        if live_enemies > WAVE_TRIGGER_REMAINING || self.pending_wave_at.is_some() {
            return false;
        }
        self.pending_wave_at = Some(now_ms + WAVE_DELAY_MS);
        true
    }

    /// Hand out the pending wave once its time has come
    pub fn take_due_wave(&mut self, now_ms: u64, bounds: &FieldBounds) -> Option<Vec<Enemy>> {
        match self.pending_wave_at {
            Some(at) if now_ms >= at => {
                self.pending_wave_at = None;
                Some(self.spawn_wave(bounds))
            }
            _ => None,
        }
    }

    pub fn pending_wave_at(&self) -> Option<u64> {
        self.pending_wave_at
    }

    pub fn waves_spawned(&self) -> u32 {
        self.waves_spawned
    }
}
