//! One simulation tick, start to finish

use super::combat::{CollisionResolver, CombatReport};
use super::entities::{Bullet, EntityStore, Particle, Player};
use super::input::TickIntent;
use super::physics::{FieldBounds, PhysicsSystem};
use super::session::CharacterProfile;
use super::spawn::SpawnDirector;

/// Summary of one tick, consumed by the match controller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub now_ms: u64,
    pub combat: CombatReport,
    pub player_shots: u32,
    pub ability_targets: u32,
    pub wave_spawned: bool,
    pub wave_scheduled: bool,
    pub player_health: f32,
    pub live_enemies: usize,
}

/// Advances the entity store one tick at a time
pub struct UpdateEngine {
    store: EntityStore,
    spawner: SpawnDirector,
    tick: u64,
}

impl UpdateEngine {
    /// Build the store for a new match and put the first wave on the field
    pub fn new(character: &CharacterProfile, bounds: FieldBounds, seed: u64) -> Self {
        let player = Player::from_character(character, &bounds);
        let mut engine = Self::with_store(EntityStore::new(player, bounds), SpawnDirector::new(seed));
        for enemy in engine.spawner.spawn_wave(&bounds) {
            engine.store.add_enemy(enemy);
        }
        engine
    }

    /// Wrap an existing store, no initial wave
    pub fn with_store(store: EntityStore, spawner: SpawnDirector) -> Self {
        Self {
            store,
            spawner,
            tick: 0,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn spawner(&self) -> &SpawnDirector {
        &self.spawner
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Run one tick. `now_ms` is the match clock; movement does not scale with it.
    pub fn tick(&mut self, intent: &TickIntent, now_ms: u64) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            now_ms,
            ..TickReport::default()
        };

        self.apply_intent(intent, &mut report);
        self.advance_bullets();
        self.pursue_player();
        report.combat = CollisionResolver::resolve(&mut self.store, now_ms);

        self.store.compact();
        self.pace_waves(now_ms, &mut report);

        self.store.retain_particles(Particle::age);

        report.player_health = self.store.player.health;
        report.live_enemies = self.store.live_enemy_count();
        report
    }

    fn apply_intent(&mut self, intent: &TickIntent, report: &mut TickReport) {
        let bounds = self.store.bounds;
        let player = &mut self.store.player;

        let moved = player.pos.offset(intent.movement.scaled(player.speed));
        player.pos = bounds.clamp_body(moved, player.half_width, player.half_height);
        player.aim = intent.aim;

        if intent.fire {
            let bullet = Bullet::from_player(player);
            self.store.add_bullet(bullet);
            report.player_shots = 1;
        }
        if intent.ability {
            report.ability_targets = CollisionResolver::area_ability(&mut self.store);
        }
    }

    /// Bullets fly; those leaving the field are culled before any hit test
    fn advance_bullets(&mut self) {
        let bounds = self.store.bounds;
        for bullet in self.store.bullets.iter_mut() {
            bullet.advance();
        }
        self.store.retain_bullets(|b| bounds.contains_strict(b.pos));
    }

    fn pursue_player(&mut self) {
        let target = self.store.player.pos;
        for enemy in self.store.enemies.iter_mut() {
            enemy.pos = PhysicsSystem::pursue(enemy.pos, target, enemy.speed);
        }
    }

    fn pace_waves(&mut self, now_ms: u64, report: &mut TickReport) {
        let bounds = self.store.bounds;
        if let Some(wave) = self.spawner.take_due_wave(now_ms, &bounds) {
            for enemy in wave {
                self.store.add_enemy(enemy);
            }
            report.wave_spawned = true;
        }
        report.wave_scheduled = self
            .spawner
            .schedule_if_depleted(self.store.live_enemy_count(), now_ms);
    }
}
