//! Collision resolution: contact damage, enemy fire, bullet hits, deaths

use super::entities::{Bullet, BulletOwner, EntityStore};
use super::physics::PhysicsSystem;
use super::tuning::*;

/// What combat produced in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CombatReport {
    pub contact_damage: f32,
    pub enemy_shots: u32,
    pub enemy_hits: u32,
    pub player_hits: u32,
    pub kills: u32,
    pub score_gained: u32,
}

impl CombatReport {
    pub fn merge(&mut self, other: CombatReport) {
        self.contact_damage += other.contact_damage;
        self.enemy_shots += other.enemy_shots;
        self.enemy_hits += other.enemy_hits;
        self.player_hits += other.player_hits;
        self.kills += other.kills;
        self.score_gained += other.score_gained;
    }
}

/// Resolves every proximity interaction of one tick.
///
/// Decisions are recorded on the entities (health, `spent`) and never remove
/// anything; the store's end-of-tick compaction applies them in one pass.
pub struct CollisionResolver;

impl CollisionResolver {
    pub fn resolve(store: &mut EntityStore, now_ms: u64) -> CombatReport {
        let mut report = CombatReport {
            contact_damage: Self::apply_contact_damage(store),
            enemy_shots: Self::enemy_fire(store, now_ms),
            ..CombatReport::default()
        };
        report.enemy_hits = Self::player_bullet_hits(store);
        report.player_hits = Self::enemy_bullet_hits(store);
        report.merge(Self::collect_deaths(store));
        report
    }

    /// Every enemy touching the player deals damage, every tick of contact
    fn apply_contact_damage(store: &mut EntityStore) -> f32 {
        let player_pos = store.player.pos;
        let touching = store
            .enemies
            .iter()
            .filter(|e| e.is_alive() && PhysicsSystem::within(e.pos, player_pos, CONTACT_RANGE))
            .count();

        let damage = touching as f32 * CONTACT_DAMAGE;
        if damage > 0.0 {
            store.remove_player_health(damage);
        }
        damage
    }

    /// Enemies in range with an elapsed cooldown fire one bullet at the player
    fn enemy_fire(store: &mut EntityStore, now_ms: u64) -> u32 {
        let target = store.player.pos;
        let mut shots = Vec::new();

        for enemy in store.enemies.iter_mut() {
            if !enemy.is_alive() || !enemy.can_fire(now_ms) {
                continue;
            }
            if PhysicsSystem::within(enemy.pos, target, ENEMY_FIRE_RANGE) {
                shots.push(Bullet::from_enemy(enemy.pos, target));
                enemy.last_shot_ms = Some(now_ms);
            }
        }

        let fired = shots.len() as u32;
        for bullet in shots {
            store.add_bullet(bullet);
        }
        fired
    }

    /// Each player bullet hits at most one enemy: the first in store order
    fn player_bullet_hits(store: &mut EntityStore) -> u32 {
        let mut impacts = Vec::new();

        for bullet in store.bullets.iter_mut() {
            if bullet.spent || bullet.owner != BulletOwner::Player {
                continue;
            }
            let target = store
                .enemies
                .iter_mut()
                .find(|e| e.is_alive() && PhysicsSystem::within(bullet.pos, e.pos, HIT_RADIUS));

            if let Some(enemy) = target {
                enemy.health -= bullet.damage;
                bullet.spent = true;
                impacts.push(bullet.pos);
            }
        }

        let color = store.player.color.clone();
        for at in &impacts {
            store.spawn_burst(*at, &color);
        }
        impacts.len() as u32
    }

    fn enemy_bullet_hits(store: &mut EntityStore) -> u32 {
        let player_pos = store.player.pos;
        let mut impacts = Vec::new();

        for bullet in store.bullets.iter_mut() {
            if bullet.spent || bullet.owner != BulletOwner::Enemy {
                continue;
            }
            if PhysicsSystem::within(bullet.pos, player_pos, HIT_RADIUS) {
                bullet.spent = true;
                impacts.push((bullet.pos, bullet.damage));
            }
        }

        for (at, damage) in &impacts {
            store.remove_player_health(*damage);
            store.spawn_burst(*at, PLAYER_HIT_COLOR);
        }
        impacts.len() as u32
    }

    /// Enemies whose health dropped to zero this tick are counted exactly once;
    /// compaction removes them right after.
    fn collect_deaths(store: &mut EntityStore) -> CombatReport {
        let fallen: Vec<_> = store
            .enemies
            .iter()
            .filter(|e| !e.is_alive())
            .map(|e| e.pos)
            .collect();

        for at in &fallen {
            store.spawn_burst(*at, DEATH_BURST_COLOR);
        }

        let kills = fallen.len() as u32;
        CombatReport {
            kills,
            score_gained: kills * SCORE_PER_KILL,
            ..CombatReport::default()
        }
    }

    /// Area ability: damage every enemy near the player. Returns how many were hit.
    pub fn area_ability(store: &mut EntityStore) -> u32 {
        let origin = store.player.pos;
        let damage = store.player.attack * ABILITY_DAMAGE_FACTOR;
        let mut affected = Vec::new();

        for enemy in store.enemies.iter_mut() {
            if enemy.is_alive() && PhysicsSystem::within(enemy.pos, origin, ABILITY_RADIUS) {
                enemy.health -= damage;
                affected.push(enemy.pos);
            }
        }

        let color = store.player.color.clone();
        for at in &affected {
            store.spawn_burst(*at, &color);
        }
        affected.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Enemy, Player};
    use crate::game::physics::{FieldBounds, Point};
    use crate::game::session::test_character;

    fn store() -> EntityStore {
        let bounds = FieldBounds::ARENA;
        EntityStore::new(Player::from_character(&test_character(), &bounds), bounds)
    }

    fn player_bullet_at(store: &EntityStore, pos: Point, damage: f32) -> Bullet {
        let mut bullet = Bullet::from_player(&store.player);
        bullet.pos = pos;
        bullet.damage = damage;
        bullet
    }

    fn count_color(store: &EntityStore, color: &str) -> usize {
        store.particles.iter().filter(|p| p.color == color).count()
    }

    #[test]
    fn lethal_hit_scores_and_bursts() {
        let mut store = store();
        let enemy_pos = Point::new(900.0, 300.0);
        store.add_enemy(Enemy::new(enemy_pos, 10.0, 1.0));
        let bullet = player_bullet_at(&store, enemy_pos, 15.0);
        store.add_bullet(bullet);

        let report = CollisionResolver::resolve(&mut store, 0);

        assert_eq!(report.enemy_hits, 1);
        assert_eq!(report.kills, 1);
        assert_eq!(report.score_gained, 100);

        let death_burst: Vec<_> = store
            .particles
            .iter()
            .filter(|p| p.color == DEATH_BURST_COLOR)
            .collect();
        assert_eq!(death_burst.len(), 8);
        assert!(death_burst.iter().all(|p| p.pos == enemy_pos));

        store.compact();
        assert!(store.enemies.is_empty());
        assert!(store.bullets.is_empty());
    }

    #[test]
    fn bullet_hits_only_first_enemy_in_store_order() {
        let mut store = store();
        let spot = Point::new(900.0, 100.0);
        store.add_enemy(Enemy::new(spot, 40.0, 1.0));
        store.add_enemy(Enemy::new(Point::new(905.0, 100.0), 40.0, 1.0));
        let bullet = player_bullet_at(&store, Point::new(903.0, 100.0), 15.0);
        store.add_bullet(bullet);

        let report = CollisionResolver::resolve(&mut store, 0);

        assert_eq!(report.enemy_hits, 1);
        assert_eq!(store.enemies[0].health, 25.0);
        assert_eq!(store.enemies[1].health, 40.0);
        assert!(store.bullets[0].spent);
    }

    #[test]
    fn two_bullets_on_one_enemy_each_deal_damage_once() {
        let mut store = store();
        let spot = Point::new(900.0, 100.0);
        store.add_enemy(Enemy::new(spot, 45.0, 1.0));
        let a = player_bullet_at(&store, spot, 10.0);
        let b = player_bullet_at(&store, Point::new(901.0, 100.0), 10.0);
        store.add_bullet(a);
        store.add_bullet(b);

        CollisionResolver::resolve(&mut store, 0);

        assert_eq!(store.enemies[0].health, 25.0);
        assert!(store.bullets.iter().all(|b| b.spent));
    }

    #[test]
    fn dead_enemy_does_not_absorb_more_bullets() {
        let mut store = store();
        let spot = Point::new(900.0, 100.0);
        store.add_enemy(Enemy::new(spot, 5.0, 1.0));
        let a = player_bullet_at(&store, spot, 10.0);
        let b = player_bullet_at(&store, spot, 10.0);
        store.add_bullet(a);
        store.add_bullet(b);

        let report = CollisionResolver::resolve(&mut store, 0);

        assert_eq!(report.enemy_hits, 1);
        assert_eq!(report.kills, 1);
        assert!(store.bullets[0].spent);
        assert!(!store.bullets[1].spent);
    }

    #[test]
    fn contact_damage_accrues_per_enemy_per_tick() {
        let mut store = store();
        let near = Point::new(store.player.pos.x + 30.0, store.player.pos.y);
        store.add_enemy(Enemy::new(near, 40.0, 1.0));
        store.add_enemy(Enemy::new(near, 40.0, 1.0));
        // Both have fired already, keep this about contact only
        for enemy in store.enemies.iter_mut() {
            enemy.last_shot_ms = Some(0);
        }

        let report = CollisionResolver::resolve(&mut store, 10);
        assert_eq!(report.contact_damage, 1.0);
        assert_eq!(store.player.health, 119.0);

        CollisionResolver::resolve(&mut store, 20);
        assert_eq!(store.player.health, 118.0);
    }

    #[test]
    fn enemy_fires_once_per_cooldown() {
        let mut store = store();
        let pos = Point::new(store.player.pos.x + 150.0, store.player.pos.y);
        store.add_enemy(Enemy::new(pos, 40.0, 1.0));

        assert_eq!(CollisionResolver::resolve(&mut store, 0).enemy_shots, 1);
        assert_eq!(CollisionResolver::resolve(&mut store, 500).enemy_shots, 0);
        assert_eq!(CollisionResolver::resolve(&mut store, 1001).enemy_shots, 1);

        let shot = &store.bullets[0];
        assert_eq!(shot.owner, BulletOwner::Enemy);
        assert!(shot.vel.x < 0.0, "bullet should head toward the player");
    }

    #[test]
    fn enemy_out_of_range_holds_fire() {
        let mut store = store();
        let pos = Point::new(store.player.pos.x + 250.0, store.player.pos.y);
        store.add_enemy(Enemy::new(pos, 40.0, 1.0));
        assert_eq!(CollisionResolver::resolve(&mut store, 0).enemy_shots, 0);
        assert!(store.bullets.is_empty());
    }

    #[test]
    fn enemy_bullet_hits_player_once() {
        let mut store = store();
        let mut bullet = Bullet::from_enemy(Point::new(0.0, 0.0), store.player.pos);
        bullet.pos = Point::new(store.player.pos.x + 10.0, store.player.pos.y);
        store.add_bullet(bullet);

        let report = CollisionResolver::resolve(&mut store, 0);
        assert_eq!(report.player_hits, 1);
        assert_eq!(store.player.health, 115.0);
        assert_eq!(count_color(&store, PLAYER_HIT_COLOR), 8);

        CollisionResolver::resolve(&mut store, 16);
        assert_eq!(store.player.health, 115.0);
    }

    #[test]
    fn player_bullets_ignore_player_and_enemy_bullets_ignore_enemies() {
        let mut store = store();
        let spot = Point::new(900.0, 100.0);
        store.add_enemy(Enemy::new(spot, 40.0, 1.0));
        let mut stray = Bullet::from_enemy(spot, store.player.pos);
        stray.pos = spot;
        store.add_bullet(stray);
        let own = player_bullet_at(&store, store.player.pos, 10.0);
        store.add_bullet(own);

        let report = CollisionResolver::resolve(&mut store, 0);
        assert_eq!(report.enemy_hits, 0);
        assert_eq!(report.player_hits, 0);
        assert_eq!(store.enemies[0].health, 40.0);
    }

    #[test]
    fn area_ability_hits_enemies_in_radius() {
        let mut store = store();
        let center = store.player.pos;
        store.add_enemy(Enemy::new(Point::new(center.x + 100.0, center.y), 45.0, 1.0));
        store.add_enemy(Enemy::new(Point::new(center.x, center.y + 149.0), 30.0, 1.0));
        store.add_enemy(Enemy::new(Point::new(center.x + 151.0, center.y), 45.0, 1.0));

        let affected = CollisionResolver::area_ability(&mut store);

        assert_eq!(affected, 2);
        assert_eq!(store.enemies[0].health, 9.0);
        assert_eq!(store.enemies[1].health, -6.0);
        assert_eq!(store.enemies[2].health, 45.0);
        assert_eq!(count_color(&store, "#00FF94"), 16);
    }
}
