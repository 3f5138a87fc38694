//! Entity types and the per-match entity store

use serde::Serialize;

use super::physics::{FieldBounds, PhysicsSystem, Point};
use super::session::CharacterProfile;
use super::tuning::*;

/// The player-controlled body
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub pos: Point,
    pub half_width: f32,
    pub half_height: f32,
    /// Units per tick
    pub speed: f32,
    pub color: String,
    pub health: f32,
    pub max_health: f32,
    pub attack: f32,
    /// Aim point in field coordinates
    pub aim: Point,
}

impl Player {
    /// Spawn at the field center from the chosen character's base stats
    pub fn from_character(character: &CharacterProfile, bounds: &FieldBounds) -> Self {
        let center = bounds.center();
        Self {
            pos: center,
            half_width: PLAYER_HALF_EXTENT,
            half_height: PLAYER_HALF_EXTENT,
            speed: character.speed * PLAYER_SPEED_FACTOR,
            color: character.color.clone(),
            health: character.health,
            max_health: character.health,
            attack: character.attack,
            aim: center,
        }
    }
}

/// A pursuing, shooting enemy
#[derive(Debug, Clone, Serialize)]
pub struct Enemy {
    pub id: u32,
    pub pos: Point,
    pub half_width: f32,
    pub half_height: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    /// Match clock (ms) of the last shot
    #[serde(skip)]
    pub last_shot_ms: Option<u64>,
}

impl Enemy {
    pub fn new(pos: Point, health: f32, speed: f32) -> Self {
        Self {
            id: 0,
            pos,
            half_width: ENEMY_HALF_EXTENT,
            half_height: ENEMY_HALF_EXTENT,
            speed,
            health,
            max_health: ENEMY_MAX_HEALTH,
            last_shot_ms: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// True when the shot cooldown has elapsed (or the enemy never fired)
    pub fn can_fire(&self, now_ms: u64) -> bool {
        match self.last_shot_ms {
            Some(last) => now_ms.saturating_sub(last) > ENEMY_FIRE_COOLDOWN_MS,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletOwner {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bullet {
    pub pos: Point,
    pub vel: Point,
    pub damage: f32,
    pub radius: f32,
    pub color: String,
    pub owner: BulletOwner,
    /// Set once the bullet has dealt its damage; compaction drops it
    #[serde(skip)]
    pub spent: bool,
}

impl Bullet {
    /// Shot fired by the player from its position at the aim point
    pub fn from_player(player: &Player) -> Self {
        Self {
            pos: player.pos,
            vel: PhysicsSystem::launch_velocity(player.pos, player.aim, PLAYER_BULLET_SPEED),
            damage: player.attack,
            radius: PLAYER_BULLET_RADIUS,
            color: player.color.clone(),
            owner: BulletOwner::Player,
            spent: false,
        }
    }

    /// Shot fired by an enemy at the player's current position (non-homing)
    pub fn from_enemy(origin: Point, target: Point) -> Self {
        Self {
            pos: origin,
            vel: PhysicsSystem::launch_velocity(origin, target, ENEMY_BULLET_SPEED),
            damage: ENEMY_BULLET_DAMAGE,
            radius: ENEMY_BULLET_RADIUS,
            color: ENEMY_BULLET_COLOR.to_string(),
            owner: BulletOwner::Enemy,
            spent: false,
        }
    }

    pub fn advance(&mut self) {
        self.pos = self.pos.offset(self.vel);
    }

    pub fn is_live(&self, bounds: &FieldBounds) -> bool {
        !self.spent && bounds.contains_strict(self.pos)
    }
}

/// Cosmetic particle; never affects the simulation
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub pos: Point,
    pub vel: Point,
    pub color: String,
    pub size: f32,
    /// Remaining ticks
    pub life: u32,
}

impl Particle {
    /// Ring of particles flying outward from `center`
    pub fn burst(center: Point, color: &str) -> impl Iterator<Item = Particle> + '_ {
        (0..PARTICLES_PER_BURST).map(move |i| {
            let angle = std::f32::consts::TAU * i as f32 / PARTICLES_PER_BURST as f32;
            Particle {
                pos: center,
                vel: Point::new(angle.cos() * PARTICLE_SPEED, angle.sin() * PARTICLE_SPEED),
                color: color.to_string(),
                size: PARTICLE_SIZE,
                life: PARTICLE_LIFETIME,
            }
        })
    }

    /// Move one tick and burn one tick of lifetime. Returns false once expired.
    pub fn age(&mut self) -> bool {
        self.pos = self.pos.offset(self.vel);
        self.life = self.life.saturating_sub(1);
        self.life > 0
    }
}

/// Owns every entity collection of one match
#[derive(Debug, Clone)]
pub struct EntityStore {
    pub bounds: FieldBounds,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub particles: Vec<Particle>,
    next_enemy_id: u32,
}

impl EntityStore {
    pub fn new(player: Player, bounds: FieldBounds) -> Self {
        Self {
            bounds,
            player,
            enemies: Vec::new(),
            bullets: Vec::new(),
            particles: Vec::new(),
            next_enemy_id: 1,
        }
    }

    pub fn add_enemy(&mut self, mut enemy: Enemy) {
        enemy.id = self.next_enemy_id;
        self.next_enemy_id += 1;
        self.enemies.push(enemy);
    }

    pub fn add_bullet(&mut self, bullet: Bullet) {
        self.bullets.push(bullet);
    }

    pub fn add_particle(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn spawn_burst(&mut self, center: Point, color: &str) {
        for particle in Particle::burst(center, color) {
            self.add_particle(particle);
        }
    }

    /// Damage the player, clamping health into [0, max]. Returns the new health.
    pub fn remove_player_health(&mut self, amount: f32) -> f32 {
        let player = &mut self.player;
        player.health = (player.health - amount).clamp(0.0, player.max_health);
        player.health
    }

    pub fn retain_enemies<F: FnMut(&Enemy) -> bool>(&mut self, keep: F) {
        self.enemies.retain(keep);
    }

    pub fn retain_bullets<F: FnMut(&Bullet) -> bool>(&mut self, keep: F) {
        self.bullets.retain(keep);
    }

    pub fn retain_particles<F: FnMut(&mut Particle) -> bool>(&mut self, keep: F) {
        self.particles.retain_mut(keep);
    }

    /// End-of-tick compaction for the simulation collections
    pub fn compact(&mut self) {
        let bounds = self.bounds;
        self.retain_bullets(|b| b.is_live(&bounds));
        self.retain_enemies(Enemy::is_alive);
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }
}
