//! Gameplay tuning values
//!
//! Speeds are in field units per tick: motion is frame-coupled, not scaled
//! by elapsed time. Delays that the game measures on the wall clock are in
//! milliseconds.

/// Field size in simulation units
pub const FIELD_WIDTH: f32 = 1200.0;
pub const FIELD_HEIGHT: f32 = 600.0;

/// Player body is a 32x32 square
pub const PLAYER_HALF_EXTENT: f32 = 16.0;
/// Character `speed` stat is doubled to get units per tick
pub const PLAYER_SPEED_FACTOR: f32 = 2.0;

pub const PLAYER_BULLET_SPEED: f32 = 10.0;
pub const PLAYER_BULLET_RADIUS: f32 = 8.0;

pub const ENEMY_HALF_EXTENT: f32 = 14.0;
/// Health bar reference; spawned health is always below it
pub const ENEMY_MAX_HEALTH: f32 = 50.0;
pub const ENEMY_BULLET_SPEED: f32 = 5.0;
pub const ENEMY_BULLET_RADIUS: f32 = 6.0;
pub const ENEMY_BULLET_DAMAGE: f32 = 5.0;
pub const ENEMY_BULLET_COLOR: &str = "#FF3B30";
pub const ENEMY_FIRE_RANGE: f32 = 200.0;
pub const ENEMY_FIRE_COOLDOWN_MS: u64 = 1000;

/// Center distance below which a bullet connects
pub const HIT_RADIUS: f32 = 20.0;
/// Center distance below which an enemy touches the player
pub const CONTACT_RANGE: f32 = 40.0;
/// Applied every tick of contact
pub const CONTACT_DAMAGE: f32 = 0.5;

pub const ABILITY_RADIUS: f32 = 150.0;
pub const ABILITY_DAMAGE_FACTOR: f32 = 2.0;

pub const PARTICLES_PER_BURST: usize = 8;
pub const PARTICLE_SPEED: f32 = 3.0;
pub const PARTICLE_SIZE: f32 = 4.0;
pub const PARTICLE_LIFETIME: u32 = 30;
pub const DEATH_BURST_COLOR: &str = "#FFCC00";
pub const PLAYER_HIT_COLOR: &str = "#FF3B30";

pub const WAVE_MIN_ENEMIES: usize = 5;
pub const WAVE_MAX_ENEMIES: usize = 7;
pub const WAVE_HEALTH_MIN: f32 = 30.0;
pub const WAVE_HEALTH_MAX: f32 = 50.0;
pub const WAVE_SPEED_MIN: f32 = 1.0;
pub const WAVE_SPEED_MAX: f32 = 2.5;
/// Next wave is scheduled once this many enemies or fewer remain
pub const WAVE_TRIGGER_REMAINING: usize = 1;
pub const WAVE_DELAY_MS: u64 = 1000;

pub const SCORE_PER_KILL: u32 = 100;
pub const VICTORY_KILLS: u32 = 20;
