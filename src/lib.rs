//! Debt Defier - a real-time 2D arcade shooter core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, entities, enemy AI, collisions, waves)
//! - `tuning`: Data-driven game balance
//! - `error`: Error types for tuning loads and per-tick failures
//!
//! Rendering, input capture, audio and UI are external collaborators. They read
//! [`sim::GameState`], feed [`sim::TickInput`] and drain [`sim::GameEvent`]s.

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{SimError, TuningError};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Legacy per-frame speed units are authored at 60 fps; multiply by this and dt
    pub const BASE_SPEED_MULTIPLIER: f32 = 60.0;
    /// Nominal frame step used after a stall or on the first frame
    pub const NOMINAL_DT: f32 = 1.0 / 60.0;
    /// Hard clamp on any single frame step (seconds)
    pub const MAX_DELTA_TIME: f32 = 0.1;
    /// Wall deltas above this are treated as a stall (tab backgrounded, debugger)
    pub const STALL_THRESHOLD: f32 = 0.5;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 15.0;
    pub const PLAYER_SPEED: f32 = 4.0;
    pub const PLAYER_HEALTH: i32 = 3;
    pub const PLAYER_FIRE_RATE_MS: f64 = 120.0;
    pub const PLAYER_PROJECTILE_SPEED: f32 = 8.0;
    pub const PLAYER_DAMAGE: f32 = 10.0;
    /// Speed boost power-up multiplier
    pub const SPEED_BOOST_FACTOR: f32 = 1.5;
    /// Knockback distance applied when the player is hit by contact
    pub const KNOCKBACK: f32 = 20.0;

    /// Spread shot: 5 projectiles, 22.5 degrees apart, 60% damage each
    pub const SPREAD_SHOTS: i32 = 5;
    pub const SPREAD_ANGLE: f32 = std::f32::consts::PI / 8.0;
    pub const SPREAD_DAMAGE_FACTOR: f32 = 0.6;

    /// Projectile radii
    pub const PLAYER_SHOT_RADIUS: f32 = 5.0;
    pub const PIERCING_SHOT_RADIUS: f32 = 6.0;
    pub const HOMING_SHOT_RADIUS: f32 = 8.0;
    pub const ENEMY_SHOT_RADIUS: f32 = 4.0;
    pub const BOSS_SHOT_RADIUS: f32 = 5.0;

    /// Fragment defaults
    pub const FRAGMENT_RADIUS: f32 = 4.0;
    pub const FRAGMENT_VALUE: f32 = 0.1;
    pub const FRAGMENT_DRAG: f32 = 0.95;
    pub const PICKUP_DRAG: f32 = 0.98;

    /// Particle gravity (legacy units per frame²)
    pub const PARTICLE_GRAVITY: f32 = 0.02;

    /// Chance a destroyed enemy drops a power-up
    pub const POWERUP_DROP_CHANCE: f32 = 0.2;

    /// Enemy shooters
    pub const SHOOTER_FIRST_SHOT_DELAY_MS: f64 = 1500.0;
    pub const BOSS_FIRST_SHOT_DELAY_MS: f64 = 1000.0;
    pub const FIRST_SPECIAL_JITTER_MS: f64 = 3000.0;
    pub const SNIPER_INACCURACY: f32 = 0.05;
    pub const RANGED_SPREAD: f32 = std::f32::consts::PI / 12.0;
    /// Shooters open fire inside this multiple of their max distance
    pub const SHOOTER_RANGE_FACTOR: f32 = 1.2;

    /// Colors (0xRRGGBB)
    pub const ENEMY_PROJECTILE_COLOR: u32 = 0xff0000;
    pub const PLAYER_SHOT_COLOR: u32 = 0x7bd0cf;
    pub const DOUBLE_DAMAGE_COLOR: u32 = 0x9b59b6;
    pub const PIERCING_COLOR: u32 = 0xe67e22;
    pub const FRAGMENT_COLOR: u32 = 0x2ecc71;
    pub const WHITE: u32 = 0xffffff;
    pub const SHIELD_COLOR: u32 = 0x7f8c8d;
    pub const BURST_COLOR: u32 = 0xe74c3c;
}

/// Normalize angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `angle`
#[inline]
pub fn unit_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Heading of a vector in radians
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Strict circle overlap test (touching circles do not collide)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}
