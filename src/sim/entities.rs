//! Transient entity models
//!
//! Projectiles, particles, fragments and damage numbers live in pool slots.
//! Each one exposes `spawn` (reinitialize every field and set `active`),
//! `update` (advance, possibly self-releasing) and an idempotent `reset`.
//! Power-up pickups are few and short-lived, so they live in a plain `Vec`.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::archetype::{PowerUpDef, PowerUpKind};
use super::enemy::Enemy;
use super::pool::{Pool, Pooled};
use crate::consts::*;
use crate::tuning::ItemTuning;
use crate::{angle_of, normalize_angle, unit_from_angle};

/// Everything needed to launch a projectile
#[derive(Debug, Clone, Copy)]
pub struct ShotSpec {
    pub pos: Vec2,
    pub radius: f32,
    pub color: u32,
    /// Unit heading
    pub direction: Vec2,
    /// Legacy per-frame speed units
    pub speed: f32,
    pub damage: f32,
    pub piercing: bool,
    pub homing: bool,
}

/// Enemies visible to homing projectiles this tick
#[derive(Debug, Clone, Copy)]
pub struct HomingView<'a> {
    pub enemies: &'a [Enemy],
    /// Radians per second
    pub turn_rate: f32,
    pub acquire_range: f32,
}

/// A player or enemy shot
#[derive(Debug, Clone, Default, Serialize)]
pub struct Projectile {
    pub active: bool,
    pub pos: Vec2,
    pub radius: f32,
    pub color: u32,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub piercing: bool,
    pub homing: bool,
    /// Enemy id the homing guidance is locked on
    pub target: Option<u32>,
    /// Enemies a piercing shot has already damaged
    pub hit_enemies: Vec<u32>,
}

impl Projectile {
    pub fn spawn(&mut self, shot: ShotSpec) {
        self.active = true;
        self.pos = shot.pos;
        self.radius = shot.radius;
        self.color = shot.color;
        self.direction = shot.direction.normalize_or(Vec2::X);
        self.speed = shot.speed;
        self.damage = shot.damage;
        self.piercing = shot.piercing;
        self.homing = shot.homing;
        self.target = None;
        self.hit_enemies.clear();
    }

    /// Steer (if homing), move, and self-release once fully off the arena
    pub fn update(&mut self, dt: f32, arena: Vec2, homing: Option<&HomingView<'_>>) {
        if self.homing {
            if let Some(view) = homing {
                self.steer(dt, view);
            }
        }

        self.pos += self.direction * self.speed * BASE_SPEED_MULTIPLIER * dt;

        let margin = self.radius * 2.0;
        if self.pos.x < -margin
            || self.pos.x > arena.x + margin
            || self.pos.y < -margin
            || self.pos.y > arena.y + margin
        {
            self.reset();
        }
    }

    fn steer(&mut self, dt: f32, view: &HomingView<'_>) {
        let alive = |id: u32| {
            view.enemies
                .iter()
                .find(|e| e.id == id && e.active && e.health > 0.0)
        };

        let mut target = self.target.and_then(alive);
        if target.is_none() {
            let range_sq = view.acquire_range * view.acquire_range;
            target = view
                .enemies
                .iter()
                .filter(|e| e.active && e.health > 0.0)
                .map(|e| (e, e.pos.distance_squared(self.pos)))
                .filter(|(_, d)| *d < range_sq)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(e, _)| e);
        }
        self.target = target.map(|e| e.id);

        if let Some(enemy) = target {
            let current = angle_of(self.direction);
            let desired = angle_of(enemy.pos - self.pos);
            let max_turn = view.turn_rate * dt;
            let turn = normalize_angle(desired - current).clamp(-max_turn, max_turn);
            self.direction = unit_from_angle(current + turn);
        }
    }

    pub fn has_hit(&self, enemy_id: u32) -> bool {
        self.hit_enemies.contains(&enemy_id)
    }
}

impl Pooled for Projectile {
    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.active = false;
        self.target = None;
        self.hit_enemies.clear();
    }
}

/// Cosmetic spark with gravity and fade
#[derive(Debug, Clone, Default, Serialize)]
pub struct Particle {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    pub alpha: f32,
    pub decay: f32,
}

impl Particle {
    pub fn spawn(&mut self, pos: Vec2, vel: Vec2, radius: f32, color: u32, alpha: f32, decay: f32) {
        self.active = true;
        self.pos = pos;
        self.vel = vel;
        self.radius = radius;
        self.color = color;
        self.alpha = alpha;
        self.decay = decay;
    }

    pub fn update(&mut self, dt: f32) {
        let scale = BASE_SPEED_MULTIPLIER * dt;
        self.pos += self.vel * scale;
        self.vel.y += PARTICLE_GRAVITY * scale;
        self.alpha -= self.decay * scale;
        if self.alpha <= 0.0 {
            self.reset();
        }
    }
}

impl Pooled for Particle {
    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.active = false;
    }
}

/// Emit a radial puff of particles. Stops quietly when the pool runs out.
pub fn spawn_particles<R: Rng>(
    pool: &mut Pool<Particle>,
    rng: &mut R,
    pos: Vec2,
    color: u32,
    count: u32,
    speed: f32,
    size: f32,
) {
    for _ in 0..count {
        let Some(particle) = pool.acquire() else {
            break;
        };
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let vel = unit_from_angle(angle) * rng.random::<f32>() * speed;
        let radius = rng.random::<f32>() * size + 1.0;
        let alpha = 0.7 + rng.random::<f32>() * 0.3;
        let decay = 0.015 + rng.random::<f32>() * 0.025;
        particle.spawn(pos, vel, radius, color, alpha, decay);
    }
}

/// Magnet pull toward the player, shared by fragments and pickups
fn magnet_pull(pos: Vec2, vel: &mut Vec2, player_pos: Vec2, items: &ItemTuning, dt: f32) {
    let delta = player_pos - pos;
    let dist = delta.length();
    if dist < items.magnet_radius && dist > 1.0 {
        let pull = items.magnet_strength * (1.0 - dist / items.magnet_radius);
        *vel += delta / dist * pull * dt;
    }
}

/// Multiplier pickup dropped by destroyed enemies
#[derive(Debug, Clone, Default, Serialize)]
pub struct Fragment {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    pub value: f32,
    pub spawn_time: f64,
    pub fading: bool,
}

impl Fragment {
    pub fn spawn<R: Rng>(&mut self, pos: Vec2, now: f64, rng: &mut R) {
        let jitter = Vec2::new(
            rng.random_range(-5.0..=5.0),
            rng.random_range(-5.0..=5.0),
        );
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let speed = 1.0 + rng.random::<f32>();

        self.active = true;
        self.pos = pos + jitter;
        self.vel = unit_from_angle(angle) * speed;
        self.radius = FRAGMENT_RADIUS;
        self.color = FRAGMENT_COLOR;
        self.value = FRAGMENT_VALUE;
        self.spawn_time = now;
        self.fading = false;
    }

    pub fn update(&mut self, dt: f32, now: f64, player_pos: Vec2, items: &ItemTuning) {
        let age = now - self.spawn_time;
        if age > items.fragment_lifetime_ms {
            self.reset();
            return;
        }
        self.fading = age > items.fragment_lifetime_ms - items.fade_start_ms;

        magnet_pull(self.pos, &mut self.vel, player_pos, items, dt);
        self.pos += self.vel * BASE_SPEED_MULTIPLIER * dt;
        self.vel *= FRAGMENT_DRAG;
    }
}

impl Pooled for Fragment {
    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.active = false;
        self.fading = false;
    }
}

/// Floating combat text
#[derive(Debug, Clone, Default, Serialize)]
pub struct DamageNumber {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub value: i32,
    pub color: u32,
    pub alpha: f32,
    pub age_ms: f64,
    pub lifetime_ms: f64,
}

impl DamageNumber {
    pub fn spawn<R: Rng>(&mut self, pos: Vec2, value: i32, color: u32, rng: &mut R) {
        let angle = rng.random::<f32>() * std::f32::consts::FRAC_PI_4 - std::f32::consts::PI / 8.0;
        let speed = 1.0 + rng.random::<f32>();

        self.active = true;
        self.pos = pos;
        self.value = value;
        self.color = color;
        self.alpha = 1.0;
        self.vel = Vec2::new(angle.cos() * speed, -2.0 - rng.random::<f32>());
        self.age_ms = 0.0;
        self.lifetime_ms = 800.0 + rng.random::<f64>() * 200.0;
    }

    pub fn update(&mut self, dt: f32) {
        self.age_ms += dt as f64 * 1000.0;
        if self.age_ms >= self.lifetime_ms {
            self.reset();
            return;
        }

        let scale = BASE_SPEED_MULTIPLIER * dt;
        self.pos += self.vel * scale;
        // Rising text slows under gravity
        self.vel.y += 0.1 * scale;

        let fade_from = self.lifetime_ms * 0.6;
        if self.age_ms > fade_from {
            self.alpha = (1.0 - (self.age_ms - fade_from) / (self.lifetime_ms * 0.4)) as f32;
        }
    }
}

impl Pooled for DamageNumber {
    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.active = false;
    }
}

/// A power-up lying in the arena
#[derive(Debug, Clone, Serialize)]
pub struct PowerUpPickup {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    pub spawn_time: f64,
    pub fading: bool,
}

impl PowerUpPickup {
    pub fn new(def: &PowerUpDef, pos: Vec2, now: f64) -> Self {
        Self {
            kind: def.kind,
            pos,
            vel: Vec2::ZERO,
            radius: def.radius,
            color: def.color,
            spawn_time: now,
            fading: false,
        }
    }

    /// Drift and age the pickup. Returns `false` once it has expired.
    pub fn update(&mut self, dt: f32, now: f64, player_pos: Vec2, items: &ItemTuning) -> bool {
        let age = now - self.spawn_time;
        if age > items.powerup_lifetime_ms {
            return false;
        }
        self.fading = age > items.powerup_lifetime_ms - items.fade_start_ms;

        magnet_pull(self.pos, &mut self.vel, player_pos, items, dt);
        self.pos += self.vel * BASE_SPEED_MULTIPLIER * dt;
        self.vel *= PICKUP_DRAG;
        true
    }
}
