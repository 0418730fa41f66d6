//! Player avatar: movement, dash, firing, buffs and the score multiplier

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::{PowerUpDef, PowerUpKind};
use super::entities::{ShotSpec, spawn_particles};
use super::state::{GameEvent, GameState};
use super::tick::{Aim, TickInput};
use crate::consts::*;
use crate::tuning::PlayerTuning;
use crate::{angle_of, unit_from_angle};

/// Minimum stick deflection that counts as directional intent
const INPUT_DEADZONE: f32 = 0.1;

/// On/off state of one timed power-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUpTimer {
    pub active: bool,
    pub end_ms: f64,
}

/// Fixed table of timed power-ups, indexed by [`PowerUpKind::timer_slot`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUpTimers {
    slots: [PowerUpTimer; PowerUpKind::TIMED.len()],
}

impl PowerUpTimers {
    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.get(kind).is_some_and(|t| t.active)
    }

    pub fn get(&self, kind: PowerUpKind) -> Option<&PowerUpTimer> {
        kind.timer_slot().map(|i| &self.slots[i])
    }

    pub fn get_mut(&mut self, kind: PowerUpKind) -> Option<&mut PowerUpTimer> {
        kind.timer_slot().map(|i| &mut self.slots[i])
    }

    /// Timed kinds currently running with time left at `now`
    pub fn running(&self, now: f64) -> Vec<PowerUpKind> {
        PowerUpKind::TIMED
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_some_and(|t| t.active && t.end_ms > now))
            .collect()
    }

    /// Turn off every timer whose end has passed. Returns the kinds that expired.
    pub fn expire(&mut self, now: f64) -> Vec<PowerUpKind> {
        let mut expired = Vec::new();
        for (slot, kind) in self.slots.iter_mut().zip(PowerUpKind::TIMED) {
            if slot.active && now > slot.end_ms {
                slot.active = false;
                expired.push(kind);
            }
        }
        expired
    }
}

/// Temporary stat penalty with the values to restore afterwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Debuff {
    pub until_ms: f64,
    pub original_damage: f32,
    pub original_speed: f32,
}

/// Dash in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dash {
    pub until_ms: f64,
    pub dir: Vec2,
}

/// The player avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub radius: f32,
    /// Legacy per-frame speed units
    pub speed: f32,
    pub health: i32,
    pub max_health: i32,
    pub score: u64,
    pub fire_rate_ms: f64,
    pub last_fired_ms: f64,
    pub projectile_speed: f32,
    pub damage: f32,
    /// Unit facing / aim direction
    pub direction: Vec2,
    pub invulnerable: bool,
    pub invulnerable_until_ms: f64,
    pub multiplier: f32,
    pub last_fragment_ms: f64,
    pub bombs: u32,
    pub last_bomb_ms: f64,
    pub last_homing_ms: f64,
    pub dash: Option<Dash>,
    pub last_dash_ms: f64,
    pub debuff: Option<Debuff>,
    pub power_ups: PowerUpTimers,
}

impl Player {
    pub fn new(arena: Vec2, tuning: &PlayerTuning) -> Self {
        Self {
            pos: arena / 2.0,
            radius: PLAYER_RADIUS,
            speed: PLAYER_SPEED,
            health: PLAYER_HEALTH,
            max_health: PLAYER_HEALTH,
            score: 0,
            fire_rate_ms: PLAYER_FIRE_RATE_MS,
            last_fired_ms: f64::NEG_INFINITY,
            projectile_speed: PLAYER_PROJECTILE_SPEED,
            damage: PLAYER_DAMAGE,
            direction: Vec2::Y,
            invulnerable: false,
            invulnerable_until_ms: 0.0,
            multiplier: 1.0,
            last_fragment_ms: 0.0,
            bombs: tuning.starting_bombs,
            last_bomb_ms: f64::NEG_INFINITY,
            last_homing_ms: f64::NEG_INFINITY,
            dash: None,
            last_dash_ms: f64::NEG_INFINITY,
            debuff: None,
            power_ups: PowerUpTimers::default(),
        }
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.is_some()
    }

    /// Keep the avatar fully inside the arena
    pub fn clamp_to(&mut self, arena: Vec2) {
        self.pos.x = self.pos.x.clamp(self.radius, arena.x - self.radius);
        self.pos.y = self.pos.y.clamp(self.radius, arena.y - self.radius);
    }

    /// Grant invulnerability through `until`, never shortening an existing window
    pub fn make_invulnerable(&mut self, until: f64) {
        self.invulnerable = true;
        self.invulnerable_until_ms = self.invulnerable_until_ms.max(until);
    }

    /// Scale damage and speed for `duration_ms`. Reapplying while a debuff is
    /// running keeps the first set of originals so penalties never compound.
    pub fn apply_debuff(&mut self, damage_factor: f32, speed_factor: f32, duration_ms: f64, now: f64) {
        let (original_damage, original_speed) = match self.debuff {
            Some(d) => (d.original_damage, d.original_speed),
            None => (self.damage, self.speed),
        };
        self.damage = original_damage * damage_factor;
        self.speed = original_speed * speed_factor;
        self.debuff = Some(Debuff {
            until_ms: now + duration_ms,
            original_damage,
            original_speed,
        });
    }

    /// Restore stats once the debuff window has passed
    pub fn revert_expired_debuff(&mut self, now: f64) {
        if let Some(d) = self.debuff {
            if now > d.until_ms {
                self.damage = d.original_damage;
                self.speed = d.original_speed;
                self.debuff = None;
            }
        }
    }

    /// Apply a collected power-up
    pub fn activate_power_up(&mut self, def: &PowerUpDef, now: f64) {
        match self.power_ups.get_mut(def.kind) {
            Some(timer) => {
                timer.active = true;
                timer.end_ms = now + def.duration_ms;
            }
            None => self.heal(1),
        }
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Bump the multiplier from a fragment pickup, capped at `max`
    pub fn collect_fragment(&mut self, value: f32, now: f64, max: f32) {
        self.multiplier = (self.multiplier + value).clamp(1.0, max);
        self.last_fragment_ms = now;
    }

    /// Current shot damage including double damage
    pub fn shot_damage(&self) -> f32 {
        if self.power_ups.is_active(PowerUpKind::DoubleDamage) {
            self.damage * 2.0
        } else {
            self.damage
        }
    }

    /// Fire interval, halved under rapid fire
    pub fn effective_fire_rate(&self) -> f64 {
        if self.power_ups.is_active(PowerUpKind::RapidFire) {
            self.fire_rate_ms / 2.0
        } else {
            self.fire_rate_ms
        }
    }
}

/// Advance the avatar one tick: debuffs, dash, movement, aim, invulnerability
pub fn update_player(state: &mut GameState, input: &TickInput, dt: f32) {
    let now = state.time_ms;
    let arena = state.arena();
    let slow = state.player_slow_factor;

    state.player.revert_expired_debuff(now);

    let player = &mut state.player;
    let mut speed = player.speed * BASE_SPEED_MULTIPLIER;
    if player.power_ups.is_active(PowerUpKind::SpeedBoost) {
        speed *= SPEED_BOOST_FACTOR;
    }
    speed *= slow;

    let mut aim_angle = angle_of(player.direction);
    let mut dash_ended = None;

    if let Some(dash) = player.dash {
        if now > dash.until_ms {
            player.dash = None;
            dash_ended = Some(player.pos);
        } else {
            let dash_speed = state.tuning.player.dash_distance
                / (state.tuning.player.dash_duration_ms as f32 / 1000.0);
            player.pos += dash.dir * dash_speed * dt;
        }
    }

    if !player.is_dashing() {
        if let Aim::Angle(angle) = input.aim {
            aim_angle = angle;
        }
        if input.move_dir.length() > 0.0 {
            player.pos += input.move_dir.normalize() * speed * dt;
        }
    }

    if let Aim::Toward(target) = input.aim {
        if target != player.pos {
            aim_angle = angle_of(target - player.pos);
        }
    }

    player.clamp_to(arena);
    player.direction = unit_from_angle(aim_angle);

    if player.invulnerable && now > player.invulnerable_until_ms {
        player.invulnerable = false;
    }

    if let Some(pos) = dash_ended {
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, 0x3498db, 10, 2.0, 2.0);
    }
}

/// Start a dash. Returns `false` with no side effects while a dash is running
/// or the cooldown has not elapsed.
pub fn trigger_dash(state: &mut GameState, move_dir: Vec2) -> bool {
    let now = state.time_ms;
    let tuning = &state.tuning.player;
    let player = &mut state.player;

    if player.is_dashing() || now - player.last_dash_ms < tuning.dash_cooldown_ms {
        return false;
    }

    let dir = if move_dir.length() > INPUT_DEADZONE {
        move_dir.normalize()
    } else {
        player.direction
    };

    player.dash = Some(Dash {
        until_ms: now + tuning.dash_duration_ms,
        dir,
    });
    player.last_dash_ms = now;
    player.make_invulnerable(now + tuning.dash_invulnerability_ms);

    let trail = player.pos - dir * player.radius;
    spawn_particles(&mut state.pools.particles, &mut state.rng, trail, PLAYER_SHOT_COLOR, 15, 3.0, 2.0);
    state.events.push(GameEvent::DashStarted);
    log::debug!("Player dashed toward ({:.2}, {:.2})", dir.x, dir.y);
    true
}

/// Fire if the trigger is held and the fire interval has elapsed
pub fn fire_if_needed(state: &mut GameState, fire_held: bool) {
    if fire_held && state.time_ms - state.player.last_fired_ms > state.player.effective_fire_rate() {
        fire_projectile(state);
    }
}

/// Spawn the player's shot pattern. Spread, piercing and homing stack.
pub fn fire_projectile(state: &mut GameState) {
    let now = state.time_ms;
    let player = &state.player;
    let angle = angle_of(player.direction);
    let muzzle = player.pos + player.direction * player.radius;
    let damage = player.shot_damage();
    let double = player.power_ups.is_active(PowerUpKind::DoubleDamage);
    let piercing = player.power_ups.is_active(PowerUpKind::PiercingShot);
    let spread = player.power_ups.is_active(PowerUpKind::SpreadShot);
    let homing = player.power_ups.is_active(PowerUpKind::HomingMissile);
    let base_color = if double { DOUBLE_DAMAGE_COLOR } else { PLAYER_SHOT_COLOR };
    let speed = player.projectile_speed;

    if spread {
        let half = SPREAD_SHOTS / 2;
        for i in -half..=half {
            let Some(proj) = state.pools.projectiles.acquire() else {
                break;
            };
            proj.spawn(ShotSpec {
                pos: muzzle,
                radius: PLAYER_SHOT_RADIUS,
                color: base_color,
                direction: unit_from_angle(angle + SPREAD_ANGLE * i as f32),
                speed,
                damage: damage * SPREAD_DAMAGE_FACTOR,
                piercing,
                homing: false,
            });
        }
        spawn_particles(&mut state.pools.particles, &mut state.rng, muzzle, PLAYER_SHOT_COLOR, 5, 2.0, 2.5);
    } else {
        if let Some(proj) = state.pools.projectiles.acquire() {
            proj.spawn(ShotSpec {
                pos: muzzle,
                radius: if piercing { PIERCING_SHOT_RADIUS } else { PLAYER_SHOT_RADIUS },
                color: if piercing { PIERCING_COLOR } else { base_color },
                direction: unit_from_angle(angle),
                speed,
                damage,
                piercing,
                homing: false,
            });
        }
        let flash = if piercing { PIERCING_COLOR } else { 0xf1c40f };
        spawn_particles(&mut state.pools.particles, &mut state.rng, muzzle, flash, 3, 1.5, 2.0);
    }

    state.player.last_fired_ms = now;
    state.events.push(GameEvent::Shot);

    let tuning = &state.tuning.player;
    if homing && now - state.player.last_homing_ms > tuning.homing_fire_rate_ms {
        let color = state
            .tuning
            .power_ups
            .get(PowerUpKind::HomingMissile)
            .map_or(0x1abc9c, |d| d.color);
        if let Some(proj) = state.pools.projectiles.acquire() {
            proj.spawn(ShotSpec {
                pos: muzzle,
                radius: HOMING_SHOT_RADIUS,
                color,
                direction: unit_from_angle(angle),
                speed: tuning.homing_speed,
                damage: tuning.homing_damage,
                piercing: false,
                homing: true,
            });
        }
        state.player.last_homing_ms = now;
        spawn_particles(&mut state.pools.particles, &mut state.rng, muzzle, color, 4, 2.0, 1.5);
    }
}

/// Decay the multiplier toward 1.0 once the collection grace period has passed
pub fn update_multiplier(state: &mut GameState, dt: f32) {
    let tuning = &state.tuning.player;
    let player = &mut state.player;
    if player.multiplier > 1.0 && state.time_ms - player.last_fragment_ms > tuning.multiplier_decay_delay_ms {
        player.multiplier = (player.multiplier - tuning.multiplier_decay_rate * dt).max(1.0);
    }
    player.multiplier = player.multiplier.clamp(1.0, tuning.max_multiplier);
}

/// Switch off timed power-ups whose end has passed
pub fn update_power_ups(state: &mut GameState) {
    for kind in state.player.power_ups.expire(state.time_ms) {
        log::debug!("Power-up expired: {}", kind.as_str());
    }
}
