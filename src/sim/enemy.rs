//! Enemy behavior engine
//!
//! Each enemy runs at most one ability state machine per tick. A handler
//! either seizes movement for the tick or lets the enemy fall back to
//! generic pursuit (or distance-band kiting for shooters). Spawns requested
//! mid-pass are queued and appended after the loop so the collection is never
//! resized while it is being walked.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::archetype::{
    Ability, ArchetypeId, EnemyArchetype, LungeParams, MultiplyParams, MultishootParams,
    NullifyParams, ShooterParams, SlowFieldParams,
};
use super::entities::{ShotSpec, spawn_particles};
use super::player::Player;
use super::pool::Pools;
use super::state::GameState;
use crate::consts::*;
use crate::{angle_of, unit_from_angle};

/// Sub-state of an enemy's special ability
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AbilityPhase {
    Idle,
    /// Lunge wind-up, frozen in place
    Telegraphing { until_ms: f64 },
    Lunging { until_ms: f64, dir: Vec2 },
    /// Slow field charging up
    Charging { since_ms: f64 },
    FieldActive { until_ms: f64 },
    /// Boss volley in progress
    Attacking { wave: u32, last_wave_ms: f64 },
}

/// A live enemy. Stats are copied from the archetype at spawn.
#[derive(Debug, Clone, Serialize)]
pub struct Enemy {
    pub id: u32,
    pub archetype: ArchetypeId,
    pub pos: Vec2,
    pub radius: f32,
    /// Legacy per-frame speed units
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    pub damage: i32,
    pub color: u32,
    pub value: u32,
    pub fragment_count: u32,
    pub is_boss: bool,
    /// Remaining shield, `None` once broken or if the archetype has none
    pub shield: Option<f32>,
    pub ability: Ability,
    pub phase: AbilityPhase,
    pub last_special_ms: f64,
    pub last_shot_ms: f64,
    pub last_lunge_ms: f64,
    pub last_reposition_ms: f64,
    pub reposition_target: Option<Vec2>,
    pub offspring: u32,
    pub was_hit: bool,
    pub hit_ms: f64,
    /// Removal marker; inactive enemies are filtered out after collisions
    pub active: bool,
}

/// Result of a projectile striking an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Shield soaked the damage
    Shielded,
    /// Shield soaked the damage and broke
    ShieldBroken,
    Wounded,
    Killed,
}

impl Enemy {
    pub fn from_archetype<R: Rng>(
        id: u32,
        arch: &EnemyArchetype,
        pos: Vec2,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let last_shot_ms = match arch.ability {
            Ability::Shoot(_) | Ability::RangedShoot(_) => now + SHOOTER_FIRST_SHOT_DELAY_MS,
            Ability::Multishoot(_) => now + BOSS_FIRST_SHOT_DELAY_MS,
            _ => 0.0,
        };
        Self {
            id,
            archetype: arch.id,
            pos,
            radius: arch.radius,
            speed: arch.speed,
            health: arch.health,
            max_health: arch.health,
            damage: arch.damage,
            color: arch.color,
            value: arch.value,
            fragment_count: arch.fragment_count.max(1),
            is_boss: arch.is_boss,
            shield: arch.shield,
            ability: arch.ability,
            phase: AbilityPhase::Idle,
            last_special_ms: now + rng.random::<f64>() * FIRST_SPECIAL_JITTER_MS,
            last_shot_ms,
            last_lunge_ms: f64::NEG_INFINITY,
            last_reposition_ms: 0.0,
            reposition_target: None,
            offspring: 0,
            was_hit: false,
            hit_ms: 0.0,
            active: true,
        }
    }

    pub fn clamp_to(&mut self, arena: Vec2) {
        self.pos.x = self.pos.x.clamp(self.radius, arena.x - self.radius);
        self.pos.y = self.pos.y.clamp(self.radius, arena.y - self.radius);
    }

    /// Apply projectile damage, shield first
    pub fn take_hit(&mut self, damage: f32, now: f64) -> HitOutcome {
        if let Some(shield) = self.shield {
            let left = shield - damage;
            if left <= 0.0 {
                self.shield = None;
                return HitOutcome::ShieldBroken;
            }
            self.shield = Some(left);
            return HitOutcome::Shielded;
        }

        self.health -= damage;
        self.was_hit = true;
        self.hit_ms = now;
        if self.health <= 0.0 {
            HitOutcome::Killed
        } else {
            HitOutcome::Wounded
        }
    }

    #[cfg(test)]
    pub fn test_dummy(id: u32, pos: Vec2) -> Self {
        let catalog = super::archetype::EnemyCatalog::default();
        let mut rng = <Pcg32 as rand::SeedableRng>::seed_from_u64(0);
        let mut enemy = Self::from_archetype(id, &catalog.compounder_offspring, pos, 0.0, &mut rng);
        enemy.last_special_ms = 0.0;
        enemy
    }
}

/// Add an enemy of the given archetype, clamped into the arena. Returns its id.
pub fn spawn_enemy(state: &mut GameState, archetype: ArchetypeId, pos: Vec2) -> u32 {
    let arch = *state.tuning.enemies.get(archetype);
    let id = state.next_entity_id();
    let mut enemy = Enemy::from_archetype(id, &arch, pos, state.time_ms, &mut state.rng);
    enemy.clamp_to(state.arena());
    state.enemies.push(enemy);
    id
}

/// Spawn by archetype name. Unknown names log and spawn nothing.
pub fn spawn_enemy_by_name(state: &mut GameState, name: &str, pos: Vec2) -> Option<u32> {
    match ArchetypeId::from_name(name) {
        Ok(archetype) => Some(spawn_enemy(state, archetype, pos)),
        Err(err) => {
            log::error!("Cannot spawn enemy: {err}");
            None
        }
    }
}

/// Whether an ability handler took over movement this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Seized,
    Free,
}

/// Borrowed slices of the state an ability handler may touch
struct Ctx<'a> {
    now: f64,
    dt: f32,
    player: &'a mut Player,
    pools: &'a mut Pools,
    rng: &'a mut Pcg32,
    slow_factor: &'a mut f32,
    /// Enemies alive plus spawns queued this pass
    enemy_count: usize,
    max_enemies: usize,
    spawns: Vec<(ArchetypeId, Vec2)>,
}

impl Ctx<'_> {
    fn queue_spawn(&mut self, archetype: ArchetypeId, pos: Vec2) {
        self.spawns.push((archetype, pos));
        self.enemy_count += 1;
    }

    /// Per-frame displacement for a legacy speed value
    fn step(&self, speed: f32) -> f32 {
        speed * BASE_SPEED_MULTIPLIER * self.dt
    }
}

/// Advance every active enemy one tick
pub fn update_enemies(state: &mut GameState, dt: f32) {
    let arena = state.arena();
    let hit_flash_ms = state.tuning.levels.hit_flash_ms;
    let GameState {
        enemies,
        player,
        pools,
        rng,
        player_slow_factor,
        tuning,
        time_ms,
        ..
    } = state;

    let mut ctx = Ctx {
        now: *time_ms,
        dt,
        player,
        pools,
        rng,
        slow_factor: player_slow_factor,
        enemy_count: enemies.len(),
        max_enemies: tuning.levels.max_total_enemies,
        spawns: Vec::new(),
    };

    for enemy in enemies.iter_mut().filter(|e| e.active) {
        let to_player = ctx.player.pos - enemy.pos;
        let dist = to_player.length();

        let control = match enemy.ability {
            Ability::Lunge(p) => lunge(enemy, &p, &mut ctx, to_player, dist),
            Ability::SlowField(p) => slow_field(enemy, &p, &mut ctx, dist),
            Ability::Multishoot(p) => multishoot(enemy, &p, &mut ctx, to_player),
            Ability::Nullify(p) => nullify(enemy, &p, &mut ctx, dist),
            Ability::Multiply(p) => multiply(enemy, &p, &mut ctx),
            Ability::Shoot(_)
            | Ability::RangedShoot(_)
            | Ability::ExplodeBurst(_)
            | Ability::None => Control::Free,
        };

        if control == Control::Free && dist > 0.0 {
            match enemy.ability {
                Ability::Shoot(p) | Ability::RangedShoot(p) => kite(enemy, &p, &mut ctx, to_player, dist),
                _ => enemy.pos += to_player / dist * ctx.step(enemy.speed),
            }
        }

        enemy.clamp_to(arena);

        match enemy.ability {
            Ability::Shoot(p) => {
                if shooter_ready(enemy, &p, ctx.now, dist) {
                    let jitter = ctx.rng.random::<f32>() * SNIPER_INACCURACY * 2.0 - SNIPER_INACCURACY;
                    fire_spread(enemy, &p, &mut ctx, &[jitter]);
                }
            }
            Ability::RangedShoot(p) => {
                if shooter_ready(enemy, &p, ctx.now, dist) {
                    fire_spread(enemy, &p, &mut ctx, &[-RANGED_SPREAD, 0.0, RANGED_SPREAD]);
                }
            }
            _ => {}
        }

        if enemy.was_hit && ctx.now - enemy.hit_ms > hit_flash_ms {
            enemy.was_hit = false;
        }
    }

    let spawns = std::mem::take(&mut ctx.spawns);
    for (archetype, pos) in spawns {
        spawn_enemy(state, archetype, pos);
    }
}

fn lunge(enemy: &mut Enemy, p: &LungeParams, ctx: &mut Ctx<'_>, to_player: Vec2, dist: f32) -> Control {
    let lunge_step = ctx.step(enemy.speed) * p.speed_mult;
    match enemy.phase {
        AbilityPhase::Lunging { until_ms, dir } => {
            if ctx.now > until_ms {
                enemy.phase = AbilityPhase::Idle;
                Control::Free
            } else {
                enemy.pos += dir * lunge_step;
                Control::Seized
            }
        }
        AbilityPhase::Telegraphing { until_ms } => {
            if ctx.now > until_ms {
                let dir = unit_from_angle(angle_of(to_player));
                enemy.phase = AbilityPhase::Lunging {
                    until_ms: ctx.now + p.duration_ms,
                    dir,
                };
                enemy.pos += dir * lunge_step;
            }
            Control::Seized
        }
        _ => {
            if dist < p.trigger_range && ctx.now - enemy.last_lunge_ms > p.cooldown_ms {
                enemy.phase = AbilityPhase::Telegraphing {
                    until_ms: ctx.now + p.telegraph_ms,
                };
                enemy.last_lunge_ms = ctx.now;
                spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, enemy.color, 6, 1.5, 2.0);
                log::debug!("Enemy {} telegraphing lunge", enemy.id);
                Control::Seized
            } else {
                Control::Free
            }
        }
    }
}

fn slow_field(enemy: &mut Enemy, p: &SlowFieldParams, ctx: &mut Ctx<'_>, dist: f32) -> Control {
    match enemy.phase {
        AbilityPhase::Charging { since_ms } => {
            if ctx.now - since_ms > p.charge_ms {
                enemy.phase = AbilityPhase::FieldActive {
                    until_ms: ctx.now + p.duration_ms,
                };
                spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, enemy.color, 25, 3.0, 5.0);
                log::debug!("Enemy {} slow field active", enemy.id);
            }
        }
        AbilityPhase::FieldActive { until_ms } => {
            if ctx.now > until_ms {
                enemy.phase = AbilityPhase::Idle;
            } else if dist < p.radius {
                *ctx.slow_factor = ctx.slow_factor.min(p.factor);
            }
        }
        _ => {
            if ctx.now - enemy.last_special_ms > p.cooldown_ms && dist < p.activation_range {
                enemy.phase = AbilityPhase::Charging { since_ms: ctx.now };
                enemy.last_special_ms = ctx.now;
                spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, enemy.color, 10, 1.0, 2.0);
            }
        }
    }
    Control::Free
}

fn multishoot(enemy: &mut Enemy, p: &MultishootParams, ctx: &mut Ctx<'_>, to_player: Vec2) -> Control {
    if !matches!(enemy.phase, AbilityPhase::Attacking { .. }) && ctx.now - enemy.last_shot_ms > p.fire_rate_ms {
        enemy.phase = AbilityPhase::Attacking {
            wave: 0,
            // Fire the first wave immediately
            last_wave_ms: ctx.now - p.burst_delay_ms,
        };
        enemy.last_shot_ms = ctx.now;
    }

    if let AbilityPhase::Attacking { wave, last_wave_ms } = enemy.phase {
        if ctx.now - last_wave_ms >= p.burst_delay_ms {
            let base = angle_of(to_player) + wave as f32 * p.wave_rotation;
            let step = std::f32::consts::TAU / p.burst_count as f32;
            for i in 0..p.burst_count {
                let dir = unit_from_angle(base + step * i as f32);
                let Some(proj) = ctx.pools.enemy_projectiles.acquire() else {
                    log::debug!("Boss volley wave {} cut short", wave + 1);
                    break;
                };
                proj.spawn(ShotSpec {
                    pos: enemy.pos + dir * enemy.radius,
                    radius: BOSS_SHOT_RADIUS,
                    color: ENEMY_PROJECTILE_COLOR,
                    direction: dir,
                    speed: p.projectile_speed,
                    damage: enemy.damage as f32,
                    piercing: false,
                    homing: false,
                });
            }
            spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, ENEMY_PROJECTILE_COLOR, 15, 3.0, 3.0);

            let next = wave + 1;
            enemy.phase = if next >= p.burst_waves {
                AbilityPhase::Idle
            } else {
                AbilityPhase::Attacking {
                    wave: next,
                    last_wave_ms: ctx.now,
                }
            };
        }
    }

    let summon_cap = ctx.max_enemies as f32 * p.summon_cap_fraction;
    if ctx.now - enemy.last_special_ms > p.summon_cooldown_ms
        && (ctx.enemy_count as f32) < summon_cap
        && ctx.rng.random::<f32>() < p.summon_chance
    {
        let offset = Vec2::new(
            ctx.rng.random_range(-40.0..40.0),
            ctx.rng.random_range(-40.0..40.0),
        );
        ctx.queue_spawn(p.summon, enemy.pos + offset);
        enemy.last_special_ms = ctx.now;
        log::debug!("Boss {} summoned a {}", enemy.id, p.summon.as_str());
    }

    Control::Free
}

fn nullify(enemy: &mut Enemy, p: &NullifyParams, ctx: &mut Ctx<'_>, dist: f32) -> Control {
    if ctx.now - enemy.last_special_ms <= p.cooldown_ms || dist >= p.range {
        return Control::Free;
    }
    let running = ctx.player.power_ups.running(ctx.now);
    if running.is_empty() {
        return Control::Free;
    }

    let kind = running[ctx.rng.random_range(0..running.len())];
    if let Some(timer) = ctx.player.power_ups.get_mut(kind) {
        timer.end_ms = ctx.now.max(timer.end_ms - p.amount_ms);
    }

    let toward_enemy = unit_from_angle(angle_of(enemy.pos - ctx.player.pos));
    let spark = ctx.player.pos + toward_enemy * ctx.player.radius;
    spawn_particles(&mut ctx.pools.particles, ctx.rng, spark, WHITE, 10, 4.0, 2.0);
    enemy.last_special_ms = ctx.now;
    log::debug!("Enemy {} nullified {}", enemy.id, kind.as_str());
    Control::Free
}

fn multiply(enemy: &mut Enemy, p: &MultiplyParams, ctx: &mut Ctx<'_>) -> Control {
    if ctx.now - enemy.last_special_ms <= p.cooldown_ms {
        return Control::Free;
    }

    let can_multiply = enemy.offspring < p.max_offspring
        && ctx.rng.random::<f32>() < p.chance
        && ctx.enemy_count + 1 < ctx.max_enemies;

    if can_multiply {
        let angle = ctx.rng.random::<f32>() * std::f32::consts::TAU;
        let pos = enemy.pos + unit_from_angle(angle) * enemy.radius * 3.0;
        ctx.queue_spawn(ArchetypeId::CompounderOffspring, pos);
        enemy.offspring += 1;
        enemy.last_special_ms = ctx.now;
        spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, enemy.color, 20, 3.0, 3.0);
        spawn_particles(&mut ctx.pools.particles, ctx.rng, pos, enemy.color, 15, 2.0, 2.0);
        log::debug!("Enemy {} multiplied ({} offspring)", enemy.id, enemy.offspring);
    } else {
        // Retry later with jitter so a crowd of compounders does not roll in lockstep
        enemy.last_special_ms = ctx.now + ctx.rng.random::<f64>() * p.retry_jitter_ms;
    }
    Control::Free
}

/// Hold the preferred distance band: flee, close in, reposition or strafe
fn kite(enemy: &mut Enemy, p: &ShooterParams, ctx: &mut Ctx<'_>, to_player: Vec2, dist: f32) {
    let step = ctx.step(enemy.speed);
    let toward = to_player / dist;

    if dist < p.flee_distance {
        enemy.pos -= toward * step;
    } else if dist > p.max_distance && dist > p.min_distance {
        enemy.pos += toward * step * 0.8;
    } else if dist >= p.min_distance {
        if ctx.now - enemy.last_reposition_ms > p.reposition_cooldown_ms {
            let angle = ctx.rng.random::<f32>() * std::f32::consts::TAU;
            let reach = 50.0 + ctx.rng.random::<f32>() * 50.0;
            enemy.reposition_target = Some(enemy.pos + unit_from_angle(angle) * reach);
            enemy.last_reposition_ms = ctx.now;
        }

        match enemy.reposition_target {
            Some(target) => {
                let delta = target - enemy.pos;
                let remaining = delta.length();
                if remaining > step {
                    enemy.pos += delta / remaining * step * 0.6;
                } else {
                    enemy.reposition_target = None;
                }
            }
            None => {
                let perp = Vec2::new(-toward.y, toward.x);
                let side = if (ctx.now * 0.0005).sin() > 0.0 { 1.0 } else { -1.0 };
                enemy.pos += perp * side * step * 0.5;
            }
        }
    }
}

fn shooter_ready(enemy: &Enemy, p: &ShooterParams, now: f64, dist: f32) -> bool {
    now - enemy.last_shot_ms > p.fire_rate_ms && dist < p.max_distance * SHOOTER_RANGE_FACTOR
}

/// Fire one projectile per angular offset from the line to the player
fn fire_spread(enemy: &mut Enemy, p: &ShooterParams, ctx: &mut Ctx<'_>, offsets: &[f32]) {
    let base = angle_of(ctx.player.pos - enemy.pos);
    for offset in offsets {
        let dir = unit_from_angle(base + offset);
        let Some(proj) = ctx.pools.enemy_projectiles.acquire() else {
            break;
        };
        proj.spawn(ShotSpec {
            pos: enemy.pos + dir * enemy.radius,
            radius: ENEMY_SHOT_RADIUS,
            color: p.projectile_color,
            direction: dir,
            speed: p.projectile_speed,
            damage: enemy.damage as f32,
            piercing: false,
            homing: false,
        });
    }
    let count = if offsets.len() > 1 { 8 } else { 3 };
    spawn_particles(&mut ctx.pools.particles, ctx.rng, enemy.pos, p.projectile_color, count, 2.0, 2.0);
    enemy.last_shot_ms = ctx.now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::archetype::PowerUpKind;
    use crate::sim::player::PowerUpTimer;

    fn state_with(archetype: ArchetypeId, pos: Vec2) -> (GameState, u32) {
        let mut state = GameState::new(5);
        let id = spawn_enemy(&mut state, archetype, pos);
        // Make specials ready immediately
        state.enemies[0].last_special_ms = f64::NEG_INFINITY;
        state.enemies[0].last_shot_ms = f64::NEG_INFINITY;
        (state, id)
    }

    fn step(state: &mut GameState, ms: f64) {
        state.time_ms += ms;
        state.player_slow_factor = 1.0;
        update_enemies(state, (ms / 1000.0) as f32);
    }

    #[test]
    fn test_pursuit_moves_toward_player() {
        let (mut state, _) = state_with(ArchetypeId::CompounderOffspring, Vec2::new(100.0, 300.0));
        state.enemies[0].ability = Ability::None;
        step(&mut state, 1000.0 / 60.0);
        assert!((state.enemies[0].pos.x - 103.2).abs() < 1e-3);
    }

    #[test]
    fn test_spawn_clamps_into_arena() {
        let mut state = GameState::new(1);
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(-50.0, 900.0));
        assert_eq!(state.enemies[0].pos, Vec2::new(15.0, 585.0));
    }

    #[test]
    fn test_unknown_archetype_spawns_nothing() {
        let mut state = GameState::new(1);
        assert!(spawn_enemy_by_name(&mut state, "payday_lender", Vec2::ZERO).is_none());
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_lunge_cycle() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::DebtCollector, player - Vec2::new(40.0, 0.0));
        state.time_ms = 1000.0;

        step(&mut state, 16.0);
        assert!(matches!(state.enemies[0].phase, AbilityPhase::Telegraphing { .. }));
        let frozen = state.enemies[0].pos;
        step(&mut state, 16.0);
        assert_eq!(state.enemies[0].pos, frozen, "frozen while telegraphing");

        step(&mut state, 300.0);
        assert!(matches!(state.enemies[0].phase, AbilityPhase::Lunging { .. }));
        assert!(state.enemies[0].pos.x > frozen.x);

        step(&mut state, 250.0);
        assert_eq!(state.enemies[0].phase, AbilityPhase::Idle);

        // Cooldown blocks an immediate second lunge
        state.enemies[0].pos = player - Vec2::new(40.0, 0.0);
        step(&mut state, 16.0);
        assert_eq!(state.enemies[0].phase, AbilityPhase::Idle);
    }

    #[test]
    fn test_overlapping_slow_fields_take_minimum() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::LoanShark, player + Vec2::new(30.0, 0.0));
        spawn_enemy(&mut state, ArchetypeId::LoanShark, player - Vec2::new(30.0, 0.0));
        if let Ability::SlowField(ref mut p) = state.enemies[1].ability {
            p.factor = 0.4;
        }
        for enemy in &mut state.enemies {
            enemy.phase = AbilityPhase::FieldActive { until_ms: 10_000.0 };
        }
        step(&mut state, 16.0);
        assert_eq!(state.player_slow_factor, 0.4);
    }

    #[test]
    fn test_slow_field_charges_then_activates() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::LoanShark, player + Vec2::new(60.0, 0.0));
        state.time_ms = 10_000.0;
        step(&mut state, 16.0);
        assert!(matches!(state.enemies[0].phase, AbilityPhase::Charging { .. }));
        step(&mut state, 1100.0);
        assert!(matches!(state.enemies[0].phase, AbilityPhase::FieldActive { .. }));
    }

    #[test]
    fn test_boss_volley_fires_all_waves() {
        let (mut state, _) = state_with(ArchetypeId::BossCreditor, Vec2::new(100.0, 100.0));
        state.enemies[0].last_special_ms = f64::INFINITY;
        state.time_ms = 5000.0;
        step(&mut state, 16.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 8);
        step(&mut state, 210.0);
        step(&mut state, 210.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 24);
        assert_eq!(state.enemies[0].phase, AbilityPhase::Idle);
    }

    #[test]
    fn test_nullify_shortens_running_power_up() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::AssetSeizer, player + Vec2::new(50.0, 0.0));
        state.time_ms = 1000.0;
        if let Some(t) = state.player.power_ups.get_mut(PowerUpKind::SpreadShot) {
            *t = PowerUpTimer {
                active: true,
                end_ms: 3000.0,
            };
        }
        step(&mut state, 16.0);
        let end = state.player.power_ups.get(PowerUpKind::SpreadShot).map(|t| t.end_ms);
        assert_eq!(end, Some(1016.0), "never cut below now");
    }

    #[test]
    fn test_multiply_respects_offspring_cap() {
        let (mut state, _) = state_with(ArchetypeId::InterestCompounder, Vec2::new(100.0, 100.0));
        if let Ability::Multiply(ref mut p) = state.enemies[0].ability {
            p.chance = 1.0;
            p.cooldown_ms = 0.0;
        }
        for _ in 0..10 {
            state.enemies[0].last_special_ms = f64::NEG_INFINITY;
            step(&mut state, 16.0);
        }
        let offspring = state
            .enemies
            .iter()
            .filter(|e| e.archetype == ArchetypeId::CompounderOffspring)
            .count();
        assert_eq!(offspring, 2);
        assert_eq!(state.enemies[0].offspring, 2);
    }

    #[test]
    fn test_multiply_respects_global_cap() {
        let (mut state, _) = state_with(ArchetypeId::InterestCompounder, Vec2::new(100.0, 100.0));
        if let Ability::Multiply(ref mut p) = state.enemies[0].ability {
            p.chance = 1.0;
        }
        for _ in 0..18 {
            spawn_enemy(&mut state, ArchetypeId::DebtSniper, Vec2::new(700.0, 500.0));
        }
        step(&mut state, 16.0);
        assert_eq!(state.enemies.len(), 19);
        assert!(state.enemies[0].last_special_ms >= state.time_ms);
    }

    #[test]
    fn test_sniper_fires_single_shot_in_range() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::DebtSniper, player + Vec2::new(200.0, 0.0));
        step(&mut state, 16.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 1);
        step(&mut state, 16.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 1);
    }

    #[test]
    fn test_hedge_fund_fires_three_shot_spread() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::HedgeFund, player + Vec2::new(0.0, 200.0));
        step(&mut state, 16.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 3);
    }

    #[test]
    fn test_shooter_out_of_range_holds_fire() {
        let (mut state, _) = state_with(ArchetypeId::DebtSniper, Vec2::new(20.0, 20.0));
        step(&mut state, 16.0);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 0);
    }

    #[test]
    fn test_kiting_shooter_flees_when_close() {
        let player = Vec2::new(400.0, 300.0);
        let (mut state, _) = state_with(ArchetypeId::DebtSniper, player + Vec2::new(50.0, 0.0));
        step(&mut state, 16.0);
        assert!(state.enemies[0].pos.x > 450.0);
    }

    #[test]
    fn test_hit_flash_clears() {
        let (mut state, _) = state_with(ArchetypeId::DebtCollector, Vec2::new(100.0, 100.0));
        assert_eq!(state.enemies[0].take_hit(5.0, 0.0), HitOutcome::Wounded);
        step(&mut state, 100.0);
        assert!(state.enemies[0].was_hit);
        step(&mut state, 100.0);
        assert!(!state.enemies[0].was_hit);
    }

    #[test]
    fn test_shield_absorbs_first() {
        let mut enemy = Enemy::test_dummy(1, Vec2::ZERO);
        enemy.shield = Some(15.0);
        assert_eq!(enemy.take_hit(10.0, 0.0), HitOutcome::Shielded);
        assert_eq!(enemy.take_hit(10.0, 0.0), HitOutcome::ShieldBroken);
        assert_eq!(enemy.health, 15.0);
        assert_eq!(enemy.take_hit(15.0, 0.0), HitOutcome::Killed);
    }
}
