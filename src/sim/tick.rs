//! Per-frame simulation tick
//!
//! Advances the whole game by one clamped step in a fixed subsystem order:
//! power-ups, enemies, player, pooled entities, multiplier, collisions and
//! finally the level-complete check.

use glam::Vec2;

use super::autopilot::autopilot_input;
use super::collision::resolve_collisions;
use super::director::{check_level_complete, next_level, start_game};
use super::enemy::update_enemies;
use super::entities::{HomingView, spawn_particles};
use super::player::{
    fire_if_needed, trigger_dash, update_multiplier, update_player, update_power_ups,
};
use super::state::{GameEvent, GamePhase, GameState};
use crate::error::SimError;

/// Where the player is aiming this tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Aim {
    /// Keep the current facing
    #[default]
    Hold,
    /// Face a point in arena coordinates (mouse cursor)
    Toward(Vec2),
    /// Face an absolute angle in radians (right stick). Ignored while dashing.
    Angle(f32),
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement intent, normalized by the player update
    pub move_dir: Vec2,
    pub aim: Aim,
    /// Fire held
    pub fire: bool,
    pub dash: bool,
    pub bomb: bool,
    /// Pause toggle
    pub pause: bool,
    /// Start or restart a run from the title or game-over screen
    pub start: bool,
    /// Demo mode - the autopilot plays the game
    pub autopilot: bool,
}

/// Advance the game state by one step of `dt` seconds.
///
/// A failing step is logged and ends the run rather than propagating.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        match state.phase {
            GamePhase::Playing | GamePhase::LevelComplete { .. } => {
                state.paused_from = state.phase;
                state.phase = GamePhase::Paused;
                log::info!("Game paused");
                return;
            }
            GamePhase::Paused => {
                state.phase = state.paused_from;
                log::info!("Game resumed");
            }
            _ => {}
        }
    }

    match state.phase {
        GamePhase::Start | GamePhase::GameOver => {
            if input.start {
                start_game(state);
            }
            return;
        }
        GamePhase::Paused => return,
        _ => {}
    }

    let demo;
    let input = if input.autopilot {
        demo = autopilot_input(state);
        &demo
    } else {
        input
    };

    if let Err(err) = try_tick(state, input, dt) {
        log::error!("Simulation step failed, ending run: {err}");
        state.enter_game_over();
    }
}

fn try_tick(state: &mut GameState, input: &TickInput, dt: f32) -> Result<(), SimError> {
    if !dt.is_finite() || dt < 0.0 {
        return Err(SimError::NonFiniteState("dt"));
    }

    state.time_ms += f64::from(dt) * 1000.0;
    state.frame_count += 1;
    state.player_slow_factor = 1.0;

    if input.dash {
        trigger_dash(state, input.move_dir);
    }
    if input.bomb {
        trigger_bomb(state);
    }

    match state.phase {
        GamePhase::Playing => {
            update_power_ups(state);
            update_enemies(state, dt);
            update_player(state, input, dt);
            update_pools(state, dt);
            update_multiplier(state, dt);
            resolve_collisions(state);
            check_level_complete(state);
        }
        GamePhase::LevelComplete { since_ms } => {
            update_power_ups(state);
            update_player(state, input, dt);
            update_pools(state, dt);
            update_multiplier(state, dt);
            resolve_collisions(state);
            if state.time_ms - since_ms >= state.tuning.levels.transition_delay_ms {
                next_level(state);
            }
        }
        _ => return Ok(()),
    }

    if !state.is_over() {
        fire_if_needed(state, input.fire);
    }

    check_finite(state)
}

/// Move every pooled entity and the loose power-up pickups
fn update_pools(state: &mut GameState, dt: f32) {
    let now = state.time_ms;
    let arena = state.arena();
    let player_pos = state.player.pos;
    let items = &state.tuning.items;
    let homing = HomingView {
        enemies: &state.enemies,
        turn_rate: state.tuning.player.homing_turn_rate,
        acquire_range: state.tuning.player.homing_acquire_range,
    };

    let pools = &mut state.pools;
    pools
        .projectiles
        .update_all(|p| p.update(dt, arena, Some(&homing)));
    pools
        .enemy_projectiles
        .update_all(|p| p.update(dt, arena, None));
    pools.particles.update_all(|p| p.update(dt));
    pools
        .fragments
        .update_all(|f| f.update(dt, now, player_pos, items));
    pools.damage_numbers.update_all(|d| d.update(dt));

    state
        .pickups
        .retain_mut(|p| p.update(dt, now, player_pos, items));
}

fn check_finite(state: &GameState) -> Result<(), SimError> {
    if !state.player.pos.is_finite() {
        return Err(SimError::NonFiniteState("player position"));
    }
    if !state.player.multiplier.is_finite() {
        return Err(SimError::NonFiniteState("multiplier"));
    }
    if state.enemies.iter().any(|e| !e.pos.is_finite()) {
        return Err(SimError::NonFiniteState("enemy position"));
    }
    Ok(())
}

/// Clear every non-boss enemy and every enemy projectile.
///
/// Returns `false` with no side effects when no bombs remain, the cooldown
/// has not elapsed, or the run is not in progress.
pub fn trigger_bomb(state: &mut GameState) -> bool {
    if !matches!(
        state.phase,
        GamePhase::Playing | GamePhase::LevelComplete { .. }
    ) {
        return false;
    }
    let now = state.time_ms;
    let player = &mut state.player;
    if player.bombs == 0 || now - player.last_bomb_ms <= state.tuning.player.bomb_cooldown_ms {
        return false;
    }
    player.bombs -= 1;
    player.last_bomb_ms = now;

    let particles = &mut state.pools.particles;
    let rng = &mut state.rng;
    let mut cleared = 0;
    for enemy in state.enemies.iter_mut().filter(|e| e.active) {
        if enemy.is_boss {
            spawn_particles(particles, rng, enemy.pos, enemy.color, 20, 4.0, 4.0);
        } else {
            spawn_particles(particles, rng, enemy.pos, enemy.color, 30, 6.0, 5.0);
            enemy.active = false;
            cleared += 1;
        }
    }
    state.enemies.retain(|e| e.active);

    let shots: Vec<(usize, Vec2, u32)> = state
        .pools
        .enemy_projectiles
        .iter_active()
        .map(|(idx, p)| (idx, p.pos, p.color))
        .collect();
    for (idx, pos, color) in shots {
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, color, 10, 3.0, 3.0);
        state.pools.enemy_projectiles.release(idx);
    }

    state.events.push(GameEvent::BombDetonated { cleared });
    log::info!(
        "Bomb detonated: cleared {} enemies, {} bombs left, {} bosses remain",
        cleared,
        state.player.bombs,
        state.enemies.len()
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::archetype::ArchetypeId;
    use crate::sim::enemy::spawn_enemy;
    use crate::sim::entities::ShotSpec;

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        tick(
            &mut state,
            &TickInput {
                start: true,
                ..Default::default()
            },
            NOMINAL_DT,
        );
        assert_eq!(state.phase, GamePhase::Playing);
        state
    }

    fn empty_arena(seed: u64) -> GameState {
        let mut state = playing(seed);
        state.enemies.clear();
        state.phase = GamePhase::Playing;
        state
    }

    fn enemy_shot(state: &mut GameState, pos: Vec2) {
        if let Some(p) = state.pools.enemy_projectiles.acquire() {
            p.spawn(ShotSpec {
                pos,
                radius: ENEMY_SHOT_RADIUS,
                color: ENEMY_PROJECTILE_COLOR,
                direction: Vec2::Y,
                speed: 3.0,
                damage: 1.0,
                piercing: false,
                homing: false,
            });
        }
    }

    #[test]
    fn test_start_input_begins_run() {
        let mut state = GameState::new(3);
        tick(&mut state, &TickInput::default(), NOMINAL_DT);
        assert_eq!(state.phase, GamePhase::Start);
        assert_eq!(state.frame_count, 0);

        let state = playing(3);
        assert_eq!(state.level, 1);
        assert!(!state.enemies.is_empty());
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut state = playing(3);
        let before = state.time_ms;
        tick(&mut state, &TickInput::default(), 0.05);
        assert!((state.time_ms - before - 50.0).abs() < 1e-6);
        assert_eq!(state.frame_count, 1);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = playing(3);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, NOMINAL_DT);
        assert_eq!(state.phase, GamePhase::Paused);

        let frozen_time = state.time_ms;
        let frozen_pos = state.enemies[0].pos;
        for _ in 0..10 {
            tick(&mut state, &TickInput::default(), NOMINAL_DT);
        }
        assert_eq!(state.time_ms, frozen_time);
        assert_eq!(state.enemies[0].pos, frozen_pos);

        tick(&mut state, &pause, NOMINAL_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.time_ms > frozen_time);
    }

    #[test]
    fn test_pause_during_level_transition_restores_it() {
        let mut state = empty_arena(3);
        tick(&mut state, &TickInput::default(), NOMINAL_DT);
        assert!(matches!(state.phase, GamePhase::LevelComplete { .. }));
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, NOMINAL_DT);
        tick(&mut state, &pause, NOMINAL_DT);
        assert!(matches!(state.phase, GamePhase::LevelComplete { .. }));
    }

    #[test]
    fn test_bomb_spares_only_bosses() {
        let mut state = empty_arena(9);
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(100.0, 100.0));
        spawn_enemy(&mut state, ArchetypeId::LoanShark, Vec2::new(700.0, 100.0));
        spawn_enemy(&mut state, ArchetypeId::BossCreditor, Vec2::new(400.0, 80.0));
        enemy_shot(&mut state, Vec2::new(200.0, 200.0));
        enemy_shot(&mut state, Vec2::new(600.0, 200.0));
        let bombs = state.player.bombs;

        assert!(trigger_bomb(&mut state));

        assert_eq!(state.enemies.len(), 1);
        assert!(state.enemies[0].is_boss);
        assert_eq!(state.pools.enemy_projectiles.active_count(), 0);
        assert_eq!(state.player.bombs, bombs - 1);
        assert!(state.events.contains(&GameEvent::BombDetonated { cleared: 2 }));
    }

    #[test]
    fn test_bomb_cooldown_and_stock() {
        let mut state = empty_arena(9);
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(100.0, 100.0));
        assert!(trigger_bomb(&mut state));
        assert!(!trigger_bomb(&mut state));

        state.player.bombs = 0;
        state.time_ms += 10_000.0;
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(100.0, 100.0));
        assert!(!trigger_bomb(&mut state));
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn test_bomb_ignored_outside_play() {
        let mut state = GameState::new(9);
        assert!(!trigger_bomb(&mut state));
        assert_eq!(state.player.bombs, state.tuning.player.starting_bombs);
    }

    #[test]
    fn test_level_advances_after_transition_delay() {
        let mut state = empty_arena(4);
        tick(&mut state, &TickInput::default(), NOMINAL_DT);
        assert!(matches!(state.phase, GamePhase::LevelComplete { .. }));
        assert!(state.events.contains(&GameEvent::LevelComplete(1)));

        let delay = state.tuning.levels.transition_delay_ms;
        let steps = (delay / (f64::from(MAX_DELTA_TIME) * 1000.0)).ceil() as usize + 1;
        for _ in 0..steps {
            tick(&mut state, &TickInput::default(), MAX_DELTA_TIME);
        }
        assert_eq!(state.level, 2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.events.contains(&GameEvent::LevelStarted(2)));
    }

    #[test]
    fn test_fire_spawns_player_shots() {
        let mut state = playing(6);
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut state, &fire, NOMINAL_DT);
        assert!(state.pools.projectiles.active_count() >= 1);
        assert!(state.events.contains(&GameEvent::Shot));
    }

    #[test]
    fn test_non_finite_dt_ends_run() {
        let mut state = playing(6);
        tick(&mut state, &TickInput::default(), f32::NAN);
        assert!(state.is_over());
        let overs = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut state = playing(6);
        state.enter_game_over();
        state.player.score = 1234;
        tick(
            &mut state,
            &TickInput {
                start: true,
                ..Default::default()
            },
            NOMINAL_DT,
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.score, 0);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut state = playing(seed);
            let input = TickInput {
                autopilot: true,
                ..Default::default()
            };
            for _ in 0..300 {
                tick(&mut state, &input, NOMINAL_DT);
            }
            (
                state.player.score,
                state.player.pos,
                state.enemies.iter().map(|e| e.pos).collect::<Vec<_>>(),
            )
        };
        assert_eq!(run(42), run(42));
    }
}
