//! Demo-mode AI
//!
//! Produces a [`TickInput`] from the current state so the game can play
//! itself on the title screen or in headless runs. Deterministic: it reads
//! the state and never touches the RNG.

use glam::Vec2;

use super::state::GameState;
use super::tick::{Aim, TickInput};

/// Threats inside this distance push the autopilot away
const DANGER_RADIUS: f32 = 120.0;
/// Threats inside this distance trigger a dash when one is ready
const PANIC_RADIUS: f32 = 45.0;
/// Bomb when at least this many enemies crowd the danger radius
const SWARM_SIZE: usize = 4;
/// Keep clear of the arena walls by this much
const WALL_MARGIN: f32 = 40.0;

pub fn autopilot_input(state: &GameState) -> TickInput {
    let player = &state.player;
    let arena = state.arena();

    let nearest = state
        .enemies
        .iter()
        .filter(|e| e.active)
        .min_by(|a, b| {
            a.pos
                .distance_squared(player.pos)
                .total_cmp(&b.pos.distance_squared(player.pos))
        });

    let mut input = TickInput {
        fire: nearest.is_some(),
        ..Default::default()
    };

    if let Some(target) = nearest {
        input.aim = Aim::Toward(target.pos);
    }

    // Sum of repulsion from nearby enemies and enemy shots
    let mut threat = Vec2::ZERO;
    let mut crowd = 0;
    let mut closest_threat = f32::INFINITY;
    let mut boss_close = false;
    for enemy in state.enemies.iter().filter(|e| e.active) {
        let away = player.pos - enemy.pos;
        let dist = away.length() - enemy.radius;
        if dist < DANGER_RADIUS {
            crowd += 1;
            threat += away.normalize_or_zero() * (DANGER_RADIUS - dist.max(0.0));
            boss_close |= enemy.is_boss;
        }
        closest_threat = closest_threat.min(dist);
    }
    for (_, shot) in state.pools.enemy_projectiles.iter_active() {
        let away = player.pos - shot.pos;
        let dist = away.length();
        if dist < DANGER_RADIUS * 0.5 {
            threat += away.normalize_or_zero() * (DANGER_RADIUS * 0.5 - dist);
        }
        closest_threat = closest_threat.min(dist);
    }

    // Walls repel so the autopilot does not get pinned in a corner
    let wall = |x: f32, high: f32| -> f32 {
        if x < WALL_MARGIN {
            WALL_MARGIN - x
        } else if x > high - WALL_MARGIN {
            (high - WALL_MARGIN) - x
        } else {
            0.0
        }
    };
    threat += Vec2::new(wall(player.pos.x, arena.x), wall(player.pos.y, arena.y));

    if threat.length_squared() > 1.0 {
        input.move_dir = threat.normalize_or_zero();
    } else if let Some(goal) = nearest_collectible(state) {
        input.move_dir = (goal - player.pos).normalize_or_zero();
    } else if let Some(target) = nearest {
        // Hold a comfortable range from the closest enemy
        let to_target = target.pos - player.pos;
        if to_target.length() > DANGER_RADIUS * 2.0 {
            input.move_dir = to_target.normalize_or_zero();
        }
    }

    let now = state.time_ms;
    let tuning = &state.tuning.player;
    input.dash = closest_threat < PANIC_RADIUS
        && !player.is_dashing()
        && now - player.last_dash_ms >= tuning.dash_cooldown_ms;
    input.bomb = player.bombs > 0
        && now - player.last_bomb_ms > tuning.bomb_cooldown_ms
        && (crowd >= SWARM_SIZE || (boss_close && state.pools.enemy_projectiles.active_count() > 8));

    input
}

/// Closest power-up pickup or multiplier fragment
fn nearest_collectible(state: &GameState) -> Option<Vec2> {
    let from = state.player.pos;
    state
        .pickups
        .iter()
        .map(|p| p.pos)
        .chain(state.pools.fragments.iter_active().map(|(_, f)| f.pos))
        .min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::archetype::ArchetypeId;
    use crate::sim::enemy::spawn_enemy;
    use crate::sim::state::GamePhase;

    fn arena_state() -> GameState {
        let mut state = GameState::new(2);
        state.phase = GamePhase::Playing;
        state
    }

    #[test]
    fn test_idle_without_enemies() {
        let state = arena_state();
        let input = autopilot_input(&state);
        assert!(!input.fire);
        assert_eq!(input.aim, Aim::Hold);
        assert_eq!(input.move_dir, Vec2::ZERO);
    }

    #[test]
    fn test_aims_and_fires_at_nearest() {
        let mut state = arena_state();
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(700.0, 300.0));
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, Vec2::new(500.0, 300.0));
        let input = autopilot_input(&state);
        assert!(input.fire);
        assert_eq!(input.aim, Aim::Toward(Vec2::new(500.0, 300.0)));
    }

    #[test]
    fn test_backs_away_from_close_enemy() {
        let mut state = arena_state();
        let pos = state.player.pos;
        spawn_enemy(&mut state, ArchetypeId::DebtCollector, pos + Vec2::new(60.0, 0.0));
        let input = autopilot_input(&state);
        assert!(input.move_dir.x < 0.0);
    }

    #[test]
    fn test_bombs_a_swarm() {
        let mut state = arena_state();
        let pos = state.player.pos;
        for i in 0..SWARM_SIZE {
            let angle = i as f32 * 1.5;
            spawn_enemy(
                &mut state,
                ArchetypeId::DebtCollector,
                pos + Vec2::new(angle.cos(), angle.sin()) * 80.0,
            );
        }
        assert!(autopilot_input(&state).bomb);

        state.player.bombs = 0;
        assert!(!autopilot_input(&state).bomb);
    }
}
