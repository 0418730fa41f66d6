//! Level/wave director: composition, spawn placement, boss waves, progression

use glam::Vec2;
use rand::Rng;

use super::archetype::ArchetypeId;
use super::enemy::spawn_enemy;
use super::player::Player;
use super::state::{GameEvent, GamePhase, GameState};
use crate::tuning::{DistributionBand, LevelTuning};

/// Target enemy count for a level: gentle growth early, steeper later, capped
pub fn enemy_count_for_level(levels: &LevelTuning, level: u32) -> usize {
    let growth = if level < levels.steep_growth_level {
        levels.early_growth
    } else {
        levels.late_growth_base + level as f64 * levels.late_growth_per_level
    };
    let raw = (levels.base_enemy_count as f64 + level as f64 * growth).ceil();
    (raw.max(0.0) as usize).min(levels.max_total_enemies)
}

pub fn is_boss_level(levels: &LevelTuning, level: u32) -> bool {
    level > 0 && level % levels.boss_every == 0
}

/// Bosses on a boss level: one more every `boss_every` levels
pub fn boss_count_for_level(levels: &LevelTuning, level: u32) -> u32 {
    if is_boss_level(levels, level) {
        level / levels.boss_every
    } else {
        0
    }
}

/// The most specific band whose threshold the level has reached
pub fn band_for_level(levels: &LevelTuning, level: u32) -> Option<&DistributionBand> {
    levels
        .distribution
        .iter()
        .filter(|b| b.min_level <= level)
        .max_by_key(|b| b.min_level)
        .or_else(|| levels.distribution.iter().min_by_key(|b| b.min_level))
}

/// Cumulative weighted draw. Falls back to the debt collector when the roll
/// lands past the table's total weight.
pub fn pick_archetype<R: Rng>(rng: &mut R, band: &DistributionBand) -> ArchetypeId {
    let roll = rng.random::<f32>();
    let mut cumulative = 0.0;
    for (id, weight) in &band.weights {
        cumulative += weight;
        if roll <= cumulative {
            return *id;
        }
    }
    ArchetypeId::DebtCollector
}

/// Rejection-sample a point just outside an arena edge, at least the safe
/// distance away from the player
pub fn find_safe_spawn<R: Rng>(rng: &mut R, levels: &LevelTuning, arena: Vec2, player_pos: Vec2) -> Vec2 {
    let edge = levels.spawn_edge_offset;
    for _ in 0..levels.safe_spawn_attempts {
        let mut pos = Vec2::new(rng.random::<f32>() * arena.x, rng.random::<f32>() * arena.y);
        if rng.random::<bool>() {
            pos.x = if rng.random::<bool>() { -edge } else { arena.x + edge };
        } else {
            pos.y = if rng.random::<bool>() { -edge } else { arena.y + edge };
        }
        pos = pos.clamp(Vec2::splat(-100.0), arena + Vec2::splat(100.0));

        if pos.distance(player_pos) > levels.safe_spawn_distance {
            return pos;
        }
    }

    log::warn!(
        "Failed to find safe spawn after {} attempts",
        levels.safe_spawn_attempts
    );
    let x = if rng.random::<bool>() { 0.0 } else { arena.x };
    Vec2::new(x, rng.random::<f32>() * arena.y)
}

/// Boss placement: one boss goes to the corner opposite the player, several
/// alternate between the left and right edges, evenly spaced vertically
pub fn boss_positions<R: Rng>(
    rng: &mut R,
    levels: &LevelTuning,
    count: u32,
    arena: Vec2,
    player_pos: Vec2,
) -> Vec<Vec2> {
    let margin = levels.boss_margin;
    if count == 1 {
        let x = if player_pos.x < arena.x / 2.0 { arena.x - margin } else { margin };
        let y = if player_pos.y < arena.y / 2.0 { arena.y - margin } else { margin };
        return vec![Vec2::new(x, y)];
    }

    let segment = arena.y / (count + 1) as f32;
    (0..count)
        .map(|i| {
            let x = if i % 2 == 0 { margin } else { arena.x - margin };
            let jitter = (rng.random::<f32>() - 0.5) * levels.boss_jitter;
            let y = (segment * (i + 1) as f32 + jitter).clamp(margin, arena.y - margin);
            Vec2::new(x, y)
        })
        .collect()
}

/// Replace the enemy collection with level `level`'s wave
pub fn generate_level(state: &mut GameState, level: u32) {
    let tuning = state.tuning.clone();
    let levels = &tuning.levels;
    let arena = state.arena();

    state.enemies.clear();

    let target = enemy_count_for_level(levels, level);
    let regular = if is_boss_level(levels, level) {
        target.saturating_sub(1).max(1)
    } else {
        target
    };
    log::info!("Generating level {}: {} regular enemies", level, regular);

    let Some(band) = band_for_level(levels, level) else {
        log::error!("No enemy distribution band for level {}", level);
        return;
    };

    let mut loan_sharks = 0;
    let mut agents = 0;
    for _ in 0..regular {
        let mut archetype = pick_archetype(&mut state.rng, band);
        match archetype {
            ArchetypeId::LoanShark if loan_sharks >= levels.max_loan_sharks => {
                archetype = ArchetypeId::DebtCollector;
            }
            ArchetypeId::LoanShark => loan_sharks += 1,
            ArchetypeId::BankruptcyAgent if agents >= levels.max_bankruptcy_agents => {
                archetype = ArchetypeId::DebtCollector;
            }
            ArchetypeId::BankruptcyAgent => agents += 1,
            _ => {}
        }
        let pos = find_safe_spawn(&mut state.rng, levels, arena, state.player.pos);
        spawn_enemy(state, archetype, pos);
    }

    let bosses = boss_count_for_level(levels, level);
    if bosses > 0 {
        for pos in boss_positions(&mut state.rng, levels, bosses, arena, state.player.pos) {
            log::info!("Spawning boss at ({:.0}, {:.0})", pos.x, pos.y);
            spawn_enemy(state, ArchetypeId::BossCreditor, pos);
        }
    }

    log::info!(
        "Level {} generation complete: {} enemies",
        level,
        state.enemies.len()
    );
}

/// Drop `count` fragments around a kill. Stops when the pool is exhausted.
pub fn spawn_fragments(state: &mut GameState, pos: Vec2, count: u32) {
    let now = state.time_ms;
    for _ in 0..count {
        let Some(frag) = state.pools.fragments.acquire() else {
            break;
        };
        frag.spawn(pos, now, &mut state.rng);
    }
}

/// Enter the level transition once the wave is cleared.
///
/// Bosses with health left are restored at removal time, so an empty
/// collection means every boss is really dead.
pub fn check_level_complete(state: &mut GameState) -> bool {
    if state.phase != GamePhase::Playing || !state.enemies.is_empty() {
        return false;
    }
    state.phase = GamePhase::LevelComplete {
        since_ms: state.time_ms,
    };
    state.events.push(GameEvent::LevelComplete(state.level));
    log::info!("Level {} complete", state.level);
    true
}

/// Fresh run: reset the player and all collections, then start level 1
pub fn start_game(state: &mut GameState) {
    let arena = state.arena();
    state.player = Player::new(arena, &state.tuning.player);
    state.enemies.clear();
    state.pickups.clear();
    state.pools.reset_all();
    state.player_slow_factor = 1.0;
    state.damage_flash_until_ms = 0.0;
    state.level = 1;
    state.phase = GamePhase::Playing;
    log::info!("Starting new game");
    generate_level(state, 1);
    state.events.push(GameEvent::LevelStarted(1));
}

/// Advance to the next level. Every few levels the player gains max health.
pub fn next_level(state: &mut GameState) {
    state.level += 1;
    if state.level % state.tuning.player.health_bonus_every == 0 {
        state.player.max_health += 1;
        state.player.heal(1);
        log::info!("Max health increased to {}", state.player.max_health);
    }
    state.phase = GamePhase::Playing;
    let level = state.level;
    generate_level(state, level);
    state.events.push(GameEvent::LevelStarted(level));
}
