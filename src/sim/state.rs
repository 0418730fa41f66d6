//! Game state and core simulation types
//!
//! `GameState` is the single explicit simulation context. Every subsystem is
//! a function over it; nothing is reachable ambiently.

use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::archetype::{ArchetypeId, PowerUpKind};
use super::enemy::Enemy;
use super::entities::PowerUpPickup;
use super::player::Player;
use super::pool::{PoolKind, PoolUsage, Pools};
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first `start_game`
    Start,
    /// Active gameplay
    Playing,
    /// All enemies cleared; the next level starts after the transition delay
    LevelComplete { since_ms: f64 },
    /// Simulation frozen
    Paused,
    /// Run ended
    GameOver,
}

/// One-shot notifications for audio, UI and other collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    EnemyDestroyed {
        id: u32,
        archetype: ArchetypeId,
        score: u64,
    },
    PowerUpCollected(PowerUpKind),
    PlayerHit {
        damage: i32,
    },
    DamageFlash,
    FragmentCollected,
    ShieldBroken {
        id: u32,
    },
    BombDetonated {
        cleared: usize,
    },
    DashStarted,
    Shot,
    LevelComplete(u32),
    LevelStarted(u32),
    GameOver {
        score: u64,
        level: u32,
    },
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Read-only balance data
    pub tuning: Arc<Tuning>,
    /// Seeded RNG, the only source of randomness
    pub rng: Pcg32,
    /// Simulation clock (ms), advanced by each tick's dt
    pub time_ms: f64,
    pub frame_count: u64,
    pub phase: GamePhase,
    /// Phase to restore on resume
    pub paused_from: GamePhase,
    pub level: u32,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<PowerUpPickup>,
    pub pools: Pools,
    /// Strongest slow applied to the player this tick, reset to 1.0 each tick
    pub player_slow_factor: f32,
    /// Hit-flash feedback for the renderer
    pub damage_flash_until_ms: f64,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// New state with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(Arc::new(Tuning::default()), seed)
    }

    pub fn with_tuning(tuning: Arc<Tuning>, seed: u64) -> Self {
        let arena = Vec2::new(tuning.arena_width, tuning.arena_height);
        Self {
            rng: Pcg32::seed_from_u64(seed),
            time_ms: 0.0,
            frame_count: 0,
            phase: GamePhase::Start,
            paused_from: GamePhase::Start,
            level: 1,
            player: Player::new(arena, &tuning.player),
            enemies: Vec::new(),
            pickups: Vec::new(),
            pools: Pools::new(&tuning.pools),
            player_slow_factor: 1.0,
            damage_flash_until_ms: 0.0,
            events: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    pub fn arena(&self) -> Vec2 {
        Vec2::new(self.tuning.arena_width, self.tuning.arena_height)
    }

    /// Allocate a unique entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.active).count()
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Terminal transition. Returns `false` if the run had already ended.
    pub fn enter_game_over(&mut self) -> bool {
        if self.phase == GamePhase::GameOver {
            return false;
        }
        self.phase = GamePhase::GameOver;
        self.events.push(GameEvent::GameOver {
            score: self.player.score,
            level: self.level,
        });
        log::info!(
            "Game over at level {} with score {}",
            self.level,
            self.player.score
        );
        true
    }

    /// Serializable summary for hosts and logs
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time_ms: self.time_ms,
            frame: self.frame_count,
            phase: self.phase,
            level: self.level,
            score: self.player.score,
            health: self.player.health,
            max_health: self.player.max_health,
            multiplier: self.player.multiplier,
            bombs: self.player.bombs,
            enemies: self.live_enemy_count(),
            bosses: self.enemies.iter().filter(|e| e.active && e.is_boss).count(),
            pickups: self.pickups.len(),
            pools: PoolKind::ALL.iter().map(|k| self.pools.usage(*k)).collect(),
        }
    }
}

/// Read-only view of the headline numbers
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time_ms: f64,
    pub frame: u64,
    pub phase: GamePhase,
    pub level: u32,
    pub score: u64,
    pub health: i32,
    pub max_health: i32,
    pub multiplier: f32,
    pub bombs: u32,
    pub enemies: usize,
    pub bosses: usize,
    pub pickups: usize,
    pub pools: Vec<PoolUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut state = GameState::new(1);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_game_over_fires_once() {
        let mut state = GameState::new(1);
        state.phase = GamePhase::Playing;
        assert!(state.enter_game_over());
        assert!(!state.enter_game_over());
        let overs = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = GameState::new(1);
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Start\""));
        assert!(json.contains("enemy_projectiles"));
    }
}
