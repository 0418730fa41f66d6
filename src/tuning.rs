//! Data-driven game balance
//!
//! Every number the simulation reads at runtime lives here. A JSON file may
//! override any subset of fields; missing fields keep their defaults. Tuning
//! is validated once at load and shared read-only afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_RADIUS;
use crate::error::TuningError;
use crate::sim::archetype::{ArchetypeId, EnemyCatalog, PowerUpCatalog};

/// Fixed pool capacities (no growth at runtime)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    pub projectiles: usize,
    pub enemy_projectiles: usize,
    pub particles: usize,
    pub fragments: usize,
    pub damage_numbers: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            projectiles: 150,
            enemy_projectiles: 150,
            particles: 500,
            fragments: 150,
            damage_numbers: 64,
        }
    }
}

/// Player timings and abilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub invulnerability_ms: f64,
    pub max_multiplier: f32,
    pub multiplier_decay_delay_ms: f64,
    /// Multiplier lost per second once decay starts
    pub multiplier_decay_rate: f32,
    pub starting_bombs: u32,
    pub bomb_cooldown_ms: f64,
    pub dash_distance: f32,
    pub dash_duration_ms: f64,
    pub dash_cooldown_ms: f64,
    pub dash_invulnerability_ms: f64,
    pub homing_fire_rate_ms: f64,
    /// Radians per second
    pub homing_turn_rate: f32,
    pub homing_acquire_range: f32,
    pub homing_speed: f32,
    pub homing_damage: f32,
    /// Every Nth level grants +1 max health
    pub health_bonus_every: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            invulnerability_ms: 1000.0,
            max_multiplier: 10.0,
            multiplier_decay_delay_ms: 2000.0,
            multiplier_decay_rate: 0.5,
            starting_bombs: 3,
            bomb_cooldown_ms: 500.0,
            dash_distance: 100.0,
            dash_duration_ms: 150.0,
            dash_cooldown_ms: 2000.0,
            dash_invulnerability_ms: 500.0,
            homing_fire_rate_ms: 400.0,
            homing_turn_rate: std::f32::consts::PI * 2.5,
            homing_acquire_range: 300.0,
            homing_speed: 6.0,
            homing_damage: 8.0,
            health_bonus_every: 3,
        }
    }
}

/// Collectible item behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTuning {
    pub fragment_lifetime_ms: f64,
    pub powerup_lifetime_ms: f64,
    /// Items blink during this final window of their lifetime
    pub fade_start_ms: f64,
    pub magnet_radius: f32,
    pub magnet_strength: f32,
}

impl Default for ItemTuning {
    fn default() -> Self {
        Self {
            fragment_lifetime_ms: 8000.0,
            powerup_lifetime_ms: 7000.0,
            fade_start_ms: 1500.0,
            magnet_radius: 80.0,
            magnet_strength: 150.0,
        }
    }
}

/// One row of the level-banded enemy distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionBand {
    /// Band applies from this level upward until a higher band takes over
    pub min_level: u32,
    pub weights: Vec<(ArchetypeId, f32)>,
}

/// Level/wave director constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTuning {
    pub max_total_enemies: usize,
    pub base_enemy_count: u32,
    /// Levels below this grow by `early_growth` per level
    pub steep_growth_level: u32,
    pub early_growth: f64,
    pub late_growth_base: f64,
    pub late_growth_per_level: f64,
    pub boss_every: u32,
    pub max_loan_sharks: u32,
    pub max_bankruptcy_agents: u32,
    pub safe_spawn_distance: f32,
    pub safe_spawn_attempts: u32,
    /// How far outside the arena edge regular enemies appear
    pub spawn_edge_offset: f32,
    pub boss_margin: f32,
    pub boss_jitter: f32,
    pub transition_delay_ms: f64,
    pub hit_flash_ms: f64,
    pub distribution: Vec<DistributionBand>,
}

impl Default for LevelTuning {
    fn default() -> Self {
        use ArchetypeId::*;
        Self {
            max_total_enemies: 20,
            base_enemy_count: 5,
            steep_growth_level: 10,
            early_growth: 1.2,
            late_growth_base: 1.5,
            late_growth_per_level: 0.1,
            boss_every: 5,
            max_loan_sharks: 2,
            max_bankruptcy_agents: 3,
            safe_spawn_distance: 150.0,
            safe_spawn_attempts: 50,
            spawn_edge_offset: 50.0,
            boss_margin: 60.0,
            boss_jitter: 40.0,
            transition_delay_ms: 1000.0,
            hit_flash_ms: 150.0,
            distribution: vec![
                DistributionBand {
                    min_level: 1,
                    weights: vec![(DebtCollector, 0.7), (DebtSniper, 0.3)],
                },
                DistributionBand {
                    min_level: 3,
                    weights: vec![
                        (DebtCollector, 0.4),
                        (InterestCompounder, 0.3),
                        (DebtSniper, 0.2),
                        (LoanShark, 0.1),
                    ],
                },
                DistributionBand {
                    min_level: 6,
                    weights: vec![
                        (DebtCollector, 0.2),
                        (InterestCompounder, 0.2),
                        (LoanShark, 0.2),
                        (BankruptcyAgent, 0.1),
                        (AssetSeizer, 0.1),
                        (HedgeFund, 0.1),
                        (DebtSniper, 0.1),
                    ],
                },
                DistributionBand {
                    min_level: 10,
                    weights: vec![
                        (DebtCollector, 0.1),
                        (InterestCompounder, 0.1),
                        (LoanShark, 0.2),
                        (BankruptcyAgent, 0.15),
                        (AssetSeizer, 0.15),
                        (HedgeFund, 0.15),
                        (DebtSniper, 0.15),
                    ],
                },
            ],
        }
    }
}

/// Complete balance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena_width: f32,
    pub arena_height: f32,
    pub pools: PoolCapacities,
    pub player: PlayerTuning,
    pub items: ItemTuning,
    pub levels: LevelTuning,
    pub enemies: EnemyCatalog,
    pub power_ups: PowerUpCatalog,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            pools: PoolCapacities::default(),
            player: PlayerTuning::default(),
            items: ItemTuning::default(),
            levels: LevelTuning::default(),
            enemies: EnemyCatalog::default(),
            power_ups: PowerUpCatalog::default(),
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        let invalid = |reason: String| Err(TuningError::Invalid(reason));

        if self.arena_width <= 0.0 || self.arena_height <= 0.0 {
            return invalid("arena dimensions must be positive".into());
        }
        // Entities are clamped to [margin, size - margin] on each axis
        let largest_radius = ArchetypeId::ALL
            .iter()
            .map(|&id| self.enemies.get(id).radius)
            .fold(PLAYER_RADIUS, f32::max);
        let min_side = 2.0 * largest_radius.max(self.levels.boss_margin);
        if self.arena_width < min_side || self.arena_height < min_side {
            return invalid(format!(
                "arena must be at least {min_side} on each side to fit its largest entity"
            ));
        }
        if !(self.player.homing_turn_rate >= 0.0) {
            return invalid("homing_turn_rate must be non-negative".into());
        }
        let p = &self.pools;
        if [
            p.projectiles,
            p.enemy_projectiles,
            p.particles,
            p.fragments,
            p.damage_numbers,
        ]
        .contains(&0)
        {
            return invalid("pool capacities must be non-zero".into());
        }
        if !(self.player.max_multiplier >= 1.0) {
            return invalid("max_multiplier must be at least 1.0".into());
        }
        if self.levels.max_total_enemies == 0 || self.levels.boss_every == 0 {
            return invalid("max_total_enemies and boss_every must be non-zero".into());
        }
        if self.levels.distribution.is_empty() {
            return invalid("enemy distribution needs at least one band".into());
        }
        if self.levels.distribution.iter().any(|b| b.weights.is_empty()) {
            return invalid("distribution bands need at least one weight".into());
        }
        if self.player.health_bonus_every == 0 {
            return invalid("health_bonus_every must be non-zero".into());
        }
        self.enemies.validate().or_else(invalid)?;
        self.power_ups.validate().or_else(invalid)?;
        Ok(())
    }
}
