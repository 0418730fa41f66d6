//! Deterministic simulation module
//!
//! All gameplay logic lives here. Given the same seed, tuning and input
//! sequence the simulation produces the same run:
//! - Seeded RNG only, owned by [`GameState`]
//! - Simulation clock advanced only by tick `dt`
//! - Stable iteration order (spawn order, pool slot order)
//! - No rendering, audio or platform dependencies

pub mod archetype;
pub mod autopilot;
pub mod clock;
pub mod collision;
pub mod director;
pub mod enemy;
pub mod entities;
pub mod player;
pub mod pool;
pub mod state;
pub mod tick;

pub use archetype::{
    Ability, ArchetypeId, EnemyArchetype, EnemyCatalog, PowerUpCatalog, PowerUpDef, PowerUpKind,
};
pub use autopilot::autopilot_input;
pub use clock::{FrameClock, Session};
pub use collision::{damage_player, resolve_collisions};
pub use director::{generate_level, next_level, start_game};
pub use enemy::{Enemy, HitOutcome, spawn_enemy, spawn_enemy_by_name};
pub use entities::{DamageNumber, Fragment, Particle, PowerUpPickup, Projectile};
pub use player::Player;
pub use pool::{Pool, PoolKind, PoolUsage, Pooled, Pools};
pub use state::{GameEvent, GamePhase, GameState, Snapshot};
pub use tick::{Aim, TickInput, tick, trigger_bomb};
