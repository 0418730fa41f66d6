//! Static enemy and power-up definitions
//!
//! Every enemy kind is a closed [`ArchetypeId`] with one [`EnemyArchetype`]
//! record. The archetype's [`Ability`] carries the typed parameters of its
//! special state machine, so behavior code never looks fields up by name.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;

/// Enemy kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeId {
    DebtCollector,
    InterestCompounder,
    /// Reduced-stat clone spawned by an interest compounder
    CompounderOffspring,
    LoanShark,
    BossCreditor,
    AssetSeizer,
    DebtSniper,
    BankruptcyAgent,
    HedgeFund,
}

impl ArchetypeId {
    pub const ALL: [ArchetypeId; 9] = [
        ArchetypeId::DebtCollector,
        ArchetypeId::InterestCompounder,
        ArchetypeId::CompounderOffspring,
        ArchetypeId::LoanShark,
        ArchetypeId::BossCreditor,
        ArchetypeId::AssetSeizer,
        ArchetypeId::DebtSniper,
        ArchetypeId::BankruptcyAgent,
        ArchetypeId::HedgeFund,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchetypeId::DebtCollector => "debt_collector",
            ArchetypeId::InterestCompounder => "interest_compounder",
            ArchetypeId::CompounderOffspring => "compounder_offspring",
            ArchetypeId::LoanShark => "loan_shark",
            ArchetypeId::BossCreditor => "boss_creditor",
            ArchetypeId::AssetSeizer => "asset_seizer",
            ArchetypeId::DebtSniper => "debt_sniper",
            ArchetypeId::BankruptcyAgent => "bankruptcy_agent",
            ArchetypeId::HedgeFund => "hedge_fund",
        }
    }

    /// Look up an archetype by its snake_case name
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| SimError::UnknownArchetype(name.to_string()))
    }
}

/// Lunge: telegraph in place, then dash along the last-known player heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LungeParams {
    pub trigger_range: f32,
    pub speed_mult: f32,
    pub duration_ms: f64,
    pub cooldown_ms: f64,
    pub telegraph_ms: f64,
}

/// Multiply: periodically spawn one reduced-stat clone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplyParams {
    pub cooldown_ms: f64,
    /// Probability a ready compounder actually multiplies
    pub chance: f32,
    /// Per-parent offspring cap
    pub max_offspring: u32,
    /// Random delay added to the cooldown after a failed roll
    pub retry_jitter_ms: f64,
}

/// Slow field: charge, then slow the player while inside the field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowFieldParams {
    pub radius: f32,
    /// Multiplicative speed factor applied to the player, in (0, 1]
    pub factor: f32,
    pub duration_ms: f64,
    pub cooldown_ms: f64,
    pub activation_range: f32,
    pub charge_ms: f64,
}

/// Boss volley: radial bursts in rotating waves, plus minion summons
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultishootParams {
    pub fire_rate_ms: f64,
    pub burst_count: u32,
    pub burst_waves: u32,
    pub burst_delay_ms: f64,
    /// Rotation added per wave (radians)
    pub wave_rotation: f32,
    pub projectile_speed: f32,
    pub summon_cooldown_ms: f64,
    pub summon_chance: f32,
    /// Summons only while the live enemy count is below this share of the global cap
    pub summon_cap_fraction: f32,
    pub summon: ArchetypeId,
}

/// Nullify: shave time off one of the player's active power-ups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullifyParams {
    pub cooldown_ms: f64,
    pub range: f32,
    pub amount_ms: f64,
}

/// Kiting shooters: hold a distance band and fire from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShooterParams {
    pub fire_rate_ms: f64,
    pub projectile_speed: f32,
    pub projectile_color: u32,
    pub reposition_cooldown_ms: f64,
    pub flee_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// Death burst: area damage plus a radial projectile ring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstParams {
    pub count: u32,
    pub speed: f32,
    pub radius: f32,
    pub damage: i32,
    pub color: u32,
}

/// Special ability of an archetype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ability {
    None,
    Lunge(LungeParams),
    Multiply(MultiplyParams),
    SlowField(SlowFieldParams),
    Multishoot(MultishootParams),
    Nullify(NullifyParams),
    /// Single, slightly inaccurate shots
    Shoot(ShooterParams),
    /// Three-shot spread
    RangedShoot(ShooterParams),
    ExplodeBurst(BurstParams),
}

/// Static definition of an enemy kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyArchetype {
    pub id: ArchetypeId,
    pub radius: f32,
    /// Legacy per-frame speed units
    pub speed: f32,
    pub health: f32,
    pub damage: i32,
    pub color: u32,
    pub value: u32,
    pub fragment_count: u32,
    pub is_boss: bool,
    /// Optional shield pool that absorbs damage before health
    #[serde(default)]
    pub shield: Option<f32>,
    pub ability: Ability,
}

impl EnemyArchetype {
    /// Check the record for values that would break the simulation
    pub fn validate(&self) -> Result<(), String> {
        let name = self.id.as_str();
        if self.radius <= 0.0 || self.health <= 0.0 || self.speed <= 0.0 {
            return Err(format!("{name}: radius, health and speed must be positive"));
        }
        if matches!(self.shield, Some(s) if s <= 0.0) {
            return Err(format!("{name}: shield must be positive when present"));
        }
        match self.ability {
            Ability::SlowField(p) if !(p.factor > 0.0 && p.factor <= 1.0) => {
                Err(format!("{name}: slow factor must be in (0, 1]"))
            }
            Ability::Multishoot(p) if p.burst_count == 0 || p.burst_waves == 0 => {
                Err(format!("{name}: boss volley needs at least one projectile and wave"))
            }
            Ability::ExplodeBurst(p) if p.count == 0 => {
                Err(format!("{name}: death burst needs at least one projectile"))
            }
            Ability::Shoot(p) | Ability::RangedShoot(p) if p.min_distance > p.max_distance => {
                Err(format!("{name}: min_distance exceeds max_distance"))
            }
            Ability::Multiply(p) if !(0.0..=1.0).contains(&p.chance) => {
                Err(format!("{name}: multiply chance must be a probability"))
            }
            _ => Ok(()),
        }
    }
}

/// The closed set of enemy archetypes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyCatalog {
    pub debt_collector: EnemyArchetype,
    pub interest_compounder: EnemyArchetype,
    pub compounder_offspring: EnemyArchetype,
    pub loan_shark: EnemyArchetype,
    pub boss_creditor: EnemyArchetype,
    pub asset_seizer: EnemyArchetype,
    pub debt_sniper: EnemyArchetype,
    pub bankruptcy_agent: EnemyArchetype,
    pub hedge_fund: EnemyArchetype,
}

impl EnemyCatalog {
    pub fn get(&self, id: ArchetypeId) -> &EnemyArchetype {
        match id {
            ArchetypeId::DebtCollector => &self.debt_collector,
            ArchetypeId::InterestCompounder => &self.interest_compounder,
            ArchetypeId::CompounderOffspring => &self.compounder_offspring,
            ArchetypeId::LoanShark => &self.loan_shark,
            ArchetypeId::BossCreditor => &self.boss_creditor,
            ArchetypeId::AssetSeizer => &self.asset_seizer,
            ArchetypeId::DebtSniper => &self.debt_sniper,
            ArchetypeId::BankruptcyAgent => &self.bankruptcy_agent,
            ArchetypeId::HedgeFund => &self.hedge_fund,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for id in ArchetypeId::ALL {
            let archetype = self.get(id);
            if archetype.id != id {
                return Err(format!(
                    "catalog slot {} holds archetype {}",
                    id.as_str(),
                    archetype.id.as_str()
                ));
            }
            archetype.validate()?;
        }
        Ok(())
    }
}

impl Default for EnemyCatalog {
    fn default() -> Self {
        use std::f32::consts::PI;

        let sniper_shots = ShooterParams {
            fire_rate_ms: 2200.0,
            projectile_speed: 5.0,
            projectile_color: 0x1abc9c,
            reposition_cooldown_ms: 3000.0,
            flee_distance: 100.0,
            min_distance: 150.0,
            max_distance: 250.0,
        };

        Self {
            debt_collector: EnemyArchetype {
                id: ArchetypeId::DebtCollector,
                radius: 15.0,
                speed: 2.4,
                health: 35.0,
                damage: 1,
                color: 0xe74c3c,
                value: 5,
                fragment_count: 2,
                is_boss: false,
                shield: None,
                ability: Ability::Lunge(LungeParams {
                    trigger_range: 50.0,
                    speed_mult: 2.5,
                    duration_ms: 200.0,
                    cooldown_ms: 4000.0,
                    telegraph_ms: 300.0,
                }),
            },
            interest_compounder: EnemyArchetype {
                id: ArchetypeId::InterestCompounder,
                radius: 12.0,
                speed: 3.2,
                health: 25.0,
                damage: 1,
                color: 0x9b59b6,
                value: 10,
                fragment_count: 3,
                is_boss: false,
                shield: None,
                ability: Ability::Multiply(MultiplyParams {
                    cooldown_ms: 3000.0,
                    chance: 0.2,
                    max_offspring: 2,
                    retry_jitter_ms: 2000.0,
                }),
            },
            compounder_offspring: EnemyArchetype {
                id: ArchetypeId::CompounderOffspring,
                radius: 10.0,
                speed: 3.2,
                health: 15.0,
                damage: 1,
                color: 0x9b59b6,
                value: 5,
                fragment_count: 2,
                is_boss: false,
                shield: None,
                ability: Ability::None,
            },
            loan_shark: EnemyArchetype {
                id: ArchetypeId::LoanShark,
                radius: 20.0,
                speed: 2.0,
                health: 60.0,
                damage: 1,
                color: 0x2980b9,
                value: 15,
                fragment_count: 4,
                is_boss: false,
                shield: None,
                ability: Ability::SlowField(SlowFieldParams {
                    radius: 70.0,
                    factor: 0.65,
                    duration_ms: 3000.0,
                    cooldown_ms: 8000.0,
                    activation_range: 120.0,
                    charge_ms: 1000.0,
                }),
            },
            boss_creditor: EnemyArchetype {
                id: ArchetypeId::BossCreditor,
                radius: 40.0,
                speed: 1.3,
                health: 250.0,
                damage: 2,
                color: 0xf39c12,
                value: 50,
                fragment_count: 15,
                is_boss: true,
                shield: None,
                ability: Ability::Multishoot(MultishootParams {
                    fire_rate_ms: 3500.0,
                    burst_count: 8,
                    burst_waves: 3,
                    burst_delay_ms: 200.0,
                    wave_rotation: PI / 8.0,
                    projectile_speed: 5.5,
                    summon_cooldown_ms: 5000.0,
                    summon_chance: 0.5,
                    summon_cap_fraction: 0.8,
                    summon: ArchetypeId::DebtCollector,
                }),
            },
            asset_seizer: EnemyArchetype {
                id: ArchetypeId::AssetSeizer,
                radius: 18.0,
                speed: 2.2,
                health: 45.0,
                damage: 1,
                color: 0xd35400,
                value: 15,
                fragment_count: 4,
                is_boss: false,
                shield: None,
                ability: Ability::Nullify(NullifyParams {
                    cooldown_ms: 5000.0,
                    range: 120.0,
                    amount_ms: 3000.0,
                }),
            },
            debt_sniper: EnemyArchetype {
                id: ArchetypeId::DebtSniper,
                radius: 14.0,
                speed: 1.8,
                health: 30.0,
                damage: 1,
                color: 0x16a085,
                value: 12,
                fragment_count: 3,
                is_boss: false,
                shield: None,
                ability: Ability::Shoot(sniper_shots),
            },
            bankruptcy_agent: EnemyArchetype {
                id: ArchetypeId::BankruptcyAgent,
                radius: 16.0,
                speed: 2.4,
                health: 40.0,
                damage: 1,
                color: 0x8e44ad,
                value: 18,
                fragment_count: 5,
                is_boss: false,
                shield: None,
                ability: Ability::ExplodeBurst(BurstParams {
                    count: 8,
                    speed: 5.0,
                    radius: 70.0,
                    damage: 2,
                    color: BURST_COLOR,
                }),
            },
            hedge_fund: EnemyArchetype {
                id: ArchetypeId::HedgeFund,
                radius: 20.0,
                speed: 2.0,
                health: 50.0,
                damage: 2,
                color: 0x00ccff,
                value: 25,
                fragment_count: 4,
                is_boss: false,
                shield: None,
                ability: Ability::RangedShoot(ShooterParams {
                    fire_rate_ms: 2000.0,
                    projectile_speed: 6.0,
                    projectile_color: ENEMY_PROJECTILE_COLOR,
                    ..sniper_shots
                }),
            },
        }
    }
}

/// Power-up kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    HealthPack,
    RapidFire,
    DoubleDamage,
    SpeedBoost,
    SpreadShot,
    PiercingShot,
    HomingMissile,
}

impl PowerUpKind {
    /// Kinds that run on a timer (everything but the instant health pack)
    pub const TIMED: [PowerUpKind; 6] = [
        PowerUpKind::RapidFire,
        PowerUpKind::DoubleDamage,
        PowerUpKind::SpeedBoost,
        PowerUpKind::SpreadShot,
        PowerUpKind::PiercingShot,
        PowerUpKind::HomingMissile,
    ];

    /// Slot in the player's timer table, `None` for instant kinds
    pub fn timer_slot(&self) -> Option<usize> {
        Self::TIMED.iter().position(|k| k == self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::HealthPack => "health_pack",
            PowerUpKind::RapidFire => "rapid_fire",
            PowerUpKind::DoubleDamage => "double_damage",
            PowerUpKind::SpeedBoost => "speed_boost",
            PowerUpKind::SpreadShot => "spread_shot",
            PowerUpKind::PiercingShot => "piercing_shot",
            PowerUpKind::HomingMissile => "homing_missile",
        }
    }
}

/// Static definition of a power-up kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpDef {
    pub kind: PowerUpKind,
    pub radius: f32,
    pub color: u32,
    /// Zero for instant effects
    pub duration_ms: f64,
    /// Relative drop weight
    pub rarity: f32,
}

/// Power-up drop table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpCatalog {
    pub entries: Vec<PowerUpDef>,
}

impl PowerUpCatalog {
    pub fn get(&self, kind: PowerUpKind) -> Option<&PowerUpDef> {
        self.entries.iter().find(|d| d.kind == kind)
    }

    /// Rarity-weighted draw. Falls back to the health pack if rounding leaves
    /// the roll unconsumed.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> PowerUpKind {
        let total: f32 = self.entries.iter().map(|d| d.rarity.max(0.0)).sum();
        let mut remaining = rng.random::<f32>() * total;
        for def in &self.entries {
            remaining -= def.rarity.max(0.0);
            if remaining <= 0.0 {
                return def.kind;
            }
        }
        PowerUpKind::HealthPack
    }

    pub fn validate(&self) -> Result<(), String> {
        let total: f32 = self.entries.iter().map(|d| d.rarity.max(0.0)).sum();
        if total <= 0.0 {
            return Err("power-up catalog has zero total rarity".into());
        }
        for (i, def) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|d| d.kind == def.kind) {
                return Err(format!("power-up {} listed twice", def.kind.as_str()));
            }
            if def.kind.timer_slot().is_some() && def.duration_ms <= 0.0 {
                return Err(format!("power-up {} needs a duration", def.kind.as_str()));
            }
        }
        Ok(())
    }
}

impl Default for PowerUpCatalog {
    fn default() -> Self {
        let def = |kind, color, duration_ms, rarity| PowerUpDef {
            kind,
            radius: 8.0,
            color,
            duration_ms,
            rarity,
        };
        Self {
            entries: vec![
                def(PowerUpKind::HealthPack, 0xe74c3c, 0.0, 0.3),
                def(PowerUpKind::RapidFire, 0xf1c40f, 8000.0, 0.25),
                def(PowerUpKind::DoubleDamage, 0x9b59b6, 10000.0, 0.25),
                def(PowerUpKind::SpeedBoost, 0x2ecc71, 8000.0, 0.25),
                def(PowerUpKind::SpreadShot, 0x3498db, 8000.0, 0.2),
                def(PowerUpKind::PiercingShot, PIERCING_COLOR, 6000.0, 0.15),
                def(PowerUpKind::HomingMissile, 0x1abc9c, 10000.0, 0.18),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_default_catalog_is_valid() {
        assert!(EnemyCatalog::default().validate().is_ok());
        assert!(PowerUpCatalog::default().validate().is_ok());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            ArchetypeId::from_name("loan_shark"),
            Ok(ArchetypeId::LoanShark)
        );
        assert!(matches!(
            ArchetypeId::from_name("payday_lender"),
            Err(SimError::UnknownArchetype(_))
        ));
    }

    #[test]
    fn test_only_creditor_is_boss() {
        let catalog = EnemyCatalog::default();
        for id in ArchetypeId::ALL {
            assert_eq!(catalog.get(id).is_boss, id == ArchetypeId::BossCreditor);
        }
    }

    #[test]
    fn test_invalid_slow_factor_rejected() {
        let mut catalog = EnemyCatalog::default();
        if let Ability::SlowField(ref mut p) = catalog.loan_shark.ability {
            p.factor = 1.5;
        }
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_mismatched_slot_rejected() {
        let mut catalog = EnemyCatalog::default();
        catalog.hedge_fund.id = ArchetypeId::DebtSniper;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_roll_respects_single_weight() {
        let catalog = PowerUpCatalog {
            entries: vec![PowerUpDef {
                kind: PowerUpKind::SpreadShot,
                radius: 8.0,
                color: 0,
                duration_ms: 1000.0,
                rarity: 1.0,
            }],
        };
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(catalog.roll(&mut rng), PowerUpKind::SpreadShot);
        }
    }

    #[test]
    fn test_timer_slots_cover_timed_kinds() {
        assert_eq!(PowerUpKind::HealthPack.timer_slot(), None);
        for (i, kind) in PowerUpKind::TIMED.iter().enumerate() {
            assert_eq!(kind.timer_slot(), Some(i));
        }
    }

    #[test]
    fn test_ability_json_shape() {
        let json = r#"{"kind":"nullify","cooldown_ms":1.0,"range":2.0,"amount_ms":3.0}"#;
        let ability: Ability = serde_json::from_str(json).unwrap();
        assert!(matches!(ability, Ability::Nullify(p) if p.range == 2.0));
    }
}
