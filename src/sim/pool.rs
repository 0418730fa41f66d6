//! Fixed-capacity object pools
//!
//! Slots are preallocated once and never grow. A slot's `active` flag is the
//! only liveness marker; a free-list of slot indices makes `acquire` O(1) in
//! the common case. When the free-list runs dry the pool falls back to a
//! linear scan before reporting exhaustion, so a slot that was acquired but
//! never spawned is still found again.
//!
//! A full pool is backpressure: `acquire` returns `None` and the caller skips
//! the effect.

use serde::Serialize;

use super::entities::{DamageNumber, Fragment, Particle, Projectile};
use crate::error::SimError;
use crate::tuning::PoolCapacities;

/// An entity that lives in a pool slot
pub trait Pooled: Default {
    /// Slot occupancy
    fn is_active(&self) -> bool;
    /// Clear `active` and drop references. Must be idempotent.
    fn reset(&mut self);
}

/// A fixed-size array of reusable slots
#[derive(Debug, Clone)]
pub struct Pool<T: Pooled> {
    name: &'static str,
    slots: Vec<T>,
    /// Candidate free slots, top of stack is handed out next
    free: Vec<usize>,
    /// Mirrors membership in `free` so an index is never listed twice
    listed: Vec<bool>,
    exhaustion_logged: bool,
}

impl<T: Pooled> Pool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| T::default()).collect();
        // Reverse so slot 0 is handed out first
        let free = (0..capacity).rev().collect();
        Self {
            name,
            slots,
            free,
            listed: vec![true; capacity],
            exhaustion_logged: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    /// Claim a free slot. The caller is expected to `spawn` into it right away.
    ///
    /// Returns `None` when every slot is active.
    pub fn acquire(&mut self) -> Option<&mut T> {
        let mut found = None;
        while let Some(idx) = self.free.pop() {
            self.listed[idx] = false;
            if !self.slots[idx].is_active() {
                found = Some(idx);
                break;
            }
        }

        if found.is_none() {
            found = self.slots.iter().position(|s| !s.is_active());
        }

        match found {
            Some(idx) => Some(&mut self.slots[idx]),
            None => {
                if !self.exhaustion_logged {
                    log::warn!("Pool exhausted: {}", self.name);
                    self.exhaustion_logged = true;
                }
                None
            }
        }
    }

    /// Return a slot to the pool. Releasing an inactive slot is a no-op.
    pub fn release(&mut self, idx: usize) {
        let Some(slot) = self.slots.get_mut(idx) else {
            log::error!("Release of slot {} outside pool '{}'", idx, self.name);
            return;
        };
        let was_active = slot.is_active();
        slot.reset();
        if was_active {
            self.mark_free(idx);
        }
    }

    /// Advance every active slot. Slots that deactivate themselves inside `f`
    /// return to the free-list.
    pub fn update_all(&mut self, mut f: impl FnMut(&mut T)) {
        for idx in 0..self.slots.len() {
            if !self.slots[idx].is_active() {
                continue;
            }
            f(&mut self.slots[idx]);
            if !self.slots[idx].is_active() {
                self.mark_free(idx);
            }
        }
    }

    /// Visit active slots read-only (render and query passes)
    pub fn for_each_active(&self, mut f: impl FnMut(usize, &T)) {
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.is_active() {
                f(idx, slot);
            }
        }
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
    }

    /// Indices of active slots, snapshotted for passes that release as they go
    pub fn active_indices(&self) -> Vec<usize> {
        self.iter_active().map(|(idx, _)| idx).collect()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx)
    }

    /// Force-release every active slot. Returns how many were released.
    pub fn reset_all(&mut self) -> usize {
        let mut released = 0;
        for idx in 0..self.slots.len() {
            if self.slots[idx].is_active() {
                self.slots[idx].reset();
                self.mark_free(idx);
                released += 1;
            }
        }
        self.exhaustion_logged = false;
        released
    }

    fn mark_free(&mut self, idx: usize) {
        if !self.listed[idx] {
            self.listed[idx] = true;
            self.free.push(idx);
        }
        self.exhaustion_logged = false;
    }
}

/// Pooled entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Projectiles,
    EnemyProjectiles,
    Particles,
    Fragments,
    DamageNumbers,
}

impl PoolKind {
    pub const ALL: [PoolKind; 5] = [
        PoolKind::Projectiles,
        PoolKind::EnemyProjectiles,
        PoolKind::Particles,
        PoolKind::Fragments,
        PoolKind::DamageNumbers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Projectiles => "projectiles",
            PoolKind::EnemyProjectiles => "enemy_projectiles",
            PoolKind::Particles => "particles",
            PoolKind::Fragments => "fragments",
            PoolKind::DamageNumbers => "damage_numbers",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SimError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| SimError::UnknownPool(name.to_string()))
    }
}

/// Occupancy snapshot of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolUsage {
    pub kind: PoolKind,
    pub active: usize,
    pub capacity: usize,
}

/// Every pool the simulation owns
#[derive(Debug, Clone)]
pub struct Pools {
    pub projectiles: Pool<Projectile>,
    pub enemy_projectiles: Pool<Projectile>,
    pub particles: Pool<Particle>,
    pub fragments: Pool<Fragment>,
    pub damage_numbers: Pool<DamageNumber>,
}

impl Pools {
    pub fn new(caps: &PoolCapacities) -> Self {
        let pools = Self {
            projectiles: Pool::new("projectiles", caps.projectiles),
            enemy_projectiles: Pool::new("enemy_projectiles", caps.enemy_projectiles),
            particles: Pool::new("particles", caps.particles),
            fragments: Pool::new("fragments", caps.fragments),
            damage_numbers: Pool::new("damage_numbers", caps.damage_numbers),
        };
        log::info!(
            "Object pools initialized: projectiles={}, enemy_projectiles={}, particles={}, fragments={}",
            caps.projectiles,
            caps.enemy_projectiles,
            caps.particles,
            caps.fragments
        );
        pools
    }

    pub fn usage(&self, kind: PoolKind) -> PoolUsage {
        let (active, capacity) = match kind {
            PoolKind::Projectiles => (self.projectiles.active_count(), self.projectiles.capacity()),
            PoolKind::EnemyProjectiles => (
                self.enemy_projectiles.active_count(),
                self.enemy_projectiles.capacity(),
            ),
            PoolKind::Particles => (self.particles.active_count(), self.particles.capacity()),
            PoolKind::Fragments => (self.fragments.active_count(), self.fragments.capacity()),
            PoolKind::DamageNumbers => (
                self.damage_numbers.active_count(),
                self.damage_numbers.capacity(),
            ),
        };
        PoolUsage {
            kind,
            active,
            capacity,
        }
    }

    /// Usage lookup by pool name. Unknown names log and yield `None`.
    pub fn usage_by_name(&self, name: &str) -> Option<PoolUsage> {
        match PoolKind::from_name(name) {
            Ok(kind) => Some(self.usage(kind)),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    /// Force-release everything (game start/restart)
    pub fn reset_all(&mut self) -> usize {
        let counts = [
            ("projectiles", self.projectiles.reset_all()),
            ("enemy_projectiles", self.enemy_projectiles.reset_all()),
            ("particles", self.particles.reset_all()),
            ("fragments", self.fragments.reset_all()),
            ("damage_numbers", self.damage_numbers.reset_all()),
        ];
        for (name, n) in counts {
            log::debug!("Reset {} objects in {} pool", n, name);
        }
        let total = counts.iter().map(|(_, n)| n).sum();
        log::info!("Total pooled objects reset: {}", total);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default, Clone)]
    struct Slot {
        active: bool,
        ttl: u32,
    }

    impl Pooled for Slot {
        fn is_active(&self) -> bool {
            self.active
        }
        fn reset(&mut self) {
            self.active = false;
            self.ttl = 0;
        }
    }

    fn claim(pool: &mut Pool<Slot>, ttl: u32) -> bool {
        match pool.acquire() {
            Some(slot) => {
                slot.active = true;
                slot.ttl = ttl;
                true
            }
            None => false,
        }
    }

    #[test]
    fn test_acquire_until_full_then_miss() {
        let mut pool: Pool<Slot> = Pool::new("test", 3);
        assert!(claim(&mut pool, 1));
        assert!(claim(&mut pool, 1));
        assert!(claim(&mut pool, 1));
        assert_eq!(pool.active_count(), 3);
        assert!(pool.acquire().is_none());
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_first_slot_handed_out_first() {
        let mut pool: Pool<Slot> = Pool::new("test", 4);
        assert!(claim(&mut pool, 1));
        assert!(pool.get(0).is_some_and(|s| s.active));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool: Pool<Slot> = Pool::new("test", 2);
        assert!(claim(&mut pool, 1));
        pool.release(0);
        pool.release(0);
        pool.release(99);
        assert_eq!(pool.active_count(), 0);
        assert!(claim(&mut pool, 1));
        assert!(claim(&mut pool, 1));
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_self_release_in_update_frees_slot() {
        let mut pool: Pool<Slot> = Pool::new("test", 1);
        assert!(claim(&mut pool, 2));
        assert!(pool.acquire().is_none());

        let tick = |s: &mut Slot| {
            s.ttl -= 1;
            if s.ttl == 0 {
                s.reset();
            }
        };
        pool.update_all(tick);
        assert_eq!(pool.active_count(), 1);
        pool.update_all(tick);
        assert_eq!(pool.active_count(), 0);
        assert!(claim(&mut pool, 1));
    }

    #[test]
    fn test_exhaustion_warns_once_per_episode() {
        let mut pool: Pool<Slot> = Pool::new("test", 1);
        assert!(claim(&mut pool, 1));
        assert!(!pool.exhaustion_logged);

        assert!(pool.acquire().is_none());
        assert!(pool.exhaustion_logged);
        assert!(pool.acquire().is_none());
        assert!(pool.exhaustion_logged);

        pool.release(0);
        assert!(!pool.exhaustion_logged);

        assert!(claim(&mut pool, 1));
        assert!(pool.acquire().is_none());
        assert!(pool.exhaustion_logged);
        pool.reset_all();
        assert!(!pool.exhaustion_logged);
    }

    #[test]
    fn test_unspawned_acquire_is_recovered_by_scan() {
        let mut pool: Pool<Slot> = Pool::new("test", 1);
        // Acquire but never spawn
        assert!(pool.acquire().is_some());
        assert!(claim(&mut pool, 1));
    }

    #[test]
    fn test_update_visits_only_active() {
        let mut pool: Pool<Slot> = Pool::new("test", 5);
        assert!(claim(&mut pool, 10));
        assert!(claim(&mut pool, 10));
        let mut visited = 0;
        pool.update_all(|_| visited += 1);
        assert_eq!(visited, 2);
        let mut seen = Vec::new();
        pool.for_each_active(|idx, _| seen.push(idx));
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_reset_all_releases_everything() {
        let mut pool: Pool<Slot> = Pool::new("test", 3);
        for _ in 0..3 {
            assert!(claim(&mut pool, 1));
        }
        assert!(pool.acquire().is_none());
        assert_eq!(pool.reset_all(), 3);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.reset_all(), 0);
    }

    #[test]
    fn test_pool_kind_lookup() {
        assert_eq!(PoolKind::from_name("fragments"), Ok(PoolKind::Fragments));
        assert!(matches!(
            PoolKind::from_name("sparks"),
            Err(SimError::UnknownPool(_))
        ));
        let pools = Pools::new(&PoolCapacities::default());
        assert!(pools.usage_by_name("sparks").is_none());
        assert_eq!(
            pools.usage_by_name("particles").map(|u| u.capacity),
            Some(500)
        );
    }

    proptest! {
        /// Acquire never hands out a slot that is already live, and the active
        /// count never exceeds capacity.
        #[test]
        fn prop_acquire_never_returns_live_slot(
            cap in 1usize..16,
            ops in prop::collection::vec((any::<bool>(), 0usize..16), 0..200),
        ) {
            let mut pool: Pool<Slot> = Pool::new("prop", cap);
            for (acquire, idx) in ops {
                if acquire {
                    let before = pool.active_count();
                    match pool.acquire() {
                        Some(slot) => {
                            prop_assert!(!slot.active);
                            slot.active = true;
                            prop_assert_eq!(pool.active_count(), before + 1);
                        }
                        None => prop_assert_eq!(before, cap),
                    }
                } else {
                    pool.release(idx % cap);
                }
                prop_assert!(pool.active_count() <= cap);
            }
        }
    }
}
