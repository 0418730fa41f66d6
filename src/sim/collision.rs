//! Collision detection and resolution
//!
//! One pass per tick, in a fixed order:
//! 1. player vs enemies and enemy shots (skipped while invulnerable)
//! 2. player shots vs enemies, with kills, loot and death bursts
//! 3. destroyed enemies leave the collection
//! 4. power-up pickups
//! 5. fragment pickups

use glam::Vec2;
use rand::Rng;

use super::archetype::{Ability, BurstParams};
use super::director::spawn_fragments;
use super::enemy::HitOutcome;
use super::entities::{PowerUpPickup, ShotSpec, spawn_particles};
use super::state::{GameEvent, GameState};
use crate::circles_overlap;
use crate::consts::*;
use crate::unit_from_angle;

const DAMAGE_NUMBER_COLOR: u32 = 0xffff00;

/// Run every collision phase for this tick
pub fn resolve_collisions(state: &mut GameState) {
    player_hits(state);
    if state.is_over() {
        return;
    }

    projectile_hits(state);
    remove_destroyed(state);
    if state.is_over() {
        return;
    }

    collect_pickups(state);
    collect_fragments(state);
}

/// Apply damage to the player and start the recovery window.
/// Routes to game over when health runs out.
pub fn damage_player(state: &mut GameState, damage: i32) {
    let now = state.time_ms;
    let player = &mut state.player;
    player.health = (player.health - damage).max(0);
    player.make_invulnerable(now + state.tuning.player.invulnerability_ms);
    player.multiplier = 1.0;
    state.damage_flash_until_ms = now + state.tuning.levels.hit_flash_ms;
    state.events.push(GameEvent::PlayerHit { damage });
    state.events.push(GameEvent::DamageFlash);

    if state.player.health <= 0 {
        state.enter_game_over();
    }
}

/// Phase 1: contact and enemy-shot damage to the player
fn player_hits(state: &mut GameState) {
    if state.player.invulnerable {
        return;
    }
    let arena = state.arena();
    let mut damage = 0;
    let mut hit = false;

    for enemy in state.enemies.iter().filter(|e| e.active) {
        let player = &mut state.player;
        if !circles_overlap(player.pos, player.radius, enemy.pos, enemy.radius) {
            continue;
        }
        damage += enemy.damage;
        hit = true;

        let away = (player.pos - enemy.pos).normalize_or(Vec2::X);
        player.pos += away * KNOCKBACK;
        player.clamp_to(arena);
        let pos = player.pos;
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, WHITE, 10, 3.0, 3.0);
    }

    for idx in state.pools.enemy_projectiles.active_indices() {
        let Some(proj) = state.pools.enemy_projectiles.get(idx) else {
            continue;
        };
        let player = &state.player;
        if !circles_overlap(player.pos, player.radius, proj.pos, proj.radius) {
            continue;
        }
        damage += proj.damage.round() as i32;
        hit = true;
        state.pools.enemy_projectiles.release(idx);
        let pos = state.player.pos;
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, WHITE, 8, 2.5, 2.5);
    }

    if hit {
        damage_player(state, damage);
    }
}

/// Phase 2: player shots against enemies
fn projectile_hits(state: &mut GameState) {
    let now = state.time_ms;

    for pidx in state.pools.projectiles.active_indices() {
        for eidx in 0..state.enemies.len() {
            let Some(proj) = state.pools.projectiles.get(pidx) else {
                break;
            };
            if !proj.active {
                break;
            }
            let enemy = &state.enemies[eidx];
            if !enemy.active || !circles_overlap(proj.pos, proj.radius, enemy.pos, enemy.radius) {
                continue;
            }
            if proj.piercing && proj.has_hit(enemy.id) {
                continue;
            }

            let (damage, piercing, hit_pos) = (proj.damage, proj.piercing, proj.pos);
            let enemy_id = enemy.id;
            let outcome = state.enemies[eidx].take_hit(damage, now);

            spawn_particles(&mut state.pools.particles, &mut state.rng, hit_pos, WHITE, 4, 1.5, 2.0);
            match outcome {
                HitOutcome::ShieldBroken => {
                    let pos = state.enemies[eidx].pos;
                    spawn_particles(&mut state.pools.particles, &mut state.rng, pos, SHIELD_COLOR, 15, 3.0, 3.0);
                    state.events.push(GameEvent::ShieldBroken { id: enemy_id });
                }
                HitOutcome::Wounded | HitOutcome::Killed => {
                    if let Some(number) = state.pools.damage_numbers.acquire() {
                        number.spawn(hit_pos, damage.round() as i32, DAMAGE_NUMBER_COLOR, &mut state.rng);
                    }
                }
                HitOutcome::Shielded => {}
            }

            if piercing {
                if let Some(proj) = state.pools.projectiles.get_mut(pidx) {
                    proj.hit_enemies.push(enemy_id);
                }
            } else {
                state.pools.projectiles.release(pidx);
            }

            if outcome == HitOutcome::Killed {
                destroy_enemy(state, eidx);
            }
        }
    }
}

/// Score, loot and death effects for a killed enemy
fn destroy_enemy(state: &mut GameState, eidx: usize) {
    let enemy = &mut state.enemies[eidx];
    enemy.active = false;
    let (id, archetype, pos, color, ability, ring_damage, fragments) = (
        enemy.id,
        enemy.archetype,
        enemy.pos,
        enemy.color,
        enemy.ability,
        enemy.damage,
        enemy.fragment_count,
    );

    let score = (enemy.value as f32 * 10.0 * state.player.multiplier).floor() as u64;
    state.player.score += score;
    state.events.push(GameEvent::EnemyDestroyed {
        id,
        archetype,
        score,
    });

    match ability {
        Ability::ExplodeBurst(burst) => death_burst(state, pos, &burst, ring_damage),
        _ => spawn_particles(&mut state.pools.particles, &mut state.rng, pos, color, 15, 2.5, 3.0),
    }

    spawn_fragments(state, pos, fragments);

    if state.rng.random::<f32>() < POWERUP_DROP_CHANCE {
        let kind = state.tuning.power_ups.roll(&mut state.rng);
        match state.tuning.power_ups.get(kind) {
            Some(def) => {
                let pickup = PowerUpPickup::new(def, pos, state.time_ms);
                state.pickups.push(pickup);
            }
            None => log::error!("Power-up {} missing from catalog", kind.as_str()),
        }
    }
}

/// Area damage plus a radial ring of enemy shots
fn death_burst(state: &mut GameState, pos: Vec2, burst: &BurstParams, ring_damage: i32) {
    spawn_particles(&mut state.pools.particles, &mut state.rng, pos, burst.color, 35, 4.5, 5.5);

    if !state.player.invulnerable && state.player.pos.distance_squared(pos) < burst.radius * burst.radius {
        damage_player(state, burst.damage);
    }

    let step = std::f32::consts::TAU / burst.count as f32;
    for i in 0..burst.count {
        let Some(proj) = state.pools.enemy_projectiles.acquire() else {
            break;
        };
        proj.spawn(ShotSpec {
            pos,
            radius: ENEMY_SHOT_RADIUS,
            color: ENEMY_PROJECTILE_COLOR,
            direction: unit_from_angle(step * i as f32),
            speed: burst.speed,
            damage: ring_damage as f32,
            piercing: false,
            homing: false,
        });
    }
}

/// Phase 3: drop destroyed enemies. A boss that still has health is never
/// dropped; it is reactivated so the level cannot end while it lives.
fn remove_destroyed(state: &mut GameState) {
    for enemy in state.enemies.iter_mut() {
        if !enemy.active && enemy.is_boss && enemy.health > 0.0 {
            log::warn!("Boss {} marked inactive with {} health, restoring", enemy.id, enemy.health);
            enemy.active = true;
        }
    }
    state.enemies.retain(|e| e.active);
}

/// Phase 4: power-up pickups
fn collect_pickups(state: &mut GameState) {
    let now = state.time_ms;
    let (player_pos, player_radius) = (state.player.pos, state.player.radius);

    let mut collected = Vec::new();
    state.pickups.retain(|pickup| {
        let touching = circles_overlap(player_pos, player_radius, pickup.pos, pickup.radius);
        if touching {
            collected.push((pickup.kind, pickup.pos, pickup.color));
        }
        !touching
    });

    for (kind, pos, color) in collected {
        let Some(def) = state.tuning.power_ups.get(kind).copied() else {
            log::error!("Power-up {} missing from catalog", kind.as_str());
            continue;
        };
        state.player.activate_power_up(&def, now);
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, color, 15, 2.5, 3.5);
        state.events.push(GameEvent::PowerUpCollected(kind));
        log::debug!("Collected {}", kind.as_str());
    }
}

/// Phase 5: fragment pickups
fn collect_fragments(state: &mut GameState) {
    let now = state.time_ms;
    let max = state.tuning.player.max_multiplier;

    for idx in state.pools.fragments.active_indices() {
        let Some(frag) = state.pools.fragments.get(idx) else {
            continue;
        };
        let player = &state.player;
        if !circles_overlap(player.pos, player.radius, frag.pos, frag.radius) {
            continue;
        }
        let (value, pos, color) = (frag.value, frag.pos, frag.color);
        state.player.collect_fragment(value, now, max);
        spawn_particles(&mut state.pools.particles, &mut state.rng, pos, color, 3, 1.0, 1.5);
        state.pools.fragments.release(idx);
        state.events.push(GameEvent::FragmentCollected);
    }
}
