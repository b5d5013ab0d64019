//! Damage resolution
//!
//! Hits and explosions clamp damage to the target's remaining health, so
//! health never goes negative and a zero-damage hit is invisible. Facts go
//! to an outbox the tick drains into the ledger and the event sink.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::{Enemy, EnemyPopulation};
use super::events::{GameEvent, OwnerTag};
use super::physics::Movable;

/// Anything with a health pool
pub trait Damageable {
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    fn set_health(&mut self, health: f32);

    /// Take up to `damage`, returning the amount actually removed
    fn take_damage(&mut self, damage: f32) -> f32 {
        let amount = damage.max(0.0).min(self.health());
        if amount > 0.0 {
            self.set_health(self.health() - amount);
            amount
        } else {
            0.0
        }
    }

    fn is_dead(&self) -> bool {
        self.health() <= 0.0
    }
}

impl Damageable for Enemy {
    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn set_health(&mut self, health: f32) {
        self.health = health.max(0.0);
    }
}

/// What one hit did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub amount: f32,
    pub killed: bool,
}

/// Apply clamped damage to one enemy. Emits `EnemyDamaged`, and on a kill
/// also `EnemyKilled` before the enemy is destroyed. `None` if the enemy is
/// gone or nothing was dealt.
pub fn apply_hit(
    enemies: &mut EnemyPopulation,
    target_id: u32,
    damage: f32,
    dealer: &OwnerTag,
    out: &mut Vec<GameEvent>,
) -> Option<HitOutcome> {
    let enemy = enemies.get_mut(target_id)?;
    let amount = enemy.take_damage(damage);
    if amount <= 0.0 {
        return None;
    }

    let pos = enemy.position();
    let killed = enemy.is_dead();
    out.push(GameEvent::EnemyDamaged {
        target_id,
        amount,
        pos,
        dealer_name: dealer.name.clone(),
        lethal: killed,
    });

    if killed {
        out.push(GameEvent::EnemyKilled {
            target_id,
            amount,
            pos,
            dealer_name: dealer.name.clone(),
            score_award: enemy.kill_score,
            killer_color: dealer.color,
        });
        log::debug!("{} killed enemy {}", dealer.name, target_id);
        enemies.remove(target_id);
    }

    Some(HitOutcome { amount, killed })
}

/// Full `damage` to every live enemy within `radius` of `center`.
/// Returns how many enemies took damage.
pub fn apply_explosion(
    enemies: &mut EnemyPopulation,
    center: Vec2,
    radius: f32,
    damage: f32,
    dealer: &OwnerTag,
    out: &mut Vec<GameEvent>,
) -> usize {
    let radius_sq = radius * radius;
    let in_range: Vec<u32> = enemies
        .iter()
        .filter(|e| e.is_alive() && e.position().distance_squared(center) <= radius_sq)
        .map(|e| e.id)
        .collect();

    in_range
        .into_iter()
        .filter_map(|id| apply_hit(enemies, id, damage, dealer, out))
        .count()
}

/// Shared contact-damage cooldown for the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDamage {
    pub cooldown_ms: u64,
    pub last_hit_at: Option<u64>,
}

impl ContactDamage {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_hit_at: None,
        }
    }

    /// Whether a contact at `now` may land; arms the cooldown if so
    pub fn try_hit(&mut self, now: u64) -> bool {
        if self
            .last_hit_at
            .is_some_and(|last| now.saturating_sub(last) < self.cooldown_ms)
        {
            return false;
        }
        self.last_hit_at = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_hit_at = None;
    }
}

/// Contact damage after the incoming cell scale
pub fn scaled_contact_damage(damage: f32, in_damage_scale: f32) -> f32 {
    (damage * in_damage_scale).round().max(0.0)
}
