//! Player weapons: primary bullets, secondary rockets, echo scheduling

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cells::{CombatMods, ProjectileMods};
use super::events::OwnerTag;
use super::projectile::{FireParams, ProjectileKind, ProjectilePool};
use super::timers::{DeferredAction, TimerWheel};
use crate::Settings;

/// Fire input for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Trigger {
    pub origin: Vec2,
    /// Unit aim direction
    pub aim: Vec2,
    pub primary: bool,
    pub secondary: bool,
}

/// What left the barrel this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Volley {
    pub primary: bool,
    pub secondary: bool,
    pub echo_scheduled: bool,
}

/// Cooldowns plus the two projectile pools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapons {
    pub next_primary_at: u64,
    pub next_secondary_at: u64,
    pub bullets: ProjectilePool,
    pub rockets: ProjectilePool,
}

impl Weapons {
    pub fn new(settings: &Settings) -> Self {
        Self {
            next_primary_at: 0,
            next_secondary_at: 0,
            bullets: ProjectilePool::new(ProjectileKind::Bullet, settings.bullet_pool_size as usize),
            rockets: ProjectilePool::new(ProjectileKind::Rocket, settings.rocket_pool_size as usize),
        }
    }

    /// Fire whatever is held and off cooldown. Modifiers come from the
    /// firer's cell and are sampled once, here.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        now: u64,
        trigger: &Trigger,
        owner: &OwnerTag,
        mods: &ProjectileMods,
        combat: &CombatMods,
        settings: &Settings,
        timers: &mut TimerWheel,
    ) -> Volley {
        let mut volley = Volley::default();
        let aim = trigger.aim.normalize_or_zero();
        if aim == Vec2::ZERO {
            return volley;
        }

        if trigger.primary && now >= self.next_primary_at {
            self.next_primary_at = now + settings.primary_interval_ms();
            let params = FireParams {
                origin: trigger.origin,
                velocity: aim * settings.primary_bullet_speed * mods.speed_scale,
                range: settings.primary_range,
                damage: settings.primary_damage * combat.out_damage_scale,
                ricochet_max: settings.primary_ricochet_max,
                blast_radius: 0.0,
                owner: owner.clone(),
            };
            volley.primary = self.bullets.fire(&params);

            if let (true, Some(echo)) = (volley.primary, mods.echo) {
                let echo_shot = FireParams {
                    velocity: aim * settings.primary_bullet_speed * echo.speed_scale,
                    ..params
                };
                timers.schedule(now + echo.delay_ms, DeferredAction::EchoShot(echo_shot));
                volley.echo_scheduled = true;
            }
        }

        if trigger.secondary && now >= self.next_secondary_at {
            self.next_secondary_at = now + settings.secondary_interval_ms();
            let params = FireParams {
                origin: trigger.origin,
                velocity: aim * settings.secondary_projectile_speed * mods.speed_scale,
                range: settings.secondary_range,
                damage: settings.secondary_damage * combat.out_damage_scale,
                ricochet_max: settings.secondary_ricochet_max,
                blast_radius: settings.secondary_explosion_radius,
                owner: owner.clone(),
            };
            volley.secondary = self.rockets.fire(&params);
        }

        volley
    }

    /// Launch a deferred echo bullet. Dropped silently if the pool is full.
    pub fn fire_echo(&mut self, params: &FireParams) -> bool {
        self.bullets.fire(params)
    }

    /// Clear everything in flight and rearm both weapons
    pub fn reset(&mut self) {
        self.bullets.clear();
        self.rockets.clear();
        self.next_primary_at = 0;
        self.next_secondary_at = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::cells::EchoMod;

    fn trigger(primary: bool, secondary: bool) -> Trigger {
        Trigger {
            origin: Vec2::new(300.0, 300.0),
            aim: Vec2::new(2.0, 0.0),
            primary,
            secondary,
        }
    }

    fn owner() -> OwnerTag {
        OwnerTag::new("ace", 0xffffff)
    }

    #[test]
    fn test_primary_rate_limit() {
        let s = Settings::default();
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let mods = ProjectileMods::default();
        let combat = CombatMods::default();

        let v = weapons.update(1_000, &trigger(true, false), &owner(), &mods, &combat, &s, &mut timers);
        assert!(v.primary);
        let v = weapons.update(1_099, &trigger(true, false), &owner(), &mods, &combat, &s, &mut timers);
        assert!(!v.primary);
        let v = weapons.update(1_100, &trigger(true, false), &owner(), &mods, &combat, &s, &mut timers);
        assert!(v.primary);
        assert_eq!(weapons.bullets.active_count(), 2);

        let b = weapons.bullets.active().next().unwrap();
        assert_eq!(b.body.vel, Vec2::new(900.0, 0.0));
        assert_eq!(b.damage, 10.0);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_secondary_cooldown_and_blast() {
        let s = Settings::default();
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let mods = ProjectileMods::default();
        let combat = CombatMods::default();

        assert!(weapons.update(0, &trigger(false, true), &owner(), &mods, &combat, &s, &mut timers).secondary);
        assert!(!weapons.update(1_799, &trigger(false, true), &owner(), &mods, &combat, &s, &mut timers).secondary);
        assert!(weapons.update(1_800, &trigger(false, true), &owner(), &mods, &combat, &s, &mut timers).secondary);

        let r = weapons.rockets.active().next().unwrap();
        assert_eq!(r.blast_radius, 90.0);
        assert_eq!(r.damage, 80.0);
        assert_eq!(r.body.vel, Vec2::new(560.0, 0.0));
    }

    #[test]
    fn test_echo_scheduled_with_captured_params() {
        let s = Settings::default();
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let mods = ProjectileMods {
            speed_scale: 1.0,
            echo: Some(EchoMod {
                delay_ms: 120,
                speed_scale: 0.5,
            }),
        };
        let combat = CombatMods::default();

        let v = weapons.update(2_000, &trigger(true, true), &owner(), &mods, &combat, &s, &mut timers);
        assert!(v.primary && v.secondary && v.echo_scheduled);
        assert_eq!(timers.next_due(), Some(2_120));

        match timers.drain_due(2_120).pop() {
            Some(DeferredAction::EchoShot(p)) => {
                assert_eq!(p.origin, Vec2::new(300.0, 300.0));
                assert_eq!(p.velocity, Vec2::new(450.0, 0.0));
                assert_eq!(p.damage, 10.0);
                assert!(weapons.fire_echo(&p));
            }
            None => panic!("echo not scheduled"),
        }
        assert_eq!(weapons.bullets.active_count(), 2);
    }

    #[test]
    fn test_exhausted_pool_drops_shot_and_echo() {
        let s = Settings {
            bullet_pool_size: 1,
            ..Default::default()
        };
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let mods = ProjectileMods {
            speed_scale: 1.0,
            echo: Some(EchoMod {
                delay_ms: 120,
                speed_scale: 0.5,
            }),
        };
        let combat = CombatMods::default();

        assert!(weapons.update(0, &trigger(true, false), &owner(), &mods, &combat, &s, &mut timers).primary);
        let v = weapons.update(500, &trigger(true, false), &owner(), &mods, &combat, &s, &mut timers);
        assert!(!v.primary && !v.echo_scheduled);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_reset_clears_pools_and_cooldowns() {
        let s = Settings::default();
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let mods = ProjectileMods::default();
        let combat = CombatMods::default();
        weapons.update(0, &trigger(true, true), &owner(), &mods, &combat, &s, &mut timers);
        weapons.reset();
        assert_eq!(weapons.bullets.active_count(), 0);
        assert_eq!(weapons.rockets.active_count(), 0);
        assert!(weapons.update(1, &trigger(true, true), &owner(), &mods, &combat, &s, &mut timers).secondary);
    }

    #[test]
    fn test_zero_aim_holds_fire() {
        let s = Settings::default();
        let mut weapons = Weapons::new(&s);
        let mut timers = TimerWheel::new();
        let t = Trigger {
            aim: Vec2::ZERO,
            ..trigger(true, true)
        };
        let v = weapons.update(0, &t, &owner(), &ProjectileMods::default(), &CombatMods::default(), &s, &mut timers);
        assert_eq!(v, Volley::default());
    }
}
