//! Projectile lifecycle
//!
//! Bullets and rockets live in bounded pools and are reused across shots.
//! A projectile leaves play in exactly one way, `expire`: bullets vanish,
//! rockets detonate. Range, the ricochet cap and obstacle impacts all funnel
//! into it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::OwnerTag;
use super::physics::{Body, Movable};
use crate::consts::{BULLET_RADIUS, ROCKET_RADIUS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Fast, single target
    Bullet,
    /// Slow, area damage on expiry
    Rocket,
}

impl ProjectileKind {
    pub fn radius(&self) -> f32 {
        match self {
            ProjectileKind::Bullet => BULLET_RADIUS,
            ProjectileKind::Rocket => ROCKET_RADIUS,
        }
    }
}

/// Everything needed to launch a projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireParams {
    pub origin: Vec2,
    pub velocity: Vec2,
    pub range: f32,
    pub damage: f32,
    pub ricochet_max: u32,
    /// Detonation radius (rockets only)
    pub blast_radius: f32,
    pub owner: OwnerTag,
}

/// How a projectile left play
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    Vanished,
    Detonated {
        center: Vec2,
        radius: f32,
        damage: f32,
        owner: OwnerTag,
    },
}

/// A pooled projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub active: bool,
    pub body: Body,
    pub spawn_pos: Vec2,
    pub max_range_sq: f32,
    pub damage: f32,
    /// Wall bounces survived so far (never decreases while in flight)
    pub ricochet_count: u32,
    pub ricochet_max: u32,
    pub blast_radius: f32,
    pub owner: OwnerTag,
}

impl Projectile {
    /// Inactive instance for a pool
    pub fn new(kind: ProjectileKind) -> Self {
        Self {
            kind,
            active: false,
            body: Body::sensor(Vec2::ZERO, kind.radius()),
            spawn_pos: Vec2::ZERO,
            max_range_sq: 0.0,
            damage: 0.0,
            ricochet_count: 0,
            ricochet_max: 0,
            blast_radius: 0.0,
            owner: OwnerTag::new("", 0),
        }
    }

    /// Reset to an active shot
    pub fn fire(&mut self, params: &FireParams) {
        self.active = true;
        self.body = Body::sensor(params.origin, self.kind.radius());
        self.body.vel = params.velocity;
        self.spawn_pos = params.origin;
        self.max_range_sq = params.range * params.range;
        self.damage = params.damage;
        self.ricochet_count = 0;
        self.ricochet_max = params.ricochet_max;
        self.blast_radius = params.blast_radius;
        self.owner = params.owner.clone();
    }

    /// Expire once the projectile has travelled its full range
    pub fn check_range(&mut self) -> Option<Expiry> {
        if !self.active {
            return None;
        }
        if self.body.pos.distance_squared(self.spawn_pos) >= self.max_range_sq {
            return Some(self.expire());
        }
        None
    }

    /// The physics provider reflected us off a wall
    pub fn on_world_bounce(&mut self) -> Option<Expiry> {
        if !self.active {
            return None;
        }
        if self.ricochet_count < self.ricochet_max {
            self.ricochet_count += 1;
            return None;
        }
        Some(self.expire())
    }

    /// Touched a solid pin block
    pub fn on_obstacle_impact(&mut self) -> Option<Expiry> {
        if !self.active {
            return None;
        }
        Some(self.expire())
    }

    /// Leave play: bullets vanish, rockets detonate where they are
    pub fn expire(&mut self) -> Expiry {
        let expiry = match self.kind {
            ProjectileKind::Bullet => Expiry::Vanished,
            ProjectileKind::Rocket => Expiry::Detonated {
                center: self.body.pos,
                radius: self.blast_radius,
                damage: self.damage,
                owner: self.owner.clone(),
            },
        };
        self.deactivate();
        expiry
    }

    /// Silent removal (consumed by a direct hit or cleared at reset)
    pub fn deactivate(&mut self) {
        self.active = false;
        self.body.vel = Vec2::ZERO;
    }
}

impl Movable for Projectile {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// Bounded reuse pool for one projectile kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectilePool {
    kind: ProjectileKind,
    max_size: usize,
    items: Vec<Projectile>,
}

impl ProjectilePool {
    pub fn new(kind: ProjectileKind, max_size: usize) -> Self {
        Self {
            kind,
            max_size,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> ProjectileKind {
        self.kind
    }

    /// Reuse an inactive slot, or grow up to the cap
    pub fn acquire(&mut self) -> Option<&mut Projectile> {
        if let Some(idx) = self.items.iter().position(|p| !p.active) {
            return self.items.get_mut(idx);
        }
        if self.items.len() < self.max_size {
            self.items.push(Projectile::new(self.kind));
            return self.items.last_mut();
        }
        None
    }

    /// Acquire and fire in one step. `false` when the pool is exhausted.
    pub fn fire(&mut self, params: &FireParams) -> bool {
        match self.acquire() {
            Some(projectile) => {
                projectile.fire(params);
                true
            }
            None => {
                log::debug!("{:?} pool exhausted, shot dropped", self.kind);
                false
            }
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &Projectile> {
        self.items.iter().filter(|p| p.active)
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.items.iter_mut().filter(|p| p.active)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Range check for every active projectile
    pub fn expire_out_of_range(&mut self) -> Vec<Expiry> {
        self.active_mut().filter_map(|p| p.check_range()).collect()
    }

    /// Deactivate everything in flight
    pub fn clear(&mut self) {
        for p in &mut self.items {
            p.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(range: f32, ricochet_max: u32) -> FireParams {
        FireParams {
            origin: Vec2::new(100.0, 100.0),
            velocity: Vec2::new(500.0, 0.0),
            range,
            damage: 80.0,
            ricochet_max,
            blast_radius: 90.0,
            owner: OwnerTag::new("ace", 0xff00ff),
        }
    }

    #[test]
    fn test_fire_resets_state() {
        let mut p = Projectile::new(ProjectileKind::Bullet);
        p.ricochet_count = 5;
        p.fire(&params(300.0, 2));
        assert!(p.active);
        assert_eq!(p.ricochet_count, 0);
        assert_eq!(p.max_range_sq, 90_000.0);
        assert_eq!(p.spawn_pos, Vec2::new(100.0, 100.0));
        assert_eq!(p.body.vel, Vec2::new(500.0, 0.0));
    }

    #[test]
    fn test_bullet_range_expiry_vanishes() {
        let mut p = Projectile::new(ProjectileKind::Bullet);
        p.fire(&params(300.0, 0));
        p.body.pos.x = 399.0;
        assert_eq!(p.check_range(), None);
        p.body.pos.x = 400.0;
        assert_eq!(p.check_range(), Some(Expiry::Vanished));
        assert!(!p.active);
        assert_eq!(p.check_range(), None);
    }

    #[test]
    fn test_rocket_ricochet_then_detonate() {
        let mut p = Projectile::new(ProjectileKind::Rocket);
        p.fire(&params(10_000.0, 1));

        assert_eq!(p.on_world_bounce(), None);
        assert_eq!(p.ricochet_count, 1);
        assert!(p.active);

        p.body.pos = Vec2::new(40.0, 60.0);
        match p.on_world_bounce() {
            Some(Expiry::Detonated {
                center,
                radius,
                damage,
                owner,
            }) => {
                assert_eq!(center, Vec2::new(40.0, 60.0));
                assert_eq!(radius, 90.0);
                assert_eq!(damage, 80.0);
                assert_eq!(owner.name, "ace");
            }
            other => panic!("expected detonation, got {:?}", other),
        }
        assert!(!p.active);
        assert_eq!(p.ricochet_count, 1);
    }

    #[test]
    fn test_obstacle_impact() {
        let mut bullet = Projectile::new(ProjectileKind::Bullet);
        bullet.fire(&params(900.0, 3));
        assert_eq!(bullet.on_obstacle_impact(), Some(Expiry::Vanished));

        let mut rocket = Projectile::new(ProjectileKind::Rocket);
        rocket.fire(&params(900.0, 3));
        assert!(matches!(
            rocket.on_obstacle_impact(),
            Some(Expiry::Detonated { .. })
        ));
        // Already gone: a second signal in the same tick is ignored
        assert_eq!(rocket.on_obstacle_impact(), None);
    }

    #[test]
    fn test_pool_reuse_and_cap() {
        let mut pool = ProjectilePool::new(ProjectileKind::Bullet, 2);
        assert!(pool.fire(&params(10.0, 0)));
        assert!(pool.fire(&params(10.0, 0)));
        assert!(!pool.fire(&params(10.0, 0)));
        assert_eq!(pool.active_count(), 2);

        if let Some(p) = pool.active_mut().next() {
            p.deactivate();
        }
        assert!(pool.fire(&params(10.0, 0)));
        assert_eq!(pool.active_count(), 2);

        pool.clear();
        assert_eq!(pool.active_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_ricochet_bounded(max in 0u32..5, bounces in 0usize..20) {
            let mut p = Projectile::new(ProjectileKind::Rocket);
            p.fire(&params(1e9, max));
            let mut last = 0;
            for _ in 0..bounces {
                let _ = p.on_world_bounce();
                prop_assert!(p.ricochet_count >= last);
                prop_assert!(p.ricochet_count <= p.ricochet_max);
                last = p.ricochet_count;
            }
            prop_assert_eq!(p.active, bounces as u32 <= max);
        }
    }
}
