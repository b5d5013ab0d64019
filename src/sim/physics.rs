//! Physics provider contract and a small arcade implementation
//!
//! The simulation only needs a handful of queries and mutations from a
//! physics engine: integrate a body, tell us when it touched the arena walls
//! or a solid obstacle, and answer circle-overlap tests. Hosts with a real
//! rigid-body engine implement `PhysicsProvider`; `ArcadePhysics` is enough
//! for headless runs and tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Rect;

/// How a body reacts to solid obstacles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyResponse {
    /// Pushed out of obstacles
    Solid,
    /// Passes through, contact is only reported
    Sensor,
}

/// Circle body in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Linear deceleration per axis (units/s^2), applied every step
    pub drag: f32,
    /// Restitution against the arena walls (1 = perfect reflection)
    pub bounce: f32,
    pub response: BodyResponse,
}

impl Body {
    pub fn solid(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            drag: 0.0,
            bounce: 0.0,
            response: BodyResponse::Solid,
        }
    }

    pub fn sensor(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            drag: 0.0,
            bounce: 1.0,
            response: BodyResponse::Sensor,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Anything that owns a body
pub trait Movable {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;

    fn position(&self) -> Vec2 {
        self.body().pos
    }

    fn velocity(&self) -> Vec2 {
        self.body().vel
    }

    fn set_velocity(&mut self, vel: Vec2) {
        self.body_mut().vel = vel;
    }
}

/// Square static blocker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub size: f32,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        let half = Vec2::splat(self.size / 2.0);
        Rect::new(self.center - half, self.center + half)
    }
}

/// What a body touched during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    /// Hit (and was reflected or stopped by) an arena wall
    pub world_bounds: bool,
    /// Overlapped a solid obstacle
    pub obstacle: bool,
}

/// Queries and mutations the simulation needs from a physics engine
pub trait PhysicsProvider {
    fn set_world_bounds(&mut self, bounds: Rect);

    /// Static squares that block movement. Replaces any previous set.
    fn register_obstacles(&mut self, obstacles: &[Obstacle]);

    fn clear_obstacles(&mut self);

    /// Integrate one body by `dt` seconds: drag, motion, wall and obstacle response
    fn step(&mut self, body: &mut Body, dt: f32) -> Contacts;

    /// Circle-circle overlap
    fn overlaps(&self, a: &Body, b: &Body) -> bool {
        circles_overlap(a.pos, a.radius, b.pos, b.radius)
    }
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

/// Reflect velocity across a surface normal
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Penetration of a circle into a rectangle: push-out normal and depth
pub fn circle_rect_penetration(center: Vec2, radius: f32, rect: &Rect) -> Option<(Vec2, f32)> {
    let closest = center.clamp(rect.min, rect.max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > radius * radius {
        return None;
    }

    if dist_sq > f32::EPSILON {
        let dist = dist_sq.sqrt();
        return Some((delta / dist, radius - dist));
    }

    // Center inside the rectangle: leave through the nearest face
    let to_left = center.x - rect.min.x;
    let to_right = rect.max.x - center.x;
    let to_top = center.y - rect.min.y;
    let to_bottom = rect.max.y - center.y;
    let nearest = to_left.min(to_right).min(to_top).min(to_bottom);
    let normal = if nearest == to_left {
        Vec2::NEG_X
    } else if nearest == to_right {
        Vec2::X
    } else if nearest == to_top {
        Vec2::NEG_Y
    } else {
        Vec2::Y
    };
    Some((normal, nearest + radius))
}

/// Axis-aligned arcade physics: walls, per-axis drag, square obstacles
#[derive(Debug, Clone)]
pub struct ArcadePhysics {
    bounds: Rect,
    obstacles: Vec<Obstacle>,
}

impl ArcadePhysics {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            obstacles: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    fn apply_drag(body: &mut Body, dt: f32) {
        if body.drag <= 0.0 {
            return;
        }
        let damp = body.drag * dt;
        let decay = |v: f32| {
            if v.abs() <= damp {
                0.0
            } else {
                v - v.signum() * damp
            }
        };
        body.vel = Vec2::new(decay(body.vel.x), decay(body.vel.y));
    }

    fn resolve_walls(&self, body: &mut Body) -> bool {
        let min = self.bounds.min + Vec2::splat(body.radius);
        let max = self.bounds.max - Vec2::splat(body.radius);
        let mut hit = false;

        if body.pos.x < min.x {
            body.pos.x = min.x;
            body.vel.x = body.vel.x.abs() * body.bounce;
            hit = true;
        } else if body.pos.x > max.x {
            body.pos.x = max.x;
            body.vel.x = -body.vel.x.abs() * body.bounce;
            hit = true;
        }

        if body.pos.y < min.y {
            body.pos.y = min.y;
            body.vel.y = body.vel.y.abs() * body.bounce;
            hit = true;
        } else if body.pos.y > max.y {
            body.pos.y = max.y;
            body.vel.y = -body.vel.y.abs() * body.bounce;
            hit = true;
        }

        hit
    }

    fn resolve_obstacles(&self, body: &mut Body) -> bool {
        let mut touched = false;
        for obstacle in &self.obstacles {
            let Some((normal, depth)) = circle_rect_penetration(body.pos, body.radius, &obstacle.rect())
            else {
                continue;
            };
            touched = true;
            if body.response == BodyResponse::Sensor {
                // Sensors only need to know they touched something
                break;
            }
            body.pos += normal * depth;
            let into = body.vel.dot(normal);
            if into < 0.0 {
                body.vel -= normal * into;
            }
        }
        touched
    }
}

impl PhysicsProvider for ArcadePhysics {
    fn set_world_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn register_obstacles(&mut self, obstacles: &[Obstacle]) {
        self.obstacles = obstacles.to_vec();
    }

    fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    fn step(&mut self, body: &mut Body, dt: f32) -> Contacts {
        Self::apply_drag(body, dt);
        body.pos += body.vel * dt;
        let world_bounds = self.resolve_walls(body);
        let obstacle = self.resolve_obstacles(body);
        Contacts {
            world_bounds,
            obstacle,
        }
    }
}
