//! The local player: movement feel and health

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::combat::Damageable;
use super::events::OwnerTag;
use super::physics::{Body, Movable};
use crate::{MovementMode, Settings};

/// Smallest step used for movement integration (seconds)
const MIN_STEER_DT: f32 = 0.001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Bright random color (0xRRGGBB), also used for kill credit display
    pub color: u32,
    pub body: Body,
    pub health: f32,
    pub max_health: f32,
    pub movement_mode: MovementMode,
    /// Aim heading (radians)
    pub aim: f32,
}

impl Player {
    pub fn new(name: &str, pos: Vec2, settings: &Settings, rng: &mut impl Rng) -> Self {
        let mut body = Body::solid(pos, settings.player_radius());
        body.bounce = settings.player_bounce;
        Self {
            name: name.to_string(),
            color: crate::hue_color(rng.random_range(0..360) as f32),
            body,
            health: settings.player_max_health,
            max_health: settings.player_max_health,
            movement_mode: settings.movement_default_mode,
            aim: 0.0,
        }
    }

    pub fn owner_tag(&self) -> OwnerTag {
        OwnerTag::new(self.name.clone(), self.color)
    }

    /// Switching to snap drops any residual drift
    pub fn set_movement_mode(&mut self, mode: MovementMode) {
        self.movement_mode = mode;
        if mode == MovementMode::Snap {
            self.body.vel = Vec2::ZERO;
        }
    }

    /// Apply one frame of movement input. `input` need not be normalized;
    /// zero means no keys held.
    pub fn steer(&mut self, input: Vec2, dt: f32, settings: &Settings) {
        let dt = dt.max(MIN_STEER_DT);
        let dir = input.normalize_or_zero();
        let has_input = dir != Vec2::ZERO;

        match self.movement_mode {
            MovementMode::Snap => {
                self.body.vel = dir * settings.kb_snap_speed;
            }
            MovementMode::Glide if has_input => {
                let vel = self.body.vel + dir * settings.kb_acceleration * dt;
                let speed = vel.length();
                self.body.vel = if speed > settings.kb_max_speed {
                    vel * (settings.kb_max_speed / speed)
                } else {
                    vel
                };
            }
            MovementMode::Glide => {
                let damp = settings.kb_drag * dt;
                let decay = |v: f32| {
                    if v.abs() <= damp {
                        0.0
                    } else {
                        v - v.signum() * damp
                    }
                };
                self.body.vel = Vec2::new(decay(self.body.vel.x), decay(self.body.vel.y));
            }
        }
    }

    pub fn aim_at(&mut self, dir: Vec2) {
        if dir != Vec2::ZERO {
            self.aim = crate::heading(dir);
        }
    }

    pub fn reset_health(&mut self) {
        self.health = self.max_health;
    }

    pub fn health_pct(&self) -> f32 {
        (self.health / self.max_health).clamp(0.0, 1.0)
    }
}

impl Movable for Player {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

impl Damageable for Player {
    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
    }
}
