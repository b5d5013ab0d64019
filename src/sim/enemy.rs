//! Enemy population and patrol/pursue AI
//!
//! The state machine is recomputed from scratch every tick: pursue whenever
//! the player is within detection range, otherwise patrol between random
//! waypoints. Kinds only differ in their stat row.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::physics::{Body, Movable};
use crate::consts::{ENEMY_RADIUS, ENEMY_SPAWN_PADDING, FACING_MIN_SPEED, WAYPOINT_PADDING};
use crate::{Rect, Settings, random_point_in};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Normal,
    Speed,
    Strong,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Normal, EnemyKind::Speed, EnemyKind::Strong];

    /// 60% normal, 25% speed, 15% strong
    pub fn roll(rng: &mut impl Rng) -> Self {
        let r: f32 = rng.random();
        if r < 0.6 {
            EnemyKind::Normal
        } else if r < 0.85 {
            EnemyKind::Speed
        } else {
            EnemyKind::Strong
        }
    }
}

/// Per-kind constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub health: f32,
    pub max_speed: f32,
    pub accel: f32,
    pub kill_score: u32,
    pub contact_damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    Patrol,
    Pursue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub body: Body,
    pub health: f32,
    pub max_health: f32,
    pub detect_radius: f32,
    pub accel: f32,
    pub max_speed: f32,
    pub waypoint_radius: f32,
    pub kill_score: u32,
    pub contact_damage: f32,
    pub ai_state: AiState,
    pub waypoint: Option<Vec2>,
    /// Facing (radians), follows velocity above a small speed
    pub rotation: f32,
    /// Random hue for rendering and shatter effects
    pub color: u32,
}

impl Enemy {
    pub fn spawn(id: u32, kind: EnemyKind, pos: Vec2, settings: &Settings, rng: &mut impl Rng) -> Self {
        let stats = settings.kind_stats(kind);
        let mut body = Body::solid(pos, ENEMY_RADIUS);
        body.drag = settings.enemy_drag;
        Self {
            id,
            kind,
            body,
            health: stats.health,
            max_health: stats.health,
            detect_radius: settings.enemy_detect_radius,
            accel: stats.accel,
            max_speed: stats.max_speed,
            waypoint_radius: settings.enemy_patrol_waypoint_radius,
            kill_score: stats.kill_score,
            contact_damage: stats.contact_damage,
            ai_state: AiState::Patrol,
            waypoint: None,
            rotation: 0.0,
            color: crate::hue_color(rng.random_range(0.0..360.0)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// One AI step: choose a target, accelerate toward it, cap speed.
    /// `playfield` is the walled area; waypoints stay inset from it.
    pub fn update_ai(&mut self, player: Option<Vec2>, dt: f32, playfield: &Rect, rng: &mut impl Rng) {
        let pos = self.body.pos;

        let target = match player {
            Some(p) if pos.distance(p) <= self.detect_radius => {
                self.ai_state = AiState::Pursue;
                p
            }
            _ => {
                self.ai_state = AiState::Patrol;
                self.patrol_target(playfield, rng)
            }
        };

        let dir = (target - pos).normalize_or_zero();
        let vel = self.body.vel + dir * self.accel * dt;
        let speed = vel.length();
        self.body.vel = if speed > self.max_speed {
            vel * (self.max_speed / speed)
        } else {
            vel
        };

        if speed > FACING_MIN_SPEED {
            self.rotation = crate::heading(vel);
        }
    }

    fn patrol_target(&mut self, playfield: &Rect, rng: &mut impl Rng) -> Vec2 {
        let reached = self
            .waypoint
            .is_some_and(|w| self.body.pos.distance(w) < self.waypoint_radius);
        match self.waypoint {
            Some(w) if !reached => w,
            _ => {
                let w = random_point_in(&playfield.inset(WAYPOINT_PADDING), rng);
                self.waypoint = Some(w);
                w
            }
        }
    }
}

impl Movable for Enemy {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// Live enemies, ordered by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyPopulation {
    enemies: Vec<Enemy>,
}

impl EnemyPopulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy everyone and spawn `enemy_count` fresh enemies at random
    /// positions inside the playfield. `next_id` hands out entity ids.
    pub fn repopulate(
        &mut self,
        settings: &Settings,
        playfield: &Rect,
        next_id: &mut dyn FnMut() -> u32,
        rng: &mut impl Rng,
    ) {
        self.enemies.clear();
        let area = playfield.inset(ENEMY_SPAWN_PADDING);
        for _ in 0..settings.enemy_count {
            let kind = EnemyKind::roll(rng);
            let pos = random_point_in(&area, rng);
            let id = next_id();
            log::debug!("Spawn {:?} enemy {} at ({:.0}, {:.0})", kind, id, pos.x, pos.y);
            self.enemies.push(Enemy::spawn(id, kind, pos, settings, rng));
        }
    }

    pub fn update(&mut self, player: Option<Vec2>, dt: f32, playfield: &Rect, rng: &mut impl Rng) {
        for enemy in self.enemies.iter_mut().filter(|e| e.is_alive()) {
            enemy.update_ai(player, dt, playfield, rng);
        }
    }

    pub fn insert(&mut self, enemy: Enemy) {
        let idx = self.enemies.partition_point(|e| e.id < enemy.id);
        self.enemies.insert(idx, enemy);
    }

    pub fn get(&self, id: u32) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Destroy an enemy
    pub fn remove(&mut self, id: u32) -> Option<Enemy> {
        let idx = self.enemies.iter().position(|e| e.id == id)?;
        Some(self.enemies.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.iter_mut()
    }

    /// Ids and positions, for collaborators that only look
    pub fn positions(&self) -> impl Iterator<Item = (u32, Vec2)> + '_ {
        self.enemies.iter().map(|e| (e.id, e.body.pos))
    }

    pub fn ids(&self) -> Vec<u32> {
        self.enemies.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn clear(&mut self) {
        self.enemies.clear();
    }
}
