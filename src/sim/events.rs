//! Facts the simulation reports to the outside world
//!
//! Delivered synchronously once per tick, in the order they happened.
//! Listeners (HUD, audio, score display) decide how to fan them out.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Who dealt damage: display name and color (0xRRGGBB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerTag {
    pub name: String,
    pub color: u32,
}

impl OwnerTag {
    pub fn new(name: impl Into<String>, color: u32) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Enemy revealed by a sonar ping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SonarBlip {
    pub enemy_id: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Non-zero damage landed on an enemy (amount is post-clamp)
    EnemyDamaged {
        target_id: u32,
        amount: f32,
        pos: Vec2,
        dealer_name: String,
        /// This hit brought the enemy to zero
        lethal: bool,
    },
    /// Enemy health reached zero
    EnemyKilled {
        target_id: u32,
        amount: f32,
        pos: Vec2,
        dealer_name: String,
        score_award: u32,
        killer_color: u32,
    },
    /// Area damage detonation
    ExplosionOccurred {
        center: Vec2,
        radius: f32,
        damage: f32,
        dealer_name: String,
    },
    /// Sonar cell pinged
    SonarPing {
        cell: String,
        center: Vec2,
        ring_duration_ms: u64,
        blip_duration_ms: u64,
        blips: Vec<SonarBlip>,
    },
    /// Contact damage on the player
    PlayerDamaged {
        amount: f32,
        remaining: f32,
        enemy_id: u32,
    },
    PlayerDied {
        name: String,
        pos: Vec2,
    },
    /// Whole-arena reset; `epoch` is the new epoch number
    ArenaReset {
        epoch: u32,
    },
}

/// Receiver for simulation facts
pub trait EventSink {
    fn emit(&mut self, event: &GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: &GameEvent) {
        self.push(event.clone());
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &GameEvent) {}
}
