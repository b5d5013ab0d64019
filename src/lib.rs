//! Grid Arena - A top-down arena shooter on a rule-carrying cell grid
//!
//! Core modules:
//! - `sim`: Tick-driven simulation (grid, special cells, enemy AI, projectiles, combat)
//! - `settings`: Immutable configuration with launch-parameter overrides

pub mod settings;
pub mod sim;

pub use settings::{MovementMode, Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal simulation timestep for hosts that drive at a fixed rate (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Body radii
    pub const ENEMY_RADIUS: f32 = 14.0;
    pub const BULLET_RADIUS: f32 = 4.0;
    pub const ROCKET_RADIUS: f32 = 6.0;
    /// Player collision circle never shrinks below this
    pub const PLAYER_MIN_RADIUS: f32 = 8.0;

    /// Random placement padding from the playfield walls
    pub const ENEMY_SPAWN_PADDING: f32 = 80.0;
    pub const WAYPOINT_PADDING: f32 = 24.0;

    /// Below this speed an enemy keeps its previous facing
    pub const FACING_MIN_SPEED: f32 = 10.0;

    /// Attempts to find a free cell for one special-cell token
    pub const PLACEMENT_RETRIES: u32 = 999;
    /// Per-type special cell request cap
    pub const MAX_SPECIALS_PER_KIND: u32 = 1024;
    /// Enemy population cap
    pub const MAX_ENEMIES: u32 = 1024;

    /// Rows shown on the leaderboard
    pub const LEADERBOARD_ROWS: usize = 10;
}

/// Axis-aligned rectangle in world space
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half-open containment: the max edges belong to the outside
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    /// Shrink by `pad` on every side. Collapses to the center instead of inverting.
    pub fn inset(&self, pad: f32) -> Self {
        let c = self.center();
        let min = Vec2::new((self.min.x + pad).min(c.x), (self.min.y + pad).min(c.y));
        let max = Vec2::new((self.max.x - pad).max(c.x), (self.max.y - pad).max(c.y));
        Self { min, max }
    }
}

/// Uniform random point inside `rect` (degenerate axes yield the midpoint)
pub fn random_point_in(rect: &Rect, rng: &mut impl rand::Rng) -> Vec2 {
    Vec2::new(
        random_between(rect.min.x, rect.max.x, rng),
        random_between(rect.min.y, rect.max.y, rng),
    )
}

#[inline]
fn random_between(lo: f32, hi: f32, rng: &mut impl rand::Rng) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        (lo + hi) * 0.5
    }
}

/// Heading angle of a vector (radians, atan2 convention)
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector for a heading angle
#[inline]
pub fn from_heading(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Fully saturated RGB color (0xRRGGBB) for a hue in degrees
pub fn hue_color(hue: f32) -> u32 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let to_byte = |c: f32| (c * 255.0).round() as u32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}
