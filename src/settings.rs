//! Game settings
//!
//! One immutable value built at startup: defaults, optionally a JSON document,
//! then launch-parameter overrides, then clamping. Keys use the camelCase
//! names hosts already pass on the command line or query string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::consts::{MAX_ENEMIES, MAX_SPECIALS_PER_KIND};
use crate::sim::grid::{MAX_GRID_DIM, MIN_GRID_DIM, auto_size};
use crate::sim::{EnemyKind, KindStats, SpecialKind};

/// Player movement feel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    /// Accelerate, clamp, decelerate with drag
    #[default]
    Glide,
    /// Velocity follows input instantly
    Snap,
}

impl MovementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementMode::Glide => "glide",
            MovementMode::Snap => "snap",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            MovementMode::Glide => MovementMode::Snap,
            MovementMode::Snap => MovementMode::Glide,
        }
    }
}

/// Configuration failures. The simulation itself never fails on settings;
/// these only surface to whoever assembles the value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// Override literal does not fit the field's type
    #[error("override `{key}` = {raw:?} rejected: {reason}")]
    Override {
        key: String,
        raw: String,
        reason: String,
    },
    /// Settings document is not valid JSON for this schema
    #[error("settings document rejected: {0}")]
    Document(String),
}

/// Per-type request for special cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialRequest {
    pub kind: SpecialKind,
    pub enabled: bool,
    pub count: u32,
}

/// All tunables. Read-only once the arena is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    // === Grid ===
    pub cell_width: f32,
    pub cell_height: f32,
    pub grid_cols: u32,
    pub grid_rows: u32,
    /// Border between world edge and inner playfield
    pub arena_margin: f32,

    // === Player ===
    pub player_size: f32,
    pub player_max_health: f32,
    /// Minimum time between two contact hits on the player
    pub player_hit_interval_ms: u64,
    pub kb_max_speed: f32,
    pub kb_acceleration: f32,
    pub kb_drag: f32,
    pub movement_default_mode: MovementMode,
    pub kb_snap_speed: f32,
    pub player_bounce: f32,

    // === Primary weapon ===
    /// Shots per second
    pub primary_fire_rate: f32,
    pub primary_bullet_speed: f32,
    pub primary_range: f32,
    pub primary_damage: f32,
    pub primary_ricochet_max: u32,
    pub bullet_pool_size: u32,

    // === Secondary weapon ===
    /// Seconds between rockets
    pub secondary_cooldown: f32,
    pub secondary_projectile_speed: f32,
    pub secondary_range: f32,
    pub secondary_explosion_radius: f32,
    pub secondary_damage: f32,
    pub secondary_ricochet_max: u32,
    pub rocket_pool_size: u32,

    // === Enemies ===
    pub enemy_count: u32,
    pub enemy_drag: f32,
    pub enemy_detect_radius: f32,
    pub enemy_patrol_waypoint_radius: f32,

    pub enemy_normal_health: f32,
    pub enemy_normal_speed: f32,
    pub enemy_normal_accel: f32,
    pub enemy_normal_score: u32,
    pub enemy_normal_damage: f32,

    pub enemy_speed_health: f32,
    pub enemy_speed_speed: f32,
    pub enemy_speed_accel: f32,
    pub enemy_speed_score: u32,
    pub enemy_speed_damage: f32,

    pub enemy_strong_health: f32,
    pub enemy_strong_speed: f32,
    pub enemy_strong_accel: f32,
    pub enemy_strong_score: u32,
    pub enemy_strong_damage: f32,

    // === Special cells ===
    /// Upper bound on special cells as a fraction of all cells
    pub sc_max_fraction: f32,
    /// Derive grid size from the requested specials
    pub sc_auto_grid_by_specials: bool,
    pub sc_include_echo: bool,
    pub sc_count_echo: u32,
    pub sc_include_pinball: bool,
    pub sc_count_pinball: u32,
    pub sc_include_sonar: bool,
    pub sc_count_sonar: u32,

    pub sc_echo_delay_ms: u64,
    pub sc_echo_speed_scale: f32,

    pub sc_sonar_period_ms: u64,
    pub sc_sonar_blip_ms: u64,
    pub sc_sonar_ring_duration_ms: u64,

    /// Edge length of one pin block square
    pub sc_pin_block_size: f32,

    // === Reset / scoring ===
    pub server_reset_interval_ms: u64,
    pub score_per_damage: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cell_width: 600.0,
            cell_height: 600.0,
            grid_cols: 6,
            grid_rows: 6,
            arena_margin: 56.0,

            player_size: 28.0,
            player_max_health: 100.0,
            player_hit_interval_ms: 400,
            kb_max_speed: 320.0,
            kb_acceleration: 900.0,
            kb_drag: 420.0,
            movement_default_mode: MovementMode::Glide,
            kb_snap_speed: 360.0,
            player_bounce: 0.0,

            primary_fire_rate: 10.0,
            primary_bullet_speed: 900.0,
            primary_range: 900.0,
            primary_damage: 10.0,
            primary_ricochet_max: 0,
            bullet_pool_size: 250,

            secondary_cooldown: 1.8,
            secondary_projectile_speed: 560.0,
            secondary_range: 820.0,
            secondary_explosion_radius: 90.0,
            secondary_damage: 80.0,
            secondary_ricochet_max: 0,
            rocket_pool_size: 40,

            enemy_count: 12,
            enemy_drag: 350.0,
            enemy_detect_radius: 420.0,
            enemy_patrol_waypoint_radius: 80.0,

            enemy_normal_health: 60.0,
            enemy_normal_speed: 220.0,
            enemy_normal_accel: 750.0,
            enemy_normal_score: 10,
            enemy_normal_damage: 12.0,

            enemy_speed_health: 40.0,
            enemy_speed_speed: 320.0,
            enemy_speed_accel: 1100.0,
            enemy_speed_score: 15,
            enemy_speed_damage: 10.0,

            enemy_strong_health: 120.0,
            enemy_strong_speed: 160.0,
            enemy_strong_accel: 700.0,
            enemy_strong_score: 30,
            enemy_strong_damage: 22.0,

            sc_max_fraction: 1.0 / 3.0,
            sc_auto_grid_by_specials: true,
            sc_include_echo: true,
            sc_count_echo: 2,
            sc_include_pinball: true,
            sc_count_pinball: 2,
            sc_include_sonar: true,
            sc_count_sonar: 2,

            sc_echo_delay_ms: 120,
            sc_echo_speed_scale: 0.6,

            sc_sonar_period_ms: 7000,
            sc_sonar_blip_ms: 400,
            sc_sonar_ring_duration_ms: 700,

            sc_pin_block_size: 28.0,

            server_reset_interval_ms: 5 * 60 * 1000,
            score_per_damage: 0.25,
        }
    }
}

impl Settings {
    /// Parse a JSON settings document (missing keys keep their defaults)
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(|e| SettingsError::Document(e.to_string()))
    }

    /// Defaults + overrides, clamped and with the grid resolved. This is the
    /// value the arena should be built from.
    pub fn from_overrides<I, K, V>(pairs: I) -> (Self, Vec<SettingsError>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        let rejected = settings.apply_overrides(pairs);
        (settings.finalized(), rejected)
    }

    /// Apply launch-parameter overrides in place.
    ///
    /// `"true"`/`"false"` become booleans, numeric literals become numbers,
    /// anything else stays a string. An override whose value does not decode
    /// into the field's type is rejected and the previous value kept.
    /// Unrecognized keys are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, pairs: I) -> Vec<SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rejected = Vec::new();
        let mut fields = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                rejected.push(SettingsError::Document(
                    "settings do not encode as an object".to_string(),
                ));
                return rejected;
            }
        };

        for (key, raw) in pairs {
            let (key, raw) = (key.as_ref(), raw.as_ref());
            if !fields.contains_key(key) {
                log::debug!("Ignoring unknown setting `{}`", key);
                continue;
            }

            let mut trial = fields.clone();
            trial.insert(key.to_string(), parse_literal(raw));
            match serde_json::from_value::<Settings>(Value::Object(trial.clone())) {
                Ok(_) => {
                    log::info!("Setting override {} = {}", key, raw);
                    fields = trial;
                }
                Err(e) => {
                    let err = SettingsError::Override {
                        key: key.to_string(),
                        raw: raw.to_string(),
                        reason: e.to_string(),
                    };
                    log::warn!("{}", err);
                    rejected.push(err);
                }
            }
        }

        match serde_json::from_value::<Settings>(Value::Object(fields)) {
            Ok(next) => *self = next,
            Err(e) => rejected.push(SettingsError::Document(e.to_string())),
        }
        rejected
    }

    /// Sanitize and resolve the grid
    pub fn finalized(self) -> Self {
        self.sanitized().resolve_grid()
    }

    /// Clamp every value into a range the simulation can run with.
    /// Never fails: bad values fall back to defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        fn positive(v: f32, fallback: f32) -> f32 {
            if v.is_finite() && v > 0.0 { v } else { fallback }
        }
        fn non_negative(v: f32, fallback: f32) -> f32 {
            if v.is_finite() && v >= 0.0 { v } else { fallback }
        }

        self.cell_width = positive(self.cell_width, d.cell_width);
        self.cell_height = positive(self.cell_height, d.cell_height);
        self.grid_cols = self.grid_cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        self.grid_rows = self.grid_rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        self.arena_margin = non_negative(self.arena_margin, d.arena_margin);

        self.player_size = positive(self.player_size, d.player_size);
        self.player_max_health = positive(self.player_max_health, d.player_max_health);
        self.kb_max_speed = non_negative(self.kb_max_speed, d.kb_max_speed);
        self.kb_acceleration = non_negative(self.kb_acceleration, d.kb_acceleration);
        self.kb_drag = non_negative(self.kb_drag, d.kb_drag);
        self.kb_snap_speed = non_negative(self.kb_snap_speed, d.kb_snap_speed);
        self.player_bounce = non_negative(self.player_bounce, d.player_bounce).min(1.0);

        self.primary_fire_rate = positive(self.primary_fire_rate, d.primary_fire_rate);
        self.primary_bullet_speed = non_negative(self.primary_bullet_speed, d.primary_bullet_speed);
        self.primary_range = non_negative(self.primary_range, d.primary_range);
        self.primary_damage = non_negative(self.primary_damage, d.primary_damage);
        self.secondary_cooldown = non_negative(self.secondary_cooldown, d.secondary_cooldown);
        self.secondary_projectile_speed =
            non_negative(self.secondary_projectile_speed, d.secondary_projectile_speed);
        self.secondary_range = non_negative(self.secondary_range, d.secondary_range);
        self.secondary_explosion_radius =
            non_negative(self.secondary_explosion_radius, d.secondary_explosion_radius);
        self.secondary_damage = non_negative(self.secondary_damage, d.secondary_damage);

        self.enemy_count = self.enemy_count.min(MAX_ENEMIES);
        self.enemy_drag = non_negative(self.enemy_drag, d.enemy_drag);
        self.enemy_detect_radius = non_negative(self.enemy_detect_radius, d.enemy_detect_radius);
        self.enemy_patrol_waypoint_radius =
            non_negative(self.enemy_patrol_waypoint_radius, d.enemy_patrol_waypoint_radius);
        for kind in EnemyKind::ALL {
            let fallback = d.kind_stats(kind);
            let (health, speed, accel, damage) = self.kind_fields_mut(kind);
            *health = positive(*health, fallback.health);
            *speed = non_negative(*speed, fallback.max_speed);
            *accel = non_negative(*accel, fallback.accel);
            *damage = non_negative(*damage, fallback.contact_damage);
        }

        if !(self.sc_max_fraction.is_finite() && self.sc_max_fraction > 0.0) {
            self.sc_max_fraction = d.sc_max_fraction;
        }
        self.sc_max_fraction = self.sc_max_fraction.min(1.0);
        self.sc_count_echo = self.sc_count_echo.min(MAX_SPECIALS_PER_KIND);
        self.sc_count_pinball = self.sc_count_pinball.min(MAX_SPECIALS_PER_KIND);
        self.sc_count_sonar = self.sc_count_sonar.min(MAX_SPECIALS_PER_KIND);
        self.sc_echo_speed_scale = non_negative(self.sc_echo_speed_scale, d.sc_echo_speed_scale);
        self.sc_sonar_period_ms = self.sc_sonar_period_ms.max(1);
        self.sc_pin_block_size = positive(self.sc_pin_block_size, d.sc_pin_block_size);

        self.server_reset_interval_ms = self.server_reset_interval_ms.max(1);
        self.score_per_damage = non_negative(self.score_per_damage, d.score_per_damage);
        self
    }

    /// Replace the grid dimensions with the auto-sized ones when enabled
    pub fn resolve_grid(mut self) -> Self {
        if self.sc_auto_grid_by_specials {
            let (cols, rows) = auto_size(self.total_requested_specials(), self.sc_max_fraction);
            self.grid_cols = cols.min(MAX_GRID_DIM);
            self.grid_rows = rows.min(MAX_GRID_DIM);
        }
        self
    }

    /// Requests in fixed type order
    pub fn special_requests(&self) -> [SpecialRequest; 3] {
        [
            SpecialRequest {
                kind: SpecialKind::Echo,
                enabled: self.sc_include_echo,
                count: self.sc_count_echo,
            },
            SpecialRequest {
                kind: SpecialKind::Pinball,
                enabled: self.sc_include_pinball,
                count: self.sc_count_pinball,
            },
            SpecialRequest {
                kind: SpecialKind::Sonar,
                enabled: self.sc_include_sonar,
                count: self.sc_count_sonar,
            },
        ]
    }

    /// Sum of counts over enabled special types
    pub fn total_requested_specials(&self) -> u32 {
        self.special_requests()
            .iter()
            .filter(|r| r.enabled)
            .fold(0u32, |total, r| total.saturating_add(r.count))
    }

    /// Stat row for an enemy kind
    pub fn kind_stats(&self, kind: EnemyKind) -> KindStats {
        match kind {
            EnemyKind::Normal => KindStats {
                health: self.enemy_normal_health,
                max_speed: self.enemy_normal_speed,
                accel: self.enemy_normal_accel,
                kill_score: self.enemy_normal_score,
                contact_damage: self.enemy_normal_damage,
            },
            EnemyKind::Speed => KindStats {
                health: self.enemy_speed_health,
                max_speed: self.enemy_speed_speed,
                accel: self.enemy_speed_accel,
                kill_score: self.enemy_speed_score,
                contact_damage: self.enemy_speed_damage,
            },
            EnemyKind::Strong => KindStats {
                health: self.enemy_strong_health,
                max_speed: self.enemy_strong_speed,
                accel: self.enemy_strong_accel,
                kill_score: self.enemy_strong_score,
                contact_damage: self.enemy_strong_damage,
            },
        }
    }

    fn kind_fields_mut(&mut self, kind: EnemyKind) -> (&mut f32, &mut f32, &mut f32, &mut f32) {
        match kind {
            EnemyKind::Normal => (
                &mut self.enemy_normal_health,
                &mut self.enemy_normal_speed,
                &mut self.enemy_normal_accel,
                &mut self.enemy_normal_damage,
            ),
            EnemyKind::Speed => (
                &mut self.enemy_speed_health,
                &mut self.enemy_speed_speed,
                &mut self.enemy_speed_accel,
                &mut self.enemy_speed_damage,
            ),
            EnemyKind::Strong => (
                &mut self.enemy_strong_health,
                &mut self.enemy_strong_speed,
                &mut self.enemy_strong_accel,
                &mut self.enemy_strong_damage,
            ),
        }
    }

    /// Milliseconds between primary shots
    pub fn primary_interval_ms(&self) -> u64 {
        (1000.0 / self.primary_fire_rate.max(1.0)).round() as u64
    }

    /// Milliseconds between rockets
    pub fn secondary_interval_ms(&self) -> u64 {
        (self.secondary_cooldown * 1000.0).round() as u64
    }

    /// Player collision circle radius
    pub fn player_radius(&self) -> f32 {
        (self.player_size * 0.42).max(crate::consts::PLAYER_MIN_RADIUS)
    }
}

/// Launch-parameter literal to JSON value
fn parse_literal(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Value::Number(Number::from(f as i64));
        }
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Parse `key=value` launch arguments (anything without `=` is skipped)
pub fn parse_pairs<'a>(args: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    args.into_iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .collect()
}

/// Current settings as a flat JSON object (for logging/inspection)
pub fn to_map(settings: &Settings) -> Map<String, Value> {
    match serde_json::to_value(settings) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
