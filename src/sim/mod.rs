//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied clock and timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod cells;
pub mod combat;
pub mod enemy;
pub mod events;
pub mod grid;
pub mod ledger;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod reset;
pub mod rng;
pub mod state;
pub mod tick;
pub mod timers;
pub mod weapons;

pub use cells::{SpecialCell, SpecialCells, SpecialKind, SpecialRule};
pub use combat::{ContactDamage, Damageable, apply_explosion, apply_hit};
pub use enemy::{AiState, Enemy, EnemyKind, EnemyPopulation, KindStats};
pub use events::{EventSink, GameEvent, NullSink, OwnerTag, SonarBlip};
pub use grid::{ArenaGrid, CellAddr};
pub use ledger::{LedgerEntry, ScoreLedger};
pub use physics::{ArcadePhysics, Body, Obstacle, PhysicsProvider};
pub use player::Player;
pub use projectile::{Expiry, Projectile, ProjectileKind, ProjectilePool};
pub use reset::ResetScheduler;
pub use state::Arena;
pub use tick::{TickInput, autopilot, tick};
