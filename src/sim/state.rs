//! Arena state
//!
//! Everything one epoch owns lives here. A full reset rebuilds the
//! per-epoch pieces in place; settings and the grid survive it.

use glam::Vec2;

use super::cells::SpecialCells;
use super::combat::ContactDamage;
use super::enemy::EnemyPopulation;
use super::events::GameEvent;
use super::grid::ArenaGrid;
use super::ledger::{LedgerEntry, ScoreLedger};
use super::physics::PhysicsProvider;
use super::player::Player;
use super::reset::ResetScheduler;
use super::rng::{RngState, SimRng};
use super::timers::TimerWheel;
use super::weapons::Weapons;
use crate::consts::LEADERBOARD_ROWS;
use crate::{Settings, random_point_in};

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct Arena {
    /// Finalized settings (read-only)
    pub settings: Settings,
    pub grid: ArenaGrid,
    pub cells: SpecialCells,
    pub enemies: EnemyPopulation,
    pub weapons: Weapons,
    /// `None` until someone joins, and again after death
    pub player: Option<Player>,
    pub ledger: ScoreLedger,
    pub reset: ResetScheduler,
    pub timers: TimerWheel,
    pub contact: ContactDamage,
    /// Number of full resets so far
    pub epoch: u32,
    pub rng_state: RngState,
    pub rng: SimRng,
    /// Next entity ID
    next_id: u32,
}

impl Arena {
    /// Build the first epoch. `settings` should already be finalized;
    /// `seed` makes the run reproducible.
    pub fn new(settings: Settings, seed: Option<u64>, now: u64, physics: &mut impl PhysicsProvider) -> Self {
        let rng_state = RngState::resolve(seed);
        let grid = ArenaGrid::from_settings(&settings);
        log::info!(
            "Arena {}x{} cells ({}x{} world), seed {}{}",
            grid.cols,
            grid.rows,
            grid.world_size().x,
            grid.world_size().y,
            rng_state.seed,
            if rng_state.injected { "" } else { " (random)" }
        );

        let mut arena = Self {
            grid,
            cells: SpecialCells::default(),
            enemies: EnemyPopulation::new(),
            weapons: Weapons::new(&settings),
            player: None,
            ledger: ScoreLedger::new(),
            reset: ResetScheduler::new(now, settings.server_reset_interval_ms),
            timers: TimerWheel::new(),
            contact: ContactDamage::new(settings.player_hit_interval_ms),
            epoch: 0,
            rng: rng_state.to_rng(),
            rng_state,
            next_id: 1,
            settings,
        };

        physics.set_world_bounds(arena.grid.playfield());
        arena.reshuffle_cells(now, physics);
        arena.respawn_enemies();
        arena
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn (or respawn) the player at a random spot with a fresh score
    pub fn join(&mut self, name: &str) -> &Player {
        let spot = self.grid.playfield().inset(self.settings.player_radius());
        let pos = random_point_in(&spot, &mut self.rng);

        if let Some(old) = self.player.take() {
            if old.name != name {
                self.ledger.remove(&old.name);
            }
        }
        self.ledger.upsert(name, 0);
        self.weapons.reset();
        self.contact.reset();

        let player = Player::new(name, pos, &self.settings, &mut self.rng);
        log::info!("{} joined at ({:.0}, {:.0})", name, pos.x, pos.y);
        self.player.insert(player)
    }

    /// Remove the player and their ledger entry
    pub fn leave(&mut self) -> Option<Player> {
        let player = self.player.take()?;
        self.ledger.remove(&player.name);
        self.weapons.reset();
        self.timers.clear();
        Some(player)
    }

    pub fn player_pos(&self) -> Option<Vec2> {
        self.player.as_ref().map(|p| p.body.pos)
    }

    /// Full reset: new epoch of cells and enemies, scores zeroed, nothing
    /// in flight, player healed. Grid dimensions are kept.
    pub fn perform_reset(&mut self, now: u64, physics: &mut impl PhysicsProvider) -> GameEvent {
        self.weapons.reset();
        self.timers.clear();
        self.ledger.reset_all();
        self.respawn_enemies();
        self.reshuffle_cells(now, physics);
        self.contact.reset();
        if let Some(player) = self.player.as_mut() {
            player.reset_health();
        }
        self.epoch += 1;
        log::info!("Arena reset, epoch {}", self.epoch);
        GameEvent::ArenaReset { epoch: self.epoch }
    }

    /// Top rows for a leaderboard display
    pub fn leaderboard(&self) -> Vec<LedgerEntry> {
        self.ledger.ranking(LEADERBOARD_ROWS)
    }

    pub fn countdown_label(&self, now: u64) -> String {
        self.reset.countdown_label(now)
    }

    fn respawn_enemies(&mut self) {
        let playfield = self.grid.playfield();
        let next_id = &mut self.next_id;
        let mut alloc = || {
            let id = *next_id;
            *next_id += 1;
            id
        };
        self.enemies
            .repopulate(&self.settings, &playfield, &mut alloc, &mut self.rng);
    }

    fn reshuffle_cells(&mut self, now: u64, physics: &mut impl PhysicsProvider) {
        self.cells = SpecialCells::assign(&self.grid, &self.settings, now, &mut self.rng);
        physics.clear_obstacles();
        physics.register_obstacles(self.cells.obstacles());
    }
}
