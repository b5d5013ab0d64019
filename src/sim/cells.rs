//! Special-cell assignment and per-cell modifiers
//!
//! Each epoch a budget-bounded random subset of cells gets one rule:
//! Echo (delayed duplicate shots), Pinball (solid tetromino blockers) or
//! Sonar (periodic enemy reveal). Everything downstream looks rules up by
//! coordinate.

use std::collections::HashSet;

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::events::{GameEvent, SonarBlip};
use super::grid::{ArenaGrid, CellAddr};
use super::physics::Obstacle;
use crate::Settings;
use crate::consts::{MAX_SPECIALS_PER_KIND, PLACEMENT_RETRIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKind {
    Echo,
    Pinball,
    Sonar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpecialRule {
    Echo,
    /// Obstacle cluster anchors around the cell center
    Pinball { anchors: Vec<Vec2> },
    Sonar { next_ping_at: u64 },
}

impl SpecialRule {
    pub fn kind(&self) -> SpecialKind {
        match self {
            SpecialRule::Echo => SpecialKind::Echo,
            SpecialRule::Pinball { .. } => SpecialKind::Pinball,
            SpecialRule::Sonar { .. } => SpecialKind::Sonar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialCell {
    pub addr: CellAddr,
    pub label: String,
    pub rule: SpecialRule,
}

/// Delayed duplicate shot parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoMod {
    pub delay_ms: u64,
    pub speed_scale: f32,
}

/// Fire-time modifiers for a projectile leaving a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileMods {
    pub speed_scale: f32,
    pub echo: Option<EchoMod>,
}

impl Default for ProjectileMods {
    fn default() -> Self {
        Self {
            speed_scale: 1.0,
            echo: None,
        }
    }
}

/// Damage multipliers for whoever stands in a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatMods {
    pub out_damage_scale: f32,
    pub in_damage_scale: f32,
}

impl Default for CombatMods {
    fn default() -> Self {
        Self {
            out_damage_scale: 1.0,
            in_damage_scale: 1.0,
        }
    }
}

/// Rule assignment for one epoch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialCells {
    cells: Vec<SpecialCell>,
    obstacles: Vec<Obstacle>,
    /// Tokens dropped because no free cell was found
    skipped: u32,
}

/// Most special cells a grid may carry
pub fn budget(grid: &ArenaGrid, max_fraction: f32) -> usize {
    let cap = (grid.cell_count() as f64 * max_fraction as f64).floor();
    if cap > 0.0 { cap as usize } else { 0 }
}

impl SpecialCells {
    /// Fresh random assignment. Tokens are shuffled and truncated to the
    /// budget before placement, so surplus is dropped without type priority.
    pub fn assign(grid: &ArenaGrid, settings: &Settings, now: u64, rng: &mut impl Rng) -> Self {
        let mut bag: Vec<SpecialKind> = settings
            .special_requests()
            .iter()
            .filter(|r| r.enabled)
            .flat_map(|r| std::iter::repeat_n(r.kind, r.count.min(MAX_SPECIALS_PER_KIND) as usize))
            .collect();
        bag.shuffle(rng);
        bag.truncate(budget(grid, settings.sc_max_fraction));

        let mut taken: HashSet<CellAddr> = HashSet::new();
        let mut assigned = Self::default();

        for kind in bag {
            let free = (0..PLACEMENT_RETRIES).find_map(|_| {
                let addr = CellAddr::new(rng.random_range(0..grid.rows), rng.random_range(0..grid.cols));
                (!taken.contains(&addr)).then_some(addr)
            });
            let Some(addr) = free else {
                log::warn!(
                    "No free cell for {:?} after {} attempts, skipping",
                    kind,
                    PLACEMENT_RETRIES
                );
                assigned.skipped += 1;
                continue;
            };
            taken.insert(addr);
            assigned.cells.push(materialize(kind, addr, grid, settings, now));
        }

        for cell in &assigned.cells {
            if let SpecialRule::Pinball { anchors } = &cell.rule {
                for anchor in anchors {
                    assigned
                        .obstacles
                        .extend(tetromino(*anchor, settings.sc_pin_block_size, rng));
                }
            }
        }

        log::info!(
            "Special cells: {} placed ({} skipped), {} pin blocks",
            assigned.cells.len(),
            assigned.skipped,
            assigned.obstacles.len()
        );
        assigned
    }

    pub fn cells(&self) -> &[SpecialCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Solid pin blocks for the physics provider
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn count_of(&self, kind: SpecialKind) -> usize {
        self.cells.iter().filter(|c| c.rule.kind() == kind).count()
    }

    /// Rule at a world point (none outside the playfield)
    pub fn rule_at(&self, grid: &ArenaGrid, p: Vec2) -> Option<&SpecialRule> {
        let addr = grid.world_to_cell(p)?;
        self.cells.iter().find(|c| c.addr == addr).map(|c| &c.rule)
    }

    pub fn is_kind_at(&self, grid: &ArenaGrid, p: Vec2, kind: SpecialKind) -> bool {
        self.rule_at(grid, p).is_some_and(|r| r.kind() == kind)
    }

    /// Modifiers for a shot fired from `p`
    pub fn projectile_mods_at(&self, grid: &ArenaGrid, settings: &Settings, p: Vec2) -> ProjectileMods {
        let echo = self.is_kind_at(grid, p, SpecialKind::Echo).then(|| EchoMod {
            delay_ms: settings.sc_echo_delay_ms,
            speed_scale: settings.sc_echo_speed_scale,
        });
        ProjectileMods {
            echo,
            ..Default::default()
        }
    }

    /// No cell alters damage yet
    pub fn combat_mods_at(&self, _grid: &ArenaGrid, _p: Vec2) -> CombatMods {
        CombatMods::default()
    }

    /// Fire every due sonar cell and re-arm it. Blips list enemies inside
    /// the pinging cell.
    pub fn tick_sonar<I>(&mut self, grid: &ArenaGrid, settings: &Settings, now: u64, enemies: I) -> Vec<GameEvent>
    where
        I: IntoIterator<Item = (u32, Vec2)>,
    {
        let mut due = Vec::new();
        for cell in &mut self.cells {
            let SpecialRule::Sonar { next_ping_at } = &mut cell.rule else {
                continue;
            };
            if now >= *next_ping_at {
                *next_ping_at = now + settings.sc_sonar_period_ms;
                due.push((cell.addr, cell.label.clone()));
            }
        }
        if due.is_empty() {
            return Vec::new();
        }

        let enemies: Vec<(u32, Vec2)> = enemies.into_iter().collect();
        due.into_iter()
            .map(|(addr, label)| {
                let blips = enemies
                    .iter()
                    .filter(|(_, pos)| grid.world_to_cell(*pos) == Some(addr))
                    .map(|&(enemy_id, pos)| SonarBlip { enemy_id, pos })
                    .collect();
                GameEvent::SonarPing {
                    cell: label,
                    center: grid.cell_to_center(addr),
                    ring_duration_ms: settings.sc_sonar_ring_duration_ms,
                    blip_duration_ms: settings.sc_sonar_blip_ms,
                    blips,
                }
            })
            .collect()
    }
}

fn materialize(kind: SpecialKind, addr: CellAddr, grid: &ArenaGrid, settings: &Settings, now: u64) -> SpecialCell {
    let rule = match kind {
        SpecialKind::Echo => SpecialRule::Echo,
        SpecialKind::Pinball => SpecialRule::Pinball {
            anchors: pinball_anchors(grid, addr),
        },
        SpecialKind::Sonar => SpecialRule::Sonar {
            next_ping_at: now + settings.sc_sonar_period_ms,
        },
    };
    SpecialCell {
        addr,
        label: addr.label(),
        rule,
    }
}

/// Offset triangle around the cell center
pub fn pinball_anchors(grid: &ArenaGrid, addr: CellAddr) -> Vec<Vec2> {
    let c = grid.cell_to_center(addr);
    let pad = grid.cell_width.min(grid.cell_height) * 0.22;
    vec![
        Vec2::new(c.x - pad, c.y - pad),
        Vec2::new(c.x + pad, c.y - pad * 0.2),
        Vec2::new(c.x, c.y + pad),
    ]
}

/// Block offsets for the L, mirrored L, horizontal I and vertical I shapes
fn tetromino_layouts(b: f32) -> [[Vec2; 4]; 4] {
    [
        [Vec2::ZERO, Vec2::new(b, 0.0), Vec2::new(0.0, -b), Vec2::new(0.0, b)],
        [Vec2::ZERO, Vec2::new(-b, 0.0), Vec2::new(0.0, -b), Vec2::new(0.0, b)],
        [
            Vec2::new(-1.5 * b, 0.0),
            Vec2::new(-0.5 * b, 0.0),
            Vec2::new(0.5 * b, 0.0),
            Vec2::new(1.5 * b, 0.0),
        ],
        [
            Vec2::new(0.0, -1.5 * b),
            Vec2::new(0.0, -0.5 * b),
            Vec2::new(0.0, 0.5 * b),
            Vec2::new(0.0, 1.5 * b),
        ],
    ]
}

/// Four square blockers in a random L or I shape centered at `anchor`
pub fn tetromino(anchor: Vec2, block: f32, rng: &mut impl Rng) -> [Obstacle; 4] {
    let layouts = tetromino_layouts(block);
    let layout = layouts[rng.random_range(0..layouts.len())];
    layout.map(|offset| Obstacle {
        center: anchor + offset,
        size: block,
    })
}
