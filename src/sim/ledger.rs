//! Score ledger
//!
//! Cumulative score per named participant. Reset zeroes scores but keeps
//! names, so a leaderboard survives an arena reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::events::GameEvent;

/// A single leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Participant name
    pub name: String,
    /// Cumulative score this epoch
    pub score: u64,
}

/// Name -> cumulative score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    entries: BTreeMap<String, u64>,
}

/// Partial credit for a non-lethal hit
pub fn partial_credit(amount: f32, score_per_damage: f32) -> u64 {
    let points = (amount * score_per_damage).round();
    if points.is_finite() && points > 0.0 {
        points as u64
    } else {
        0
    }
}

impl ScoreLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a participant's score, adding them if new
    pub fn upsert(&mut self, name: &str, score: u64) {
        self.entries.insert(name.to_string(), score);
    }

    /// Add to a participant's score, adding them if new
    pub fn add_points(&mut self, name: &str, delta: u64) {
        let score = self.entries.entry(name.to_string()).or_insert(0);
        *score = score.saturating_add(delta);
    }

    /// Drop a participant
    pub fn remove(&mut self, name: &str) -> Option<u64> {
        self.entries.remove(name)
    }

    /// Zero every score, keeping the names
    pub fn reset_all(&mut self) {
        for score in self.entries.values_mut() {
            *score = 0;
        }
    }

    /// Score for a participant
    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// Top `limit` rows, highest score first (ties by name)
    pub fn ranking(&self, limit: usize) -> Vec<LedgerEntry> {
        let mut rows: Vec<LedgerEntry> = self
            .entries
            .iter()
            .map(|(name, score)| LedgerEntry {
                name: name.clone(),
                score: *score,
            })
            .collect();
        // BTreeMap iteration is already name-ordered; stable sort keeps it for ties
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows.truncate(limit);
        rows
    }

    /// Apply the crediting policy to one combat fact. Returns the points
    /// awarded (0 for facts that carry no credit). Only participants already
    /// on the ledger are credited.
    pub fn credit(&mut self, event: &GameEvent, score_per_damage: f32) -> u64 {
        let (name, points) = match event {
            GameEvent::EnemyKilled {
                dealer_name,
                score_award,
                ..
            } => (dealer_name, u64::from(*score_award)),
            GameEvent::EnemyDamaged {
                dealer_name,
                amount,
                lethal: false,
                ..
            } => (dealer_name, partial_credit(*amount, score_per_damage)),
            _ => return 0,
        };
        let Some(score) = self.entries.get_mut(name.as_str()) else {
            return 0;
        };
        *score = score.saturating_add(points);
        points
    }
}
