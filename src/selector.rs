//! Weighted, frequency-capped ad selection.
//!
//! The inventory is expanded into a weighted sequence in which every record
//! appears `weight` times. Each call to [`Selector::next`] walks that sequence
//! and returns the first candidate that is
//!
//! 1. not excluded (already placed in the current render pass),
//! 2. not dismissed, and
//! 3. strictly below the daily frequency cap.
//!
//! When every eligible candidate is capped the first eligible record in
//! expansion order is returned instead, so a slot never goes empty just because
//! the inventory is exhausted for the day. Only an empty (or fully dismissed)
//! inventory yields `None`.
//!
//! Two walk strategies are available and give the same proportional guarantee:
//! [`SelectionMode::Shuffle`] dequeues a shuffled copy of the weighted sequence
//! and rebuilds it when exhausted, [`SelectionMode::RoundRobin`] keeps a cursor
//! over the sequence in expansion order.

use std::collections::{HashSet, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::inventory::{AdId, AdRecord, MAX_WEIGHT};

/// Default maximum impressions per ad per day.
pub const DEFAULT_FREQUENCY_CAP: u32 = 5;

/// Walk strategy over the weighted sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SelectionMode {
    /// Shuffle once per cycle, dequeue in order.
    #[default]
    Shuffle,
    /// Deterministic cursor over the sequence in expansion order.
    RoundRobin,
}

/// Picks the next ad for a slot.
pub struct Selector {
    mode: SelectionMode,
    frequency_cap: u32,
    inventory: Vec<AdRecord>,
    /// Inventory index for every weighted position, in expansion order.
    expanded: Vec<usize>,
    /// Shuffle mode: pending positions into `expanded`.
    queue: VecDeque<usize>,
    /// Round-robin mode: next position into `expanded`.
    cursor: usize,
    rng: StdRng,
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("mode", &self.mode)
            .field("frequency_cap", &self.frequency_cap)
            .field("inventory", &self.inventory.len())
            .field("expanded", &self.expanded.len())
            .finish_non_exhaustive()
    }
}

impl Selector {
    /// Create a selector with an empty inventory.
    ///
    /// `seed` fixes the shuffle order; `None` seeds from the OS.
    pub fn new(mode: SelectionMode, frequency_cap: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode,
            frequency_cap,
            inventory: Vec::new(),
            expanded: Vec::new(),
            queue: VecDeque::new(),
            cursor: 0,
            rng,
        }
    }

    /// Replace the inventory and restart the walk.
    ///
    /// Weights are clamped to `1..=MAX_WEIGHT` before expansion.
    pub fn set_inventory(&mut self, ads: Vec<AdRecord>) {
        self.expanded = ads
            .iter()
            .enumerate()
            .flat_map(|(idx, ad)| {
                std::iter::repeat_n(idx, ad.weight.clamp(1, MAX_WEIGHT) as usize)
            })
            .collect();
        self.inventory = ads;
        self.queue.clear();
        self.cursor = 0;
    }

    pub fn inventory(&self) -> &[AdRecord] {
        &self.inventory
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn frequency_cap(&self) -> u32 {
        self.frequency_cap
    }

    /// Choose the next ad.
    ///
    /// * `excluded` - ids already placed in the current render pass
    /// * `is_dismissed` - permanent dismissal lookup
    /// * `impressions` - today's impression count for an id
    pub fn next(
        &mut self,
        excluded: &HashSet<AdId>,
        is_dismissed: impl Fn(&AdId) -> bool,
        impressions: impl Fn(&AdId) -> u32,
    ) -> Option<AdRecord> {
        if self.expanded.is_empty() {
            return None;
        }

        let inventory = &self.inventory;
        let cap = self.frequency_cap;
        let eligible = |idx: usize| {
            let id = &inventory[idx].id;
            !excluded.contains(id) && !is_dismissed(id)
        };
        let preferred = |idx: usize| eligible(idx) && impressions(&inventory[idx].id) < cap;

        let picked = match self.mode {
            SelectionMode::RoundRobin => {
                let n = self.expanded.len();
                let found = (0..n)
                    .map(|step| (self.cursor + step) % n)
                    .find(|&pos| preferred(self.expanded[pos]));
                match found {
                    Some(pos) => {
                        self.cursor = (pos + 1) % n;
                        Some(self.expanded[pos])
                    }
                    None => {
                        self.cursor = (self.cursor + 1) % n;
                        None
                    }
                }
            }
            SelectionMode::Shuffle => {
                if self.queue.is_empty() {
                    refill(&mut self.queue, self.expanded.len(), &mut self.rng);
                }
                let expanded = &self.expanded;
                let mut found = self.queue.iter().position(|&pos| preferred(expanded[pos]));
                if found.is_none() {
                    // Leftovers cannot serve this call; start a fresh cycle.
                    refill(&mut self.queue, expanded.len(), &mut self.rng);
                    found = self.queue.iter().position(|&pos| preferred(expanded[pos]));
                }
                found
                    .and_then(|at| self.queue.remove(at))
                    .map(|pos| expanded[pos])
            }
        };

        if let Some(idx) = picked {
            return Some(self.inventory[idx].clone());
        }

        // Every eligible candidate is capped: first eligible in expansion order.
        if let Some(ad) = self.inventory.iter().find(|ad| {
            !excluded.contains(&ad.id) && !is_dismissed(&ad.id)
        }) {
            tracing::debug!(ad = %ad.id, "All eligible ads capped, serving first in expansion order");
            return Some(ad.clone());
        }

        // Fewer distinct ads than slots: repeat rather than leave the slot empty.
        let repeat = self.inventory.iter().find(|ad| !is_dismissed(&ad.id)).cloned();
        if repeat.is_none() {
            tracing::debug!("Every ad in the inventory is dismissed");
        }
        repeat
    }
}

/// Replace `queue` with a freshly shuffled cycle over `0..len`.
fn refill(queue: &mut VecDeque<usize>, len: usize, rng: &mut StdRng) {
    let mut cycle: Vec<usize> = (0..len).collect();
    cycle.shuffle(rng);
    queue.clear();
    queue.extend(cycle);
}
