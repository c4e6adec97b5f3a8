//! Slot placements and their lifecycle.
//!
//! Every render pass gives each slot a fresh [`Placement`] with a new
//! [`PlacementId`]. Once a placement is replaced, dismissed, or torn down its id
//! is stale, and callbacks carrying it are ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::inventory::AdRecord;

/// Handle to one mounted ad, unique for the life of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(u64);

impl PlacementId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlacementId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for PlacementId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An ad mounted in a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub id: PlacementId,
    pub slot: usize,
    pub ad: AdRecord,
    /// Whether this placement already produced its impression.
    pub impression_recorded: bool,
}

/// Fixed set of slots, each empty or holding one placement.
#[derive(Debug)]
pub struct Slots {
    slots: Vec<Option<Placement>>,
    next_id: u64,
}

impl Slots {
    /// `count` empty slots.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
            next_id: 1,
        }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Mount `ad` in `slot`. Returns the new placement and whatever it replaced.
    ///
    /// `slot` must be below [`count`](Self::count).
    pub fn place(&mut self, slot: usize, ad: AdRecord) -> (Placement, Option<Placement>) {
        let placement = Placement {
            id: PlacementId(self.next_id),
            slot,
            ad,
            impression_recorded: false,
        };
        self.next_id += 1;
        let previous = self.slots[slot].replace(placement.clone());
        (placement, previous)
    }

    /// Empty `slot`, returning its placement.
    pub fn clear(&mut self, slot: usize) -> Option<Placement> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Live placement by id.
    pub fn find(&self, id: PlacementId) -> Option<&Placement> {
        self.slots.iter().flatten().find(|p| p.id == id)
    }

    pub fn find_mut(&mut self, id: PlacementId) -> Option<&mut Placement> {
        self.slots.iter_mut().flatten().find(|p| p.id == id)
    }

    /// Empty the slot holding `id`, returning its placement.
    pub fn remove(&mut self, id: PlacementId) -> Option<Placement> {
        let slot = self.find(id)?.slot;
        self.clear(slot)
    }

    /// Snapshot of every slot.
    pub fn snapshot(&self) -> Vec<Option<Placement>> {
        self.slots.clone()
    }

    /// Empty every slot, returning the live placements.
    pub fn drain(&mut self) -> Vec<Placement> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}
