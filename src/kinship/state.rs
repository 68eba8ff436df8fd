use crate::kinship::KinshipMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) type Row = HashMap<u32, f64>;

/// Counters collected during one kinship sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinshipStats {
    pub processed: usize,
    pub evicted: usize,
    /// Largest number of rows held at once
    pub peak_live: usize,
    /// Largest number of non-zero unordered pairs held at once
    pub peak_pairs: usize,
}

/// Transient kinship storage keyed by arena index.
///
/// Off-diagonal values live in per-vertex rows, stored on both sides of each pair.
/// Rows occupy reusable slots: evicting a vertex clears its row and returns the
/// slot to the free list.
#[derive(Debug)]
pub(crate) struct KinshipState {
    mode: KinshipMode,
    self_kinship: Vec<f64>,
    slot_of: Vec<Option<u32>>,
    slots: Vec<Row>,
    free: Vec<u32>,
    remaining_children: Vec<u32>,
    pinned: Vec<bool>,
    live: usize,
    pairs: usize,
    stats: KinshipStats,
}

impl KinshipState {
    pub fn new(mode: KinshipMode, child_counts: Vec<u32>, pinned: Vec<bool>) -> Self {
        let len = child_counts.len();
        Self {
            mode,
            self_kinship: vec![0.0; len],
            slot_of: vec![None; len],
            slots: Vec::new(),
            free: Vec::new(),
            remaining_children: child_counts,
            pinned,
            live: 0,
            pairs: 0,
            stats: KinshipStats::default(),
        }
    }

    pub fn self_kinship(&self, vertex: u32) -> f64 {
        self.self_kinship[vertex as usize]
    }

    /// Stored coefficient of a pair; zero when the pair was never stored
    pub fn get(&self, a: u32, b: u32) -> f64 {
        if a == b {
            return self.self_kinship(a);
        }
        self.row(a)
            .and_then(|row| row.get(&b).copied())
            .unwrap_or(0.0)
    }

    pub fn row(&self, vertex: u32) -> Option<&Row> {
        self.slot_of[vertex as usize].map(|slot| &self.slots[slot as usize])
    }

    /// Whether the vertex's row must be kept once it has been computed
    pub fn needs_row(&self, vertex: u32) -> bool {
        match self.mode {
            KinshipMode::FullRetention => true,
            KinshipMode::IncrementalEviction => {
                self.remaining_children[vertex as usize] > 0 || self.pinned[vertex as usize]
            }
        }
    }

    /// Stores the computed self-kinship and, when needed, the row of `vertex`.
    ///
    /// Every partner in `row` must already have a live row.
    pub fn store(&mut self, vertex: u32, self_value: f64, row: Row) {
        self.self_kinship[vertex as usize] = self_value;
        self.stats.processed += 1;
        if !self.needs_row(vertex) {
            return;
        }

        for (&partner, &value) in &row {
            if let Some(slot) = self.slot_of[partner as usize] {
                self.slots[slot as usize].insert(vertex, value);
            }
        }
        self.pairs += row.len();

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = row;
                slot
            }
            None => {
                self.slots.push(row);
                (self.slots.len() - 1) as u32
            }
        };
        self.slot_of[vertex as usize] = Some(slot);
        self.live += 1;

        self.stats.peak_live = self.stats.peak_live.max(self.live);
        self.stats.peak_pairs = self.stats.peak_pairs.max(self.pairs);
    }

    /// Marks one child of `parent` as processed, evicting the parent when it is no
    /// longer needed
    pub fn child_done(&mut self, parent: u32) {
        let remaining = &mut self.remaining_children[parent as usize];
        *remaining = remaining.saturating_sub(1);
        if self.mode == KinshipMode::IncrementalEviction && !self.needs_row(parent) {
            self.evict(parent);
        }
    }

    pub fn stats(&self) -> KinshipStats {
        self.stats
    }

    fn evict(&mut self, vertex: u32) {
        let Some(slot) = self.slot_of[vertex as usize].take() else {
            return;
        };
        let row = std::mem::take(&mut self.slots[slot as usize]);
        for partner in row.keys() {
            if let Some(partner_slot) = self.slot_of[*partner as usize] {
                self.slots[partner_slot as usize].remove(&vertex);
            }
        }
        self.pairs -= row.len();
        self.free.push(slot);
        self.live -= 1;
        self.stats.evicted += 1;
    }
}
