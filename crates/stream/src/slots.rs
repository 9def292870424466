use std::collections::BTreeSet;

use portalspace_common::Slot;

/// Hands out grid slots and recycles released ones.
///
/// Slot 0 belongs to the traversal root and never passes through here.
/// Fresh slots count up from 1; released slots are reused smallest first.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    next: u32,
    pool: BTreeSet<u32>,
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self {
            next: 1,
            pool: BTreeSet::new(),
        }
    }
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Slot {
        if let Some(slot) = self.pool.pop_first() {
            return Slot(slot);
        }
        let slot = self.next;
        self.next += 1;
        Slot(slot)
    }

    /// Return a slot to the pool.
    ///
    /// # Panics
    /// If the slot was never allocated or is already released.
    pub fn release(&mut self, slot: Slot) {
        if slot.is_root() {
            return;
        }
        assert!(
            slot.index() < self.next,
            "release of never-allocated slot {slot}"
        );
        let fresh = self.pool.insert(slot.index());
        assert!(fresh, "double release of slot {slot}");
    }

    /// Slots currently handed out (excluding the root).
    pub fn live_count(&self) -> usize {
        (self.next - 1) as usize - self.pool.len()
    }

    pub fn is_live(&self, slot: Slot) -> bool {
        !slot.is_root() && slot.index() < self.next && !self.pool.contains(&slot.index())
    }

    /// Released slots waiting for reuse, ascending.
    pub fn pooled(&self) -> impl Iterator<Item = Slot> + '_ {
        self.pool.iter().map(|&s| Slot(s))
    }

    /// Highest slot ever allocated, 0 if none.
    pub fn high_water(&self) -> u32 {
        self.next - 1
    }
}
