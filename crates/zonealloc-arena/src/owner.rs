//! Owner registry backing [`WeakBlock`] handles.
//!
//! Each owned block has one slot. Removing a slot bumps its generation, so
//! every `WeakBlock` issued for it stops resolving. Slots are reused via a
//! free list.

use crate::handle::WeakBlock;

struct OwnerSlot {
    generation: u32,
    /// Block record index, `None` while the slot is vacant.
    block: Option<u32>,
}

/// Slot+generation table mapping [`WeakBlock`]s to block records.
pub(crate) struct OwnerTable {
    slots: Vec<OwnerSlot>,
    free_list: Vec<u32>,
}

impl OwnerTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Register `block` and return the weak handle for it.
    pub(crate) fn insert(&mut self, block: u32) -> WeakBlock {
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.block = Some(block);
            WeakBlock::new(slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(OwnerSlot {
                generation: 0,
                block: Some(block),
            });
            WeakBlock::new(slot_idx, 0)
        }
    }

    /// Block record the handle refers to, or `None` if it has been cleared.
    pub(crate) fn get(&self, weak: WeakBlock) -> Option<u32> {
        let slot = self.slots.get(weak.slot as usize)?;
        if slot.generation != weak.generation {
            return None;
        }
        slot.block
    }

    /// Clear the slot, invalidating every handle issued for it.
    ///
    /// A slot whose generation wraps to zero is retired rather than
    /// recycled, so a handle from the first epoch can never resolve again.
    /// Returns `None` if the handle was already stale.
    pub(crate) fn remove(&mut self, weak: WeakBlock) -> Option<u32> {
        let slot = self.slots.get_mut(weak.slot as usize)?;
        if slot.generation != weak.generation {
            return None;
        }
        let block = slot.block.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(weak.slot);
        }
        Some(block)
    }

    /// Number of occupied slots.
    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.block.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_round_trip() {
        let mut table = OwnerTable::new();
        let w = table.insert(42);
        assert_eq!(table.get(w), Some(42));
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn remove_clears_handle() {
        let mut table = OwnerTable::new();
        let w = table.insert(5);
        assert_eq!(table.remove(w), Some(5));
        assert_eq!(table.get(w), None);
        assert_eq!(table.live_count(), 0);
    }

    #[test]
    fn double_remove_returns_none() {
        let mut table = OwnerTable::new();
        let w = table.insert(1);
        assert_eq!(table.remove(w), Some(1));
        assert_eq!(table.remove(w), None);
    }

    #[test]
    fn reused_slot_has_new_generation() {
        let mut table = OwnerTable::new();
        let w1 = table.insert(1);
        table.remove(w1);
        let w2 = table.insert(2);
        assert_eq!(w1.slot(), w2.slot());
        assert_eq!(w2.generation(), w1.generation() + 1);
        assert_eq!(table.get(w1), None);
        assert_eq!(table.get(w2), Some(2));
    }

    #[test]
    fn unknown_slot_returns_none() {
        let table = OwnerTable::new();
        assert_eq!(table.get(WeakBlock::new(99, 0)), None);
    }

    #[test]
    fn wrapped_generation_retires_slot() {
        let mut table = OwnerTable::new();
        let w = table.insert(1);
        table.remove(w);

        table.slots[0].generation = u32::MAX;
        let w_max = table.insert(2);
        assert_eq!(w_max.generation(), u32::MAX);

        table.remove(w_max);
        assert_eq!(table.slots[0].generation, 0);
        assert!(!table.free_list.contains(&0));

        assert_eq!(table.get(WeakBlock::new(0, 0)), None);
        let fresh = table.insert(3);
        assert_ne!(fresh.slot(), 0);
    }
}
