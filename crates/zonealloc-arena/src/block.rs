//! Block records and the circular block list.
//!
//! Blocks tile the arena in address order. Their bookkeeping lives in a
//! vector of [`BlockRecord`]s linked by index into a circular list that
//! runs through one sentinel record (index [`SENTINEL`]). The sentinel
//! sits at offset `arena_bytes`, one past the last real block, and is
//! permanently occupied with a non-purgeable tag, so neither merging nor
//! eviction ever touches it.
//!
//! Records released by a merge go on a spare list and are reused by the
//! next split, keeping split and merge O(1).

use zonealloc_core::Tag;

use crate::handle::WeakBlock;

/// Index of the sentinel record.
pub(crate) const SENTINEL: u32 = 0;

/// Offset stored in released records.
const DEAD: u32 = u32::MAX;

/// Who holds an occupied block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum User {
    /// Allocated without an owner slot.
    Anonymous,
    /// Allocated with an owner slot that is cleared on free.
    Weak(WeakBlock),
}

/// Bookkeeping for one block.
#[derive(Clone, Debug)]
pub(crate) struct BlockRecord {
    /// Arena offset of the block header.
    pub offset: u32,
    /// Header plus payload, in bytes.
    pub size: u32,
    pub tag: Tag,
    /// `None` marks a free block.
    pub user: Option<User>,
    pub next: u32,
    pub prev: u32,
}

impl BlockRecord {
    pub(crate) fn is_free(&self) -> bool {
        self.user.is_none()
    }

    fn free(offset: u32, size: u32, prev: u32, next: u32) -> Self {
        Self {
            offset,
            size,
            tag: Tag::FREE,
            user: None,
            next,
            prev,
        }
    }
}

/// Circular, index-linked list of blocks in arena order.
pub(crate) struct BlockList {
    records: Vec<BlockRecord>,
    spare: Vec<u32>,
}

impl BlockList {
    /// A list holding the sentinel and one free block spanning
    /// `[0, arena_bytes)`.
    pub(crate) fn new(arena_bytes: u32) -> Self {
        let sentinel = BlockRecord {
            offset: arena_bytes,
            size: 0,
            tag: Tag::STATIC,
            user: Some(User::Anonymous),
            next: 1,
            prev: 1,
        };
        let whole = BlockRecord::free(0, arena_bytes, SENTINEL, SENTINEL);
        Self {
            records: vec![sentinel, whole],
            spare: Vec::new(),
        }
    }

    /// Index of the block at offset zero.
    pub(crate) fn first(&self) -> u32 {
        self.records[SENTINEL as usize].next
    }

    pub(crate) fn get(&self, idx: u32) -> &BlockRecord {
        &self.records[idx as usize]
    }

    pub(crate) fn get_mut(&mut self, idx: u32) -> &mut BlockRecord {
        &mut self.records[idx as usize]
    }

    /// Record `idx` if it exists and is linked into the list.
    pub(crate) fn try_get(&self, idx: u32) -> Option<&BlockRecord> {
        if idx == SENTINEL {
            return None;
        }
        self.records
            .get(idx as usize)
            .filter(|rec| rec.offset != DEAD)
    }

    pub(crate) fn is_free(&self, idx: u32) -> bool {
        self.get(idx).is_free()
    }

    /// Carve a free tail off block `idx`, leaving it `head_size` bytes.
    ///
    /// Returns the index of the new free block. The caller guarantees
    /// `head_size < size` and that both parts are paragraph multiples.
    pub(crate) fn split(&mut self, idx: u32, head_size: u32) -> u32 {
        let (offset, size, next) = {
            let rec = self.get(idx);
            (rec.offset, rec.size, rec.next)
        };
        debug_assert!(head_size < size);
        let tail = BlockRecord::free(offset + head_size, size - head_size, idx, next);
        let tail_idx = self.acquire(tail);
        self.get_mut(next).prev = tail_idx;
        let head = self.get_mut(idx);
        head.size = head_size;
        head.next = tail_idx;
        tail_idx
    }

    /// Merge the block after `idx` into `idx` and unlink it.
    ///
    /// Returns the index of the removed record, which is released.
    pub(crate) fn absorb_next(&mut self, idx: u32) -> u32 {
        let removed = self.get(idx).next;
        debug_assert_ne!(removed, SENTINEL);
        let (size, after) = {
            let rec = self.get(removed);
            (rec.size, rec.next)
        };
        let survivor = self.get_mut(idx);
        survivor.size += size;
        survivor.next = after;
        self.get_mut(after).prev = idx;
        self.release(removed);
        removed
    }

    /// Number of real blocks (sentinel excluded).
    pub(crate) fn len(&self) -> usize {
        self.records.len() - self.spare.len() - 1
    }

    /// Walk real blocks in arena order.
    pub(crate) fn iter(&self) -> BlockIter<'_> {
        BlockIter {
            list: self,
            cursor: self.first(),
        }
    }

    fn acquire(&mut self, record: BlockRecord) -> u32 {
        if let Some(idx) = self.spare.pop() {
            self.records[idx as usize] = record;
            idx
        } else {
            let idx = self.records.len() as u32;
            self.records.push(record);
            idx
        }
    }

    fn release(&mut self, idx: u32) {
        let rec = self.get_mut(idx);
        rec.offset = DEAD;
        rec.size = 0;
        rec.tag = Tag::FREE;
        rec.user = None;
        self.spare.push(idx);
    }
}

/// Iterator over `(index, record)` pairs in arena order.
pub(crate) struct BlockIter<'a> {
    list: &'a BlockList,
    cursor: u32,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = (u32, &'a BlockRecord);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == SENTINEL {
            return None;
        }
        let idx = self.cursor;
        let rec = self.list.get(idx);
        self.cursor = rec.next;
        Some((idx, rec))
    }
}
