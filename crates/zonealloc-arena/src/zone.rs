//! The zone: arena ownership, initialisation and handle resolution.
//!
//! Allocation, reclamation and the heap checker are further `impl Zone`
//! blocks in their own modules; this one holds the state they share.

use tracing::info;

use zonealloc_core::layout::{is_paragraph_aligned, paragraph_align_down, HEADER_SIZE};
use zonealloc_core::{ArenaSpan, FatalError, FatalReporter, Tag, ZoneError, ZONE_ID};

use crate::block::BlockList;
use crate::config::{ConfigError, ZoneConfig};
use crate::handle::{BlockHandle, WeakBlock};
use crate::header;
use crate::owner::OwnerTable;

/// A zone allocator over one fixed arena.
///
/// The zone owns its arena for its whole lifetime and never grows or
/// returns it. It is deliberately neither `Send` nor `Sync`: every entry
/// point must be called from the single execution context that owns it,
/// never from an interrupt or signal handler.
pub struct Zone {
    pub(crate) memory: Vec<u8>,
    base: usize,
    pub(crate) arena_bytes: u32,
    pub(crate) blocks: BlockList,
    pub(crate) owners: OwnerTable,
    /// Where the next allocation starts scanning. May rest on an
    /// occupied block.
    pub(crate) rover: u32,
    pub(crate) config: ZoneConfig,
    reporter: Box<dyn FatalReporter>,
    /// Bytes held by occupied blocks, headers included.
    pub(crate) allocated_bytes: usize,
}

impl Zone {
    /// Build a zone over `span`: one free block covering the whole arena.
    ///
    /// The span is truncated to a whole number of paragraphs. Fails if the
    /// configuration is invalid or the span cannot hold a single block.
    pub fn new(
        span: ArenaSpan,
        config: ZoneConfig,
        reporter: Box<dyn FatalReporter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (base, mut memory) = span.into_parts();
        let usable = paragraph_align_down(memory.len());
        ZoneConfig::validate_arena(usable)?;
        memory.truncate(usable);

        let arena_bytes = usable as u32;
        let blocks = BlockList::new(arena_bytes);
        let first = blocks.first();
        header::write(&mut memory, 0, first, arena_bytes);

        info!(arena_bytes = usable, base, "{usable} bytes allocated for zone");

        Ok(Self {
            memory,
            base,
            arena_bytes,
            blocks,
            owners: OwnerTable::new(),
            rover: first,
            config,
            reporter,
            allocated_bytes: 0,
        })
    }

    /// Size of the arena in bytes.
    pub fn arena_bytes(&self) -> usize {
        self.arena_bytes as usize
    }

    /// Host address the arena span started at.
    pub fn base(&self) -> usize {
        self.base
    }

    /// The configuration this zone was built with.
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Payload bytes of a live block.
    ///
    /// The slice covers the whole granted capacity, which may exceed the
    /// size originally requested.
    pub fn payload(&self, handle: BlockHandle) -> &[u8] {
        let idx = self.resolve_live("payload", handle);
        let rec = self.blocks.get(idx);
        let start = rec.offset as usize + HEADER_SIZE;
        let end = rec.offset as usize + rec.size as usize;
        &self.memory[start..end]
    }

    /// Mutable payload bytes of a live block.
    pub fn payload_mut(&mut self, handle: BlockHandle) -> &mut [u8] {
        let idx = self.resolve_live("payload_mut", handle);
        let rec = self.blocks.get(idx);
        let start = rec.offset as usize + HEADER_SIZE;
        let end = rec.offset as usize + rec.size as usize;
        &mut self.memory[start..end]
    }

    /// Payload capacity of a live block in bytes.
    pub fn capacity(&self, handle: BlockHandle) -> usize {
        let idx = self.resolve_live("capacity", handle);
        self.blocks.get(idx).size as usize - HEADER_SIZE
    }

    /// Current tag of a live block.
    pub fn tag(&self, handle: BlockHandle) -> Tag {
        let idx = self.resolve_live("tag", handle);
        self.blocks.get(idx).tag
    }

    /// Resolve an owner slot to its block, or `None` once the block has
    /// been freed or evicted.
    pub fn upgrade(&self, weak: WeakBlock) -> Option<BlockHandle> {
        let idx = self.owners.get(weak)?;
        Some(BlockHandle::from_header(self.blocks.get(idx).offset))
    }

    /// Whether the block behind `weak` is still allocated.
    pub fn is_live(&self, weak: WeakBlock) -> bool {
        self.owners.get(weak).is_some()
    }

    /// The whole arena, headers included.
    pub fn raw_arena(&self) -> &[u8] {
        &self.memory
    }

    /// Unchecked mutable access to the whole arena, headers included.
    ///
    /// Writes outside a payload corrupt block headers; the zone notices
    /// on the next [`check_heap`](Zone::check_heap) or when the damaged
    /// block is freed.
    pub fn raw_arena_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Hand `error` to the fatal reporter. Never returns.
    pub(crate) fn fatal(&self, context: &'static str, error: ZoneError) -> ! {
        self.reporter.report(FatalError::new(context, error))
    }

    pub(crate) fn handle_of(&self, idx: u32) -> BlockHandle {
        BlockHandle::from_header(self.blocks.get(idx).offset)
    }

    /// Map a handle to its block record, validating it against the header.
    pub(crate) fn resolve(&self, handle: BlockHandle) -> Result<u32, ZoneError> {
        let offset = handle.offset();
        let arena_bytes = self.arena_bytes as usize;
        if self.config.range_check && !is_paragraph_aligned(offset) {
            return Err(ZoneError::Misaligned { offset });
        }
        if offset < HEADER_SIZE || offset >= arena_bytes {
            return Err(ZoneError::OutOfRange {
                offset,
                arena_bytes,
            });
        }

        let header_offset = (offset - HEADER_SIZE) as u32;
        let h = header::read(&self.memory, header_offset);
        if self.config.check_markers && h.marker != ZONE_ID {
            return Err(ZoneError::BadMarker {
                offset: header_offset as usize,
                found: h.marker,
            });
        }
        match self.blocks.try_get(h.record) {
            Some(rec) if rec.offset == header_offset => Ok(h.record),
            _ => Err(ZoneError::HeaderMismatch {
                offset: header_offset as usize,
            }),
        }
    }

    /// Resolve a handle that must name an occupied block; fatal otherwise.
    pub(crate) fn resolve_live(&self, context: &'static str, handle: BlockHandle) -> u32 {
        match self.resolve(handle) {
            Ok(idx) if !self.blocks.is_free(idx) => idx,
            Ok(idx) => self.fatal(
                context,
                ZoneError::AlreadyFree {
                    offset: self.blocks.get(idx).offset as usize,
                },
            ),
            Err(e) => self.fatal(context, e),
        }
    }
}
