use std::sync::atomic::{AtomicU8, Ordering};

use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::PAGE_SIZE;
use crate::storage::page::layout::{
    BIT_MASKS, BLOCK_ARRAY_SIZE, OCCUPIED_OFFSET, READABLE_OFFSET, SLOT_ARRAY_OFFSET, SLOT_SIZE,
};

/// Key stored in a block page slot
pub type BlockKey = i32;

/// Value stored in a block page slot (a record ID)
pub type BlockValue = u32;

/// Typed view over a frame's bytes holding a hash index block: two bit
/// maps followed by a fixed array of (key, value) slots.
///
/// ```text
/// +-----------------+------------------+---------------------------+
/// | occupied bitmap | readable bitmap  | slot 0 | slot 1 | ...     |
/// +-----------------+------------------+---------------------------+
/// ```
///
/// A slot's occupied bit is sticky: it is set on the first insert and
/// survives removal, so probe sequences can distinguish "never used"
/// from "deleted here" (a tombstone is occupied but not readable).
///
/// The bit maps are shared bytes, so concurrent inserts aimed at sibling
/// bits of the same byte claim their slots with atomic read-modify-write
/// ops rather than plain loads and stores. All access through the view is
/// atomic; the layout is written to disk exactly as it sits in memory.
pub struct HashBlockPage<'a> {
    bytes: &'a [AtomicU8],
}

impl<'a> HashBlockPage<'a> {
    /// Reinterpret a page's bytes as a hash block.
    ///
    /// The caller must hold the owning frame's latch for the lifetime of
    /// the view (shared suffices: slot operations are individually
    /// atomic) and must not read or write the page's bytes through any
    /// other path while views are live. The buffer pool's disk I/O runs
    /// under the frame's exclusive latch, so it never overlaps a view.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly one page.
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE, "hash block must cover a full page");
        // SAFETY: AtomicU8 has the same size, alignment and bit validity
        // as u8, and every access through the view is atomic. The latch
        // contract above excludes concurrent non-atomic access to the
        // same bytes.
        let bytes = unsafe { &*(data as *const [u8] as *const [AtomicU8]) };
        Self { bytes }
    }

    /// Key at slot `index`. The slot's readable bit is not checked.
    pub fn key_at(&self, index: usize) -> BlockKey {
        LittleEndian::read_i32(&self.slot_bytes(index)[0..4])
    }

    /// Value at slot `index`. The slot's readable bit is not checked.
    pub fn value_at(&self, index: usize) -> BlockValue {
        LittleEndian::read_u32(&self.slot_bytes(index)[4..8])
    }

    /// Attempt to claim slot `index` and store `(key, value)` there.
    ///
    /// The claim is a single fetch-or on the readable byte: of any number
    /// of concurrent inserters at the same slot, exactly one observes the
    /// bit clear and wins. Returns false if the slot already holds a live
    /// record.
    pub fn insert(&self, index: usize, key: BlockKey, value: BlockValue) -> bool {
        debug_assert!(index < BLOCK_ARRAY_SIZE);
        let mask = BIT_MASKS[index % 8];
        let readable = &self.bytes[READABLE_OFFSET + index / 8];
        if readable.fetch_or(mask, Ordering::AcqRel) & mask != 0 {
            return false;
        }
        self.bytes[OCCUPIED_OFFSET + index / 8].fetch_or(mask, Ordering::AcqRel);

        let mut buf = [0u8; SLOT_SIZE];
        LittleEndian::write_i32(&mut buf[0..4], key);
        LittleEndian::write_u32(&mut buf[4..8], value);
        let base = SLOT_ARRAY_OFFSET + index * SLOT_SIZE;
        for (i, b) in buf.iter().enumerate() {
            self.bytes[base + i].store(*b, Ordering::Release);
        }
        true
    }

    /// Remove the record at slot `index`, leaving a tombstone.
    ///
    /// Only the readable bit is cleared; the occupied bit stays set.
    pub fn remove(&self, index: usize) {
        debug_assert!(index < BLOCK_ARRAY_SIZE);
        let mask = BIT_MASKS[index % 8];
        self.bytes[READABLE_OFFSET + index / 8].fetch_and(!mask, Ordering::AcqRel);
    }

    /// True if slot `index` has ever held a record
    pub fn is_occupied(&self, index: usize) -> bool {
        debug_assert!(index < BLOCK_ARRAY_SIZE);
        self.bit(OCCUPIED_OFFSET, index)
    }

    /// True if slot `index` currently holds a live record
    pub fn is_readable(&self, index: usize) -> bool {
        debug_assert!(index < BLOCK_ARRAY_SIZE);
        self.bit(READABLE_OFFSET, index)
    }

    fn bit(&self, bitmap_offset: usize, index: usize) -> bool {
        let byte = self.bytes[bitmap_offset + index / 8].load(Ordering::Acquire);
        byte & BIT_MASKS[index % 8] != 0
    }

    fn slot_bytes(&self, index: usize) -> [u8; SLOT_SIZE] {
        debug_assert!(index < BLOCK_ARRAY_SIZE);
        let base = SLOT_ARRAY_OFFSET + index * SLOT_SIZE;
        let mut buf = [0u8; SLOT_SIZE];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.bytes[base + i].load(Ordering::Acquire);
        }
        buf
    }
}
