use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Page ID type
pub type PageId = u32;

/// Buffer pool frame ID type
pub type FrameId = u32;

/// Sentinel for "no page". Valid page IDs start at 1.
pub const INVALID_PAGE_ID: PageId = 0;

/// A fixed-size block of bytes plus the ID of the page it currently holds.
///
/// The `RwLock` around a `Page` is the frame's content latch: shared for
/// concurrent readers of `data`, exclusive for writers and for the disk
/// I/O paths.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
        }
    }
}

/// Smart pointer to a latched page
pub type PagePtr = Arc<RwLock<Page>>;
