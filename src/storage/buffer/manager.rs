use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::common::types::{Page, PageId, PagePtr, FrameId, INVALID_PAGE_ID};
use crate::storage::disk::DiskManager;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::ClockReplacer;

/// An in-memory slot hosting one page at a time.
///
/// The content latch is the `RwLock` inside `page`. The dirty flag is
/// atomic: it is raised under the pool latch (unpin) and lowered under the
/// frame's write latch (flush, write-back), and those two critical
/// sections are never nested.
struct Frame {
    page: PagePtr,
    is_dirty: AtomicBool,
}

/// Per-frame residency and pin state, guarded by the pool latch
struct FrameMeta {
    page_id: PageId,
    pin_count: u32,
}

/// Everything the pool latch guards: the page table, the free list, and
/// each frame's metadata. A frame is in exactly one of: the free list, the
/// page table, or mid-replacement with its write latch held.
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    metas: Vec<FrameMeta>,
}

/// A fixed pool of frames mediating all access between callers and the
/// disk. Pages are pinned into frames on fetch/create and must be unpinned
/// exactly once; unpinned frames are handed to the clock replacer and
/// reclaimed on demand, with dirty contents written back first.
///
/// Lock order is pool latch, then one frame latch. Disk reads and writes
/// happen with the pool latch released and only the target frame latched.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    replacer: ClockReplacer,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, db_path: impl AsRef<Path>) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_disk_manager(pool_size, disk_manager))
    }

    /// Build a pool over an existing disk manager, e.g. one shared with
    /// other components.
    pub fn with_disk_manager(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut metas = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            frames.push(Frame {
                page: Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))),
                is_dirty: AtomicBool::new(false),
            });
            metas.push(FrameMeta {
                page_id: INVALID_PAGE_ID,
                pin_count: 0,
            });
            free_list.push_back(i as FrameId);
        }

        Self {
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                metas,
            }),
            replacer: ClockReplacer::new(pool_size),
            disk_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Fetch a page, pinning it in its frame.
    ///
    /// A resident page is pinned and returned directly. Otherwise a frame
    /// is reclaimed and the page is read from disk into it. Fails with
    /// `BufferPoolFull` when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.metas[frame_id as usize].pin_count += 1;
            self.replacer.pin(frame_id);
            return Ok(self.frames[frame_id as usize].page.clone());
        }

        if state.free_list.is_empty() && self.replacer.size() == 0 {
            return Err(BufferPoolError::BufferPoolFull);
        }

        self.replace_and_load(state, page_id, false)
    }

    /// Allocate a fresh page on disk and pin it into a frame, zero-filled.
    ///
    /// The frame starts out dirty so the page reaches disk as a valid
    /// empty page even if the caller never writes to it.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let state = self.state.lock();

        if state.free_list.is_empty() && self.replacer.size() == 0 {
            return Err(BufferPoolError::BufferPoolFull);
        }

        let page_id = self.disk_manager.allocate_page()?;
        let page = self.replace_and_load(state, page_id, true)?;
        Ok((page, page_id))
    }

    /// Drop one pin on `page_id`, optionally marking the content dirty.
    ///
    /// The dirty flag is only ever ORed in here, never cleared. Returns
    /// `Ok(false)` if the pin count was already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool, BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Err(BufferPoolError::PageNotFound(page_id)),
        };

        let meta = &mut state.metas[frame_id as usize];
        if meta.pin_count == 0 {
            return Ok(false);
        }
        meta.pin_count -= 1;
        let now_unpinned = meta.pin_count == 0;

        if now_unpinned {
            self.replacer.unpin(frame_id);
        }
        if is_dirty {
            self.frames[frame_id as usize]
                .is_dirty
                .store(true, Ordering::Release);
        }
        Ok(true)
    }

    /// Write `page_id`'s bytes to disk if the frame is dirty.
    ///
    /// Pin count and replacer membership are untouched. Returns `Ok(false)`
    /// if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(false),
        };

        let frame = &self.frames[frame_id as usize];
        let page = frame.page.clone();
        // Take the content latch before releasing the pool latch so the
        // frame cannot change identity under the flush.
        let guard = page.write();
        drop(state);

        if guard.page_id != INVALID_PAGE_ID && frame.is_dirty.swap(false, Ordering::AcqRel) {
            self.disk_manager.write_page(&guard)?;
        }

        Ok(true)
    }

    /// Flush every page resident at the time of the call.
    ///
    /// A page evicted between the snapshot and its turn has already been
    /// written back by the eviction path.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock();
            state.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Remove `page_id` from the pool and deallocate it on disk.
    ///
    /// A page that is not resident is simply deallocated and counts as
    /// success. Returns `Ok(false)` while the page is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => {
                drop(state);
                self.disk_manager.deallocate_page(page_id)?;
                return Ok(true);
            }
        };

        if state.metas[frame_id as usize].pin_count > 0 {
            return Ok(false);
        }

        let frame = &self.frames[frame_id as usize];
        let page = frame.page.clone();
        // Latch the content before the frame re-enters the free list, so a
        // thread that grabs it for a new page cannot race the reset below.
        let mut guard = page.write();

        self.replacer.pin(frame_id);
        state.page_table.remove(&page_id);
        {
            let meta = &mut state.metas[frame_id as usize];
            meta.page_id = INVALID_PAGE_ID;
            meta.pin_count = 0;
        }
        state.free_list.push_back(frame_id);
        drop(state);

        self.disk_manager.deallocate_page(page_id)?;
        guard.data.fill(0);
        guard.page_id = INVALID_PAGE_ID;
        frame.is_dirty.store(false, Ordering::Release);

        Ok(true)
    }

    /// Install `new_page_id` into a reusable frame and return it pinned.
    ///
    /// Frames come from the free list first, otherwise from a clock
    /// victim, which is unmapped and pre-emptively pinned in the replacer
    /// so it cannot be chosen again while its latch is held across I/O.
    /// The caller has already verified under the pool latch that a frame
    /// is available. The frame's write latch is acquired before the pool
    /// latch is released; dirty contents are written back, then the new
    /// page is read in (or zeroed for a fresh allocation).
    fn replace_and_load(
        &self,
        mut state: MutexGuard<'_, PoolState>,
        new_page_id: PageId,
        is_new: bool,
    ) -> Result<PagePtr, BufferPoolError> {
        let frame_id = match state.free_list.pop_front() {
            Some(frame_id) => frame_id,
            None => {
                // The replacer only changes under the pool latch, so the
                // availability check still holds and a victim must exist.
                let frame_id = self
                    .replacer
                    .victim()
                    .ok_or(BufferPoolError::BufferPoolFull)?;
                let old_page_id = state.metas[frame_id as usize].page_id;
                log::debug!(
                    "evicting page {} from frame {} for page {}",
                    old_page_id,
                    frame_id,
                    new_page_id
                );
                state.page_table.remove(&old_page_id);
                self.replacer.pin(frame_id);
                frame_id
            }
        };

        state.page_table.insert(new_page_id, frame_id);
        {
            let meta = &mut state.metas[frame_id as usize];
            meta.page_id = new_page_id;
            meta.pin_count = 1;
        }

        let frame = &self.frames[frame_id as usize];
        let page = frame.page.clone();
        let mut guard = page.write();
        drop(state);

        // The guard still holds the previous occupant's identity and
        // bytes; write them back before they are overwritten.
        if frame.is_dirty.swap(false, Ordering::AcqRel) {
            self.disk_manager.write_page(&guard)?;
        }

        if is_new {
            guard.data.fill(0);
            guard.page_id = new_page_id;
        } else {
            self.disk_manager.read_page(new_page_id, &mut guard)?;
        }
        frame.is_dirty.store(is_new, Ordering::Release);
        drop(guard);

        Ok(page)
    }
}
