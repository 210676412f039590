use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use tarndb::storage::buffer::BufferPoolManager;

/// A buffer pool over a fresh temporary database file. The file handle is
/// returned alongside the pool: dropping it deletes the database, so tests
/// keep it alive for as long as the pages must persist.
#[allow(dead_code)]
pub fn create_test_buffer_pool(
    pool_size: usize,
) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, file.path())?);
    Ok((buffer_pool, file))
}

/// Open a second pool over an existing database file, the way a restart
/// would. Anything the first pool flushed must be visible through it.
#[allow(dead_code)]
pub fn reopen_buffer_pool(pool_size: usize, db_file: &NamedTempFile) -> Result<BufferPoolManager> {
    Ok(BufferPoolManager::new(pool_size, db_file.path())?)
}
