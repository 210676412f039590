mod hash_block;
mod layout;

pub use hash_block::HashBlockPage;
pub use hash_block::{BlockKey, BlockValue};
pub use layout::{BITMAP_BYTES, BLOCK_ARRAY_SIZE, SLOT_SIZE};
