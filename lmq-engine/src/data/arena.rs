//! Stable-address byte storage backing variable-length fields.
//!
//! Every row container that can hold byte arrays owns one arena; the
//! two-word `{ptr, len}` descriptors written into its word storage point
//! at arena memory, so descriptors stay valid for as long as their
//! container lives and never reference another block's buffers.

use parking_lot::Mutex;

#[derive(Default)]
pub struct ByteArena {
    chunks: Mutex<Vec<Box<[u8]>>>,
}

impl ByteArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `data` into the arena and return the stable address of the
    /// copy. Empty slices allocate nothing and yield a null pointer;
    /// readers treat `{_, 0}` descriptors as empty.
    pub fn alloc(&self, data: &[u8]) -> *const u8 {
        if data.is_empty() {
            return std::ptr::null();
        }
        let chunk: Box<[u8]> = data.into();
        let ptr = chunk.as_ptr();
        self.chunks.lock().push(chunk);
        ptr
    }

    /// Take over another arena's chunks, keeping their addresses alive.
    /// Used when a vertical block adopts columns from another block.
    pub(crate) fn absorb(&self, other: &ByteArena) {
        let mut stolen = other.chunks.lock();
        self.chunks.lock().append(&mut stolen);
    }
}
