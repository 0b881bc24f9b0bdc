//! Transaction-scoped buffer arena.

use bytes::Bytes;

/// Owns every buffer a transaction hands out.
///
/// Reads copy engine rows into the arena and return cheap [`Bytes`] views.
/// The arena keeps a reference to each buffer until the transaction ends,
/// so raw pointers taken from a view stay valid for the transaction's
/// lifetime.
#[derive(Debug, Default)]
pub(crate) struct BufferArena {
    buffers: Vec<Bytes>,
    retained_bytes: usize,
}

impl BufferArena {
    /// Moves `data` into the arena and returns a view of it.
    pub(crate) fn retain(&mut self, data: Vec<u8>) -> Bytes {
        let buffer = Bytes::from(data);
        self.retained_bytes += buffer.len();
        self.buffers.push(buffer.clone());
        buffer
    }

    /// Number of buffers held.
    pub(crate) fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Total bytes held.
    pub(crate) fn retained_bytes(&self) -> usize {
        self.retained_bytes
    }

    /// Drops every buffer at once.
    pub(crate) fn clear(&mut self) {
        self.buffers.clear();
        self.retained_bytes = 0;
    }
}
