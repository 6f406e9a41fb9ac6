/// Accumulates raw byte fragments from a transport into fixed-size chunks,
/// carrying any partial remainder forward to the next fragment.
///
/// Bytes are never dropped, duplicated or reordered; the leftover is always
/// strictly shorter than one chunk.
pub struct ChunkFramer {
    chunk_bytes: usize,
    leftover: Vec<u8>,
}

impl ChunkFramer {
    pub fn new(chunk_bytes: usize) -> Self {
        debug_assert!(chunk_bytes > 0);
        Self {
            chunk_bytes,
            leftover: Vec::new(),
        }
    }

    /// Append a fragment and split off all complete chunks in arrival order.
    ///
    /// An empty fragment yields no chunks and leaves the leftover unchanged.
    /// A trailing remainder that is not sample-aligned is legal here; it is
    /// simply retained until more bytes arrive.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<Vec<u8>> {
        self.leftover.extend_from_slice(fragment);

        let usable = self.leftover.len() - self.leftover.len() % self.chunk_bytes;
        let rest = self.leftover.split_off(usable);

        let chunks = self
            .leftover
            .chunks_exact(self.chunk_bytes)
            .map(|c| c.to_vec())
            .collect();

        self.leftover = rest;
        chunks
    }

    pub fn leftover_len(&self) -> usize {
        self.leftover.len()
    }
}
