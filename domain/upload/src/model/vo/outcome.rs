/// What happened to the bytes of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Bytes were written and the chunk recorded.
    Stored,
    /// The chunk, or the whole upload, was already there. Nothing was written.
    AlreadyStored,
}

/// Result of storing one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub status: ChunkStatus,
    /// The whole file has been finalized.
    pub finished: bool,
}

impl WriteOutcome {
    pub fn stored(finished: bool) -> Self {
        Self {
            status: ChunkStatus::Stored,
            finished,
        }
    }

    pub fn already_stored(finished: bool) -> Self {
        Self {
            status: ChunkStatus::AlreadyStored,
            finished,
        }
    }
}
