use serde::{Deserialize, Serialize};

/// Which chunk numbers must be present before an upload counts as complete.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletenessPolicy {
    /// Every chunk in `1..=expected`.
    #[default]
    AllChunks,
    /// Chunks `1..expected`, the last slot is implied by the write that runs the check.
    ///
    /// Suits clients that fold the remainder into the final chunk, so they never send
    /// chunk number `expected` when the size isn't a multiple of the chunk size.
    TrailingImplied,
}

impl CompletenessPolicy {
    /// Highest chunk number the scan has to find.
    pub fn last_required(self, expected: u64) -> u64 {
        match self {
            CompletenessPolicy::AllChunks => expected,
            CompletenessPolicy::TrailingImplied => expected.saturating_sub(1),
        }
    }
}
