use serde::Serialize;

/// Point in time view of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSnapshot {
    pub upload_id: String,
    pub file_name: String,
    pub relative_path: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub expected_chunks: u64,
    /// Sorted ascending.
    pub received_chunks: Vec<u64>,
    pub finalized: bool,
}
