use actix_easy_multipart::{tempfile::Tempfile, text::Text, MultipartForm};
use domain_upload::{
    exception::{UploadException, UploadResult},
    model::vo::ChunkDescriptor,
};
use serde::Deserialize;

/// The `resumable*` parameters sent with every test and upload request.
///
/// All of them stay optional here so that a missing one is reported as an invalid chunk
/// instead of an extractor error.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResumableParams {
    pub resumable_chunk_number: Option<String>,
    pub resumable_chunk_size: Option<String>,
    pub resumable_total_size: Option<String>,
    pub resumable_identifier: Option<String>,
    pub resumable_filename: Option<String>,
    pub resumable_relative_path: Option<String>,
}

impl ResumableParams {
    pub fn into_descriptor(self) -> UploadResult<ChunkDescriptor> {
        Ok(ChunkDescriptor {
            chunk_number: number("resumableChunkNumber", self.resumable_chunk_number)?,
            chunk_size: number("resumableChunkSize", self.resumable_chunk_size)?,
            file_size: number("resumableTotalSize", self.resumable_total_size)?,
            upload_id: self.resumable_identifier.unwrap_or_default(),
            file_name: self.resumable_filename.unwrap_or_default(),
            relative_path: self.resumable_relative_path.unwrap_or_default(),
        })
    }
}

fn number(name: &str, value: Option<String>) -> UploadResult<u64> {
    let value = value.ok_or_else(|| UploadException::invalid(format!("{name} is missing")))?;
    value
        .trim()
        .parse()
        .map_err(|_| UploadException::invalid(format!("{name}: {value:?} is not a number")))
}

/// Multipart upload body: the chunk bytes in `file` next to the usual parameters.
#[derive(MultipartForm)]
pub struct ResumableChunkForm {
    #[multipart(rename = "resumableChunkNumber")]
    pub chunk_number: Option<Text<String>>,
    #[multipart(rename = "resumableChunkSize")]
    pub chunk_size: Option<Text<String>>,
    #[multipart(rename = "resumableTotalSize")]
    pub total_size: Option<Text<String>>,
    #[multipart(rename = "resumableIdentifier")]
    pub identifier: Option<Text<String>>,
    #[multipart(rename = "resumableFilename")]
    pub filename: Option<Text<String>>,
    #[multipart(rename = "resumableRelativePath")]
    pub relative_path: Option<Text<String>>,
    pub file: Tempfile,
}

impl ResumableChunkForm {
    /// Splits the form into its parameters and the spooled chunk bytes.
    pub fn into_parts(self) -> (ResumableParams, Tempfile) {
        let text = |field: Option<Text<String>>| field.map(|t| t.0);
        let params = ResumableParams {
            resumable_chunk_number: text(self.chunk_number),
            resumable_chunk_size: text(self.chunk_size),
            resumable_total_size: text(self.total_size),
            resumable_identifier: text(self.identifier),
            resumable_filename: text(self.filename),
            resumable_relative_path: text(self.relative_path),
        };
        (params, self.file)
    }
}
