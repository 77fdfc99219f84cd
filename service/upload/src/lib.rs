mod local_store;
mod reaper;
mod registry;
mod upload;

#[rustfmt::skip]
pub use {
    local_store::LocalChunkStoreImpl,
    reaper::UploadReaperImpl,
    registry::InMemoryUploadRegistry,
    upload::UploadServiceImpl,
};
