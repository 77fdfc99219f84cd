mod registry;

#[rustfmt::skip]
pub use {
    registry::UploadRegistry,
};
