mod chunk_store;
mod upload;

#[rustfmt::skip]
pub use {
    chunk_store::*,
    upload::*,
};
