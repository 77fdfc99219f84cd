pub mod upload;

#[rustfmt::skip]
pub use {
    upload::*,
};
