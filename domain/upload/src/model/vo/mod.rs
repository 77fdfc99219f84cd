mod chunk;
mod completeness;
mod outcome;
mod snapshot;

#[rustfmt::skip]
pub use {
    chunk::*,
    completeness::*,
    outcome::*,
    snapshot::*,
};
