pub mod config;
pub mod service_provider;
pub mod telemetry;

#[rustfmt::skip]
pub use {
    config::*,
    service_provider::*,
};
