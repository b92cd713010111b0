#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod classifier;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod events;
pub mod gateway;
pub mod ui;
pub mod utils;
