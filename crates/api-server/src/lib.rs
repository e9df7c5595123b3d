#![warn(clippy::unwrap_used)]

pub mod monitoring_rest;
pub mod rest;
pub mod server;

pub use server::{router, ApiServer};
