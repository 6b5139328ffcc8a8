//! The claimd HTTP/JSON daemon: request surface and reaper over
//! `claimd_core::Registry`.

pub mod api;
pub mod config_resolution;
pub mod reaper;

pub use api::{router, AppState};
