//! Library crate for wifi-level-rs: periodic Wi-Fi sampling of one access point,
//! with a per-channel view and a rolling signal history.
pub mod channels;
pub mod config;
pub mod cycle;
pub mod error;
pub mod permissions;
pub mod radio;
pub mod recorder;
pub mod series;
pub mod server;
pub mod types;
