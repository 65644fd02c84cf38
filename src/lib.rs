#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(clippy::too_many_arguments)]

//! Synchronization and signaling core for a video co-watching product.
//!
//! The server never stores or streams media. It admits rooms bound to a
//! content hash, lets a single host drive playback, fans out control events
//! to followers, and runs a grace-period timer that closes or transfers a
//! room when its host disconnects without reconnecting in time.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod store;
pub mod websocket;
