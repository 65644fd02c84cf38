//! WebSocket transport: upgrade handling, per-connection message loop, and
//! router assembly. Pairs with `server::signaling` for event semantics.

mod connection;
mod handler;
mod sending;
mod routes;

pub use routes::create_router;
