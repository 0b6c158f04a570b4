//! Cross-crate scenarios.

pub mod fixtures;

mod bus;
mod frontend;
mod websocket;
