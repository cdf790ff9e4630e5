pub mod core;
pub mod engine;
pub mod modes;
mod ws_handler;

pub use core::messages;
pub use ws_handler::{PlayState, run_connection};
