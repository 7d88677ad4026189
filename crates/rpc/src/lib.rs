//! HTTP API over the block reward ledger.

mod rewards;
pub mod server;

pub use server::{build_router, start_server, AppState, SharedState};
