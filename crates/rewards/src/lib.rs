//! Waves Block Reward Engine
//!
//! Decides the per-block reward and who receives it:
//! - Term clock and voting windows aligned to BlockReward activation
//! - Per-term reward voting with a fixed step adjustment
//! - Capped and uncapped splits between miners, DAO and XTN buy-back
//! - Read-only reward info for the HTTP API

pub mod amount;
pub mod beneficiaries;
pub mod distribution;
pub mod errors;
pub mod features;
pub mod ledger;
pub mod presenter;
pub mod settings;
pub mod term;
pub mod voting;

pub use amount::*;
pub use beneficiaries::*;
pub use distribution::*;
pub use errors::*;
pub use features::*;
pub use ledger::*;
pub use presenter::*;
pub use settings::*;
pub use term::*;
pub use voting::*;

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
