pub mod address;
pub mod block;
pub mod feature;

pub use address::*;
pub use block::*;
pub use feature::*;

/// Block height. Height 1 is the genesis block.
pub type Height = u64;

/// Smallest monetary unit.
pub type Wavelets = u64;

/// 1 WAVES = 100 000 000 wavelets
pub const WAVELETS_PER_WAVES: Wavelets = 100_000_000;
