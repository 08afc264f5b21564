//! Core data types: connection state, ticks, snapshots, symbol utils.

pub mod enums;
pub mod market_data;
pub mod symbol;

pub use enums::*;
pub use market_data::*;
pub use symbol::*;
