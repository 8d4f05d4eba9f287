//! Domain logic
//!
//! - `filter` - jq filter compilation, execution and single-value extraction

pub mod filter;

pub use filter::{CompiledFilter, FilterError};
