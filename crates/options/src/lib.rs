//! Key/value configuration handed to native calls: an ordered [`Dictionary`]
//! and single [`ConfigOption`]s applied to anything [`Configurable`].

mod dict;
mod option;

pub use dict::{DictFlags, Dictionary, Entry};
pub use option::{ConfigOption, Configurable, OptionValue, apply_all};
