#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

#[macro_use]
mod cast_macro;

mod debug_trace;
mod error;
mod generational_index;
mod helper;
mod no_hasher;
mod permutation;
mod pest_display_pair;
mod random_test;
mod tagged_index;
mod test_logger;
mod timing;

pub use error::*;
pub use generational_index::*;
pub use helper::*;
pub use no_hasher::*;
pub use permutation::*;
pub use pest_display_pair::*;
pub use random_test::*;
pub use tagged_index::*;
pub use test_logger::*;
pub use timing::*;
