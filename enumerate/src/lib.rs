#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod enumerator;
mod error;
mod narrow;

pub use enumerator::*;
pub use error::*;
pub use narrow::narrow;
