#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod compressed_vec;
mod indexed_set;
mod protection_set;
mod vecset;

pub use compressed_vec::*;
pub use indexed_set::*;
pub use protection_set::*;
pub use vecset::*;
