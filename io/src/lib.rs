#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod bitstream;
mod dumpfiles;
mod format;
mod line_iterator;
mod progress;

pub use bitstream::*;
pub use dumpfiles::*;
pub use format::*;
pub use line_iterator::*;
pub use progress::*;
