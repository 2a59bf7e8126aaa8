#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod boolean;
mod construct;
mod error;
mod induction;
mod order;
mod pool;
mod solver;
mod witness;

pub use boolean::*;
pub use construct::*;
pub use error::*;
pub use induction::*;
pub use order::*;
pub use pool::*;
pub use solver::*;
pub use witness::*;
