#![doc = include_str!("../README.md")]

mod aterm;
mod aterm_binary_stream;
mod aterm_builder;
mod aterm_int;
mod aterm_list;
mod aterm_string;
mod markable;
mod parse_term;
mod protected;
mod random_term;
mod symbol;
mod transmutable;

pub mod storage;

pub use aterm::*;
pub use aterm_binary_stream::*;
pub use aterm_builder::*;
pub use aterm_int::*;
pub use aterm_list::*;
pub use aterm_string::*;
pub use markable::*;
pub use parse_term::*;
pub use protected::*;
pub use random_term::*;
pub use symbol::*;
pub use transmutable::*;
