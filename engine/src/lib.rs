#![doc = include_str!("../README.md")]

mod config;
mod innermost_rewriter;
mod matching;
mod naive_rewriter;
mod rewrite_specification;
mod stack_rewriter;
mod set_automaton;

pub mod test_utility;
pub mod utilities;

pub use config::*;
pub use innermost_rewriter::*;
pub use naive_rewriter::*;
pub use rewrite_specification::*;
pub use stack_rewriter::*;
pub use set_automaton::*;
