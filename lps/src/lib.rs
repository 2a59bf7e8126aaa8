#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod confluence;
mod error;
mod explore;
mod generator;
pub mod linear_process;
mod state;
pub mod trace;

pub use error::*;
pub use explore::*;
pub use generator::*;
pub use linear_process::LinearProcess;
pub use linear_process::Summand;
pub use state::*;
