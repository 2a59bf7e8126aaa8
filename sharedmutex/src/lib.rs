#![doc = include_str!("../README.md")]

mod bf_sharedmutex;
mod bf_vec;
mod recursive_lock;

pub use bf_sharedmutex::*;
pub use bf_vec::*;
pub use recursive_lock::*;
