mod configuration_stack;
mod data_position;
mod data_substitution;
mod innermost_stack;
mod position;
mod substitution;
mod term_stack;

pub use configuration_stack::*;
pub use data_position::*;
pub use data_substitution::*;
pub use innermost_stack::*;
pub use position::*;
pub use substitution::*;
pub use term_stack::*;
