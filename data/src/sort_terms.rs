use std::fmt;
use std::ops::Deref;

use delegate::delegate;

use core_aterm::ATerm;
use core_aterm::ATermArgs;
use core_aterm::ATermIndex;
use core_aterm::ATermRef;
use core_aterm::Markable;
use core_aterm::Symb;
use core_aterm::SymbolRef;
use core_aterm::Term;
use core_aterm::TermIterator;
use core_aterm::Transmutable;
use core_aterm::storage::Marker;
use core_macros::core_derive_terms;
use core_macros::core_term;

use crate::DATA_SYMBOLS;
use crate::is_sort_expression;

// This module is only used internally to run the proc macro.
#[core_derive_terms]
mod inner {
    use core_aterm::ATermString;

    use super::*;

    #[core_term(is_sort_expression)]
    pub struct SortExpression {
        term: ATerm,
    }

    impl SortExpression {
        /// Returns the name of the sort.
        pub fn name(&self) -> &str {
            self.term.arg(0).get_head_symbol().name()
        }

        /// Creates a sort expression with the given name.
        pub fn new(name: impl Into<ATermString>) -> SortExpression {
            DATA_SYMBOLS.with_borrow(|ds| SortExpression {
                term: ATerm::with_args(ds.sort_id_symbol.deref(), &[name.into()]).protect(),
            })
        }

        /// Creates a sort expression with the unknown value.
        pub fn unknown_sort() -> SortExpression {
            DATA_SYMBOLS.with_borrow(|ds| SortExpression {
                term: ATerm::with_args(ds.sort_id_symbol.deref(), &[ATermString::new("@no_value@")]).protect(),
            })
        }
    }

    impl fmt::Display for SortExpression {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.name())
        }
    }
}

pub use inner::*;
