#![forbid(unsafe_code)]

use core_data::DataApplication;
use core_data::DataExpression;
use core_data::DataFunctionSymbol;
use core_data::is_data_function_symbol;

/// Returns the closed data expression for the boolean constant `true`.
pub fn true_term() -> DataExpression {
    DataFunctionSymbol::new("true").into()
}

/// Returns the closed data expression for the boolean constant `false`.
pub fn false_term() -> DataExpression {
    DataFunctionSymbol::new("false").into()
}

/// Returns true iff `expr` is the rewritten normal form of the boolean constant `true`.
pub fn is_true(expr: &DataExpression) -> bool {
    is_data_function_symbol(expr) && expr.data_function_symbol().name() == "true"
}

/// Returns true iff `expr` is the rewritten normal form of the boolean constant `false`.
pub fn is_false(expr: &DataExpression) -> bool {
    is_data_function_symbol(expr) && expr.data_function_symbol().name() == "false"
}

/// Builds `lhs && rhs`.
pub fn conjunction(lhs: &DataExpression, rhs: &DataExpression) -> DataExpression {
    DataApplication::with_args(&DataFunctionSymbol::new("&&"), &[lhs.clone(), rhs.clone()]).into()
}

/// Builds `lhs || rhs`.
pub fn disjunction(lhs: &DataExpression, rhs: &DataExpression) -> DataExpression {
    DataApplication::with_args(&DataFunctionSymbol::new("||"), &[lhs.clone(), rhs.clone()]).into()
}

/// Builds `lhs => rhs`.
pub fn implication(lhs: &DataExpression, rhs: &DataExpression) -> DataExpression {
    DataApplication::with_args(&DataFunctionSymbol::new("=>"), &[lhs.clone(), rhs.clone()]).into()
}

/// Builds `!guard`.
pub fn negation(guard: &DataExpression) -> DataExpression {
    DataApplication::with_args(&DataFunctionSymbol::new("!"), &[guard.clone()]).into()
}

/// Builds `equal(lhs, rhs)`.
pub fn equality(lhs: &DataExpression, rhs: &DataExpression) -> DataExpression {
    DataApplication::with_args(&DataFunctionSymbol::new("equal"), &[lhs.clone(), rhs.clone()]).into()
}

/// Folds a conjunction over `terms`, returning `true_term()` for an empty slice.
pub fn conjunction_all(terms: &[DataExpression]) -> DataExpression {
    let mut iter = terms.iter();
    let Some(first) = iter.next() else {
        return true_term();
    };

    iter.fold(first.clone(), |acc, next| conjunction(&acc, next))
}
