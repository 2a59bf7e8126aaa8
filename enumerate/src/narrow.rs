#![forbid(unsafe_code)]

use core_data::DataExpression;
use core_data::DataVariable;
use core_data::is_data_application;
use core_data::is_data_variable;

/// Looks for a conjunct of `residual` that equates `variable` with a term
/// not mentioning it, and if found returns that term directly: the residual
/// already pins the variable's value down, so the caller can bind it without
/// expanding every constructor of its sort and rewriting a fresh candidate
/// for each one. Returns `None` if no such conjunct exists.
pub fn narrow(residual: &DataExpression, variable: &DataVariable) -> Option<DataExpression> {
    conjuncts(residual).into_iter().find_map(|conjunct| equality_operand(&conjunct, variable))
}

/// Splits `formula` into its top-level `&&`-conjuncts. A formula whose
/// top-level symbol is not `&&` is its own single conjunct.
fn conjuncts(formula: &DataExpression) -> Vec<DataExpression> {
    if is_data_application(formula) && formula.data_function_symbol().name() == "&&" {
        let args: Vec<DataExpression> = formula.data_arguments().map(|a| a.protect()).collect();
        if args.len() == 2 {
            let mut out = conjuncts(&args[0]);
            out.extend(conjuncts(&args[1]));
            return out;
        }
    }
    vec![formula.clone()]
}

/// If `conjunct` is `equal(variable, e)` or `equal(e, variable)` for some `e`
/// not containing `variable`, returns `e`.
fn equality_operand(conjunct: &DataExpression, variable: &DataVariable) -> Option<DataExpression> {
    if !is_data_application(conjunct) || conjunct.data_function_symbol().name() != "equal" {
        return None;
    }

    let args: Vec<DataExpression> = conjunct.data_arguments().map(|a| a.protect()).collect();
    if args.len() != 2 {
        return None;
    }

    let var_expr: DataExpression = variable.clone().into();
    if args[0] == var_expr && !contains_variable(&args[1], variable) {
        return Some(args[1].clone());
    }
    if args[1] == var_expr && !contains_variable(&args[0], variable) {
        return Some(args[0].clone());
    }
    None
}

fn contains_variable(expr: &DataExpression, variable: &DataVariable) -> bool {
    if is_data_variable(expr) {
        let found: DataVariable = expr.clone().into();
        return &found == variable;
    }
    if is_data_application(expr) {
        return expr.data_arguments().any(|arg| contains_variable(&arg.protect(), variable));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_data::DataApplication;
    use core_data::DataFunctionSymbol;
    use core_data::SortExpression;

    fn nat(name: &str) -> SortExpression {
        SortExpression::new(name)
    }

    #[test]
    fn test_narrow_finds_direct_equality() {
        let n = DataVariable::with_sort("n", nat("Nat"));
        let zero: DataExpression = DataFunctionSymbol::new("zero").into();
        let formula: DataExpression =
            DataApplication::with_args(&DataFunctionSymbol::new("equal"), &[n.clone().into(), zero.clone()]).into();

        assert_eq!(narrow(&formula, &n), Some(zero));
    }

    #[test]
    fn test_narrow_looks_through_conjunction() {
        let n = DataVariable::with_sort("n", nat("Nat"));
        let m = DataVariable::with_sort("m", nat("Nat"));
        let succ_m: DataExpression = DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[m.clone().into()]).into();

        let unrelated: DataExpression = DataFunctionSymbol::new("true").into();
        let equality: DataExpression =
            DataApplication::with_args(&DataFunctionSymbol::new("equal"), &[n.clone().into(), succ_m.clone()]).into();
        let conjunction: DataExpression =
            DataApplication::with_args(&DataFunctionSymbol::new("&&"), &[unrelated, equality]).into();

        assert_eq!(narrow(&conjunction, &n), Some(succ_m));
    }

    #[test]
    fn test_narrow_rejects_self_referential_equality() {
        let n = DataVariable::with_sort("n", nat("Nat"));
        let succ_n: DataExpression = DataApplication::with_args(&DataFunctionSymbol::new("succ"), &[n.clone().into()]).into();
        let formula: DataExpression =
            DataApplication::with_args(&DataFunctionSymbol::new("equal"), &[n.clone().into(), succ_n]).into();

        assert_eq!(narrow(&formula, &n), None);
    }

    #[test]
    fn test_narrow_returns_none_without_equality() {
        let n = DataVariable::with_sort("n", nat("Nat"));
        let formula: DataExpression = DataFunctionSymbol::new("true").into();

        assert_eq!(narrow(&formula, &n), None);
    }
}
