//! Term decomposition helpers shared by the collection and solving rules.

use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use stepmath_ast::{Expr, ExprId, RelOp, Store, Symbol};
use stepmath_engine::Context;

/// Split a term into its rational coefficient and its non-constant
/// factors, sorted for comparability. `3 x` gives `(3, [x])`, `-[x ^ 2]`
/// gives `(-1, [[x ^ 2]])`, `[5 / 2]` gives `(5/2, [])`.
pub(crate) fn split_term(store: &Store, id: ExprId) -> Option<(BigRational, Vec<ExprId>)> {
    if let Some(r) = store.as_rational(id) {
        return Some((r, Vec::new()));
    }
    match store.get(id) {
        Expr::Neg(inner) => {
            let (coeff, factors) = split_term(store, *inner)?;
            Some((-coeff, factors))
        }
        Expr::Product(children) => {
            let mut coeff = BigRational::one();
            let mut factors = Vec::new();
            for &child in children {
                match store.as_rational(child) {
                    Some(r) => coeff *= r,
                    None => factors.push(child),
                }
            }
            factors.sort_unstable();
            Some((coeff, factors))
        }
        Expr::Variable(_) | Expr::Power(..) | Expr::Root(..) | Expr::Abs(_) | Expr::Function(..) => {
            Some((BigRational::one(), vec![id]))
        }
        _ => None,
    }
}

/// Total degree of a monomial for display ordering; non-polynomial terms
/// count as degree zero so they sort with the constants.
pub(crate) fn monomial_degree(store: &Store, id: ExprId) -> u32 {
    match store.get(id) {
        Expr::Variable(_) => 1,
        Expr::Power(base, exp) => match (store.get(*base), store.get(*exp)) {
            (Expr::Variable(_), Expr::Integer(n)) => n.to_u32().unwrap_or(0),
            _ => 0,
        },
        Expr::Neg(inner) => monomial_degree(store, *inner),
        Expr::Product(children) => children.iter().map(|&c| monomial_degree(store, c)).sum(),
        _ => 0,
    }
}

fn is_var(store: &Store, id: ExprId, var: &Symbol) -> bool {
    matches!(store.get(id), Expr::Variable(s) if s == var)
}

fn is_var_squared(store: &Store, id: ExprId, var: &Symbol) -> bool {
    match store.get(id) {
        Expr::Power(base, exp) => {
            is_var(store, *base, var)
                && matches!(store.get(*exp), Expr::Integer(n) if *n == 2.into())
        }
        _ => false,
    }
}

/// Coefficients `(a, b, c)` of `a x^2 + b x + c`, if the expression is a
/// polynomial of degree at most two in `var` with no other variables.
pub(crate) fn poly_coefficients(
    store: &Store,
    id: ExprId,
    var: &Symbol,
) -> Option<(BigRational, BigRational, BigRational)> {
    let terms: Vec<ExprId> = match store.get(id) {
        Expr::Sum(children) => children.clone(),
        _ => vec![id],
    };
    let mut a = BigRational::zero();
    let mut b = BigRational::zero();
    let mut c = BigRational::zero();
    for term in terms {
        let (coeff, factors) = split_term(store, term)?;
        match factors.as_slice() {
            [] => c += coeff,
            [f] if is_var(store, *f, var) => b += coeff,
            [f] if is_var_squared(store, *f, var) => a += coeff,
            _ => return None,
        }
    }
    Some((a, b, c))
}

/// `(a, b, c)` of the equation brought to `... = 0` form, without building
/// any node: lhs coefficients minus rhs coefficients.
pub(crate) fn equation_coefficients(
    store: &Store,
    expr: ExprId,
    var: &Symbol,
) -> Option<(BigRational, BigRational, BigRational)> {
    let Expr::Relation(lhs, RelOp::Eq, rhs) = store.get(expr) else {
        return None;
    };
    let (la, lb, lc) = poly_coefficients(store, *lhs, var)?;
    let (ra, rb, rc) = poly_coefficients(store, *rhs, var)?;
    Some((la - ra, lb - rb, lc - rc))
}

pub(crate) fn is_linear_equation(store: &Store, ctx: &Context, expr: ExprId) -> bool {
    let Some(var) = ctx.solution_variable() else {
        return false;
    };
    matches!(equation_coefficients(store, expr, var), Some((a, _, _)) if a.is_zero())
}

pub(crate) fn is_quadratic_equation(store: &Store, ctx: &Context, expr: ExprId) -> bool {
    let Some(var) = ctx.solution_variable() else {
        return false;
    };
    matches!(equation_coefficients(store, expr, var), Some((a, _, _)) if !a.is_zero())
}
