//! Canonical string form of expressions, used for logging and tests.
//!
//! This is the render-agnostic solver notation (`[1 / 3]`, `[x ^ 2]`,
//! `SetSolution[x: {-3, -2}]`), distinct from any LaTeX/JSON rendering
//! owned by presentation layers.

use crate::expr::Expr;
use crate::store::{ExprId, Store};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Pow, Signed, Zero};
use std::fmt;

/// Borrowing display adapter: `format!("{}", DisplayExpr { store, id })`.
pub struct DisplayExpr<'a> {
    pub store: &'a Store,
    pub id: ExprId,
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_expr(self.store, self.id, f)
    }
}

impl Store {
    pub fn canonical(&self, id: ExprId) -> String {
        format!("{}", DisplayExpr { store: self, id })
    }
}

fn fmt_expr(store: &Store, id: ExprId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match store.get(id) {
        Expr::Integer(n) => write!(f, "{n}"),
        Expr::Decimal(r) => fmt_decimal(r, f),
        Expr::Variable(sym) => write!(f, "{sym}"),
        Expr::Sum(children) => {
            for (i, &child) in children.iter().enumerate() {
                if i == 0 {
                    fmt_child(store, child, f, matches!(store.get(child), Expr::Sum(_)))?;
                    continue;
                }
                match store.get(child) {
                    Expr::Neg(inner) => {
                        write!(f, " - ")?;
                        let inner = *inner;
                        fmt_child(store, inner, f, needs_parens_in_sum(store, inner))?;
                    }
                    Expr::Integer(n) if n.is_negative() => write!(f, " - {}", -n)?,
                    _ => {
                        write!(f, " + ")?;
                        fmt_child(store, child, f, matches!(store.get(child), Expr::Sum(_)))?;
                    }
                }
            }
            Ok(())
        }
        Expr::Product(children) => {
            for (i, &child) in children.iter().enumerate() {
                let parens = needs_parens_in_product(store, child);
                if i > 0 {
                    if parens || implicit_factor(store, child) {
                        write!(f, " ")?;
                    } else {
                        write!(f, " * ")?;
                    }
                }
                fmt_child(store, child, f, parens)?;
            }
            Ok(())
        }
        Expr::Fraction(num, den) => {
            write!(f, "[")?;
            fmt_expr(store, *num, f)?;
            write!(f, " / ")?;
            fmt_expr(store, *den, f)?;
            write!(f, "]")
        }
        Expr::Power(base, exp) => {
            write!(f, "[")?;
            fmt_expr(store, *base, f)?;
            write!(f, " ^ ")?;
            fmt_expr(store, *exp, f)?;
            write!(f, "]")
        }
        Expr::Root(radicand, degree) => {
            if matches!(store.get(*degree), Expr::Integer(n) if *n == BigInt::from(2)) {
                write!(f, "sqrt(")?;
                fmt_expr(store, *radicand, f)?;
                write!(f, ")")
            } else {
                write!(f, "root(")?;
                fmt_expr(store, *radicand, f)?;
                write!(f, ", ")?;
                fmt_expr(store, *degree, f)?;
                write!(f, ")")
            }
        }
        Expr::Abs(inner) => {
            write!(f, "abs(")?;
            fmt_expr(store, *inner, f)?;
            write!(f, ")")
        }
        Expr::Neg(inner) => {
            write!(f, "-")?;
            let inner = *inner;
            fmt_child(store, inner, f, needs_parens_in_sum(store, inner))
        }
        Expr::PlusMinus(inner) => {
            write!(f, "+/-")?;
            let inner = *inner;
            fmt_child(store, inner, f, needs_parens_in_sum(store, inner))
        }
        Expr::Function(name, args) => {
            write!(f, "{name}(")?;
            for (i, &arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_expr(store, arg, f)?;
            }
            write!(f, ")")
        }
        Expr::Relation(lhs, op, rhs) => {
            fmt_expr(store, *lhs, f)?;
            write!(f, " {op} ")?;
            fmt_expr(store, *rhs, f)
        }
        Expr::FiniteSet(elements) => {
            write!(f, "{{")?;
            for (i, &el) in elements.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_expr(store, el, f)?;
            }
            write!(f, "}}")
        }
        Expr::SetSolution(vars, set) => {
            write!(f, "SetSolution[")?;
            fmt_vars(vars, f)?;
            fmt_expr(store, *set, f)?;
            write!(f, "]")
        }
        Expr::Identity(vars, relation) => {
            write!(f, "Identity[")?;
            fmt_vars(vars, f)?;
            fmt_expr(store, *relation, f)?;
            write!(f, "]")
        }
        Expr::Contradiction(vars, relation) => {
            write!(f, "Contradiction[")?;
            fmt_vars(vars, f)?;
            fmt_expr(store, *relation, f)?;
            write!(f, "]")
        }
        Expr::Undefined => write!(f, "Undefined"),
    }
}

fn fmt_vars(vars: &[crate::symbol::Symbol], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, v) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    if !vars.is_empty() {
        write!(f, ": ")?;
    }
    Ok(())
}

fn fmt_child(store: &Store, id: ExprId, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "(")?;
        fmt_expr(store, id, f)?;
        write!(f, ")")
    } else {
        fmt_expr(store, id, f)
    }
}

fn needs_parens_in_sum(store: &Store, id: ExprId) -> bool {
    matches!(store.get(id), Expr::Sum(_) | Expr::Relation(..) | Expr::Neg(_))
}

fn needs_parens_in_product(store: &Store, id: ExprId) -> bool {
    matches!(
        store.get(id),
        Expr::Sum(_) | Expr::Relation(..) | Expr::Neg(_)
    )
}

/// Factors written by juxtaposition after a leading coefficient, e.g. `3 x`
/// or `5 [x ^ 2]`.
fn implicit_factor(store: &Store, id: ExprId) -> bool {
    matches!(
        store.get(id),
        Expr::Variable(_) | Expr::Power(..) | Expr::Abs(_) | Expr::Function(..) | Expr::Root(..)
    )
}

/// Exact decimal expansion when the denominator is 2^a * 5^b, otherwise the
/// bracketed fraction form.
fn fmt_decimal(value: &BigRational, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut den = value.denom().clone();
    let mut twos = 0u32;
    let mut fives = 0u32;
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    while (&den % &two).is_zero() {
        den /= &two;
        twos += 1;
    }
    while (&den % &five).is_zero() {
        den /= &five;
        fives += 1;
    }
    if !den.is_one() {
        return write!(f, "[{} / {}]", value.numer(), value.denom());
    }
    let scale = twos.max(fives);
    let mut scaled = value.numer() * BigInt::from(10).pow(scale);
    scaled /= value.denom();
    let negative = scaled.is_negative();
    let digits = scaled.magnitude().to_string();
    let digits = if digits.len() <= scale as usize {
        format!("{}{}", "0".repeat(scale as usize + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = digits.split_at(digits.len() - scale as usize);
    if negative {
        write!(f, "-")?;
    }
    if frac_part.is_empty() {
        write!(f, "{int_part}")
    } else {
        write!(f, "{int_part}.{frac_part}")
    }
}
