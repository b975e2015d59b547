//! Collecting and ordering terms.

use crate::terms::{monomial_degree, split_term};
use num_traits::{One, Zero};
use stepmath_ast::{Expr, ExprId, MappingKind, Path, PathMapping, Store};
use stepmath_engine::{
    Binding, Context, Explanation, Pat, PatChild, PatternRule, Rewrite, Rule, RuleResult, Slot,
    Transformation,
};

const A: Slot = Slot(0);
const B: Slot = Slot(1);
const R: Slot = Slot(2);

fn like_terms(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    let (Some((_, fa)), Some((_, fb))) = (
        split_term(store, b.expr(A)),
        split_term(store, b.expr(B)),
    ) else {
        return false;
    };
    !fa.is_empty() && fa == fb
}

fn combine(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let (x, y) = (b.expr(A), b.expr(B));
    let ((ca, factors), (cb, _)) = split_term(store, x)
        .zip(split_term(store, y))
        .unwrap_or_else(|| unreachable!("terms vetted by the condition"));
    let coeff = ca + cb;
    let replacement = if coeff.is_zero() {
        Vec::new()
    } else if coeff.is_one() {
        vec![store.product(factors)]
    } else if (-coeff.clone()).is_one() {
        let inner = store.product(factors);
        vec![store.neg(inner)]
    } else {
        let mut parts = vec![store.rational(coeff)];
        parts.extend(factors);
        vec![store.product(parts)]
    };
    let result = b.substitute_matched(store, &Path::main(), &replacement);
    Rewrite::new(result, Explanation::CombineLikeTerms)
        .with_mappings(vec![PathMapping::new(
            MappingKind::Combine,
            b.matched_paths(),
            vec![Path::main()],
        )])
        .with_params(vec![x, y])
}

/// `a x + b x` collected to `(a + b) x`; a zero result drops the terms
/// entirely.
pub fn combine_like_terms() -> PatternRule {
    PatternRule::new(
        "combine_like_terms",
        Pat::sum_partial(vec![
            PatChild::required(Pat::any(A)),
            PatChild::required(Pat::any(B)),
        ]),
        combine,
    )
    .with_condition(like_terms)
}

/// Sums presented in descending monomial degree, constants last. Purely
/// cosmetic but part of the canonical answer shape, so it is an ordinary
/// recorded step.
pub struct ReorderTerms;

impl Rule for ReorderTerms {
    fn name(&self) -> &'static str {
        "reorder_terms"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Sum(children) = store.get(expr) else {
            return Ok(None);
        };
        let children = children.clone();
        let mut ordered = children.clone();
        ordered.sort_by_key(|&c| std::cmp::Reverse(monomial_degree(store, c)));
        if ordered == children {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let to = store.sum(ordered.clone());
        let mappings = children
            .iter()
            .enumerate()
            .map(|(from_idx, term)| {
                let to_idx = ordered.iter().position(|t| t == term).unwrap_or(from_idx);
                PathMapping::new(
                    MappingKind::Move,
                    vec![Path::main().child(from_idx as u32)],
                    vec![Path::main().child(to_idx as u32)],
                )
            })
            .collect();
        Ok(Some(Transformation::rule(
            Explanation::ReorderTerms,
            expr,
            to,
            mappings,
            Vec::new(),
        )))
    }
}

fn cancel(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let term = b.expr(A);
    let op = match store.get(b.expr(R)) {
        Expr::Relation(_, op, _) => *op,
        _ => unreachable!("whole match is a relation"),
    };
    let lhs = b.substitute_matched(store, &Path::main().child(0), &[]);
    let rhs = b.substitute_matched(store, &Path::main().child(1), &[]);
    let result = store.relation(lhs, op, rhs);
    Rewrite::new(result, Explanation::CancelCommonTerms)
        .with_mappings(vec![PathMapping::new(
            MappingKind::Cancel,
            b.matched_paths(),
            Vec::new(),
        )])
        .with_params(vec![term])
}

fn cancellable(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    !store.is_zero_integer(b.expr(A))
}

/// The same term on both sides of a relation disappears from both. The
/// shared slot forces structural equality of the two occurrences.
pub fn cancel_common_terms() -> PatternRule {
    PatternRule::new(
        "cancel_common_terms",
        Pat::capture(
            R,
            Pat::relation(
                Pat::sum_partial(vec![PatChild::required(Pat::any(A))]),
                None,
                Pat::sum_partial(vec![PatChild::required(Pat::any(A))]),
            ),
        ),
        cancel,
    )
    .with_condition(cancellable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_coefficients() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let three = store.int(3);
        let two_x = store.product(vec![two, x]);
        let three_x = store.product(vec![three, x]);
        let y = store.var("y");
        let sum = store.sum(vec![two_x, y, three_x]);
        let ctx = Context::new();

        let t = combine_like_terms().apply(&mut store, &ctx, sum).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "5 x + y");
    }

    #[test]
    fn bare_variables_count_as_coefficient_one() {
        let mut store = Store::new();
        let x = store.var("x");
        let sum = store.sum(vec![x, x]);
        let ctx = Context::new();

        let t = combine_like_terms().apply(&mut store, &ctx, sum).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "2 x");
    }

    #[test]
    fn opposite_terms_cancel_to_zero() {
        let mut store = Store::new();
        let x = store.var("x");
        let neg_x = store.neg(x);
        let sum = store.sum(vec![x, neg_x]);
        let ctx = Context::new();

        let t = combine_like_terms().apply(&mut store, &ctx, sum).unwrap().unwrap();
        assert!(store.is_zero_integer(t.to));
    }

    #[test]
    fn unlike_terms_are_left_alone() {
        let mut store = Store::new();
        let x = store.var("x");
        let y = store.var("y");
        let sum = store.sum(vec![x, y]);
        let ctx = Context::new();

        assert!(combine_like_terms().apply(&mut store, &ctx, sum).unwrap().is_none());
    }

    #[test]
    fn reorders_by_descending_degree() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let x2 = store.power(x, two);
        let six = store.int(6);
        let five = store.int(5);
        let five_x = store.product(vec![five, x]);
        let sum = store.sum(vec![x2, six, five_x]);
        let ctx = Context::new();

        let t = ReorderTerms.apply(&mut store, &ctx, sum).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "[x ^ 2] + 5 x + 6");
        // Already ordered input is not applicable.
        assert!(ReorderTerms.apply(&mut store, &ctx, t.to).unwrap().is_none());
    }

    #[test]
    fn cancels_the_shared_term_on_both_sides() {
        let mut store = Store::new();
        let six = store.int(6);
        let x = store.var("x");
        let six_x = store.product(vec![six, x]);
        let minus_five = store.int(-5);
        let lhs = store.sum(vec![six_x, six]);
        let rhs = store.sum(vec![six_x, minus_five]);
        let eq = store.equation(lhs, rhs);
        let ctx = Context::new();

        let t = cancel_common_terms().apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "6 = -5");
    }

    #[test]
    fn different_sides_do_not_cancel() {
        let mut store = Store::new();
        let x = store.var("x");
        let y = store.var("y");
        let one = store.int(1);
        let lhs = store.sum(vec![x, one]);
        let rhs = store.sum(vec![y, one]);
        // Cancelling the 1 is fine; cancelling x against y is not.
        let eq = store.equation(lhs, rhs);
        let ctx = Context::new();

        let t = cancel_common_terms().apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "x = y");
    }
}
