//! Exact fraction arithmetic.
//!
//! All four rules fold through [`Store::rational`], so results come out in
//! canonical form directly: products are cross-reduced, sums land on the
//! lowest common denominator, and a denominator of one collapses to an
//! integer. Division by zero rewrites to `Undefined`, which then
//! propagates outward through any arithmetic node.

use stepmath_ast::{Expr, ExprId, MappingKind, Path, PathMapping, Store};
use stepmath_engine::{
    Binding, Context, Explanation, Pat, PatChild, PatternRule, Rewrite, Rule, RuleResult, Slot,
    Transformation,
};

const A: Slot = Slot(0);
const B: Slot = Slot(1);

fn is_numeric(store: &Store, id: ExprId) -> bool {
    store.as_rational(id).is_some()
}

fn is_fraction(store: &Store, id: ExprId) -> bool {
    matches!(store.get(id), Expr::Fraction(..))
}

fn some_fraction_bound(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    is_fraction(store, b.expr(A)) || is_fraction(store, b.expr(B))
}

fn fold_product(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let (x, y) = (b.expr(A), b.expr(B));
    let value = store.as_rational(x).zip(store.as_rational(y));
    let (rx, ry) = value.unwrap_or_else(|| unreachable!("operands matched as numeric"));
    let folded = store.rational(rx * ry);
    let result = b.substitute_matched(store, &Path::main(), &[folded]);
    Rewrite::new(result, Explanation::MultiplyFractions)
        .with_mappings(vec![PathMapping::new(
            MappingKind::Combine,
            b.matched_paths(),
            vec![Path::main()],
        )])
        .with_params(vec![x, y])
}

fn fold_sum(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let (x, y) = (b.expr(A), b.expr(B));
    let value = store.as_rational(x).zip(store.as_rational(y));
    let (rx, ry) = value.unwrap_or_else(|| unreachable!("operands matched as numeric"));
    let folded = store.rational(rx + ry);
    let result = b.substitute_matched(store, &Path::main(), &[folded]);
    Rewrite::new(result, Explanation::AddFractions)
        .with_mappings(vec![PathMapping::new(
            MappingKind::Combine,
            b.matched_paths(),
            vec![Path::main()],
        )])
        .with_params(vec![x, y])
}

/// `[a / b] * [c / d]` (or fraction times integer) folded and reduced in
/// one step.
pub fn multiply_fractions() -> PatternRule {
    PatternRule::new(
        "multiply_fractions",
        Pat::product_partial(vec![
            PatChild::required(Pat::cond(A, is_numeric)),
            PatChild::required(Pat::cond(B, is_numeric)),
        ]),
        fold_product,
    )
    .with_condition(some_fraction_bound)
}

/// Fraction addition over the common denominator, like or unlike; also
/// folds integer plus fraction.
pub fn add_fractions() -> PatternRule {
    PatternRule::new(
        "add_fractions",
        Pat::sum_partial(vec![
            PatChild::required(Pat::cond(A, is_numeric)),
            PatChild::required(Pat::cond(B, is_numeric)),
        ]),
        fold_sum,
    )
    .with_condition(some_fraction_bound)
}

fn reduce(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let value = store
        .as_rational(b.expr(A))
        .unwrap_or_else(|| unreachable!("fraction matched as numeric"));
    let result = store.rational(value);
    Rewrite::new(result, Explanation::SimplifyFraction)
}

/// `[n / d]` of integers brought to lowest terms, sign moved to the
/// numerator, denominator one collapsed away. Already-canonical fractions
/// are left alone.
pub fn simplify_fraction() -> PatternRule {
    PatternRule::new(
        "simplify_fraction",
        Pat::capture(
            A,
            Pat::fraction(Pat::any_integer(B), Pat::cond(Slot(2), is_nonzero_integer)),
        ),
        reduce,
    )
}

fn is_nonzero_integer(store: &Store, id: ExprId) -> bool {
    matches!(store.get(id), Expr::Integer(_)) && !store.is_zero_integer(id)
}

fn undefine(store: &mut Store, _ctx: &Context, _b: &Binding) -> Rewrite {
    let result = store.undefined();
    Rewrite::new(result, Explanation::PropagateUndefined)
}

/// A zero denominator has no value; the whole fraction becomes
/// `Undefined`.
pub fn divide_by_zero() -> PatternRule {
    PatternRule::new(
        "divide_by_zero",
        Pat::fraction(Pat::any(A), Pat::integer(0)),
        undefine,
    )
}

/// `Undefined` swallows any arithmetic node containing it. Statement
/// nodes (relations, solutions) are deliberately outside its reach; an
/// undefined equation side is handled by the solver instead.
pub struct PropagateUndefined;

impl Rule for PropagateUndefined {
    fn name(&self) -> &'static str {
        "propagate_undefined"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let node = store.get(expr);
        if !node.is_arithmetic() {
            return Ok(None);
        }
        let tainted = node
            .children()
            .into_iter()
            .any(|c| matches!(store.get(c), Expr::Undefined));
        if !tainted {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let to = store.undefined();
        Ok(Some(Transformation::rule(
            Explanation::PropagateUndefined,
            expr,
            to,
            vec![PathMapping::new(
                MappingKind::Transform,
                vec![Path::main()],
                vec![Path::main()],
            )],
            Vec::new(),
        )))
    }
}
