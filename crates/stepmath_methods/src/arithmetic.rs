//! Integer arithmetic, identity laws and sign normalization.

use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive};
use stepmath_ast::{Expr, ExprId, MappingKind, Path, PathMapping, Store};
use stepmath_engine::{
    Binding, Context, Explanation, Pat, PatChild, PatternRule, Rewrite, Slot,
};

const A: Slot = Slot(0);
const B: Slot = Slot(1);

/// Exponents above this are left symbolic; folding them would explode the
/// tree instead of simplifying it.
const MAX_FOLDED_EXPONENT: u32 = 64;

fn integer_of(store: &Store, id: ExprId) -> BigInt {
    match store.get(id) {
        Expr::Integer(n) => n.clone(),
        _ => unreachable!("operand matched as an integer"),
    }
}

fn combine_mapping(b: &Binding) -> Vec<PathMapping> {
    vec![PathMapping::new(
        MappingKind::Combine,
        b.matched_paths(),
        vec![Path::main()],
    )]
}

fn fold_sum(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let folded = integer_of(store, b.expr(A)) + integer_of(store, b.expr(B));
    let folded = store.integer(folded);
    let result = b.substitute_matched(store, &Path::main(), &[folded]);
    Rewrite::new(result, Explanation::AddIntegers).with_mappings(combine_mapping(b))
}

pub fn add_integers() -> PatternRule {
    PatternRule::new(
        "add_integers",
        Pat::sum_partial(vec![
            PatChild::required(Pat::any_integer(A)),
            PatChild::required(Pat::any_integer(B)),
        ]),
        fold_sum,
    )
}

fn fold_product(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let folded = integer_of(store, b.expr(A)) * integer_of(store, b.expr(B));
    let folded = store.integer(folded);
    let result = b.substitute_matched(store, &Path::main(), &[folded]);
    Rewrite::new(result, Explanation::MultiplyIntegers).with_mappings(combine_mapping(b))
}

pub fn multiply_integers() -> PatternRule {
    PatternRule::new(
        "multiply_integers",
        Pat::product_partial(vec![
            PatChild::required(Pat::any_integer(A)),
            PatChild::required(Pat::any_integer(B)),
        ]),
        fold_product,
    )
}

fn drop_matched(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let result = b.substitute_matched(store, &Path::main(), &[]);
    Rewrite::new(result, Explanation::AddZero).with_mappings(vec![PathMapping::new(
        MappingKind::Cancel,
        b.matched_paths(),
        Vec::new(),
    )])
}

/// `x + 0` loses the zero.
pub fn add_zero() -> PatternRule {
    PatternRule::new(
        "add_zero",
        Pat::sum_partial(vec![PatChild::required(Pat::capture(A, Pat::integer(0)))]),
        drop_matched,
    )
}

fn drop_matched_factor(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let result = b.substitute_matched(store, &Path::main(), &[]);
    Rewrite::new(result, Explanation::MultiplyByOne).with_mappings(vec![PathMapping::new(
        MappingKind::Cancel,
        b.matched_paths(),
        Vec::new(),
    )])
}

/// `x * 1` loses the one.
pub fn multiply_by_one() -> PatternRule {
    PatternRule::new(
        "multiply_by_one",
        Pat::product_partial(vec![PatChild::required(Pat::capture(A, Pat::integer(1)))]),
        drop_matched_factor,
    )
}

fn annihilate(store: &mut Store, _ctx: &Context, _b: &Binding) -> Rewrite {
    let result = store.int(0);
    Rewrite::new(result, Explanation::MultiplyByZero)
}

/// A zero factor collapses the whole product.
pub fn multiply_by_zero() -> PatternRule {
    PatternRule::new(
        "multiply_by_zero",
        Pat::product_partial(vec![PatChild::required(Pat::integer(0))]),
        annihilate,
    )
    .with_condition(no_undefined_factor)
}

fn no_undefined_factor(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    // 0 * Undefined must stay for the propagation rule.
    b.nary_rest(store, &Path::main())
        .into_iter()
        .all(|f| !matches!(store.get(f), Expr::Undefined))
}

fn unwrap_base(_store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    Rewrite::new(b.expr(A), Explanation::PowerOne).with_mappings(vec![PathMapping::new(
        MappingKind::Move,
        vec![Path::main().child(0)],
        vec![Path::main()],
    )])
}

/// `[x ^ 1]` is `x`.
pub fn power_one() -> PatternRule {
    PatternRule::new(
        "power_one",
        Pat::power(Pat::any(A), Pat::integer(1)),
        unwrap_base,
    )
}

fn to_one(store: &mut Store, _ctx: &Context, _b: &Binding) -> Rewrite {
    let result = store.int(1);
    Rewrite::new(result, Explanation::PowerZero)
}

fn nonzero_base(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    !store.is_zero_integer(b.expr(A))
}

/// `[x ^ 0]` is `1` (with `0 ^ 0` left untouched).
pub fn power_zero() -> PatternRule {
    PatternRule::new(
        "power_zero",
        Pat::power(Pat::any(A), Pat::integer(0)),
        to_one,
    )
    .with_condition(nonzero_base)
}

fn fold_power(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let base = integer_of(store, b.expr(A));
    let exp = integer_of(store, b.expr(B))
        .to_u32()
        .unwrap_or_else(|| unreachable!("exponent range checked by the condition"));
    let result = store.integer(base.pow(exp));
    Rewrite::new(result, Explanation::EvaluateIntegerPower)
        .with_params(vec![b.expr(A), b.expr(B)])
}

fn small_positive_exponent(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    match store.get(b.expr(B)) {
        Expr::Integer(n) => {
            n.is_positive() && n.to_u32().is_some_and(|e| e <= MAX_FOLDED_EXPONENT)
        }
        _ => false,
    }
}

/// `[2 ^ 10]` folded to `1024`, for exponents small enough to be worth
/// folding.
pub fn evaluate_integer_power() -> PatternRule {
    PatternRule::new(
        "evaluate_integer_power",
        Pat::power(Pat::any_integer(A), Pat::any_integer(B)),
        fold_power,
    )
    .with_condition(small_positive_exponent)
}

fn fold_root(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let radicand = integer_of(store, b.expr(A));
    let degree = integer_of(store, b.expr(B))
        .to_u32()
        .unwrap_or_else(|| unreachable!("degree range checked by the condition"));
    let result = store.integer(radicand.nth_root(degree));
    Rewrite::new(result, Explanation::EvaluateRoot).with_params(vec![b.expr(A), b.expr(B)])
}

fn exact_root(store: &Store, _ctx: &Context, b: &Binding) -> bool {
    let (Expr::Integer(radicand), Expr::Integer(degree)) =
        (store.get(b.expr(A)), store.get(b.expr(B)))
    else {
        return false;
    };
    if radicand.is_negative() {
        return false;
    }
    let Some(degree) = degree.to_u32().filter(|&d| (2..=MAX_FOLDED_EXPONENT).contains(&d))
    else {
        return false;
    };
    let root = radicand.nth_root(degree);
    root.pow(degree) == *radicand
}

/// `sqrt(25)` folded to `5`; only exact integer roots fold.
pub fn evaluate_root() -> PatternRule {
    PatternRule::new(
        "evaluate_root",
        Pat::root(Pat::any_integer(A), Pat::any_integer(B)),
        fold_root,
    )
    .with_condition(exact_root)
}

fn negate(store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    let value = -integer_of(store, b.expr(A));
    let result = store.integer(value);
    Rewrite::new(result, Explanation::NegateInteger)
}

/// `-(n)` folded into the literal.
pub fn neg_of_integer() -> PatternRule {
    PatternRule::new(
        "neg_of_integer",
        Pat::neg(Pat::any_integer(A)),
        negate,
    )
}

fn unwrap_twice(_store: &mut Store, _ctx: &Context, b: &Binding) -> Rewrite {
    Rewrite::new(b.expr(A), Explanation::SimplifyDoubleNegative).with_mappings(vec![
        PathMapping::new(
            MappingKind::Move,
            vec![Path::main().child(0).child(0)],
            vec![Path::main()],
        ),
    ])
}

pub fn simplify_double_negative() -> PatternRule {
    PatternRule::new(
        "simplify_double_negative",
        Pat::neg(Pat::neg(Pat::any(A))),
        unwrap_twice,
    )
}
