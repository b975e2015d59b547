//! Structural pattern matching.
//!
//! `find_matches` produces a lazy, restartable, finite sequence of
//! bindings. Laziness matters: commutative matching is combinatorial and
//! callers almost always want only the first acceptable match. The
//! implementation composes explicit iterator adapters (no coroutines);
//! enumeration order follows the expression's child order, so matching is
//! deterministic and rule behavior reproducible.

use crate::context::Context;
use crate::pattern::{Pat, PatChild, Slot};
use num_bigint::BigInt;
use rustc_hash::{FxHashMap, FxHashSet};
use stepmath_ast::{Expr, ExprId, Path, Store};
use std::rc::Rc;

/// Commutative nodes wider than this never match; the bitmask that drives
/// backtracking is a `u64`.
const MAX_NARY_OPERANDS: usize = 64;

#[derive(Debug, Clone, Copy)]
struct NaryMatch {
    expr: ExprId,
    used: u64,
}

/// Assignment of pattern slots to matched subtrees, plus the bookkeeping
/// needed to rebuild partially-matched n-ary nodes. Produced transiently
/// during matching and consumed by a rule's condition and builder.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    slots: FxHashMap<Slot, (ExprId, Path)>,
    nary: FxHashMap<Path, NaryMatch>,
    negated: FxHashSet<Slot>,
}

impl Binding {
    /// Bind a slot, or fail if it is already bound to a structurally
    /// different expression (ids are structural thanks to hash-consing).
    fn bind(mut self, slot: Slot, expr: ExprId, path: Path) -> Option<Binding> {
        match self.slots.get(&slot) {
            Some((bound, _)) if *bound != expr => None,
            Some(_) => Some(self),
            None => {
                self.slots.insert(slot, (expr, path));
                Some(self)
            }
        }
    }

    fn mark_negated(&mut self, slot: Slot) {
        self.negated.insert(slot);
    }

    fn record_nary(&mut self, path: Path, expr: ExprId, used: u64) {
        self.nary.insert(path, NaryMatch { expr, used });
    }

    pub fn get(&self, slot: Slot) -> Option<ExprId> {
        self.slots.get(&slot).map(|(id, _)| *id)
    }

    /// The expression bound to `slot`. Panics if the slot is unbound:
    /// builders only run on bindings produced by their own rule's pattern,
    /// so an unbound slot is a programming error, not a runtime condition.
    pub fn expr(&self, slot: Slot) -> ExprId {
        self.slots
            .get(&slot)
            .map(|(id, _)| *id)
            .unwrap_or_else(|| panic!("slot {slot:?} not bound by the rule's pattern"))
    }

    pub fn path(&self, slot: Slot) -> Option<&Path> {
        self.slots.get(&slot).map(|(_, p)| p)
    }

    pub fn is_negated(&self, slot: Slot) -> bool {
        self.negated.contains(&slot)
    }

    /// Paths of all bound slots, in slot order; the default "matched
    /// region" used for provenance when a builder has nothing finer to say.
    pub fn matched_paths(&self) -> Vec<Path> {
        let mut entries: Vec<_> = self.slots.iter().collect();
        entries.sort_by_key(|(slot, _)| **slot);
        entries.into_iter().map(|(_, (_, p))| p.clone()).collect()
    }

    /// Operands of the n-ary node matched at `at` that no pattern child
    /// consumed, in operand order.
    pub fn nary_rest(&self, store: &Store, at: &Path) -> Vec<ExprId> {
        let m = self.nary_match(at);
        store
            .children(m.expr)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| m.used & (1u64 << i) == 0)
            .map(|(_, op)| op)
            .collect()
    }

    /// Indices of the operands the pattern children consumed.
    pub fn nary_matched_indices(&self, at: &Path) -> Vec<usize> {
        let m = self.nary_match(at);
        (0..64).filter(|i| m.used & (1u64 << i) != 0).collect()
    }

    /// Rebuild the n-ary node matched at `at`: the first matched operands
    /// are replaced by `new_vals` in operand order, surplus matched
    /// operands disappear, unmatched operands stay. Degenerate arities
    /// collapse through the store factories (empty sum is 0, empty
    /// product is 1).
    pub fn substitute_matched(
        &self,
        store: &mut Store,
        at: &Path,
        new_vals: &[ExprId],
    ) -> ExprId {
        let m = *self.nary_match(at);
        let node = store.get(m.expr).clone();
        let ops = node.children();
        let mut rebuilt = Vec::with_capacity(ops.len());
        let mut next_val = 0usize;
        for (i, op) in ops.iter().enumerate() {
            if m.used & (1u64 << i) != 0 {
                if next_val < new_vals.len() {
                    rebuilt.push(new_vals[next_val]);
                    next_val += 1;
                }
            } else {
                rebuilt.push(*op);
            }
        }
        match node {
            Expr::Sum(_) => store.sum(rebuilt),
            Expr::Product(_) => store.product(rebuilt),
            _ => panic!("no n-ary node was matched at {at}"),
        }
    }

    fn nary_match(&self, at: &Path) -> &NaryMatch {
        self.nary
            .get(at)
            .unwrap_or_else(|| panic!("no n-ary match recorded at {at}"))
    }
}

type BindingIter<'a> = Box<dyn Iterator<Item = Binding> + 'a>;

fn none<'a>() -> BindingIter<'a> {
    Box::new(std::iter::empty())
}

fn one<'a>(binding: Binding) -> BindingIter<'a> {
    Box::new(std::iter::once(binding))
}

/// All matches of `pat` against `expr` (anchored at its root), lazily.
/// No match yields an empty sequence, never an error.
pub fn find_matches<'a>(
    store: &'a Store,
    ctx: &'a Context,
    pat: &'a Pat,
    expr: ExprId,
) -> BindingIter<'a> {
    match_at(store, ctx, pat, expr, Path::main(), Binding::default())
}

fn match_at<'a>(
    store: &'a Store,
    ctx: &'a Context,
    pat: &'a Pat,
    expr: ExprId,
    path: Path,
    binding: Binding,
) -> BindingIter<'a> {
    match pat {
        Pat::Any(slot) => match binding.bind(*slot, expr, path) {
            Some(b) => one(b),
            None => none(),
        },
        Pat::Cond(slot, pred) => {
            if pred(store, expr) {
                match binding.bind(*slot, expr, path) {
                    Some(b) => one(b),
                    None => none(),
                }
            } else {
                none()
            }
        }
        Pat::IntegerValue(value) => match store.get(expr) {
            Expr::Integer(n) if *n == BigInt::from(*value) => one(binding),
            _ => none(),
        },
        Pat::AnyInteger(slot) => match store.get(expr) {
            Expr::Integer(_) => match binding.bind(*slot, expr, path) {
                Some(b) => one(b),
                None => none(),
            },
            _ => none(),
        },
        Pat::AnyVariable(slot) => match store.get(expr) {
            Expr::Variable(_) => match binding.bind(*slot, expr, path) {
                Some(b) => one(b),
                None => none(),
            },
            _ => none(),
        },
        Pat::SolutionVariable => match (store.get(expr), ctx.solution_variable()) {
            (Expr::Variable(sym), Some(var)) if sym == var => one(binding),
            _ => none(),
        },
        Pat::OptNeg(slot, inner) => {
            let slot = *slot;
            match store.get(expr) {
                Expr::Neg(u) => {
                    let u = *u;
                    let inner_path = path.child(0);
                    let outer_path = path;
                    Box::new(
                        match_at(store, ctx, inner, u, inner_path, binding).filter_map(
                            move |b| {
                                b.bind(slot, expr, outer_path.clone()).map(|mut b2| {
                                    b2.mark_negated(slot);
                                    b2
                                })
                            },
                        ),
                    )
                }
                _ => {
                    let outer_path = path.clone();
                    Box::new(
                        match_at(store, ctx, inner, expr, path, binding)
                            .filter_map(move |b| b.bind(slot, expr, outer_path.clone())),
                    )
                }
            }
        }
        Pat::Sum { children, partial } => match store.get(expr) {
            Expr::Sum(ops) => nary_arm(store, ctx, children, *partial, ops.clone(), expr, path, binding),
            _ => none(),
        },
        Pat::Product { children, partial } => match store.get(expr) {
            Expr::Product(ops) => {
                nary_arm(store, ctx, children, *partial, ops.clone(), expr, path, binding)
            }
            _ => none(),
        },
        Pat::Fraction(num, den) => match store.get(expr) {
            Expr::Fraction(n, d) => binary_arm(store, ctx, num, *n, den, *d, path, binding),
            _ => none(),
        },
        Pat::Power(base, exp) => match store.get(expr) {
            Expr::Power(b, e) => binary_arm(store, ctx, base, *b, exp, *e, path, binding),
            _ => none(),
        },
        Pat::Root(radicand, degree) => match store.get(expr) {
            Expr::Root(r, d) => binary_arm(store, ctx, radicand, *r, degree, *d, path, binding),
            _ => none(),
        },
        Pat::Neg(inner) => match store.get(expr) {
            Expr::Neg(u) => match_at(store, ctx, inner, *u, path.child(0), binding),
            _ => none(),
        },
        Pat::PlusMinus(inner) => match store.get(expr) {
            Expr::PlusMinus(u) => match_at(store, ctx, inner, *u, path.child(0), binding),
            _ => none(),
        },
        Pat::Relation { lhs, op, rhs } => match store.get(expr) {
            Expr::Relation(l, actual, r) if (*op).map_or(true, |want| want == *actual) => {
                binary_arm(store, ctx, lhs, *l, rhs, *r, path, binding)
            }
            _ => none(),
        },
        Pat::Capture(slot, inner) => match binding.bind(*slot, expr, path.clone()) {
            Some(b) => match_at(store, ctx, inner, expr, path, b),
            None => none(),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn binary_arm<'a>(
    store: &'a Store,
    ctx: &'a Context,
    first_pat: &'a Pat,
    first: ExprId,
    second_pat: &'a Pat,
    second: ExprId,
    path: Path,
    binding: Binding,
) -> BindingIter<'a> {
    let second_path = path.child(1);
    Box::new(
        match_at(store, ctx, first_pat, first, path.child(0), binding).flat_map(move |b| {
            match_at(store, ctx, second_pat, second, second_path.clone(), b)
        }),
    )
}

#[allow(clippy::too_many_arguments)]
fn nary_arm<'a>(
    store: &'a Store,
    ctx: &'a Context,
    pats: &'a [PatChild],
    partial: bool,
    ops: Vec<ExprId>,
    expr: ExprId,
    path: Path,
    binding: Binding,
) -> BindingIter<'a> {
    if ops.len() > MAX_NARY_OPERANDS {
        return none();
    }
    let required = pats.iter().filter(|c| !c.optional).count();
    if ops.len() < required || (!partial && ops.len() > pats.len()) {
        return none();
    }
    let count = ops.len();
    let node_path = path.clone();
    let ops = Rc::new(ops);
    Box::new(
        match_nary(store, ctx, pats, ops, 0, 0, node_path, binding).filter_map(move |(mut b, used)| {
            if !partial && (used.count_ones() as usize) != count {
                return None;
            }
            b.record_nary(path.clone(), expr, used);
            Some(b)
        }),
    )
}

/// Backtracking enumeration of assignments of pattern children to unused
/// operands. Operand candidates are tried in ascending index order; an
/// optional pattern child yields its bound matches before its skipped
/// continuation.
#[allow(clippy::too_many_arguments)]
fn match_nary<'a>(
    store: &'a Store,
    ctx: &'a Context,
    pats: &'a [PatChild],
    ops: Rc<Vec<ExprId>>,
    pat_idx: usize,
    used: u64,
    node_path: Path,
    binding: Binding,
) -> Box<dyn Iterator<Item = (Binding, u64)> + 'a> {
    if pat_idx == pats.len() {
        return Box::new(std::iter::once((binding, used)));
    }
    let child = &pats[pat_idx];
    let count = ops.len();

    let attempts: Box<dyn Iterator<Item = (Binding, u64)> + 'a> = {
        let ops = Rc::clone(&ops);
        let node_path = node_path.clone();
        let binding = binding.clone();
        Box::new(
            (0..count)
                .filter(move |i| used & (1u64 << i) == 0)
                .flat_map(move |i| {
                    let op = ops[i];
                    let child_path = node_path.child(i as u32);
                    let continuation_ops = Rc::clone(&ops);
                    let continuation_path = node_path.clone();
                    match_at(store, ctx, &child.pat, op, child_path, binding.clone()).flat_map(
                        move |b| {
                            match_nary(
                                store,
                                ctx,
                                pats,
                                Rc::clone(&continuation_ops),
                                pat_idx + 1,
                                used | (1u64 << i),
                                continuation_path.clone(),
                                b,
                            )
                        },
                    )
                }),
        )
    };

    if child.optional {
        let skipped = match_nary(store, ctx, pats, ops, pat_idx + 1, used, node_path, binding);
        Box::new(attempts.chain(skipped))
    } else {
        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pat;
    use proptest::prelude::*;

    const A: Slot = Slot(0);
    const B: Slot = Slot(1);

    fn is_fraction(store: &Store, id: ExprId) -> bool {
        matches!(store.get(id), Expr::Fraction(..))
    }

    #[test]
    fn commutative_matching_ignores_operand_order() {
        let mut store = Store::new();
        let x = store.var("x");
        let one = store.int(1);
        let two = store.int(2);
        let half = store.fraction(one, two);
        let sum = store.sum(vec![x, half]);
        let ctx = Context::new();

        // The fraction pattern child is listed first, but the fraction is
        // the second operand.
        let pat = Pat::sum(vec![
            PatChild::required(Pat::cond(A, is_fraction)),
            PatChild::required(Pat::any(B)),
        ]);
        let binding = find_matches(&store, &ctx, &pat, sum).next().unwrap();
        assert_eq!(binding.expr(A), half);
        assert_eq!(binding.expr(B), x);
        assert_eq!(binding.path(A).unwrap().to_string(), "./1");
    }

    #[test]
    fn partial_match_exposes_the_rest() {
        let mut store = Store::new();
        let x = store.var("x");
        let y = store.var("y");
        let three = store.int(3);
        let seven = store.int(7);
        let sum = store.sum(vec![x, three, y, seven]);
        let ctx = Context::new();

        let pat = Pat::sum_partial(vec![
            PatChild::required(Pat::any_integer(A)),
            PatChild::required(Pat::any_integer(B)),
        ]);
        let binding = find_matches(&store, &ctx, &pat, sum).next().unwrap();
        assert_eq!(binding.expr(A), three);
        assert_eq!(binding.expr(B), seven);
        let rest = binding.nary_rest(&store, &Path::main());
        assert_eq!(rest, vec![x, y]);
        assert_eq!(binding.nary_matched_indices(&Path::main()), vec![1, 3]);

        let ten = store.int(10);
        let rebuilt = binding.substitute_matched(&mut store, &Path::main(), &[ten]);
        assert_eq!(store.canonical(rebuilt), "x + 10 + y");
    }

    #[test]
    fn enumeration_order_is_deterministic_and_restartable() {
        let mut store = Store::new();
        let ints: Vec<_> = [2, 4, 6].iter().map(|&n| store.int(n)).collect();
        let sum = store.sum(ints);
        let ctx = Context::new();
        let pat = Pat::sum_partial(vec![PatChild::required(Pat::any_integer(A))]);

        let first_run: Vec<_> = find_matches(&store, &ctx, &pat, sum)
            .map(|b| b.expr(A))
            .collect();
        let second_run: Vec<_> = find_matches(&store, &ctx, &pat, sum)
            .map(|b| b.expr(A))
            .collect();
        assert_eq!(first_run, second_run);
        assert_eq!(first_run.len(), 3);
        // Child order of the expression drives enumeration order.
        assert_eq!(
            first_run
                .iter()
                .map(|&id| store.canonical(id))
                .collect::<Vec<_>>(),
            vec!["2", "4", "6"]
        );
    }

    #[test]
    fn slot_rebinding_requires_structural_equality() {
        let mut store = Store::new();
        let six = store.int(6);
        let x = store.var("x");
        let six_x = store.product(vec![six, x]);
        let lhs = store.sum(vec![six_x, six]);
        let m5 = store.int(-5);
        let rhs = store.sum(vec![six_x, m5]);
        let eq = store.equation(lhs, rhs);
        let ctx = Context::new();

        // The same slot on both sides of the relation: only a term present
        // on both sides can match.
        let pat = Pat::equation(
            Pat::sum_partial(vec![PatChild::required(Pat::any(A))]),
            Pat::sum_partial(vec![PatChild::required(Pat::any(A))]),
        );
        let binding = find_matches(&store, &ctx, &pat, eq).next().unwrap();
        assert_eq!(binding.expr(A), six_x);
    }

    #[test]
    fn optional_child_is_tried_bound_first() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let sum = store.sum(vec![x, two]);
        let ctx = Context::new();

        let pat = Pat::sum_partial(vec![
            PatChild::required(Pat::any_variable(A)),
            PatChild::optional(Pat::any_integer(B)),
        ]);
        let bindings: Vec<_> = find_matches(&store, &ctx, &pat, sum).collect();
        // First the binding with the optional child bound, then without.
        assert_eq!(bindings[0].get(B), Some(two));
        assert_eq!(bindings[1].get(B), None);
    }

    #[test]
    fn opt_neg_records_the_sign() {
        let mut store = Store::new();
        let x = store.var("x");
        let neg_x = store.neg(x);
        let ctx = Context::new();

        let pat = Pat::opt_neg(A, Pat::any_variable(B));
        let binding = find_matches(&store, &ctx, &pat, neg_x).next().unwrap();
        assert!(binding.is_negated(A));
        assert_eq!(binding.expr(A), neg_x);
        assert_eq!(binding.expr(B), x);

        let binding = find_matches(&store, &ctx, &pat, x).next().unwrap();
        assert!(!binding.is_negated(A));
        assert_eq!(binding.expr(A), x);
    }

    #[test]
    fn no_match_is_an_empty_sequence() {
        let mut store = Store::new();
        let x = store.var("x");
        let ctx = Context::new();
        let pat = Pat::sum(vec![PatChild::required(Pat::any(A))]);
        assert!(find_matches(&store, &ctx, &pat, x).next().is_none());
    }

    proptest! {
        #[test]
        fn integer_operand_is_found_at_any_position(pos in 0usize..=4, value in 1i64..1000) {
            let mut store = Store::new();
            let mut operands: Vec<ExprId> = ["a", "b", "c", "d"]
                .iter()
                .map(|name| store.var(name))
                .collect();
            let needle = store.int(value);
            operands.insert(pos, needle);
            let sum = store.sum(operands);
            let ctx = Context::new();

            let pat = Pat::sum_partial(vec![PatChild::required(Pat::any_integer(A))]);
            let binding = find_matches(&store, &ctx, &pat, sum).next().unwrap();
            prop_assert_eq!(binding.expr(A), needle);
            prop_assert_eq!(binding.path(A).unwrap().to_string(), format!("./{pos}"));
        }
    }
}
