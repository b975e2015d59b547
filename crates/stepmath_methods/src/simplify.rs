//! The general simplification pipeline.

use crate::arithmetic;
use crate::collect;
use crate::fractions;
use stepmath_engine::{Deeply, Explanation, FirstOf, Plan, Traversal, WhileApplicable};
use std::rc::Rc;

/// The simplification rule set in application order. Undefined handling
/// first, then sign normalization, identity laws, numeric folding, and
/// finally collection and cosmetic ordering.
pub fn simplify_rules() -> Vec<Rc<dyn Plan>> {
    vec![
        Rc::new(fractions::PropagateUndefined),
        Rc::new(fractions::divide_by_zero()),
        Rc::new(arithmetic::simplify_double_negative()),
        Rc::new(arithmetic::neg_of_integer()),
        Rc::new(arithmetic::multiply_by_zero()),
        Rc::new(arithmetic::multiply_by_one()),
        Rc::new(arithmetic::add_zero()),
        Rc::new(arithmetic::power_one()),
        Rc::new(arithmetic::power_zero()),
        Rc::new(arithmetic::evaluate_integer_power()),
        Rc::new(arithmetic::evaluate_root()),
        Rc::new(fractions::multiply_fractions()),
        Rc::new(fractions::add_fractions()),
        Rc::new(fractions::simplify_fraction()),
        Rc::new(arithmetic::add_integers()),
        Rc::new(arithmetic::multiply_integers()),
        Rc::new(collect::combine_like_terms()),
        Rc::new(collect::ReorderTerms),
    ]
}

/// `"simplify"`: innermost-first rewriting to a fixed point. Idempotent by
/// construction, since a fixed point means no rule applies to any subtree
/// of the result.
pub fn simplify_plan() -> Rc<dyn Plan> {
    let rules = FirstOf::new("simplify_rules", simplify_rules());
    let deep = Deeply::new("simplify_deeply", Rc::new(rules), Traversal::PostOrder);
    Rc::new(WhileApplicable::new(
        "simplify",
        Explanation::SimplifyExpression,
        Rc::new(deep),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepmath_ast::Store;
    use stepmath_engine::Context;

    #[test]
    fn folds_a_fraction_expression_in_two_steps() {
        let mut store = Store::new();
        let one = store.int(1);
        let two = store.int(2);
        let three = store.int(3);
        let third = store.fraction(one, three);
        let two_thirds = store.fraction(two, three);
        let half = store.fraction(one, two);
        let product = store.product(vec![two_thirds, half]);
        let input = store.sum(vec![third, product]);
        let ctx = Context::new();

        let plan = simplify_plan();
        let t = plan.run(&mut store, &ctx, input).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "[2 / 3]");
        assert_eq!(
            t.rule_explanations(),
            vec![Explanation::MultiplyFractions, Explanation::AddFractions]
        );
        // Fixed point reached: simplifying the result is not applicable.
        assert!(plan.run(&mut store, &ctx, t.to).unwrap().is_none());
    }

    #[test]
    fn undefined_swallows_the_whole_expression() {
        let mut store = Store::new();
        let one = store.int(1);
        let zero = store.int(0);
        let bad = store.fraction(one, zero);
        let x = store.var("x");
        let input = store.sum(vec![x, bad]);
        let ctx = Context::new();

        let t = simplify_plan().run(&mut store, &ctx, input).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "Undefined");
    }

    #[test]
    fn normalizes_a_quadratic_left_side() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let x2 = store.power(x, two);
        let five = store.int(5);
        let one = store.int(1);
        let five_x = store.product(vec![five, x]);
        let input = store.sum(vec![x2, five, one, five_x]);
        let ctx = Context::new();

        let t = simplify_plan().run(&mut store, &ctx, input).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "[x ^ 2] + 5 x + 6");
        assert_eq!(
            t.rule_explanations(),
            vec![Explanation::AddIntegers, Explanation::ReorderTerms]
        );
    }
}
