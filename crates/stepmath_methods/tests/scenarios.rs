//! End-to-end derivations through the public registry entry point.

use stepmath_ast::{resolve, ExprId, MappingKind, Store, Symbol};
use stepmath_engine::{
    solve, Context, EngineError, Explanation, Setting, SettingValue, StrategyCategory,
    Transformation, TransformationKind,
};
use stepmath_methods::default_registry;

fn ctx_for_x() -> Context {
    Context::new().with_solution_variable(Symbol::new("x"))
}

fn find_task_set(t: &Transformation) -> Option<&Transformation> {
    if t.kind == TransformationKind::TaskSet {
        return Some(t);
    }
    t.steps.iter().find_map(find_task_set)
}

/// `[x ^ 2] + 5 + 1 + 5 x = 0`
fn messy_quadratic(store: &mut Store) -> ExprId {
    let x = store.var("x");
    let two = store.int(2);
    let x2 = store.power(x, two);
    let five = store.int(5);
    let one = store.int(1);
    let five_x = store.product(vec![five, x]);
    let lhs = store.sum(vec![x2, five, one, five_x]);
    let zero = store.int(0);
    store.equation(lhs, zero)
}

#[test]
fn simplify_fraction_arithmetic_in_two_steps() {
    let mut store = Store::new();
    let one = store.int(1);
    let two = store.int(2);
    let three = store.int(3);
    let third = store.fraction(one, three);
    let two_thirds = store.fraction(two, three);
    let half = store.fraction(one, two);
    let product = store.product(vec![two_thirds, half]);
    let expr = store.sum(vec![third, product]);

    let registry = default_registry();
    let ctx = Context::new();
    let t = solve(&mut store, &ctx, &registry, "simplify", expr)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "[2 / 3]");
    assert_eq!(
        t.rule_explanations(),
        [Explanation::MultiplyFractions, Explanation::AddFractions]
    );
}

#[test]
fn solve_linear_divides_then_extracts() {
    let mut store = Store::new();
    let three = store.int(3);
    let x = store.var("x");
    let lhs = store.product(vec![three, x]);
    let one = store.int(1);
    let eq = store.equation(lhs, one);

    let registry = default_registry();
    let ctx = ctx_for_x();
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "SetSolution[x: {[1 / 3]}]");
    assert_eq!(
        t.rule_explanations(),
        [Explanation::DivideByCoefficient, Explanation::ExtractSolution]
    );
}

#[test]
fn quadratic_formula_normalizes_then_solves() {
    let mut store = Store::new();
    let eq = messy_quadratic(&mut store);

    let registry = default_registry();
    let ctx =
        ctx_for_x().with_strategy(StrategyCategory::QuadraticEquations, "quadratic-formula");
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "SetSolution[x: {-3, -2}]");
    let keys = t.rule_explanations();
    let normalized_before_formula = keys
        .iter()
        .position(|&k| k == Explanation::ReorderTerms)
        .unwrap()
        < keys
            .iter()
            .position(|&k| k == Explanation::ApplyQuadraticFormula)
            .unwrap();
    assert!(normalized_before_formula);
    assert!(keys.contains(&Explanation::AddIntegers));

    // The normalized form is recorded on the formula step itself.
    let task_set = find_task_set(&t).unwrap();
    assert_eq!(task_set.explanation.key, Explanation::SplitPlusMinus);
    assert_eq!(task_set.tasks.len(), 3);
}

#[test]
fn contradictory_equation_cancels_to_a_contradiction() {
    let mut store = Store::new();
    let six = store.int(6);
    let x = store.var("x");
    let six_x = store.product(vec![six, x]);
    let lhs = store.sum(vec![six_x, six]);
    let minus_five = store.int(-5);
    let rhs = store.sum(vec![six_x, minus_five]);
    let eq = store.equation(lhs, rhs);

    let registry = default_registry();
    let ctx = ctx_for_x();
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "Contradiction[x: 6 = -5]");
    assert_eq!(
        t.rule_explanations(),
        [
            Explanation::CancelCommonTerms,
            Explanation::ConstantContradiction
        ]
    );
}

#[test]
fn identical_sides_cancel_to_an_identity() {
    let mut store = Store::new();
    let six = store.int(6);
    let x = store.var("x");
    let six_x = store.product(vec![six, x]);
    let lhs = store.sum(vec![six_x, six]);
    let eq = store.equation(lhs, lhs);

    let registry = default_registry();
    let ctx = ctx_for_x();
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "Identity[x: 6 = 6]");
}

#[test]
fn factored_equation_splits_one_task_per_factor() {
    let mut store = Store::new();
    let x = store.var("x");
    let two = store.int(2);
    let three = store.int(3);
    let f1 = store.sum(vec![x, two]);
    let f2 = store.sum(vec![x, three]);
    let lhs = store.product(vec![f1, f2]);
    let zero = store.int(0);
    let eq = store.equation(lhs, zero);

    let registry = default_registry();
    let ctx = ctx_for_x().with_strategy(StrategyCategory::QuadraticEquations, "factoring");
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "SetSolution[x: {-2, -3}]");

    let task_set = find_task_set(&t).unwrap();
    assert_eq!(task_set.tasks.len(), 3);
    assert_eq!(task_set.tasks[0].id, 1);
    assert_eq!(store.canonical(task_set.tasks[0].start), "x + 2 = 0");
    assert_eq!(store.canonical(task_set.tasks[1].start), "x + 3 = 0");
    assert_eq!(
        task_set.tasks[2].explanation.key,
        Explanation::CollectSolutions
    );
}

#[test]
fn verification_appends_a_check_task() {
    let mut store = Store::new();
    let three = store.int(3);
    let x = store.var("x");
    let lhs = store.product(vec![three, x]);
    let one = store.int(1);
    let eq = store.equation(lhs, one);

    let registry = default_registry();
    let ctx = ctx_for_x().with_setting(Setting::VerifySolutions, SettingValue::Bool(true));
    let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
        .unwrap()
        .unwrap();

    assert_eq!(store.canonical(t.to), "SetSolution[x: {[1 / 3]}]");
    let check = t
        .tasks
        .iter()
        .find(|task| task.explanation.key == Explanation::CheckSolutions)
        .unwrap();
    assert_eq!(store.canonical(check.result), "Identity[x: 1 = 1]");
}

#[test]
fn derivations_are_deterministic() {
    let run = || {
        let mut store = Store::new();
        let eq = messy_quadratic(&mut store);
        let registry = default_registry();
        let ctx = ctx_for_x();
        let t = solve(&mut store, &ctx, &registry, "solve-equation", eq)
            .unwrap()
            .unwrap();
        (store.canonical(t.to), t.rule_explanations())
    };

    assert_eq!(run(), run());
}

fn collect_rule_steps<'a>(t: &'a Transformation, out: &mut Vec<&'a Transformation>) {
    if t.kind == TransformationKind::Rule {
        out.push(t);
    }
    for step in &t.steps {
        collect_rule_steps(step, out);
    }
}

#[test]
fn recorded_mappings_resolve_in_both_trees() {
    let mut store = Store::new();
    let x = store.var("x");
    let two = store.int(2);
    let x2 = store.power(x, two);
    let six = store.int(6);
    let five = store.int(5);
    let five_x = store.product(vec![five, x]);
    // Out-of-order sum so the derivation records Move mappings.
    let expr = store.sum(vec![six, x2, five_x]);

    let registry = default_registry();
    let ctx = Context::new();
    let t = solve(&mut store, &ctx, &registry, "simplify", expr)
        .unwrap()
        .unwrap();

    let mut steps = Vec::new();
    collect_rule_steps(&t, &mut steps);
    assert!(!steps.is_empty());
    let mut saw_move = false;
    for step in steps {
        assert!(!step.path_mappings.is_empty());
        for mapping in &step.path_mappings {
            for path in &mapping.from_paths {
                assert!(resolve(&store, step.from, path).is_some());
            }
            for path in &mapping.to_paths {
                assert!(resolve(&store, step.to, path).is_some());
            }
            // A moved subtree arrives at its new position unchanged.
            if mapping.kind == MappingKind::Move {
                saw_move = true;
                for (fp, tp) in mapping.from_paths.iter().zip(&mapping.to_paths) {
                    assert_eq!(resolve(&store, step.from, fp), resolve(&store, step.to, tp));
                }
            }
        }
    }
    assert!(saw_move);
}

#[test]
fn declared_variable_must_occur_in_the_expression() {
    let mut store = Store::new();
    let three = store.int(3);
    let x = store.var("x");
    let lhs = store.product(vec![three, x]);
    let one = store.int(1);
    let eq = store.equation(lhs, one);

    let registry = default_registry();
    let ctx = Context::new().with_solution_variable(Symbol::new("y"));
    let err = solve(&mut store, &ctx, &registry, "solve-equation", eq).unwrap_err();
    assert!(matches!(err, EngineError::UnknownVariable(_)));
}

#[test]
fn unknown_plan_is_an_error() {
    let mut store = Store::new();
    let one = store.int(1);
    let registry = default_registry();
    let err = solve(&mut store, &Context::new(), &registry, "integrate", one).unwrap_err();
    assert!(matches!(err, EngineError::UnknownPlan(_)));
}
