//! Equation solving: normalization moves, the linear pipeline, terminal
//! statements and optional back-substitution of candidate roots.

use crate::collect;
use crate::simplify;
use crate::terms::{is_linear_equation, split_term};
use num_traits::{One, Zero};
use stepmath_ast::{
    substitute_variable, Expr, ExprId, MappingKind, Path, PathMapping, RelOp, Store,
};
use stepmath_engine::{
    Context, Deeply, Explanation, FirstOf, Guarded, Metadata, Plan, PlanResult, Rule,
    RuleResult, Setting, SettingValue, Task, Transformation, Traversal, WhileApplicable,
};
use std::rc::Rc;

fn whole_step() -> Vec<PathMapping> {
    vec![PathMapping::new(
        MappingKind::Transform,
        vec![Path::main()],
        vec![Path::main()],
    )]
}

fn contains_plus_minus(store: &Store, id: ExprId) -> bool {
    matches!(store.get(id), Expr::PlusMinus(_))
        || store
            .children(id)
            .into_iter()
            .any(|c| contains_plus_minus(store, c))
}

fn negated(store: &mut Store, id: ExprId) -> ExprId {
    match store.as_rational(id) {
        Some(r) => store.rational(-r),
        None => match store.get(id) {
            Expr::Neg(inner) => *inner,
            _ => store.neg(id),
        },
    }
}

/// An equation with an undefined side has no solutions at all.
pub struct UndefinedContradiction;

impl Rule for UndefinedContradiction {
    fn name(&self) -> &'static str {
        "undefined_contradiction"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Relation(lhs, _, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let undefined = |id: ExprId| matches!(store.get(id), Expr::Undefined);
        if !undefined(lhs) && !undefined(rhs) {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let vars = ctx.solution_variables().to_vec();
        let to = store.contradiction(vars, expr);
        Ok(Some(Transformation::rule(
            Explanation::UndefinedEquationContradiction,
            expr,
            to,
            whole_step(),
            Vec::new(),
        )))
    }
}

/// A relation between two constants is decided on the spot: `6 = 6`
/// becomes `Identity[...]`, `6 = -5` becomes `Contradiction[...]`, each
/// carrying the residual relation it was decided from.
pub struct EvaluateConstantRelation;

impl Rule for EvaluateConstantRelation {
    fn name(&self) -> &'static str {
        "evaluate_constant_relation"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Relation(lhs, op, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let (Some(l), Some(r)) = (store.as_rational(lhs), store.as_rational(rhs)) else {
            return Ok(None);
        };
        let holds = match op {
            RelOp::Eq => l == r,
            RelOp::Neq => l != r,
            RelOp::Lt => l < r,
            RelOp::Gt => l > r,
            RelOp::Leq => l <= r,
            RelOp::Geq => l >= r,
        };
        ctx.budget().charge_rewrite()?;
        let vars = ctx.solution_variables().to_vec();
        let (to, key) = if holds {
            (
                store.identity_statement(vars, expr),
                Explanation::ConstantIdentity,
            )
        } else {
            (
                store.contradiction(vars, expr),
                Explanation::ConstantContradiction,
            )
        };
        Ok(Some(Transformation::rule(key, expr, to, whole_step(), Vec::new())))
    }
}

/// `x = <constant>` read off as a solution set.
pub struct ExtractSolution;

impl Rule for ExtractSolution {
    fn name(&self) -> &'static str {
        "extract_solution"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        if !matches!(store.get(lhs), Expr::Variable(v) if v == var) {
            return Ok(None);
        }
        if store.contains_variable(rhs, var) || contains_plus_minus(store, rhs) {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let var = var.clone();
        let set = store.finite_set(vec![rhs]);
        let to = store.set_solution(vec![var], set);
        Ok(Some(Transformation::rule(
            Explanation::ExtractSolution,
            expr,
            to,
            vec![PathMapping::new(
                MappingKind::Move,
                vec![Path::main().child(1)],
                vec![Path::main().child(0).child(0)],
            )],
            vec![rhs],
        )))
    }
}

/// Terms containing the solution variable move from the right side to the
/// left, negated; collection then merges them.
pub struct MoveVariableTermsLeft;

impl Rule for MoveVariableTermsLeft {
    fn name(&self) -> &'static str {
        "move_variable_terms_left"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(lhs, op, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let rhs_terms: Vec<ExprId> = match store.get(rhs) {
            Expr::Sum(children) => children.clone(),
            _ => vec![rhs],
        };
        let (moved, kept): (Vec<ExprId>, Vec<ExprId>) = rhs_terms
            .into_iter()
            .partition(|&t| store.contains_variable(t, var));
        if moved.is_empty() {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let mut left = vec![lhs];
        for term in &moved {
            let flipped = negated(store, *term);
            left.push(flipped);
        }
        let new_lhs = store.sum(left);
        let new_rhs = store.sum(kept);
        let to = store.relation(new_lhs, op, new_rhs);
        Ok(Some(Transformation::rule(
            Explanation::MoveVariableTermsLeft,
            expr,
            to,
            whole_step(),
            moved,
        )))
    }
}

/// Constant terms move off the variable side to the right, negated.
pub struct MoveConstantsRight;

impl Rule for MoveConstantsRight {
    fn name(&self) -> &'static str {
        "move_constants_right"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(lhs, op, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let Expr::Sum(lhs_terms) = store.get(lhs) else {
            return Ok(None);
        };
        let lhs_terms = lhs_terms.clone();
        let (kept, moved): (Vec<ExprId>, Vec<ExprId>) = lhs_terms
            .into_iter()
            .partition(|&t| store.contains_variable(t, var));
        if moved.is_empty() || kept.is_empty() {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let mut right = vec![rhs];
        for term in &moved {
            let flipped = negated(store, *term);
            right.push(flipped);
        }
        let new_lhs = store.sum(kept);
        let new_rhs = store.sum(right);
        let to = store.relation(new_lhs, op, new_rhs);
        Ok(Some(Transformation::rule(
            Explanation::MoveConstantsRight,
            expr,
            to,
            whole_step(),
            moved,
        )))
    }
}

/// `c x = d` divided through by `c`.
pub struct DivideByCoefficient;

impl Rule for DivideByCoefficient {
    fn name(&self) -> &'static str {
        "divide_by_coefficient"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let Some((coeff, factors)) = split_term(store, lhs) else {
            return Ok(None);
        };
        let is_lone_var =
            matches!(factors.as_slice(), [f] if matches!(store.get(*f), Expr::Variable(v) if v == var));
        if !is_lone_var || coeff.is_one() || coeff.is_zero() {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let var_node = factors[0];
        let new_rhs = match store.as_rational(rhs) {
            Some(r) => store.rational(r / &coeff),
            None => {
                let divisor = store.rational(coeff.clone());
                store.fraction(rhs, divisor)
            }
        };
        let coeff_node = store.rational(coeff);
        let to = store.equation(var_node, new_rhs);
        Ok(Some(Transformation::rule(
            Explanation::DivideByCoefficient,
            expr,
            to,
            whole_step(),
            vec![coeff_node],
        )))
    }
}

/// `-(...) = rhs` negated on both sides.
pub struct NegateBothSides;

impl Rule for NegateBothSides {
    fn name(&self) -> &'static str {
        "negate_both_sides"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let Expr::Neg(inner) = *store.get(lhs) else {
            return Ok(None);
        };
        ctx.budget().charge_rewrite()?;
        let new_rhs = negated(store, rhs);
        let to = store.equation(inner, new_rhs);
        Ok(Some(Transformation::rule(
            Explanation::NegateBothSides,
            expr,
            to,
            whole_step(),
            Vec::new(),
        )))
    }
}

/// The fixpoint solving loop shared by the linear solver and every task
/// worker: decide constant relations, cancel, simplify inside, read off
/// solutions, and otherwise make one normalization move per iteration.
pub fn solve_equation_steps(key: Explanation) -> Rc<dyn Plan> {
    let rules: Vec<Rc<dyn Plan>> = vec![
        Rc::new(UndefinedContradiction),
        Rc::new(EvaluateConstantRelation),
        Rc::new(collect::cancel_common_terms()),
        Rc::new(Deeply::new(
            "simplify_inside",
            Rc::new(FirstOf::new("simplify_rules", simplify::simplify_rules())),
            Traversal::PostOrder,
        )),
        Rc::new(ExtractSolution),
        Rc::new(MoveVariableTermsLeft),
        Rc::new(MoveConstantsRight),
        Rc::new(DivideByCoefficient),
        Rc::new(NegateBothSides),
    ];
    Rc::new(WhileApplicable::new(
        "solve_equation_steps",
        key,
        Rc::new(FirstOf::new("equation_rules", rules)),
    ))
}

/// The `"solve-linear"` plan: the solving loop, gated on the equation
/// being at most linear in the solution variable.
pub fn solve_linear_plan() -> Rc<dyn Plan> {
    Rc::new(Guarded::new(
        "solve_linear",
        is_linear_guard,
        solve_equation_steps(Explanation::SolveLinearEquation),
    ))
}

fn is_linear_guard(store: &Store, ctx: &Context, expr: ExprId) -> bool {
    is_linear_equation(store, ctx, expr)
}

/// Wraps a solver so that, when the `verify_solutions` setting is on and a
/// solution set comes back, every candidate root is substituted into the
/// original equation and checked in an appended verification task.
pub struct WithVerification {
    inner: Rc<dyn Plan>,
}

impl WithVerification {
    pub fn new(inner: Rc<dyn Plan>) -> Self {
        WithVerification { inner }
    }
}

impl Plan for WithVerification {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        let Some(mut t) = self.inner.run(store, ctx, expr)? else {
            return Ok(None);
        };
        if ctx.setting(Setting::VerifySolutions) != SettingValue::Bool(true) {
            return Ok(Some(t));
        }
        let Expr::SetSolution(vars, set) = store.get(t.to).clone() else {
            return Ok(Some(t));
        };
        let Expr::FiniteSet(roots) = store.get(set).clone() else {
            return Ok(Some(t));
        };
        let Some(var) = vars.first().cloned() else {
            return Ok(Some(t));
        };
        let checker = solve_equation_steps(Explanation::CheckSolutions);
        let mut next_id = t.tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
        for root in roots {
            ctx.budget().check_deadline()?;
            tracing::debug!(root = %store.canonical(root), "verifying candidate root");
            let substituted = substitute_variable(store, expr, &var, root);
            let (result, steps) = match checker.run(store, ctx, substituted)? {
                Some(check) => {
                    let rebased = check.rebased_on(stepmath_ast::PathRoot::Task(next_id));
                    (rebased.to, vec![rebased])
                }
                None => (substituted, Vec::new()),
            };
            // A failed check stays in the record; the caller sees the
            // non-identity residual in the task result.
            t.tasks.push(Task {
                id: next_id,
                start: substituted,
                result,
                explanation: Metadata::with_params(Explanation::CheckSolutions, vec![root]),
                steps,
            });
            next_id += 1;
        }
        Ok(Some(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepmath_ast::Symbol;
    use stepmath_engine::Budget;

    fn ctx_for_x() -> Context {
        Context::new().with_solution_variable(Symbol::new("x"))
    }

    #[test]
    fn divides_by_the_coefficient_then_extracts() {
        let mut store = Store::new();
        let three = store.int(3);
        let x = store.var("x");
        let three_x = store.product(vec![three, x]);
        let one = store.int(1);
        let eq = store.equation(three_x, one);
        let ctx = ctx_for_x();

        let plan = solve_equation_steps(Explanation::SolveEquation);
        let t = plan.run(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "SetSolution[x: {[1 / 3]}]");
        assert_eq!(
            t.rule_explanations(),
            vec![Explanation::DivideByCoefficient, Explanation::ExtractSolution]
        );
    }

    #[test]
    fn moves_variable_terms_and_constants() {
        let mut store = Store::new();
        let two = store.int(2);
        let x = store.var("x");
        let two_x = store.product(vec![two, x]);
        let three = store.int(3);
        let rhs = store.sum(vec![x, three]);
        let eq = store.equation(two_x, rhs);
        let ctx = ctx_for_x();

        let plan = solve_equation_steps(Explanation::SolveEquation);
        let t = plan.run(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "SetSolution[x: {3}]");
    }

    #[test]
    fn constant_equation_decides_identity_or_contradiction() {
        let mut store = Store::new();
        let six = store.int(6);
        let minus_five = store.int(-5);
        let ctx = ctx_for_x();

        let eq = store.equation(six, six);
        let t = EvaluateConstantRelation.apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "Identity[x: 6 = 6]");

        let eq = store.equation(six, minus_five);
        let t = EvaluateConstantRelation.apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "Contradiction[x: 6 = -5]");
    }

    #[test]
    fn undefined_side_is_a_contradiction() {
        let mut store = Store::new();
        let x = store.var("x");
        let undef = store.undefined();
        let eq = store.equation(x, undef);
        let ctx = ctx_for_x();

        let t = UndefinedContradiction.apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "Contradiction[x: x = Undefined]");
    }

    #[test]
    fn linear_guard_rejects_quadratics() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let x2 = store.power(x, two);
        let one = store.int(1);
        let eq = store.equation(x2, one);
        let ctx = ctx_for_x();

        assert!(solve_linear_plan().run(&mut store, &ctx, eq).unwrap().is_none());
    }

    #[test]
    fn negates_both_sides() {
        let mut store = Store::new();
        let x = store.var("x");
        let one = store.int(1);
        let inner = store.sum(vec![x, one]);
        let lhs = store.neg(inner);
        let five = store.int(5);
        let eq = store.equation(lhs, five);
        let ctx = ctx_for_x();

        let t = NegateBothSides.apply(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "x + 1 = -5");
    }

    #[test]
    fn verification_appends_identity_tasks() {
        let mut store = Store::new();
        let three = store.int(3);
        let x = store.var("x");
        let three_x = store.product(vec![three, x]);
        let six = store.int(6);
        let eq = store.equation(three_x, six);
        let ctx = ctx_for_x()
            .with_setting(Setting::VerifySolutions, SettingValue::Bool(true))
            .with_budget(Budget::with_rewrites(1000));

        let plan = WithVerification::new(solve_equation_steps(Explanation::SolveEquation));
        let t = plan.run(&mut store, &ctx, eq).unwrap().unwrap();
        assert_eq!(store.canonical(t.to), "SetSolution[x: {2}]");
        assert_eq!(t.tasks.len(), 1);
        let check = &t.tasks[0];
        assert_eq!(check.explanation.key, Explanation::CheckSolutions);
        assert!(matches!(store.get(check.result), Expr::Identity(..)));
    }
}
