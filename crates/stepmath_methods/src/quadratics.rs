//! Quadratic equations: normalization to `x^2 + b x + c = 0` and the
//! three competing strategies (factoring, the quadratic formula,
//! completing the square).

use crate::equations::{solve_equation_steps, WithVerification};
use crate::simplify;
use crate::terms::{equation_coefficients, is_quadratic_equation};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use stepmath_ast::{
    resolve, substitute_at, Expr, ExprId, MappingKind, Path, PathMapping, RelOp, Store,
};
use stepmath_engine::{
    CaseSpec, Collected, Context, Deeply, Explanation, FirstOf, Guarded, Metadata, Plan,
    Rule, RuleResult, Sequence, Strategy, StrategyCategory, StrategySelector, Task, TaskSetPlan,
    Transformation, Traversal, WhileApplicable,
};
use std::rc::Rc;

/// Integer-root search stays within this bound on |c|.
const MAX_FACTOR_SEARCH: i64 = 10_000;

fn whole_step() -> Vec<PathMapping> {
    vec![PathMapping::new(
        MappingKind::Transform,
        vec![Path::main()],
        vec![Path::main()],
    )]
}

/// `lhs = rhs` with a nonzero right side becomes `lhs - rhs = 0`.
pub struct NormalizeToZero;

impl Rule for NormalizeToZero {
    fn name(&self) -> &'static str {
        "normalize_to_zero"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        if store.is_zero_integer(rhs) {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let rhs_terms: Vec<ExprId> = match store.get(rhs) {
            Expr::Sum(children) => children.clone(),
            _ => vec![rhs],
        };
        let mut left = vec![lhs];
        for term in rhs_terms {
            let flipped = match store.as_rational(term) {
                Some(r) => store.rational(-r),
                None => match store.get(term) {
                    Expr::Neg(inner) => *inner,
                    _ => store.neg(term),
                },
            };
            left.push(flipped);
        }
        let new_lhs = store.sum(left);
        let zero = store.int(0);
        let to = store.equation(new_lhs, zero);
        Ok(Some(Transformation::rule(
            Explanation::NormalizeEquation,
            expr,
            to,
            whole_step(),
            Vec::new(),
        )))
    }
}

/// Both quadratic roots in one rewrite:
/// `x = [(-b +/- sqrt(b^2 - 4 a c)) / 2 a]`. Only fires for a
/// non-negative discriminant; complex roots are out of scope, so the
/// equation is simply left standing.
pub struct ApplyQuadraticFormula;

impl Rule for ApplyQuadraticFormula {
    fn name(&self) -> &'static str {
        "apply_quadratic_formula"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Some((a, b, c)) = equation_coefficients(store, expr, var) else {
            return Ok(None);
        };
        if a.is_zero() {
            return Ok(None);
        }
        let discriminant = b.clone() * b.clone() - BigRational::from_integer(4.into()) * a.clone() * c;
        if discriminant.is_negative() {
            tracing::debug!(%discriminant, "negative discriminant, leaving the equation");
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let var = var.clone();
        let minus_b = store.rational(-b);
        let disc_node = store.rational(discriminant);
        let sqrt_disc = store.sqrt(disc_node);
        let pm = store.plus_minus(sqrt_disc);
        let numerator = store.sum(vec![minus_b, pm]);
        let denominator = store.rational(a * BigRational::from_integer(2.into()));
        let rhs = store.fraction(numerator, denominator);
        let var_node = store.variable(var);
        let to = store.equation(var_node, rhs);
        Ok(Some(Transformation::rule(
            Explanation::ApplyQuadraticFormula,
            expr,
            to,
            whole_step(),
            vec![disc_node],
        )))
    }
}

/// `x^2 + b x + c = 0` with integer roots rewritten as
/// `(x + p)(x + q) = 0` where `p + q = b` and `p q = c`.
pub struct FactorQuadratic;

impl Rule for FactorQuadratic {
    fn name(&self) -> &'static str {
        "factor_quadratic"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(_, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        if !store.is_zero_integer(rhs) {
            return Ok(None);
        }
        let Some((a, b, c)) = equation_coefficients(store, expr, var) else {
            return Ok(None);
        };
        if !a.is_one() || !b.is_integer() || !c.is_integer() {
            return Ok(None);
        }
        let (Some(b), Some(c)) = (b.to_integer().to_i64(), c.to_integer().to_i64()) else {
            return Ok(None);
        };
        if c.abs() > MAX_FACTOR_SEARCH {
            return Ok(None);
        }
        let Some((p, q)) = integer_roots(b, c) else {
            return Ok(None);
        };
        ctx.budget().charge_rewrite()?;
        let var = var.clone();
        let var_node = store.variable(var);
        let first = linear_factor(store, var_node, p);
        let second = linear_factor(store, var_node, q);
        let product = store.product(vec![first, second]);
        let zero = store.int(0);
        let to = store.equation(product, zero);
        let p_node = store.int(p);
        let q_node = store.int(q);
        Ok(Some(Transformation::rule(
            Explanation::FactorQuadratic,
            expr,
            to,
            whole_step(),
            vec![p_node, q_node],
        )))
    }
}

fn linear_factor(store: &mut Store, var_node: ExprId, offset: i64) -> ExprId {
    if offset == 0 {
        return var_node;
    }
    let offset = store.int(offset);
    store.sum(vec![var_node, offset])
}

fn integer_roots(b: i64, c: i64) -> Option<(i64, i64)> {
    if c == 0 {
        return Some(if b >= 0 { (0, b) } else { (b, 0) });
    }
    for p in -c.abs()..=c.abs() {
        if p == 0 || c % p != 0 {
            continue;
        }
        let q = c / p;
        if p + q == b && p <= q {
            return Some((p, q));
        }
    }
    None
}

/// `x^2 + b x + c = 0` rewritten as `(x + h)^2 = k` with `h = b/2` and
/// `k = h^2 - c`.
pub struct CompleteTheSquare;

impl Rule for CompleteTheSquare {
    fn name(&self) -> &'static str {
        "complete_the_square"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Some(var) = ctx.solution_variable() else {
            return Ok(None);
        };
        let Expr::Relation(_, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        if !store.is_zero_integer(rhs) {
            return Ok(None);
        }
        let Some((a, b, c)) = equation_coefficients(store, expr, var) else {
            return Ok(None);
        };
        if !a.is_one() || b.is_zero() {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let var = var.clone();
        let half_b = b / BigRational::from_integer(2.into());
        let k = half_b.clone() * half_b.clone() - c;
        let var_node = store.variable(var);
        let h_node = store.rational(half_b);
        let base = store.sum(vec![var_node, h_node]);
        let two = store.int(2);
        let square = store.power(base, two);
        let k_node = store.rational(k);
        let to = store.equation(square, k_node);
        Ok(Some(Transformation::rule(
            Explanation::CompleteTheSquare,
            expr,
            to,
            whole_step(),
            vec![h_node],
        )))
    }
}

/// `(x + h)^2 = k` opened up as `x + h = +/- sqrt(k)` for `k >= 0`.
pub struct ExtractSquareRoot;

impl Rule for ExtractSquareRoot {
    fn name(&self) -> &'static str {
        "extract_square_root"
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
            return Ok(None);
        };
        let Expr::Power(base, exp) = *store.get(lhs) else {
            return Ok(None);
        };
        if !matches!(store.get(exp), Expr::Integer(n) if *n == BigInt::from(2)) {
            return Ok(None);
        }
        let Some(k) = store.as_rational(rhs) else {
            return Ok(None);
        };
        if k.is_negative() {
            return Ok(None);
        }
        ctx.budget().charge_rewrite()?;
        let sqrt_k = store.sqrt(rhs);
        let pm = store.plus_minus(sqrt_k);
        let to = store.equation(base, pm);
        Ok(Some(Transformation::rule(
            Explanation::ExtractSquareRoot,
            expr,
            to,
            whole_step(),
            Vec::new(),
        )))
    }
}

fn find_plus_minus(store: &Store, root: ExprId, at: Path) -> Option<Path> {
    if matches!(store.get(root), Expr::PlusMinus(_)) {
        return Some(at);
    }
    for (i, child) in store.children(root).into_iter().enumerate() {
        if let Some(found) = find_plus_minus(store, child, at.child(i as u32)) {
            return Some(found);
        }
    }
    None
}

/// Split on the first `+/-` node: the minus branch first, then the plus
/// branch, so collected roots come out in ascending order for the usual
/// `-b +/- sqrt(...)` shape.
fn split_plus_minus(store: &mut Store, _ctx: &Context, expr: ExprId) -> Option<Vec<CaseSpec>> {
    let path = find_plus_minus(store, expr, Path::main())?;
    let pm_node = resolve(store, expr, &path)?;
    let Expr::PlusMinus(inner) = *store.get(pm_node) else {
        return None;
    };
    let minus_inner = store.neg(inner);
    let minus_case = substitute_at(store, expr, &path, minus_inner);
    let plus_case = substitute_at(store, expr, &path, inner);
    Some(vec![
        CaseSpec {
            start: minus_case,
            explanation: Metadata::with_params(Explanation::SolveCase, vec![minus_case]),
        },
        CaseSpec {
            start: plus_case,
            explanation: Metadata::with_params(Explanation::SolveCase, vec![plus_case]),
        },
    ])
}

/// One case per factor of `... * ... = 0`.
fn split_factors(store: &mut Store, _ctx: &Context, expr: ExprId) -> Option<Vec<CaseSpec>> {
    let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
        return None;
    };
    if !store.is_zero_integer(rhs) {
        return None;
    }
    let Expr::Product(factors) = store.get(lhs).clone() else {
        return None;
    };
    let zero = store.int(0);
    Some(
        factors
            .into_iter()
            .map(|factor| CaseSpec {
                start: store.equation(factor, zero),
                explanation: Metadata::with_params(Explanation::SolveFactor, vec![factor]),
            })
            .collect(),
    )
}

/// Union of the case solution sets, in task order without duplicates. All
/// cases contradictory means the whole split is contradictory.
fn collect_solutions(store: &mut Store, _ctx: &Context, tasks: &[Task]) -> Option<Collected> {
    let mut vars = None;
    let mut roots: Vec<ExprId> = Vec::new();
    let mut contradiction = None;
    for task in tasks {
        match store.get(task.result).clone() {
            Expr::SetSolution(v, set) => {
                vars = Some(v);
                let Expr::FiniteSet(elements) = store.get(set).clone() else {
                    return None;
                };
                for el in elements {
                    if !roots.contains(&el) {
                        roots.push(el);
                    }
                }
            }
            Expr::Contradiction(..) => contradiction = Some(task.result),
            _ => return None,
        }
    }
    let result = match vars {
        Some(vars) => {
            let set = store.finite_set(roots);
            store.set_solution(vars, set)
        }
        None => contradiction?,
    };
    Some(Collected {
        result,
        explanation: Metadata::new(Explanation::CollectSolutions),
    })
}

fn plus_minus_tasks() -> Rc<dyn Plan> {
    Rc::new(TaskSetPlan::new(
        "split_plus_minus",
        Explanation::SplitPlusMinus,
        split_plus_minus,
        solve_equation_steps(Explanation::SolveCase),
        collect_solutions,
    ))
}

fn factor_tasks() -> Rc<dyn Plan> {
    Rc::new(TaskSetPlan::new(
        "solve_factored",
        Explanation::SolveFactoredEquation,
        split_factors,
        solve_equation_steps(Explanation::SolveFactor),
        collect_solutions,
    ))
}

fn normalize_steps() -> Rc<dyn Plan> {
    let rules: Vec<Rc<dyn Plan>> = vec![
        Rc::new(NormalizeToZero),
        Rc::new(Deeply::new(
            "simplify_inside",
            Rc::new(FirstOf::new("simplify_rules", simplify::simplify_rules())),
            Traversal::PostOrder,
        )),
    ];
    Rc::new(WhileApplicable::new(
        "normalize_quadratic",
        Explanation::NormalizeEquation,
        Rc::new(FirstOf::new("normalize_rules", rules)),
    ))
}

fn factoring_strategy_plan() -> Rc<dyn Plan> {
    Rc::new(
        Sequence::new("factoring", Explanation::SolveFactoredEquation)
            .then_optional(Rc::new(FactorQuadratic))
            .then(factor_tasks()),
    )
}

fn formula_strategy_plan() -> Rc<dyn Plan> {
    Rc::new(
        Sequence::new("quadratic_formula", Explanation::SolveQuadraticEquation)
            .then(Rc::new(ApplyQuadraticFormula))
            .then_optional(Rc::new(Deeply::new(
                "simplify_inside",
                Rc::new(FirstOf::new("simplify_rules", simplify::simplify_rules())),
                Traversal::PostOrder,
            )))
            .then(plus_minus_tasks()),
    )
}

fn completing_square_strategy_plan() -> Rc<dyn Plan> {
    Rc::new(
        Sequence::new("completing_the_square", Explanation::SolveQuadraticEquation)
            .then(Rc::new(CompleteTheSquare))
            .then(Rc::new(ExtractSquareRoot))
            .then(plus_minus_tasks()),
    )
}

/// Strategies whose `verify` flag is set get their plan wrapped so that
/// candidate roots are substituted back when the setting asks for it.
fn verified(mut strategy: Strategy) -> Strategy {
    if strategy.verify {
        strategy.plan = Rc::new(WithVerification::new(strategy.plan.clone()));
    }
    strategy
}

/// The `QuadraticEquations` strategy table. Factoring is preferred when it
/// applies; the formula always works over the reals; completing the
/// square is kept for explicit selection. Factoring reads the roots off
/// exactly, so only the other two carry the verification wrapper.
pub fn quadratic_strategies() -> StrategySelector {
    StrategySelector::new(StrategyCategory::QuadraticEquations)
        .register(verified(Strategy {
            id: "factoring",
            description: "Factor into linear terms and solve each factor",
            priority: 10,
            verify: false,
            plan: factoring_strategy_plan(),
        }))
        .register(verified(Strategy {
            id: "quadratic-formula",
            description: "Apply the quadratic formula and split on the +/-",
            priority: 5,
            verify: true,
            plan: formula_strategy_plan(),
        }))
        .register(verified(Strategy {
            id: "completing-the-square",
            description: "Rewrite as a shifted square and extract the root",
            priority: 0,
            verify: true,
            plan: completing_square_strategy_plan(),
        }))
}

/// The `"solve-quadratic"` plan: normalize, then let the strategy
/// selector pick a method.
pub fn solve_quadratic_plan() -> Rc<dyn Plan> {
    let pipeline = Sequence::new("solve_quadratic", Explanation::SolveQuadraticEquation)
        .then_optional(normalize_steps())
        .then(Rc::new(quadratic_strategies()));
    Rc::new(Guarded::new(
        "solve_quadratic",
        is_quadratic_guard,
        Rc::new(pipeline),
    ))
}

fn is_quadratic_guard(store: &Store, ctx: &Context, expr: ExprId) -> bool {
    is_quadratic_equation(store, ctx, expr) || is_factored_zero(store, ctx, expr)
}

/// Already-factored input (`(x + 2) (x + 3) = 0`) has no readable
/// polynomial coefficients but still belongs to this solver.
fn is_factored_zero(store: &Store, ctx: &Context, expr: ExprId) -> bool {
    let Some(var) = ctx.solution_variable() else {
        return false;
    };
    let Expr::Relation(lhs, RelOp::Eq, rhs) = *store.get(expr) else {
        return false;
    };
    store.is_zero_integer(rhs)
        && matches!(store.get(lhs), Expr::Product(_))
        && store.contains_variable(lhs, var)
}
