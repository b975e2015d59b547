//! Atomic rewrites.
//!
//! A rule inspects one expression and either produces a single-step
//! [`Transformation`] or declines. Declining is ordinary control flow and
//! is reported as `Ok(None)`; `Err` is reserved for exhausted budgets.

use crate::context::Context;
use crate::error::EngineError;
use crate::explanation::Explanation;
use crate::matcher::{find_matches, Binding};
use crate::pattern::Pat;
use crate::transformation::Transformation;
use stepmath_ast::{ExprId, MappingKind, Path, PathMapping, Store};

pub type RuleResult = Result<Option<Transformation>, EngineError>;

pub trait Rule {
    /// Stable identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Try the rule at the root of `expr`.
    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult;
}

/// What a pattern rule's builder produced: the replacement expression plus
/// the provenance and presentation data for the recorded step.
pub struct Rewrite {
    pub result: ExprId,
    pub explanation: Explanation,
    pub mappings: Vec<PathMapping>,
    pub params: Vec<ExprId>,
}

impl Rewrite {
    pub fn new(result: ExprId, explanation: Explanation) -> Self {
        Rewrite {
            result,
            explanation,
            mappings: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn with_mappings(mut self, mappings: Vec<PathMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_params(mut self, params: Vec<ExprId>) -> Self {
        self.params = params;
        self
    }
}

pub type Condition = fn(&Store, &Context, &Binding) -> bool;
pub type Builder = fn(&mut Store, &Context, &Binding) -> Rewrite;

/// A declarative rule: a pattern, an optional side condition, and a
/// builder. Matching enumerates bindings lazily and stops at the first one
/// the condition accepts; only then does the builder run and allocate.
pub struct PatternRule {
    name: &'static str,
    pattern: Pat,
    condition: Option<Condition>,
    builder: Builder,
}

impl PatternRule {
    pub fn new(name: &'static str, pattern: Pat, builder: Builder) -> Self {
        PatternRule {
            name,
            pattern,
            condition: None,
            builder,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl Rule for PatternRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> RuleResult {
        ctx.budget().check_deadline()?;
        let binding = {
            let condition = self.condition;
            find_matches(store, ctx, &self.pattern, expr)
                .find(|b| condition.map_or(true, |c| c(store, ctx, b)))
        };
        let Some(binding) = binding else {
            return Ok(None);
        };
        ctx.budget().charge_rewrite()?;
        let rewrite = (self.builder)(store, ctx, &binding);
        if rewrite.result == expr {
            // A rewrite that reproduces its input would loop forever under
            // fixpoint iteration; treat it as not applicable.
            return Ok(None);
        }
        tracing::debug!(
            rule = self.name,
            from = %store.canonical(expr),
            to = %store.canonical(rewrite.result),
            "rule applied"
        );
        let mappings = if rewrite.mappings.is_empty() {
            vec![PathMapping::new(
                MappingKind::Transform,
                vec![Path::main()],
                vec![Path::main()],
            )]
        } else {
            rewrite.mappings
        };
        Ok(Some(Transformation::rule(
            rewrite.explanation,
            expr,
            rewrite.result,
            mappings,
            rewrite.params,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatChild, Slot};
    use num_traits::Zero;
    use stepmath_ast::Expr;

    const A: Slot = Slot(0);
    const B: Slot = Slot(1);

    fn add_integers(store: &mut Store, _ctx: &Context, binding: &Binding) -> Rewrite {
        let (a, b) = (binding.expr(A), binding.expr(B));
        let (Expr::Integer(x), Expr::Integer(y)) = (store.get(a).clone(), store.get(b).clone())
        else {
            unreachable!()
        };
        let sum = store.integer(x + y);
        let result = binding.substitute_matched(store, &Path::main(), &[sum]);
        Rewrite::new(result, Explanation::AddIntegers).with_mappings(vec![PathMapping::new(
            MappingKind::Combine,
            binding.matched_paths(),
            vec![Path::main()],
        )])
    }

    fn test_rule() -> PatternRule {
        let pat = Pat::sum_partial(vec![
            PatChild::required(Pat::any_integer(A)),
            PatChild::required(Pat::any_integer(B)),
        ]);
        PatternRule::new("add_integers", pat, add_integers)
    }

    #[test]
    fn fires_and_records_a_step() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let three = store.int(3);
        let sum = store.sum(vec![two, x, three]);
        let ctx = Context::new();

        let step = test_rule().apply(&mut store, &ctx, sum).unwrap().unwrap();
        assert_eq!(store.canonical(step.to), "5 + x");
        assert_eq!(step.explanation.key, Explanation::AddIntegers);
        assert_eq!(step.path_mappings.len(), 1);
    }

    #[test]
    fn declines_without_a_match() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let sum = store.sum(vec![x, two]);
        let ctx = Context::new();

        assert!(test_rule().apply(&mut store, &ctx, sum).unwrap().is_none());
    }

    #[test]
    fn condition_filters_bindings() {
        fn first_is_zero(store: &Store, _ctx: &Context, b: &Binding) -> bool {
            matches!(store.get(b.expr(A)), Expr::Integer(n) if n.is_zero())
        }

        let mut store = Store::new();
        let two = store.int(2);
        let zero = store.int(0);
        let x = store.var("x");
        let sum = store.sum(vec![two, zero, x]);
        let ctx = Context::new();

        let rule = test_rule().with_condition(first_is_zero);
        let step = rule.apply(&mut store, &ctx, sum).unwrap().unwrap();
        // The condition forced the zero into slot A.
        assert_eq!(store.canonical(step.to), "2 + x");
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let mut store = Store::new();
        let one = store.int(1);
        let two = store.int(2);
        let sum = store.sum(vec![one, two]);
        let ctx = Context::new().with_budget(crate::context::Budget::with_rewrites(0));

        let err = test_rule().apply(&mut store, &ctx, sum).unwrap_err();
        assert!(matches!(err, EngineError::RewriteBudgetExceeded));
    }
}
