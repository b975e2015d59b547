//! Named, user-selectable solving strategies.
//!
//! Several genuinely different methods can solve the same problem class
//! (a quadratic yields to factoring, the formula, or completing the
//! square). Each is registered as a [`Strategy`] under a
//! [`StrategyCategory`]; a [`StrategySelector`] honors an explicit
//! preference from the context and otherwise runs every registered
//! strategy and keeps the best outcome.

use crate::context::Context;
use crate::error::EngineError;
use crate::plan::{residual_variable_count, Plan, PlanResult};
use stepmath_ast::{ExprId, Store};
use std::rc::Rc;

/// Problem classes that admit competing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyCategory {
    LinearEquations,
    QuadraticEquations,
}

impl StrategyCategory {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyCategory::LinearEquations => "LinearEquations",
            StrategyCategory::QuadraticEquations => "QuadraticEquations",
        }
    }
}

pub struct Strategy {
    pub id: &'static str,
    pub description: &'static str,
    /// Higher wins among equally-scored outcomes.
    pub priority: i32,
    /// Whether solutions found by this strategy warrant substituting
    /// back. Registrants wrap the plan of a verifying strategy in their
    /// verification combinator; the flag records that decision.
    pub verify: bool,
    pub plan: Rc<dyn Plan>,
}

/// Plan that resolves which strategy of a category to use.
///
/// An explicit preference in the context is authoritative when its
/// strategy applies; an unknown preferred id is a caller error. Without a
/// preference all strategies run and the outcome with the fewest residual
/// free variables wins, ties broken by priority and then registration
/// order.
pub struct StrategySelector {
    category: StrategyCategory,
    strategies: Vec<Strategy>,
}

impl StrategySelector {
    pub fn new(category: StrategyCategory) -> Self {
        StrategySelector {
            category,
            strategies: Vec::new(),
        }
    }

    pub fn register(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn category(&self) -> StrategyCategory {
        self.category
    }

    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }

    pub fn lookup(&self, id: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id == id)
    }
}

impl Plan for StrategySelector {
    fn name(&self) -> &str {
        self.category.name()
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        if let Some(preferred) = ctx.preferred_strategy(self.category) {
            let strategy = self
                .lookup(preferred)
                .ok_or_else(|| EngineError::UnknownStrategy(preferred.to_string()))?;
            if let Some(t) = strategy.plan.run(store, ctx, expr)? {
                tracing::debug!(
                    category = self.category.name(),
                    strategy = strategy.id,
                    "preferred strategy applied"
                );
                return Ok(Some(t));
            }
            // The preference did not apply to this input; fall back to the
            // open competition below.
        }

        let mut best: Option<(i64, i32, usize)> = None;
        let mut best_transformation = None;
        for (index, strategy) in self.strategies.iter().enumerate() {
            if let Some(t) = strategy.plan.run(store, ctx, expr)? {
                let score = residual_variable_count(store, &t);
                let candidate = (score, -strategy.priority, index);
                if best.map_or(true, |b| candidate < b) {
                    best = Some(candidate);
                    best_transformation = Some((strategy.id, t));
                }
            }
        }
        if let Some((id, t)) = best_transformation {
            tracing::debug!(
                category = self.category.name(),
                strategy = id,
                "strategy selected by score"
            );
            return Ok(Some(t));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explanation::Explanation;
    use crate::transformation::Transformation;

    struct Fixed {
        name: &'static str,
        to: Option<ExprId>,
    }

    impl Plan for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _store: &mut Store, _ctx: &Context, expr: ExprId) -> PlanResult {
            Ok(self.to.map(|to| {
                Transformation::rule(Explanation::SolveEquation, expr, to, Vec::new(), Vec::new())
            }))
        }
    }

    fn strategy(id: &'static str, priority: i32, to: Option<ExprId>) -> Strategy {
        Strategy {
            id,
            description: "",
            priority,
            verify: false,
            plan: Rc::new(Fixed { name: id, to }),
        }
    }

    #[test]
    fn preference_wins_when_applicable() {
        let mut store = Store::new();
        let a = store.var("a");
        let one = store.int(1);
        let two = store.int(2);
        let ctx =
            Context::new().with_strategy(StrategyCategory::QuadraticEquations, "second");

        let selector = StrategySelector::new(StrategyCategory::QuadraticEquations)
            .register(strategy("first", 10, Some(one)))
            .register(strategy("second", 0, Some(two)));
        let t = selector.run(&mut store, &ctx, a).unwrap().unwrap();
        assert_eq!(t.to, two);
    }

    #[test]
    fn unknown_preference_is_an_error() {
        let mut store = Store::new();
        let a = store.var("a");
        let ctx = Context::new().with_strategy(StrategyCategory::QuadraticEquations, "nope");

        let selector = StrategySelector::new(StrategyCategory::QuadraticEquations)
            .register(strategy("first", 0, None));
        let err = selector.run(&mut store, &ctx, a).unwrap_err();
        assert_eq!(err, EngineError::UnknownStrategy("nope".to_string()));
    }

    #[test]
    fn score_then_priority_then_order() {
        let mut store = Store::new();
        let a = store.var("a");
        let x = store.var("x");
        let five = store.int(5);
        let six = store.int(6);
        let ctx = Context::new();

        // "vague" leaves a free variable, so any constant result beats it;
        // between the two constant results the higher priority wins.
        let selector = StrategySelector::new(StrategyCategory::QuadraticEquations)
            .register(strategy("vague", 100, Some(x)))
            .register(strategy("low", 0, Some(five)))
            .register(strategy("high", 5, Some(six)));
        let t = selector.run(&mut store, &ctx, a).unwrap().unwrap();
        assert_eq!(t.to, six);
    }

    #[test]
    fn inapplicable_preference_falls_back() {
        let mut store = Store::new();
        let a = store.var("a");
        let one = store.int(1);
        let ctx =
            Context::new().with_strategy(StrategyCategory::QuadraticEquations, "declines");

        let selector = StrategySelector::new(StrategyCategory::QuadraticEquations)
            .register(strategy("declines", 10, None))
            .register(strategy("works", 0, Some(one)));
        let t = selector.run(&mut store, &ctx, a).unwrap().unwrap();
        assert_eq!(t.to, one);
    }
}
