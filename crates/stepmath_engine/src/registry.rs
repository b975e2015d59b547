//! Named plan registry and the public solving entry point.

use crate::context::Context;
use crate::error::EngineError;
use crate::plan::{Plan, PlanResult};
use rustc_hash::FxHashMap;
use stepmath_ast::{ExprId, Store};
use std::rc::Rc;

/// Plans addressable by a stable id. Iteration order is registration
/// order, so discovery listings stay deterministic.
#[derive(Default)]
pub struct PlanRegistry {
    plans: Vec<(String, Rc<dyn Plan>)>,
    index: FxHashMap<String, usize>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        PlanRegistry::default()
    }

    /// Register under `id`; a repeated id replaces the earlier plan but
    /// keeps its position.
    pub fn register(&mut self, id: &str, plan: Rc<dyn Plan>) {
        match self.index.get(id) {
            Some(&slot) => self.plans[slot] = (id.to_string(), plan),
            None => {
                self.index.insert(id.to_string(), self.plans.len());
                self.plans.push((id.to_string(), plan));
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&Rc<dyn Plan>> {
        self.index.get(id).map(|&slot| &self.plans[slot].1)
    }

    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|(id, _)| id.as_str())
    }
}

/// Run the registered plan `plan_id` on `expr`.
///
/// The single public entry point: it validates the caller's input (the
/// plan must exist and every declared solution variable must occur in the
/// expression) and then defers to the plan. A well-formed input the plan
/// cannot handle is `Ok(None)`.
pub fn solve(
    store: &mut Store,
    ctx: &Context,
    registry: &PlanRegistry,
    plan_id: &str,
    expr: ExprId,
) -> PlanResult {
    let plan = registry
        .lookup(plan_id)
        .ok_or_else(|| EngineError::UnknownPlan(plan_id.to_string()))?;
    for var in ctx.solution_variables() {
        if !store.contains_variable(expr, var) {
            return Err(EngineError::UnknownVariable(var.as_str().to_string()));
        }
    }
    tracing::debug!(plan = plan_id, input = %store.canonical(expr), "solve");
    plan.run(store, ctx, expr)
}
