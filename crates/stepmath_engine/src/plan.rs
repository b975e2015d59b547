//! Plan combinators.
//!
//! A [`Plan`] is anything that can turn an expression into a recorded
//! [`Transformation`], from a single rule up to a whole solving pipeline.
//! Combinators compose plans: alternatives, chaining, fixed-point
//! iteration, deep application and case splits. All of them treat
//! "not applicable" (`Ok(None)`) as ordinary flow and pass errors through
//! unchanged.

use crate::context::Context;
use crate::error::EngineError;
use crate::explanation::Explanation;
use crate::rule::Rule;
use crate::settings::Setting;
use crate::transformation::{Metadata, Task, Transformation};
use stepmath_ast::{ExprId, Path, PathRoot, Store};
use std::rc::Rc;

pub type PlanResult = Result<Option<Transformation>, EngineError>;

pub trait Plan {
    fn name(&self) -> &str;

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult;
}

/// Every rule is a single-step plan.
impl<R: Rule> Plan for R {
    fn name(&self) -> &str {
        Rule::name(self)
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        self.apply(store, ctx, expr)
    }
}

/// Ordered alternatives; the first applicable one wins and its
/// transformation is passed through unwrapped.
pub struct FirstOf {
    name: &'static str,
    options: Vec<Rc<dyn Plan>>,
}

impl FirstOf {
    pub fn new(name: &'static str, options: Vec<Rc<dyn Plan>>) -> Self {
        FirstOf { name, options }
    }
}

impl Plan for FirstOf {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        for option in &self.options {
            if let Some(t) = option.run(store, ctx, expr)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

struct SeqStep {
    plan: Rc<dyn Plan>,
    optional: bool,
}

/// All-or-nothing chaining: each step transforms the previous result. A
/// required step that does not apply aborts the whole sequence; optional
/// steps are skipped silently. The recorded transformation is a `Plan`
/// node wrapping the steps that did fire.
pub struct Sequence {
    name: &'static str,
    key: Explanation,
    steps: Vec<SeqStep>,
}

impl Sequence {
    pub fn new(name: &'static str, key: Explanation) -> Self {
        Sequence {
            name,
            key,
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, plan: Rc<dyn Plan>) -> Self {
        self.steps.push(SeqStep {
            plan,
            optional: false,
        });
        self
    }

    pub fn then_optional(mut self, plan: Rc<dyn Plan>) -> Self {
        self.steps.push(SeqStep {
            plan,
            optional: true,
        });
        self
    }
}

impl Plan for Sequence {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        ctx.budget().check_deadline()?;
        let mut current = expr;
        let mut recorded = Vec::new();
        for step in &self.steps {
            match step.plan.run(store, ctx, current)? {
                Some(t) => {
                    current = t.to;
                    recorded.push(t);
                }
                None if step.optional => {}
                None => return Ok(None),
            }
        }
        if recorded.is_empty() || current == expr {
            return Ok(None);
        }
        Ok(Some(Transformation::plan(self.key, expr, current, recorded)))
    }
}

/// Repeat an inner plan until it stops applying. Progress is guaranteed by
/// the rules themselves (an identity rewrite counts as not applicable); the
/// iteration cap only guards against rule pairs that undo each other, and
/// hitting it is an error, not a silent stop.
pub struct WhileApplicable {
    name: &'static str,
    key: Explanation,
    inner: Rc<dyn Plan>,
    max_iterations: Option<u32>,
}

impl WhileApplicable {
    pub fn new(name: &'static str, key: Explanation, inner: Rc<dyn Plan>) -> Self {
        WhileApplicable {
            name,
            key,
            inner,
            max_iterations: None,
        }
    }

    pub fn with_max_iterations(mut self, cap: u32) -> Self {
        self.max_iterations = Some(cap);
        self
    }
}

impl Plan for WhileApplicable {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        let cap = self
            .max_iterations
            .unwrap_or_else(|| ctx.integer_setting(Setting::MaxFixpointIterations));
        let mut current = expr;
        let mut recorded = Vec::new();
        loop {
            ctx.budget().check_deadline()?;
            if recorded.len() as u32 >= cap {
                return Err(EngineError::IterationBudgetExceeded {
                    plan: self.name.to_string(),
                    limit: cap,
                });
            }
            match self.inner.run(store, ctx, current)? {
                Some(t) => {
                    if t.to == current {
                        break;
                    }
                    current = t.to;
                    recorded.push(t);
                }
                None => break,
            }
        }
        if current == expr {
            return Ok(None);
        }
        if ctx.is_set(Setting::SkipTrivialSteps) {
            recorded.retain(|t| !t.explanation.key.is_trivial());
        }
        // A lone step spanning the whole derivation needs no wrapper. After
        // elision the remaining step may cover only part of it; keep the
        // wrapper then so from/to still bracket the full rewrite.
        if recorded.len() == 1 && recorded[0].from == expr && recorded[0].to == current {
            return Ok(recorded.pop());
        }
        Ok(Some(Transformation::plan(self.key, expr, current, recorded)))
    }
}

/// Visit order for [`Deeply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Try the node before its children; the shallowest applicable path
    /// wins.
    PreOrder,
    /// Try children first; the leftmost innermost applicable path wins.
    PostOrder,
}

/// Apply an inner plan at the first path (in traversal order) where it
/// applies, then re-anchor the recorded transformation onto the whole
/// tree so its paths and mappings stay valid.
pub struct Deeply {
    name: &'static str,
    inner: Rc<dyn Plan>,
    traversal: Traversal,
}

impl Deeply {
    pub fn new(name: &'static str, inner: Rc<dyn Plan>, traversal: Traversal) -> Self {
        Deeply {
            name,
            inner,
            traversal,
        }
    }

    fn run_at(
        &self,
        store: &mut Store,
        ctx: &Context,
        root: ExprId,
        path: Path,
        node: ExprId,
    ) -> PlanResult {
        if self.traversal == Traversal::PreOrder {
            if let Some(t) = self.apply_here(store, ctx, root, &path, node)? {
                return Ok(Some(t));
            }
        }
        for (i, child) in store.children(node).into_iter().enumerate() {
            if let Some(t) = self.run_at(store, ctx, root, path.child(i as u32), child)? {
                return Ok(Some(t));
            }
        }
        if self.traversal == Traversal::PostOrder {
            if let Some(t) = self.apply_here(store, ctx, root, &path, node)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn apply_here(
        &self,
        store: &mut Store,
        ctx: &Context,
        root: ExprId,
        path: &Path,
        node: ExprId,
    ) -> PlanResult {
        match self.inner.run(store, ctx, node)? {
            Some(t) => Ok(Some(t.embedded_at(store, path, root))),
            None => Ok(None),
        }
    }
}

impl Plan for Deeply {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        self.run_at(store, ctx, expr, Path::main(), expr)
    }
}

/// Gate an inner plan behind a cheap structural check.
pub struct Guarded {
    name: &'static str,
    guard: fn(&Store, &Context, ExprId) -> bool,
    inner: Rc<dyn Plan>,
}

impl Guarded {
    pub fn new(
        name: &'static str,
        guard: fn(&Store, &Context, ExprId) -> bool,
        inner: Rc<dyn Plan>,
    ) -> Self {
        Guarded { name, guard, inner }
    }
}

impl Plan for Guarded {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        if !(self.guard)(store, ctx, expr) {
            return Ok(None);
        }
        self.inner.run(store, ctx, expr)
    }
}

pub type Scorer = fn(&Store, &Transformation) -> i64;

/// Default branch scorer: fewer residual free variables is better.
pub fn residual_variable_count(store: &Store, t: &Transformation) -> i64 {
    store.free_variables(t.to).len() as i64
}

/// Run every candidate and keep the best-scoring applicable outcome;
/// candidate order breaks ties. Used when alternatives are genuinely
/// competing instead of ordered by preference.
pub struct BranchAndPickBest {
    name: &'static str,
    candidates: Vec<Rc<dyn Plan>>,
    scorer: Scorer,
}

impl BranchAndPickBest {
    pub fn new(name: &'static str, candidates: Vec<Rc<dyn Plan>>) -> Self {
        BranchAndPickBest {
            name,
            candidates,
            scorer: residual_variable_count,
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }
}

impl Plan for BranchAndPickBest {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        let mut best: Option<(i64, Transformation)> = None;
        for candidate in &self.candidates {
            if let Some(t) = candidate.run(store, ctx, expr)? {
                let score = (self.scorer)(store, &t);
                let better = match &best {
                    Some((best_score, _)) => score < *best_score,
                    None => true,
                };
                if better {
                    best = Some((score, t));
                }
            }
        }
        Ok(best.map(|(_, t)| t))
    }
}

/// One case of a split, as produced by a [`TaskSetPlan`] splitter.
pub struct CaseSpec {
    pub start: ExprId,
    pub explanation: Metadata,
}

/// What a collector made of the finished tasks: the merged result and the
/// explanation for the final collection task.
pub struct Collected {
    pub result: ExprId,
    pub explanation: Metadata,
}

pub type Splitter = fn(&mut Store, &Context, ExprId) -> Option<Vec<CaseSpec>>;
pub type Collector = fn(&mut Store, &Context, &[Task]) -> Option<Collected>;

/// Case splitting: the splitter carves the problem into independent
/// sub-problems, each solved by the worker plan as task `#k`, and the
/// collector merges the outcomes into one result recorded as a final
/// collection task. Tasks share the parent's budget, so a split cannot
/// multiply it.
pub struct TaskSetPlan {
    name: &'static str,
    key: Explanation,
    splitter: Splitter,
    worker: Rc<dyn Plan>,
    collector: Collector,
}

impl TaskSetPlan {
    pub fn new(
        name: &'static str,
        key: Explanation,
        splitter: Splitter,
        worker: Rc<dyn Plan>,
        collector: Collector,
    ) -> Self {
        TaskSetPlan {
            name,
            key,
            splitter,
            worker,
            collector,
        }
    }
}

impl Plan for TaskSetPlan {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, store: &mut Store, ctx: &Context, expr: ExprId) -> PlanResult {
        let Some(cases) = (self.splitter)(store, ctx, expr) else {
            return Ok(None);
        };
        if cases.is_empty() {
            return Ok(None);
        }
        let mut tasks = Vec::with_capacity(cases.len() + 1);
        for (k, case) in cases.into_iter().enumerate() {
            ctx.budget().check_deadline()?;
            let id = (k + 1) as u16;
            let (result, steps) = match self.worker.run(store, ctx, case.start)? {
                Some(t) => (t.to, vec![t.rebased_on(PathRoot::Task(id))]),
                None => (case.start, Vec::new()),
            };
            tasks.push(Task {
                id,
                start: case.start,
                result,
                explanation: case.explanation,
                steps,
            });
        }
        let Some(collected) = (self.collector)(store, ctx, &tasks) else {
            return Ok(None);
        };
        let collect_id = (tasks.len() + 1) as u16;
        tasks.push(Task {
            id: collect_id,
            start: collected.result,
            result: collected.result,
            explanation: collected.explanation,
            steps: Vec::new(),
        });
        Ok(Some(Transformation::task_set(
            self.key,
            expr,
            collected.result,
            tasks,
        )))
    }
}
