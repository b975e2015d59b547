use crate::explanation::Explanation;
use stepmath_ast::{substitute_at, ExprId, Path, PathMapping, PathRoot, Store};

/// What produced a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    /// An atomic rewrite; has no child steps.
    Rule,
    /// A chain of steps, each transforming the previous result.
    Plan,
    /// A case split into independent tasks; the collected result of the
    /// tasks is the result of the whole transformation.
    TaskSet,
}

/// Explanation key plus highlighted parameter expressions; purely for
/// human-facing rendering, no computational weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub key: Explanation,
    pub params: Vec<ExprId>,
}

impl Metadata {
    pub fn new(key: Explanation) -> Self {
        Metadata {
            key,
            params: Vec::new(),
        }
    }

    pub fn with_params(key: Explanation, params: Vec<ExprId>) -> Self {
        Metadata { key, params }
    }
}

/// An independent sub-derivation of a case split, e.g. "#1: solve
/// x + 2 = 0". Paths inside its steps are rooted at `#id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u16,
    pub start: ExprId,
    pub result: ExprId,
    pub explanation: Metadata,
    pub steps: Vec<Transformation>,
}

/// A recorded rewrite: before and after expressions, explanation metadata,
/// nested sub-steps and/or case-split tasks, and the path mappings that
/// trace every surviving node of `to` back into `from`.
///
/// Built bottom-up as plans succeed; a plan that does not apply produces
/// no transformation at all rather than an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub kind: TransformationKind,
    pub from: ExprId,
    pub to: ExprId,
    pub explanation: Metadata,
    pub steps: Vec<Transformation>,
    pub tasks: Vec<Task>,
    pub path_mappings: Vec<PathMapping>,
}

impl Transformation {
    pub fn rule(
        key: Explanation,
        from: ExprId,
        to: ExprId,
        path_mappings: Vec<PathMapping>,
        params: Vec<ExprId>,
    ) -> Self {
        Transformation {
            kind: TransformationKind::Rule,
            from,
            to,
            explanation: Metadata::with_params(key, params),
            steps: Vec::new(),
            tasks: Vec::new(),
            path_mappings,
        }
    }

    pub fn plan(key: Explanation, from: ExprId, to: ExprId, steps: Vec<Transformation>) -> Self {
        Transformation {
            kind: TransformationKind::Plan,
            from,
            to,
            explanation: Metadata::new(key),
            steps,
            tasks: Vec::new(),
            path_mappings: Vec::new(),
        }
    }

    pub fn task_set(key: Explanation, from: ExprId, to: ExprId, tasks: Vec<Task>) -> Self {
        Transformation {
            kind: TransformationKind::TaskSet,
            from,
            to,
            explanation: Metadata::new(key),
            steps: Vec::new(),
            tasks,
            path_mappings: Vec::new(),
        }
    }

    /// Re-anchor a transformation that happened at `base` inside the larger
    /// tree `outer_from`: before/after become whole-tree expressions and
    /// every recorded path is prefixed, so UI highlighting still lands on
    /// the right nodes. Child steps are re-anchored along the evolving
    /// outer expression.
    pub fn embedded_at(&self, store: &mut Store, base: &Path, outer_from: ExprId) -> Self {
        if base.is_empty() {
            return self.clone();
        }
        let outer_to = substitute_at(store, outer_from, base, self.to);
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut current = outer_from;
        for step in &self.steps {
            let embedded = step.embedded_at(store, base, current);
            current = embedded.to;
            steps.push(embedded);
        }
        Transformation {
            kind: self.kind,
            from: outer_from,
            to: outer_to,
            explanation: self.explanation.clone(),
            steps,
            tasks: self.tasks.clone(),
            path_mappings: self
                .path_mappings
                .iter()
                .map(|m| m.prefixed_with(base))
                .collect(),
        }
    }

    /// Move every recorded path onto `root`; used when a derivation becomes
    /// the body of task `#n`.
    pub fn rebased_on(&self, root: PathRoot) -> Self {
        Transformation {
            kind: self.kind,
            from: self.from,
            to: self.to,
            explanation: self.explanation.clone(),
            steps: self.steps.iter().map(|s| s.rebased_on(root)).collect(),
            tasks: self.tasks.clone(),
            path_mappings: self
                .path_mappings
                .iter()
                .map(|m| m.with_root(root))
                .collect(),
        }
    }

    /// Explanation keys of the atomic rewrites in derivation order,
    /// descending through plans and tasks. The stable shape of a
    /// derivation for assertions and logging.
    pub fn rule_explanations(&self) -> Vec<Explanation> {
        let mut keys = Vec::new();
        self.collect_rule_explanations(&mut keys);
        keys
    }

    fn collect_rule_explanations(&self, keys: &mut Vec<Explanation>) {
        match self.kind {
            TransformationKind::Rule => keys.push(self.explanation.key),
            TransformationKind::Plan => {
                for step in &self.steps {
                    step.collect_rule_explanations(keys);
                }
            }
            TransformationKind::TaskSet => {
                for task in &self.tasks {
                    for step in &task.steps {
                        step.collect_rule_explanations(keys);
                    }
                }
            }
        }
    }
}
