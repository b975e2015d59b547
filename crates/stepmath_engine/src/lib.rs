//! The stepmath rewriting engine.
//!
//! The engine turns an input expression into a [`Transformation`] tree: a
//! recorded, replayable derivation with nested steps, case-split tasks,
//! explanation metadata and path mappings. Control flow is dominated by
//! "not applicable": a rule or plan that does not fire returns `Ok(None)`,
//! never an error. Errors are reserved for malformed input and exhausted
//! budgets.

pub mod context;
pub mod error;
pub mod explanation;
pub mod matcher;
pub mod pattern;
pub mod plan;
pub mod registry;
pub mod rule;
pub mod settings;
pub mod strategy;
pub mod transformation;

pub use context::{Budget, Context};
pub use error::EngineError;
pub use explanation::Explanation;
pub use matcher::{find_matches, Binding};
pub use pattern::{Pat, PatChild, Slot};
pub use plan::{
    BranchAndPickBest, CaseSpec, Collected, Deeply, FirstOf, Guarded, Plan, PlanResult, Sequence,
    TaskSetPlan, Traversal, WhileApplicable,
};
pub use registry::{solve, PlanRegistry};
pub use rule::{PatternRule, Rewrite, Rule, RuleResult};
pub use settings::{Preset, Setting, SettingValue};
pub use strategy::{Strategy, StrategyCategory, StrategySelector};
pub use transformation::{Metadata, Task, Transformation, TransformationKind};
