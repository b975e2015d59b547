use crate::error::EngineError;
use crate::settings::{Preset, Setting, SettingValue};
use crate::strategy::StrategyCategory;
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

const MINIMUM_PRECISION: u8 = 2;
const DEFAULT_PRECISION: u8 = 3;
const MAXIMUM_PRECISION: u8 = 10;

/// Defensive resource budget for one top-level request.
///
/// The rewrite counter is shared between a context and every context
/// derived from it, so a case split cannot multiply the request's budget.
/// The deadline is checked at well-defined points (sequence entry,
/// fixed-point iterations, task boundaries).
#[derive(Debug, Clone)]
pub struct Budget {
    remaining_rewrites: Rc<Cell<u64>>,
    deadline: Option<Instant>,
}

impl Default for Budget {
    fn default() -> Self {
        Budget::with_rewrites(100_000)
    }
}

impl Budget {
    pub fn with_rewrites(max_rewrites: u64) -> Self {
        Budget {
            remaining_rewrites: Rc::new(Cell::new(max_rewrites)),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn charge_rewrite(&self) -> Result<(), EngineError> {
        let left = self.remaining_rewrites.get();
        if left == 0 {
            return Err(EngineError::RewriteBudgetExceeded);
        }
        self.remaining_rewrites.set(left - 1);
        Ok(())
    }

    pub fn check_deadline(&self) -> Result<(), EngineError> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => Err(EngineError::Interrupted),
            _ => Ok(()),
        }
    }
}

/// Immutable per-request solving configuration.
///
/// Built once per external request and threaded by value through every
/// plan invocation. A plan that needs different configuration derives a
/// copy (`with_*`) and uses it for the sub-computation only; nothing is
/// ever mutated in place. Logging goes through `tracing`, so the context
/// carries no sink of its own.
#[derive(Debug, Clone)]
pub struct Context {
    solution_variables: Vec<stepmath_ast::Symbol>,
    precision: u8,
    settings: FxHashMap<Setting, SettingValue>,
    preferred_strategies: FxHashMap<StrategyCategory, String>,
    budget: Budget,
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            solution_variables: Vec::new(),
            precision: DEFAULT_PRECISION,
            settings: FxHashMap::default(),
            preferred_strategies: FxHashMap::default(),
            budget: Budget::default(),
        }
    }

    pub fn solution_variables(&self) -> &[stepmath_ast::Symbol] {
        &self.solution_variables
    }

    /// The single solution variable, when solving in one variable.
    pub fn solution_variable(&self) -> Option<&stepmath_ast::Symbol> {
        self.solution_variables.first()
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn with_solution_variable(&self, sym: stepmath_ast::Symbol) -> Self {
        let mut ctx = self.clone();
        ctx.solution_variables = vec![sym];
        ctx
    }

    pub fn with_solution_variables(&self, syms: Vec<stepmath_ast::Symbol>) -> Self {
        let mut ctx = self.clone();
        ctx.solution_variables = syms;
        ctx
    }

    pub fn with_precision(&self, precision: u8) -> Self {
        let mut ctx = self.clone();
        ctx.precision = precision.clamp(MINIMUM_PRECISION, MAXIMUM_PRECISION);
        ctx
    }

    pub fn with_setting(&self, setting: Setting, value: SettingValue) -> Self {
        let mut ctx = self.clone();
        ctx.settings.insert(setting, value);
        ctx
    }

    /// Apply a preset's settings; resolved here, once, not per step.
    pub fn with_preset(&self, preset: Preset) -> Self {
        let mut ctx = self.clone();
        for (setting, value) in preset.settings() {
            ctx.settings.insert(setting, value);
        }
        ctx
    }

    pub fn with_strategy(&self, category: StrategyCategory, strategy_id: &str) -> Self {
        let mut ctx = self.clone();
        ctx.preferred_strategies
            .insert(category, strategy_id.to_string());
        ctx
    }

    pub fn with_budget(&self, budget: Budget) -> Self {
        let mut ctx = self.clone();
        ctx.budget = budget;
        ctx
    }

    pub fn setting(&self, setting: Setting) -> SettingValue {
        self.settings
            .get(&setting)
            .copied()
            .unwrap_or_else(|| setting.default_value())
    }

    pub fn is_set(&self, setting: Setting) -> bool {
        matches!(self.setting(setting), SettingValue::Bool(true))
    }

    pub fn integer_setting(&self, setting: Setting) -> u32 {
        match self.setting(setting) {
            SettingValue::Integer(n) => n,
            SettingValue::Bool(_) => 0,
        }
    }

    pub fn preferred_strategy(&self, category: StrategyCategory) -> Option<&str> {
        self.preferred_strategies.get(&category).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_methods_leave_original_untouched() {
        let ctx = Context::new();
        let derived = ctx
            .with_solution_variable("x".into())
            .with_setting(Setting::SkipTrivialSteps, SettingValue::Bool(true));
        assert!(ctx.solution_variables().is_empty());
        assert!(!ctx.is_set(Setting::SkipTrivialSteps));
        assert_eq!(derived.solution_variables().len(), 1);
        assert!(derived.is_set(Setting::SkipTrivialSteps));
    }

    #[test]
    fn precision_is_clamped() {
        let ctx = Context::new();
        assert_eq!(ctx.precision(), 3);
        assert_eq!(ctx.with_precision(0).precision(), 2);
        assert_eq!(ctx.with_precision(99).precision(), 10);
    }

    #[test]
    fn derived_contexts_share_the_rewrite_budget() {
        let ctx = Context::new().with_budget(Budget::with_rewrites(2));
        let derived = ctx.with_solution_variable("x".into());
        assert!(ctx.budget().charge_rewrite().is_ok());
        assert!(derived.budget().charge_rewrite().is_ok());
        assert_eq!(
            ctx.budget().charge_rewrite(),
            Err(EngineError::RewriteBudgetExceeded)
        );
    }

    #[test]
    fn preset_settings_resolve_at_construction() {
        let ctx = Context::new().with_preset(Preset::Concise);
        assert!(ctx.is_set(Setting::SkipTrivialSteps));
        assert!(!ctx.is_set(Setting::VerifySolutions));
    }
}
