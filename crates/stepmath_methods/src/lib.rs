//! Concrete mathematics on top of `stepmath_engine`: arithmetic and
//! algebraic rewrite rules, expression simplification, and linear and
//! quadratic equation solving with step-by-step derivations.
//!
//! The crate exposes its methods as named plans through
//! [`default_registry`]; callers drive them with
//! [`stepmath_engine::solve`].

pub mod arithmetic;
pub mod collect;
pub mod equations;
pub mod fractions;
pub mod quadratics;
pub mod simplify;
mod terms;

use equations::WithVerification;
use std::rc::Rc;
use stepmath_engine::{FirstOf, Plan, PlanRegistry};

/// The standard plan table:
///
/// * `"simplify"` rewrites an expression to a simpler equivalent form.
/// * `"solve-linear"` and `"solve-quadratic"` solve one class each.
/// * `"solve-equation"` dispatches to whichever class matches, with
///   solution verification when the setting asks for it.
pub fn default_registry() -> PlanRegistry {
    let mut registry = PlanRegistry::new();
    registry.register("simplify", simplify::simplify_plan());
    // The quadratic plans verify per strategy, so only the linear solver
    // needs the wrapper here.
    let linear: Rc<dyn Plan> = Rc::new(WithVerification::new(equations::solve_linear_plan()));
    registry.register("solve-linear", linear.clone());
    registry.register("solve-quadratic", quadratics::solve_quadratic_plan());
    registry.register(
        "solve-equation",
        Rc::new(FirstOf::new(
            "solve_equation",
            vec![linear, quadratics::solve_quadratic_plan()],
        )),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_plans_in_registration_order() {
        let registry = default_registry();
        let ids: Vec<&str> = registry.list().collect();
        assert_eq!(
            ids,
            ["simplify", "solve-linear", "solve-quadratic", "solve-equation"]
        );
    }
}
