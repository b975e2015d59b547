use std::fmt;

/// Explanation keys attached to transformations and tasks.
///
/// Keys are the stable vocabulary the presentation layer translates into
/// human-readable text; the engine only guarantees their identity and
/// ordering. The `Display` form is the canonical snake_case key string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Explanation {
    // Plan-level keys
    SimplifyExpression,
    NormalizeEquation,
    SolveEquation,
    SolveLinearEquation,
    SolveQuadraticEquation,
    SolveFactoredEquation,
    SolveFactor,
    SolveCase,
    CollectSolutions,
    CheckSolutions,

    // Fraction arithmetic
    MultiplyFractions,
    AddFractions,
    SimplifyFraction,

    // Integer arithmetic and identities
    AddIntegers,
    MultiplyIntegers,
    EvaluateIntegerPower,
    EvaluateRoot,
    AddZero,
    MultiplyByOne,
    MultiplyByZero,
    PowerOne,
    PowerZero,
    SimplifyDoubleNegative,
    NegateInteger,
    PropagateUndefined,

    // Collection and normal forms
    CombineLikeTerms,
    ReorderTerms,

    // Equation steps
    CancelCommonTerms,
    MoveVariableTermsLeft,
    MoveConstantsRight,
    DivideByCoefficient,
    NegateBothSides,
    ExtractSolution,
    ConstantIdentity,
    ConstantContradiction,
    UndefinedEquationContradiction,

    // Quadratic steps
    ApplyQuadraticFormula,
    FactorQuadratic,
    CompleteTheSquare,
    ExtractSquareRoot,
    SplitPlusMinus,
}

impl Explanation {
    pub fn key(self) -> &'static str {
        match self {
            Explanation::SimplifyExpression => "simplify_expression",
            Explanation::NormalizeEquation => "normalize_equation",
            Explanation::SolveEquation => "solve_equation",
            Explanation::SolveLinearEquation => "solve_linear_equation",
            Explanation::SolveQuadraticEquation => "solve_quadratic_equation",
            Explanation::SolveFactoredEquation => "solve_factored_equation",
            Explanation::SolveFactor => "solve_factor",
            Explanation::SolveCase => "solve_case",
            Explanation::CollectSolutions => "collect_solutions",
            Explanation::CheckSolutions => "check_solutions",
            Explanation::MultiplyFractions => "multiply_fractions",
            Explanation::AddFractions => "add_fractions",
            Explanation::SimplifyFraction => "simplify_fraction",
            Explanation::AddIntegers => "add_integers",
            Explanation::MultiplyIntegers => "multiply_integers",
            Explanation::EvaluateIntegerPower => "evaluate_integer_power",
            Explanation::EvaluateRoot => "evaluate_root",
            Explanation::AddZero => "add_zero",
            Explanation::MultiplyByOne => "multiply_by_one",
            Explanation::MultiplyByZero => "multiply_by_zero",
            Explanation::PowerOne => "power_one",
            Explanation::PowerZero => "power_zero",
            Explanation::SimplifyDoubleNegative => "simplify_double_negative",
            Explanation::NegateInteger => "negate_integer",
            Explanation::PropagateUndefined => "propagate_undefined",
            Explanation::CombineLikeTerms => "combine_like_terms",
            Explanation::ReorderTerms => "reorder_terms",
            Explanation::CancelCommonTerms => "cancel_common_terms",
            Explanation::MoveVariableTermsLeft => "move_variable_terms_left",
            Explanation::MoveConstantsRight => "move_constants_right",
            Explanation::DivideByCoefficient => "divide_by_coefficient",
            Explanation::NegateBothSides => "negate_both_sides",
            Explanation::ExtractSolution => "extract_solution",
            Explanation::ConstantIdentity => "constant_identity",
            Explanation::ConstantContradiction => "constant_contradiction",
            Explanation::UndefinedEquationContradiction => "undefined_equation_contradiction",
            Explanation::ApplyQuadraticFormula => "apply_quadratic_formula",
            Explanation::FactorQuadratic => "factor_quadratic",
            Explanation::CompleteTheSquare => "complete_the_square",
            Explanation::ExtractSquareRoot => "extract_square_root",
            Explanation::SplitPlusMinus => "split_plus_minus",
        }
    }

    /// Steps whose explanation changes nothing a reader cares about
    /// (identity removals and similar); these can be elided from recorded
    /// derivations via [`Setting::SkipTrivialSteps`](crate::settings::Setting).
    pub fn is_trivial(self) -> bool {
        matches!(
            self,
            Explanation::AddZero
                | Explanation::MultiplyByOne
                | Explanation::PowerOne
                | Explanation::SimplifyDoubleNegative
                | Explanation::NegateInteger
        )
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
