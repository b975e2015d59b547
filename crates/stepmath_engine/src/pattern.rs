use stepmath_ast::{ExprId, RelOp, Store};

/// Name of a pattern variable. Rules declare their slots as consts and use
/// them both in the pattern and in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub u8);

/// Extra structural check on a candidate node, applied before binding.
pub type NodePredicate = fn(&Store, ExprId) -> bool;

/// A matchable template over expressions.
///
/// Patterns are constructed once per rule and matched many times; they are
/// never interned in a store. Wildcard leaves bind slots; `Sum`/`Product`
/// patterns match commutatively, and with `partial: true` they match a
/// subset of the operands, leaving the rest available to the builder
/// through the binding.
#[derive(Debug)]
pub enum Pat {
    /// Bind any expression.
    Any(Slot),
    /// Bind an expression satisfying the predicate.
    Cond(Slot, NodePredicate),
    /// Match a specific integer literal; binds nothing.
    IntegerValue(i64),
    /// Bind an integer leaf.
    AnyInteger(Slot),
    /// Bind a variable leaf.
    AnyVariable(Slot),
    /// Match the context's solution variable; binds nothing.
    SolutionVariable,
    /// Match `p` or `-p`; the slot binds the whole matched expression
    /// (including the sign) and the binding records whether the sign was
    /// negative. The unnegated form is tried first on non-negated nodes.
    OptNeg(Slot, Box<Pat>),
    Sum {
        children: Vec<PatChild>,
        partial: bool,
    },
    Product {
        children: Vec<PatChild>,
        partial: bool,
    },
    Fraction(Box<Pat>, Box<Pat>),
    Power(Box<Pat>, Box<Pat>),
    Root(Box<Pat>, Box<Pat>),
    Neg(Box<Pat>),
    PlusMinus(Box<Pat>),
    Relation {
        lhs: Box<Pat>,
        /// `None` matches any relational operator.
        op: Option<RelOp>,
        rhs: Box<Pat>,
    },
    /// Bind the slot to the whole subtree while also matching `p` on it.
    Capture(Slot, Box<Pat>),
}

/// A child of an n-ary pattern. An optional child is tried bound-first:
/// enumeration yields the matches where it is bound before the ones where
/// it is skipped, so the most specific interpretation wins.
#[derive(Debug)]
pub struct PatChild {
    pub pat: Pat,
    pub optional: bool,
}

impl PatChild {
    pub fn required(pat: Pat) -> Self {
        PatChild {
            pat,
            optional: false,
        }
    }

    pub fn optional(pat: Pat) -> Self {
        PatChild {
            pat,
            optional: true,
        }
    }
}

impl Pat {
    pub fn any(slot: Slot) -> Pat {
        Pat::Any(slot)
    }

    pub fn cond(slot: Slot, pred: NodePredicate) -> Pat {
        Pat::Cond(slot, pred)
    }

    pub fn integer(value: i64) -> Pat {
        Pat::IntegerValue(value)
    }

    pub fn any_integer(slot: Slot) -> Pat {
        Pat::AnyInteger(slot)
    }

    pub fn any_variable(slot: Slot) -> Pat {
        Pat::AnyVariable(slot)
    }

    pub fn solution_variable() -> Pat {
        Pat::SolutionVariable
    }

    pub fn opt_neg(slot: Slot, inner: Pat) -> Pat {
        Pat::OptNeg(slot, Box::new(inner))
    }

    /// Commutative sum matching exactly these children.
    pub fn sum(children: Vec<PatChild>) -> Pat {
        Pat::Sum {
            children,
            partial: false,
        }
    }

    /// Commutative sum matching these children among others; the
    /// unmatched rest stays available to the builder.
    pub fn sum_partial(children: Vec<PatChild>) -> Pat {
        Pat::Sum {
            children,
            partial: true,
        }
    }

    pub fn product(children: Vec<PatChild>) -> Pat {
        Pat::Product {
            children,
            partial: false,
        }
    }

    pub fn product_partial(children: Vec<PatChild>) -> Pat {
        Pat::Product {
            children,
            partial: true,
        }
    }

    pub fn fraction(num: Pat, den: Pat) -> Pat {
        Pat::Fraction(Box::new(num), Box::new(den))
    }

    pub fn power(base: Pat, exp: Pat) -> Pat {
        Pat::Power(Box::new(base), Box::new(exp))
    }

    pub fn root(radicand: Pat, degree: Pat) -> Pat {
        Pat::Root(Box::new(radicand), Box::new(degree))
    }

    pub fn neg(inner: Pat) -> Pat {
        Pat::Neg(Box::new(inner))
    }

    pub fn plus_minus(inner: Pat) -> Pat {
        Pat::PlusMinus(Box::new(inner))
    }

    pub fn relation(lhs: Pat, op: Option<RelOp>, rhs: Pat) -> Pat {
        Pat::Relation {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn equation(lhs: Pat, rhs: Pat) -> Pat {
        Pat::relation(lhs, Some(RelOp::Eq), rhs)
    }

    pub fn capture(slot: Slot, inner: Pat) -> Pat {
        Pat::Capture(slot, Box::new(inner))
    }
}
