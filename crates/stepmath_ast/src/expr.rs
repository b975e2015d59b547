use crate::store::ExprId;
use crate::symbol::Symbol;
use num_bigint::BigInt;
use num_rational::BigRational;
use std::fmt;

/// Relational operator of a [`Expr::Relation`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelOp::Eq => write!(f, "="),
            RelOp::Neq => write!(f, "!="),
            RelOp::Lt => write!(f, "<"),
            RelOp::Gt => write!(f, ">"),
            RelOp::Leq => write!(f, "<="),
            RelOp::Geq => write!(f, ">="),
        }
    }
}

/// An algebraic expression node.
///
/// The type is a closed sum: the matcher and every rule builder match on it
/// exhaustively, so adding a node kind is a compile-checked, total change.
/// `Sum` and `Product` are n-ary; the [`Store`](crate::store::Store)
/// factories flatten nested occurrences so associativity is canonical by
/// construction. `Undefined` is a first-class value (division by zero, even
/// root of a negative), not an error: rules match on it and propagate it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Integer(BigInt),
    Decimal(BigRational),
    Variable(Symbol),
    Sum(Vec<ExprId>),
    Product(Vec<ExprId>),
    /// Numerator, denominator.
    Fraction(ExprId, ExprId),
    /// Base, exponent.
    Power(ExprId, ExprId),
    /// Radicand, degree.
    Root(ExprId, ExprId),
    Abs(ExprId),
    Neg(ExprId),
    /// The ± constructor produced by root extraction and the quadratic
    /// formula; eliminated by a case split into two tasks.
    PlusMinus(ExprId),
    Function(Symbol, Vec<ExprId>),
    Relation(ExprId, RelOp, ExprId),
    FiniteSet(Vec<ExprId>),
    /// Solved outcome: the named variables take the values in the set.
    SetSolution(Vec<Symbol>, ExprId),
    /// The relation reduced to an always-true residual (e.g. `6 = 6`).
    Identity(Vec<Symbol>, ExprId),
    /// The relation reduced to an always-false residual (e.g. `6 = -5`).
    Contradiction(Vec<Symbol>, ExprId),
    Undefined,
}

impl Expr {
    /// Children in path order. The order here is the address space used by
    /// [`Path`](crate::path::Path): index `i` is the `i`-th element of this
    /// list.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expr::Integer(_) | Expr::Decimal(_) | Expr::Variable(_) | Expr::Undefined => vec![],
            Expr::Sum(cs) | Expr::Product(cs) | Expr::FiniteSet(cs) => cs.clone(),
            Expr::Fraction(a, b) | Expr::Power(a, b) | Expr::Root(a, b) => vec![*a, *b],
            Expr::Abs(x) | Expr::Neg(x) | Expr::PlusMinus(x) => vec![*x],
            Expr::Function(_, args) => args.clone(),
            Expr::Relation(l, _, r) => vec![*l, *r],
            Expr::SetSolution(_, x) | Expr::Identity(_, x) | Expr::Contradiction(_, x) => vec![*x],
        }
    }

    /// Rebuild this node with child `index` replaced. Panics on an
    /// out-of-range index: paths are only valid relative to the tree they
    /// were produced for, so this is a programming error.
    pub fn with_child(&self, index: usize, new_child: ExprId) -> Expr {
        let mut node = self.clone();
        match &mut node {
            Expr::Sum(cs) | Expr::Product(cs) | Expr::FiniteSet(cs) => cs[index] = new_child,
            Expr::Fraction(a, b) | Expr::Power(a, b) | Expr::Root(a, b) => match index {
                0 => *a = new_child,
                1 => *b = new_child,
                _ => panic!("child index {index} out of range for binary node"),
            },
            Expr::Abs(x) | Expr::Neg(x) | Expr::PlusMinus(x) => {
                assert_eq!(index, 0, "child index out of range for unary node");
                *x = new_child;
            }
            Expr::Function(_, args) => args[index] = new_child,
            Expr::Relation(l, _, r) => match index {
                0 => *l = new_child,
                1 => *r = new_child,
                _ => panic!("child index {index} out of range for relation"),
            },
            Expr::SetSolution(_, x) | Expr::Identity(_, x) | Expr::Contradiction(_, x) => {
                assert_eq!(index, 0, "child index out of range for statement node");
                *x = new_child;
            }
            Expr::Integer(_) | Expr::Decimal(_) | Expr::Variable(_) | Expr::Undefined => {
                panic!("leaf node has no children")
            }
        }
        node
    }

    /// True for the arithmetic connectives through which `Undefined`
    /// propagates upward. Statement nodes (relations, solutions) are
    /// excluded: an undefined side of an equation is handled by equation
    /// rules, not by absorption.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Expr::Sum(_)
                | Expr::Product(_)
                | Expr::Fraction(..)
                | Expr::Power(..)
                | Expr::Root(..)
                | Expr::Abs(_)
                | Expr::Neg(_)
                | Expr::PlusMinus(_)
                | Expr::Function(..)
        )
    }
}
