//! Expression arena for the stepmath rewriting engine.
//!
//! Expressions are immutable nodes owned by a [`Store`] and addressed by
//! [`ExprId`]. The store hash-conses nodes, so structural equality of two
//! expressions is identity of their ids and rewrites share unchanged
//! subtrees for free. Nodes inside a tree are addressed by [`Path`] values,
//! and rewrite provenance is reported as [`PathMapping`]s between the paths
//! of a before-tree and an after-tree.

pub mod display;
pub mod expr;
pub mod path;
pub mod store;
pub mod symbol;
pub mod traverse;

pub use display::DisplayExpr;
pub use expr::{Expr, RelOp};
pub use path::{MappingKind, Path, PathMapping, PathRoot};
pub use store::{ExprId, Store};
pub use symbol::Symbol;
pub use traverse::{resolve, substitute_at, substitute_variable};
