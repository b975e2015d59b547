use crate::expr::{Expr, RelOp};
use crate::symbol::Symbol;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Index of an expression node in a [`Store`].
///
/// Because the store hash-conses, two ids are equal iff the expressions
/// they denote are structurally equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owning arena for expression nodes.
///
/// Append-only: rewrites allocate new nodes and never touch existing ones,
/// so ids handed out earlier stay valid for the lifetime of the store. One
/// store serves one request; rules and plans receive `&mut Store` to build
/// result trees and `&Store` while matching.
pub struct Store {
    nodes: Vec<Expr>,
    interner: FxHashMap<Expr, ExprId>,
    vars_cache: RefCell<FxHashMap<ExprId, Rc<BTreeSet<Symbol>>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            nodes: Vec::new(),
            interner: FxHashMap::default(),
            vars_cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Intern a node as-is. Factory methods below are preferred since they
    /// keep n-ary nodes canonical; this is the raw entry point used when
    /// rebuilding a spine during substitution.
    pub fn intern(&mut self, expr: Expr) -> ExprId {
        if let Some(&id) = self.interner.get(&expr) {
            return id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr.clone());
        self.interner.insert(expr, id);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: ExprId) -> Vec<ExprId> {
        self.get(id).children()
    }

    // --- Leaf factories -------------------------------------------------

    pub fn int(&mut self, n: i64) -> ExprId {
        self.intern(Expr::Integer(BigInt::from(n)))
    }

    pub fn integer(&mut self, n: BigInt) -> ExprId {
        self.intern(Expr::Integer(n))
    }

    pub fn decimal(&mut self, value: BigRational) -> ExprId {
        self.intern(Expr::Decimal(value))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        self.intern(Expr::Variable(Symbol::new(name)))
    }

    pub fn variable(&mut self, sym: Symbol) -> ExprId {
        self.intern(Expr::Variable(sym))
    }

    pub fn undefined(&mut self) -> ExprId {
        self.intern(Expr::Undefined)
    }

    // --- Composite factories --------------------------------------------
    //
    // Arity is enforced here; a rule builder cannot produce a malformed
    // node. `sum`/`product` flatten nested occurrences and collapse the
    // degenerate arities to their units.

    pub fn sum(&mut self, children: Vec<ExprId>) -> ExprId {
        let mut flat = Vec::with_capacity(children.len());
        for c in children {
            match self.get(c) {
                Expr::Sum(inner) => flat.extend(inner.iter().copied()),
                _ => flat.push(c),
            }
        }
        match flat.len() {
            0 => self.int(0),
            1 => flat[0],
            _ => self.intern(Expr::Sum(flat)),
        }
    }

    pub fn product(&mut self, children: Vec<ExprId>) -> ExprId {
        let mut flat = Vec::with_capacity(children.len());
        for c in children {
            match self.get(c) {
                Expr::Product(inner) => flat.extend(inner.iter().copied()),
                _ => flat.push(c),
            }
        }
        match flat.len() {
            0 => self.int(1),
            1 => flat[0],
            _ => self.intern(Expr::Product(flat)),
        }
    }

    pub fn fraction(&mut self, num: ExprId, den: ExprId) -> ExprId {
        self.intern(Expr::Fraction(num, den))
    }

    pub fn power(&mut self, base: ExprId, exp: ExprId) -> ExprId {
        self.intern(Expr::Power(base, exp))
    }

    pub fn root(&mut self, radicand: ExprId, degree: ExprId) -> ExprId {
        self.intern(Expr::Root(radicand, degree))
    }

    pub fn sqrt(&mut self, radicand: ExprId) -> ExprId {
        let two = self.int(2);
        self.root(radicand, two)
    }

    pub fn abs(&mut self, inner: ExprId) -> ExprId {
        self.intern(Expr::Abs(inner))
    }

    pub fn neg(&mut self, inner: ExprId) -> ExprId {
        self.intern(Expr::Neg(inner))
    }

    pub fn plus_minus(&mut self, inner: ExprId) -> ExprId {
        self.intern(Expr::PlusMinus(inner))
    }

    pub fn function(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        self.intern(Expr::Function(Symbol::new(name), args))
    }

    pub fn relation(&mut self, lhs: ExprId, op: RelOp, rhs: ExprId) -> ExprId {
        self.intern(Expr::Relation(lhs, op, rhs))
    }

    pub fn equation(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.relation(lhs, RelOp::Eq, rhs)
    }

    pub fn finite_set(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.intern(Expr::FiniteSet(elements))
    }

    pub fn set_solution(&mut self, vars: Vec<Symbol>, set: ExprId) -> ExprId {
        self.intern(Expr::SetSolution(vars, set))
    }

    pub fn identity_statement(&mut self, vars: Vec<Symbol>, relation: ExprId) -> ExprId {
        self.intern(Expr::Identity(vars, relation))
    }

    pub fn contradiction(&mut self, vars: Vec<Symbol>, relation: ExprId) -> ExprId {
        self.intern(Expr::Contradiction(vars, relation))
    }

    /// Build the canonical node for an exact rational value: an integer
    /// when the denominator is one, a fraction of integers otherwise, with
    /// the sign carried by the numerator.
    pub fn rational(&mut self, value: BigRational) -> ExprId {
        if value.denom().is_one() {
            self.integer(value.numer().clone())
        } else {
            let (mut num, mut den) = (value.numer().clone(), value.denom().clone());
            if den.is_negative() {
                num = -num;
                den = -den;
            }
            let n = self.integer(num);
            let d = self.integer(den);
            self.fraction(n, d)
        }
    }

    // --- Queries --------------------------------------------------------

    /// Exact rational value of a numeric subtree (integers, fractions of
    /// integers, negations thereof), if it is one.
    pub fn as_rational(&self, id: ExprId) -> Option<BigRational> {
        match self.get(id) {
            Expr::Integer(n) => Some(BigRational::from_integer(n.clone())),
            Expr::Decimal(r) => Some(r.clone()),
            Expr::Fraction(n, d) => {
                let n = self.as_rational(*n)?;
                let d = self.as_rational(*d)?;
                if d.is_zero() {
                    None
                } else {
                    Some(n / d)
                }
            }
            Expr::Neg(x) => self.as_rational(*x).map(|r| -r),
            _ => None,
        }
    }

    pub fn is_zero_integer(&self, id: ExprId) -> bool {
        matches!(self.get(id), Expr::Integer(n) if n.is_zero())
    }

    pub fn is_one_integer(&self, id: ExprId) -> bool {
        matches!(self.get(id), Expr::Integer(n) if n.is_one())
    }

    /// Free symbol names below `id`. Pure, so the result is cached per id.
    pub fn free_variables(&self, id: ExprId) -> Rc<BTreeSet<Symbol>> {
        if let Some(cached) = self.vars_cache.borrow().get(&id) {
            return Rc::clone(cached);
        }
        let mut set = BTreeSet::new();
        match self.get(id) {
            Expr::Variable(sym) => {
                set.insert(sym.clone());
            }
            node => {
                for child in node.children() {
                    set.extend(self.free_variables(child).iter().cloned());
                }
            }
        }
        let rc = Rc::new(set);
        self.vars_cache.borrow_mut().insert(id, Rc::clone(&rc));
        rc
    }

    pub fn contains_variable(&self, id: ExprId, sym: &Symbol) -> bool {
        self.free_variables(id).contains(sym)
    }

    pub fn is_constant(&self, id: ExprId) -> bool {
        self.free_variables(id).is_empty()
    }

    /// Node count of the subtree, the default well-founded measure for
    /// strictly simplifying rules.
    pub fn node_count(&self, id: ExprId) -> usize {
        1 + self
            .get(id)
            .children()
            .into_iter()
            .map(|c| self.node_count(c))
            .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_makes_equality_structural() {
        let mut store = Store::new();
        let x1 = store.var("x");
        let two = store.int(2);
        let a = store.sum(vec![x1, two]);
        let x2 = store.var("x");
        let two2 = store.int(2);
        let b = store.sum(vec![x2, two2]);
        assert_eq!(a, b);
    }

    #[test]
    fn sums_flatten_and_collapse() {
        let mut store = Store::new();
        let x = store.var("x");
        let y = store.var("y");
        let inner = store.sum(vec![x, y]);
        let z = store.var("z");
        let outer = store.sum(vec![inner, z]);
        assert_eq!(store.children(outer).len(), 3);
        assert_eq!(store.sum(vec![x]), x);
        let empty = store.sum(vec![]);
        assert!(store.is_zero_integer(empty));
        let empty_prod = store.product(vec![]);
        assert!(store.is_one_integer(empty_prod));
    }

    #[test]
    fn free_variables_are_cached_and_correct() {
        let mut store = Store::new();
        let x = store.var("x");
        let y = store.var("y");
        let p = store.product(vec![x, y]);
        let three = store.int(3);
        let s = store.sum(vec![p, three]);
        let vars = store.free_variables(s);
        assert_eq!(vars.len(), 2);
        assert!(vars.contains(&Symbol::new("x")));
        assert!(store.is_constant(three));
        assert!(!store.is_constant(s));
    }

    #[test]
    fn rational_factory_normalizes_sign() {
        let mut store = Store::new();
        let r = BigRational::new(BigInt::from(2), BigInt::from(-4));
        let id = store.rational(r);
        assert_eq!(store.canonical(id), "[-1 / 2]");
    }
}
