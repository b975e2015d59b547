use crate::expr::Expr;
use crate::path::Path;
use crate::store::{ExprId, Store};
use crate::symbol::Symbol;

/// Node addressed by `path` within the tree rooted at `root`, if the path
/// is valid for that tree.
pub fn resolve(store: &Store, root: ExprId, path: &Path) -> Option<ExprId> {
    let mut current = root;
    for &seg in &path.segments {
        current = *store.get(current).children().get(seg as usize)?;
    }
    Some(current)
}

/// Replace the node at `path` with `replacement`, rebuilding only the spine
/// from the root down to the replacement; every other subtree is shared.
/// Panics if the path is invalid for this tree (paths are never valid
/// across trees without translation, so that is a programming error).
pub fn substitute_at(store: &mut Store, root: ExprId, path: &Path, replacement: ExprId) -> ExprId {
    substitute_segments(store, root, &path.segments, replacement)
}

fn substitute_segments(
    store: &mut Store,
    node: ExprId,
    segments: &[u32],
    replacement: ExprId,
) -> ExprId {
    match segments {
        [] => replacement,
        [first, rest @ ..] => {
            let expr = store.get(node).clone();
            let children = expr.children();
            let index = *first as usize;
            assert!(index < children.len(), "path not valid for this tree");
            let new_child = substitute_segments(store, children[index], rest, replacement);
            if new_child == children[index] {
                node
            } else {
                let rebuilt = expr.with_child(index, new_child);
                store.intern(rebuilt)
            }
        }
    }
}

/// Substitute every free occurrence of `sym` below `root`, sharing
/// untouched subtrees.
pub fn substitute_variable(
    store: &mut Store,
    root: ExprId,
    sym: &Symbol,
    replacement: ExprId,
) -> ExprId {
    if !store.contains_variable(root, sym) {
        return root;
    }
    match store.get(root).clone() {
        Expr::Variable(v) if v == *sym => replacement,
        expr => {
            let children = expr.children();
            let mut rebuilt = expr;
            let mut changed = false;
            for (i, child) in children.iter().enumerate() {
                let new_child = substitute_variable(store, *child, sym, replacement);
                if new_child != *child {
                    rebuilt = rebuilt.with_child(i, new_child);
                    changed = true;
                }
            }
            if changed {
                store.intern(rebuilt)
            } else {
                root
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn resolve_follows_child_order() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let pow = store.power(x, two);
        let five = store.int(5);
        let sum = store.sum(vec![pow, five]);
        let eq_rhs = store.int(0);
        let eq = store.equation(sum, eq_rhs);

        let base = "./0/0/0".parse().unwrap();
        assert_eq!(resolve(&store, eq, &base), Some(x));
        let missing = "./0/5".parse().unwrap();
        assert_eq!(resolve(&store, eq, &missing), None);
    }

    #[test]
    fn substitute_rebuilds_only_the_spine() {
        let mut store = Store::new();
        let x = store.var("x");
        let two = store.int(2);
        let pow = store.power(x, two);
        let five = store.int(5);
        let sum = store.sum(vec![pow, five]);

        let y = store.var("y");
        let path = "./0/0".parse().unwrap();
        let result = substitute_at(&mut store, sum, &path, y);
        assert_eq!(store.canonical(result), "[y ^ 2] + 5");
        // Untouched sibling is shared.
        assert_eq!(store.children(result)[1], five);
        // Substituting the same node back yields the original id.
        let back = substitute_at(&mut store, result, &path, x);
        assert_eq!(back, sum);
    }

    #[test]
    fn substitute_variable_hits_every_occurrence() {
        let mut store = Store::new();
        let x = store.var("x");
        let three = store.int(3);
        let product = store.product(vec![three, x]);
        let sum = store.sum(vec![product, x]);
        let sym = Symbol::new("x");
        let repl = store.int(2);
        let result = substitute_variable(&mut store, sum, &sym, repl);
        assert_eq!(store.canonical(result), "3 * 2 + 2");
    }

    proptest! {
        #[test]
        fn resolve_after_substitute_returns_replacement(depth in 1usize..5) {
            let mut store = Store::new();
            let mut node = store.var("x");
            let mut path = Path::main();
            for _ in 0..depth {
                let one = store.int(1);
                node = store.fraction(node, one);
            }
            for _ in 0..depth {
                path = path.child(0);
            }
            let repl = store.var("z");
            let result = substitute_at(&mut store, node, &path, repl);
            prop_assert_eq!(resolve(&store, result, &path), Some(repl));
        }
    }
}
