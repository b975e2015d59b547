use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Root of a path: the main expression of a derivation, or one of the
/// numbered tasks of a case split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathRoot {
    Main,
    Task(u16),
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRoot::Main => write!(f, "."),
            PathRoot::Task(n) => write!(f, "#{n}"),
        }
    }
}

/// Address of a node within a specific tree instance: a root marker
/// followed by child indices. Displayed as `./0/1` or `#2/0`.
///
/// A path is only meaningful relative to the tree it was produced for;
/// carrying it across a rewrite requires translation through a
/// [`PathMapping`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    pub root: PathRoot,
    pub segments: SmallVec<[u32; 8]>,
}

impl Path {
    pub fn main() -> Self {
        Path {
            root: PathRoot::Main,
            segments: SmallVec::new(),
        }
    }

    pub fn for_task(task: u16) -> Self {
        Path {
            root: PathRoot::Task(task),
            segments: SmallVec::new(),
        }
    }

    pub fn child(&self, index: u32) -> Self {
        let mut p = self.clone();
        p.segments.push(index);
        p
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut p = self.clone();
        p.segments.pop();
        Some(p)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `ancestor` is a prefix of `self` (any path is its own
    /// ancestor).
    pub fn has_ancestor(&self, ancestor: &Path) -> bool {
        self.root == ancestor.root
            && self.segments.len() >= ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// The remainder of `self` below `base`, re-rooted at `Main`.
    pub fn strip_prefix(&self, base: &Path) -> Option<Path> {
        if !self.has_ancestor(base) {
            return None;
        }
        Some(Path {
            root: PathRoot::Main,
            segments: self.segments[base.segments.len()..].iter().copied().collect(),
        })
    }

    /// `base` extended by this path's segments; used when a rewrite that
    /// happened at `base` reports mappings relative to its own root.
    pub fn prefixed_with(&self, base: &Path) -> Path {
        let mut p = base.clone();
        p.segments.extend(self.segments.iter().copied());
        p
    }

    pub fn with_root(&self, root: PathRoot) -> Path {
        Path {
            root,
            segments: self.segments.clone(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError(pub String);

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path: {}", self.0)
    }
}

impl std::error::Error for PathParseError {}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pieces = s.split('/');
        let root_piece = pieces.next().ok_or_else(|| PathParseError(s.to_string()))?;
        let root = if root_piece == "." {
            PathRoot::Main
        } else if let Some(n) = root_piece.strip_prefix('#') {
            PathRoot::Task(n.parse().map_err(|_| PathParseError(s.to_string()))?)
        } else {
            return Err(PathParseError(s.to_string()));
        };
        let mut segments = SmallVec::new();
        for piece in pieces {
            segments.push(piece.parse().map_err(|_| PathParseError(s.to_string()))?);
        }
        Ok(Path { root, segments })
    }
}

/// How nodes moved across one rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// A subtree moved to a new position unchanged.
    Move,
    /// A subtree kept its position while siblings changed around it.
    Shift,
    /// Several source subtrees combined into one result subtree.
    Combine,
    /// One source subtree fanned out into several result subtrees.
    Distribute,
    /// A result subtree with no source; brand-new material.
    Introduce,
    /// A source subtree with no result; it was cancelled away.
    Cancel,
    /// A value-level transformation (e.g. `2 + 3` became `5`).
    Transform,
}

/// Correspondence between paths of a rewrite's before-tree and after-tree.
/// From-paths are relative to the before root, to-paths to the after root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub kind: MappingKind,
    pub from_paths: Vec<Path>,
    pub to_paths: Vec<Path>,
}

impl PathMapping {
    pub fn new(kind: MappingKind, from_paths: Vec<Path>, to_paths: Vec<Path>) -> Self {
        PathMapping {
            kind,
            from_paths,
            to_paths,
        }
    }

    /// Re-anchor a mapping reported by a rewrite that happened at `base`
    /// within a larger tree.
    pub fn prefixed_with(&self, base: &Path) -> Self {
        PathMapping {
            kind: self.kind,
            from_paths: self.from_paths.iter().map(|p| p.prefixed_with(base)).collect(),
            to_paths: self.to_paths.iter().map(|p| p.prefixed_with(base)).collect(),
        }
    }

    /// Move every path onto a different root, used when a derivation is
    /// embedded as task `#n` of a case split.
    pub fn with_root(&self, root: PathRoot) -> Self {
        PathMapping {
            kind: self.kind,
            from_paths: self.from_paths.iter().map(|p| p.with_root(root)).collect(),
            to_paths: self.to_paths.iter().map(|p| p.with_root(root)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_and_parse() {
        let p = Path::main().child(0).child(2);
        assert_eq!(p.to_string(), "./0/2");
        assert_eq!("./0/2".parse::<Path>().unwrap(), p);
        let t = Path::for_task(3).child(1);
        assert_eq!(t.to_string(), "#3/1");
        assert_eq!("#3/1".parse::<Path>().unwrap(), t);
        assert!("x/1".parse::<Path>().is_err());
    }

    #[test]
    fn ancestry_and_prefixing() {
        let base = Path::main().child(1);
        let deep = base.child(0).child(4);
        assert!(deep.has_ancestor(&base));
        assert!(deep.has_ancestor(&deep));
        assert!(!base.has_ancestor(&deep));
        let rel = deep.strip_prefix(&base).unwrap();
        assert_eq!(rel.to_string(), "./0/4");
        assert_eq!(rel.prefixed_with(&base), deep);
    }

    proptest! {
        #[test]
        fn parse_roundtrip(segs in proptest::collection::vec(0u32..20, 0..6), task in proptest::option::of(0u16..9)) {
            let mut p = match task {
                None => Path::main(),
                Some(n) => Path::for_task(n),
            };
            for s in segs {
                p = p.child(s);
            }
            let shown = p.to_string();
            prop_assert_eq!(shown.parse::<Path>().unwrap(), p);
        }
    }
}
