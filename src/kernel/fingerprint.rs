use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;

use crate::kernel::clause_set::ClauseSet;
use crate::kernel::expr::{Expr, ExprId, ExprKind, Quantifier};

/// The height bound used by the cache unless configured otherwise.
pub const DEFAULT_MAX_HEIGHT: usize = 7;

const HASH_SHIFT: u64 = 31;

// Kind tags keep binders and literals apart from applications with the same sort.
const FORALL_TAG: u64 = 0x51;
const EXISTS_TAG: u64 = 0x52;
const LAMBDA_TAG: u64 = 0x53;
const OPAQUE_TAG: u64 = 0x54;

/// Rolling combination, `acc * 31 + part` for each part in order.
pub fn combine(parts: &[u64]) -> u64 {
    parts.iter().fold(0u64, |acc, part| {
        acc.wrapping_mul(HASH_SHIFT).wrapping_add(*part)
    })
}

/// DefaultHasher has fixed keys, so this is deterministic within a build.
fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// The hash of a single node, ignoring its children.
///
/// Variables only contribute their sort. This is what makes the fingerprint invariant under
/// renaming: `p(x)` and `p(y)` hash the same when x and y have the same sort.
/// Function heads contribute their name and arity, so `f(x)` and `g(x)` differ.
pub fn content_hash(expr: &Expr) -> u64 {
    let sort = stable_hash(expr.sort());
    match expr.kind() {
        ExprKind::App { args, .. } if args.is_empty() => combine(&[sort]),
        ExprKind::App { decl, args } => {
            combine(&[sort, stable_hash(decl.name()), args.len() as u64])
        }
        ExprKind::Quantified {
            quantifier, bounds, ..
        } => {
            let tag = match quantifier {
                Quantifier::Forall => FORALL_TAG,
                Quantifier::Exists => EXISTS_TAG,
            };
            combine(&[sort, bounds.len() as u64, tag])
        }
        ExprKind::ArrayLambda { indices, .. } => {
            combine(&[sort, indices.len() as u64, LAMBDA_TAG])
        }
        ExprKind::Opaque { .. } => combine(&[sort, OPAQUE_TAG]),
    }
}

/// A memoized result. Only complete, untruncated hashes are memoized.
#[derive(Clone, Copy, Debug)]
struct Fingerprint {
    hash: u64,

    // Levels in the subtree, a leaf has height 1.
    height: usize,
}

/// The hash of a subtree as seen from its parent.
#[derive(Clone, Copy, Debug)]
struct Subtree {
    hash: u64,
    height: usize,

    // False if something below was truncated.
    full: bool,
}

struct Frame<'a> {
    expr: &'a Expr,
    hash: u64,
    height: usize,
    full: bool,

    // The next child to visit.
    next: usize,
}

impl<'a> Frame<'a> {
    fn new(expr: &'a Expr) -> Frame<'a> {
        Frame {
            expr,
            hash: content_hash(expr),
            height: 1,
            full: true,
            next: 0,
        }
    }

    fn absorb(&mut self, child: Subtree) {
        self.hash = combine(&[self.hash, child.hash]);
        self.height = self.height.max(child.height + 1);
        self.full &= child.full;
    }

    fn finish(&self) -> Subtree {
        Subtree {
            hash: self.hash,
            height: self.height,
            full: self.full,
        }
    }
}

/// Computes renaming-invariant structural hashes of expressions.
///
/// With a max height, nodes deeper than that contribute only their content hash.
/// The result for a tree depends only on the tree and the max height, never on what was
/// hashed before: a memoized subtree is only reused where it would not have been truncated.
///
/// The memo is a DashMap so one hasher can be shared by concurrent adds.
/// Two threads racing on the same node compute the same value, so that's harmless.
pub struct StructuralHasher {
    max_height: Option<usize>,
    memo: DashMap<ExprId, Fingerprint>,
}

impl StructuralHasher {
    pub fn new(max_height: Option<usize>) -> StructuralHasher {
        StructuralHasher {
            max_height,
            memo: DashMap::new(),
        }
    }

    pub fn unlimited() -> StructuralHasher {
        StructuralHasher::new(None)
    }

    pub fn max_height(&self) -> Option<usize> {
        self.max_height
    }

    /// Whether a node at this depth gets its children hashed. The root is at depth 1.
    fn expands(&self, depth: usize) -> bool {
        match self.max_height {
            Some(max) => depth <= max,
            None => true,
        }
    }

    /// A memoized fingerprint, if it's valid for a node at this depth.
    fn lookup(&self, expr: &Expr, depth: usize) -> Option<Fingerprint> {
        let fingerprint = *self.memo.get(&expr.id())?;
        match self.max_height {
            Some(max) if fingerprint.height + depth > max + 2 => None,
            _ => Some(fingerprint),
        }
    }

    pub fn hash(&self, expr: &Expr) -> u64 {
        if let Some(fingerprint) = self.lookup(expr, 1) {
            return fingerprint.hash;
        }

        let mut stack = vec![Frame::new(expr)];
        let mut returned: Option<Subtree> = None;
        let mut root = 0;
        while let Some(frame) = stack.last_mut() {
            if let Some(child) = returned.take() {
                frame.absorb(child);
            }

            let children = frame.expr.children();
            if frame.next < children.len() {
                let child = &children[frame.next];
                frame.next += 1;
                let depth = stack.len() + 1;
                if let Some(fingerprint) = self.lookup(child, depth) {
                    returned = Some(Subtree {
                        hash: fingerprint.hash,
                        height: fingerprint.height,
                        full: true,
                    });
                } else if self.expands(depth) {
                    stack.push(Frame::new(child));
                } else {
                    // Truncated. A leaf loses nothing by this.
                    returned = Some(Subtree {
                        hash: content_hash(child),
                        height: 1,
                        full: child.is_leaf(),
                    });
                }
                continue;
            }

            let done = frame.finish();
            let id = frame.expr.id();
            stack.pop();
            if done.full {
                self.memo.insert(
                    id,
                    Fingerprint {
                        hash: done.hash,
                        height: done.height,
                    },
                );
            }
            root = done.hash;
            returned = Some(done);
        }
        root
    }

    pub fn hash_all(&self, clauses: &ClauseSet) -> Vec<u64> {
        clauses.iter().map(|clause| self.hash(clause)).collect()
    }

    pub fn clear(&self) {
        self.memo.clear();
    }

    /// The number of memoized nodes.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

impl Default for StructuralHasher {
    fn default() -> StructuralHasher {
        StructuralHasher::new(Some(DEFAULT_MAX_HEIGHT))
    }
}
