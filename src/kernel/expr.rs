use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::kernel::declaration::Declaration;
use crate::kernel::sort::Sort;

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

/// A stable id, unique to one node for the lifetime of the process.
/// Memo tables are keyed by it instead of by address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExprId(u64);

impl ExprId {
    fn fresh() -> ExprId {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Quantifier {
    Forall,
    Exists,
}

/// The shape of a node.
#[derive(Debug)]
pub enum ExprKind {
    /// A declaration applied to arguments.
    /// With no arguments this is an occurrence of a variable.
    App { decl: Declaration, args: Vec<Expr> },

    /// Binds the bound declarations inside the body.
    Quantified {
        quantifier: Quantifier,
        bounds: Vec<Declaration>,
        body: Expr,
    },

    /// An array defined pointwise by its body. Binds the index declarations.
    ArrayLambda { indices: Vec<Declaration>, body: Expr },

    /// A literal with no structure the cache cares about, like a numeral or `true`.
    Opaque { value: Arc<str> },
}

#[derive(Debug)]
struct ExprNode {
    id: ExprId,
    sort: Sort,
    kind: ExprKind,
}

/// An immutable expression tree.
/// Cloning shares the node. Equality is structural, ids are ignored.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    fn make(sort: Sort, kind: ExprKind) -> Expr {
        Expr(Arc::new(ExprNode {
            id: ExprId::fresh(),
            sort,
            kind,
        }))
    }

    /// Panics if the number of arguments doesn't match the declaration.
    pub fn app(decl: &Declaration, args: Vec<Expr>) -> Expr {
        assert_eq!(
            decl.arity(),
            args.len(),
            "{} expects {} arguments",
            decl,
            decl.arity()
        );
        Expr::make(
            decl.sort().clone(),
            ExprKind::App {
                decl: decl.clone(),
                args,
            },
        )
    }

    /// An occurrence of a zero-argument declaration.
    pub fn var(decl: &Declaration) -> Expr {
        Expr::app(decl, vec![])
    }

    pub fn quantified(quantifier: Quantifier, bounds: Vec<Declaration>, body: Expr) -> Expr {
        Expr::make(
            Sort::Bool,
            ExprKind::Quantified {
                quantifier,
                bounds,
                body,
            },
        )
    }

    pub fn forall(bounds: Vec<Declaration>, body: Expr) -> Expr {
        Expr::quantified(Quantifier::Forall, bounds, body)
    }

    pub fn exists(bounds: Vec<Declaration>, body: Expr) -> Expr {
        Expr::quantified(Quantifier::Exists, bounds, body)
    }

    /// Multiple indices produce a curried array sort, first index outermost.
    pub fn lambda(indices: Vec<Declaration>, body: Expr) -> Expr {
        let sort = indices
            .iter()
            .rev()
            .fold(body.sort().clone(), |acc, index| {
                Sort::array(index.sort().clone(), acc)
            });
        Expr::make(sort, ExprKind::ArrayLambda { indices, body })
    }

    pub fn opaque(sort: Sort, value: &str) -> Expr {
        Expr::make(
            sort,
            ExprKind::Opaque {
                value: value.into(),
            },
        )
    }

    pub fn bool_const(value: bool) -> Expr {
        Expr::opaque(Sort::Bool, if value { "true" } else { "false" })
    }

    pub fn int_const(value: i64) -> Expr {
        Expr::opaque(Sort::Int, &value.to_string())
    }

    pub fn id(&self) -> ExprId {
        self.0.id
    }

    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// The subexpressions in traversal order.
    /// Bound declarations are not subexpressions, only the body is.
    pub fn children(&self) -> &[Expr] {
        match &self.0.kind {
            ExprKind::App { args, .. } => args,
            ExprKind::Quantified { body, .. } | ExprKind::ArrayLambda { body, .. } => {
                std::slice::from_ref(body)
            }
            ExprKind::Opaque { .. } => &[],
        }
    }

    /// If this is an occurrence of a variable, returns its declaration.
    pub fn as_variable(&self) -> Option<&Declaration> {
        match &self.0.kind {
            ExprKind::App { decl, args } if args.is_empty() => Some(decl),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The number of nodes on the longest path from here to a leaf, counting both ends.
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1)];
        while let Some((expr, depth)) = stack.pop() {
            max = max.max(depth);
            for child in expr.children() {
                stack.push((child, depth + 1));
            }
        }
        max
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Expr) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.sort() != other.sort() {
            return false;
        }
        match (self.kind(), other.kind()) {
            (
                ExprKind::App { decl: d1, args: a1 },
                ExprKind::App { decl: d2, args: a2 },
            ) => d1 == d2 && a1 == a2,
            (
                ExprKind::Quantified {
                    quantifier: q1,
                    bounds: b1,
                    body: body1,
                },
                ExprKind::Quantified {
                    quantifier: q2,
                    bounds: b2,
                    body: body2,
                },
            ) => q1 == q2 && b1 == b2 && body1 == body2,
            (
                ExprKind::ArrayLambda {
                    indices: i1,
                    body: body1,
                },
                ExprKind::ArrayLambda {
                    indices: i2,
                    body: body2,
                },
            ) => i1 == i2 && body1 == body2,
            (ExprKind::Opaque { value: v1 }, ExprKind::Opaque { value: v2 }) => v1 == v2,
            _ => false,
        }
    }
}

impl Eq for Expr {}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

fn write_decls(f: &mut fmt::Formatter, decls: &[Declaration]) -> fmt::Result {
    write!(f, "(")?;
    for (i, d) in decls.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({} {})", d, d.sort())?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            ExprKind::App { decl, args } => {
                if args.is_empty() {
                    return write!(f, "{}", decl);
                }
                write!(f, "({}", decl)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Quantified {
                quantifier,
                bounds,
                body,
            } => {
                let name = match quantifier {
                    Quantifier::Forall => "forall",
                    Quantifier::Exists => "exists",
                };
                write!(f, "({} ", name)?;
                write_decls(f, bounds)?;
                write!(f, " {})", body)
            }
            ExprKind::ArrayLambda { indices, body } => {
                write!(f, "(lambda ")?;
                write_decls(f, indices)?;
                write!(f, " {})", body)
            }
            ExprKind::Opaque { value } => write!(f, "{}", value),
        }
    }
}
