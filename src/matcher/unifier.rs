use crate::kernel::{Declaration, Expr, ExprKind, StructuralHasher};
use crate::substitution::SubstitutionState;

// A Unifier decides whether a core expression becomes a query expression under some renaming,
// extending a substitution as it goes.
// Only variables are renamed, that is, applications with no arguments.
// Function heads have to be equal, and binders rename their bound declarations only inside
// their body. A free variable never renames to a variable bound on the right, since that would
// capture it.
pub struct Unifier<'a> {
    state: SubstitutionState,

    // The bound declarations of the binders we are inside, innermost last.
    left_scope: Vec<Declaration>,
    right_scope: Vec<Declaration>,

    // Hashers for the left and right sides. Subterms with different hashes can't unify.
    hashers: Option<(&'a StructuralHasher, &'a StructuralHasher)>,
}

impl<'a> Unifier<'a> {
    pub fn new(state: SubstitutionState) -> Unifier<'a> {
        Unifier {
            state,
            left_scope: vec![],
            right_scope: vec![],
            hashers: None,
        }
    }

    /// Compares structural hashes before descending into a pair of compound expressions.
    /// Both hashers need the same height bound.
    pub fn with_hashers(
        mut self,
        left: &'a StructuralHasher,
        right: &'a StructuralHasher,
    ) -> Unifier<'a> {
        self.hashers = Some((left, right));
        self
    }

    pub fn state(&self) -> &SubstitutionState {
        &self.state
    }

    pub fn into_state(self) -> SubstitutionState {
        self.state
    }

    pub fn unify_decl(&mut self, left: &Declaration, right: &Declaration) -> bool {
        if left.sort() != right.sort() {
            return false;
        }
        self.state.bind(left, right)
    }

    fn unify_decls(&mut self, left: &[Declaration], right: &[Declaration]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(l, r)| self.unify_decl(l, r))
    }

    /// Unifies the bodies of two binders.
    /// Bindings made for the bound declarations are dropped afterwards, and whatever they
    /// shadowed is restored.
    fn unify_scoped(
        &mut self,
        left_bounds: &[Declaration],
        right_bounds: &[Declaration],
        left_body: &Expr,
        right_body: &Expr,
    ) -> bool {
        let shadowed = self.state.extract(left_bounds);
        self.state.remove_all(left_bounds);
        self.left_scope.extend_from_slice(left_bounds);
        self.right_scope.extend_from_slice(right_bounds);
        let result =
            self.unify_decls(left_bounds, right_bounds) && self.unify(left_body, right_body);
        self.left_scope.truncate(self.left_scope.len() - left_bounds.len());
        self.right_scope.truncate(self.right_scope.len() - right_bounds.len());
        self.state.remove_all(left_bounds);
        self.state.restore(shadowed);
        result
    }

    /// Returns false as soon as the expressions can't be made equal.
    /// The state is left partially extended in that case, so callers discard it.
    pub fn unify(&mut self, left: &Expr, right: &Expr) -> bool {
        if left.sort() != right.sort() {
            return false;
        }
        if let Some((left_hasher, right_hasher)) = self.hashers {
            if !left.is_leaf() && left_hasher.hash(left) != right_hasher.hash(right) {
                return false;
            }
        }
        match (left.kind(), right.kind()) {
            (
                ExprKind::App {
                    decl: left_decl,
                    args: left_args,
                },
                ExprKind::App {
                    decl: right_decl,
                    args: right_args,
                },
            ) => {
                if left_args.is_empty() && right_args.is_empty() {
                    if self.right_scope.contains(right_decl)
                        && !self.left_scope.contains(left_decl)
                    {
                        return false;
                    }
                    return self.unify_decl(left_decl, right_decl);
                }
                left_decl == right_decl
                    && left_args
                        .iter()
                        .zip(right_args)
                        .all(|(l, r)| self.unify(l, r))
            }
            (
                ExprKind::Quantified {
                    quantifier: left_quantifier,
                    bounds: left_bounds,
                    body: left_body,
                },
                ExprKind::Quantified {
                    quantifier: right_quantifier,
                    bounds: right_bounds,
                    body: right_body,
                },
            ) => {
                left_quantifier == right_quantifier
                    && self.unify_scoped(left_bounds, right_bounds, left_body, right_body)
            }
            (
                ExprKind::ArrayLambda {
                    indices: left_indices,
                    body: left_body,
                },
                ExprKind::ArrayLambda {
                    indices: right_indices,
                    body: right_body,
                },
            ) => self.unify_scoped(left_indices, right_indices, left_body, right_body),
            (ExprKind::Opaque { value: left_value }, ExprKind::Opaque { value: right_value }) => {
                left_value == right_value
            }
            _ => false,
        }
    }
}

/// Unifies from an empty substitution, returning the substitution if it worked.
pub fn unify_fresh(left: &Expr, right: &Expr) -> Option<SubstitutionState> {
    let mut unifier = Unifier::new(SubstitutionState::new());
    if unifier.unify(left, right) {
        Some(unifier.into_state())
    } else {
        None
    }
}
