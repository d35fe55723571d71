pub mod clause_set;
pub mod declaration;
pub mod expr;
pub mod fingerprint;
pub mod sort;

pub use clause_set::ClauseSet;
pub use declaration::Declaration;
pub use expr::{Expr, ExprId, ExprKind, Quantifier};
pub use fingerprint::StructuralHasher;
pub use sort::Sort;
