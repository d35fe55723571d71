use std::fmt;
use std::sync::Arc;

/// The sort of an expression.
/// Sorts are compared by value, so two separately constructed `Int` sorts are the same sort.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Sort {
    Bool,
    Int,
    Real,

    // A fixed-width bitvector.
    BitVec(u32),

    // Arrays map an index sort to an element sort.
    Array(Arc<Sort>, Arc<Sort>),

    // A user-declared sort with no internal structure.
    Uninterpreted(Arc<str>),
}

impl Sort {
    pub fn array(index: Sort, element: Sort) -> Sort {
        Sort::Array(Arc::new(index), Arc::new(element))
    }

    pub fn uninterpreted(name: &str) -> Sort {
        Sort::Uninterpreted(name.into())
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::BitVec(width) => write!(f, "(_ BitVec {})", width),
            Sort::Array(index, element) => write!(f, "(Array {} {})", index, element),
            Sort::Uninterpreted(name) => write!(f, "{}", name),
        }
    }
}
