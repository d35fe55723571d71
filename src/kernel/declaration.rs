use std::fmt;
use std::sync::Arc;

use crate::kernel::sort::Sort;

#[derive(Debug, Eq, Hash, PartialEq)]
struct DeclarationData {
    name: Arc<str>,
    sort: Sort,
    arg_sorts: Vec<Sort>,
    params: Option<Vec<Arc<str>>>,
}

/// A Declaration is the identity of a symbol: a variable, a constant, or a function.
///
/// Equality is structural. Two declarations built separately with the same name, sorts and
/// parameters are equal, which is what lets the matcher compare function heads across
/// independently parsed formulas.
/// Cloning is cheap, the data is shared.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Declaration(Arc<DeclarationData>);

impl Declaration {
    pub fn new(name: &str, arg_sorts: Vec<Sort>, sort: Sort) -> Declaration {
        Declaration(Arc::new(DeclarationData {
            name: name.into(),
            sort,
            arg_sorts,
            params: None,
        }))
    }

    /// A zero-argument declaration, which is how variables are represented.
    pub fn constant(name: &str, sort: Sort) -> Declaration {
        Declaration::new(name, vec![], sort)
    }

    /// A declaration indexed by parameters, like `(_ extract 7 0)`.
    pub fn parameterized(
        name: &str,
        params: Vec<&str>,
        arg_sorts: Vec<Sort>,
        sort: Sort,
    ) -> Declaration {
        Declaration(Arc::new(DeclarationData {
            name: name.into(),
            sort,
            arg_sorts,
            params: Some(params.into_iter().map(Arc::from).collect()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The result sort.
    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    pub fn arg_sorts(&self) -> &[Sort] {
        &self.0.arg_sorts
    }

    pub fn arity(&self) -> usize {
        self.0.arg_sorts.len()
    }

    pub fn params(&self) -> Option<&[Arc<str>]> {
        self.0.params.as_deref()
    }

    /// Whether this is the same allocation, which implies equality.
    pub fn ptr_eq(&self, other: &Declaration) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0.params {
            Some(params) => {
                write!(f, "(_ {}", self.0.name)?;
                for p in params {
                    write!(f, " {}", p)?;
                }
                write!(f, ")")
            }
            None => write!(f, "{}", self.0.name),
        }
    }
}
