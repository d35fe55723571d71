use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::kernel::Declaration;

/// A SubstitutionState maps declarations of a core to declarations of a query.
///
/// The map is persistent, so cloning a state to explore a branch is O(1) and the branch's
/// bindings never leak into its siblings.
/// Once a declaration is bound it stays bound to the same target for the rest of the lineage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionState {
    map: im::HashMap<Declaration, Declaration>,
}

impl SubstitutionState {
    pub fn new() -> SubstitutionState {
        SubstitutionState::default()
    }

    pub fn get(&self, origin: &Declaration) -> Option<&Declaration> {
        self.map.get(origin)
    }

    pub fn has_substitution_for(&self, origin: &Declaration) -> bool {
        self.map.contains_key(origin)
    }

    /// Binds origin to target.
    /// Returns false if origin is already bound to something else.
    pub fn bind(&mut self, origin: &Declaration, target: &Declaration) -> bool {
        match self.map.get(origin) {
            Some(existing) => existing == target,
            None => {
                self.map.insert(origin.clone(), target.clone());
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Declaration, &Declaration)> {
        self.map.iter()
    }

    /// The bindings of these origins, to be restored when a scope ends.
    pub fn extract(&self, origins: &[Declaration]) -> Vec<(Declaration, Declaration)> {
        origins
            .iter()
            .filter_map(|origin| {
                self.map
                    .get(origin)
                    .map(|target| (origin.clone(), target.clone()))
            })
            .collect()
    }

    pub fn remove_all(&mut self, origins: &[Declaration]) {
        for origin in origins {
            self.map.remove(origin);
        }
    }

    pub fn restore(&mut self, saved: Vec<(Declaration, Declaration)>) {
        for (origin, target) in saved {
            self.map.insert(origin, target);
        }
    }

    /// Combines two states if they agree on every declaration they share.
    pub fn join(&self, other: &SubstitutionState) -> Option<SubstitutionState> {
        let (smaller, greater) = if self.map.len() > other.map.len() {
            (other, self)
        } else {
            (self, other)
        };
        let mut joined = greater.map.clone();
        for (origin, target) in smaller.map.iter() {
            match greater.map.get(origin) {
                Some(existing) if existing != target => return None,
                Some(_) => {}
                None => {
                    joined.insert(origin.clone(), target.clone());
                }
            }
        }
        Some(SubstitutionState { map: joined })
    }
}

impl fmt::Display for SubstitutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for (origin, target) in self.map.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", origin, target)?;
            first = false;
        }
        write!(f, ")")
    }
}

/// For each core declaration, the query declarations it could still map to.
///
/// Every clause that mentions a declaration restricts it to the targets some substitution for
/// that clause uses. A declaration with no targets left means the core can't match.
#[derive(Debug, Default)]
pub struct PossibleTargets {
    targets: HashMap<Declaration, HashSet<Declaration>>,
}

impl PossibleTargets {
    pub fn new() -> PossibleTargets {
        PossibleTargets::default()
    }

    /// Intersects with the targets used by one clause's substitutions.
    /// Returns false if some declaration is left with nothing.
    pub fn narrow(&mut self, substitutions: &[SubstitutionState]) -> bool {
        let mut seen: HashMap<&Declaration, HashSet<&Declaration>> = HashMap::new();
        for substitution in substitutions {
            for (origin, target) in substitution.iter() {
                seen.entry(origin).or_default().insert(target);
            }
        }
        for (origin, targets) in seen {
            match self.targets.entry(origin.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(targets.into_iter().cloned().collect());
                }
                Entry::Occupied(mut entry) => {
                    let current = entry.get_mut();
                    current.retain(|t| targets.contains(t));
                    if current.is_empty() {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether every binding in the substitution is still possible.
    pub fn allows(&self, substitution: &SubstitutionState) -> bool {
        substitution.iter().all(|(origin, target)| {
            self.targets
                .get(origin)
                .map_or(true, |targets| targets.contains(target))
        })
    }

    pub fn targets(&self, origin: &Declaration) -> Option<&HashSet<Declaration>> {
        self.targets.get(origin)
    }
}
