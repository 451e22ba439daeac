//! Deduplicating signature sets.

use crate::keys::Signature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of raw signatures over the same digest.
///
/// Backed by an ordered set, so two sets holding the same signatures compare
/// equal and iterate identically regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures(BTreeSet<Signature>);

impl Signatures {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Insert a signature. Returns `false` if it was already present.
    pub fn insert(&mut self, signature: Signature) -> bool {
        self.0.insert(signature)
    }

    /// Set union. Order independent and idempotent: `a.merge(&a) == a`.
    pub fn merge(&self, other: &Signatures) -> Signatures {
        Self(self.0.union(&other.0).copied().collect())
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.0.contains(signature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.0.iter()
    }
}

impl From<Signature> for Signatures {
    fn from(signature: Signature) -> Self {
        Self(BTreeSet::from([signature]))
    }
}

impl FromIterator<Signature> for Signatures {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Signatures {
    type Item = &'a Signature;
    type IntoIter = std::collections::btree_set::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> Signature {
        Signature([n; 64])
    }

    #[test]
    fn insert_deduplicates() {
        let mut sigs = Signatures::new();
        assert!(sigs.insert(sig(1)));
        assert!(!sigs.insert(sig(1)));
        assert_eq!(sigs.len(), 1);
    }

    #[test]
    fn merge_is_union() {
        let a: Signatures = [sig(1), sig(2)].into_iter().collect();
        let b: Signatures = [sig(2), sig(3)].into_iter().collect();
        let merged = a.merge(&b);
        assert_eq!(merged.len(), 3);
        assert!(merged.contains(&sig(1)));
        assert!(merged.contains(&sig(3)));
        assert_eq!(merged, b.merge(&a));
    }

    #[test]
    fn merge_with_self_is_identity() {
        let a: Signatures = [sig(7), sig(9)].into_iter().collect();
        assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn merge_with_empty() {
        let a = Signatures::from(sig(4));
        assert_eq!(a.merge(&Signatures::new()), a);
        assert_eq!(Signatures::new().merge(&a), a);
    }
}
