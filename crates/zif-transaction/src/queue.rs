//! One transaction queue (install, update, or remove): an ordered array of
//! items paired with an identity-keyed hash for O(1) membership.

use ahash::AHashSet;
use zif_core::{Package, Reason};
use zif_store::package_id_hash;

/// One queued item: a package, why it's queued, and its resolution state.
#[derive(Debug, Clone)]
pub struct Item {
    /// The package being installed, updated, or removed.
    pub package: Package,
    /// Why this item is queued.
    pub reason: Reason,
    /// Has this pass's resolution step for this item already run?
    pub resolved: bool,
    /// Marked unresolvable under skip-broken; excluded from the final
    /// install/remove arrays.
    pub cancelled: bool,
    /// Packages queued alongside this one whose addition should be
    /// reverted together if this item is cancelled.
    pub related: Vec<Package>,
    /// Has the conflict-checking phase already visited this item? Only
    /// meaningful for install-queue items.
    pub conflict_checked: bool,
}

impl Item {
    fn new(package: Package, reason: Reason) -> Self {
        Self {
            package,
            reason,
            resolved: false,
            cancelled: false,
            related: Vec::new(),
            conflict_checked: false,
        }
    }
}

/// An ordered array of items plus an identity-keyed hash for fast
/// membership tests.
#[derive(Debug, Default)]
pub struct Queue {
    items: Vec<Item>,
    index: AHashSet<String>,
}

impl Queue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `package`'s identity already queued here?
    #[must_use]
    pub fn contains(&self, package: &Package) -> bool {
        self.index.contains(&package_id_hash(package))
    }

    /// Queue `package` with `reason` unless its identity is already
    /// present. Returns `true` if it was newly added.
    pub fn push(&mut self, package: Package, reason: Reason) -> bool {
        let hash = package_id_hash(&package);
        if self.index.contains(&hash) {
            return false;
        }
        self.index.insert(hash);
        self.items.push(Item::new(package, reason));
        true
    }

    /// Iterate items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Mutably iterate items in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.iter_mut()
    }

    /// Index-based read access, for the resolver's "process one item per
    /// phase" loop.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Item> {
        self.items.get(idx)
    }

    /// Index-based mutable access.
    #[must_use]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Item> {
        self.items.get_mut(idx)
    }

    /// Number of items currently queued (including cancelled ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Is the queue empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The first item whose `resolved` bit is not yet set, if any.
    #[must_use]
    pub fn first_unresolved(&self) -> Option<usize> {
        self.items.iter().position(|item| !item.resolved)
    }

    /// The first resolved, non-cancelled item that hasn't been
    /// conflict-checked yet, if any.
    #[must_use]
    pub fn first_unchecked_for_conflicts(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.resolved && !item.cancelled && !item.conflict_checked)
    }

    /// Drop the item at `idx` entirely: used for "nothing to do" outcomes,
    /// which remove the originating item rather than marking it cancelled.
    pub fn remove_at(&mut self, idx: usize) {
        if idx < self.items.len() {
            let removed = self.items.remove(idx);
            self.index.remove(&package_id_hash(&removed.package));
        }
    }

    /// Mark every item at or reachable from `idx` (the item itself and
    /// its related-packages) as cancelled.
    pub fn cancel(&mut self, idx: usize) {
        if let Some(item) = self.items.get_mut(idx) {
            item.cancelled = true;
            item.resolved = true;
            let related: AHashSet<String> =
                item.related.iter().map(package_id_hash).collect();
            for other in &mut self.items {
                if related.contains(&package_id_hash(&other.package)) {
                    other.cancelled = true;
                    other.resolved = true;
                }
            }
        }
    }

    /// Packages from non-cancelled items, in insertion order (the queue's
    /// contribution to the final transaction plan).
    #[must_use]
    pub fn live_packages(&self) -> Vec<Package> {
        self.items
            .iter()
            .filter(|item| !item.cancelled)
            .map(|item| item.package.clone())
            .collect()
    }

    /// Live (non-cancelled) items, in insertion order.
    pub fn live_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| !item.cancelled)
    }

    /// Does any live item remain?
    #[must_use]
    pub fn has_live_items(&self) -> bool {
        self.items.iter().any(|item| !item.cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{Arch, Origin};

    fn pkg(name: &str) -> Package {
        Package::new(name, 0, "1.0", "1", Arch::new("x86_64"), Origin::Meta)
    }

    #[test]
    fn duplicate_push_is_noop() {
        let mut q = Queue::new();
        assert!(q.push(pkg("hello"), Reason::InstallUserAction));
        assert!(!q.push(pkg("hello"), Reason::InstallUserAction));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn cancel_propagates_to_related() {
        let mut q = Queue::new();
        q.push(pkg("a"), Reason::InstallUserAction);
        q.push(pkg("b"), Reason::InstallDepend);
        q.get_mut(0).unwrap().related.push(pkg("b"));
        q.cancel(0);
        assert!(q.iter().all(|item| item.cancelled));
        assert!(q.live_packages().is_empty());
    }

    #[test]
    fn remove_at_drops_item_and_index() {
        let mut q = Queue::new();
        q.push(pkg("a"), Reason::InstallUserAction);
        q.remove_at(0);
        assert!(q.is_empty());
        assert!(!q.contains(&pkg("a")));
    }
}
