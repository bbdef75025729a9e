use std::collections::{HashMap, HashSet};

use super::addon::AddonRef;

/// A user-defined group of add-ons.
///
/// Holds member ids only; display data is resolved against the inventory at
/// read time. Member ids are unique and keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<String>,
}

impl Group {
    pub fn create<I, S>(name: impl Into<String>, initial_member_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self {
            name: name.into(),
            members: Vec::new(),
        };
        group.add_members(initial_member_ids);
        group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_ids(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }

    // Caller re-keys any map holding this group
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }

    /// Appends ids not already present, in input order. Returns the ids that
    /// were actually added.
    pub fn add_members<I, S>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for id in ids {
            let id = id.into();
            if !self.contains(&id) {
                self.members.push(id.clone());
                added.push(id);
            }
        }
        added
    }

    pub fn remove_member(&mut self, id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != id);
        self.members.len() != before
    }

    /// Drops every id in `removed`. Returns whether anything changed.
    pub fn erase(&mut self, removed: &HashSet<String>) -> bool {
        let before = self.members.len();
        self.members.retain(|m| !removed.contains(m));
        self.members.len() != before
    }

    /// Union of current members and `other`: existing order first, then new
    /// ids in the order given.
    pub fn merge<I, S>(&self, other: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut merged = self.clone();
        merged.add_members(other);
        merged.members
    }

    pub fn resolved_ids(&self, known: &HashSet<String>) -> Vec<String> {
        self.members
            .iter()
            .filter(|id| known.contains(*id))
            .cloned()
            .collect()
    }

    /// Member add-ons present in `known`, in stored member order.
    pub fn resolve(&self, known: &[AddonRef]) -> Vec<AddonRef> {
        let by_id: HashMap<&str, &AddonRef> = known.iter().map(|a| (a.id.as_str(), a)).collect();
        self.members
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|a| (*a).clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(ids: &[&str]) -> Vec<AddonRef> {
        ids.iter().map(|id| AddonRef::new(*id, *id)).collect()
    }

    #[test]
    fn create_deduplicates_and_keeps_order() {
        let g = Group::create("Work", ["b", "a", "b", "c", "a"]);
        assert_eq!(g.member_ids(), ["b", "a", "c"]);
        assert_eq!(g.name(), "Work");
    }

    #[test]
    fn add_members_appends_only_new_ids() {
        let mut g = Group::create("Work", ["a", "b"]);
        let added = g.add_members(["c", "a", "d", "c"]);
        assert_eq!(added, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(g.member_ids(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn remove_member_is_noop_when_absent() {
        let mut g = Group::create("Work", ["a", "b"]);
        assert!(!g.remove_member("zzz"));
        assert_eq!(g.member_ids(), ["a", "b"]);
        assert!(g.remove_member("a"));
        assert_eq!(g.member_ids(), ["b"]);
    }

    #[test]
    fn removed_member_never_resolves() {
        let all = known(&["a", "b", "c"]);
        for start in [vec!["a", "b"], vec!["b", "c"]] {
            let mut g = Group::create("G", start);
            g.remove_member("a");
            let resolved: Vec<String> = g.resolve(&all).into_iter().map(|a| a.id).collect();
            assert!(!resolved.contains(&"a".to_string()));
        }
    }

    #[test]
    fn resolve_filters_unknown_and_keeps_stored_order() {
        let g = Group::create("G", ["c", "missing", "a"]);
        let resolved: Vec<String> = g
            .resolve(&known(&["a", "b", "c"]))
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(resolved, vec!["c", "a"]);
    }

    #[test]
    fn merge_is_union_without_duplicates() {
        let g = Group::create("A", ["1", "2"]);
        let merged = g.merge(["2", "3"]);
        assert_eq!(merged, vec!["1", "2", "3"]);
    }

    #[test]
    fn erase_only_touches_removed_ids() {
        let mut g = Group::create("A", ["x", "y", "z"]);
        let removed: HashSet<String> = ["x".to_string()].into_iter().collect();
        assert!(g.erase(&removed));
        assert_eq!(g.member_ids(), ["y", "z"]);
        assert!(!g.erase(&removed));
    }
}
