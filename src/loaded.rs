//! Loaded Set
//!
//! The ledger of descriptors the client is assumed to hold, each tagged with
//! the UID it was loaded at. A `None` UID means "loaded but unvalidated".

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::descriptor::Descriptor;

/// Content fingerprint of a definition and its dependency closure.
pub type Uid = String;

#[derive(Debug, Clone, Default)]
pub struct LoadedSet {
    entries: HashMap<Descriptor, Option<Uid>>,
}

impl LoadedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the UID for a descriptor, replacing any earlier one.
    pub fn add(&mut self, descriptor: Descriptor, uid: Option<Uid>) {
        self.entries.insert(descriptor, uid);
    }

    pub fn drop(&mut self, descriptor: &Descriptor) -> bool {
        self.entries.remove(descriptor).is_some()
    }

    pub fn get_uid(&self, descriptor: &Descriptor) -> Option<&str> {
        self.entries.get(descriptor).and_then(|uid| uid.as_deref())
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.entries.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current entries into a stable, ordered view.
    pub fn snapshot(&self) -> LoadedSnapshot {
        LoadedSnapshot(
            self.entries
                .iter()
                .map(|(d, uid)| (d.clone(), uid.clone()))
                .collect(),
        )
    }
}

/// Immutable view of a [`LoadedSet`] taken at one point in time.
///
/// Serializes as a JSON object of wire keys to UIDs, e.g.
/// `{"COMPONENT@markup://ui:button": "3f1c..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadedSnapshot(BTreeMap<Descriptor, Option<Uid>>);

impl LoadedSnapshot {
    pub fn get_uid(&self, descriptor: &Descriptor) -> Option<&str> {
        self.0.get(descriptor).and_then(|uid| uid.as_deref())
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.0.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Descriptor, Option<&str>)> {
        self.0.iter().map(|(d, uid)| (d, uid.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DefType;

    fn cmp(name: &str) -> Descriptor {
        Descriptor::new(DefType::Component, "markup", "ui", name)
    }

    #[test]
    fn test_add_then_overwrite() {
        let mut set = LoadedSet::new();
        set.add(cmp("button"), Some("u1".into()));
        assert_eq!(set.get_uid(&cmp("button")), Some("u1"));

        set.add(cmp("button"), Some("u2".into()));
        assert_eq!(set.get_uid(&cmp("button")), Some("u2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_drop_is_idempotent() {
        let mut set = LoadedSet::new();
        assert!(!set.drop(&cmp("never")));
        assert_eq!(set.get_uid(&cmp("never")), None);

        set.add(cmp("button"), Some("u1".into()));
        assert!(set.drop(&cmp("button")));
        assert!(!set.drop(&cmp("button")));
        assert_eq!(set.get_uid(&cmp("button")), None);
    }

    #[test]
    fn test_unvalidated_entry_is_loaded_without_uid() {
        let mut set = LoadedSet::new();
        set.add(cmp("button"), None);
        assert!(set.contains(&cmp("button")));
        assert_eq!(set.get_uid(&cmp("button")), None);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut set = LoadedSet::new();
        set.add(cmp("a"), Some("u1".into()));
        let snap = set.snapshot();

        set.add(cmp("a"), Some("u2".into()));
        set.add(cmp("b"), None);
        set.drop(&cmp("a"));

        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get_uid(&cmp("a")), Some("u1"));
        assert!(!snap.contains(&cmp("b")));
    }

    #[test]
    fn test_snapshot_wire_form() {
        let mut set = LoadedSet::new();
        set.add(cmp("b"), None);
        set.add(cmp("a"), Some("u1".into()));
        let json = serde_json::to_string(&set.snapshot()).unwrap();
        assert_eq!(
            json,
            r#"{"COMPONENT@markup://ui:a":"u1","COMPONENT@markup://ui:b":null}"#
        );
        let back: LoadedSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set.snapshot());
    }
}
