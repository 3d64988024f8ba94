use std::{
    cmp::Ordering,
    collections::{btree_map, BTreeMap},
};

use crate::Entry;

/// The children of one directory on one side, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` unless its name is already taken.
    /// Returns the rejected entry on duplicate.
    pub fn insert(&mut self, entry: Entry) -> Result<(), Entry> {
        match self.entries.entry(entry.name().to_owned()) {
            btree_map::Entry::Vacant(v) => {
                v.insert(entry);
                Ok(())
            }
            btree_map::Entry::Occupied(_) => Err(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}

impl FromIterator<Entry> for Snapshot {
    /// Builds a snapshot, keeping the first of entries sharing a name
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for entry in iter {
            let _ = snapshot.insert(entry);
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = Entry;
    type IntoIter = btree_map::IntoValues<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// Partition by name of a local and a remote snapshot of the same directory
#[derive(Debug, Clone, Default)]
pub struct Diff {
    /// Names on both sides, as `(local, remote)`, whatever their kinds
    pub common: Vec<(Entry, Entry)>,
    pub local_only: Vec<Entry>,
    pub remote_only: Vec<Entry>,
}

impl Diff {
    pub fn compute(local: Snapshot, remote: Snapshot) -> Self {
        let mut diff = Diff::default();

        let mut loc_children = local.into_iter();
        let mut loc_child = loc_children.next();
        let mut rem_children = remote.into_iter();
        let mut rem_child = rem_children.next();

        // both sides are sorted by name
        loop {
            match (loc_child.take(), rem_child.take()) {
                (None, None) => break,
                (Some(loc), Some(rem)) => match loc.name().cmp(rem.name()) {
                    Ordering::Equal => {
                        diff.common.push((loc, rem));
                        loc_child = loc_children.next();
                        rem_child = rem_children.next();
                    }
                    Ordering::Less => {
                        diff.local_only.push(loc);
                        loc_child = loc_children.next();
                        rem_child = Some(rem);
                    }
                    Ordering::Greater => {
                        diff.remote_only.push(rem);
                        rem_child = rem_children.next();
                        loc_child = Some(loc);
                    }
                },
                (Some(loc), None) => {
                    diff.local_only.push(loc);
                    loc_child = loc_children.next();
                }
                (None, Some(rem)) => {
                    diff.remote_only.push(rem);
                    rem_child = rem_children.next();
                }
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.local_only.is_empty() && self.remote_only.is_empty()
    }
}
