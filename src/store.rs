//! Object store
//!
//! Typed, indexed in-memory collections with undo sessions.
//!
//! Each entity family lives in one [`Table`]: a `BTreeMap` of rows keyed by
//! [`ObjectId`] plus one ordered secondary index. The secondary index holds
//! `(IndexKey, ObjectId)` composites, where `IndexKey` is a per-table enum
//! whose variants are the table's declared orderings (by_price,
//! by_expiration, ...). Enum discriminant ordering keeps the variants in
//! disjoint ranges of one map, so a single `BTreeMap` serves every declared
//! index - the same shape the multi-index container gives the original.
//!
//! # Undo sessions
//!
//! All mutations push their inverses onto an undo stack. Sessions nest LIFO:
//! a transaction is one inner session, a block the outer one. `commit`
//! merges the top session into its parent (or discards records when it is
//! outermost); `undo` replays inverses back to the session mark.
//!
//! # Determinism
//!
//! Every traversal is over `BTreeMap` ranges; ties always break by
//! `ObjectId`. Nothing here ever iterates a hash map.

use crate::core_types::ObjectId;
use crate::error::{ChainError, ChainResult};
use std::collections::BTreeMap;
use std::ops::Bound;

/// An entity storable in a [`Table`].
pub trait StoreObject: Clone {
    /// Per-table index-key enum; variants are the declared orderings.
    type IndexKey: Ord + Clone;

    fn id(&self) -> ObjectId;

    /// Every key this row occupies in the secondary index.
    fn index_keys(&self) -> Vec<Self::IndexKey>;
}

enum UndoOp<T: StoreObject> {
    /// Row was created; inverse removes it and restores the id counter.
    Create { id: ObjectId, prev_next_id: ObjectId },
    /// Row was modified; inverse restores the prior copy.
    Modify { prev: T },
    /// Row was removed; inverse reinserts the prior copy.
    Remove { prev: T },
}

pub struct Table<T: StoreObject> {
    rows: BTreeMap<ObjectId, T>,
    index: BTreeMap<(T::IndexKey, ObjectId), ()>,
    next_id: ObjectId,
    undo: Vec<UndoOp<T>>,
    marks: Vec<usize>,
}

impl<T: StoreObject> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoreObject> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            index: BTreeMap::new(),
            next_id: 1,
            undo: Vec::new(),
            marks: Vec::new(),
        }
    }

    // ============================================================
    // MUTATIONS
    // ============================================================

    /// Create a row. The constructor receives the assigned id and must
    /// store it in the object verbatim.
    pub fn create(&mut self, init: impl FnOnce(ObjectId) -> T) -> ObjectId {
        let id = self.next_id;
        let obj = init(id);
        debug_assert_eq!(obj.id(), id, "constructor must keep the assigned id");
        for key in obj.index_keys() {
            self.index.insert((key, id), ());
        }
        self.rows.insert(id, obj);
        self.undo.push(UndoOp::Create {
            id,
            prev_next_id: self.next_id,
        });
        self.next_id += 1;
        id
    }

    /// Apply `mutator` to the row, keeping the index in sync.
    pub fn modify(&mut self, id: ObjectId, mutator: impl FnOnce(&mut T)) -> ChainResult {
        let obj = self
            .rows
            .get_mut(&id)
            .ok_or(ChainError::unknown("object", id))?;
        let prev = obj.clone();
        mutator(obj);
        debug_assert_eq!(obj.id(), id, "mutator must not change the id");
        let new_keys = obj.index_keys();
        let old_keys = prev.index_keys();
        if new_keys != old_keys {
            for key in old_keys {
                self.index.remove(&(key, id));
            }
            for key in new_keys {
                self.index.insert((key, id), ());
            }
        }
        self.undo.push(UndoOp::Modify { prev });
        Ok(())
    }

    pub fn remove(&mut self, id: ObjectId) -> ChainResult {
        let obj = self
            .rows
            .remove(&id)
            .ok_or(ChainError::unknown("object", id))?;
        for key in obj.index_keys() {
            self.index.remove(&(key, id));
        }
        self.undo.push(UndoOp::Remove { prev: obj });
        Ok(())
    }

    // ============================================================
    // QUERIES
    // ============================================================

    #[inline]
    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn require(&self, id: ObjectId, kind: &'static str) -> ChainResult<&T> {
        self.rows.get(&id).ok_or(ChainError::unknown(kind, id))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in id order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.rows.values()
    }

    /// Rows whose index key falls in `[lower, upper)`, in key order,
    /// ties by id. Rows occupying several keys in the span appear once
    /// per key, exactly as a real secondary index would list them.
    pub fn range(
        &self,
        lower: Bound<(T::IndexKey, ObjectId)>,
        upper: Bound<(T::IndexKey, ObjectId)>,
    ) -> impl DoubleEndedIterator<Item = &T> {
        self.index
            .range((lower, upper))
            .map(|((_, id), _)| &self.rows[id])
    }

    /// All rows filed under exactly `key`, ties by id.
    pub fn with_key(&self, key: T::IndexKey) -> impl DoubleEndedIterator<Item = &T> {
        self.range(
            Bound::Included((key.clone(), 0)),
            Bound::Included((key, ObjectId::MAX)),
        )
    }

    /// First row filed under exactly `key` (unique-index lookup).
    pub fn find_by_key(&self, key: T::IndexKey) -> Option<&T> {
        self.with_key(key).next()
    }

    // ============================================================
    // SESSIONS
    // ============================================================

    pub fn begin_session(&mut self) {
        self.marks.push(self.undo.len());
    }

    /// Keep the top session's changes. Outermost commit discards the
    /// undo records; an inner commit folds them into the parent session.
    pub fn commit_session(&mut self) {
        if let Some(mark) = self.marks.pop() {
            if self.marks.is_empty() {
                self.undo.truncate(mark);
            }
        }
    }

    /// Roll the top session back by replaying inverses.
    pub fn undo_session(&mut self) {
        let mark = self.marks.pop().unwrap_or(0);
        while self.undo.len() > mark {
            match self.undo.pop().expect("undo stack length checked") {
                UndoOp::Create { id, prev_next_id } => {
                    if let Some(obj) = self.rows.remove(&id) {
                        for key in obj.index_keys() {
                            self.index.remove(&(key, id));
                        }
                    }
                    self.next_id = prev_next_id;
                }
                UndoOp::Modify { prev } => {
                    let id = prev.id();
                    if let Some(current) = self.rows.get(&id) {
                        for key in current.index_keys() {
                            self.index.remove(&(key, id));
                        }
                    }
                    for key in prev.index_keys() {
                        self.index.insert((key.clone(), id), ());
                    }
                    self.rows.insert(id, prev);
                }
                UndoOp::Remove { prev } => {
                    let id = prev.id();
                    for key in prev.index_keys() {
                        self.index.insert((key.clone(), id), ());
                    }
                    self.rows.insert(id, prev);
                }
            }
        }
    }

    #[cfg(test)]
    fn index_len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: ObjectId,
        owner: String,
        rank: u32,
    }

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    enum ItemKey {
        ByOwner(String),
        ByRank(u32),
    }

    impl StoreObject for Item {
        type IndexKey = ItemKey;

        fn id(&self) -> ObjectId {
            self.id
        }

        fn index_keys(&self) -> Vec<ItemKey> {
            vec![
                ItemKey::ByOwner(self.owner.clone()),
                ItemKey::ByRank(self.rank),
            ]
        }
    }

    fn make(table: &mut Table<Item>, owner: &str, rank: u32) -> ObjectId {
        table.create(|id| Item {
            id,
            owner: owner.to_string(),
            rank,
        })
    }

    #[test]
    fn test_create_find_by_key() {
        let mut t = Table::<Item>::new();
        let a = make(&mut t, "alice", 3);
        make(&mut t, "bob", 1);

        let found = t.find_by_key(ItemKey::ByOwner("alice".into())).unwrap();
        assert_eq!(found.id, a);
        assert_eq!(t.len(), 2);
        assert_eq!(t.index_len(), 4);
    }

    #[test]
    fn test_range_is_ordered() {
        let mut t = Table::<Item>::new();
        make(&mut t, "c", 30);
        make(&mut t, "a", 10);
        make(&mut t, "b", 20);

        let ranks: Vec<u32> = t
            .range(
                Bound::Included((ItemKey::ByRank(0), 0)),
                Bound::Included((ItemKey::ByRank(u32::MAX), ObjectId::MAX)),
            )
            .map(|i| i.rank)
            .collect();
        assert_eq!(ranks, vec![10, 20, 30]);
    }

    #[test]
    fn test_modify_reindexes() {
        let mut t = Table::<Item>::new();
        let id = make(&mut t, "alice", 5);
        t.modify(id, |i| i.rank = 50).unwrap();

        assert!(t.find_by_key(ItemKey::ByRank(5)).is_none());
        assert_eq!(t.find_by_key(ItemKey::ByRank(50)).unwrap().id, id);
    }

    #[test]
    fn test_undo_restores_everything() {
        let mut t = Table::<Item>::new();
        let keep = make(&mut t, "keep", 1);

        t.begin_session();
        let created = make(&mut t, "new", 2);
        t.modify(keep, |i| i.rank = 99).unwrap();
        t.remove(keep).ok();
        t.undo_session();

        assert!(t.get(created).is_none());
        let restored = t.get(keep).unwrap();
        assert_eq!(restored.rank, 1);
        assert_eq!(t.index_len(), 2);

        // id counter rewound: next create reuses the id
        let again = make(&mut t, "again", 3);
        assert_eq!(again, created);
    }

    #[test]
    fn test_nested_sessions_lifo() {
        let mut t = Table::<Item>::new();
        t.begin_session(); // block
        let a = make(&mut t, "a", 1);

        t.begin_session(); // txn 1
        make(&mut t, "b", 2);
        t.undo_session(); // txn 1 fails

        t.begin_session(); // txn 2
        let c = make(&mut t, "c", 3);
        t.commit_session();

        assert_eq!(t.len(), 2);
        t.undo_session(); // whole block rolled back
        assert!(t.get(a).is_none());
        assert!(t.get(c).is_none());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_commit_outermost_discards_undo() {
        let mut t = Table::<Item>::new();
        t.begin_session();
        make(&mut t, "a", 1);
        t.commit_session();
        // nothing to undo now; a later undo_session with no mark is a no-op
        t.undo_session();
        assert_eq!(t.len(), 1);
    }
}
