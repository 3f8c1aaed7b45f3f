//! Generation-checked table of live contexts.
//!
//! Coordinators never hold references to contexts. They store a [`ContextId`]
//! and ask the table whether it is still live, so a coordinator can outlive
//! (and never pin) the sessions that touched it.
//!
//! Vacated slots go on a free list and are reused with a bumped generation,
//! so a stale id can never alias a newer context.

use parking_lot::Mutex;
use std::fmt;

/// Handle naming one context within its manager.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId {
    index: u32,
    generation: u32,
}

impl ContextId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({}:{})", self.index, self.generation)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context #{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
enum Slot {
    Occupied { generation: u32 },
    Vacant { next_free: Option<u32>, generation: u32 },
}

#[derive(Debug, Default)]
struct Slots {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    len: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ContextTable {
    inner: Mutex<Slots>,
}

impl ContextTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self) -> ContextId {
        let mut table = self.inner.lock();
        table.len += 1;

        if let Some(index) = table.free_head {
            if let Slot::Vacant {
                next_free,
                generation,
            } = table.slots[index as usize]
            {
                table.free_head = next_free;
                table.slots[index as usize] = Slot::Occupied { generation };
                return ContextId { index, generation };
            }
        }

        let index = table.slots.len() as u32;
        table.slots.push(Slot::Occupied { generation: 0 });
        ContextId {
            index,
            generation: 0,
        }
    }

    /// Vacate the slot for `id`. Returns false if it was already stale.
    pub(crate) fn remove(&self, id: ContextId) -> bool {
        let mut guard = self.inner.lock();
        let table = &mut *guard;

        let Some(slot) = table.slots.get_mut(id.index as usize) else {
            return false;
        };
        match *slot {
            Slot::Occupied { generation } if generation == id.generation => {}
            _ => return false,
        }

        *slot = Slot::Vacant {
            next_free: table.free_head,
            generation: id.generation.wrapping_add(1),
        };
        table.free_head = Some(id.index);
        table.len -= 1;
        true
    }

    pub(crate) fn is_live(&self, id: ContextId) -> bool {
        let table = self.inner.lock();
        matches!(
            table.slots.get(id.index as usize),
            Some(Slot::Occupied { generation }) if *generation == id.generation
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let table = ContextTable::new();
        let a = table.insert();
        let b = table.insert();

        assert_ne!(a, b);
        assert!(table.is_live(a));
        assert!(table.is_live(b));
        assert_eq!(table.len(), 2);

        assert!(table.remove(a));
        assert!(!table.is_live(a));
        assert!(!table.remove(a), "second removal is stale");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let table = ContextTable::new();
        let old = table.insert();
        table.remove(old);

        let new = table.insert();
        assert_eq!(new.index(), old.index());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(table.is_live(new));
        assert!(!table.is_live(old));
    }

    #[test]
    fn test_unknown_index_is_not_live() {
        let table = ContextTable::new();
        let id = table.insert();
        let other = ContextTable::new();
        assert!(!other.is_live(id));
    }
}
