//! Generational Arena
//!
//! Signals and effects point at each other constantly, and either side can be
//! torn down at any moment. Rather than sharing pointers, every node lives in
//! an arena slot and is addressed by a `{index, generation}` key.
//!
//! Removing a node empties its slot and bumps the slot's generation, so any
//! key still floating around (in a subscriber set, a pending batch, a stale
//! closure) simply fails to resolve instead of reaching a recycled node.

use std::marker::PhantomData;

/// A typed key into an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    /// Build a key from its raw parts.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// The slot index.
    fn index(self) -> u32;

    /// The slot generation this key was issued for.
    fn generation(self) -> u32;
}

/// Define a public arena key type with a short display prefix.
macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $crate::graph::arena::ArenaKey for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}{}v{}", $prefix, self.index, self.generation)
            }
        }
    };
}

pub(crate) use arena_key;

struct Slot<V> {
    generation: u32,
    value: Option<V>,
}

/// Slot storage with O(1) insert, lookup and tombstoning removal.
pub struct Arena<K, V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> Arena<K, V> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Store a value, reusing a vacated slot when one is available.
    pub fn insert(&mut self, value: V) -> K {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.value = Some(value);
                return K::from_parts(index, slot.generation);
            }
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        K::from_parts(index, 0)
    }

    /// Resolve a key, or `None` if its node has been removed.
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots
            .get(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Resolve a key mutably.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots
            .get_mut(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Whether the key still resolves.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Remove a node and retire its key.
    ///
    /// Returns `None` if the key was already stale.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let index = key.index();
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != key.generation() {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl<K: ArenaKey, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
