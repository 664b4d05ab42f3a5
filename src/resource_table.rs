use crate::mv_error::MvError;
use log::trace;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Opaque handle to an entry in a `ResourceTable`. Keys are versioned so
    /// a released handle never names a later resource.
    pub struct ResourceKey;
}

/// Group an entry is torn down with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Lives until shutdown or an explicit release
    Persistent,
    /// Released with the swapchain generation it was built for
    Swapchain(u64),
}

#[derive(Debug)]
struct Entry<R> {
    resource: R,
    lifetime: Lifetime,
}

/// Arena of GPU objects keyed by opaque handles. Each object has exactly one
/// owner, this table, and is handed back exactly once on release so the
/// backend can destroy it and its memory together.
#[derive(Debug)]
pub struct ResourceTable<R> {
    entries: SlotMap<ResourceKey, Entry<R>>,
    generation: u64,
}

impl<R> Default for ResourceTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ResourceTable<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            generation: 0,
        }
    }

    pub fn insert(&mut self, resource: R, lifetime: Lifetime) -> ResourceKey {
        let key = self.entries.insert(Entry { resource, lifetime });
        trace!("insert {:?} {:?}", key, lifetime);
        key
    }

    /// # Errors
    /// Returns `MvError::StaleHandle` for a released handle
    pub fn get(&self, key: ResourceKey) -> Result<&R, MvError> {
        self.entries
            .get(key)
            .map(|e| &e.resource)
            .ok_or(MvError::StaleHandle)
    }

    /// # Errors
    /// Returns `MvError::StaleHandle` for a released handle
    pub fn get_mut(&mut self, key: ResourceKey) -> Result<&mut R, MvError> {
        self.entries
            .get_mut(key)
            .map(|e| &mut e.resource)
            .ok_or(MvError::StaleHandle)
    }

    #[must_use]
    pub fn contains(&self, key: ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes an entry and hands it back for destruction
    ///
    /// # Errors
    /// Returns `MvError::StaleHandle` if the handle was already released
    pub fn release(&mut self, key: ResourceKey) -> Result<R, MvError> {
        trace!("release {:?}", key);
        self.entries
            .remove(key)
            .map(|e| e.resource)
            .ok_or(MvError::StaleHandle)
    }

    /// Starts a new swapchain generation and returns its number
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Removes every entry built for `generation` at once
    pub fn release_generation(&mut self, generation: u64) -> Vec<R> {
        let keys: Vec<ResourceKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.lifetime == Lifetime::Swapchain(generation))
            .map(|(k, _)| k)
            .collect();
        trace!(
            "release_generation {} with {} entries",
            generation,
            keys.len()
        );
        keys.into_iter()
            .filter_map(|k| self.entries.remove(k))
            .map(|e| e.resource)
            .collect()
    }

    /// Removes everything, for shutdown
    pub fn release_all(&mut self) -> Vec<R> {
        self.entries.drain().map(|(_, e)| e.resource).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live entries in a group
    #[must_use]
    pub fn count(&self, lifetime: Lifetime) -> usize {
        self.entries
            .values()
            .filter(|e| e.lifetime == lifetime)
            .count()
    }
}
