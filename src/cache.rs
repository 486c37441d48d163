//! Request-scoped fixture cache.
//!
//! Each request gets its own [`RequestCache`]. Entries are written once and
//! never overwritten for the lifetime of the cache. Every name has its own
//! slot lock, so sub-tasks of one request that race on the same fixture
//! still compute it only once, while different fixtures compute in parallel.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::registry::FixtureValue;

type Slot = Arc<Mutex<Option<FixtureValue>>>;

/// Memoized fixture values for a single request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::{FixtureValue, RequestCache};
///
/// let cache = RequestCache::new();
/// let first = cache
///     .get_or_try_insert_with("n", || Ok::<FixtureValue, ()>(Arc::new(1u8)))
///     .unwrap();
/// let second = cache
///     .get_or_try_insert_with("n", || Ok::<FixtureValue, ()>(Arc::new(2u8)))
///     .unwrap();
///
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Default)]
pub struct RequestCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RequestCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    fn existing_slot(&self, name: &str) -> Option<Slot> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns the cached value for `name`, if populated.
    pub fn get(&self, name: &str) -> Option<FixtureValue> {
        let slot = self.existing_slot(name)?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Returns `true` if `name` is populated.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Stores `value` under `name` unless it is already populated.
    ///
    /// Returns `true` if the value was stored.
    pub fn insert(&self, name: &str, value: FixtureValue) -> bool {
        let slot = self.slot(name);
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_some() {
            return false;
        }
        *current = Some(value);
        true
    }

    /// Returns the value for `name`, computing it with `init` if absent.
    ///
    /// `init` runs at most once per successful population. If it fails the
    /// error is returned, nothing is stored, and a later call runs it again.
    /// Concurrent callers for the same name wait for the one computing it.
    pub fn get_or_try_insert_with<E>(
        &self,
        name: &str,
        init: impl FnOnce() -> Result<FixtureValue, E>,
    ) -> Result<FixtureValue, E> {
        let slot = self.slot(name);
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = current.as_ref() {
            return Ok(Arc::clone(value));
        }
        match init() {
            Ok(value) => {
                *current = Some(Arc::clone(&value));
                Ok(value)
            }
            Err(err) => {
                drop(current);
                self.discard_empty(name, &slot);
                Err(err)
            }
        }
    }

    // Slots are only cloned under the map lock, so a count of two (map and
    // caller) means nobody is waiting on this one.
    fn discard_empty(&self, name: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = slots
            .get(name)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if unused && slot.lock().unwrap_or_else(PoisonError::into_inner).is_none() {
            slots.remove(name);
        }
    }

    /// Names of populated entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();
        let mut keys: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .map(|(name, _)| name)
            .collect();
        keys.sort();
        keys
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns `true` if nothing is populated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("keys", &self.keys())
            .finish()
    }
}
