use std::any::TypeId;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::compile::compile;
use crate::error::BindError;
use crate::plan::Plan;
use crate::reflect::{Reflect, TypeInfo};

/// A grow-only map where every key holds exactly one shared value.
///
/// Lookups take the read lock only. On a miss the value is built without holding any lock, and
/// the first writer wins: callers that raced on the same key all get the stored value back.
pub struct Cache<K, V> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> Cache<K, V> {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.read().get(key).map(Arc::clone)
    }

    /// Returns the stored value, building it with `init` when the key is new.
    ///
    /// A failing `init` stores nothing.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.entries.read().get(&key) {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(init()?);
        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(key).or_insert(value)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Eq + Hash, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("len", &self.entries.read().len()).finish()
    }
}

/// Compiled plans keyed by (type, tag).
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: Cache<(TypeId, &'static str), Plan>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, info: &TypeInfo, tag: &'static str) -> Result<Arc<Plan>, BindError> {
        let key = (info.type_id(), tag);
        if let Some(plan) = self.plans.get(&key) {
            trace!(type_name = info.type_name(), tag, "plan cache hit");
            return Ok(plan);
        }
        self.plans.get_or_try_insert_with(key, || compile(info, tag))
    }

    pub fn get_or_compile_for<T: Reflect>(&self, tag: &'static str) -> Result<Arc<Plan>, BindError> {
        self.get_or_compile(&T::type_info(), tag)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
