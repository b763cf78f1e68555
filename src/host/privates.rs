use std::{any::Any, collections::HashMap, rc::Rc};

/// Registered key for a private slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrivateKey(pub &'static str);

/// Opaque per-object side table: components hang their own state off a host object by key.
#[derive(Default)]
pub struct Privates {
    slots: HashMap<PrivateKey, Rc<dyn Any>>,
}

impl Privates {
    /// Store `value` under `key`, replacing whatever was there.
    pub fn set<T: Any>(&mut self, key: PrivateKey, value: Rc<T>) {
        self.slots.insert(key, value);
    }

    /// Fetch the value under `key` if it has type `T`.
    pub fn get<T: Any>(&self, key: PrivateKey) -> Option<Rc<T>> {
        self.slots
            .get(&key)
            .and_then(|v| Rc::clone(v).downcast::<T>().ok())
    }

    /// Clear `key`. Returns `true` if something was removed.
    pub fn remove(&mut self, key: PrivateKey) -> bool {
        self.slots.remove(&key).is_some()
    }

    /// Whether `key` holds a value.
    pub fn contains(&self, key: PrivateKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` with no occupied slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/privates.rs"]
mod tests;
