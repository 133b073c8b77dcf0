use std::fmt;

use indexmap::IndexMap;

use super::change::{Observer, StoreChange, SubscriptionId};
use super::entry::Entry;

// No internal locking; share it behind a mutex.
#[derive(Default)]
pub struct KeyValueStore {
    entries: IndexMap<String, Entry>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without touching the store when `key` is empty.
    pub fn add_or_update(&mut self, key: &str, value: impl Into<String>) -> bool {
        if key.is_empty() {
            return false;
        }
        let value = value.into();

        if let Some(index) = self.entries.get_index_of(key) {
            let entry = &mut self.entries[index];
            let previous = entry.replace_value(value);
            notify(
                &mut self.observers,
                &StoreChange::Updated {
                    index,
                    entry: &*entry,
                    previous: &previous,
                },
            );
        } else {
            let (index, _) = self
                .entries
                .insert_full(key.to_string(), Entry::new(key, value));
            notify(
                &mut self.observers,
                &StoreChange::Appended {
                    index,
                    entry: &self.entries[index],
                },
            );
        }

        true
    }

    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.shift_remove_full(key) {
            Some((index, _, entry)) => {
                notify(&mut self.observers, &StoreChange::Removed { index, entry: &entry });
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Observers run in subscription order, after the change is applied.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange<'_>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }
}

fn notify(observers: &mut [(SubscriptionId, Observer)], change: &StoreChange<'_>) {
    for (_, observer) in observers.iter_mut() {
        observer(change);
    }
}

impl fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish()
    }
}
