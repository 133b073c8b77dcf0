use super::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange<'a> {
    Appended { index: usize, entry: &'a Entry },
    Updated {
        index: usize,
        entry: &'a Entry,
        previous: &'a str,
    },
    /// The entry that was at `index` is gone. Later entries shifted down by one.
    Removed { index: usize, entry: &'a Entry },
}

impl<'a> StoreChange<'a> {
    pub fn index(&self) -> usize {
        match *self {
            StoreChange::Appended { index, .. }
            | StoreChange::Updated { index, .. }
            | StoreChange::Removed { index, .. } => index,
        }
    }

    pub fn entry(&self) -> &'a Entry {
        match *self {
            StoreChange::Appended { entry, .. }
            | StoreChange::Updated { entry, .. }
            | StoreChange::Removed { entry, .. } => entry,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreChange::Appended { .. } => "append",
            StoreChange::Updated { .. } => "update",
            StoreChange::Removed { .. } => "remove",
        }
    }
}

/// Handle returned by [`KeyValueStore::subscribe`](super::KeyValueStore::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) type Observer = Box<dyn FnMut(&StoreChange<'_>) + Send>;
