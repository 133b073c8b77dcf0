pub mod change;
pub mod entry;
pub mod table;

pub use change::{StoreChange, SubscriptionId};
pub use entry::Entry;
pub use table::KeyValueStore;
