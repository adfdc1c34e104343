//! Persistence adapters

mod store;

pub use store::SqliteHistoryStore;
