pub mod connection;
pub mod indexes;
pub mod models;
pub mod store;

pub use connection::connect;
pub use indexes::ensure_indexes;
pub use store::{
    DocumentStore, FindOptions, GroupCount, GroupKey, GroupSort, MemoryStore, MongoStore,
    StoreError, StoreResult, UpdateOutcome,
};
