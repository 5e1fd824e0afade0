#![forbid(unsafe_code)]

pub mod kv;
pub mod repository;
pub mod session;
pub mod sqlite;

pub use kv::{InMemoryKeyValueStore, JsonFileKeyValueStore, KeyValueStore};
pub use repository::{
    InMemoryRepository, MemberRepository, Storage, StorageError, StressTestFilter,
    StressTestRepository,
};
pub use session::{SessionRegion, SessionStateStore};
