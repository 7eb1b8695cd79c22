/// Database model definitions.
pub mod models;
/// Local key/value cache mirroring a session's progress.
pub mod progress_cache;
/// Remote record store abstraction and its backends.
pub mod record_store;
/// Storage abstraction layer for record store operations.
pub mod storage;
