pub mod file_storage;

pub use file_storage::{FileStore, Store, TransactionPatch};
