//! Document repositories
//!
//! The adapter consumes repositories through the `DocumentRepository` trait.
//! `SqliteRepository` is the persistent implementation; `MemoryRepository`
//! keeps everything in process.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;
pub use traits::{
    DocumentRepository, OpenRepository, ShapeFilter, ShapeRegistry, StorageError, StorageResult,
};
