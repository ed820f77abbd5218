pub mod models;
pub mod sqlite_store;

pub use sqlite_store::SqliteMatchStore;
