pub use self::bootstrap::Bootstrap;
pub use self::error::DatabaseError;
pub use self::stores::DemoStore;

#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteDemoStore;

pub mod bootstrap;
pub mod error;
pub mod models;
pub mod runner;
pub mod stores;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
