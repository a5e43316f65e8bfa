//! Database layer
//!
//! SQLite is the default for single-binary deployment; MySQL is supported
//! for larger installs. The driver is chosen from configuration.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
