//! Test harness


pub use db_manager::TestDatabaseManager;
