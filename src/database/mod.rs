// Database module
// SQLite persistence for the job posting corpus

pub mod sqlite;

pub use sqlite::*;
