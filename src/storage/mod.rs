//! Local key-value persistence backed by SQLite.
//!
//! Only the preference surface lives here: one `user_preferences` table,
//! read once at startup and written on every preference change.

mod preferences;
mod schema;
mod types;

pub use schema::Database;
pub use types::DatabaseError;
