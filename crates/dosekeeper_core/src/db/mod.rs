//! Dose tracker storage bootstrap.
//!
//! Connections leave this module with foreign keys on, a busy timeout set
//! and every migration applied; the tracker tables are checked before the
//! connection is handed to repositories. Instants are stored as Unix epoch
//! milliseconds.

mod error;
pub mod migrations;
mod open;

pub use error::{DbError, DbResult};
pub use open::{open_db, open_db_in_memory};
