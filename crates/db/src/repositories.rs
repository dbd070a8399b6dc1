pub mod booking;
pub mod category;
pub mod time_slot;
pub mod user;

use calbook_core::errors::CalendarError;

/// Wrap a driver error into the domain error taxonomy.
pub(crate) fn db_error(err: sqlx::Error) -> CalendarError {
    CalendarError::Database(eyre::Report::new(err))
}

/// Postgres unique-constraint violation (SQLSTATE 23505). A write racing
/// past the advisory pre-check surfaces as this and must be translated to a
/// domain conflict, never a server error.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|db| db.code()),
        Some(code) if code == "23505"
    )
}
