//! Shared helpers for the Diesel adapters.
//!
//! - logging of Diesel failures before they are mapped to port errors;
//! - `run_in_transaction`, which keeps the body's error when a rollback
//!   also fails;
//! - unique-violation detection for registration.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, TransactionManager};
use tracing::{debug, error};

/// Emit debug context for a failed Diesel operation.
pub(crate) fn log_diesel_error(error: &DieselError, operation: &str) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            %operation,
            "diesel operation failed"
        ),
    }
}

/// Whether the error means the server connection is gone.
pub(crate) fn is_connection_loss(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager
    )
}

/// Whether the error is a unique constraint violation.
pub(crate) fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Run `body` inside a `READ COMMITTED` transaction.
///
/// Commits when the body succeeds and rolls back on any error. If the
/// rollback itself fails the failure is logged and the body's error is still
/// returned. A connection whose rollback failed is left in a broken state,
/// which makes the pool discard it.
pub(crate) async fn run_in_transaction<'a, R, E, F>(
    conn: &mut AsyncPgConnection,
    body: F,
) -> Result<R, E>
where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<R, E>>
        + Send
        + 'a,
    E: From<DieselError> + Send + 'a,
    R: Send + 'a,
{
    AnsiTransactionManager::begin_transaction(conn).await?;

    match body(&mut *conn).await {
        Ok(value) => {
            AnsiTransactionManager::commit_transaction(conn).await?;
            Ok(value)
        }
        Err(body_error) => {
            if let Err(rollback_error) = AnsiTransactionManager::rollback_transaction(conn).await {
                error!(%rollback_error, "ledger transaction rollback failed");
            }
            Err(body_error)
        }
    }
}
