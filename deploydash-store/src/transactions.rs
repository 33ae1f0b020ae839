//! Transaction helper shared by the bulk reconciliation writes.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::StoreError;

/// Run `operation` inside one transaction; commit on `Ok`, roll back on `Err`.
///
/// Rollback happens when the `Transaction` is dropped without commit.
pub(crate) fn execute_in_transaction<F, T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T, StoreError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = operation(&tx)?;
    tx.commit()?;
    Ok(result)
}
