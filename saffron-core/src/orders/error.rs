//! Order domain errors

use thiserror::Error;

use crate::store::StorageError;

/// Error taxonomy for the order core
///
/// Storage failures surface as-is with the transaction rolled back;
/// the core never retries on the caller's behalf.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Item not found: order_id={0}, item_id={1}")]
    ItemNotFound(String, u64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Table is already occupied: {0}")]
    TableOccupied(String),
}

/// `txn.commit()` hands back a raw redb error; route it through the
/// storage taxonomy like every other redb error class.
impl From<redb::CommitError> for OrderError {
    fn from(err: redb::CommitError) -> Self {
        OrderError::Storage(StorageError::Commit(err))
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;

    // Every mutating operation ends with `txn.commit()?` inside a
    // function returning OrderResult; the conversion must land in
    // the Storage variant.
    #[test]
    fn commit_errors_surface_as_storage_errors() {
        fn commit_once(store: &EntityStore) -> OrderResult<()> {
            let txn = store.begin_write()?;
            txn.commit()?;
            Ok(())
        }

        let store = EntityStore::open_in_memory().unwrap();
        assert!(commit_once(&store).is_ok());

        let err = OrderError::from(StorageError::Backup("disk full".into()));
        assert!(matches!(err, OrderError::Storage(_)));
    }
}
