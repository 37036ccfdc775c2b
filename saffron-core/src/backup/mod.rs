//! Full-store snapshots
//!
//! A [`BackupDocument`] is a self-contained JSON image of every
//! collection, used for off-device backups and for moving a store
//! between machines. Restoring replaces the store wholesale in one
//! transaction and rebuilds the derived table index, so a torn restore
//! can never be observed.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use shared::models::{Category, Order, OrderItem, Product};
use shared::util;

use crate::events::{Collection, StoreChange};
use crate::orders::{OrderManager, OrderResult};
use crate::store::{EntityStore, StorageError, StorageResult};

pub const BACKUP_VERSION: u32 = 1;

/// On-disk snapshot format. `version` gates future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: u32,
    pub exported_at: i64,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

/// Capture the committed state of every collection.
pub fn export_snapshot(store: &EntityStore) -> StorageResult<BackupDocument> {
    let (categories, products, orders, order_items) = store.dump()?;
    Ok(BackupDocument {
        version: BACKUP_VERSION,
        exported_at: util::now_millis(),
        categories,
        products,
        orders,
        order_items,
    })
}

pub fn write_backup_file(doc: &BackupDocument, path: &Path) -> StorageResult<()> {
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json).map_err(|e| {
        StorageError::Backup(format!("failed to write {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), orders = doc.orders.len(), "Backup written");
    Ok(())
}

pub fn read_backup_file(path: &Path) -> StorageResult<BackupDocument> {
    let json = fs::read_to_string(path).map_err(|e| {
        StorageError::Backup(format!("failed to read {}: {}", path.display(), e))
    })?;
    let doc: BackupDocument = serde_json::from_str(&json)?;
    if doc.version > BACKUP_VERSION {
        return Err(StorageError::Backup(format!(
            "backup version {} is newer than supported version {}",
            doc.version, BACKUP_VERSION
        )));
    }
    Ok(doc)
}

/// Replace the whole store with the snapshot's contents.
///
/// The active-table index is not trusted from the document; it is
/// rebuilt from the restored orders, and the item id allocator is
/// advanced past every restored line.
pub fn restore_snapshot(store: &EntityStore, doc: &BackupDocument) -> StorageResult<()> {
    let txn = store.begin_write()?;
    store.clear_all(&txn)?;

    for category in &doc.categories {
        store.put_category(&txn, category)?;
    }
    for product in &doc.products {
        store.put_product(&txn, product)?;
    }
    for order in &doc.orders {
        store.put_order(&txn, order)?;
        if order.is_active() {
            store.set_table_index(&txn, &order.table_number, &order.id)?;
        }
    }
    let mut max_item_id = 0;
    for item in &doc.order_items {
        store.put_item(&txn, item)?;
        max_item_id = max_item_id.max(item.id);
    }
    store.set_item_seq(&txn, max_item_id)?;
    txn.commit()?;

    info!(
        orders = doc.orders.len(),
        items = doc.order_items.len(),
        "Store restored from backup"
    );
    Ok(())
}

/// Flag orders as exported to the bookkeeping sheet. Unknown ids are
/// skipped; already-flagged orders are left alone.
pub fn mark_orders_exported(store: &EntityStore, order_ids: &[String]) -> StorageResult<usize> {
    let txn = store.begin_write()?;
    let mut marked = 0;
    for order_id in order_ids {
        if let Some(mut order) = store.get_order_txn(&txn, order_id)?
            && !order.exported_to_excel
        {
            order.exported_to_excel = true;
            store.put_order(&txn, &order)?;
            marked += 1;
        }
    }
    txn.commit()?;
    info!(marked, "Orders flagged as exported");
    Ok(marked)
}

impl OrderManager {
    pub fn export_backup(&self, path: &Path) -> OrderResult<BackupDocument> {
        let doc = export_snapshot(self.store())?;
        write_backup_file(&doc, path)?;
        Ok(doc)
    }

    pub fn restore_backup(&self, path: &Path) -> OrderResult<()> {
        let doc = read_backup_file(path)?;
        restore_snapshot(self.store(), &doc)?;
        self.notify([
            StoreChange::collection(Collection::Categories),
            StoreChange::collection(Collection::Products),
            StoreChange::collection(Collection::Orders),
            StoreChange::collection(Collection::OrderItems),
        ]);
        Ok(())
    }

    pub fn mark_exported(&self, order_ids: &[String]) -> OrderResult<usize> {
        let marked = mark_orders_exported(self.store(), order_ids)?;
        if marked > 0 {
            self.notify([StoreChange::collection(Collection::Orders)]);
        }
        Ok(marked)
    }
}
