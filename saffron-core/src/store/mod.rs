//! redb-based entity store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records |
//! | `order_items` | `(order_id, item_id)` | `OrderItem` | Line items, range-scannable per order |
//! | `active_tables` | `table_number` | `order_id` | Active order index |
//! | `categories` | `category_id` | `Category` | Catalog copy |
//! | `products` | `product_id` | `Product` | Catalog copy |
//! | `counters` | `&str` | `u64` | Item id allocator |
//!
//! Values are JSON-serialized. Write helpers take the caller's
//! `WriteTransaction` so that a multi-entity mutation (an order plus
//! its items plus the table index) commits as one indivisible unit;
//! read accessors open their own read transaction and only ever see
//! committed state.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns
//! the mutation is on disk, and a crash mid-transaction leaves the
//! database at the previous committed state.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use shared::models::{Category, Order, OrderItem, Product};

/// Order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Line items: key = (order_id, item_id), value = JSON-serialized OrderItem
const ORDER_ITEMS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("order_items");

/// Active order index: key = table_number, value = order_id
const ACTIVE_TABLES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("active_tables");

/// Catalog copy: key = category_id, value = JSON-serialized Category
const CATEGORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");

/// Catalog copy: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ITEM_SEQ_KEY: &str = "item_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backup error: {0}")]
    Backup(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Keyed entity collections backed by redb
#[derive(Clone)]
pub struct EntityStore {
    db: Arc<Database>,
}

impl EntityStore {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (tests and tooling).
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_TABLES_TABLE)?;
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ITEM_SEQ_KEY)?.is_none() {
                counters.insert(ITEM_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Operations ==========

    /// Insert or update an order (within transaction).
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = encode(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by id (within transaction).
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an order record (within transaction). Returns whether
    /// anything was removed.
    pub fn remove_order(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        Ok(table.remove(order_id)?.is_some())
    }

    /// Get an order by id (committed view).
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All order records (committed view).
    pub fn all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(decode(value.value())?);
        }
        Ok(orders)
    }

    // ========== Active Table Index ==========

    /// Point the active-table index at `order_id` (within transaction).
    pub fn set_table_index(
        &self,
        txn: &WriteTransaction,
        table_number: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_TABLES_TABLE)?;
        table.insert(table_number, order_id)?;
        Ok(())
    }

    /// Drop the active-table index entry (within transaction).
    pub fn clear_table_index(
        &self,
        txn: &WriteTransaction,
        table_number: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_TABLES_TABLE)?;
        table.remove(table_number)?;
        Ok(())
    }

    /// Find the active order holding `table_number` (within transaction).
    pub fn find_active_order_for_table_txn(
        &self,
        txn: &WriteTransaction,
        table_number: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(ACTIVE_TABLES_TABLE)?;
        Ok(table.get(table_number)?.map(|guard| guard.value().to_string()))
    }

    /// Find the active order holding `table_number` (committed view).
    pub fn find_active_order_for_table(
        &self,
        table_number: &str,
    ) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_TABLES_TABLE)?;
        Ok(table.get(table_number)?.map(|guard| guard.value().to_string()))
    }

    /// Distinct table labels with an active order, in key order.
    pub fn active_tables(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_TABLES_TABLE)?;
        let mut tables = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            tables.push(key.value().to_string());
        }
        Ok(tables)
    }

    /// Active orders, resolved through the index (committed view).
    pub fn active_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACTIVE_TABLES_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in index.iter()? {
            let (_key, order_id) = result?;
            if let Some(guard) = orders_table.get(order_id.value())? {
                orders.push(decode(guard.value())?);
            }
        }
        Ok(orders)
    }

    // ========== Order Item Operations ==========

    /// Allocate the next line-item id (within transaction).
    pub fn next_item_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(ITEM_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(ITEM_SEQ_KEY, next)?;
        Ok(next)
    }

    /// Advance the item id allocator to at least `value` (restore path).
    pub fn set_item_seq(&self, txn: &WriteTransaction, value: u64) -> StorageResult<()> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        table.insert(ITEM_SEQ_KEY, value)?;
        Ok(())
    }

    /// Insert or update a line item under its owning order (within
    /// transaction). The item must already carry a store-assigned id.
    pub fn put_item(&self, txn: &WriteTransaction, item: &OrderItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let key = (item.order_id.as_str(), item.id);
        let value = encode(item)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Remove a line item (within transaction). Returns whether
    /// anything was removed.
    pub fn remove_item(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        item_id: u64,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        Ok(table.remove((order_id, item_id))?.is_some())
    }

    /// All line items for an order, in insertion order (within transaction).
    pub fn items_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            items.push(decode(value.value())?);
        }
        Ok(items)
    }

    /// All line items for an order, in insertion order (committed view).
    pub fn items_for_order(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            items.push(decode(value.value())?);
        }
        Ok(items)
    }

    /// Every line item in the store (backup path).
    pub fn all_items(&self) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            items.push(decode(value.value())?);
        }
        Ok(items)
    }

    // ========== Catalog Operations ==========

    /// Insert or update a category (within transaction).
    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        let value = encode(category)?;
        table.insert(category.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Insert or update a product (within transaction).
    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = encode(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// All categories (committed view).
    pub fn all_categories(&self) -> StorageResult<Vec<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(decode(value.value())?);
        }
        Ok(categories)
    }

    /// All products (committed view).
    pub fn all_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            products.push(decode(value.value())?);
        }
        Ok(products)
    }

    // ========== Bulk Operations (backup/restore) ==========

    /// One consistent snapshot of all four collections.
    pub fn dump(
        &self,
    ) -> StorageResult<(Vec<Category>, Vec<Product>, Vec<Order>, Vec<OrderItem>)> {
        let read_txn = self.db.begin_read()?;

        let mut categories = Vec::new();
        for result in read_txn.open_table(CATEGORIES_TABLE)?.iter()? {
            let (_key, value) = result?;
            categories.push(decode(value.value())?);
        }
        let mut products = Vec::new();
        for result in read_txn.open_table(PRODUCTS_TABLE)?.iter()? {
            let (_key, value) = result?;
            products.push(decode(value.value())?);
        }
        let mut orders = Vec::new();
        for result in read_txn.open_table(ORDERS_TABLE)?.iter()? {
            let (_key, value) = result?;
            orders.push(decode(value.value())?);
        }
        let mut items = Vec::new();
        for result in read_txn.open_table(ORDER_ITEMS_TABLE)?.iter()? {
            let (_key, value) = result?;
            items.push(decode(value.value())?);
        }

        Ok((categories, products, orders, items))
    }

    /// Drop every record in all collections, including the active
    /// table index, and reset the item id allocator (within
    /// transaction). Restore repopulates afterwards.
    pub fn clear_all(&self, txn: &WriteTransaction) -> StorageResult<()> {
        txn.delete_table(ORDERS_TABLE)?;
        txn.delete_table(ORDER_ITEMS_TABLE)?;
        txn.delete_table(ACTIVE_TABLES_TABLE)?;
        txn.delete_table(CATEGORIES_TABLE)?;
        txn.delete_table(PRODUCTS_TABLE)?;

        // Recreate so later helpers in the same transaction see them
        let _ = txn.open_table(ORDERS_TABLE)?;
        let _ = txn.open_table(ORDER_ITEMS_TABLE)?;
        let _ = txn.open_table(ACTIVE_TABLES_TABLE)?;
        let _ = txn.open_table(CATEGORIES_TABLE)?;
        let _ = txn.open_table(PRODUCTS_TABLE)?;

        let mut counters = txn.open_table(COUNTERS_TABLE)?;
        counters.insert(ITEM_SEQ_KEY, 0u64)?;
        Ok(())
    }
}
