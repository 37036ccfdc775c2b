//! OrderManager — construction, lifecycle operations, read accessors
//!
//! The manager owns the entity store handle and the change broadcast
//! channel. Ledger, transfer and payment operations live in their own
//! files as further `impl OrderManager` blocks.

use std::path::Path;

use tokio::sync::broadcast;
use tracing::{debug, info};

use shared::models::{Order, OrderStatus};
use shared::util;

use crate::config::{CoreConfig, CreationPolicy};
use crate::events::{Collection, StoreChange};
use crate::store::EntityStore;

use super::error::{OrderError, OrderResult};

/// Change broadcast capacity; slow subscribers lag rather than block
/// the write path.
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Transactional order engine over an explicit store handle.
///
/// No process-wide database reference: every manager is constructed
/// against the store it operates on.
pub struct OrderManager {
    store: EntityStore,
    change_tx: broadcast::Sender<StoreChange>,
    config: CoreConfig,
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager")
            .field("store", &"<EntityStore>")
            .field("config", &self.config)
            .finish()
    }
}

impl OrderManager {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: CoreConfig) -> OrderResult<Self> {
        let store = EntityStore::open(path)?;
        Ok(Self::with_store(store, config))
    }

    /// Wrap an existing store (tests, tooling, restore drivers).
    pub fn with_store(store: EntityStore, config: CoreConfig) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            change_tx,
            config,
        }
    }

    /// Subscribe to per-collection change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.change_tx.subscribe()
    }

    /// The underlying entity store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub(crate) fn notify(&self, changes: impl IntoIterator<Item = StoreChange>) {
        for change in changes {
            // Nobody listening is fine
            let _ = self.change_tx.send(change);
        }
    }

    // ========== Lifecycle ==========

    /// Open an order for a table or walk-in tab.
    ///
    /// If the table already holds an active order the configured
    /// [`CreationPolicy`] decides: return it unchanged (default) or
    /// fail with [`OrderError::TableOccupied`].
    pub fn open_table(
        &self,
        table_number: &str,
        customer_name: Option<String>,
    ) -> OrderResult<Order> {
        let txn = self.store.begin_write()?;

        if let Some(existing_id) = self.store.find_active_order_for_table_txn(&txn, table_number)? {
            return match self.config.creation_policy {
                CreationPolicy::ReturnExisting => {
                    let order = self
                        .store
                        .get_order_txn(&txn, &existing_id)?
                        .ok_or(OrderError::OrderNotFound(existing_id))?;
                    debug!(order_id = %order.id, table = %table_number, "Table already open, returning existing order");
                    // Transaction dropped without commit: nothing written
                    Ok(order)
                }
                CreationPolicy::Reject => Err(OrderError::TableOccupied(format!(
                    "Table {} is already occupied (order: {})",
                    table_number, existing_id
                ))),
            };
        }

        let customer_name = customer_name.or_else(|| {
            util::is_walk_in(table_number).then(|| self.config.walk_in_label.clone())
        });
        let order = Order::new(table_number, customer_name);

        self.store.put_order(&txn, &order)?;
        self.store.set_table_index(&txn, table_number, &order.id)?;
        txn.commit()?;

        info!(order_id = %order.id, table = %table_number, "Order opened");
        self.notify([StoreChange::order(Collection::Orders, &order.id)]);
        Ok(order)
    }

    /// Transition between the two non-terminal statuses.
    ///
    /// `Paid` is the payment processor's job and `Cancelled` has its
    /// own operation; both are rejected here.
    pub fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<()> {
        if !matches!(status, OrderStatus::Open | OrderStatus::Served) {
            return Err(OrderError::Validation(format!(
                "update_status only accepts OPEN or SERVED, got {:?}",
                status
            )));
        }

        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Err(OrderError::Validation(format!(
                "order {} is {:?} and cannot change status",
                order_id, order.status
            )));
        }

        order.status = status;
        order.updated_at = util::now_millis();
        self.store.put_order(&txn, &order)?;
        txn.commit()?;

        info!(order_id = %order_id, status = ?status, "Order status updated");
        self.notify([StoreChange::order(Collection::Orders, order_id)]);
        Ok(())
    }

    /// Hard-delete an order and cascade its items. No-op when the
    /// order does not exist.
    pub fn delete_order(&self, order_id: &str) -> OrderResult<()> {
        let txn = self.store.begin_write()?;
        let Some(order) = self.store.get_order_txn(&txn, order_id)? else {
            debug!(order_id = %order_id, "delete_order on missing order, ignoring");
            return Ok(());
        };

        for item in self.store.items_for_order_txn(&txn, order_id)? {
            self.store.remove_item(&txn, order_id, item.id)?;
        }
        self.store.remove_order(&txn, order_id)?;
        self.release_table(&txn, &order)?;
        txn.commit()?;

        info!(order_id = %order_id, table = %order.table_number, "Order deleted");
        self.notify([
            StoreChange::order(Collection::Orders, order_id),
            StoreChange::order(Collection::OrderItems, order_id),
        ]);
        Ok(())
    }

    /// Cancel an order: terminal status, table freed, item rows kept
    /// for the record.
    pub fn cancel_order(&self, order_id: &str) -> OrderResult<()> {
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if !order.is_active() {
            return Err(OrderError::Validation(format!(
                "order {} is {:?} and cannot be cancelled",
                order_id, order.status
            )));
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = util::now_millis();
        self.store.put_order(&txn, &order)?;
        self.release_table(&txn, &order)?;
        txn.commit()?;

        info!(order_id = %order_id, table = %order.table_number, "Order cancelled");
        self.notify([StoreChange::order(Collection::Orders, order_id)]);
        Ok(())
    }

    /// Delete active orders that never received an item (abandoned
    /// zero-total tabs). Returns the deleted order ids.
    pub fn purge_empty_orders(&self) -> OrderResult<Vec<String>> {
        let mut purged = Vec::new();
        for order in self.store.active_orders()? {
            if self.store.items_for_order(&order.id)?.is_empty() {
                self.delete_order(&order.id)?;
                purged.push(order.id);
            }
        }
        if !purged.is_empty() {
            info!(count = purged.len(), "Purged empty orders");
        }
        Ok(purged)
    }

    /// Drop the table index entry if it still points at this order.
    ///
    /// A merge may already have repointed the label at the surviving
    /// order; the entry must not be cleared from under it.
    pub(crate) fn release_table(
        &self,
        txn: &redb::WriteTransaction,
        order: &Order,
    ) -> OrderResult<()> {
        if let Some(holder) = self
            .store
            .find_active_order_for_table_txn(txn, &order.table_number)?
            && holder == order.id
        {
            self.store.clear_table_index(txn, &order.table_number)?;
        }
        Ok(())
    }

    // ========== Read Accessors ==========

    /// The unique active order for a table, if any.
    pub fn order_by_table(&self, table_number: &str) -> OrderResult<Option<Order>> {
        let Some(order_id) = self.store.find_active_order_for_table(table_number)? else {
            return Ok(None);
        };
        Ok(self.store.get_order(&order_id)?)
    }

    pub fn order_by_id(&self, order_id: &str) -> OrderResult<Option<Order>> {
        Ok(self.store.get_order(order_id)?)
    }

    /// Distinct table labels currently holding an active order.
    pub fn active_tables(&self) -> OrderResult<Vec<String>> {
        Ok(self.store.active_tables()?)
    }

    /// All active orders, most recently touched first.
    pub fn active_orders(&self) -> OrderResult<Vec<Order>> {
        let mut orders = self.store.active_orders()?;
        orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> OrderManager {
        let store = EntityStore::open_in_memory().unwrap();
        OrderManager::with_store(store, CoreConfig::default())
    }

    fn manager_with_policy(policy: CreationPolicy) -> OrderManager {
        let store = EntityStore::open_in_memory().unwrap();
        let config = CoreConfig {
            creation_policy: policy,
            ..CoreConfig::default()
        };
        OrderManager::with_store(store, config)
    }

    #[test]
    fn open_table_is_idempotent_under_default_policy() {
        let mgr = manager();
        let first = mgr.open_table("A1", None).unwrap();
        let second = mgr.open_table("A1", None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, OrderStatus::Open);
        assert_eq!(mgr.active_tables().unwrap(), vec!["A1"]);
    }

    #[test]
    fn open_table_rejects_under_reject_policy() {
        let mgr = manager_with_policy(CreationPolicy::Reject);
        mgr.open_table("A1", None).unwrap();
        let err = mgr.open_table("A1", None).unwrap_err();
        assert!(matches!(err, OrderError::TableOccupied(_)));
    }

    #[test]
    fn walk_in_gets_default_customer_name() {
        let mgr = manager();
        let tab = shared::util::walk_in_table_id();
        let order = mgr.open_table(&tab, None).unwrap();
        assert_eq!(order.customer_name.as_deref(), Some("Walk-in"));

        let named = mgr.open_table("Walk-in-99", Some("Asha".into())).unwrap();
        assert_eq!(named.customer_name.as_deref(), Some("Asha"));

        // Physical tables get no synthetic name
        let table = mgr.open_table("C3", None).unwrap();
        assert!(table.customer_name.is_none());
    }

    #[test]
    fn paid_table_can_be_reopened_with_fresh_order() {
        let mgr = manager();
        let first = mgr.open_table("A1", None).unwrap();
        mgr.update_status(&first.id, OrderStatus::Served).unwrap();
        mgr.process_payment(&first.id, 0.0, 0.0).unwrap();

        let second = mgr.open_table("A1", None).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn update_status_enforces_the_state_machine() {
        let mgr = manager();
        let order = mgr.open_table("A1", None).unwrap();

        mgr.update_status(&order.id, OrderStatus::Served).unwrap();
        let loaded = mgr.order_by_id(&order.id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Served);
        assert!(loaded.updated_at >= order.updated_at);

        // Back to Open is allowed (kitchen un-confirms)
        mgr.update_status(&order.id, OrderStatus::Open).unwrap();

        let err = mgr.update_status(&order.id, OrderStatus::Paid).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        let err = mgr
            .update_status(&order.id, OrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));

        let err = mgr.update_status("missing", OrderStatus::Served).unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[test]
    fn delete_order_is_idempotent_and_cascades() {
        let mgr = manager();
        let order = mgr.open_table("A1", None).unwrap();
        mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();

        mgr.delete_order(&order.id).unwrap();
        assert!(mgr.order_by_id(&order.id).unwrap().is_none());
        assert!(mgr.store().items_for_order(&order.id).unwrap().is_empty());
        assert!(mgr.active_tables().unwrap().is_empty());

        // Second delete is a no-op
        mgr.delete_order(&order.id).unwrap();
    }

    #[test]
    fn cancel_order_frees_table_but_keeps_items() {
        let mgr = manager();
        let order = mgr.open_table("A1", None).unwrap();
        mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();

        mgr.cancel_order(&order.id).unwrap();
        let loaded = mgr.order_by_id(&order.id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Cancelled);
        assert_eq!(mgr.store().items_for_order(&order.id).unwrap().len(), 1);
        assert!(mgr.active_tables().unwrap().is_empty());

        let err = mgr.cancel_order(&order.id).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn purge_empty_orders_only_touches_itemless_active_orders() {
        let mgr = manager();
        let empty = mgr.open_table("A1", None).unwrap();
        let busy = mgr.open_table("B2", None).unwrap();
        mgr.add_item(&busy.id, "Naan", "Breads", 30.0).unwrap();

        let purged = mgr.purge_empty_orders().unwrap();
        assert_eq!(purged, vec![empty.id.clone()]);
        assert!(mgr.order_by_id(&empty.id).unwrap().is_none());
        assert!(mgr.order_by_id(&busy.id).unwrap().is_some());
    }

    #[test]
    fn accessors_filter_to_active_orders() {
        let mgr = manager();
        let a1 = mgr.open_table("A1", None).unwrap();
        let b2 = mgr.open_table("B2", None).unwrap();
        mgr.update_status(&b2.id, OrderStatus::Served).unwrap();
        mgr.process_payment(&b2.id, 0.0, 0.0).unwrap();

        assert_eq!(mgr.active_tables().unwrap(), vec!["A1"]);
        let active = mgr.active_orders().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a1.id);

        assert!(mgr.order_by_table("B2").unwrap().is_none());
        assert_eq!(mgr.order_by_table("A1").unwrap().unwrap().id, a1.id);
        // Paid order still reachable by id
        assert!(mgr.order_by_id(&b2.id).unwrap().is_some());
    }

    #[test]
    fn notifications_follow_commits() {
        let mgr = manager();
        let mut rx = mgr.subscribe();

        let order = mgr.open_table("A1", None).unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.collection, Collection::Orders);
        assert_eq!(change.order_id.as_deref(), Some(order.id.as_str()));

        // A failed operation publishes nothing
        assert!(mgr.update_status("missing", OrderStatus::Served).is_err());
        assert!(rx.try_recv().is_err());
    }
}
