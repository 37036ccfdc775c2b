//! Line-item ledger
//!
//! Every mutator runs the row change and the order-total recompute in
//! one write transaction; an item change with a stale order total is
//! an invariant violation and must never be observable.

use tracing::{debug, info};

use shared::models::{Order, OrderItem};
use shared::util;

use crate::events::{Collection, StoreChange};
use crate::money;

use super::error::{OrderError, OrderResult};
use super::manager::OrderManager;

impl OrderManager {
    /// Add one unit of an item to an order's bill.
    ///
    /// Collapses into an existing same-name line unless that line was
    /// carried in by a merge (`original_table` set) — merged-in lines
    /// stay distinguishable. Returns the affected line.
    pub fn add_item(
        &self,
        order_id: &str,
        item_name: &str,
        category_name: &str,
        rate: f64,
    ) -> OrderResult<OrderItem> {
        money::validate_rate(rate)?;

        let txn = self.store().begin_write()?;
        let mut order = self.load_active_order(&txn, order_id)?;

        let mut items = self.store().items_for_order_txn(&txn, order_id)?;
        let existing = items
            .iter()
            .position(|item| item.item_name == item_name && !item.is_merged_in());

        let affected = match existing {
            Some(idx) => {
                let item = &mut items[idx];
                money::validate_quantity(item.quantity + 1)?;
                item.quantity += 1;
                item.total = money::line_total(item.quantity, item.rate);
                self.store().put_item(&txn, item)?;
                debug!(order_id = %order_id, item_id = item.id, quantity = item.quantity, "Line quantity incremented");
                item.clone()
            }
            None => {
                let item = OrderItem {
                    id: self.store().next_item_id(&txn)?,
                    order_id: order_id.to_string(),
                    item_name: item_name.to_string(),
                    category_name: category_name.to_string(),
                    quantity: 1,
                    rate,
                    total: money::line_total(1, rate),
                    original_table: None,
                };
                self.store().put_item(&txn, &item)?;
                items.push(item.clone());
                debug!(order_id = %order_id, item_id = item.id, item = %item_name, "Line added");
                item
            }
        };

        self.refresh_order_total(&txn, &mut order, &items)?;
        txn.commit()?;

        info!(order_id = %order_id, item = %item_name, total = order.total_amount, "Item added");
        self.notify_ledger_change(order_id);
        Ok(affected)
    }

    /// Delete a whole line. There is deliberately no decrement-by-one
    /// here; quantity corrections go through [`Self::update_line_item`].
    pub fn remove_item(&self, order_id: &str, item_id: u64) -> OrderResult<()> {
        let txn = self.store().begin_write()?;
        let mut order = self.load_active_order(&txn, order_id)?;

        if !self.store().remove_item(&txn, order_id, item_id)? {
            return Err(OrderError::ItemNotFound(order_id.to_string(), item_id));
        }

        let items = self.store().items_for_order_txn(&txn, order_id)?;
        self.refresh_order_total(&txn, &mut order, &items)?;
        txn.commit()?;

        info!(order_id = %order_id, item_id, total = order.total_amount, "Item removed");
        self.notify_ledger_change(order_id);
        Ok(())
    }

    /// Manual correction of a line's quantity and rate.
    pub fn update_line_item(
        &self,
        order_id: &str,
        item_id: u64,
        quantity: i32,
        rate: f64,
    ) -> OrderResult<OrderItem> {
        money::validate_quantity(quantity)?;
        money::validate_rate(rate)?;

        let txn = self.store().begin_write()?;
        let mut order = self.load_active_order(&txn, order_id)?;

        let mut items = self.store().items_for_order_txn(&txn, order_id)?;
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| OrderError::ItemNotFound(order_id.to_string(), item_id))?;

        item.quantity = quantity;
        item.rate = rate;
        item.total = money::line_total(quantity, rate);
        self.store().put_item(&txn, item)?;
        let updated = item.clone();

        self.refresh_order_total(&txn, &mut order, &items)?;
        txn.commit()?;

        info!(order_id = %order_id, item_id, quantity, rate, "Line updated");
        self.notify_ledger_change(order_id);
        Ok(updated)
    }

    /// All lines on an order's bill, oldest first. Read only.
    pub fn order_items(&self, order_id: &str) -> OrderResult<Vec<OrderItem>> {
        Ok(self.store().items_for_order(order_id)?)
    }

    /// Load an order for a ledger mutation: it must exist and still
    /// be active.
    fn load_active_order(
        &self,
        txn: &redb::WriteTransaction,
        order_id: &str,
    ) -> OrderResult<Order> {
        let order = self
            .store()
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if !order.is_active() {
            return Err(OrderError::Validation(format!(
                "order {} is {:?} and its bill can no longer change",
                order_id, order.status
            )));
        }
        Ok(order)
    }

    /// Recompute `total_amount` from the given item set and stamp the
    /// order, inside the caller's transaction.
    fn refresh_order_total(
        &self,
        txn: &redb::WriteTransaction,
        order: &mut Order,
        items: &[OrderItem],
    ) -> OrderResult<()> {
        order.total_amount = money::sum(items.iter().map(|item| item.total));
        order.updated_at = util::now_millis();
        self.store().put_order(txn, order)?;
        Ok(())
    }

    fn notify_ledger_change(&self, order_id: &str) {
        self.notify([
            StoreChange::order(Collection::OrderItems, order_id),
            StoreChange::order(Collection::Orders, order_id),
        ]);
    }
}
