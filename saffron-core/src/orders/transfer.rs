//! Table moves and merges
//!
//! One entry point, [`OrderManager::move_or_merge`]: when the
//! destination table is free the order simply relocates; when another
//! active order already holds it, the two bills fold into one. Either
//! path commits as a single write transaction.

use tracing::info;

use shared::models::Order;
use shared::util;

use crate::events::{Collection, StoreChange};
use crate::money;

use super::error::{OrderError, OrderResult};
use super::manager::OrderManager;

/// Result of [`OrderManager::move_or_merge`].
///
/// `order_id` is the surviving order: the moved order itself, or the
/// destination order after a merge (the source id is gone).
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub merged: bool,
    pub order_id: String,
}

impl OrderManager {
    /// Relocate an active order to another table, merging into the
    /// destination's order if that table is already occupied.
    pub fn move_or_merge(&self, order_id: &str, new_table: &str) -> OrderResult<MoveOutcome> {
        if new_table.trim().is_empty() {
            return Err(OrderError::Validation(
                "destination table number must not be empty".into(),
            ));
        }

        let txn = self.store().begin_write()?;
        let mut order = self
            .store()
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if !order.is_active() {
            return Err(OrderError::Validation(format!(
                "order {} is {:?} and cannot change tables",
                order_id, order.status
            )));
        }

        // Moving to the table it already sits at changes nothing,
        // not even updated_at.
        if order.table_number == new_table {
            return Ok(MoveOutcome {
                merged: false,
                order_id: order.id.clone(),
            });
        }

        let occupant = self.store().find_active_order_for_table_txn(&txn, new_table)?;
        match occupant {
            Some(target_id) if target_id != order.id => {
                let outcome = self.merge_into(&txn, &order, &target_id)?;
                txn.commit()?;
                info!(source = %order_id, target = %outcome.order_id, table = %new_table, "Orders merged");
                self.notify([
                    StoreChange::order(Collection::Orders, order_id),
                    StoreChange::order(Collection::Orders, &outcome.order_id),
                    StoreChange::order(Collection::OrderItems, &outcome.order_id),
                ]);
                Ok(outcome)
            }
            _ => {
                let old_table = order.table_number.clone();
                self.release_table(&txn, &order)?;
                order.push_table(new_table);
                order.updated_at = util::now_millis();
                self.store().put_order(&txn, &order)?;
                self.store().set_table_index(&txn, new_table, &order.id)?;
                txn.commit()?;

                info!(order_id = %order_id, from = %old_table, to = %new_table, "Order moved");
                self.notify([StoreChange::order(Collection::Orders, order_id)]);
                Ok(MoveOutcome {
                    merged: false,
                    order_id: order.id.clone(),
                })
            }
        }
    }

    /// Fold `source` into the order identified by `target_id`, then
    /// delete `source`. Runs inside the caller's transaction.
    fn merge_into(
        &self,
        txn: &redb::WriteTransaction,
        source: &Order,
        target_id: &str,
    ) -> OrderResult<MoveOutcome> {
        let mut target = self
            .store()
            .get_order_txn(txn, target_id)?
            .ok_or_else(|| OrderError::OrderNotFound(target_id.to_string()))?;

        // Re-key every source line under the target, tagging where it
        // came from. Lines that were themselves merged in earlier keep
        // their first provenance.
        let source_items = self.store().items_for_order_txn(txn, &source.id)?;
        for mut item in source_items {
            self.store().remove_item(txn, &source.id, item.id)?;
            item.order_id = target.id.clone();
            if item.original_table.is_none() {
                item.original_table = Some(source.table_number.clone());
            }
            self.store().put_item(txn, &item)?;
        }

        // Fold histories: the tables the source visited come first, so
        // the list still ends at the table everyone now sits at.
        let mut history: Vec<String> = source
            .table_history
            .iter()
            .filter(|t| !target.table_history.contains(t))
            .cloned()
            .collect();
        history.extend(target.table_history.iter().cloned());
        target.table_history = history;

        let target_items = self.store().items_for_order_txn(txn, &target.id)?;
        target.total_amount = money::sum(target_items.iter().map(|item| item.total));
        target.updated_at = util::now_millis();
        self.store().put_order(txn, &target)?;

        // The source order record disappears entirely
        self.release_table(txn, source)?;
        self.store().remove_order(txn, &source.id)?;

        Ok(MoveOutcome {
            merged: true,
            order_id: target.id.clone(),
        })
    }
}
