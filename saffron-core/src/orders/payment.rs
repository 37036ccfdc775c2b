//! Payment processing
//!
//! Settlement is a one-way gate: only a Served order can take a
//! payment, and once Paid the order is frozen apart from
//! [`OrderManager::adjust_payment`] corrections. Paying also frees the
//! table for the next party.

use tracing::{info, warn};

use shared::models::{Order, OrderStatus};
use shared::util;

use crate::events::{Collection, StoreChange};
use crate::money;

use super::error::{OrderError, OrderResult};
use super::manager::OrderManager;

impl OrderManager {
    /// Settle a served order with a cash/online tender split.
    ///
    /// The split is recorded as tendered even when it does not cover
    /// the bill exactly; a mismatch is logged, not rejected, since the
    /// floor staff may have comped or rounded.
    pub fn process_payment(&self, order_id: &str, cash: f64, online: f64) -> OrderResult<Order> {
        money::validate_tender(cash, "cash amount")?;
        money::validate_tender(online, "online amount")?;

        let txn = self.store().begin_write()?;
        let mut order = self
            .store()
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if order.status != OrderStatus::Served {
            return Err(OrderError::Validation(format!(
                "order {} is {:?}; only a Served order can be paid",
                order_id, order.status
            )));
        }

        let tendered = money::sum([cash, online]);
        if !money::approx_eq(tendered, order.total_amount) {
            warn!(
                order_id = %order_id,
                tendered,
                total = order.total_amount,
                "Tender split does not match bill total"
            );
        }

        let now = util::now_millis();
        order.status = OrderStatus::Paid;
        order.payment_cash = cash;
        order.payment_online = online;
        order.paid_at = Some(now);
        order.updated_at = now;
        self.store().put_order(&txn, &order)?;
        self.release_table(&txn, &order)?;
        txn.commit()?;

        info!(order_id = %order_id, cash, online, total = order.total_amount, "Payment processed");
        self.notify([StoreChange::order(Collection::Orders, order_id)]);
        Ok(order)
    }

    /// Correct the tender split on an already-paid order.
    ///
    /// After the fact the split is the authority: the bill total is
    /// rewritten to match it, so receipts and the ledger agree.
    pub fn adjust_payment(&self, order_id: &str, cash: f64, online: f64) -> OrderResult<Order> {
        money::validate_tender(cash, "cash amount")?;
        money::validate_tender(online, "online amount")?;

        let txn = self.store().begin_write()?;
        let mut order = self
            .store()
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        if order.status != OrderStatus::Paid {
            return Err(OrderError::Validation(format!(
                "order {} is {:?}; only a Paid order's tender can be adjusted",
                order_id, order.status
            )));
        }

        order.payment_cash = cash;
        order.payment_online = online;
        order.total_amount = money::sum([cash, online]);
        order.updated_at = util::now_millis();
        self.store().put_order(&txn, &order)?;
        txn.commit()?;

        info!(order_id = %order_id, cash, online, "Payment adjusted");
        self.notify([StoreChange::order(Collection::Orders, order_id)]);
        Ok(order)
    }
}
