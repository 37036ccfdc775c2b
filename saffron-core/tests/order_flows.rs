//! End-to-end flows through the public [`OrderManager`] API: the
//! whole life of a dinner service, from seating to settlement, plus
//! the cross-module interactions (merge then pay, backup mid-service)
//! that unit tests do not cover.

use saffron_core::{
    Collection, CoreConfig, CreationPolicy, EntityStore, OrderError, OrderManager,
};
use shared::models::OrderStatus;
use shared::util::is_walk_in;

fn manager() -> OrderManager {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let store = EntityStore::open_in_memory().unwrap();
    OrderManager::with_store(store, CoreConfig::default())
}

#[test]
fn full_service_lifecycle() {
    let mgr = manager();

    // Seat, order two soups, serve, settle with a split tender
    let order = mgr.open_table("C3", Some("Priya".into())).unwrap();
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.table_history, vec!["C3"]);

    mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();
    let line = mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();
    assert_eq!(line.quantity, 2);
    assert_eq!(line.total, 160.0);

    mgr.update_status(&order.id, OrderStatus::Served).unwrap();
    let paid = mgr.process_payment(&order.id, 100.0, 60.0).unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_cash, 100.0);
    assert_eq!(paid.payment_online, 60.0);
    assert_eq!(paid.total_amount, 160.0);

    // Settled order keeps its bill but no longer holds the table
    assert!(mgr.order_by_table("C3").unwrap().is_none());
    assert_eq!(mgr.order_items(&order.id).unwrap().len(), 1);
}

#[test]
fn opening_an_occupied_table_returns_the_existing_order() {
    let mgr = manager();
    let first = mgr.open_table("C3", Some("Priya".into())).unwrap();
    let second = mgr.open_table("C3", Some("Someone Else".into())).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.customer_name.as_deref(), Some("Priya"));
}

#[test]
fn reject_policy_refuses_an_occupied_table() {
    let store = EntityStore::open_in_memory().unwrap();
    let mgr = OrderManager::with_store(
        store,
        CoreConfig {
            creation_policy: CreationPolicy::Reject,
            ..CoreConfig::default()
        },
    );

    mgr.open_table("C3", None).unwrap();
    assert!(matches!(
        mgr.open_table("C3", None).unwrap_err(),
        OrderError::TableOccupied(_)
    ));
}

#[test]
fn merge_then_settle_covers_the_combined_bill() {
    let mgr = manager();
    let source = mgr.open_table("A1", None).unwrap();
    mgr.add_item(&source.id, "Soup", "Starters", 100.0).unwrap();
    let target = mgr.open_table("B2", None).unwrap();
    mgr.add_item(&target.id, "Naan", "Breads", 50.0).unwrap();

    let outcome = mgr.move_or_merge(&source.id, "B2").unwrap();
    assert!(outcome.merged);
    assert_eq!(outcome.order_id, target.id);
    assert!(mgr.order_by_id(&source.id).unwrap().is_none());

    let merged = mgr.order_by_id(&target.id).unwrap().unwrap();
    assert_eq!(merged.total_amount, 150.0);
    assert_eq!(merged.table_history, vec!["A1", "B2"]);
    let soup = mgr
        .order_items(&target.id)
        .unwrap()
        .into_iter()
        .find(|i| i.item_name == "Soup")
        .unwrap();
    assert_eq!(soup.original_table.as_deref(), Some("A1"));

    mgr.update_status(&target.id, OrderStatus::Served).unwrap();
    let paid = mgr.process_payment(&target.id, 150.0, 0.0).unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(mgr.order_by_table("B2").unwrap().is_none());
}

#[test]
fn move_chain_keeps_history_ending_at_current_table() {
    let mgr = manager();
    let order = mgr.open_table("A1", None).unwrap();
    mgr.move_or_merge(&order.id, "B2").unwrap();
    mgr.move_or_merge(&order.id, "C3").unwrap();
    // Back to a table it already visited
    mgr.move_or_merge(&order.id, "B2").unwrap();

    let moved = mgr.order_by_id(&order.id).unwrap().unwrap();
    assert_eq!(moved.table_number, "B2");
    assert_eq!(moved.table_history, vec!["A1", "B2", "C3", "B2"]);
    assert_eq!(
        moved.table_history.last().map(String::as_str),
        Some(moved.table_number.as_str())
    );
}

#[test]
fn cancellation_frees_the_table_but_keeps_the_record() {
    let mgr = manager();
    let order = mgr.open_table("C3", None).unwrap();
    mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();

    mgr.cancel_order(&order.id).unwrap();
    let cancelled = mgr.order_by_id(&order.id).unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(mgr.order_items(&order.id).unwrap().len(), 1);
    assert!(mgr.order_by_table("C3").unwrap().is_none());

    // A cancelled order is frozen
    assert!(mgr.add_item(&order.id, "Naan", "Breads", 30.0).is_err());
    assert!(mgr
        .update_status(&order.id, OrderStatus::Served)
        .is_err());
}

#[test]
fn walk_in_orders_get_generated_table_ids() {
    let mgr = manager();
    let first = mgr.open_table("Walk-in-1001", None).unwrap();
    let second = mgr.open_table("Walk-in-1002", None).unwrap();

    assert_ne!(first.id, second.id);
    assert!(is_walk_in(&first.table_number));
    assert_eq!(first.customer_name.as_deref(), Some("Walk-in"));

    let tables = mgr.active_tables().unwrap();
    assert_eq!(tables.len(), 2);
}

#[test]
fn active_orders_are_newest_first_and_exclude_settled() {
    let mgr = manager();
    let a = mgr.open_table("A1", None).unwrap();
    let b = mgr.open_table("B2", None).unwrap();
    mgr.add_item(&b.id, "Soup", "Starters", 80.0).unwrap();

    mgr.update_status(&a.id, OrderStatus::Served).unwrap();
    mgr.process_payment(&a.id, 0.0, 0.0).unwrap();

    let active = mgr.active_orders().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);
}

#[test]
fn backup_round_trip_preserves_a_mid_service_store() {
    let mgr = manager();
    let open = mgr.open_table("C3", Some("Priya".into())).unwrap();
    mgr.add_item(&open.id, "Soup", "Starters", 80.0).unwrap();
    let done = mgr.open_table("D4", None).unwrap();
    mgr.add_item(&done.id, "Naan", "Breads", 30.0).unwrap();
    mgr.update_status(&done.id, OrderStatus::Served).unwrap();
    mgr.process_payment(&done.id, 30.0, 0.0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    mgr.export_backup(&path).unwrap();

    let fresh = manager();
    fresh.restore_backup(&path).unwrap();
    assert_eq!(fresh.order_by_table("C3").unwrap().unwrap().id, open.id);
    assert!(fresh.order_by_table("D4").unwrap().is_none());
    let paid = fresh.order_by_id(&done.id).unwrap().unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_cash, 30.0);
    assert_eq!(fresh.order_items(&open.id).unwrap().len(), 1);
}

#[test]
fn mutations_broadcast_store_changes() {
    let mgr = manager();
    let mut rx = mgr.subscribe();

    let order = mgr.open_table("C3", None).unwrap();
    let change = rx.try_recv().unwrap();
    assert_eq!(change.collection, Collection::Orders);
    assert_eq!(change.order_id.as_deref(), Some(order.id.as_str()));

    mgr.add_item(&order.id, "Soup", "Starters", 80.0).unwrap();
    let change = rx.try_recv().unwrap();
    assert_eq!(change.collection, Collection::OrderItems);
    // Ledger changes also touch the order's total
    let change = rx.try_recv().unwrap();
    assert_eq!(change.collection, Collection::Orders);
}

#[test]
fn purge_leaves_orders_with_items_alone() {
    let mgr = manager();
    let empty = mgr.open_table("A1", None).unwrap();
    let busy = mgr.open_table("B2", None).unwrap();
    mgr.add_item(&busy.id, "Soup", "Starters", 80.0).unwrap();

    let purged = mgr.purge_empty_orders().unwrap();
    assert_eq!(purged, vec![empty.id.clone()]);
    assert!(mgr.order_by_id(&empty.id).unwrap().is_none());
    assert!(mgr.order_by_table("A1").unwrap().is_none());
    assert!(mgr.order_by_id(&busy.id).unwrap().is_some());
}
