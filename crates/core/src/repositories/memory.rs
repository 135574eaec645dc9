//! In-process order storage, used by tests and CLI dry runs.

use super::{NewOrder, NewOrderItem, OrderRepository, StoredOrder, StoredOrderItem};
use crate::{MandalError, MandalResult, ShardableUuid};
use std::io;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    orders: Vec<StoredOrder>,
    items: Vec<(ShardableUuid, Vec<StoredOrderItem>)>,
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    tables: Mutex<Tables>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Tables stay consistent across a panic, every write is a single push or retain.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn insert_order(&self, order: NewOrder) -> MandalResult<StoredOrder> {
        let stored = order.into_stored(ShardableUuid::new());
        self.tables().orders.push(stored.clone());
        Ok(stored)
    }

    fn insert_items(
        &self,
        order_id: &ShardableUuid,
        items: Vec<NewOrderItem>,
    ) -> MandalResult<Vec<StoredOrderItem>> {
        let mut tables = self.tables();
        if !tables.orders.iter().any(|o| &o.id == order_id) {
            return Err(MandalError::OrderNotFound(order_id.to_string()));
        }
        if tables.items.iter().any(|(id, _)| id == order_id) {
            return Err(MandalError::OrderItemsAlreadyStored(order_id.to_string()));
        }

        let rows: Vec<StoredOrderItem> = items
            .into_iter()
            .map(|item| item.into_stored(order_id))
            .collect::<MandalResult<_>>()?;
        tables.items.push((order_id.clone(), rows.clone()));
        Ok(rows)
    }

    fn delete_order(&self, order_id: &ShardableUuid) -> io::Result<()> {
        let mut tables = self.tables();
        let before = tables.orders.len();
        tables.orders.retain(|o| &o.id != order_id);
        tables.items.retain(|(id, _)| id != order_id);
        if tables.orders.len() == before {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("order {order_id} not found"),
            ));
        }
        Ok(())
    }

    fn get_order(&self, order_id: &ShardableUuid) -> MandalResult<StoredOrder> {
        self.tables()
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
            .ok_or_else(|| MandalError::OrderNotFound(order_id.to_string()))
    }

    fn order_items(&self, order_id: &ShardableUuid) -> MandalResult<Vec<StoredOrderItem>> {
        let tables = self.tables();
        if !tables.orders.iter().any(|o| &o.id == order_id) {
            return Err(MandalError::OrderNotFound(order_id.to_string()));
        }
        Ok(tables
            .items
            .iter()
            .find(|(id, _)| id == order_id)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn list_orders(&self) -> MandalResult<Vec<StoredOrder>> {
        let mut orders = self.tables().orders.clone();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }
}
