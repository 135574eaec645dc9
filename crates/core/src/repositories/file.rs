//! File-backed order storage.
//!
//! Layout:
//! ```text
//! <data_dir>/orders/<s1>/<s2>/<uuid>/order.json   orders row
//! <data_dir>/orders/<s1>/<s2>/<uuid>/items.json   order_items rows
//! ```
//! where `s1`/`s2` are the first four hex characters of the order id.

use super::shared::{create_uuid_and_shard_dir, read_json, sharded_dirs, write_new_json};
use super::{NewOrder, NewOrderItem, OrderRepository, StoredOrder, StoredOrderItem};
use crate::config::CoreConfig;
use crate::constants::{ORDER_ITEMS_JSON_FILENAME, ORDER_JSON_FILENAME};
use crate::{MandalError, MandalResult, ShardableUuid};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FileOrderRepository {
    orders_dir: PathBuf,
}

impl FileOrderRepository {
    pub fn new(orders_dir: impl Into<PathBuf>) -> Self {
        Self {
            orders_dir: orders_dir.into(),
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.orders_dir())
    }

    pub fn orders_dir(&self) -> &Path {
        &self.orders_dir
    }

    fn order_dir(&self, order_id: &ShardableUuid) -> PathBuf {
        order_id.sharded_dir(&self.orders_dir)
    }
}

impl OrderRepository for FileOrderRepository {
    fn insert_order(&self, order: NewOrder) -> MandalResult<StoredOrder> {
        fs::create_dir_all(&self.orders_dir).map_err(MandalError::StorageDirCreation)?;
        let (id, dir) = create_uuid_and_shard_dir(&self.orders_dir, ShardableUuid::new)?;

        let stored = order.into_stored(id);
        match write_new_json(&dir.join(ORDER_JSON_FILENAME), &stored) {
            Ok(_) => Ok(stored),
            Err(e) => {
                // The directory is fresh, nothing else lives in it.
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    tracing::error!("failed to remove {}: {cleanup}", dir.display());
                }
                Err(e)
            }
        }
    }

    fn insert_items(
        &self,
        order_id: &ShardableUuid,
        items: Vec<NewOrderItem>,
    ) -> MandalResult<Vec<StoredOrderItem>> {
        let dir = self.order_dir(order_id);
        if !dir.join(ORDER_JSON_FILENAME).is_file() {
            return Err(MandalError::OrderNotFound(order_id.to_string()));
        }

        let rows: Vec<StoredOrderItem> = items
            .into_iter()
            .map(|item| item.into_stored(order_id))
            .collect::<MandalResult<_>>()?;
        if !write_new_json(&dir.join(ORDER_ITEMS_JSON_FILENAME), &rows)? {
            return Err(MandalError::OrderItemsAlreadyStored(order_id.to_string()));
        }
        Ok(rows)
    }

    fn delete_order(&self, order_id: &ShardableUuid) -> std::io::Result<()> {
        fs::remove_dir_all(self.order_dir(order_id))
    }

    fn get_order(&self, order_id: &ShardableUuid) -> MandalResult<StoredOrder> {
        read_json(&self.order_dir(order_id).join(ORDER_JSON_FILENAME))?
            .ok_or_else(|| MandalError::OrderNotFound(order_id.to_string()))
    }

    fn order_items(&self, order_id: &ShardableUuid) -> MandalResult<Vec<StoredOrderItem>> {
        let dir = self.order_dir(order_id);
        if !dir.join(ORDER_JSON_FILENAME).is_file() {
            return Err(MandalError::OrderNotFound(order_id.to_string()));
        }
        Ok(read_json(&dir.join(ORDER_ITEMS_JSON_FILENAME))?.unwrap_or_default())
    }

    /// Orders that cannot be read or parsed are logged and skipped.
    fn list_orders(&self) -> MandalResult<Vec<StoredOrder>> {
        let mut orders: Vec<StoredOrder> = sharded_dirs(&self.orders_dir)
            .into_iter()
            .filter_map(|dir| {
                let path = dir.join(ORDER_JSON_FILENAME);
                match read_json::<StoredOrder>(&path) {
                    Ok(order) => order,
                    Err(e) => {
                        tracing::warn!("failed to read {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::super::save_order;
    use super::super::tests::sample_receipt;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn saves_and_reads_back_order() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path().join("orders"));

        let saved = save_order(&repo, &sample_receipt()).unwrap();
        let dir = saved.order.id.sharded_dir(repo.orders_dir());
        assert!(dir.join(ORDER_JSON_FILENAME).is_file());
        assert!(dir.join(ORDER_ITEMS_JSON_FILENAME).is_file());

        assert_eq!(repo.get_order(&saved.order.id).unwrap(), saved.order);
        assert_eq!(repo.order_items(&saved.order.id).unwrap(), saved.items);
        assert_eq!(repo.list_orders().unwrap(), vec![saved.order]);
    }

    #[test]
    fn items_are_inserted_once() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path());
        let saved = save_order(&repo, &sample_receipt()).unwrap();

        let err = repo.insert_items(&saved.order.id, Vec::new()).unwrap_err();
        assert!(matches!(err, MandalError::OrderItemsAlreadyStored(_)));
    }

    #[test]
    fn items_for_unknown_order_are_rejected() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path());

        let err = repo.insert_items(&ShardableUuid::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, MandalError::OrderNotFound(_)));
        assert!(matches!(
            repo.get_order(&ShardableUuid::new()),
            Err(MandalError::OrderNotFound(_))
        ));
    }

    #[test]
    fn order_without_items_lists_empty_items() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path());
        let order = repo
            .insert_order(NewOrder::from_receipt(&sample_receipt()))
            .unwrap();

        assert!(repo.order_items(&order.id).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_directory() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path());
        let saved = save_order(&repo, &sample_receipt()).unwrap();

        repo.delete_order(&saved.order.id).unwrap();
        assert!(!saved.order.id.sharded_dir(temp.path()).exists());
        assert!(repo.list_orders().unwrap().is_empty());
    }

    #[test]
    fn list_skips_corrupt_rows() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path());
        let saved = save_order(&repo, &sample_receipt()).unwrap();

        let junk = ShardableUuid::new().sharded_dir(temp.path());
        fs::create_dir_all(&junk).unwrap();
        fs::write(junk.join(ORDER_JSON_FILENAME), "{not json").unwrap();

        assert_eq!(repo.list_orders().unwrap(), vec![saved.order]);
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let repo = FileOrderRepository::new(temp.path().join("never-created"));
        assert!(repo.list_orders().unwrap().is_empty());
    }
}
