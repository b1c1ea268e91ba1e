//! Cart store trait and SQLite implementation

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OpenFlags};
use tokio::sync::broadcast;

use sommelier_core::CartItem;

use crate::CartError;

/// Typed change notification published on every successful write.
///
/// Subscribers re-read the store on receipt; the event itself carries
/// only enough to decide whether a re-read is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Added { wine_id: i64, quantity: u32 },
    Removed { wine_id: i64 },
}

/// Durable, cross-context cart collection.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Add an item. An existing wine id sums quantity onto the stored
    /// entry; the price snapshot from the first add is retained.
    async fn add(&self, item: CartItem) -> Result<CartItem, CartError>;

    /// Remove an item entirely.
    async fn remove(&self, wine_id: i64) -> Result<(), CartError>;

    /// All items in insertion order.
    async fn list(&self) -> Result<Vec<CartItem>, CartError>;

    /// Total quantity across items, for the cart-count indicator.
    async fn count(&self) -> Result<u32, CartError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<CartEvent>;
}

type CartPool = Pool<SqliteConnectionManager>;

/// SQLite-backed cart store.
///
/// One durable file shared by every browsing context; last write
/// observed wins, which is sufficient for human-paced cart edits.
pub struct SqliteCartStore {
    pool: CartPool,
    events: broadcast::Sender<CartEvent>,
}

impl SqliteCartStore {
    /// Open (or create) the cart database at `db_path`. `:memory:` gives
    /// an isolated store for tests.
    pub fn open(db_path: &str) -> Result<Self, CartError> {
        let in_memory = db_path == ":memory:";
        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
            SqliteConnectionManager::file(db_path).with_flags(flags)
        };
        let manager = manager.with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder()
            .max_size(if in_memory { 1 } else { 4 })
            .build(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS cart_items (
                    wine_id   INTEGER PRIMARY KEY,
                    name      TEXT NOT NULL,
                    winery    TEXT NOT NULL,
                    price     REAL NOT NULL,
                    quantity  INTEGER NOT NULL CHECK (quantity >= 1),
                    image_url TEXT,
                    added_at  TEXT NOT NULL DEFAULT (datetime('now'))
                );",
            )?;
        }

        let (events, _) = broadcast::channel(64);
        Ok(Self { pool, events })
    }

    fn publish(&self, event: CartEvent) {
        // No subscribers is fine; the store does not require listeners.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    async fn add(&self, item: CartItem) -> Result<CartItem, CartError> {
        if item.quantity == 0 {
            return Err(CartError::Validation("quantity must be at least 1".into()));
        }

        let pool = self.pool.clone();
        let to_store = item.clone();
        let merged = tokio::task::spawn_blocking(move || -> Result<CartItem, CartError> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO cart_items (wine_id, name, winery, price, quantity, image_url) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(wine_id) DO UPDATE SET \
                     quantity = cart_items.quantity + excluded.quantity",
                params![
                    to_store.wine_id,
                    to_store.name,
                    to_store.winery,
                    to_store.price,
                    to_store.quantity,
                    to_store.image_url,
                ],
            )?;
            conn.query_row(
                "SELECT wine_id, name, winery, price, quantity, image_url \
                 FROM cart_items WHERE wine_id = ?1",
                [to_store.wine_id],
                |row| {
                    Ok(CartItem {
                        wine_id: row.get(0)?,
                        name: row.get(1)?,
                        winery: row.get(2)?,
                        price: row.get(3)?,
                        quantity: row.get(4)?,
                        image_url: row.get(5)?,
                    })
                },
            )
            .map_err(Into::into)
        })
        .await
        .map_err(|e| CartError::Join(e.to_string()))??;

        tracing::debug!(wine_id = item.wine_id, quantity = merged.quantity, "cart add");
        self.publish(CartEvent::Added {
            wine_id: item.wine_id,
            quantity: item.quantity,
        });
        Ok(merged)
    }

    async fn remove(&self, wine_id: i64) -> Result<(), CartError> {
        let pool = self.pool.clone();
        let removed = tokio::task::spawn_blocking(move || -> Result<usize, CartError> {
            let conn = pool.get()?;
            Ok(conn.execute("DELETE FROM cart_items WHERE wine_id = ?1", [wine_id])?)
        })
        .await
        .map_err(|e| CartError::Join(e.to_string()))??;

        if removed == 0 {
            return Err(CartError::NotFound(wine_id));
        }
        tracing::debug!(wine_id, "cart remove");
        self.publish(CartEvent::Removed { wine_id });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CartItem>, CartError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<CartItem>, CartError> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT wine_id, name, winery, price, quantity, image_url \
                 FROM cart_items ORDER BY added_at ASC, wine_id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(CartItem {
                    wine_id: row.get(0)?,
                    name: row.get(1)?,
                    winery: row.get(2)?,
                    price: row.get(3)?,
                    quantity: row.get(4)?,
                    image_url: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
        .map_err(|e| CartError::Join(e.to_string()))?
    }

    async fn count(&self) -> Result<u32, CartError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<u32, CartError> {
            let conn = pool.get()?;
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(quantity), 0) FROM cart_items",
                [],
                |row| row.get(0),
            )?;
            Ok(total as u32)
        })
        .await
        .map_err(|e| CartError::Join(e.to_string()))?
    }

    fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(wine_id: i64, price: f64, quantity: u32) -> CartItem {
        CartItem {
            wine_id,
            name: format!("Wine {wine_id}"),
            winery: "W".into(),
            price,
            quantity,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_add_twice_sums_quantity() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        store.add(item(7, 30.0, 1)).await.unwrap();
        let merged = store.add(item(7, 30.0, 1)).await.unwrap();
        assert_eq!(merged.quantity, 2);

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].wine_id, 7);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_catalog_changes() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        store.add(item(7, 30.0, 1)).await.unwrap();
        // The catalog price moved; the stored snapshot must not.
        let merged = store.add(item(7, 99.0, 1)).await.unwrap();
        assert_eq!(merged.price, 30.0);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        let err = store.add(item(1, 10.0, 0)).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_and_not_found() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        store.add(item(1, 10.0, 1)).await.unwrap();
        store.remove(1).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        let err = store.remove(1).await.unwrap_err();
        assert!(matches!(err, CartError::NotFound(1)));
    }

    #[tokio::test]
    async fn test_count_sums_quantities() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        store.add(item(1, 10.0, 2)).await.unwrap();
        store.add(item(2, 20.0, 3)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_writes_publish_typed_events() {
        let store = SqliteCartStore::open(":memory:").unwrap();
        let mut events = store.subscribe();
        store.add(item(3, 15.0, 2)).await.unwrap();
        store.remove(3).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CartEvent::Added { wine_id: 3, quantity: 2 }
        );
        assert_eq!(events.recv().await.unwrap(), CartEvent::Removed { wine_id: 3 });
    }

    #[tokio::test]
    async fn test_durable_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.db");
        {
            let store = SqliteCartStore::open(path.to_str().unwrap()).unwrap();
            store.add(item(5, 45.0, 1)).await.unwrap();
        }
        let store = SqliteCartStore::open(path.to_str().unwrap()).unwrap();
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].wine_id, 5);
    }
}
