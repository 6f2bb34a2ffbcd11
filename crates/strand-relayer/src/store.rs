//! SQLite persistence for the bridge tree, the message nonce and dispatched messages.

use std::ops::DerefMut;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Acquire, Pool, Row, Sqlite, SqliteConnection};
use strand_bridge_tree::{BridgeMessage, MessageError, TreeSnapshot};
use strand_hash::Hash256;
use thiserror::Error;
use tokio::fs;

/// Key of the next message nonce in the key-value table
const NONCE_KEY: &str = "nonce";

/// An error that can occur when using the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid value for key {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("SQLite error: {0}")]
    SQLite(#[from] sqlx::Error),
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("Corrupted message: {0}")]
    Message(#[from] MessageError),
}

/// A dispatched message as persisted by the relayer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Hash256,
    pub message: BridgeMessage,
}

#[async_trait]
pub trait BridgeStore: Send + Sync {
    /// Nonce to assign to the next dispatched message
    async fn get_nonce(&self) -> Result<u32, StoreError>;
    /// Snapshot with the highest leaf count, `None` if nothing was dispatched yet
    async fn get_latest_tree_snapshot(&self) -> Result<Option<TreeSnapshot>, StoreError>;
    /// Snapshot taken when the tree had exactly `count` leaves
    async fn get_tree_snapshot(&self, count: u32) -> Result<Option<TreeSnapshot>, StoreError>;
    async fn get_message(&self, nonce: u32) -> Result<Option<StoredMessage>, StoreError>;
    /// Atomically record a dispatched message, the resulting tree and the next nonce
    async fn add_message(
        &self,
        message: &StoredMessage,
        snapshot: &TreeSnapshot,
        next_nonce: u32,
    ) -> Result<(), StoreError>;
}

/// A key-value store backed by SQLite.
#[derive(Debug)]
pub struct SQLiteStore {
    pool: Pool<Sqlite>,
}

impl SQLiteStore {
    /// Create a new SQLite store with externally created pool.
    pub fn with_pool(pool: Pool<Sqlite>) -> Self {
        SQLiteStore { pool }
    }

    /// Acquire a connection from the pool.
    /// NOTE: if there's no available connection this function will fail after acquire timeout.
    pub async fn acquire_connection(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Initialize the underlying key-value table.
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.acquire_connection().await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );"#,
        )
        .execute(conn.deref_mut())
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.acquire_connection().await?;

        let row = sqlx::query("SELECT value FROM store WHERE key = ?")
            .bind(key)
            .fetch_optional(conn.deref_mut())
            .await?;

        if let Some(row) = row {
            let value: String = row.try_get("value")?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}

async fn set(executor: &mut SqliteConnection, key: &str, value: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT OR REPLACE INTO store (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;
    Ok(())
}

/// SQLite busy timeout in milliseconds
const SQLITE_BUSY_TIMEOUT: &str = "5000";

/// SQLite-backed relayer store.
/// - WAL mode so that external readers do not block the writer
/// - Single writer (max_connections = 1)
#[derive(Debug)]
pub struct AppStore(SQLiteStore);

impl AppStore {
    /// Create a store for a single atomic writer
    pub async fn single_atomic_writer<P: AsRef<Path>>(path: P) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("busy_timeout", SQLITE_BUSY_TIMEOUT);

        // Single connection ensures single-writer semantics
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self(SQLiteStore::with_pool(pool));
        store.init().await?;

        Ok(store)
    }

    /// Initialize the store by creating the tables if missing
    async fn init(&self) -> Result<(), sqlx::Error> {
        // Key-value table for the nonce
        self.0.init().await?;

        let mut conn = self.0.acquire_connection().await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tree_snapshots (
                count INTEGER PRIMARY KEY,
                snapshot BLOB NOT NULL
            );"#,
        )
        .execute(conn.deref_mut())
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS messages (
                nonce INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                message BLOB NOT NULL
            );"#,
        )
        .execute(conn.deref_mut())
        .await?;
        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_messages_id ON messages (id);"#)
            .execute(conn.deref_mut())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BridgeStore for AppStore {
    async fn get_nonce(&self) -> Result<u32, StoreError> {
        match self.0.get(NONCE_KEY).await? {
            Some(value) => value.parse().map_err(|_| StoreError::InvalidValue {
                key: NONCE_KEY.to_string(),
                value,
            }),
            None => Ok(0),
        }
    }

    async fn get_latest_tree_snapshot(&self) -> Result<Option<TreeSnapshot>, StoreError> {
        let mut conn = self.0.acquire_connection().await?;
        let row = sqlx::query("SELECT snapshot FROM tree_snapshots ORDER BY count DESC LIMIT 1")
            .fetch_optional(conn.deref_mut())
            .await?;
        row.map(|row| decode_snapshot(row.get("snapshot")))
            .transpose()
    }

    async fn get_tree_snapshot(&self, count: u32) -> Result<Option<TreeSnapshot>, StoreError> {
        let mut conn = self.0.acquire_connection().await?;
        let row = sqlx::query("SELECT snapshot FROM tree_snapshots WHERE count = ?")
            .bind(count)
            .fetch_optional(conn.deref_mut())
            .await?;
        row.map(|row| decode_snapshot(row.get("snapshot")))
            .transpose()
    }

    async fn get_message(&self, nonce: u32) -> Result<Option<StoredMessage>, StoreError> {
        let mut conn = self.0.acquire_connection().await?;
        let row = sqlx::query("SELECT id, message FROM messages WHERE nonce = ?")
            .bind(nonce)
            .fetch_optional(conn.deref_mut())
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let data: Vec<u8> = row.get("message");
        Ok(Some(StoredMessage {
            id: Hash256::from_hex(&id).map_err(|_| StoreError::InvalidValue {
                key: format!("messages/{nonce}/id"),
                value: id.clone(),
            })?,
            message: BridgeMessage::decode(&data)?,
        }))
    }

    async fn add_message(
        &self,
        message: &StoredMessage,
        snapshot: &TreeSnapshot,
        next_nonce: u32,
    ) -> Result<(), StoreError> {
        let snapshot_data = bincode::serialize(snapshot)?;

        let mut conn = self.0.acquire_connection().await?;
        let mut tx = conn.begin().await?;
        sqlx::query("INSERT INTO messages (nonce, id, message) VALUES (?, ?, ?)")
            .bind(message.message.nonce)
            .bind(message.id.to_hex())
            .bind(message.message.encode())
            .execute(tx.deref_mut())
            .await?;
        sqlx::query("INSERT INTO tree_snapshots (count, snapshot) VALUES (?, ?)")
            .bind(snapshot.count)
            .bind(snapshot_data)
            .execute(tx.deref_mut())
            .await?;
        set(tx.deref_mut(), NONCE_KEY, &next_nonce.to_string()).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn decode_snapshot(data: Vec<u8>) -> Result<TreeSnapshot, StoreError> {
    Ok(bincode::deserialize(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_bridge_tree::{IncrementalMerkleTree, MESSAGE_VERSION};
    use tempfile::TempDir;

    fn message(nonce: u32) -> StoredMessage {
        let message = BridgeMessage {
            version: MESSAGE_VERSION,
            nonce,
            origin_domain: 1,
            sender: Hash256::from_inner([1; 32]),
            destination_domain: 2,
            recipient: Hash256::from_inner([2; 32]),
            body: nonce.to_be_bytes().to_vec(),
        };
        StoredMessage {
            id: message.id(),
            message,
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = AppStore::single_atomic_writer(dir.path().join("relayer.db"))
            .await
            .unwrap();

        assert_eq!(store.get_nonce().await.unwrap(), 0);
        assert_eq!(store.get_latest_tree_snapshot().await.unwrap(), None);
        assert_eq!(store.get_message(0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_messages() {
        let dir = TempDir::new().unwrap();
        let store = AppStore::single_atomic_writer(dir.path().join("relayer.db"))
            .await
            .unwrap();

        let mut tree = IncrementalMerkleTree::new();
        let mut snapshots = vec![];
        for nonce in 0..3 {
            let message = message(nonce);
            tree.insert(message.id).unwrap();
            store
                .add_message(&message, &tree.save(), nonce + 1)
                .await
                .unwrap();
            snapshots.push(tree.save());
        }

        assert_eq!(store.get_nonce().await.unwrap(), 3);
        assert_eq!(
            store.get_latest_tree_snapshot().await.unwrap(),
            Some(tree.save())
        );
        assert_eq!(
            store.get_tree_snapshot(2).await.unwrap(),
            Some(snapshots[1].clone())
        );
        assert_eq!(store.get_tree_snapshot(4).await.unwrap(), None);
        assert_eq!(store.get_message(1).await.unwrap(), Some(message(1)));
    }

    #[tokio::test]
    async fn test_failed_write_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let store = AppStore::single_atomic_writer(dir.path().join("relayer.db"))
            .await
            .unwrap();

        let mut tree = IncrementalMerkleTree::new();
        tree.insert(message(0).id).unwrap();
        store.add_message(&message(0), &tree.save(), 1).await.unwrap();

        // Reusing a nonce violates the primary key, nothing of the batch must be persisted
        tree.insert(message(0).id).unwrap();
        assert!(store
            .add_message(&message(0), &tree.save(), 2)
            .await
            .is_err());

        assert_eq!(store.get_nonce().await.unwrap(), 1);
        assert_eq!(store.get_tree_snapshot(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_nonce() {
        let dir = TempDir::new().unwrap();
        let store = AppStore::single_atomic_writer(dir.path().join("relayer.db"))
            .await
            .unwrap();

        let mut conn = store.0.acquire_connection().await.unwrap();
        set(conn.deref_mut(), NONCE_KEY, "not a number").await.unwrap();
        drop(conn);

        assert!(matches!(
            store.get_nonce().await,
            Err(StoreError::InvalidValue { .. })
        ));
    }
}
