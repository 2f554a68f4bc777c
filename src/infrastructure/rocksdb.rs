use crate::domain::cart::CartState;
use crate::domain::ports::{CartStore, SessionId};
use crate::error::{CartError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding one serialized cart per session.
pub const CF_CARTS: &str = "carts";

/// A persistent cart store backed by RocksDB.
///
/// Carts are stored as JSON blobs keyed by the session id. Writes go through
/// a process-wide mutex so the version check and the put happen atomically.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBCartStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

impl RocksDBCartStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_carts = ColumnFamilyDescriptor::new(CF_CARTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_carts])?;

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn carts(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_CARTS).ok_or_else(|| {
            CartError::InternalError(Box::new(std::io::Error::other(
                "Carts column family not found",
            )))
        })
    }

    fn read(&self, session: &SessionId) -> Result<Option<CartState>> {
        let cf = self.carts()?;
        match self.db.get_cf(cf, session.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CartStore for RocksDBCartStore {
    async fn load(&self, session: &SessionId) -> Result<Option<CartState>> {
        self.read(session)
    }

    async fn save(
        &self,
        session: &SessionId,
        cart: &CartState,
        expected_version: u64,
    ) -> Result<()> {
        let _guard = self.write_guard.lock().await;

        let found = self.read(session)?.map_or(0, |stored| stored.version());
        if found != expected_version {
            return Err(CartError::VersionConflict {
                session: session.to_string(),
                expected: expected_version,
                found,
            });
        }

        let value = serde_json::to_vec(cart)?;
        self.db
            .put_cf(self.carts()?, session.as_str().as_bytes(), value)?;
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        self.db.delete_cf(self.carts()?, session.as_str().as_bytes())?;
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<SessionId>> {
        let cf = self.carts()?;
        let mut sessions = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _value) = item?;
            let id = String::from_utf8(key.to_vec()).map_err(|e| {
                CartError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Session key is not UTF-8: {}", e),
                )))
            })?;
            sessions.push(SessionId::new(id));
        }
        // RocksDB iterates in byte order, which already matches `Ord` for UTF-8.
        Ok(sessions)
    }
}
