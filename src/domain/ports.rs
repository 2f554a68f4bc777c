use super::cart::CartState;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key under which a session's cart is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persists carts as opaque blobs keyed by session.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, session: &SessionId) -> Result<Option<CartState>>;

    /// Writes `cart` only if the stored version still equals
    /// `expected_version` (zero when nothing is stored yet). Otherwise fails
    /// with `CartError::VersionConflict` and leaves the stored cart untouched.
    async fn save(&self, session: &SessionId, cart: &CartState, expected_version: u64)
    -> Result<()>;

    async fn delete(&self, session: &SessionId) -> Result<()>;

    /// Every session with a stored cart, sorted.
    async fn sessions(&self) -> Result<Vec<SessionId>>;
}

pub type CartStoreBox = Box<dyn CartStore>;
