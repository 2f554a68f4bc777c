use crate::domain::cart::CartState;
use crate::domain::ports::{CartStore, SessionId};
use crate::error::{CartError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory cart store.
///
/// Clones share the same map, so several handles observe each other's writes.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<SessionId, CartState>>>,
}

impl InMemoryCartStore {
    /// Creates a new, empty in-memory cart store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, session: &SessionId) -> Result<Option<CartState>> {
        let carts = self.carts.read().await;
        Ok(carts.get(session).cloned())
    }

    async fn save(
        &self,
        session: &SessionId,
        cart: &CartState,
        expected_version: u64,
    ) -> Result<()> {
        let mut carts = self.carts.write().await;
        let found = carts.get(session).map_or(0, CartState::version);
        if found != expected_version {
            return Err(CartError::VersionConflict {
                session: session.to_string(),
                expected: expected_version,
                found,
            });
        }
        carts.insert(session.clone(), cart.clone());
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> Result<()> {
        let mut carts = self.carts.write().await;
        carts.remove(session);
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<SessionId>> {
        let carts = self.carts.read().await;
        let mut sessions: Vec<SessionId> = carts.keys().cloned().collect();
        sessions.sort();
        Ok(sessions)
    }
}
