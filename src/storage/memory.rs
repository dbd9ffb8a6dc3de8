//! In-memory storage implementation
//!
//! Fast, non-persistent storage for development and testing.
//! Uses DashMap for lock-free concurrent access.
//!
//! **WARNING:** MemoryStorage is NOT recommended for production use:
//! - Clients and tokens are lost on process restart
//! - Does not coordinate state across multiple process instances
//!
//! For production deployments, use SqliteStorage or PostgresStorage.

use super::*;
use crate::error::StorageError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory storage implementation - uses DashMap for lock-free concurrent access
#[derive(Clone, Default)]
pub struct MemoryStorage {
    clients: Arc<DashMap<String, Client>>,
    tokens: Arc<DashMap<String, AccessToken>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage pre-populated with clients
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let storage = Self::new();
        for client in clients {
            storage.clients.insert(client.id.clone(), client);
        }
        storage
    }
}

#[async_trait]
impl ClientStore for MemoryStorage {
    async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        Ok(self.clients.get(id).map(|c| c.clone()))
    }

    async fn save_client(&self, client: &Client) -> Result<()> {
        match self.clients.entry(client.id.clone()) {
            Entry::Occupied(mut existing) => {
                let created_at = existing.get().created_at;
                let mut updated = client.clone();
                updated.created_at = created_at;
                existing.insert(updated);
            }
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
            }
        }
        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.iter().map(|c| c.value().clone()).collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clients)
    }

    async fn delete_client(&self, id: &str) -> Result<bool> {
        Ok(self.clients.remove(id).is_some())
    }
}

#[async_trait]
impl TokenStore for MemoryStorage {
    async fn create(&self, info: &TokenInfo) -> Result<()> {
        let row = AccessToken::from_info(info.clone());
        match self.tokens.entry(row.token.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "access token".to_string(),
                id: row.client_id,
            }
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(())
            }
        }
    }

    async fn remove_by_access(&self, access: &str) -> Result<()> {
        self.tokens.remove(access);
        Ok(())
    }

    async fn get_by_access(&self, access: &str) -> Result<Option<AccessToken>> {
        if access.is_empty() {
            return Ok(None);
        }
        Ok(self.tokens.get(access).map(|t| t.clone()))
    }
}
