//! Connection sharing across schemas.
//!
//! Schemas that declare the same `(host, port)` in their `meta` should not
//! each spawn a driver client. The pool is an owned object passed to
//! whoever needs a connection; there is no ambient global cache.

use std::{collections::HashMap, sync::Arc};

use mea::rwlock::RwLock;
use mongodb::{Client, options::ClientOptions};
use tracing::debug;

use docmodel_core::{
    error::{StoreError, StoreResult},
    schema::DbAddress,
};

use crate::store::MongoStore;

/// A pool of MongoDB driver clients keyed by `(host, port)`.
///
/// Cloneable: clones share the same pool. The driver client itself
/// multiplexes connections internally, so one client per address is enough.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPool {
    clients: Arc<RwLock<HashMap<(String, u16), Client>>>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared client for an address, connecting on first use.
    ///
    /// # Errors
    ///
    /// [`StoreError::Connection`] when the driver rejects the address.
    pub async fn client(&self, host: &str, port: u16) -> StoreResult<Client> {
        let key = (host.to_string(), port);

        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        // Someone else may have connected while we waited for the lock.
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        debug!(host, port, "opening mongodb connection");
        let options = ClientOptions::parse(format!("mongodb://{host}:{port}"))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        clients.insert(key, client.clone());
        Ok(client)
    }

    /// A [`MongoStore`] for the database a schema's `meta` names.
    ///
    /// # Errors
    ///
    /// [`StoreError::Connection`] when the address names no database or the
    /// connection fails.
    pub async fn store_for(&self, address: &DbAddress) -> StoreResult<MongoStore> {
        if address.name.is_empty() {
            return Err(StoreError::Connection(
                "database address has no name".to_string(),
            ));
        }
        let client = self.client(&address.host, address.port).await?;
        Ok(MongoStore::new(client, address.name.clone()))
    }
}
