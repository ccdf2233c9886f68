// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document database layer.
//!
//! [`DocumentStore`] is the port every backend implements: Firestore in
//! production, an in-memory map for tests and local runs. Handlers talk to
//! the typed [`Database`] wrapper, never to a backend directly.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ADMINS: &str = "admins";
    pub const MEMBERS: &str = "members";
    pub const MEETINGS: &str = "meetings";
    pub const ATTENDANCE_LOGS: &str = "attendance_logs";
    pub const NOTIFICATION_TEMPLATES: &str = "notificationTemplates";
    pub const NOTIFICATION_SCHEDULES: &str = "notificationSchedules";
    pub const WEBAUTHN_USERS: &str = "webauthn_users";
    pub const WEBAUTHN_AUTH_CHALLENGES: &str = "webauthn_auth_challenges";
}

/// A schema-less document body.
pub type Document = Map<String, Value>;

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field filter. Values are compared as strings, which is also how
/// timestamps are stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Gte(String, String),
    Lte(String, String),
}

/// Conjunction of filters with an optional ordering.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters
            .push(Filter::Gte(field.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters
            .push(Filter::Lte(field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }
}

/// Storage port: get/set/delete single documents and run simple queries.
///
/// Every write is atomic per document; nothing spans documents. Field
/// writes touch only the named fields, so concurrent writers of disjoint
/// fields never overwrite each other.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_tag(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), AppError>;

    /// Write `fields` into an existing document, leaving other fields as
    /// they are. Fails with `NotFound` when the document does not exist.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError>;

    /// Write `fields` into a document, creating it if absent.
    async fn merge_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    /// Returns `(id, document)` pairs.
    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, AppError>;
}

/// Typed access to the document store.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Database backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    /// Get a raw document.
    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        self.store.get(collection, id).await
    }

    /// Get and deserialize a document.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        self.store
            .get(collection, id)
            .await?
            .map(|doc| from_document(collection, id, doc))
            .transpose()
    }

    pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, AppError> {
        Ok(self.store.get(collection, id).await?.is_some())
    }

    /// Create or overwrite a document.
    pub async fn set<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<(), AppError> {
        self.store.set(collection, id, to_document(value)?).await
    }

    /// Create a document under a new server-assigned id and return the id.
    pub async fn create<T: Serialize>(&self, collection: &str, value: &T) -> Result<String, AppError> {
        let id = crate::ids::new_document_id()?;
        self.store.set(collection, &id, to_document(value)?).await?;
        Ok(id)
    }

    /// Merge fields into an existing document.
    ///
    /// Fails with `NotFound` when the document does not exist.
    pub async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError> {
        self.store.update_fields(collection, id, fields).await
    }

    /// Merge fields into a document, creating it if absent.
    pub async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError> {
        self.store.merge_fields(collection, id, fields).await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.store.delete(collection, id).await
    }

    /// Run a query and deserialize every hit.
    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, T)>, AppError> {
        self.store
            .query(collection, query)
            .await?
            .into_iter()
            .map(|(id, doc)| {
                let value = from_document(collection, &id, doc)?;
                Ok((id, value))
            })
            .collect()
    }
}

/// Serialize a value into a document body. The value must serialize to a map.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::Internal(anyhow::anyhow!(
            "document must serialize to a map, got {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "document serialization failed: {e}"
        ))),
    }
}

fn from_document<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    doc: Document,
) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| AppError::Database(format!("malformed document {collection}/{id}: {e}")))
}
