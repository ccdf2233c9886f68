// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for tests and local runs.

use super::{Direction, Document, DocumentStore, Filter, Query};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Collections keyed by name, documents keyed by id.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), AppError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError> {
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))?;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))?;
        doc.extend(fields);
        Ok(())
    }

    async fn merge_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, AppError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(String, Document)> = docs
            .iter()
            .filter(|(_, doc)| query.filters.iter().all(|f| matches_filter(doc, f)))
            // Ordered queries skip documents missing the order field.
            .filter(|(_, doc)| {
                query
                    .order_by
                    .as_ref()
                    .map_or(true, |(field, _)| doc.get(field).is_some_and(|v| !v.is_null()))
            })
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect();
        drop(docs);

        if let Some((field, direction)) = &query.order_by {
            hits.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        Ok(hits)
    }
}

fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    let (field, expected) = match filter {
        Filter::Eq(f, v) | Filter::Gte(f, v) | Filter::Lte(f, v) => (f, v.as_str()),
    };
    let Some(actual) = doc.get(field).and_then(Value::as_str) else {
        return false;
    };
    match filter {
        Filter::Eq(..) => actual == expected,
        Filter::Gte(..) => actual >= expected,
        Filter::Lte(..) => actual <= expected,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
