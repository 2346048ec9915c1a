use std::collections::HashMap;
use std::fmt;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use shared_config::AppConfig;

use crate::supabase::SupabaseClient;

/// Address of one remote document: a collection (table) and a row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Remote document database reached with two capabilities: read the whole
/// document and merge-write a set of top-level fields into it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist yet.
    async fn load(&self, doc: &DocumentRef) -> Result<Option<Value>>;

    /// Writes `fields` into the document, leaving every other field as is.
    /// Creates the document when missing.
    async fn merge(&self, doc: &DocumentRef, fields: Map<String, Value>) -> Result<()>;
}

/// Documents stored as PostgREST rows keyed by `id`, one column per field.
pub struct SupabaseDocumentStore {
    supabase: SupabaseClient,
}

impl SupabaseDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn load(&self, doc: &DocumentRef) -> Result<Option<Value>> {
        debug!("Loading document {}", doc);

        let path = format!("/rest/v1/{}?id=eq.{}&select=*", doc.collection, doc.id);
        let mut rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(rows.swap_remove(0)))
    }

    async fn merge(&self, doc: &DocumentRef, mut fields: Map<String, Value>) -> Result<()> {
        debug!("Merge-writing {} field(s) into {}", fields.len(), doc);

        fields.insert("id".to_string(), Value::String(doc.id.clone()));

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("resolution=merge-duplicates,return=minimal"));

        let path = format!("/rest/v1/{}?on_conflict=id", doc.collection);
        self.supabase.execute(
            Method::POST,
            &path,
            Some(Value::Object(fields)),
            Some(headers),
        ).await
    }
}

/// Process-local store used when no remote database is configured.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentRef, Map<String, Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, doc: &DocumentRef) -> Result<Option<Value>> {
        let documents = self.documents.read().await;
        Ok(documents.get(doc).cloned().map(Value::Object))
    }

    async fn merge(&self, doc: &DocumentRef, fields: Map<String, Value>) -> Result<()> {
        if doc.id.is_empty() {
            return Err(anyhow!("Document id cannot be empty"));
        }

        let mut documents = self.documents.write().await;
        let document = documents.entry(doc.clone()).or_default();
        for (key, value) in fields {
            document.insert(key, value);
        }
        Ok(())
    }
}
