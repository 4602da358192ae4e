// ./infrastructure/src/persistence/in_memory_document_store.rs
use application::{DocumentQuery, DocumentStore, DocumentStream, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, trace, warn};

/// Documents of one container: Partition -> (Document ID -> Document)
#[derive(Debug)]
struct Container {
    partition_field: String,
    partitions: DashMap<String, DashMap<String, Value>>,
}

impl Container {
    fn new(partition_key_path: &str) -> Self {
        Self {
            partition_field: partition_key_path.trim_start_matches('/').to_string(),
            partitions: DashMap::new(),
        }
    }

    /// Checks that a document carries a string id and sits in the addressed partition.
    fn validate<'a>(&self, document: &'a Value, partition: &str) -> Result<&'a str, StoreError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidDocument("document has no string 'id'".into()))?;
        match document.get(&self.partition_field).and_then(Value::as_str) {
            Some(value) if value == partition => Ok(id),
            other => Err(StoreError::InvalidDocument(format!(
                "partition key '{}' is {:?}, expected '{}'",
                self.partition_field, other, partition
            ))),
        }
    }
}

/// In-process partitioned document store.
///
/// Honours the full `DocumentStore` contract, including conditional create,
/// so it can stand in for a remote database in tests and the `memory:`
/// connection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    // Container Name -> Container
    containers: Arc<DashMap<String, Arc<Container>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            containers: Arc::new(DashMap::new()),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulates losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        if available {
            info!("In-memory document store back online");
        } else {
            warn!("In-memory document store taken offline");
        }
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory document store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn container(&self, name: &str) -> Result<Arc<Container>, StoreError> {
        self.check_available()?;
        self.containers
            .get(name)
            .map(|container| container.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("container '{}'", name)))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self))]
    async fn ensure_container(
        &self,
        container: &str,
        partition_key_path: &str,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.containers
            .entry(container.to_string())
            .or_insert_with(|| {
                info!(container, partition_key_path, "Creating container");
                Arc::new(Container::new(partition_key_path))
            });
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_by_key(
        &self,
        container: &str,
        id: &str,
        partition: &str,
    ) -> Result<Value, StoreError> {
        trace!(container, doc_id = %id, partition, "Reading document from in-memory store");
        let store = self.container(container)?;
        let found = match store.partitions.get(partition) {
            Some(documents) => documents.get(id).map(|doc| doc.value().clone()),
            None => None,
        };
        found.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    #[instrument(skip(self, document))]
    async fn create_if_absent(
        &self,
        container: &str,
        document: &Value,
        partition: &str,
    ) -> Result<(), StoreError> {
        let store = self.container(container)?;
        let id = store.validate(document, partition)?;
        debug!(container, doc_id = %id, partition, "Creating document in in-memory store");
        let documents = store
            .partitions
            .entry(partition.to_string())
            .or_insert_with(DashMap::new);
        match documents.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(document.clone());
                Ok(())
            }
        }
    }

    #[instrument(skip(self, document))]
    async fn replace(
        &self,
        container: &str,
        document: &Value,
        id: &str,
        partition: &str,
    ) -> Result<(), StoreError> {
        let store = self.container(container)?;
        let document_id = store.validate(document, partition)?;
        if document_id != id {
            return Err(StoreError::InvalidDocument(format!(
                "document id '{}' does not match key '{}'",
                document_id, id
            )));
        }
        debug!(container, doc_id = %id, partition, "Replacing document in in-memory store");
        let documents = store
            .partitions
            .get(partition)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match documents.get_mut(id) {
            Some(mut existing) => {
                *existing = document.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn delete_by_key(
        &self,
        container: &str,
        id: &str,
        partition: &str,
    ) -> Result<(), StoreError> {
        let store = self.container(container)?;
        debug!(container, doc_id = %id, partition, "Deleting document from in-memory store");
        let removed = store
            .partitions
            .get(partition)
            .and_then(|documents| documents.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    #[instrument(skip(self, query))]
    async fn query(
        &self,
        container: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentStream, StoreError> {
        let store = self.container(container)?;
        debug!(container, partition = ?query.partition, sql = %query.to_sql(), "Querying in-memory store");

        let mut matches: Vec<Value> = Vec::new();
        for entry in store.partitions.iter() {
            if let Some(partition) = &query.partition {
                if entry.key() != partition {
                    continue;
                }
            }
            matches.extend(
                entry
                    .value()
                    .iter()
                    .filter(|doc| query.matches(doc.value()))
                    .map(|doc| doc.value().clone()),
            );
        }

        matches.sort_by(|a, b| query.compare(a, b));
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        trace!(count = matches.len(), "Query finished");
        Ok(stream::iter(matches.into_iter().map(Ok)).boxed())
    }
}
