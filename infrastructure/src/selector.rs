// ./infrastructure/src/selector.rs
use crate::employee::{DocumentEmployeeService, ReferenceEmployeeService};
use crate::persistence::InMemoryDocumentStore;
use application::{ApplicationError, DocumentStore, EmployeeService};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Connection string selecting the in-process document store.
pub const MEMORY_CONNECTION: &str = "memory:";

/// Backend variants that can sit behind `EmployeeService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Partitioned document database.
    Cosmos,
    /// In-process fallback.
    Reference,
}

impl StoreKind {
    /// `"Cosmos"` selects the document database; anything else falls back to
    /// the reference store.
    pub fn from_config(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("Cosmos") => StoreKind::Cosmos,
            Some(other) => {
                if other != "Fake" && !other.is_empty() {
                    warn!(db_type = %other, "Unknown store type, using reference store");
                }
                StoreKind::Reference
            }
            None => StoreKind::Reference,
        }
    }
}

/// Opens a document store client for `connection`.
pub fn open_document_store(connection: &str) -> Result<Arc<dyn DocumentStore>, ApplicationError> {
    if connection.trim().starts_with(MEMORY_CONNECTION) {
        info!("Using in-process document store");
        return Ok(Arc::new(InMemoryDocumentStore::new()));
    }
    // Never log the connection string itself, it carries the credential.
    let scheme = connection
        .split_once(':')
        .map(|(scheme, _)| scheme.trim())
        .filter(|scheme| is_scheme(scheme))
        .unwrap_or("<unknown>");
    error!(scheme = %scheme, "No document store client for connection");
    Err(ApplicationError::BackendUnavailable(format!(
        "no document store client for connection scheme '{}'",
        scheme
    )))
}

/// URL-scheme shape: a letter, then letters, digits, `+`, `-` or `.`.
fn is_scheme(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Builds the service backing the employee contract. Called once at start-up.
pub fn select_employee_service(
    kind: StoreKind,
    company_name: &str,
    connection: Option<&str>,
) -> Result<Arc<dyn EmployeeService>, ApplicationError> {
    info!(?kind, company = %company_name, "Selecting employee store");
    match kind {
        StoreKind::Cosmos => {
            let connection = connection.ok_or_else(|| {
                ApplicationError::BackendUnavailable(
                    "document store selected but no connection configured".to_string(),
                )
            })?;
            let store = open_document_store(connection)?;
            Ok(Arc::new(DocumentEmployeeService::new(store, company_name)))
        }
        StoreKind::Reference => Ok(Arc::new(ReferenceEmployeeService::new(company_name))),
    }
}
