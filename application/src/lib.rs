use async_trait::async_trait;
use domain::{Company, DomainError, Employee};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::Value;
use thiserror::Error;

pub mod hierarchy;
pub mod query;
pub mod search;
pub mod seed;

pub use hierarchy::ReportError;
pub use query::{DocumentQuery, FieldFilter, SortKey, SqlText};
pub use search::{EmployeeSearch, SearchField, compare_listing_order, listing_query};
pub use seed::{SeedTarget, default_roster, load_seed};

// --- Store Errors ---

/// Failures reported by a backing document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Document already exists: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

// --- Application Errors ---

/// Faults that callers cannot treat as an ordinary rejection.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Malformed record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError),
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ApplicationError::BackendUnavailable(msg),
            StoreError::Serialization(e) => ApplicationError::Serialization(e),
            other => ApplicationError::InfrastructureError(format!(
                "Unexpected store response: {}",
                other
            )),
        }
    }
}

// --- Write Outcome ---

/// Result of a mutation that reached the store (or was rejected before it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    NotFound,
    Duplicate,
    InvalidArgument(String),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        WriteOutcome::InvalidArgument(reason.into())
    }
}

impl From<DomainError> for WriteOutcome {
    fn from(err: DomainError) -> Self {
        WriteOutcome::InvalidArgument(err.to_string())
    }
}

/// Lazy, finite sequence of employees. Each call that returns one starts afresh.
pub type EmployeeStream = BoxStream<'static, Result<Employee, ApplicationError>>;

/// Wraps an already materialized result set.
pub fn employee_stream(employees: Vec<Employee>) -> EmployeeStream {
    stream::iter(employees.into_iter().map(Ok)).boxed()
}

/// Raw documents yielded by a store query.
pub type DocumentStream = BoxStream<'static, Result<Value, StoreError>>;

// --- Infrastructure Interfaces (Traits) ---

/// Logical contract of a partitioned document database.
///
/// Documents are JSON objects addressed by their `id` field within a partition.
/// Containers group documents and declare the path of their partition key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the container if it does not exist yet.
    async fn ensure_container(
        &self,
        container: &str,
        partition_key_path: &str,
    ) -> Result<(), StoreError>;
    /// Reads one document. `StoreError::NotFound` if absent.
    async fn read_by_key(
        &self,
        container: &str,
        id: &str,
        partition: &str,
    ) -> Result<Value, StoreError>;
    /// Conditional create. `StoreError::Conflict` if the key is taken.
    async fn create_if_absent(
        &self,
        container: &str,
        document: &Value,
        partition: &str,
    ) -> Result<(), StoreError>;
    /// Replaces an existing document. `StoreError::NotFound` if absent.
    async fn replace(
        &self,
        container: &str,
        document: &Value,
        id: &str,
        partition: &str,
    ) -> Result<(), StoreError>;
    /// Deletes one document. `StoreError::NotFound` if absent.
    async fn delete_by_key(
        &self,
        container: &str,
        id: &str,
        partition: &str,
    ) -> Result<(), StoreError>;
    /// Runs a query, optionally scoped to the query's partition.
    async fn query(
        &self,
        container: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentStream, StoreError>;
}

/// The employee persistence contract every backend implements.
///
/// Domain rejections come back as `Ok(WriteOutcome::..)`. Only faults of the
/// backend itself travel as `Err`.
#[async_trait]
pub trait EmployeeService: Send + Sync {
    /// Derives the id, assigns id and partition on success.
    async fn try_add_employee(
        &self,
        employee: &mut Employee,
    ) -> Result<WriteOutcome, ApplicationError>;
    /// Replaces the mutable fields of the stored record with `employee`'s.
    async fn try_update_employee(
        &self,
        employee: &Employee,
    ) -> Result<WriteOutcome, ApplicationError>;
    /// Deletes the record and drops it from the company roster.
    async fn try_remove_employee(
        &self,
        employee: &Employee,
    ) -> Result<WriteOutcome, ApplicationError>;
    /// All employees ordered by last name.
    async fn get_employees(&self) -> Result<EmployeeStream, ApplicationError>;
    async fn get_employee_by_id(&self, id: &str) -> Result<Option<Employee>, ApplicationError>;
    /// Resolved reports of a manager, ordered by last name.
    async fn get_employee_reports(
        &self,
        employee: &Employee,
    ) -> Result<EmployeeStream, ApplicationError>;
    /// Employees matching every non-blank criterion. Empty when no criterion is set.
    async fn search_employees(
        &self,
        criteria: &EmployeeSearch,
    ) -> Result<EmployeeStream, ApplicationError>;
    /// Appends report ids to a manager. Every candidate is validated against the
    /// manager's stored state before anything is written.
    async fn try_add_reports(
        &self,
        manager: &mut Employee,
        reports: &[Employee],
    ) -> Result<WriteOutcome, ApplicationError>;
    async fn try_add_report(
        &self,
        manager: &mut Employee,
        report: &Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.try_add_reports(manager, std::slice::from_ref(report))
            .await
    }
    /// Current company record, including its roster.
    async fn company(&self) -> Result<Company, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_store_maps_to_backend_unavailable() {
        let err: ApplicationError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, ApplicationError::BackendUnavailable(msg) if msg == "connection refused"));
    }

    #[test]
    fn unexpected_store_responses_are_not_swallowed() {
        let err: ApplicationError = StoreError::Conflict("x".into()).into();
        assert!(matches!(err, ApplicationError::InfrastructureError(_)));
    }

    #[test]
    fn domain_errors_become_invalid_argument() {
        let outcome: WriteOutcome = DomainError::MissingIdentity.into();
        assert!(matches!(outcome, WriteOutcome::InvalidArgument(_)));
        assert!(!outcome.is_applied());
        assert!(WriteOutcome::Applied.is_applied());
    }

    #[tokio::test]
    async fn employee_stream_yields_in_order() {
        use futures::TryStreamExt;
        let dob = chrono::NaiveDate::from_ymd_opt(1976, 6, 19).unwrap();
        let employees = vec![
            Employee::new("Alice", "", "Anselmino", dob),
            Employee::new("Zach", "", "Zebransky", dob),
        ];
        let collected: Vec<Employee> = employee_stream(employees.clone()).try_collect().await.unwrap();
        assert_eq!(collected, employees);
    }
}
