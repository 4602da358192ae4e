// Module declarations
pub mod employee;
pub mod persistence;
pub mod selector;

// Re-export all implementations
pub use employee::{COMPANY_CONTAINER, DocumentEmployeeService, EMPLOYEE_CONTAINER, ReferenceEmployeeService};
pub use persistence::InMemoryDocumentStore;
pub use selector::{StoreKind, open_document_store, select_employee_service};
