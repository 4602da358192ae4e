pub mod document_service;
pub mod reference_service;

pub use document_service::{COMPANY_CONTAINER, DocumentEmployeeService, EMPLOYEE_CONTAINER};
pub use reference_service::ReferenceEmployeeService;
