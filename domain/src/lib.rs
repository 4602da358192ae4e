use chrono::NaiveDate; // Date of birth carries no time component
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Employee '{0}' is not a manager and cannot hold reports")]
    NotAManager(String),
    #[error("Employee '{0}' cannot report to itself")]
    SelfReport(String),
    #[error("Report '{report}' is listed more than once for '{manager}'")]
    DuplicateReport { manager: String, report: String },
    #[error("Employee has no identity yet")]
    MissingIdentity,
}

// --- Employee ID ---

/// Derived identity key of an employee record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new(id: String) -> Self {
        Self(id)
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for EmployeeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
impl From<&str> for EmployeeId {
    fn from(id: &str) -> Self {
        Self::new(id.to_string())
    }
}
impl From<EmployeeId> for String {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}
impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the identity key `"<lastName>,<firstName>;<yyyy-MM-dd>"`.
///
/// Must only be called once, when a record is first created. Later edits to the
/// name fields never feed back into the key.
pub fn derive_id(employee: &Employee) -> EmployeeId {
    EmployeeId(format!(
        "{},{};{}",
        employee.last_name,
        employee.first_name,
        employee.date_of_birth.format("%Y-%m-%d")
    ))
}

// --- Employee ---

/// A person in the directory, scoped to a company partition.
///
/// Equality follows the identity triple (last name, first name, date of birth),
/// not the full field set.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Assigned by the store on creation. Callers leave this empty when adding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmployeeId>,
    /// Company name owning the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub is_manager: bool,
    #[serde(default)]
    pub report_ids: Vec<EmployeeId>,
}

impl Employee {
    pub fn new(
        first_name: impl Into<String>,
        middle_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            partition: None,
            first_name: first_name.into(),
            middle_name: middle_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            is_manager: false,
            report_ids: Vec::new(),
        }
    }

    /// Marks the employee as a manager.
    pub fn as_manager(mut self) -> Self {
        self.is_manager = true;
        self
    }

    /// Stamps identity and partition onto a record that has neither yet.
    /// Returns the derived id.
    pub fn assign_identity(&mut self, partition: &str) -> EmployeeId {
        let id = derive_id(self);
        self.id = Some(id.clone());
        self.partition = Some(partition.to_string());
        id
    }

    /// Copy of the mutable fields of `source` onto this record. `id` and
    /// `partition` are left untouched.
    pub fn apply_changes(&mut self, source: &Employee) {
        self.first_name = source.first_name.clone();
        self.middle_name = source.middle_name.clone();
        self.last_name = source.last_name.clone();
        self.date_of_birth = source.date_of_birth;
        self.is_manager = source.is_manager;
        self.report_ids = source.report_ids.clone();
    }

    /// True when the record carries no partition or carries `partition`.
    pub fn belongs_to(&self, partition: &str) -> bool {
        self.partition.as_deref().is_none_or(|own| own == partition)
    }

    /// Removes `report` from the report list. Returns whether it was present.
    pub fn detach_report(&mut self, report: &EmployeeId) -> bool {
        let before = self.report_ids.len();
        self.report_ids.retain(|id| id != report);
        self.report_ids.len() != before
    }

    /// Checks the report list against the manager/report invariants.
    pub fn validate_reports(&self) -> Result<(), DomainError> {
        if self.report_ids.is_empty() {
            return Ok(());
        }
        let label = self
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| derive_id(self).to_string());
        if !self.is_manager {
            return Err(DomainError::NotAManager(label));
        }
        let mut seen = HashSet::new();
        for report in &self.report_ids {
            if self.id.as_ref() == Some(report) {
                return Err(DomainError::SelfReport(label));
            }
            if !seen.insert(report) {
                return Err(DomainError::DuplicateReport {
                    manager: label,
                    report: report.to_string(),
                });
            }
        }
        Ok(())
    }

    fn identity_triple(&self) -> (&str, &str, NaiveDate) {
        (&self.last_name, &self.first_name, self.date_of_birth)
    }
}

impl PartialEq for Employee {
    fn eq(&self, other: &Self) -> bool {
        self.identity_triple() == other.identity_triple()
    }
}
impl Eq for Employee {}

impl Hash for Employee {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_triple().hash(state);
    }
}

// --- Company ---

/// Tenant record. Owns the roster of employee ids, never the employee bodies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub employee_ids: Vec<EmployeeId>,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            employee_ids: Vec::new(),
        }
    }

    /// Appends an id to the roster unless it is already enrolled.
    pub fn enroll(&mut self, id: &EmployeeId) -> bool {
        if self.employee_ids.contains(id) {
            return false;
        }
        self.employee_ids.push(id.clone());
        true
    }

    /// Removes an id from the roster. Returns whether it was present.
    pub fn withdraw(&mut self, id: &EmployeeId) -> bool {
        let before = self.employee_ids.len();
        self.employee_ids.retain(|existing| existing != id);
        self.employee_ids.len() != before
    }
}
