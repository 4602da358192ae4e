//! Manager/report resolution and validation.

use crate::WriteOutcome;
use crate::search::compare_listing_order;
use domain::{Employee, EmployeeId};
use std::collections::HashSet;
use thiserror::Error;

/// Why a batch of reports was refused.
#[derive(Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("Manager has no identity")]
    ManagerWithoutId,
    #[error("Employee '{0}' is not a manager")]
    NotAManager(EmployeeId),
    #[error("No reports supplied")]
    EmptyBatch,
    #[error("Report has no identity")]
    ReportWithoutId,
    #[error("Employee '{0}' cannot report to itself")]
    SelfReport(EmployeeId),
    #[error("Employee '{0}' already reports to this manager")]
    AlreadyReporting(EmployeeId),
    #[error("Employee '{0}' appears more than once in the batch")]
    RepeatedInBatch(EmployeeId),
}

impl From<ReportError> for WriteOutcome {
    fn from(err: ReportError) -> Self {
        WriteOutcome::InvalidArgument(err.to_string())
    }
}

/// Ids that should be resolved for `employee`. Empty for non-managers.
pub fn report_ids_to_resolve(employee: &Employee) -> &[EmployeeId] {
    if employee.is_manager {
        &employee.report_ids
    } else {
        &[]
    }
}

/// Deduplicates resolved reports by id and orders them for listing.
pub fn collect_reports(resolved: impl IntoIterator<Item = Employee>) -> Vec<Employee> {
    let mut seen = HashSet::new();
    let mut reports: Vec<Employee> = resolved
        .into_iter()
        .filter(|report| match &report.id {
            Some(id) => seen.insert(id.clone()),
            None => false,
        })
        .collect();
    reports.sort_by(compare_listing_order);
    reports
}

/// Validates candidate reports against the manager's stored (pre-batch) state.
/// Returns the ids to append, in the order given.
pub fn validate_new_reports(
    manager: &Employee,
    reports: &[Employee],
) -> Result<Vec<EmployeeId>, ReportError> {
    let manager_id = manager.id.as_ref().ok_or(ReportError::ManagerWithoutId)?;
    if !manager.is_manager {
        return Err(ReportError::NotAManager(manager_id.clone()));
    }
    if reports.is_empty() {
        return Err(ReportError::EmptyBatch);
    }

    let mut batch = HashSet::new();
    let mut ids = Vec::with_capacity(reports.len());
    for report in reports {
        let id = report.id.as_ref().ok_or(ReportError::ReportWithoutId)?;
        if id == manager_id {
            return Err(ReportError::SelfReport(id.clone()));
        }
        if manager.report_ids.contains(id) {
            return Err(ReportError::AlreadyReporting(id.clone()));
        }
        if !batch.insert(id) {
            return Err(ReportError::RepeatedInBatch(id.clone()));
        }
        ids.push(id.clone());
    }
    Ok(ids)
}

/// Report ids present in `updated` but not yet in `stored`. Only these need
/// to be checked for existence; ids already on file are kept as they are.
pub fn added_report_ids<'a>(stored: &Employee, updated: &'a Employee) -> Vec<&'a EmployeeId> {
    updated
        .report_ids
        .iter()
        .filter(|id| !stored.report_ids.contains(id))
        .collect()
}
