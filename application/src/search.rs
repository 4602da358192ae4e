//! Listing order and multi-field search shared by every backend.
//!
//! The reference store evaluates these in memory, the document store turns
//! them into a `DocumentQuery`. Both must agree on matching and ordering.

use crate::query::DocumentQuery;
use domain::Employee;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fields that can take part in a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    FirstName,
    MiddleName,
    LastName,
}

impl SearchField {
    /// Serialized field name in stored documents.
    pub fn document_field(self) -> &'static str {
        match self {
            SearchField::FirstName => "firstName",
            SearchField::MiddleName => "middleName",
            SearchField::LastName => "lastName",
        }
    }

    fn value_of(self, employee: &Employee) -> &str {
        match self {
            SearchField::FirstName => &employee.first_name,
            SearchField::MiddleName => &employee.middle_name,
            SearchField::LastName => &employee.last_name,
        }
    }
}

/// Search template. Blank or missing fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSearch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl From<&Employee> for EmployeeSearch {
    fn from(template: &Employee) -> Self {
        Self {
            first_name: Some(template.first_name.clone()),
            middle_name: Some(template.middle_name.clone()),
            last_name: Some(template.last_name.clone()),
        }
    }
}

impl EmployeeSearch {
    /// One predicate per non-blank field, in first/middle/last order.
    pub fn predicates(&self) -> Vec<(SearchField, &str)> {
        [
            (SearchField::FirstName, self.first_name.as_deref()),
            (SearchField::MiddleName, self.middle_name.as_deref()),
            (SearchField::LastName, self.last_name.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if !v.trim().is_empty() => Some((field, v)),
            _ => None,
        })
        .collect()
    }

    /// No criterion set. Such a search yields nothing rather than everything.
    pub fn is_unbounded(&self) -> bool {
        self.predicates().is_empty()
    }

    /// Exact, case-sensitive match on every predicate.
    pub fn matches(&self, employee: &Employee) -> bool {
        let predicates = self.predicates();
        !predicates.is_empty()
            && predicates
                .iter()
                .all(|(field, value)| field.value_of(employee) == *value)
    }

    /// Native query for a partition, or `None` when the search is unbounded.
    pub fn to_document_query(&self, partition: &str) -> Option<DocumentQuery> {
        let predicates = self.predicates();
        if predicates.is_empty() {
            return None;
        }
        let query = predicates.into_iter().fold(
            DocumentQuery::new().in_partition(partition),
            |query, (field, value)| query.filter_eq(field.document_field(), value),
        );
        Some(with_listing_order(query))
    }
}

/// Last name (case-insensitive), then first name, then id.
pub fn compare_listing_order(a: &Employee, b: &Employee) -> Ordering {
    a.last_name
        .to_lowercase()
        .cmp(&b.last_name.to_lowercase())
        .then_with(|| a.first_name.cmp(&b.first_name))
        .then_with(|| {
            let left = a.id.as_ref().map(|id| id.as_str()).unwrap_or("");
            let right = b.id.as_ref().map(|id| id.as_str()).unwrap_or("");
            left.cmp(right)
        })
}

/// Every employee of a partition, in listing order.
pub fn listing_query(partition: &str) -> DocumentQuery {
    with_listing_order(DocumentQuery::new().in_partition(partition))
}

fn with_listing_order(query: DocumentQuery) -> DocumentQuery {
    query
        .order_by("lastName", true)
        .order_by("firstName", false)
        .order_by("id", false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn employee(first: &str, middle: &str, last: &str) -> Employee {
        let dob = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
        Employee::new(first, middle, last, dob)
    }

    #[test]
    fn blank_fields_produce_no_predicates() {
        let search = EmployeeSearch {
            first_name: Some("  ".to_string()),
            middle_name: None,
            last_name: Some(String::new()),
        };
        assert!(search.is_unbounded());
        assert!(!search.matches(&employee("Alice", "", "Anselmino")));
        assert!(search.to_document_query("NewCo").is_none());
    }

    #[test]
    fn every_predicate_must_hold() {
        let search = EmployeeSearch {
            first_name: Some("Alice".to_string()),
            last_name: Some("Anselmino".to_string()),
            ..Default::default()
        };
        assert!(search.matches(&employee("Alice", "Applesauce", "Anselmino")));
        assert!(!search.matches(&employee("Alice", "Applesauce", "Zebransky")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let search = EmployeeSearch {
            first_name: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(!search.matches(&employee("Alice", "", "Anselmino")));
    }

    #[test]
    fn template_employee_converts_to_criteria() {
        let template = employee("", "Head", "");
        let search = EmployeeSearch::from(&template);
        assert_eq!(search.predicates(), vec![(SearchField::MiddleName, "Head")]);
    }

    #[test]
    fn document_query_filters_in_partition() {
        let search = EmployeeSearch {
            first_name: Some("Alice".to_string()),
            ..Default::default()
        };
        let query = search.to_document_query("NewCo").unwrap();
        assert_eq!(query.partition.as_deref(), Some("NewCo"));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "firstName");
        assert_eq!(query.order_by[0].field, "lastName");
    }

    #[test]
    fn listing_order_ignores_case_and_breaks_ties_by_first_name() {
        let mut people = vec![
            employee("Zach", "", "Zebransky"),
            employee("Bea", "", "mandator"),
            employee("Amy", "", "Mandator"),
            employee("Alice", "", "Anselmino"),
        ];
        people.sort_by(compare_listing_order);
        let names: Vec<_> = people.iter().map(|e| e.first_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Amy", "Bea", "Zach"]);
    }
}
