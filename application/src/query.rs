//! Backend-neutral document query.
//!
//! A `DocumentQuery` is evaluated directly by in-process stores and rendered to
//! the SQL dialect of the document database for native backends.

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Exact-equality predicate on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

/// One ordering key. Ties fall through to the next key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    /// Restricts the query to a single partition. `None` is a cross-partition query.
    pub partition: Option<String>,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
}

/// Query text plus its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlText {
    pub text: String,
    pub parameters: Vec<(String, Value)>,
}

impl fmt::Display for SqlText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, case_insensitive: bool) -> Self {
        self.order_by.push(SortKey {
            field: field.into(),
            case_insensitive,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every filter holds for `document`. Partition scoping is the
    /// store's job and is not checked here.
    pub fn matches(&self, document: &Value) -> bool {
        self.filters
            .iter()
            .all(|filter| document.get(&filter.field) == Some(&filter.value))
    }

    /// Orders two documents by the query's sort keys.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.order_by {
            let left = sort_text(a.get(&key.field), key.case_insensitive);
            let right = sort_text(b.get(&key.field), key.case_insensitive);
            let result = left.cmp(&right);
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }

    /// Renders the query in the document database's SQL dialect.
    pub fn to_sql(&self) -> SqlText {
        let mut text = match self.limit {
            Some(limit) => format!("SELECT TOP {} * FROM e", limit),
            None => "SELECT * FROM e".to_string(),
        };
        let mut parameters = Vec::with_capacity(self.filters.len());
        for (index, filter) in self.filters.iter().enumerate() {
            let name = format!("@p{}", index);
            text.push_str(if index == 0 { " WHERE " } else { " AND " });
            text.push_str(&format!("e.{} = {}", filter.field, name));
            parameters.push((name, filter.value.clone()));
        }
        for (index, key) in self.order_by.iter().enumerate() {
            text.push_str(if index == 0 { " ORDER BY " } else { ", " });
            if key.case_insensitive {
                text.push_str(&format!("LOWER(e.{})", key.field));
            } else {
                text.push_str(&format!("e.{}", key.field));
            }
        }
        SqlText { text, parameters }
    }
}

fn sort_text(value: Option<&Value>, case_insensitive: bool) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if case_insensitive {
        text.to_lowercase()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_filters_as_named_parameters() {
        let sql = DocumentQuery::new()
            .in_partition("NewCo")
            .filter_eq("firstName", "Alice")
            .filter_eq("lastName", "Anselmino")
            .order_by("lastName", true)
            .order_by("firstName", false)
            .to_sql();
        assert_eq!(
            sql.text,
            "SELECT * FROM e WHERE e.firstName = @p0 AND e.lastName = @p1 ORDER BY LOWER(e.lastName), e.firstName"
        );
        assert_eq!(
            sql.parameters,
            vec![
                ("@p0".to_string(), json!("Alice")),
                ("@p1".to_string(), json!("Anselmino"))
            ]
        );
    }

    #[test]
    fn renders_limit_as_top() {
        let sql = DocumentQuery::new().limit(1).to_sql();
        assert_eq!(sql.to_string(), "SELECT TOP 1 * FROM e");
    }

    #[test]
    fn matches_requires_every_filter() {
        let doc = json!({"firstName": "Alice", "lastName": "Anselmino"});
        let query = DocumentQuery::new().filter_eq("firstName", "Alice");
        assert!(query.matches(&doc));
        assert!(!query.clone().filter_eq("lastName", "Zebransky").matches(&doc));
        assert!(DocumentQuery::new().matches(&doc));
    }

    #[test]
    fn compare_honours_case_insensitivity_and_tie_breaks() {
        let query = DocumentQuery::new()
            .order_by("lastName", true)
            .order_by("firstName", false);
        let lower = json!({"lastName": "adams", "firstName": "Zed"});
        let upper = json!({"lastName": "Baker", "firstName": "Amy"});
        assert_eq!(query.compare(&lower, &upper), Ordering::Less);

        let tie_a = json!({"lastName": "Smith", "firstName": "Ann"});
        let tie_b = json!({"lastName": "SMITH", "firstName": "Bob"});
        assert_eq!(query.compare(&tie_a, &tie_b), Ordering::Less);
    }
}
