//! Initial roster written into an empty store.

use crate::{ApplicationError, WriteOutcome};
use async_trait::async_trait;
use chrono::NaiveDate;
use domain::Employee;
use tracing::{debug, info, instrument};

/// Write path used while a store initializes itself. Implementations must not
/// re-enter their own initialization.
#[async_trait]
pub trait SeedTarget: Send + Sync {
    async fn seed_one(&self, employee: Employee) -> Result<WriteOutcome, ApplicationError>;
}

/// The fixed ten-person roster, two of them managers.
pub fn default_roster() -> Vec<Employee> {
    const ROSTER: [(&str, &str, &str, (i32, u32, u32), bool); 10] = [
        ("Alice", "Applesauce", "Anselmino", (1976, 6, 19), false),
        ("Bob", "Bontificate", "Bandorama", (1979, 6, 19), false),
        ("Chris", "Causality", "Cranstonette", (1929, 6, 19), false),
        ("Hector", "Head", "Honcho", (2000, 6, 19), true),
        ("Ingrid", "Incrastical", "Interlocutor", (1975, 6, 19), false),
        ("Jericho", "Jonseyhones", "Jelmonico", (1, 12, 25), false),
        ("Mandy", "Managerial", "Mandator", (2140, 6, 19), true),
        ("Norman", "Netheregion", "Nederlander", (1066, 6, 19), false),
        ("Yolanda", "Yellowtail", "Yammerstammer", (105, 6, 19), false),
        ("Zach", "", "Zebransky", (1976, 6, 19), false),
    ];

    ROSTER
        .iter()
        .filter_map(|&(first, middle, last, (y, m, d), manager)| {
            let dob = NaiveDate::from_ymd_opt(y, m, d)?;
            let employee = Employee::new(first, middle, last, dob);
            Some(if manager {
                employee.as_manager()
            } else {
                employee
            })
        })
        .collect()
}

/// Adds each roster entry in order. Rejections (a re-seed hitting existing ids)
/// are ignored; backend faults abort the load.
#[instrument(skip_all, fields(count = roster.len()))]
pub async fn load_seed<T>(target: &T, roster: &[Employee]) -> Result<usize, ApplicationError>
where
    T: SeedTarget + ?Sized,
{
    let mut added = 0;
    for employee in roster {
        let outcome = target.seed_one(employee.clone()).await?;
        if outcome.is_applied() {
            added += 1;
        } else {
            debug!(last_name = %employee.last_name, ?outcome, "Seed entry skipped");
        }
    }
    info!(added, "Seed roster loaded");
    Ok(added)
}
