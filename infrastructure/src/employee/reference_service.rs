// ./infrastructure/src/employee/reference_service.rs
use application::hierarchy::{
    added_report_ids, collect_reports, report_ids_to_resolve, validate_new_reports,
};
use application::{
    ApplicationError, EmployeeSearch, EmployeeService, EmployeeStream, SeedTarget, WriteOutcome,
    compare_listing_order, default_roster, employee_stream, load_seed,
};
use async_trait::async_trait;
use domain::{Company, Employee, EmployeeId};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Company record plus the employee bodies, in insertion order.
#[derive(Debug)]
struct Directory {
    company: Company,
    employees: Vec<Employee>,
}

impl Directory {
    fn position(&self, id: &EmployeeId) -> Option<usize> {
        self.employees
            .iter()
            .position(|e| e.id.as_ref() == Some(id))
    }

    fn find(&self, id: &EmployeeId) -> Option<&Employee> {
        self.position(id).map(|index| &self.employees[index])
    }

    fn first_missing<'a, I>(&self, ids: I) -> Option<&'a EmployeeId>
    where
        I: IntoIterator<Item = &'a EmployeeId>,
    {
        ids.into_iter().find(|id| self.position(id).is_none())
    }
}

/// In-process implementation of the employee contract.
///
/// All writers take the directory's write guard for the whole
/// check-then-mutate sequence and never suspend while holding it, so a dropped
/// call either applied completely or not at all. Readers copy a snapshot and
/// release the guard before yielding anything.
pub struct ReferenceEmployeeService {
    company_name: String,
    directory: RwLock<Directory>,
    seed: Vec<Employee>,
    initialized: OnceCell<()>,
}

impl ReferenceEmployeeService {
    pub fn new(company_name: impl Into<String>) -> Self {
        let company_name = company_name.into();
        let company = Company::new(Uuid::new_v4().to_string(), company_name.clone());
        info!(company = %company.name, company_id = %company.id, "Reference employee store created");
        Self {
            company_name,
            directory: RwLock::new(Directory {
                company,
                employees: Vec::new(),
            }),
            seed: default_roster(),
            initialized: OnceCell::new(),
        }
    }

    /// Replaces the roster written on first use of an empty store.
    pub fn with_seed(mut self, roster: Vec<Employee>) -> Self {
        self.seed = roster;
        self
    }

    async fn init_if_necessary(&self) -> Result<(), ApplicationError> {
        self.initialized
            .get_or_try_init(|| async {
                let empty = self.directory.read().await.employees.is_empty();
                if empty {
                    info!(company = %self.company_name, "Seeding empty reference store");
                    load_seed(&Seeder(self), &self.seed).await?;
                }
                Ok::<(), ApplicationError>(())
            })
            .await
            .map(|_| ())
    }

    async fn add_record(&self, employee: &mut Employee) -> Result<WriteOutcome, ApplicationError> {
        if employee.id.is_some() {
            warn!(employee_id = ?employee.id, "Add rejected: id is assigned by the store");
            return Ok(WriteOutcome::invalid("employee already has an id"));
        }
        let mut candidate = employee.clone();
        let id = candidate.assign_identity(&self.company_name);
        if let Err(e) = candidate.validate_reports() {
            warn!(employee_id = %id, "Add rejected: {}", e);
            return Ok(e.into());
        }

        let mut directory = self.directory.write().await;
        if directory.position(&id).is_some() {
            warn!(employee_id = %id, "Add rejected: duplicate identity");
            return Ok(WriteOutcome::Duplicate);
        }
        if let Some(missing) = directory.first_missing(&candidate.report_ids) {
            warn!(employee_id = %id, report_id = %missing, "Add rejected: unknown report");
            return Ok(WriteOutcome::invalid(format!("report '{}' does not exist", missing)));
        }
        directory.employees.push(candidate.clone());
        directory.company.enroll(&id);
        drop(directory);

        info!(employee_id = %id, "Employee added");
        *employee = candidate;
        Ok(WriteOutcome::Applied)
    }

    async fn snapshot_sorted(&self, keep: impl Fn(&Employee) -> bool) -> Vec<Employee> {
        let mut employees: Vec<Employee> = {
            let directory = self.directory.read().await;
            directory
                .employees
                .iter()
                .filter(|&e| keep(e))
                .cloned()
                .collect()
        };
        employees.sort_by(compare_listing_order);
        employees
    }
}

/// Write path used during initialization, bypassing the init guard.
struct Seeder<'a>(&'a ReferenceEmployeeService);

#[async_trait]
impl SeedTarget for Seeder<'_> {
    async fn seed_one(&self, mut employee: Employee) -> Result<WriteOutcome, ApplicationError> {
        self.0.add_record(&mut employee).await
    }
}

#[async_trait]
impl EmployeeService for ReferenceEmployeeService {
    #[instrument(skip(self, employee), fields(last_name = %employee.last_name))]
    async fn try_add_employee(
        &self,
        employee: &mut Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.init_if_necessary().await?;
        self.add_record(employee).await
    }

    #[instrument(skip(self, employee), fields(employee_id = ?employee.id))]
    async fn try_update_employee(
        &self,
        employee: &Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.init_if_necessary().await?;
        let Some(id) = employee.id.as_ref() else {
            warn!("Update rejected: employee has no id");
            return Ok(WriteOutcome::invalid("employee has no id"));
        };
        if !employee.belongs_to(&self.company_name) {
            warn!(employee_id = %id, partition = ?employee.partition, "Update rejected: foreign partition");
            return Ok(WriteOutcome::NotFound);
        }

        let mut directory = self.directory.write().await;
        let Some(index) = directory.position(id) else {
            warn!(employee_id = %id, "Update rejected: not found");
            return Ok(WriteOutcome::NotFound);
        };
        let mut updated = directory.employees[index].clone();
        updated.apply_changes(employee);
        if let Err(e) = updated.validate_reports() {
            warn!(employee_id = %id, "Update rejected: {}", e);
            return Ok(e.into());
        }
        let added = added_report_ids(&directory.employees[index], &updated);
        if let Some(missing) = directory.first_missing(added) {
            warn!(employee_id = %id, report_id = %missing, "Update rejected: unknown report");
            return Ok(WriteOutcome::invalid(format!("report '{}' does not exist", missing)));
        }
        directory.employees[index] = updated;
        info!(employee_id = %id, "Employee updated");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self, employee), fields(employee_id = ?employee.id))]
    async fn try_remove_employee(
        &self,
        employee: &Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        self.init_if_necessary().await?;
        let Some(id) = employee.id.as_ref() else {
            warn!("Remove rejected: employee has no id");
            return Ok(WriteOutcome::invalid("employee has no id"));
        };
        if !employee.belongs_to(&self.company_name) {
            warn!(employee_id = %id, partition = ?employee.partition, "Remove rejected: foreign partition");
            return Ok(WriteOutcome::NotFound);
        }

        let mut directory = self.directory.write().await;
        let Some(index) = directory.position(id) else {
            warn!(employee_id = %id, "Remove rejected: not found");
            return Ok(WriteOutcome::NotFound);
        };
        directory.employees.remove(index);
        directory.company.withdraw(id);
        let mut detached = 0;
        for manager in directory.employees.iter_mut().filter(|e| e.is_manager) {
            if manager.detach_report(id) {
                detached += 1;
            }
        }
        info!(employee_id = %id, managers_updated = detached, "Employee removed");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn get_employees(&self) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        let employees = self.snapshot_sorted(|_| true).await;
        debug!(count = employees.len(), "Listing employees");
        Ok(employee_stream(employees))
    }

    #[instrument(skip(self))]
    async fn get_employee_by_id(&self, id: &str) -> Result<Option<Employee>, ApplicationError> {
        self.init_if_necessary().await?;
        let directory = self.directory.read().await;
        Ok(directory.find(&EmployeeId::from(id)).cloned())
    }

    #[instrument(skip(self, employee), fields(employee_id = ?employee.id))]
    async fn get_employee_reports(
        &self,
        employee: &Employee,
    ) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        let resolved: Vec<Employee> = {
            let directory = self.directory.read().await;
            report_ids_to_resolve(employee)
                .iter()
                .filter_map(|id| directory.find(id).cloned())
                .collect()
        };
        let reports = collect_reports(resolved);
        debug!(count = reports.len(), "Resolved reports");
        Ok(employee_stream(reports))
    }

    #[instrument(skip(self))]
    async fn search_employees(
        &self,
        criteria: &EmployeeSearch,
    ) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        if criteria.is_unbounded() {
            debug!("Search without criteria yields nothing");
            return Ok(employee_stream(Vec::new()));
        }
        let found = self.snapshot_sorted(|e| criteria.matches(e)).await;
        debug!(count = found.len(), "Search finished");
        Ok(employee_stream(found))
    }

    #[instrument(skip(self, manager, reports), fields(manager_id = ?manager.id, count = reports.len()))]
    async fn try_add_reports(
        &self,
        manager: &mut Employee,
        reports: &[Employee],
    ) -> Result<WriteOutcome, ApplicationError> {
        self.init_if_necessary().await?;
        let Some(manager_id) = manager.id.clone() else {
            warn!("Add reports rejected: manager has no id");
            return Ok(WriteOutcome::invalid("manager has no id"));
        };
        if !manager.belongs_to(&self.company_name) {
            warn!(manager_id = %manager_id, "Add reports rejected: foreign partition");
            return Ok(WriteOutcome::NotFound);
        }

        let mut directory = self.directory.write().await;
        let Some(index) = directory.position(&manager_id) else {
            warn!(manager_id = %manager_id, "Add reports rejected: manager not found");
            return Ok(WriteOutcome::NotFound);
        };
        let new_ids = match validate_new_reports(&directory.employees[index], reports) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(manager_id = %manager_id, "Add reports rejected: {}", e);
                return Ok(e.into());
            }
        };
        if let Some(missing) = directory.first_missing(&new_ids) {
            warn!(manager_id = %manager_id, report_id = %missing, "Add reports rejected: report not found");
            return Ok(WriteOutcome::NotFound);
        }
        let stored = &mut directory.employees[index];
        stored.report_ids.extend(new_ids);
        manager.report_ids = stored.report_ids.clone();
        info!(manager_id = %manager_id, total = manager.report_ids.len(), "Reports added");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn company(&self) -> Result<Company, ApplicationError> {
        self.init_if_necessary().await?;
        Ok(self.directory.read().await.company.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::TryStreamExt;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn newcomer() -> Employee {
        Employee::new("Quinn", "Q", "Quartermaine", date(1990, 3, 4))
    }

    async fn fetch(service: &ReferenceEmployeeService, id: &str) -> Employee {
        service.get_employee_by_id(id).await.unwrap().unwrap()
    }

    async fn last_names(stream: EmployeeStream) -> Vec<String> {
        let employees: Vec<Employee> = stream.try_collect().await.unwrap();
        employees.into_iter().map(|e| e.last_name).collect()
    }

    #[tokio::test]
    async fn first_use_seeds_ten_employees_sorted() {
        let service = ReferenceEmployeeService::new("NewCo");
        let names = last_names(service.get_employees().await.unwrap()).await;
        assert_eq!(names.len(), 10);
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.to_lowercase());
        assert_eq!(names, sorted);
        assert_eq!(service.company().await.unwrap().employee_ids.len(), 10);
    }

    #[tokio::test]
    async fn seeding_runs_once() {
        let service = ReferenceEmployeeService::new("NewCo");
        service.init_if_necessary().await.unwrap();
        service.init_if_necessary().await.unwrap();
        let all: Vec<Employee> = service.get_employees().await.unwrap().try_collect().await.unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn add_assigns_identity_and_rejects_duplicates() {
        let service = ReferenceEmployeeService::new("NewCo").with_seed(Vec::new());
        let mut first = newcomer();
        assert_eq!(service.try_add_employee(&mut first).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(
            first.id.as_ref().map(|id| id.as_str()),
            Some("Quartermaine,Quinn;1990-03-04")
        );
        assert_eq!(first.partition.as_deref(), Some("NewCo"));

        let mut twin = newcomer();
        twin.middle_name = "Different".to_string();
        assert_eq!(service.try_add_employee(&mut twin).await.unwrap(), WriteOutcome::Duplicate);
        assert!(twin.id.is_none());

        assert!(matches!(
            service.try_add_employee(&mut first).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn round_trip_by_id() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut e = newcomer();
        service.try_add_employee(&mut e).await.unwrap();
        let fetched = service
            .get_employee_by_id("Quartermaine,Quinn;1990-03-04")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, newcomer());
        assert_eq!(fetched.middle_name, "Q");
        assert!(service.get_employee_by_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_preserves_identity() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut e = newcomer();
        service.try_add_employee(&mut e).await.unwrap();
        let original_id = e.id.clone().unwrap();

        let mut edit = e.clone();
        edit.first_name = "Quincy".to_string();
        assert_eq!(service.try_update_employee(&edit).await.unwrap(), WriteOutcome::Applied);

        let fetched = service
            .get_employee_by_id(original_id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.first_name, "Quincy");
        assert_eq!(fetched.id, Some(original_id));
        assert_eq!(fetched.partition.as_deref(), Some("NewCo"));
    }

    #[tokio::test]
    async fn update_rejects_missing_and_unidentified_records() {
        let service = ReferenceEmployeeService::new("NewCo");
        assert!(matches!(
            service.try_update_employee(&newcomer()).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
        let mut ghost = newcomer();
        ghost.id = Some(EmployeeId::from("ghost"));
        assert_eq!(service.try_update_employee(&ghost).await.unwrap(), WriteOutcome::NotFound);
    }

    #[tokio::test]
    async fn update_rejects_reports_on_non_manager() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut alice = fetch(&service, "Anselmino,Alice;1976-06-19").await;
        alice.report_ids.push(EmployeeId::from("Bandorama,Bob;1979-06-19"));
        assert!(matches!(
            service.try_update_employee(&alice).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn remove_frees_the_slot() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut e = newcomer();
        service.try_add_employee(&mut e).await.unwrap();
        let id = e.id.clone().unwrap();

        assert_eq!(service.try_remove_employee(&e).await.unwrap(), WriteOutcome::Applied);
        assert!(service.get_employee_by_id(id.as_str()).await.unwrap().is_none());
        assert!(!service.company().await.unwrap().employee_ids.contains(&id));
        assert_eq!(service.try_remove_employee(&e).await.unwrap(), WriteOutcome::NotFound);

        let mut again = newcomer();
        assert_eq!(service.try_add_employee(&mut again).await.unwrap(), WriteOutcome::Applied);
    }

    #[tokio::test]
    async fn listing_orders_by_last_name() {
        let seed = vec![
            Employee::new("Zach", "", "Zebransky", date(1976, 6, 19)),
            Employee::new("Alice", "", "Anselmino", date(1976, 6, 19)),
            Employee::new("Mandy", "", "Mandator", date(2140, 6, 19)),
        ];
        let service = ReferenceEmployeeService::new("NewCo").with_seed(seed);
        let names = last_names(service.get_employees().await.unwrap()).await;
        assert_eq!(names, vec!["Anselmino", "Mandator", "Zebransky"]);
    }

    #[tokio::test]
    async fn search_matches_all_given_fields() {
        let service = ReferenceEmployeeService::new("NewCo");
        let by_first = EmployeeSearch {
            first_name: Some("Alice".to_string()),
            ..Default::default()
        };
        let found: Vec<Employee> = service
            .search_employees(&by_first)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_name, "Anselmino");

        let mismatch = EmployeeSearch {
            first_name: Some("Alice".to_string()),
            last_name: Some("Zebransky".to_string()),
            ..Default::default()
        };
        let names = last_names(service.search_employees(&mismatch).await.unwrap()).await;
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn search_without_criteria_is_empty() {
        let service = ReferenceEmployeeService::new("NewCo");
        let names = last_names(
            service
                .search_employees(&EmployeeSearch::default())
                .await
                .unwrap(),
        )
        .await;
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn reports_drop_unresolved_ids() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut hector = fetch(&service, "Honcho,Hector;2000-06-19").await;
        hector.report_ids = vec![
            EmployeeId::from("Bandorama,Bob;1979-06-19"),
            EmployeeId::from("missing-id"),
        ];
        let names = last_names(service.get_employee_reports(&hector).await.unwrap()).await;
        assert_eq!(names, vec!["Bandorama"]);

        hector.is_manager = false;
        let names = last_names(service.get_employee_reports(&hector).await.unwrap()).await;
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn add_reports_persists_and_validates() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut mandy = fetch(&service, "Mandator,Mandy;2140-06-19").await;
        let bob = fetch(&service, "Bandorama,Bob;1979-06-19").await;
        let chris = fetch(&service, "Cranstonette,Chris;1929-06-19").await;
        let mut alice = fetch(&service, "Anselmino,Alice;1976-06-19").await;

        assert_eq!(
            service.try_add_reports(&mut mandy, &[bob.clone(), chris]).await.unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(mandy.report_ids.len(), 2);
        let names = last_names(service.get_employee_reports(&mandy).await.unwrap()).await;
        assert_eq!(names, vec!["Bandorama", "Cranstonette"]);

        assert!(matches!(
            service.try_add_report(&mut mandy, &bob).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
        let self_report = mandy.clone();
        assert!(matches!(
            service.try_add_report(&mut mandy, &self_report).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
        assert!(matches!(
            service.try_add_report(&mut alice, &bob).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));

        let mut stranger = newcomer();
        stranger.id = Some(EmployeeId::from("Stranger,Sam;1999-01-01"));
        assert_eq!(
            service.try_add_report(&mut mandy, &stranger).await.unwrap(),
            WriteOutcome::NotFound
        );
        assert_eq!(mandy.report_ids.len(), 2);
    }

    #[tokio::test]
    async fn removing_a_report_detaches_it_from_its_manager() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut mandy = fetch(&service, "Mandator,Mandy;2140-06-19").await;
        let bob = fetch(&service, "Bandorama,Bob;1979-06-19").await;
        let chris = fetch(&service, "Cranstonette,Chris;1929-06-19").await;
        service.try_add_reports(&mut mandy, &[bob.clone(), chris]).await.unwrap();

        assert_eq!(service.try_remove_employee(&bob).await.unwrap(), WriteOutcome::Applied);
        let mut stored = fetch(&service, "Mandator,Mandy;2140-06-19").await;
        assert_eq!(
            stored.report_ids,
            vec![EmployeeId::from("Cranstonette,Chris;1929-06-19")]
        );

        stored.middle_name = "Renamed".to_string();
        assert_eq!(service.try_update_employee(&stored).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(fetch(&service, "Mandator,Mandy;2140-06-19").await.middle_name, "Renamed");
    }

    #[tokio::test]
    async fn update_keeps_report_ids_already_on_file() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut mandy = fetch(&service, "Mandator,Mandy;2140-06-19").await;
        let stale = EmployeeId::from("Gone,Gary;1950-01-01");
        {
            let mut directory = service.directory.write().await;
            let index = directory.position(mandy.id.as_ref().unwrap()).unwrap();
            directory.employees[index].report_ids.push(stale.clone());
        }
        mandy.report_ids = vec![stale.clone()];
        mandy.middle_name = "Kept".to_string();
        assert_eq!(service.try_update_employee(&mandy).await.unwrap(), WriteOutcome::Applied);

        mandy.report_ids.push(EmployeeId::from("Never,Was;1900-01-01"));
        assert!(matches!(
            service.try_update_employee(&mandy).await.unwrap(),
            WriteOutcome::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn foreign_partition_is_not_found() {
        let service = ReferenceEmployeeService::new("NewCo");
        let mut alice = fetch(&service, "Anselmino,Alice;1976-06-19").await;
        alice.partition = Some("OtherCo".to_string());
        alice.middle_name = "Changed".to_string();

        assert_eq!(service.try_update_employee(&alice).await.unwrap(), WriteOutcome::NotFound);
        assert_eq!(service.try_remove_employee(&alice).await.unwrap(), WriteOutcome::NotFound);
        let stored = fetch(&service, "Anselmino,Alice;1976-06-19").await;
        assert_eq!(stored.middle_name, "Applesauce");

        let bob = fetch(&service, "Bandorama,Bob;1979-06-19").await;
        let mut mandy = fetch(&service, "Mandator,Mandy;2140-06-19").await;
        mandy.partition = Some("OtherCo".to_string());
        assert_eq!(service.try_add_report(&mut mandy, &bob).await.unwrap(), WriteOutcome::NotFound);

        alice.partition = None;
        assert_eq!(service.try_update_employee(&alice).await.unwrap(), WriteOutcome::Applied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_adds_yield_one_success() {
        let service = Arc::new(ReferenceEmployeeService::new("NewCo").with_seed(Vec::new()));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let mut e = newcomer();
                    service.try_add_employee(&mut e).await.unwrap()
                })
            })
            .collect();

        let mut applied = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                WriteOutcome::Applied => applied += 1,
                WriteOutcome::Duplicate => duplicates += 1,
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(duplicates, 15);
        let all: Vec<Employee> = service.get_employees().await.unwrap().try_collect().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_seed_once() {
        let service = Arc::new(ReferenceEmployeeService::new("NewCo"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.company().await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(service.company().await.unwrap().employee_ids.len(), 10);
    }
}
