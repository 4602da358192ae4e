// ./infrastructure/src/employee/document_service.rs
use application::hierarchy::{
    added_report_ids, collect_reports, report_ids_to_resolve, validate_new_reports,
};
use application::{
    ApplicationError, DocumentQuery, DocumentStore, DocumentStream, EmployeeSearch,
    EmployeeService, EmployeeStream, SeedTarget, StoreError, WriteOutcome, default_roster,
    employee_stream, listing_query, load_seed,
};
use async_trait::async_trait;
use domain::{Company, Employee, EmployeeId};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const EMPLOYEE_CONTAINER: &str = "EmployeeContainer";
pub const COMPANY_CONTAINER: &str = "CompanyContainer";
const EMPLOYEE_PARTITION_KEY: &str = "/partition";
const COMPANY_PARTITION_KEY: &str = "/name";

/// Employee contract backed by a partitioned document database.
///
/// Employees live in `EmployeeContainer` under the company name as partition.
/// The company record (and its roster) lives in `CompanyContainer`.
///
/// Serialization of concurrent writers is left to the store: duplicate adds
/// are settled by its conditional create, while roster maintenance is a plain
/// read-modify-write of the company document and can lose an update when two
/// adds or removes interleave. Add and remove each issue two writes (record,
/// then roster); a call dropped between them leaves the roster stale. Remove
/// then rewrites every manager listing the removed id. A stale report id left
/// behind is dropped on read and tolerated by update.
pub struct DocumentEmployeeService {
    store: Arc<dyn DocumentStore>,
    company_name: String,
    seed: Vec<Employee>,
    // Set once the containers exist, the company is known, and seeding ran.
    company_id: OnceCell<String>,
}

impl DocumentEmployeeService {
    pub fn new(store: Arc<dyn DocumentStore>, company_name: impl Into<String>) -> Self {
        Self {
            store,
            company_name: company_name.into(),
            seed: default_roster(),
            company_id: OnceCell::new(),
        }
    }

    /// Replaces the roster written on first use of an empty partition.
    pub fn with_seed(mut self, roster: Vec<Employee>) -> Self {
        self.seed = roster;
        self
    }

    async fn init_if_necessary(&self) -> Result<&str, ApplicationError> {
        self.company_id
            .get_or_try_init(|| self.initialize())
            .await
            .map(String::as_str)
    }

    #[instrument(skip(self), fields(company = %self.company_name))]
    async fn initialize(&self) -> Result<String, ApplicationError> {
        self.store
            .ensure_container(EMPLOYEE_CONTAINER, EMPLOYEE_PARTITION_KEY)
            .await?;
        self.store
            .ensure_container(COMPANY_CONTAINER, COMPANY_PARTITION_KEY)
            .await?;
        let company_id = self.fetch_or_create_company().await?;

        let first_page = listing_query(&self.company_name).limit(1);
        let existing: Vec<_> = self
            .store
            .query(EMPLOYEE_CONTAINER, &first_page)
            .await?
            .try_collect()
            .await?;
        if existing.is_empty() {
            info!("Seeding empty employee partition");
            let seeder = Seeder {
                service: self,
                company_id: &company_id,
            };
            load_seed(&seeder, &self.seed).await?;
        }
        info!(company_id = %company_id, "Document employee store initialized");
        Ok(company_id)
    }

    async fn fetch_or_create_company(&self) -> Result<String, ApplicationError> {
        let query = DocumentQuery::new()
            .in_partition(self.company_name.as_str())
            .filter_eq("name", self.company_name.as_str())
            .limit(1);
        let found: Vec<_> = self
            .store
            .query(COMPANY_CONTAINER, &query)
            .await?
            .try_collect()
            .await?;
        if let Some(document) = found.into_iter().next() {
            let company: Company = serde_json::from_value(document)?;
            debug!(company_id = %company.id, "Found existing company");
            return Ok(company.id);
        }

        let company = Company::new(Uuid::new_v4().to_string(), self.company_name.clone());
        let document = serde_json::to_value(&company)?;
        self.store
            .create_if_absent(COMPANY_CONTAINER, &document, &self.company_name)
            .await?;
        info!(company_id = %company.id, "Created company record");
        Ok(company.id)
    }

    async fn read_company(&self, company_id: &str) -> Result<Company, ApplicationError> {
        let document = self
            .store
            .read_by_key(COMPANY_CONTAINER, company_id, &self.company_name)
            .await?;
        Ok(serde_json::from_value(document)?)
    }

    /// Applies `change` to the company roster and writes it back if it changed.
    async fn update_roster(
        &self,
        company_id: &str,
        change: impl FnOnce(&mut Company) -> bool,
    ) -> Result<(), ApplicationError> {
        let mut company = self.read_company(company_id).await?;
        if change(&mut company) {
            let document = serde_json::to_value(&company)?;
            self.store
                .replace(COMPANY_CONTAINER, &document, company_id, &self.company_name)
                .await?;
        }
        Ok(())
    }

    async fn read_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, ApplicationError> {
        match self
            .store
            .read_by_key(EMPLOYEE_CONTAINER, id.as_str(), &self.company_name)
            .await
        {
            Ok(document) => Ok(Some(serde_json::from_value(document)?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => {
                error!(employee_id = %id, "Failed to read employee: {}", e);
                Err(e.into())
            }
        }
    }

    async fn first_missing<'a, I>(&self, ids: I) -> Result<Option<&'a EmployeeId>, ApplicationError>
    where
        I: IntoIterator<Item = &'a EmployeeId> + Send,
        I::IntoIter: Send,
    {
        for id in ids {
            if self.read_employee(id).await?.is_none() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn add_record(
        &self,
        company_id: &str,
        employee: &mut Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
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
        if let Some(missing) = self.first_missing(&candidate.report_ids).await? {
            warn!(employee_id = %id, report_id = %missing, "Add rejected: unknown report");
            return Ok(WriteOutcome::invalid(format!("report '{}' does not exist", missing)));
        }

        let document = serde_json::to_value(&candidate)?;
        match self
            .store
            .create_if_absent(EMPLOYEE_CONTAINER, &document, &self.company_name)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                warn!(employee_id = %id, "Add rejected: duplicate identity");
                return Ok(WriteOutcome::Duplicate);
            }
            Err(e) => {
                error!(employee_id = %id, "Failed to create employee: {}", e);
                return Err(e.into());
            }
        }
        self.update_roster(company_id, |company| company.enroll(&id))
            .await?;

        info!(employee_id = %id, "Employee added");
        *employee = candidate;
        Ok(WriteOutcome::Applied)
    }

    /// Drops `removed` from the report list of every manager in the partition.
    /// Returns how many managers were rewritten.
    async fn detach_from_managers(&self, removed: &EmployeeId) -> Result<usize, ApplicationError> {
        let query = DocumentQuery::new()
            .in_partition(self.company_name.as_str())
            .filter_eq("isManager", true);
        let managers: Vec<Employee> = employees_from(
            self.store.query(EMPLOYEE_CONTAINER, &query).await?,
        )
        .try_collect()
        .await?;

        let mut detached = 0;
        for mut manager in managers {
            if !manager.detach_report(removed) {
                continue;
            }
            let Some(manager_id) = manager.id.clone() else {
                continue;
            };
            let document = serde_json::to_value(&manager)?;
            match self
                .store
                .replace(EMPLOYEE_CONTAINER, &document, manager_id.as_str(), &self.company_name)
                .await
            {
                Ok(()) => detached += 1,
                Err(StoreError::NotFound(_)) => {
                    debug!(manager_id = %manager_id, "Manager removed concurrently");
                }
                Err(e) => {
                    error!(manager_id = %manager_id, "Failed to detach report: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(detached)
    }
}

fn employees_from(documents: DocumentStream) -> EmployeeStream {
    documents
        .map(|document| -> Result<Employee, ApplicationError> {
            let document = document?;
            Ok(serde_json::from_value::<Employee>(document)?)
        })
        .boxed()
}

/// Write path used during initialization, before the company id is published.
struct Seeder<'a> {
    service: &'a DocumentEmployeeService,
    company_id: &'a str,
}

#[async_trait]
impl SeedTarget for Seeder<'_> {
    async fn seed_one(&self, mut employee: Employee) -> Result<WriteOutcome, ApplicationError> {
        self.service.add_record(self.company_id, &mut employee).await
    }
}

#[async_trait]
impl EmployeeService for DocumentEmployeeService {
    #[instrument(skip(self, employee), fields(last_name = %employee.last_name))]
    async fn try_add_employee(
        &self,
        employee: &mut Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        let company_id = self.init_if_necessary().await?;
        self.add_record(company_id, employee).await
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
        let Some(stored) = self.read_employee(id).await? else {
            warn!(employee_id = %id, "Update rejected: not found");
            return Ok(WriteOutcome::NotFound);
        };
        let mut updated = stored.clone();
        updated.apply_changes(employee);
        if let Err(e) = updated.validate_reports() {
            warn!(employee_id = %id, "Update rejected: {}", e);
            return Ok(e.into());
        }
        let added = added_report_ids(&stored, &updated);
        if let Some(missing) = self.first_missing(added).await? {
            warn!(employee_id = %id, report_id = %missing, "Update rejected: unknown report");
            return Ok(WriteOutcome::invalid(format!("report '{}' does not exist", missing)));
        }

        let document = serde_json::to_value(&updated)?;
        match self
            .store
            .replace(EMPLOYEE_CONTAINER, &document, id.as_str(), &self.company_name)
            .await
        {
            Ok(()) => {
                info!(employee_id = %id, "Employee updated");
                Ok(WriteOutcome::Applied)
            }
            Err(StoreError::NotFound(_)) => {
                warn!(employee_id = %id, "Update rejected: removed concurrently");
                Ok(WriteOutcome::NotFound)
            }
            Err(e) => {
                error!(employee_id = %id, "Failed to replace employee: {}", e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, employee), fields(employee_id = ?employee.id))]
    async fn try_remove_employee(
        &self,
        employee: &Employee,
    ) -> Result<WriteOutcome, ApplicationError> {
        let company_id = self.init_if_necessary().await?;
        let Some(id) = employee.id.as_ref() else {
            warn!("Remove rejected: employee has no id");
            return Ok(WriteOutcome::invalid("employee has no id"));
        };
        if !employee.belongs_to(&self.company_name) {
            warn!(employee_id = %id, partition = ?employee.partition, "Remove rejected: foreign partition");
            return Ok(WriteOutcome::NotFound);
        }
        match self
            .store
            .delete_by_key(EMPLOYEE_CONTAINER, id.as_str(), &self.company_name)
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                warn!(employee_id = %id, "Remove rejected: not found");
                return Ok(WriteOutcome::NotFound);
            }
            Err(e) => {
                error!(employee_id = %id, "Failed to delete employee: {}", e);
                return Err(e.into());
            }
        }
        self.update_roster(company_id, |company| company.withdraw(id))
            .await?;
        let detached = self.detach_from_managers(id).await?;
        info!(employee_id = %id, managers_updated = detached, "Employee removed");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn get_employees(&self) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        let documents = self
            .store
            .query(EMPLOYEE_CONTAINER, &listing_query(&self.company_name))
            .await?;
        Ok(employees_from(documents))
    }

    #[instrument(skip(self))]
    async fn get_employee_by_id(&self, id: &str) -> Result<Option<Employee>, ApplicationError> {
        self.init_if_necessary().await?;
        self.read_employee(&EmployeeId::from(id)).await
    }

    #[instrument(skip(self, employee), fields(employee_id = ?employee.id))]
    async fn get_employee_reports(
        &self,
        employee: &Employee,
    ) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        let mut resolved = Vec::new();
        for id in report_ids_to_resolve(employee) {
            match self.read_employee(id).await? {
                Some(report) => resolved.push(report),
                None => debug!(report_id = %id, "Dropping unresolved report"),
            }
        }
        Ok(employee_stream(collect_reports(resolved)))
    }

    #[instrument(skip(self))]
    async fn search_employees(
        &self,
        criteria: &EmployeeSearch,
    ) -> Result<EmployeeStream, ApplicationError> {
        self.init_if_necessary().await?;
        let Some(query) = criteria.to_document_query(&self.company_name) else {
            debug!("Search without criteria yields nothing");
            return Ok(employee_stream(Vec::new()));
        };
        let documents = self.store.query(EMPLOYEE_CONTAINER, &query).await?;
        Ok(employees_from(documents))
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
        let Some(mut stored) = self.read_employee(&manager_id).await? else {
            warn!(manager_id = %manager_id, "Add reports rejected: manager not found");
            return Ok(WriteOutcome::NotFound);
        };
        let new_ids = match validate_new_reports(&stored, reports) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(manager_id = %manager_id, "Add reports rejected: {}", e);
                return Ok(e.into());
            }
        };
        if let Some(missing) = self.first_missing(&new_ids).await? {
            warn!(manager_id = %manager_id, report_id = %missing, "Add reports rejected: report not found");
            return Ok(WriteOutcome::NotFound);
        }

        stored.report_ids.extend(new_ids);
        let document = serde_json::to_value(&stored)?;
        match self
            .store
            .replace(EMPLOYEE_CONTAINER, &document, manager_id.as_str(), &self.company_name)
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => return Ok(WriteOutcome::NotFound),
            Err(e) => {
                error!(manager_id = %manager_id, "Failed to store reports: {}", e);
                return Err(e.into());
            }
        }
        manager.report_ids = stored.report_ids;
        info!(manager_id = %manager_id, total = manager.report_ids.len(), "Reports added");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn company(&self) -> Result<Company, ApplicationError> {
        let company_id = self.init_if_necessary().await?;
        self.read_company(company_id).await
    }
}
