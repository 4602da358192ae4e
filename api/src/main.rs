// ./api/src/main.rs
mod config;

use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::get,
};
use futures::TryStreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{ApplicationError, EmployeeSearch, EmployeeService, EmployeeStream, WriteOutcome};
use domain::{Employee, EmployeeId};
use infrastructure::select_employee_service;

use crate::config::Settings;

#[derive(Clone)]
struct AppState {
    employees: Arc<dyn EmployeeService>,
}

#[derive(Error, Debug)]
enum StartupError {
    #[error("Employee store could not be opened: {0}")]
    Store(#[from] ApplicationError),
    #[error("Failed to bind to address {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    if let Err(e) = run(Settings::from_env()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), StartupError> {
    // The backend is chosen once; every handler shares it.
    let employees = select_employee_service(
        settings.store_kind,
        &settings.company_name,
        settings.connection.as_deref(),
    )?;
    let app = router(AppState { employees });
    info!("API routes configured.");

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Server starting on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(StartupError::Serve)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/company", get(get_company_handler))
        .route(
            "/employees",
            get(list_employees_handler).post(create_employee_handler),
        )
        .route("/employees/search", get(search_employees_handler))
        .route(
            "/employees/:id",
            get(get_employee_handler)
                .put(update_employee_handler)
                .delete(delete_employee_handler),
        )
        .route(
            "/employees/:id/reports",
            get(list_reports_handler).post(add_reports_handler),
        )
        .with_state(state)
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

async fn get_company_handler(State(state): State<AppState>) -> Response {
    info!("Received request to get company");
    match state.employees.company().await {
        Ok(company) => (StatusCode::OK, JsonResponse(company)).into_response(),
        Err(e) => {
            error!("Failed to get company via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Employee Handlers ---

/// GET /employees
async fn list_employees_handler(State(state): State<AppState>) -> Response {
    info!("Received request to list employees");
    collect_employees(state.employees.get_employees().await).await
}

/// GET /employees/search?firstName=..&middleName=..&lastName=..
async fn search_employees_handler(
    State(state): State<AppState>,
    Query(criteria): Query<EmployeeSearch>,
) -> Response {
    info!(?criteria, "Received request to search employees");
    collect_employees(state.employees.search_employees(&criteria).await).await
}

/// GET /employees/:id
async fn get_employee_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(employee_id = %id, "Received request to get employee");
    match find_employee(&state, &id).await {
        Ok(employee) => (StatusCode::OK, JsonResponse(employee)).into_response(),
        Err(response) => response,
    }
}

/// POST /employees. Responds with the stored record, id included.
async fn create_employee_handler(
    State(state): State<AppState>,
    Json(mut employee): Json<Employee>,
) -> Response {
    info!(last_name = %employee.last_name, "Received request to create employee");
    match state.employees.try_add_employee(&mut employee).await {
        Ok(WriteOutcome::Applied) => (StatusCode::CREATED, JsonResponse(employee)).into_response(),
        Ok(outcome) => map_write_outcome_to_response(outcome),
        Err(e) => {
            error!("Failed to create employee via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// PUT /employees/:id. The path id wins over any id in the body.
async fn update_employee_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut employee): Json<Employee>,
) -> Response {
    info!(employee_id = %id, "Received request to update employee");
    employee.id = Some(EmployeeId::from(id.clone()));
    match state.employees.try_update_employee(&employee).await {
        Ok(WriteOutcome::Applied) => match find_employee(&state, &id).await {
            Ok(stored) => (StatusCode::OK, JsonResponse(stored)).into_response(),
            Err(response) => response,
        },
        Ok(outcome) => map_write_outcome_to_response(outcome),
        Err(e) => {
            error!(employee_id = %id, "Failed to update employee via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// DELETE /employees/:id
async fn delete_employee_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    info!(employee_id = %id, "Received request to delete employee");
    let employee = match find_employee(&state, &id).await {
        Ok(employee) => employee,
        Err(response) => return response,
    };
    match state.employees.try_remove_employee(&employee).await {
        Ok(WriteOutcome::Applied) => {
            info!(employee_id = %id, "Employee deleted successfully via handler");
            (StatusCode::NO_CONTENT, "").into_response()
        }
        Ok(outcome) => map_write_outcome_to_response(outcome),
        Err(e) => {
            error!(employee_id = %id, "Failed to delete employee via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Report Handlers ---

/// GET /employees/:id/reports
async fn list_reports_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(employee_id = %id, "Received request to list reports");
    let manager = match find_employee(&state, &id).await {
        Ok(manager) => manager,
        Err(response) => return response,
    };
    collect_employees(state.employees.get_employee_reports(&manager).await).await
}

/// POST /employees/:id/reports with a JSON array of report ids.
async fn add_reports_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(report_ids): Json<Vec<String>>,
) -> Response {
    info!(employee_id = %id, batch_size = report_ids.len(), "Received request to add reports");
    let mut manager = match find_employee(&state, &id).await {
        Ok(manager) => manager,
        Err(response) => return response,
    };
    let mut reports = Vec::with_capacity(report_ids.len());
    for report_id in &report_ids {
        match find_employee(&state, report_id).await {
            Ok(report) => reports.push(report),
            Err(response) => return response,
        }
    }
    match state.employees.try_add_reports(&mut manager, &reports).await {
        Ok(WriteOutcome::Applied) => (StatusCode::OK, JsonResponse(manager)).into_response(),
        Ok(outcome) => map_write_outcome_to_response(outcome),
        Err(e) => {
            error!(employee_id = %id, "Failed to add reports via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Helpers ---

/// Looks an employee up by id, turning a miss into a 404 response.
async fn find_employee(state: &AppState, id: &str) -> Result<Employee, Response> {
    match state.employees.get_employee_by_id(id).await {
        Ok(Some(employee)) => Ok(employee),
        Ok(None) => Err(map_write_outcome_to_response(WriteOutcome::NotFound)),
        Err(e) => {
            error!(employee_id = %id, "Failed to get employee via handler: {}", e);
            Err(map_application_error_to_response(e))
        }
    }
}

/// Drains a result sequence into a JSON array.
async fn collect_employees(result: Result<EmployeeStream, ApplicationError>) -> Response {
    let collected = match result {
        Ok(stream) => stream.try_collect::<Vec<Employee>>().await,
        Err(e) => Err(e),
    };
    match collected {
        Ok(employees) => (StatusCode::OK, JsonResponse(employees)).into_response(),
        Err(e) => {
            error!("Failed to read employees via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps a rejected write to its HTTP status.
fn map_write_outcome_to_response(outcome: WriteOutcome) -> Response {
    let (status, body) = match outcome {
        WriteOutcome::Applied => (StatusCode::OK, String::new()),
        WriteOutcome::NotFound => (StatusCode::NOT_FOUND, "Employee not found".to_string()),
        WriteOutcome::Duplicate => (
            StatusCode::CONFLICT,
            "Employee already exists".to_string(),
        ),
        WriteOutcome::InvalidArgument(reason) => {
            warn!("Request rejected: {}", reason);
            (StatusCode::BAD_REQUEST, reason)
        }
    };
    (status, body).into_response()
}

/// Maps ApplicationError to HTTP status codes and response body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::BackendUnavailable(msg) => {
            error!("Employee store unavailable: {}", msg);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Employee store is unavailable".to_string(),
            )
        }
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            (StatusCode::BAD_REQUEST, domain_err.to_string())
        }
        ApplicationError::Serialization(e) => {
            error!("Stored record could not be decoded: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
        ApplicationError::InfrastructureError(msg) => {
            error!("Underlying infrastructure error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
    };
    (status, body).into_response()
}
