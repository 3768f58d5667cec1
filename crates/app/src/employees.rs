use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use employee_directory_core::{
    CreateEmployeeRequest, Employee, UpdateEmployeeRequest, UpdatedEmployee, ValidationError,
};
use employee_directory_storage::EmployeeError;

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Employee id taken from the `:id` path segment.
///
/// Segments that are not a valid `i64` are rejected with the JSON error body.
#[derive(Debug, Clone, Copy)]
pub struct EmployeeId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for EmployeeId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InvalidId)?;
        Ok(Self(id))
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedMessage {
    message: &'static str,
}

/// Failures surfaced by the employee endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Invalid employee id")]
    InvalidId,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Employee not found")]
    NotFound,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Internal server error")]
    Storage(#[source] EmployeeError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody | Self::InvalidId | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            Self::InvalidBody | Self::InvalidId | Self::Validation(_) => "invalid",
            Self::NotFound => "not_found",
            Self::DuplicateEmail => "conflict",
            Self::Storage(_) => "error",
        }
    }
}

impl From<EmployeeError> for ApiError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(err) = &self {
            error!(stage = "api", error = %err, "employee storage operation failed");
        }
        ProblemResponse::new(self.status(), self.to_string()).into_response()
    }
}

/// `GET /employees`, optionally filtered by an exact `department` match.
///
/// Only the first `department` value counts when the key is repeated.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let repo = state.storage().employees();
    let department = params
        .iter()
        .find(|(key, _)| key == "department")
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty());
    let result = match department {
        Some(department) => repo.list_by_department(department).await,
        None => repo.list_all().await,
    }
    .map_err(ApiError::from);

    observe("list", &result);
    result.map(Json)
}

/// `POST /employees`.
pub async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let result = create_employee(&state, &body).await;
    observe("create", &result);
    result.map(|employee| (StatusCode::CREATED, Json(employee)))
}

async fn create_employee(state: &AppState, body: &[u8]) -> Result<Employee, ApiError> {
    let request: CreateEmployeeRequest = parse_object(body)?;
    let new_employee = request.validate(state.now())?;

    let employee = state
        .storage()
        .employees()
        .insert(&new_employee)
        .await
        .map_err(|err| {
            if matches!(err, EmployeeError::DuplicateEmail) {
                info!(stage = "api", "rejected duplicate employee email");
            }
            ApiError::from(err)
        })?;

    info!(stage = "api", employee_id = employee.id, "employee created");
    Ok(employee)
}

/// `GET /employees/:id`.
pub async fn get(
    State(state): State<AppState>,
    EmployeeId(id): EmployeeId,
) -> Result<Json<Employee>, ApiError> {
    let result = state
        .storage()
        .employees()
        .get_by_id(id)
        .await
        .map_err(ApiError::from)
        .and_then(|employee| employee.ok_or(ApiError::NotFound));

    observe("get", &result);
    result.map(Json)
}

/// `PATCH /employees/:id`. Only `name` and `salary` are applied.
pub async fn update(
    State(state): State<AppState>,
    EmployeeId(id): EmployeeId,
    body: Bytes,
) -> Result<Json<UpdatedEmployee>, ApiError> {
    let result = update_employee(&state, id, &body).await;
    observe("update", &result);
    result.map(Json)
}

async fn update_employee(
    state: &AppState,
    id: i64,
    body: &[u8],
) -> Result<UpdatedEmployee, ApiError> {
    let repo = state.storage().employees();
    repo.get_by_id(id).await?.ok_or(ApiError::NotFound)?;

    let request: UpdateEmployeeRequest = parse_object(body)?;
    let changes = request.into_changes()?;

    let employee = repo
        .update_fields(id, &changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(stage = "api", employee_id = id, "employee updated");
    Ok(UpdatedEmployee::from(employee))
}

/// `DELETE /employees/:id`.
pub async fn delete(
    State(state): State<AppState>,
    EmployeeId(id): EmployeeId,
) -> Result<Json<DeletedMessage>, ApiError> {
    let result = match state.storage().employees().delete_by_id(id).await {
        Ok(true) => Ok(DeletedMessage {
            message: "Employee deleted",
        }),
        Ok(false) => Err(ApiError::NotFound),
        Err(err) => Err(ApiError::from(err)),
    };

    if result.is_ok() {
        info!(stage = "api", employee_id = id, "employee deleted");
    }
    observe("delete", &result);
    result.map(Json)
}

/// Parses a request body that must be a JSON object.
fn parse_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidBody)?;
    if !value.is_object() {
        return Err(ApiError::InvalidBody);
    }
    serde_json::from_value(value).map_err(|_| ApiError::InvalidBody)
}

fn observe<T>(operation: &'static str, result: &Result<T, ApiError>) {
    let label = match result {
        Ok(_) => "ok",
        Err(err) => err.metric_label(),
    };
    counter!("employee_requests_total", "operation" => operation, "result" => label).increment(1);
}
