use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::SharedManager;
use crate::error::{AllocationError, ErrorCategory};
use crate::ids::StaffId;
use crate::manager::{ModuleFilter, StoreStats};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<T, ApiError>;

/// Map an [`AllocationError`] to a status code and JSON body.
///
/// Rejections caused by the request are returned as-is. Internal failures are
/// logged in full but the client only sees a generic message.
fn api_error(e: AllocationError) -> ApiError {
    let status = match e.category() {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::IdentityState => match e {
            AllocationError::IdNotSet { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::CONFLICT,
        },
        ErrorCategory::Lookup => StatusCode::NOT_FOUND,
        ErrorCategory::Relationship => StatusCode::CONFLICT,
        ErrorCategory::Generation | ErrorCategory::Persistence => {
            tracing::error!("Internal error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal".to_string(),
                    message: "Internal server error".to_string(),
                }),
            );
        }
    };

    tracing::warn!("Rejected request ({}): {}", e.kind(), e);
    (
        status,
        Json(ErrorBody {
            error: e.kind().to_string(),
            message: e.to_string(),
        }),
    )
}

fn lock(manager: &SharedManager) -> std::sync::MutexGuard<'_, crate::manager::AllocationManager> {
    manager.lock().expect("allocation store lock poisoned")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn stats(State(manager): State<SharedManager>) -> Json<StoreStats> {
    Json(lock(&manager).stats())
}

// ============================================================
// Students
// ============================================================

pub async fn list_students(State(manager): State<SharedManager>) -> Json<Vec<Student>> {
    Json(lock(&manager).students())
}

pub async fn get_student(
    State(manager): State<SharedManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Student>> {
    lock(&manager).student(&id).map(Json).map_err(api_error)
}

pub async fn create_student(
    State(manager): State<SharedManager>,
    Json(input): Json<CreateStudentInput>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let mut manager = lock(&manager);
    let id = manager
        .add_student(input.forename, input.surname, input.stage)
        .map_err(api_error)?;
    manager
        .student(id.as_str())
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(api_error)
}

pub async fn delete_student(
    State(manager): State<SharedManager>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut manager = lock(&manager);
    let student = manager.student(&id).map_err(api_error)?;
    manager.remove_student(&student).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_student_modules(
    State(manager): State<SharedManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Module>>> {
    lock(&manager).modules_of(&id).map(Json).map_err(api_error)
}

// ============================================================
// Staff
// ============================================================

pub async fn list_staff(State(manager): State<SharedManager>) -> Json<Vec<Staff>> {
    Json(lock(&manager).staff())
}

pub async fn get_staff(
    State(manager): State<SharedManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Staff>> {
    lock(&manager).staff_member(&id).map(Json).map_err(api_error)
}

pub async fn create_staff(
    State(manager): State<SharedManager>,
    Json(input): Json<CreateStaffInput>,
) -> ApiResult<(StatusCode, Json<Staff>)> {
    let mut manager = lock(&manager);
    let id = manager
        .add_staff(input.forename, input.surname)
        .map_err(api_error)?;
    manager
        .staff_member(id.as_str())
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(api_error)
}

/// Remove a staff member. Responds with the modules left without staff.
pub async fn delete_staff(
    State(manager): State<SharedManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Module>>> {
    let mut manager = lock(&manager);
    let staff = manager.staff_member(&id).map_err(api_error)?;
    manager.remove_staff(&staff).map(Json).map_err(api_error)
}

// ============================================================
// Modules
// ============================================================

/// Query parameters for listing modules.
#[derive(Debug, Deserialize)]
pub struct ListModulesQuery {
    #[serde(default)]
    pub filter: ModuleFilter,
}

pub async fn list_modules(
    State(manager): State<SharedManager>,
    Query(query): Query<ListModulesQuery>,
) -> Json<Vec<Module>> {
    Json(lock(&manager).filtered_modules(query.filter))
}

pub async fn get_module(
    State(manager): State<SharedManager>,
    Path(code): Path<String>,
) -> ApiResult<Json<Module>> {
    lock(&manager).module(&code).map(Json).map_err(api_error)
}

pub async fn create_module(
    State(manager): State<SharedManager>,
    Json(input): Json<CreateModuleInput>,
) -> ApiResult<(StatusCode, Json<Module>)> {
    let mut manager = lock(&manager);
    let staff_ids = input
        .staff
        .iter()
        .map(|id| StaffId::parse(id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(api_error)?;
    let code = manager
        .add_module_taught_by(input.name, input.credits, input.stage, input.capacity, &staff_ids)
        .map_err(api_error)?;
    manager
        .module(code.as_str())
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(api_error)
}

pub async fn list_module_staff(
    State(manager): State<SharedManager>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<Staff>>> {
    lock(&manager).staff_of(&code).map(Json).map_err(api_error)
}

pub async fn list_module_students(
    State(manager): State<SharedManager>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<Student>>> {
    lock(&manager).students_of(&code).map(Json).map_err(api_error)
}

pub async fn discontinue_module(
    State(manager): State<SharedManager>,
    Path(code): Path<String>,
) -> ApiResult<Json<Module>> {
    let mut manager = lock(&manager);
    manager.discontinue(&code).map_err(api_error)?;
    manager.module(&code).map(Json).map_err(api_error)
}

pub async fn assign_staff(
    State(manager): State<SharedManager>,
    Path((code, staff_id)): Path<(String, String)>,
) -> ApiResult<Json<Module>> {
    let mut manager = lock(&manager);
    manager.assign_staff(&code, &staff_id).map_err(api_error)?;
    manager.module(&code).map(Json).map_err(api_error)
}

pub async fn unassign_staff(
    State(manager): State<SharedManager>,
    Path((code, staff_id)): Path<(String, String)>,
) -> ApiResult<Json<Module>> {
    let mut manager = lock(&manager);
    manager.unassign_staff(&code, &staff_id).map_err(api_error)?;
    manager.module(&code).map(Json).map_err(api_error)
}

// ============================================================
// Enrolments
// ============================================================

/// Enrol a student. Responds with the student's updated record.
pub async fn enrol(
    State(manager): State<SharedManager>,
    Json(input): Json<EnrolInput>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let mut manager = lock(&manager);
    manager
        .enrol(&input.student_id, &input.module_code)
        .map_err(api_error)?;
    manager
        .student(&input.student_id)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(api_error)
}

pub async fn un_enrol(
    State(manager): State<SharedManager>,
    Path((student_id, module_code)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = lock(&manager)
        .un_enrol(&student_id, &module_code)
        .map_err(api_error)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}
