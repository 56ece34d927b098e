mod handlers;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::manager::AllocationManager;

pub use handlers::ErrorBody;

/// The store as shared by request handlers. One lock spans each request.
pub type SharedManager = Arc<Mutex<AllocationManager>>;

pub fn shared(manager: AllocationManager) -> SharedManager {
    Arc::new(Mutex::new(manager))
}

pub fn create_router(manager: SharedManager) -> Router {
    let api = Router::new()
        // Students
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::get_student).delete(handlers::delete_student),
        )
        .route("/students/{id}/modules", get(handlers::list_student_modules))
        // Staff
        .route(
            "/staff",
            get(handlers::list_staff).post(handlers::create_staff),
        )
        .route(
            "/staff/{id}",
            get(handlers::get_staff).delete(handlers::delete_staff),
        )
        // Modules
        .route(
            "/modules",
            get(handlers::list_modules).post(handlers::create_module),
        )
        .route("/modules/{code}", get(handlers::get_module))
        .route("/modules/{code}/staff", get(handlers::list_module_staff))
        .route(
            "/modules/{code}/students",
            get(handlers::list_module_students),
        )
        .route(
            "/modules/{code}/discontinue",
            post(handlers::discontinue_module),
        )
        .route(
            "/modules/{code}/staff/{staff_id}",
            put(handlers::assign_staff).delete(handlers::unassign_staff),
        )
        // Enrolments
        .route("/enrolments", post(handlers::enrol))
        .route(
            "/enrolments/{student_id}/{module_code}",
            delete(handlers::un_enrol),
        )
        // Overview
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(manager)
}
