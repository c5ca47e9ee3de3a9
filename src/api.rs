// 🌐 REST API - maps HTTP routes onto RecordStore operations

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::task::JoinError;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::{StoreError, StoreResult};
use crate::store::{DemoLoadReport, RecordStore, StoreStats};
use crate::student::{Grades, NewStudent, RemovedStudent, Student};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
}

/// API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code.to_string()),
        }
    }
}

/// Everything a handler can fail with
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Body(JsonRejection),
    Task(JoinError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Task(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Store(StoreError::Storage(e)) => {
                error!("event=api_error status=error error={}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "internal storage error".to_string(),
                )
            }
            ApiError::Store(err) => {
                let status = if err.is_validation() {
                    StatusCode::BAD_REQUEST
                } else {
                    match &err {
                        StoreError::DuplicateIdentity(_) => StatusCode::CONFLICT,
                        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                        _ => StatusCode::INTERNAL_SERVER_ERROR,
                    }
                };
                (status, err.kind(), err.to_string())
            }
            ApiError::Body(rejection) => (rejection.status(), "INVALID_BODY", rejection.body_text()),
            ApiError::Task(e) => {
                error!("event=api_error status=error error={}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "request handler failed".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::error(code, message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Run a store operation on the blocking pool; SQLite calls may wait on the busy timeout
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&RecordStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || op(&store)).await?;
    Ok(result?)
}

/// Body of `POST /api/students`
#[derive(Debug, Deserialize)]
pub struct AddStudentRequest {
    pub identity: String,
    pub last_name: String,
    pub first_name: String,
    pub age: u32,
    pub track: String,
    #[serde(default)]
    pub math: Option<f64>,
    #[serde(default)]
    pub physics: Option<f64>,
    #[serde(default)]
    pub info: Option<f64>,
}

impl From<AddStudentRequest> for NewStudent {
    fn from(req: AddStudentRequest) -> Self {
        NewStudent {
            identity: req.identity,
            last_name: req.last_name,
            first_name: req.first_name,
            age: req.age,
            track: req.track,
            grades: Grades::new(req.math, req.physics, req.info),
        }
    }
}

/// Body of `PUT /api/students/:id/grades`
#[derive(Debug, Deserialize)]
pub struct GradesRequest {
    pub math: Option<f64>,
    pub physics: Option<f64>,
    pub info: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/students - All students by name
async fn list_students(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    let students = with_store(&state, |store| store.list_all()).await?;
    Ok(Json(ApiResponse::ok(students)))
}

/// POST /api/students - Register a student
async fn add_student(
    State(state): State<AppState>,
    payload: Result<Json<AddStudentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let new: NewStudent = req.into();
    let student = with_store(&state, move |store| store.add_student(&new)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(student))))
}

/// GET /api/students/:id - One student
async fn get_student(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> ApiResult<Student> {
    let lookup = identity.clone();
    let student = with_store(&state, move |store| store.find_student(&lookup))
        .await?
        .ok_or(StoreError::NotFound(identity))?;
    Ok(Json(ApiResponse::ok(student)))
}

/// PUT /api/students/:id/grades - Replace grades, recompute average
async fn update_grades(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    payload: Result<Json<GradesRequest>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(req) = payload?;
    let grades = Grades::new(req.math, req.physics, req.info);
    let student = with_store(&state, move |store| store.update_grades(&identity, grades)).await?;
    Ok(Json(ApiResponse::ok(student)))
}

/// DELETE /api/students/:id - Remove a student
async fn remove_student(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> ApiResult<RemovedStudent> {
    let removed = with_store(&state, move |store| store.remove_student(&identity)).await?;
    Ok(Json(ApiResponse::ok(removed)))
}

/// GET /api/admitted - Admitted students, best first
async fn list_admitted(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    let students = with_store(&state, |store| store.list_admitted()).await?;
    Ok(Json(ApiResponse::ok(students)))
}

/// GET /api/stats - Totals
async fn get_stats(State(state): State<AppState>) -> ApiResult<StoreStats> {
    let stats = with_store(&state, |store| store.stats()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// POST /api/reset - Drop and recreate the table
async fn reset(State(state): State<AppState>) -> ApiResult<MessageResponse> {
    with_store(&state, |store| store.reset()).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "database reset".to_string(),
    })))
}

/// POST /api/demo - Load the sample students
async fn load_demo(State(state): State<AppState>) -> ApiResult<DemoLoadReport> {
    let report = with_store(&state, |store| store.load_demo_data()).await?;
    Ok(Json(ApiResponse::ok(report)))
}

// ============================================================================
// Router
// ============================================================================

/// API routes only, nested under `/api` by `router`
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/students", get(list_students).post(add_student))
        .route("/students/:id", get(get_student).delete(remove_student))
        .route("/students/:id/grades", put(update_grades))
        .route("/admitted", get(list_admitted))
        .route("/stats", get(get_stats))
        .route("/reset", post(reset))
        .route("/demo", post(load_demo))
        .with_state(state)
}

/// Full application: API plus the static web page as fallback
pub fn router(store: Arc<RecordStore>, web_dir: &FsPath) -> Router {
    let state = AppState { store };

    Router::new()
        .nest("/api", api_routes(state))
        .fallback_service(ServeDir::new(web_dir))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<RecordStore>) {
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let app = router(Arc::clone(&store), FsPath::new("web"));
        (app, store)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn dupont() -> Value {
        json!({
            "identity": "12345678",
            "last_name": "Dupont",
            "first_name": "Jean",
            "age": 20,
            "track": "Informatique",
            "math": 15.0,
            "physics": 12.0,
            "info": 18.0
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (app, _) = app();

        let (status, body) = call(&app, Method::POST, "/api/students", Some(dupont())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["average"], 14.33);

        let (status, body) = call(&app, Method::GET, "/api/students", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = call(&app, Method::GET, "/api/students/12345678", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["last_name"], "Dupont");
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let (app, _) = app();
        call(&app, Method::POST, "/api/students", Some(dupont())).await;

        let (status, body) = call(&app, Method::POST, "/api/students", Some(dupont())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "DUPLICATE_IDENTITY");

        let mut short = dupont();
        short["identity"] = json!("1234567");
        let (status, body) = call(&app, Method::POST, "/api/students", Some(short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_FORMAT");

        let (status, body) = call(&app, Method::DELETE, "/api/students/99999999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = call(&app, Method::GET, "/api/students/99999999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_envelope() {
        let (app, store) = app();

        let mut missing = dupont();
        missing.as_object_mut().unwrap().remove("track");
        let (status, body) = call(&app, Method::POST, "/api/students", Some(missing)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_BODY");
        assert!(body["error"].as_str().unwrap().contains("track"));

        let mut negative_age = dupont();
        negative_age["age"] = json!(-3);
        let (status, body) = call(&app, Method::POST, "/api/students", Some(negative_age)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_BODY");

        let grades = json!({ "math": "high" });
        let (status, body) =
            call(&app, Method::PUT, "/api/students/12345678/grades", Some(grades)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_BODY");

        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_work_runs_on_blocking_pool() {
        let (_, store) = app();
        let state = AppState { store };

        let caller = std::thread::current().id();
        let worker = with_store(&state, |_| Ok(std::thread::current().id()))
            .await
            .unwrap();
        assert_ne!(worker, caller);

        match with_store(&state, |store| store.remove_student("99999999")).await {
            Err(ApiError::Store(StoreError::NotFound(id))) => assert_eq!(id, "99999999"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_grades_route() {
        let (app, store) = app();
        call(&app, Method::POST, "/api/students", Some(dupont())).await;

        let grades = json!({ "math": 21.0, "physics": 10.0, "info": 10.0 });
        let (status, body) =
            call(&app, Method::PUT, "/api/students/12345678/grades", Some(grades)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_GRADE");
        assert_eq!(store.find_student("12345678").unwrap().unwrap().average, Some(14.33));

        let grades = json!({ "math": 18.0, "physics": 14.0, "info": 16.0 });
        let (status, body) =
            call(&app, Method::PUT, "/api/students/12345678/grades", Some(grades)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["average"], 15.78);
    }

    #[tokio::test]
    async fn test_remove_route_returns_names() {
        let (app, store) = app();
        call(&app, Method::POST, "/api/students", Some(dupont())).await;

        let (status, body) = call(&app, Method::DELETE, "/api/students/12345678", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["last_name"], "Dupont");
        assert_eq!(body["data"]["first_name"], "Jean");
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_demo_stats_admitted_and_reset() {
        let (app, _) = app();

        let (status, body) = call(&app, Method::POST, "/api/demo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inserted"].as_array().unwrap().len(), 5);

        let (_, body) = call(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(body["data"], json!({ "total": 5, "admitted": 4 }));

        let (_, body) = call(&app, Method::GET, "/api/admitted", None).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["last_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Martin", "Dupont", "Moreau", "Dubois"]);

        let (status, _) = call(&app, Method::POST, "/api/reset", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(body["data"], json!({ "total": 0, "admitted": 0 }));
    }
}
