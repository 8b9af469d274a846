use axum::Json;

use crate::api::models::health::HealthResponse;

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    summary = "Liveness probe",
    description = "Returns `ok` whenever the process is serving. Does not touch the object store.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
