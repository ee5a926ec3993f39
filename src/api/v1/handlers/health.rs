/*
 * Responsibility
 * - GET /health (liveness; still passes through every pipeline stage)
 */
use axum::Json;
use serde::Serialize;

pub const SERVICE_NAME: &str = "library-api";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
    })
}
