//! Readiness probe for process supervisors. The only dependency worth
//! probing is the database; the dispatcher itself is stateless.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use urbanbot_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Debug, Serialize)]
pub struct Probe {
    pub ok: bool,
    pub detail: String,
    pub latency_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub database: Probe,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let database = probe_database(&state.db_pool).await;

    let report = HealthReport {
        status: if database.ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let code = if report.database.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(report))
}

async fn probe_database(pool: &DbPool) -> Probe {
    let started = Instant::now();
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => Probe {
            ok: true,
            detail: "database reachable".to_string(),
            latency_ms: started.elapsed().as_millis(),
        },
        Err(error) => Probe {
            ok: false,
            detail: format!("database probe failed: {error}"),
            latency_ms: started.elapsed().as_millis(),
        },
    }
}
