use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use uptime_engine::orchestrator::BatchSummary;

use crate::state::AppState;

#[derive(Serialize)]
struct RunResponse {
    message: &'static str,
    #[serde(flatten)]
    summary: BatchSummary,
    timestamp: DateTime<Utc>,
}

fn failure(error: impl std::fmt::Display) -> serde_json::Value {
    json!({ "success": false, "error": error.to_string(), "timestamp": Utc::now() })
}

fn parse_id(raw: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| HttpResponse::BadRequest().json(json!({ "error": "Invalid monitor id" })))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Monitor not found" }))
}

/// Run one batch over every due monitor
#[post("/checks/run")]
pub async fn run_checks_route(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    if !state.authorized(&req) {
        warn!("Rejected batch trigger with missing or wrong bearer token");
        return HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }));
    }

    let Ok(_running) = state.batch_lock.try_lock() else {
        return HttpResponse::Conflict().json(failure("A batch is already running"));
    };

    match state.engine.run_batch().await {
        Ok(summary) => HttpResponse::Ok().json(RunResponse {
            message: "Monitor checks completed",
            summary,
            timestamp: Utc::now(),
        }),
        Err(e) => {
            error!(error = %e, "Error in scheduled monitor check");
            HttpResponse::InternalServerError().json(failure(format!("{e:#}")))
        }
    }
}

/// Check one monitor right away
#[post("/monitors/{id}/check")]
pub async fn check_monitor_route(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.engine.check_now(id).await {
        Ok(Some(outcome)) => HttpResponse::Ok().json(outcome),
        Ok(None) => not_found(),
        Err(e) => {
            error!(monitor = %id, error = %e, "Manual check failed");
            HttpResponse::InternalServerError().json(failure(format!("{e:#}")))
        }
    }
}

/// Rolling uptime figures for one monitor
#[get("/monitors/{id}/stats")]
pub async fn monitor_stats_route(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.engine.stats(id).await {
        Ok(Some(stats)) => HttpResponse::Ok().json(stats),
        Ok(None) => not_found(),
        Err(e) => {
            error!(monitor = %id, error = %e, "Failed to compute stats");
            HttpResponse::InternalServerError().json(failure(format!("{e:#}")))
        }
    }
}
