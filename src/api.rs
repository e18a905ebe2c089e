// 🌐 JSON API - read-only report endpoints over the results store
//
// Every handler loads what it needs under the connection lock, releases it,
// then runs the pure report functions.

use crate::config::ReportSettings;
use crate::db::{self, StoredResult};
use crate::disciplines::DisciplineNormalizer;
use crate::entities::region::CompetitionKey;
use crate::entities::shooter::Sid;
use crate::mcsi::McsiEngine;
use crate::reports;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    engine: Arc<McsiEngine>,
    settings: Arc<ReportSettings>,
}

impl AppState {
    pub fn new(conn: Connection, engine: McsiEngine, settings: ReportSettings) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            engine: Arc::new(engine),
            settings: Arc::new(settings),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }

    fn normalizer(&self) -> &DisciplineNormalizer {
        self.engine.normalizer()
    }

    fn stored_results(&self) -> Result<Vec<StoredResult>, ApiError> {
        let conn = self.conn()?;
        Ok(db::load_stored_results(&conn)?)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: &str) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    fn not_found(message: String) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("request failed: {:#}", e);
        ApiError::internal("internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DisciplineQuery {
    discipline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    min_sample: Option<usize>,
    top_k: Option<usize>,
}

/// GET /api/health
async fn health_check() -> ApiResult<&'static str> {
    ok("OK")
}

/// GET /api/competitions
async fn competitions(State(state): State<AppState>) -> ApiResult<Vec<db::CompetitionSummary>> {
    let conn = state.conn()?;
    ok(db::list_competitions(&conn)?)
}

/// GET /api/report/top-shooters?discipline=
async fn top_shooters(
    State(state): State<AppState>,
    Query(query): Query<DisciplineQuery>,
) -> ApiResult<Vec<crate::ranking::DisciplineLeaderboard>> {
    let results = state.stored_results()?;
    ok(reports::top_shooters(
        &results,
        state.normalizer(),
        query.discipline.as_deref(),
        &state.settings,
    ))
}

/// GET /api/report/discipline-stats
async fn discipline_stats(
    State(state): State<AppState>,
) -> ApiResult<Vec<reports::DisciplineParticipation>> {
    let results = state.stored_results()?;
    ok(reports::discipline_stats(&results))
}

/// GET /api/report/shot-distribution?discipline=
async fn shot_distribution(
    State(state): State<AppState>,
    Query(query): Query<DisciplineQuery>,
) -> ApiResult<reports::ShotDistribution> {
    let discipline = query
        .discipline
        .as_deref()
        .map(|d| state.normalizer().normalize(d).to_string());
    let values = {
        let conn = state.conn()?;
        db::load_shot_values(&conn, discipline.as_deref())?
    };
    ok(reports::shot_distribution(values.into_iter().map(|(_, v)| v)))
}

/// GET /api/report/mcsi-leaderboard?min_sample=&top_k=
async fn mcsi_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Vec<crate::ranking::Ranked<crate::ranking::GroupStats<Sid>>>> {
    let results = state.stored_results()?;
    ok(reports::mcsi_report(
        &results,
        &state.engine,
        query.min_sample.unwrap_or(state.settings.min_sample),
        query.top_k.unwrap_or(state.settings.top_k),
    ))
}

/// GET /api/report/event/:region/:year
async fn event(
    State(state): State<AppState>,
    Path((region, year)): Path<(String, i32)>,
) -> ApiResult<crate::ranking::EventRanking> {
    let results = state.stored_results()?;
    let key = CompetitionKey::new(&region, year);
    ok(reports::event_report(&results, &state.engine, &key))
}

/// GET /api/shooter/:sid
async fn shooter(
    State(state): State<AppState>,
    Path(sid): Path<Sid>,
) -> ApiResult<reports::ShooterProfile> {
    let (entry, results, shots) = {
        let conn = state.conn()?;
        let entry = db::load_shooter(&conn, sid)?
            .ok_or_else(|| ApiError::not_found(format!("shooter {} not found", sid)))?;
        (
            entry,
            db::load_stored_results(&conn)?,
            db::load_shots_for_shooter(&conn, sid)?,
        )
    };
    ok(reports::shooter_profile(entry, &results, &shots))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/competitions", get(competitions))
        .route("/report/top-shooters", get(top_shooters))
        .route("/report/discipline-stats", get(discipline_stats))
        .route("/report/shot-distribution", get(shot_distribution))
        .route("/report/mcsi-leaderboard", get(mcsi_leaderboard))
        .route("/report/event/:region/:year", get(event))
        .route("/shooter/:sid", get(shooter))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
