//! HTTP API over the snapshot queries.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::analysis::{
    details_by_unit_and_category, find_by_number, invalid_count_by_unit_and_category,
    summarize_by_unit,
};
use crate::error::{LoadError, QueryError};
use crate::models::{is_process_number, InvalidCount, ProcessRecord, TabelaDetails, TabelaSummary};
use crate::store::RecordStore;

/// Query failure turned into a JSON error response.
pub struct ApiError(QueryError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            QueryError::Load(LoadError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self(err)
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        Self(err.into())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub default_threshold_days: f64,
}

#[derive(Debug, Deserialize)]
struct ProcessoParams {
    numero: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DashboardParams {
    unidade: Option<String>,
    tipo_tabela: Option<String>,
    dias: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/processo", get(get_processo))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/dashboard/detalhes", get(get_details))
        .route("/api/dashboard/invalidos", get(get_invalid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn get_processo(
    State(state): State<AppState>,
    Query(params): Query<ProcessoParams>,
) -> Result<Json<ProcessRecord>, ApiError> {
    let numero = required(params.numero.as_deref(), "numero")?;
    if !is_process_number(numero) {
        debug!("Looking up non-standard process number {:?}", numero);
    }

    let records = state.store.records().await?;
    let record = find_by_number(&records, numero)?;
    Ok(Json(record.clone()))
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Vec<TabelaSummary>>, ApiError> {
    let unidade = required(params.unidade.as_deref(), "unidade")?;

    let records = state.store.records().await?;
    Ok(Json(summarize_by_unit(&records, unidade)))
}

async fn get_details(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<TabelaDetails>, ApiError> {
    let unidade = required(params.unidade.as_deref(), "unidade")?;
    let tipo_tabela = required(params.tipo_tabela.as_deref(), "tipo_tabela")?;
    let threshold = match params.dias.as_deref() {
        Some(raw) => parse_threshold(raw)?,
        None => state.default_threshold_days,
    };

    let records = state.store.records().await?;
    Ok(Json(details_by_unit_and_category(
        &records,
        tipo_tabela,
        unidade,
        threshold,
    )?))
}

async fn get_invalid(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<InvalidCount>, ApiError> {
    let unidade = required(params.unidade.as_deref(), "unidade")?;
    let tipo_tabela = required(params.tipo_tabela.as_deref(), "tipo_tabela")?;

    let records = state.store.records().await?;
    Ok(Json(invalid_count_by_unit_and_category(
        &records,
        tipo_tabela,
        unidade,
    )?))
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, QueryError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| QueryError::invalid_input(format!("parâmetro '{}' é obrigatório", name)))
}

fn parse_threshold(raw: &str) -> Result<f64, QueryError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            QueryError::invalid_input(format!("'dias' deve ser um número não negativo: {}", raw))
        })
}
