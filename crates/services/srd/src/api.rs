use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sr_runner::{RunManager, RunResult};
use sr_store::{ScriptRecord, ScriptStore, SearchHit};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::prelude::*;

fn v1(path: &str) -> String {
    format!("/v1/{path}")
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<ScriptStore>>,
    pub runs: Arc<RunManager>,
}

impl AppState {
    fn store(&self) -> Result<&ScriptStore> {
        self.store.as_deref().ok_or(Error::StorageNotSelected)
    }

    fn record(&self, id: &str) -> Result<ScriptRecord> {
        let Some(store) = self.store.as_deref() else {
            return Err(Error::ScriptNotFound);
        };
        store.find(id)?.ok_or(Error::ScriptNotFound)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl From<ScriptRecord> for ScriptSummary {
    fn from(record: ScriptRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
            tags: record.tags,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDetails {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    pub explanation: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ScriptDetails {
    fn new(record: ScriptRecord, code: String) -> Self {
        Self {
            id: record.id,
            name: record.name,
            code,
            explanation: record.explanation,
            tags: record.tags,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub code_preview: String,
    pub explanation_preview: String,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.record.id,
            name: hit.record.name,
            created_at: hit.record.created_at,
            tags: hit.record.tags,
            code_preview: hit.code_preview,
            explanation_preview: hit.explanation_preview,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateScript {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScript {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub ok: bool,
    pub stopped: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&v1("scripts"), get(list_scripts).post(create_script))
        .route(&v1("scripts/{id}"), get(get_script).put(update_script))
        .route(&v1("scripts/{id}/run"), post(run_script))
        .route(&v1("scripts/{id}/stop"), post(stop_script))
        .route(&v1("scripts/{id}/log"), get(get_log))
        .route(&v1("search"), get(search_scripts))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_scripts(State(state): State<AppState>) -> Result<Json<Vec<ScriptSummary>>> {
    let Some(store) = state.store.as_deref() else {
        return Ok(Json(Vec::new()));
    };
    let scripts = store.list()?.into_iter().map(ScriptSummary::from).collect();
    Ok(Json(scripts))
}

async fn search_scripts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>> {
    let Some(store) = state.store.as_deref() else {
        return Ok(Json(Vec::new()));
    };
    let results = store
        .search(&params.q)?
        .into_iter()
        .map(SearchResult::from)
        .collect();
    Ok(Json(results))
}

async fn create_script(
    State(state): State<AppState>,
    Json(payload): Json<CreateScript>,
) -> Result<Json<ScriptDetails>> {
    let record = state
        .store()?
        .create(&payload.name, &payload.code, &payload.explanation)?;
    Ok(Json(ScriptDetails::new(record, payload.code)))
}

async fn get_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScriptDetails>> {
    let record = state.record(&id)?;
    let code = state.store()?.read_code(&id)?;
    Ok(Json(ScriptDetails::new(record, code)))
}

async fn update_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateScript>,
) -> Result<Json<UpdateResponse>> {
    state.record(&id)?;
    state.store()?.update_code(&id, &payload.code)?;
    Ok(Json(UpdateResponse { ok: true }))
}

async fn run_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunResult>> {
    let item = state.record(&id)?.to_item();
    let result = state.runs.run(&item).await?;
    Ok(Json(result))
}

async fn stop_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<StopResponse> {
    let stopped = state.runs.stop(&id);
    info!("Stop requested for {id}: {stopped}");
    Json(StopResponse {
        ok: stopped,
        stopped,
    })
}

async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let log = state.runs.read_log(&id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], log))
}
