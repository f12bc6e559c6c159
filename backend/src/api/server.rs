//! HTTP Server for the datatranslator API.
//!
//! Provides REST endpoints for workbook upload and translation.
//!
//! # API Endpoints
//!
//! | Method | Path                      | Description                              |
//! |--------|---------------------------|------------------------------------------|
//! | GET    | `/health`                 | Health check                             |
//! | GET    | `/api/profiles`           | Available translation profiles           |
//! | POST   | `/api/translate/{profile}`| Upload `primary` + `mapping` (+ `weights`)|
//! | POST   | `/api/splits/{profile}`   | Split keys of an uploaded `mapping`      |
//! | GET    | `/api/logs`               | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ProfileSummary, SplitsResponse, TranslateResponse};
use crate::error::{PipelineError, PipelineResult, ProfileError, ServerError};
use crate::parser::read_grid_bytes;
use crate::profiles::{ProfileRegistry, TranslationProfile};
use crate::transform::allocate::{SplitGroup, WeightMap};
use crate::transform::pipeline::{mapping_splits, translate_bytes, ReconcileOptions};

type ApiError = (StatusCode, Json<Value>);

/// Shared, read-only server configuration.
#[derive(Clone)]
struct AppState {
    options: Arc<ReconcileOptions>,
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: ReconcileOptions) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let state = AppState {
        options: Arc::new(options),
    };

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/profiles", get(list_profiles))
        .route("/api/translate/{profile}", post(translate_upload))
        .route("/api/splits/{profile}", post(splits_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Datatranslator server running on http://localhost:{}", port);
    println!("   GET  /api/profiles            - Available profiles");
    println!("   POST /api/translate/{{profile}} - Translate primary + mapping workbooks");
    println!("   POST /api/splits/{{profile}}    - List split keys of a mapping workbook");
    println!("   GET  /api/logs                - SSE log stream");
    println!("   GET  /health                  - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "datatranslator",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "profiles": "GET /api/profiles",
            "translate": "POST /api/translate/{profile}",
            "splits": "POST /api/splits/{profile}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn list_profiles(State(state): State<AppState>) -> Json<Vec<ProfileSummary>> {
    let registry = ProfileRegistry::with_dir(&state.options.profile_dir);
    Json(registry.list().into_iter().map(ProfileSummary::from).collect())
}

/// Translate endpoint: multipart `primary`, `mapping`, optional `weights` (JSON text)
async fn translate_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> Result<Json<TranslateResponse>, ApiError> {
    let profile = load_profile(&state, &name).map_err(reject)?;
    let mut fields = read_fields(multipart).await.map_err(reject)?;

    let primary = take_file(&mut fields, "primary").map_err(reject)?;
    let mapping = take_file(&mut fields, "mapping").map_err(reject)?;
    let weights = match fields.remove("weights") {
        Some(bytes) if !bytes.is_empty() => parse_weights(&bytes).map_err(reject)?,
        _ => WeightMap::new(),
    };

    log_info(format!(
        "📄 New translation ({}): primary {} bytes, mapping {} bytes",
        name,
        primary.len(),
        mapping.len()
    ));

    let options = state.options.clone();
    let result = tokio::task::spawn_blocking(move || {
        translate_bytes(&primary, &mapping, &profile, &weights, &options)
    })
    .await
    .map_err(|e| reject(ServerError::Internal(e.to_string())))?
    .map_err(|e| reject(e.into()))?;

    Ok(Json(TranslateResponse::new(&name, result)))
}

/// Split discovery endpoint: multipart `mapping`
async fn splits_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> Result<Json<SplitsResponse>, ApiError> {
    let profile = load_profile(&state, &name).map_err(reject)?;
    let mut fields = read_fields(multipart).await.map_err(reject)?;
    let mapping = take_file(&mut fields, "mapping").map_err(reject)?;

    let options = state.options.clone();
    let groups = tokio::task::spawn_blocking(move || -> PipelineResult<Vec<SplitGroup>> {
        let grid = read_grid_bytes(&mapping).map_err(|e| PipelineError::sheet("mapping", e))?;
        mapping_splits(grid, &profile, &options)
    })
    .await
    .map_err(|e| reject(ServerError::Internal(e.to_string())))?
    .map_err(|e| reject(e.into()))?;

    Ok(Json(SplitsResponse::new(&name, groups)))
}

fn load_profile(state: &AppState, name: &str) -> Result<TranslationProfile, ServerError> {
    let registry = ProfileRegistry::with_dir(&state.options.profile_dir);
    let profile = registry.require(name).map_err(PipelineError::from)?;
    Ok(profile.clone())
}

async fn read_fields(mut multipart: Multipart) -> Result<HashMap<String, Vec<u8>>, ServerError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        fields.insert(name, bytes.to_vec());
    }
    Ok(fields)
}

fn take_file(fields: &mut HashMap<String, Vec<u8>>, name: &str) -> Result<Vec<u8>, ServerError> {
    fields
        .remove(name)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("No {} file provided", name)))
}

fn parse_weights(bytes: &[u8]) -> Result<WeightMap, ServerError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ServerError::BadRequest(format!("Weights are not UTF-8: {}", e)))?;
    WeightMap::from_json_str(text).map_err(|e| PipelineError::from(e).into())
}

fn status_of(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Profile(ProfileError::NotFound(_))) => StatusCode::NOT_FOUND,
        ServerError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    (status_of(&err), Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeaderError;

    #[test]
    fn test_status_codes() {
        let missing = ServerError::from(PipelineError::header(
            "mapping",
            HeaderError::MissingColumns { missing: vec!["acct_name".into()] },
        ));
        assert_eq!(status_of(&missing), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(missing.to_string().contains("acct_name"));

        let unknown = ServerError::from(PipelineError::from(ProfileError::NotFound("xx".into())));
        assert_eq!(status_of(&unknown), StatusCode::NOT_FOUND);

        assert_eq!(
            status_of(&ServerError::BadRequest("No primary file provided".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_weights_field() {
        let weights = parse_weights(br#"{"A100": {"0": 25, "1": 75}}"#).unwrap();
        assert_eq!(weights.get("A100", 1), Some(75.0));

        let err = parse_weights(b"[1, 2]").unwrap_err();
        assert_eq!(status_of(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_take_file_rejects_empty() {
        let mut fields = HashMap::from([("primary".to_string(), Vec::new())]);
        assert!(matches!(take_file(&mut fields, "primary"), Err(ServerError::BadRequest(_))));
        assert!(matches!(take_file(&mut fields, "mapping"), Err(ServerError::BadRequest(_))));
    }
}
