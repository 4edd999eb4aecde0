//! HTTP server for the dashboard API.
//!
//! All persistence goes through the injected [`DataStore`]; the server adds
//! schema lookups, CSV import preview/confirm, a change stream for UI
//! refresh, and the dictation proxy.
//!
//! # API Endpoints
//!
//! | Method | Path                          | Description                       |
//! |--------|-------------------------------|-----------------------------------|
//! | GET    | `/health`                     | Health check                      |
//! | GET    | `/api/schema/{kind}`          | Column specs for form rendering   |
//! | GET    | `/api/rows/{kind}`            | List rows                         |
//! | POST   | `/api/rows/{kind}`            | Insert one row                    |
//! | PATCH  | `/api/rows/{kind}/{id}`       | Update one row                    |
//! | DELETE | `/api/rows/{kind}/{id}`       | Delete one row                    |
//! | POST   | `/api/import/{kind}/preview`  | CSV upload → first 3 parsed rows  |
//! | POST   | `/api/import/{kind}`          | CSV upload → full import          |
//! | GET    | `/api/changes`                | SSE stream of change events       |
//! | POST   | `/api/dictate`                | Audio upload → transcript         |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, patch, post},
    Router,
};
use futures::stream::Stream;
use serde_json::Value;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::types::{
    error_response, rejection_response, DictationResponse, ImportResponse, PreviewResponse,
};
use crate::error::{ImportError, StoreError};
use crate::import::{coerce_record, format_validation_errors, stamp_created, ImportPipeline};
use crate::schema::EntityKind;
use crate::speech::SpeechClient;
use crate::store::{DataStore, RestStore};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiError>;

/// Shared server state.
pub struct AppState<S> {
    pipeline: Arc<ImportPipeline<S>>,
    speech: Option<SpeechClient>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self { pipeline: Arc::clone(&self.pipeline), speech: self.speech.clone() }
    }
}

impl<S: DataStore> AppState<S> {
    pub fn new(store: S, speech: Option<SpeechClient>) -> Self {
        Self { pipeline: Arc::new(ImportPipeline::new(store)), speech }
    }
}

/// Build the router for any store implementation.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: DataStore + 'static,
{
    // Permissive CORS: the dashboard is served from its own origin.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/schema/{kind}", get(get_schema))
        .route("/api/rows/{kind}", get(list_rows::<S>).post(insert_row::<S>))
        .route(
            "/api/rows/{kind}/{id}",
            patch(update_row::<S>).delete(delete_row::<S>),
        )
        .route("/api/import/{kind}/preview", post(preview_import::<S>))
        .route("/api/import/{kind}", post(run_import::<S>))
        .route("/api/changes", get(sse_changes::<S>))
        .route("/api/dictate", post(dictate::<S>))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server against the hosted store.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let store = RestStore::from_env()?;
    let speech = SpeechClient::from_env().ok();
    if speech.is_none() {
        println!("   (dictation disabled: SPEECH_API_KEY not set)");
    }

    let app = router(AppState::new(store, speech));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("Rosterload server running on http://localhost:{}", port);
    println!("   GET    /api/rows/{{kind}}         - Browse tables");
    println!("   POST   /api/import/{{kind}}       - CSV import");
    println!("   GET    /api/changes              - SSE change stream");
    println!("   POST   /api/dictate              - Dictation");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rosterload",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_schema(Path(kind): Path<String>) -> ApiResult<Json<Value>> {
    let kind = parse_kind(&kind)?;
    let schema = serde_json::to_value(kind.schema())
        .map_err(|e| internal(&e.to_string()))?;
    Ok(Json(schema))
}

async fn list_rows<S: DataStore>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let kind = parse_kind(&kind)?;
    let rows = state
        .pipeline
        .store()
        .fetch_existing(kind)
        .await
        .map_err(store_error)?;
    Ok(Json(rows))
}

async fn insert_row<S: DataStore>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let kind = parse_kind(&kind)?;
    let schema = kind.schema();

    // Form values arrive as text; normalize them the same way an import
    // would before they reach the store.
    let mut record = coerce_record(&body, schema);
    stamp_created(&mut record, schema);

    let stored = state
        .pipeline
        .store()
        .insert_row(kind, record)
        .await
        .map_err(store_error)?;
    Ok(Json(stored))
}

async fn update_row<S: DataStore>(
    State(state): State<AppState<S>>,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    let patch = coerce_record(&body, kind.schema());

    state
        .pipeline
        .store()
        .update_row(kind, &id, patch)
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_row<S: DataStore>(
    State(state): State<AppState<S>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    state
        .pipeline
        .store()
        .delete_row(kind, &id)
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_import<S: DataStore>(
    Path(kind): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<PreviewResponse>> {
    parse_kind(&kind)?;
    let (bytes, _) = read_upload(multipart, "file").await?;

    let preview = ImportPipeline::<S>::preview(&bytes)
        .map_err(|e| bad_request(&e.to_string()))?;
    Ok(Json(preview.into()))
}

async fn run_import<S: DataStore>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let kind = parse_kind(&kind)?;
    let (bytes, file_name) = read_upload(multipart, "file").await?;

    println!(
        "Import upload: {} -> {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        kind,
        bytes.len()
    );

    match state.pipeline.run(kind, &bytes).await {
        Ok(report) => {
            println!("   Imported {} row(s) into {}", report.inserted, report.kind);
            Ok(Json(report.into()))
        }
        Err(ImportError::Validation(errors)) => {
            let summary = format_validation_errors(&errors);
            let messages = errors.iter().map(ToString::to_string).collect();
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(rejection_response(&summary, messages)),
            ))
        }
        Err(ImportError::Store(err)) => Err(store_error(err)),
        Err(err) => Err(bad_request(&err.to_string())),
    }
}

async fn sse_changes<S: DataStore>(
    State(state): State<AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.pipeline.store().subscribe_changes();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).ok()?;
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

async fn dictate<S: DataStore>(
    State(state): State<AppState<S>>,
    multipart: Multipart,
) -> ApiResult<Json<DictationResponse>> {
    let speech = state
        .speech
        .clone()
        .ok_or_else(|| bad_request("dictation is not configured"))?;

    let (audio, content_type) = read_audio(multipart).await?;
    let transcript = speech
        .transcribe(audio, content_type.as_deref().unwrap_or("audio/webm"))
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, Json(error_response(&e.to_string()))))?;

    Ok(Json(DictationResponse { transcript }))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_kind(name: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_name(name).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(error_response(&format!("Unknown entity kind: {name}"))),
        )
    })
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(message)))
}

fn internal(message: &str) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(message)))
}

fn store_error(err: StoreError) -> ApiError {
    let status = match err {
        StoreError::DuplicateIdentifier(_) => StatusCode::CONFLICT,
        StoreError::RequestFailed(_) => StatusCode::BAD_GATEWAY,
        StoreError::MissingConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(error_response(&err.to_string())))
}

/// Pull the named file field out of a multipart upload.
async fn read_upload(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let mut data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == field_name {
            file_name = field.file_name().map(|s| s.to_string());
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(&format!("Read error: {e}")))?
                    .to_vec(),
            );
        }
    }

    let data = data.ok_or_else(|| bad_request(&format!("No '{field_name}' field provided")))?;
    Ok((data, file_name))
}

/// Pull the audio field and its content type out of a dictation upload.
async fn read_audio(mut multipart: Multipart) -> Result<(Vec<u8>, Option<String>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {e}")))?
    {
        if field.name() == Some("audio") {
            let content_type = field.content_type().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(&format!("Read error: {e}")))?
                .to_vec();
            return Ok((bytes, content_type));
        }
    }
    Err(bad_request("No 'audio' field provided"))
}
