//! Submission and status handlers.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Instrument;
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::ingest::{PipelineError, SpooledFile, Spooler, StreamIngestor};
use crate::load_balancer::EndpointStatus;
use crate::progress::{Chunk, Phase, ProgressEvent, PushMessage};
use crate::scanner::batch::percent;
use crate::scanner::{split_entries, InputKind, ScanItem, ScanStats};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub entries: Vec<String>,
    #[serde(default)]
    pub kind: InputKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub run_id: Option<Uuid>,
    pub stats: ScanStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointView {
    pub url: String,
    pub status: EndpointStatus,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub peers: usize,
    pub active_run: Option<Uuid>,
}

/// `POST /api/scan`: resolve a typed list of addresses or secrets.
pub async fn scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = payload?;

    let items: Vec<ScanItem> = request
        .entries
        .iter()
        .flat_map(|entry| split_entries(entry))
        .enumerate()
        .map(|(i, entry)| ScanItem::from_entry(request.kind, state.deriver.as_ref(), entry, i + 1))
        .collect();
    if items.is_empty() {
        return Err(ApiError::BadRequest("No entries provided".to_string()));
    }

    let stats = ScanStats::of(&items);
    let run_id = start_run(&state, items)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            success: true,
            run_id: Some(run_id),
            stats,
        }),
    ))
}

/// `POST /api/upload`: ingest a file, then resolve what it contained.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (file, kind) = receive_upload(&state, multipart?).await?;
    tracing::info!(bytes = file.len(), kind = ?kind, "Upload received");

    let ingestor = StreamIngestor::new(state.config.ingest.chunk_size, kind, state.deriver.clone());
    let mut run = ingestor.open(&file).await?;
    loop {
        match run.next_event().await {
            Ok(Some(event)) => {
                state.channel.broadcast(&PushMessage::from(&event));
            }
            Ok(None) => break,
            Err(e) => {
                let progress = percent(run.processed_lines(), run.total_lines());
                state
                    .channel
                    .broadcast(&PushMessage::upload_failed(progress, e.to_string()));
                return Err(e.into());
            }
        }
    }
    let (items, stats) = run.into_items();
    drop(file);

    let run_id = if items.is_empty() {
        None
    } else {
        Some(start_run(&state, items)?)
    };
    Ok(Json(SubmitResponse {
        success: true,
        run_id,
        stats,
    }))
}

async fn receive_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(SpooledFile, InputKind), ApiError> {
    let mut file = None;
    let mut kind = InputKind::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let dir = state.config.ingest.temp_dir.as_deref().map(Path::new);
                let mut spooler = Spooler::create(dir, state.config.ingest.max_upload_bytes)?;
                while let Some(chunk) = field.chunk().await? {
                    spooler.write_chunk(&chunk).await?;
                }
                file = Some(spooler.finish().await?);
            }
            Some("kind") => {
                kind = field.text().await?.parse().map_err(PipelineError::Malformed)?;
            }
            _ => {}
        }
    }

    let file = file.ok_or(PipelineError::MissingFile)?;
    Ok((file, kind))
}

/// Register a run and drive it in the background.
fn start_run(state: &AppState, items: Vec<ScanItem>) -> Result<Uuid, ApiError> {
    let (run_id, cancel) = state.runs.begin()?;
    let scheduler = state.scheduler.clone();
    let channel = state.channel.clone();
    let runs = state.runs.clone();
    let span = tracing::info_span!("scan_run", run = %run_id);

    tokio::spawn(
        async move {
            tracing::info!(items = items.len(), "Scan run started");
            let records = scheduler
                .run(items, &cancel, |report| {
                    // Superseded runs settle their in-flight batch silently.
                    if !runs.is_active(run_id) {
                        tracing::debug!(batch = report.batch_index, "Dropping batch of superseded run");
                        return;
                    }
                    let event = ProgressEvent {
                        phase: Phase::Resolve,
                        progress: report.progress(),
                        total: report.total,
                        completed: report.completed,
                        chunk: Some(Chunk::Wallets(report.batch.to_vec())),
                    };
                    channel.broadcast(&PushMessage::from(&event).for_run(run_id));
                })
                .await;
            runs.finish(run_id);
            tracing::info!(
                records = records.len(),
                cancelled = cancel.is_cancelled(),
                "Scan run finished"
            );
        }
        .instrument(span),
    );

    Ok(run_id)
}

/// `GET /api/endpoints`
pub async fn endpoints(State(state): State<AppState>) -> Json<Vec<EndpointView>> {
    Json(
        state
            .pool
            .snapshot()
            .into_iter()
            .map(|(endpoint, status)| EndpointView {
                url: endpoint.to_string(),
                status,
            })
            .collect(),
    )
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        peers: state.channel.peer_count(),
        active_run: state.runs.active(),
    })
}
