use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::dispatch::{LeadStore, NotificationSender};
use super::domain::{Disposition, RawRecord};
use super::pipeline::{BatchReport, CancellationToken, QualificationPipeline, SkippedRecord};
use super::scoring::ScoreComponent;

#[derive(Debug, Deserialize, Serialize)]
pub struct QualifyRequest {
    pub records: Vec<RawRecord>,
}

/// Score and disposition for one record, computed without dispatching.
#[derive(Debug, Serialize)]
pub struct ScorePreview {
    pub index: usize,
    pub name: String,
    pub score: u32,
    pub disposition: Disposition,
    pub components: Vec<ScoreComponent>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub threshold: u32,
    pub leads: Vec<ScorePreview>,
    pub skipped: Vec<SkippedRecord>,
}

/// Router exposing batch qualification and dry-run scoring.
pub fn qualification_router<N, S>(pipeline: Arc<QualificationPipeline<N, S>>) -> Router
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    Router::new()
        .route("/api/v1/leads/qualify", post(qualify_handler::<N, S>))
        .route("/api/v1/leads/score", post(score_handler::<N, S>))
        .with_state(pipeline)
}

pub(crate) async fn qualify_handler<N, S>(
    State(pipeline): State<Arc<QualificationPipeline<N, S>>>,
    axum::Json(request): axum::Json<QualifyRequest>,
) -> Result<axum::Json<BatchReport>, AppError>
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    let report = pipeline
        .run(request.records, &CancellationToken::new())
        .await?;
    Ok(axum::Json(report))
}

pub(crate) async fn score_handler<N, S>(
    State(pipeline): State<Arc<QualificationPipeline<N, S>>>,
    axum::Json(request): axum::Json<QualifyRequest>,
) -> Response
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    let mut leads = Vec::new();
    let mut skipped = Vec::new();

    for (index, record) in request.records.iter().enumerate() {
        match pipeline.qualify(record) {
            Ok(routed) => leads.push(ScorePreview {
                index,
                name: routed.lead().identity.name.clone(),
                score: routed.score(),
                disposition: routed.disposition(),
                components: routed.card().components.clone(),
            }),
            Err(reason) => skipped.push(SkippedRecord {
                index,
                reason: reason.to_string(),
            }),
        }
    }

    let response = ScoreResponse {
        threshold: pipeline.routing().threshold(),
        leads,
        skipped,
    };
    (StatusCode::OK, axum::Json(response)).into_response()
}
