use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use lead_router::workflows::leads::{
    qualification_router, LeadStore, NotificationSender, QualificationPipeline,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_lead_routes<N, S>(pipeline: Arc<QualificationPipeline<N, S>>) -> axum::Router
where
    N: NotificationSender + 'static,
    S: LeadStore + 'static,
{
    qualification_router(pipeline)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryLeadStore, InMemoryNotifier};
    use axum::body::Body;
    use axum::http::Request;
    use lead_router::config::PipelineConfig;
    use lead_router::workflows::leads::{Bucket, RetryPolicy};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> (axum::Router, InMemoryLeadStore, InMemoryNotifier) {
        let store = InMemoryLeadStore::default();
        let notifier = InMemoryNotifier::default();
        let config = PipelineConfig {
            retry: RetryPolicy::immediate(),
            ..PipelineConfig::default()
        };
        let pipeline = QualificationPipeline::from_config(
            &config,
            Arc::new(notifier.clone()),
            Arc::new(store.clone()),
            None,
        )
        .expect("pipeline builds");

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_lead_routes(Arc::new(pipeline)).layer(Extension(state));
        (router, store, notifier)
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _, _) = app(false);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let (router, _, _) = app(false);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (router, _, _) = app(true);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let (router, _, _) = app(true);
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn qualify_route_uses_in_memory_collaborators() {
        let (router, store, notifier) = app(true);
        let payload = json!({
            "records": [
                ["Ada", "ada@example.com", "555-0100", "1000+", ">100000", "Technology", "Immediate"]
            ]
        });

        let response = router
            .oneshot(
                Request::post("/api/v1/leads/qualify")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).expect("encode")))
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["outcomes"][0]["score"], 80);
        assert_eq!(store.rows(Bucket::HighPriority).len(), 1);
        assert_eq!(notifier.sent()[0].subject, "Welcome to TechNova!");
    }
}
