//! HTTP server exposing the scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::{Semaphore, watch};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::collector::CollectorRegistry;
use crate::config::HttpConfig;
use crate::rcon::Transport;
use crate::scrape;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<CollectorRegistry>,
    transport: Arc<dyn Transport>,
    /// Caps scrapes in flight; `None` when the cap is disabled.
    limiter: Option<Arc<Semaphore>>,
    metrics_path: String,
}

/// Create the HTTP router.
pub fn router(
    registry: Arc<CollectorRegistry>,
    transport: Arc<dyn Transport>,
    config: &HttpConfig,
) -> Router {
    let state = AppState {
        registry,
        transport,
        limiter: (config.max_requests > 0)
            .then(|| Arc::new(Semaphore::new(config.max_requests))),
        metrics_path: config.path.clone(),
    };

    let mut router = Router::new()
        .route(&config.path, get(metrics_handler))
        .route("/health", get(health_handler));

    if config.path != "/" {
        router = router.route("/", get(landing_handler));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

/// Handler for the metrics endpoint.
///
/// Repeated `collect[]` / `exclude[]` query parameters select the collector
/// set; an invalid combination is the caller's fault and gets a plain-text
/// 400. When the in-flight cap is reached the request is turned away before
/// any RCON round trip starts.
async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let include = filter_values(&params, "collect[]");
    let exclude = filter_values(&params, "exclude[]");
    debug!(?include, ?exclude, "scrape request");

    let _permit = match &state.limiter {
        Some(limiter) => match limiter.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Too many concurrent scrape requests.\n",
                )
                    .into_response();
            }
        },
        None => None,
    };

    match scrape::run_scrape(
        &state.registry,
        state.transport.as_ref(),
        &include,
        &exclude,
    )
    .await
    {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, format!("{e}\n")).into_response(),
    }
}

fn filter_values(params: &[(String, String)], key: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Minimal landing page pointing at the metrics path.
async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Minecraft Exporter</title></head>\n<body>\n\
         <h1>Minecraft Exporter</h1>\n<p><a href=\"{0}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        state.metrics_path
    ))
}

/// HTTP server configuration.
pub struct HttpServer {
    registry: Arc<CollectorRegistry>,
    transport: Arc<dyn Transport>,
    listen_addr: SocketAddr,
    config: HttpConfig,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        registry: Arc<CollectorRegistry>,
        transport: Arc<dyn Transport>,
        listen_addr: SocketAddr,
        config: HttpConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            listen_addr,
            config,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = router(self.registry, self.transport, &self.config);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.config.path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectorsConfig;
    use crate::rcon::RawReply;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// Unreachable-server stand-in: every exchange fails.
    struct DownTransport;

    #[async_trait]
    impl Transport for DownTransport {
        async fn execute(&self, _command: &str) -> RawReply {
            RawReply::error("connection refused")
        }
    }

    fn make_router(config: &HttpConfig) -> Router {
        let registry =
            Arc::new(CollectorRegistry::with_defaults(&CollectorsConfig::default()).unwrap());
        router(registry, Arc::new(DownTransport), config)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = make_router(&HttpConfig::default())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_text(response).await;
        assert!(body.contains("minecraft_up 0"));
    }

    #[tokio::test]
    async fn test_combined_filters_rejected() {
        let response = make_router(&HttpConfig::default())
            .oneshot(
                Request::get("/metrics?collect[]=players&exclude[]=system")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.contains("not allowed"));
    }

    #[tokio::test]
    async fn test_unknown_collector_rejected() {
        let response = make_router(&HttpConfig::default())
            .oneshot(
                Request::get("/metrics?collect[]=nether")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.contains("nether"));
    }

    #[tokio::test]
    async fn test_exclude_filter() {
        let response = make_router(&HttpConfig::default())
            .oneshot(
                Request::get("/metrics?exclude[]=players")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(!body.contains("collector=\"players\""));
        assert!(body.contains("minecraft_up 0"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = make_router(&HttpConfig::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_landing_page() {
        let response = make_router(&HttpConfig::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let config = HttpConfig {
            path: "/mc/metrics".to_string(),
            ..Default::default()
        };
        let router = make_router(&config);

        let response = router
            .clone()
            .oneshot(Request::get("/mc/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
