//! ==============================================================================
//! main.rs - campus environment dashboard host entry point
//! ==============================================================================
//!
//! purpose:
//!     long-running host behind the campus environment display. it polls the
//!     sensor endpoint of the selected station, asks a hosted language model
//!     for a one-line advisory, keeps a clock, and serves the dashboard.
//!
//! responsibilities:
//!     - load configuration and set up logging
//!     - build the location registry, poller and insight generator
//!     - start the dashboard runtime (clock tick + refresh cycle)
//!     - serve the html dashboard and the json api
//!     - cancel every timer on shutdown (ctrl-c)
//!
//! relationships:
//!     - uses: config.rs, registry.rs, poller.rs, insight.rs
//!     - uses: runtime.rs (timers, shared state), render.rs (html)
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ clock tick  │  │ refresh     │  │ web server          │  │
//!     │  │ (1s cycle)  │  │ (60s cycle) │  │ (port 3000)         │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//!     │         └────────────────┼────────────────────┘             │
//!     │                    ┌─────┴─────┐                            │
//!     │                    │  runtime  │ <- runtime.rs              │
//!     │                    └─────┬─────┘                            │
//!     └──────────────────────────┼──────────────────────────────────┘
//!                     ┌──────────┴──────────┐
//!                     ▼                     ▼
//!             ┌──────────────┐      ┌──────────────┐
//!             │ lass sensor  │      │ gemini       │
//!             │ json (GET)   │      │ generate     │
//!             └──────────────┘      └──────────────┘
//!
//! ==============================================================================

mod clock;
mod config;
mod domain;
mod error;
mod insight;
mod poller;
mod registry;
mod render;
mod runtime;
mod schedule;
mod state;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use crate::domain::Metric;
use crate::insight::{GeminiClient, InsightGenerator};
use crate::poller::Poller;
use crate::registry::LocationRegistry;
use crate::render::PageOptions;
use crate::runtime::{DashboardRuntime, RuntimeSettings};
use crate::state::{DashboardView, UiEvent};

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // step 1: load configuration, then logging (RUST_LOG wins over host.toml)
    let (config, origin) = config::HostConfig::load_or_default();
    init_logging(&config.logging.level);
    origin.log();
    config.log_summary();

    // step 2: the fixed station list
    let registry = LocationRegistry::from_config(&config.locations).context("invalid location list")?;
    tracing::info!(count = registry.len(), "location registry ready");
    for loc in registry.iter() {
        tracing::info!(id = %loc.id, name = %loc.name, url = %loc.api_url, "location");
    }

    // step 3: poller, advisory pipeline, runtime
    let poller = Poller::new(config.polling.timeout()).context("failed to build sensor client")?;
    let completion = GeminiClient::from_config(&config.insight).context("failed to build completion client")?;
    let runtime = DashboardRuntime::new(
        Arc::new(registry),
        poller,
        InsightGenerator::new(Arc::new(completion)),
        RuntimeSettings {
            poll_interval: config.polling.interval(),
            clock_tick: config.clock.tick(),
            show_sensor_data: config.logging.show_sensor_data,
        },
    );
    runtime.start().await;

    // step 4: serve until ctrl-c
    let app_state = AppState {
        runtime: runtime.clone(),
        title: Arc::from(config.display.title.as_str()),
        refresh_seconds: config.display.refresh_seconds,
    };
    let served = run_server(&config.server.bind, app_state).await;

    // step 5: teardown on every exit path
    runtime.shutdown().await;
    served
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ==============================================================================
// web server
// ==============================================================================

#[derive(Clone)]
struct AppState {
    runtime: DashboardRuntime,
    title: Arc<str>,
    refresh_seconds: u64,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api", get(api_handler))
        .route("/api/locations", get(locations_handler))
        .route("/api/location", post(select_location_handler))
        .route("/api/dropdown", post(dropdown_handler))
        .route("/api/modal", post(open_modal_handler))
        .route("/api/modal/close", post(close_modal_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn run_server(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!("dashboard live at http://{}", bind);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("shutting down");
        })
        .await
        .context("web server error")
}

async fn dashboard_handler(State(state): State<AppState>) -> Html<String> {
    let view = state.runtime.view().await;
    let opts = PageOptions { title: &state.title, refresh_seconds: state.refresh_seconds };
    Html(render::render_page(&view, state.runtime.registry(), &opts))
}

/// json api endpoint for programmatic access
async fn api_handler(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.runtime.view().await)
}

async fn locations_handler(State(state): State<AppState>) -> Json<Vec<domain::Location>> {
    Json(state.runtime.registry().as_slice().to_vec())
}

#[derive(Deserialize)]
struct LocationParams {
    id: String,
}

/// POST /api/location?id=B
async fn select_location_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LocationParams>,
) -> Response {
    if state.runtime.registry().get(&params.id).is_none() {
        return reject(StatusCode::NOT_FOUND, &format!("unknown location: {}", params.id));
    }
    let view = state.runtime.dispatch(UiEvent::SelectLocation(params.id)).await;
    reply(&headers, view)
}

async fn dropdown_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let view = state.runtime.dispatch(UiEvent::ToggleDropdown).await;
    reply(&headers, view)
}

#[derive(Deserialize)]
struct ModalParams {
    metric: String,
}

/// POST /api/modal?metric=pm25
async fn open_modal_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ModalParams>,
) -> Response {
    let Some(metric) = Metric::from_tag(&params.metric) else {
        return reject(StatusCode::BAD_REQUEST, &format!("unknown metric: {}", params.metric));
    };
    let view = state.runtime.dispatch(UiEvent::OpenModal(metric)).await;
    reply(&headers, view)
}

async fn close_modal_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let view = state.runtime.dispatch(UiEvent::CloseModal).await;
    reply(&headers, view)
}

/// browsers posting the dashboard forms go back to the page; api clients get json
fn reply(headers: &HeaderMap, view: DashboardView) -> Response {
    if wants_html(headers) {
        Redirect::to("/").into_response()
    } else {
        Json(view).into_response()
    }
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"status": "error", "message": message}))).into_response()
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsightConfig;
    use crate::domain::Location;
    use axum::body::Body;
    use axum::http::{HeaderValue, Method, Request};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_state() -> AppState {
        // port 9 refuses connections, so polls fail fast and nothing leaves the host
        let station = |id: &str, name: &str| Location {
            id: id.to_string(),
            name: name.to_string(),
            api_url: format!("http://127.0.0.1:9/{}", id.to_lowercase()),
        };
        let registry = LocationRegistry::new(vec![station("A", "小芳堂"), station("B", "司令台")]).unwrap();
        let completion = GeminiClient::new(&InsightConfig::default(), None).unwrap();

        AppState {
            runtime: DashboardRuntime::new(
                Arc::new(registry),
                Poller::new(Duration::from_secs(1)).unwrap(),
                InsightGenerator::new(Arc::new(completion)),
                RuntimeSettings {
                    poll_interval: Duration::from_secs(60),
                    clock_tick: Duration::from_secs(1),
                    show_sensor_data: false,
                },
            ),
            title: Arc::from("芳和實驗中學環境現況"),
            refresh_seconds: 1,
        }
    }

    async fn send(state: &AppState, method: Method, uri: &str, accept: &'static str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap();
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn api_reports_view_and_locations() {
        let state = app_state();

        let response = send(&state, Method::GET, "/api", "application/json").await;
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["location"]["id"], "A");
        assert_eq!(view["ui"]["dropdown_open"], false);
        assert!(view["snapshot"].is_null());

        let response = send(&state, Method::GET, "/api/locations", "application/json").await;
        assert_eq!(response.status(), StatusCode::OK);
        let locations = json_body(response).await;
        assert_eq!(locations.as_array().map(Vec::len), Some(2));
        assert_eq!(locations[1]["name"], "司令台");
    }

    #[tokio::test]
    async fn dashboard_page_is_html() {
        let state = app_state();
        let response = send(&state, Method::GET, "/", "text/html").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<title>芳和實驗中學環境現況</title>"));
        assert!(html.contains("小芳堂"));
    }

    #[tokio::test]
    async fn unknown_location_is_not_found_and_leaves_state() {
        let state = app_state();

        let response = send(&state, Method::POST, "/api/location?id=Z", "application/json").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["status"], "error");
        assert_eq!(state.runtime.view().await.ui.selected, "A");
    }

    #[tokio::test]
    async fn unknown_metric_is_bad_request() {
        let state = app_state();

        let response = send(&state, Method::POST, "/api/modal?metric=noise", "application/json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.runtime.view().await.ui.modal.is_none());
    }

    #[tokio::test]
    async fn json_clients_get_the_new_view() {
        let state = app_state();

        let response = send(&state, Method::POST, "/api/location?id=B", "application/json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ui"]["selected"], "B");

        let response = send(&state, Method::POST, "/api/modal?metric=co2", "application/json").await;
        let view = json_body(response).await;
        assert_eq!(view["ui"]["modal"]["metric"], "co2");
        assert_eq!(view["ui"]["modal"]["title"], "碳排放");

        let response = send(&state, Method::POST, "/api/modal/close", "application/json").await;
        assert!(json_body(response).await["ui"]["modal"].is_null());

        state.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn form_posts_redirect_to_the_page() {
        let state = app_state();

        let response = send(&state, Method::POST, "/api/dropdown", "text/html,*/*;q=0.8").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(state.runtime.view().await.ui.dropdown_open);
    }

    #[tokio::test]
    async fn encoded_location_id_reaches_the_handler() {
        let state = app_state();

        // "A&B" must not be split at the ampersand
        let response = send(&state, Method::POST, "/api/location?id=A%26B", "application/json").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["message"], "unknown location: A&B");
    }

    #[test]
    fn browser_form_posts_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        assert!(wants_html(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_html(&headers));

        assert!(!wants_html(&HeaderMap::new()));
    }

    #[test]
    fn rejection_carries_status() {
        let response = reject(StatusCode::BAD_REQUEST, "unknown metric: noise");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
