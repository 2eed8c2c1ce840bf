use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::{
    Account, Assumptions, Holding, MortgageVsInvestComparison, ProjectionConfig, ProjectionResult,
    ProjectionScenario, Transaction, compare_mortgage_vs_invest, project_net_worth,
};
use crate::error::{ProjectionError, Result};
use crate::pricing::{PriceCache, RefreshReport, StaticQuotes, refresh_prices};
use crate::settings::Settings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionRequest {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub scenario: ProjectionScenario,
    pub quotes: StaticQuotes,
}

impl ProjectionRequest {
    pub fn clamp_years(&mut self) {
        let requested = self.scenario.config.projection_years;
        let clamped = ProjectionConfig::clamped_years(requested);
        if clamped != requested {
            debug!(requested, clamped, "projection years clamped");
        }
        self.scenario.config.projection_years = clamped;
    }

    // The cache lock is held for the refresh only, never for the projection.
    pub async fn apply_quotes(
        &mut self,
        prices: &Mutex<PriceCache>,
        pacing: Duration,
    ) -> Option<RefreshReport> {
        if self.quotes.is_empty() {
            return None;
        }
        let lengths: Vec<usize> = self.accounts.iter().map(|a| a.holdings.len()).collect();
        let mut holdings: Vec<Holding> = self
            .accounts
            .iter_mut()
            .flat_map(|a| std::mem::take(&mut a.holdings))
            .collect();

        let report = {
            let mut cache = prices.lock().await;
            let cancel = AtomicBool::new(false);
            refresh_prices(&mut holdings, &self.quotes, &mut cache, pacing, &cancel).await
        };

        let mut refreshed = holdings.into_iter();
        for (account, len) in self.accounts.iter_mut().zip(lengths) {
            account.holdings = refreshed.by_ref().take(len).collect();
        }
        Some(report)
    }

    pub fn project(self, price_refresh: Option<RefreshReport>) -> Result<ProjectionResponse> {
        let projection = project_net_worth(&self.accounts, &self.transactions, &self.scenario)?;
        Ok(ProjectionResponse {
            projection,
            price_refresh,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgageRequest {
    pub mortgage: Account,
    pub monthly_surplus: f64,
    #[serde(default)]
    pub assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    #[serde(flatten)]
    pub projection: ProjectionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_refresh: Option<RefreshReport>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub struct AppState {
    prices: Mutex<PriceCache>,
    pacing: Duration,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            prices: Mutex::new(PriceCache::new(settings.ttl_policy())),
            pacing: settings.refresh_pacing(),
        }
    }
}

pub async fn run_projection(
    mut request: ProjectionRequest,
    prices: &Mutex<PriceCache>,
    pacing: Duration,
) -> Result<ProjectionResponse> {
    request.clamp_years();
    let price_refresh = request.apply_quotes(prices, pacing).await;
    request.project(price_refresh)
}

pub fn run_comparison(request: &MortgageRequest) -> Result<MortgageVsInvestComparison> {
    compare_mortgage_vs_invest(&request.mortgage, request.monthly_surplus, &request.assumptions)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/mortgage-vs-invest", post(mortgage_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(settings: &Settings) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let app = router(Arc::new(AppState::new(settings)));

    let listener = TcpListener::bind(addr).await?;
    info!("Net worth projection API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<ProjectionRequest>,
) -> Response {
    request.clamp_years();
    let price_refresh = request.apply_quotes(&state.prices, state.pacing).await;
    match tokio::task::spawn_blocking(move || request.project(price_refresh)).await {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => projection_error_response(&e),
        Err(e) => {
            warn!(error = %e, "projection task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Projection failed")
        }
    }
}

async fn mortgage_handler(Json(request): Json<MortgageRequest>) -> Response {
    match run_comparison(&request) {
        Ok(comparison) => json_response(StatusCode::OK, comparison),
        Err(e) => projection_error_response(&e),
    }
}

fn projection_error_response(e: &ProjectionError) -> Response {
    debug!(error = %e, "request rejected");
    error_response(StatusCode::BAD_REQUEST, &e.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
