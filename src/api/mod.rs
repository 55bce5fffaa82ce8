use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    ContributionSolveConfig, DEFAULT_HORIZON_YEARS, ProjectionInput, Trajectory, TrajectoryPoint,
    asset_gap, fire_number, future_value, monthly_spend_estimate, months_to_target,
    progress_percent, solve_required_contribution,
};
use crate::form::{
    self, DurationUnit, clamp_return_pct, clamp_safety_margin_pct, clamp_withdrawal_rate_pct,
    months_from_duration,
};
use crate::present;
use crate::store::{FileStore, Snapshot, SnapshotStore};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_HORIZON_YEARS: u32 = 120;
const DEFAULT_SOLVE_SEARCH_MAX: f64 = 100_000_000.0;
const DEFAULT_SOLVE_TOLERANCE: f64 = 1_000.0;
const DEFAULT_SOLVE_MAX_ITERATIONS: u32 = 48;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDurationUnit {
    Months,
    Years,
}

impl From<CliDurationUnit> for DurationUnit {
    fn from(value: CliDurationUnit) -> Self {
        match value {
            CliDurationUnit::Months => DurationUnit::Months,
            CliDurationUnit::Years => DurationUnit::Years,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDurationUnit {
    #[serde(alias = "month")]
    Months,
    #[serde(alias = "year")]
    Years,
}

impl From<ApiDurationUnit> for CliDurationUnit {
    fn from(value: ApiDurationUnit) -> Self {
        match value {
            ApiDurationUnit::Months => CliDurationUnit::Months,
            ApiDurationUnit::Years => CliDurationUnit::Years,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "firecalc",
    about = "Deterministic FIRE calculator: fixed-rate savings projection and time-to-retirement estimates"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 10_000_000.0,
        help = "Current invested assets in currency units"
    )]
    current_assets: f64,
    #[arg(
        long,
        default_value_t = 1_500_000.0,
        help = "Monthly contribution in currency units"
    )]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 825_000_000.0,
        help = "Nominal target assets before the safety buffer"
    )]
    target_assets: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Expected annual return in percent, clamped to [-50, 50]"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual withdrawal rate in percent, clamped to [0, 100]"
    )]
    withdrawal_rate: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Safety buffer on top of the target in percent, clamped to [0, 100]"
    )]
    safety_margin: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Contribution duration used for the future-value forecast"
    )]
    duration: f64,
    #[arg(long, value_enum, default_value_t = CliDurationUnit::Years, help = "Unit for --duration")]
    duration_unit: CliDurationUnit,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_YEARS,
        help = "Chart horizon in years"
    )]
    horizon_years: u32,
}

fn build_inputs(cli: Cli) -> Result<ProjectionInput, String> {
    if !cli.current_assets.is_finite() {
        return Err("--current-assets must be finite".to_string());
    }
    if !cli.monthly_contribution.is_finite() {
        return Err("--monthly-contribution must be finite".to_string());
    }
    if !cli.target_assets.is_finite() {
        return Err("--target-assets must be finite".to_string());
    }
    if !cli.annual_return.is_finite() {
        return Err("--annual-return must be finite".to_string());
    }
    if !cli.withdrawal_rate.is_finite() {
        return Err("--withdrawal-rate must be finite".to_string());
    }
    if !cli.safety_margin.is_finite() {
        return Err("--safety-margin must be finite".to_string());
    }
    if !cli.duration.is_finite() {
        return Err("--duration must be finite".to_string());
    }
    if cli.horizon_years > MAX_HORIZON_YEARS {
        return Err(format!("--horizon-years must be <= {MAX_HORIZON_YEARS}"));
    }

    Ok(ProjectionInput {
        current_assets: cli.current_assets.max(0.0),
        monthly_contribution: cli.monthly_contribution.max(0.0),
        annual_return_pct: clamp_return_pct(cli.annual_return),
        duration_months: months_from_duration(cli.duration, cli.duration_unit.into()),
        target_assets: cli.target_assets.max(0.0),
        withdrawal_rate_pct: clamp_withdrawal_rate_pct(cli.withdrawal_rate),
        safety_margin_pct: clamp_safety_margin_pct(cli.safety_margin),
        horizon_years: cli.horizon_years,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_assets: 10_000_000.0,
        monthly_contribution: 1_500_000.0,
        target_assets: 825_000_000.0,
        annual_return: 8.0,
        withdrawal_rate: 4.0,
        safety_margin: 10.0,
        duration: 10.0,
        duration_unit: CliDurationUnit::Years,
        horizon_years: DEFAULT_HORIZON_YEARS,
    }
}

// Payload numbers may arrive as JSON numbers or as raw form text
// ("1,500,000"); text goes through the form sanitizers.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

fn de_lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LenientNumber>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        LenientNumber::Number(n) => n,
        LenientNumber::Text(text) => form::parse_amount(&text),
    }))
}

fn de_lenient_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LenientNumber>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        LenientNumber::Number(n) => n,
        LenientNumber::Text(text) => form::parse_decimal(&text),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    #[serde(deserialize_with = "de_lenient_amount")]
    current_assets: Option<f64>,
    #[serde(deserialize_with = "de_lenient_amount")]
    monthly_contribution: Option<f64>,
    #[serde(deserialize_with = "de_lenient_amount")]
    target_assets: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    annual_return_pct: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    withdrawal_rate_pct: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    safety_margin_pct: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    duration_value: Option<f64>,
    duration_unit: Option<ApiDurationUnit>,
    horizon_years: Option<u32>,
}

fn inputs_from_payload(payload: ProjectionPayload) -> Result<ProjectionInput, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_assets {
        cli.current_assets = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.target_assets {
        cli.target_assets = v;
    }
    if let Some(v) = payload.annual_return_pct {
        cli.annual_return = v;
    }
    if let Some(v) = payload.withdrawal_rate_pct {
        cli.withdrawal_rate = v;
    }
    if let Some(v) = payload.safety_margin_pct {
        cli.safety_margin = v;
    }
    if let Some(v) = payload.duration_value {
        cli.duration = v;
    }
    if let Some(v) = payload.duration_unit {
        cli.duration_unit = v.into();
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }

    build_inputs(cli)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(deserialize_with = "de_lenient_amount")]
    target_assets: Option<f64>,
    #[serde(deserialize_with = "de_lenient_amount")]
    current_assets: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    annual_return_pct: Option<f64>,
    #[serde(deserialize_with = "de_lenient_decimal")]
    safety_margin_pct: Option<f64>,
    deadline_months: Option<u32>,
    #[serde(deserialize_with = "de_lenient_amount")]
    search_min: Option<f64>,
    #[serde(deserialize_with = "de_lenient_amount")]
    search_max: Option<f64>,
    #[serde(deserialize_with = "de_lenient_amount")]
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug)]
struct SolveRequest {
    effective_target: f64,
    current_assets: f64,
    annual_return_pct: f64,
    config: ContributionSolveConfig,
}

fn solve_request_from_payload(payload: SolvePayload) -> Result<SolveRequest, String> {
    let deadline_months = payload
        .deadline_months
        .ok_or_else(|| "deadlineMonths is required".to_string())?;

    let mut cli = default_cli_for_api();
    if let Some(v) = payload.target_assets {
        cli.target_assets = v;
    }
    if let Some(v) = payload.current_assets {
        cli.current_assets = v;
    }
    if let Some(v) = payload.annual_return_pct {
        cli.annual_return = v;
    }
    if let Some(v) = payload.safety_margin_pct {
        cli.safety_margin = v;
    }
    let inputs = build_inputs(cli)?;

    Ok(SolveRequest {
        effective_target: fire_number(inputs.target_assets, inputs.safety_margin_pct),
        current_assets: inputs.current_assets,
        annual_return_pct: inputs.annual_return_pct,
        config: ContributionSolveConfig {
            deadline_months,
            search_min: payload.search_min.unwrap_or(0.0),
            search_max: payload.search_max.unwrap_or(DEFAULT_SOLVE_SEARCH_MAX),
            tolerance: payload.tolerance.unwrap_or(DEFAULT_SOLVE_TOLERANCE),
            max_iterations: payload.max_iterations.unwrap_or(DEFAULT_SOLVE_MAX_ITERATIONS),
        },
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplaySummary {
    fire_number: String,
    monthly_spend: String,
    annual_spend: String,
    progress: String,
    asset_gap: String,
    time_to_target: String,
    future_value: String,
    total_contributed: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    fire_number: f64,
    monthly_spend: Option<f64>,
    annual_spend: Option<f64>,
    progress_pct: Option<f64>,
    asset_gap: Option<f64>,
    months_to_target: Option<u64>,
    target_unreachable: bool,
    duration_months: u32,
    future_value: Option<f64>,
    total_contributed: f64,
    horizon_years: u32,
    trajectory: Vec<TrajectoryPoint>,
    display: DisplaySummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn build_projection_response(inputs: &ProjectionInput) -> ProjectionResponse {
    let buffered_target = fire_number(inputs.target_assets, inputs.safety_margin_pct);
    let monthly_spend = monthly_spend_estimate(
        inputs.target_assets,
        inputs.withdrawal_rate_pct,
        inputs.safety_margin_pct,
    );
    let annual_spend = monthly_spend * 12.0;
    let progress = progress_percent(inputs.current_assets, buffered_target);
    let gap = asset_gap(inputs.current_assets, buffered_target);
    let months = months_to_target(
        buffered_target,
        inputs.current_assets,
        inputs.monthly_contribution,
        inputs.annual_return_pct,
    );
    let forecast = future_value(
        inputs.current_assets,
        inputs.monthly_contribution,
        inputs.annual_return_pct,
        inputs.duration_months,
    );
    let total_contributed = inputs.monthly_contribution * f64::from(inputs.duration_months);
    let trajectory: Vec<TrajectoryPoint> = Trajectory::new(
        inputs.current_assets,
        inputs.monthly_contribution,
        inputs.annual_return_pct,
        inputs.withdrawal_rate_pct,
        buffered_target,
        inputs.horizon_years,
    )
    .collect();

    ProjectionResponse {
        fire_number: buffered_target,
        monthly_spend: finite_or_none(monthly_spend),
        annual_spend: finite_or_none(annual_spend),
        progress_pct: finite_or_none(progress),
        asset_gap: finite_or_none(gap),
        // JSON has no infinity, so unreachable targets are surfaced as a
        // null month count plus an explicit flag.
        months_to_target: months.is_finite().then_some(months as u64),
        target_unreachable: months == f64::INFINITY,
        duration_months: inputs.duration_months,
        future_value: finite_or_none(forecast),
        total_contributed,
        horizon_years: inputs.horizon_years,
        trajectory,
        display: DisplaySummary {
            fire_number: present::format_amount(buffered_target),
            monthly_spend: present::format_amount(monthly_spend),
            annual_spend: present::format_amount(annual_spend),
            progress: present::format_percent(progress),
            asset_gap: present::format_amount(gap),
            time_to_target: present::format_time_to_target(months),
            future_value: present::format_amount(forecast),
            total_contributed: present::format_amount(total_contributed),
        },
    }
}

pub fn run_cli_projection<I: IntoIterator<Item = String>>(args: I) -> Result<(), String> {
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let inputs = build_inputs(cli)?;
    let response = build_projection_response(&inputs);
    let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn SnapshotStore>,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("firecalc");
    let state = AppState {
        store: Arc::new(FileStore::new(data_dir)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/required-contribution", post(solve_post_handler))
        .route(
            "/api/snapshot",
            get(snapshot_get_handler).post(snapshot_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    println!("firecalc dashboard listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_response(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_response(payload)
}

fn projection_response(payload: ProjectionPayload) -> Response {
    match inputs_from_payload(payload) {
        Ok(inputs) => json_response(StatusCode::OK, build_projection_response(&inputs)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> Response {
    let request = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match solve_required_contribution(
        request.effective_target,
        request.current_assets,
        request.annual_return_pct,
        request.config,
    ) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn snapshot_get_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, Snapshot::load(state.store.as_ref()))
}

async fn snapshot_post_handler(
    State(state): State<AppState>,
    Json(value): Json<serde_json::Value>,
) -> Response {
    let snapshot = Snapshot::from_value(&value);
    match snapshot.save(state.store.as_ref()) {
        Ok(()) => json_response(StatusCode::OK, snapshot),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Failed to persist snapshot: {e}"),
        ),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<ProjectionInput, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}

#[cfg(test)]
fn solve_request_from_json(json: &str) -> Result<SolveRequest, String> {
    let payload = serde_json::from_str::<SolvePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    solve_request_from_payload(payload)
}
