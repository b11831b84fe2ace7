use crate::errors::AppError;
use crate::models::{DashboardResponse, DateRange, RangeQuery, RangeResponse};
use crate::state::AppState;
use crate::stats::{build_dashboard, resolve_range};
use crate::ui::render_index;
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use chrono::NaiveDate;
use tracing::debug;

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Html<String>, AppError> {
    let range = requested_range(&state, &query)?;
    let dashboard = build_dashboard(&state.dataset, range);
    Ok(Html(render_index(&dashboard)))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_range(State(state): State<AppState>) -> Json<RangeResponse> {
    let bounds = state.dataset.bounds();
    Json(RangeResponse {
        min: bounds.map(|range| range.start),
        max: bounds.map(|range| range.end),
        total_rows: state.dataset.len(),
    })
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let range = requested_range(&state, &query)?;
    Ok(Json(build_dashboard(&state.dataset, range)))
}

fn requested_range(state: &AppState, query: &RangeQuery) -> Result<Option<DateRange>, AppError> {
    let start = parse_date_param("start", query.start.as_deref())?;
    let end = parse_date_param("end", query.end.as_deref())?;
    let range = resolve_range(state.dataset.bounds(), start, end);
    debug!(?range, "resolved dashboard range");
    Ok(range)
}

fn parse_date_param(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::bad_request(format!("{name} must be a date formatted YYYY-MM-DD")))
}
