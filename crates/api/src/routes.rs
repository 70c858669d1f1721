use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tadash_core::{IndicatorTable, PipelineOutcome};
use tadash_data::export::table_to_csv_bytes;
use tadash_engine::{default_end_date, default_start_date};

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Symbols
        .route("/symbols", get(list_symbols))
        // Indicators
        .route("/indicators/batch", post(batch_indicators))
        .route("/indicators/{ticker}", get(get_indicators))
        .route("/indicators/{ticker}/csv", get(get_indicators_csv))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

async fn list_symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.symbols.clone())
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    (
        start.unwrap_or_else(default_start_date),
        end.unwrap_or_else(default_end_date),
    )
}

#[derive(Debug, Serialize)]
struct RowBody {
    date: NaiveDate,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Decimal,
    volume: Option<Decimal>,
    /// Aligned with `TableBody::columns`.
    values: Vec<Option<Decimal>>,
}

#[derive(Debug, Serialize)]
struct TableBody {
    ticker: String,
    columns: Vec<String>,
    rows: Vec<RowBody>,
}

impl From<&IndicatorTable> for TableBody {
    fn from(table: &IndicatorTable) -> Self {
        let rows = table
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| RowBody {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                values: table.row_values(i),
            })
            .collect();
        Self {
            ticker: table.ticker.to_string(),
            columns: table.columns().iter().map(|c| c.name.clone()).collect(),
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum OutcomeBody {
    Table(TableBody),
    Empty {
        ticker: String,
        /// `error` for provider failures, `warning` otherwise.
        level: &'static str,
        message: String,
    },
    Invalid {
        message: String,
    },
}

fn outcome_body(outcome: &PipelineOutcome) -> (StatusCode, OutcomeBody) {
    match outcome {
        PipelineOutcome::Table(table) => (StatusCode::OK, OutcomeBody::Table(table.into())),
        PipelineOutcome::Empty(empty) => (
            StatusCode::NOT_FOUND,
            OutcomeBody::Empty {
                ticker: empty.ticker.to_string(),
                level: if empty.is_failure() { "error" } else { "warning" },
                message: empty.reason.to_string(),
            },
        ),
        PipelineOutcome::Invalid(invalid) => (
            StatusCode::BAD_REQUEST,
            OutcomeBody::Invalid {
                message: invalid.to_string(),
            },
        ),
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

async fn get_indicators(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(range): Query<RangeQuery>,
) -> impl IntoResponse {
    let (start, end) = resolve_range(range.start, range.end);
    let outcome = state.pipeline.compute(&ticker, start, end).await;
    let (status, body) = outcome_body(&outcome);
    (status, Json(body))
}

async fn get_indicators_csv(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let (start, end) = resolve_range(range.start, range.end);
    let outcome = state.pipeline.compute(&ticker, start, end).await;

    let PipelineOutcome::Table(table) = &outcome else {
        let (status, body) = outcome_body(&outcome);
        return (status, Json(body)).into_response();
    };

    match table_to_csv_bytes(table) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", attachment_name(table.ticker.as_str())),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(ticker = %table.ticker, error = %e, "CSV export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "CSV export failed"})),
            )
                .into_response()
        }
    }
}

/// `<ticker>.csv` with anything outside `[A-Za-z0-9._^-]` replaced, so the
/// name can sit inside a quoted header parameter.
fn attachment_name(ticker: &str) -> String {
    let stem: String = ticker
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '^' | '-' => c,
            _ => '_',
        })
        .collect();
    format!("{}.csv", stem)
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    tickers: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    requested: String,
    #[serde(flatten)]
    outcome: OutcomeBody,
}

async fn batch_indicators(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Response {
    if req.tickers.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "tickers must not be empty"})),
        )
            .into_response();
    }

    let (start, end) = resolve_range(req.start, req.end);
    let entries: Vec<BatchEntry> = state
        .pipeline
        .compute_many(&req.tickers, start, end)
        .await
        .into_iter()
        .map(|result| BatchEntry {
            outcome: outcome_body(&result.outcome).1,
            requested: result.requested,
        })
        .collect();

    Json(entries).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Days;
    use rust_decimal_macros::dec;
    use tadash_core::{Bar, DataError, DataProvider, SymbolEntry, Ticker};
    use tadash_data::CsvDataProvider;
    use tadash_engine::{IndicatorPipeline, IndicatorSet};
    use tower::ServiceExt;

    /// Serves 60 closes for `PETR4.SA`, fails for `DOWN.SA`, and has
    /// nothing for anything else.
    struct FixtureProvider;

    #[async_trait]
    impl DataProvider for FixtureProvider {
        fn name(&self) -> &str {
            "fixture"
        }

        async fn fetch_daily_bars(
            &self,
            ticker: &Ticker,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, DataError> {
            match ticker.as_str() {
                "PETR4.SA" => Ok((0..60u64)
                    .map(|i| Bar::close_only(start + Days::new(i), dec!(30) + Decimal::from(i % 7)))
                    .collect()),
                "DOWN.SA" => Err(DataError::ApiError("HTTP 503".into())),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn app() -> Router {
        let pipeline = IndicatorPipeline::new(Arc::new(FixtureProvider), IndicatorSet::full()).unwrap();
        let symbols = vec![SymbolEntry {
            ticker: Ticker::parse("PETR4.SA").unwrap(),
            name: "Petrobras PN".into(),
        }];
        build_router(AppState::new(pipeline, symbols))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), content_type)
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body, _) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_symbols() {
        let (status, body) = get_json("/api/symbols").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["ticker"], "PETR4.SA");
        assert_eq!(body[0]["name"], "Petrobras PN");
    }

    #[tokio::test]
    async fn test_indicator_table() {
        let (status, body) = get_json("/api/indicators/PETR4.SA?start=2024-01-01&end=2024-03-31").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "table");
        assert_eq!(body["ticker"], "PETR4.SA");
        assert_eq!(body["columns"].as_array().unwrap().len(), 7);
        assert_eq!(body["rows"].as_array().unwrap().len(), 60);
        assert_eq!(body["rows"][0]["date"], "2024-01-01");
        assert!(body["rows"][0]["values"][0].is_null());
        assert!(!body["rows"][59]["values"][1].is_null());
    }

    #[tokio::test]
    async fn test_empty_result_is_not_found() {
        let (status, body) = get_json("/api/indicators/FAKE9.SA?start=2024-01-01&end=2024-03-31").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "empty");
        assert_eq!(body["level"], "warning");

        let (status, body) = get_json("/api/indicators/DOWN.SA?start=2024-01-01&end=2024-03-31").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["level"], "error");
    }

    #[tokio::test]
    async fn test_invalid_range_is_bad_request() {
        let (status, body) = get_json("/api/indicators/PETR4.SA?start=2024-03-01&end=2024-01-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "invalid");

        let (status, _, _) = send(
            Request::get("/api/indicators/PETR4.SA?start=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let (status, body, content_type) = send(
            Request::get("/api/indicators/PETR4.SA/csv?start=2024-01-01&end=2024-03-31")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with(
            "Date,Open,High,Low,Close,Volume,SMA20,SMA50,RSI,MACD,MACD_signal,BB_upper,BB_lower\n"
        ));
        assert_eq!(text.lines().count(), 61);
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let request = Request::post("/api/indicators/batch")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"tickers": ["PETR4.SA", "FAKE9.SA", "DOWN.SA"], "start": "2024-01-01", "end": "2024-03-31"}"#,
            ))
            .unwrap();
        let (status, body, _) = send(request).await;
        assert_eq!(status, StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["requested"], "PETR4.SA");
        assert_eq!(entries[0]["status"], "table");
        assert_eq!(entries[1]["requested"], "FAKE9.SA");
        assert_eq!(entries[1]["status"], "empty");
        assert_eq!(entries[2]["level"], "error");
    }

    #[tokio::test]
    async fn test_batch_requires_tickers() {
        let request = Request::post("/api/indicators/batch")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"tickers": []}"#))
            .unwrap();
        let (status, _, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_attachment_name_is_header_safe() {
        assert_eq!(attachment_name("PETR4.SA"), "PETR4.SA.csv");
        assert_eq!(attachment_name("^BVSP"), "^BVSP.csv");
        assert_eq!(attachment_name("A\"B\r\nX: y"), "A_B__X__y.csv");
        let value = format!("attachment; filename=\"{}\"", attachment_name("A\"B\r\n"));
        assert!(header::HeaderValue::from_str(&value).is_ok());
    }

    #[tokio::test]
    async fn test_csv_directory_ticker_cannot_escape() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(root.path().join("secret.csv"), "Date,Close\n2024-01-02,42\n").unwrap();

        let pipeline =
            IndicatorPipeline::new(Arc::new(CsvDataProvider::new(&data)), IndicatorSet::full()).unwrap();
        let app = build_router(AppState::new(pipeline, Vec::new()));
        let response = app
            .oneshot(
                Request::get("/api/indicators/..%2Fsecret?start=2024-01-01&end=2024-01-31")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "empty");
        assert_eq!(body["level"], "warning");
    }
}
