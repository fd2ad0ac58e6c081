use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json,
};
use serde_json::json;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use climate_predictor::config::{self, AppConfig};
use climate_predictor::service::{PredictError, PredictionRequest, PredictionService};
use climate_predictor::types::{ChoicesOut, PredictParams, PredictionOut};

// ---------- Server state ----------

#[derive(Clone)]
struct AppState {
    service: Arc<PredictionService>,
    year_min: i32,
    year_max: i32,
}

// ---------- Handlers ----------

async fn choices(State(state): State<AppState>) -> Json<ChoicesOut> {
    Json(ChoicesOut {
        year_min: state.year_min,
        year_max: state.year_max,
        states: state.service.states(),
        crops: state.service.commodities(),
    })
}

async fn predict(
    State(state): State<AppState>,
    Json(params): Json<PredictParams>,
) -> Result<Json<PredictionOut>, (StatusCode, Json<serde_json::Value>)> {
    // Year bounds belong to the form surface, not the prediction core.
    if params.year < state.year_min || params.year > state.year_max {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": format!(
                    "year {} outside supported range {}..={}",
                    params.year, state.year_min, state.year_max
                )
            })),
        ));
    }

    if std::env::var("LOG_PRED").ok().as_deref() == Some("1") {
        tracing::info!(
            "recv year={} state={:?} crop={:?}",
            params.year,
            params.state,
            params.crop
        );
    }

    let request = PredictionRequest {
        year: params.year,
        state: params.state.clone(),
        crop: params.crop.clone(),
    };
    let outcome = state.service.predict(&request).map_err(|e| match e {
        PredictError::Encoding(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        ),
        PredictError::Model(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        ),
    })?;

    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
    Ok(Json(PredictionOut::from_outcome(
        now_ms,
        params.year,
        params.state,
        params.crop,
        outcome,
    )))
}

// ---------- Entry point ----------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cfg_path = config::resolve_config_path();
    let cfg = AppConfig::load(&cfg_path)?;
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // Artifact or dataset problems are fatal here; the service never starts
    // with a partial model set.
    let service = PredictionService::load(&cfg)?;
    tracing::info!(
        "loaded {} models, {} encoder families, {} historical rows",
        service.model_count(),
        service.family_count(),
        service.history_len()
    );

    let state = AppState {
        service: Arc::new(service),
        year_min: cfg.year_min,
        year_max: cfg.year_max,
    };

    let app = axum::Router::new()
        .route("/choices", get(choices))
        .route("/predict", post(predict))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
