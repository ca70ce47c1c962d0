//! REST API for the prediction orchestrator

use crate::client::{ComparisonInfo, CurvePoint};
use crate::fields::{FieldKey, FormInputs, Mode};
use crate::options::OptionCatalog;
use crate::orchestrator::{OrchestratorError, PredictionOrchestrator};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// API state
pub struct ApiState {
    pub orchestrator: Arc<PredictionOrchestrator>,
    pub catalog: Arc<OptionCatalog>,
}

/// Form submission
#[derive(Debug, Deserialize)]
pub struct FormRequest {
    #[serde(default)]
    pub mode: Mode,
    pub inputs: FormInputs,
}

/// Point prediction response
#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub prediction: f64,
}

/// Curve prediction response
#[derive(Debug, Serialize, Deserialize)]
pub struct CurveResponse {
    pub series: Vec<CurvePoint>,
    pub info: Vec<ComparisonInfo>,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/options", get(all_options))
        .route("/options/{field}", get(field_options))
        .route("/predict", post(predict))
        .route("/predict_form", post(predict_form))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn all_options(State(state): State<Arc<ApiState>>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(
        state
            .catalog
            .fields()
            .map(|f| (f.as_str().to_string(), state.catalog.get(f).to_vec()))
            .collect(),
    )
}

async fn field_options(
    State(state): State<Arc<ApiState>>,
    Path(field): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let key: FieldKey = field.parse().map_err(|e: String| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: e,
                field: Some(field.clone()),
            }),
        )
    })?;
    Ok(Json(state.catalog.get(key).to_vec()))
}

/// Single salary estimate
async fn predict(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<FormRequest>,
) -> Result<Json<PointResponse>, ApiError> {
    state
        .orchestrator
        .predict_point(request.mode, &request.inputs)
        .await
        .map(|prediction| Json(PointResponse { prediction }))
        .map_err(error_response)
}

/// Salary curve plus comparison panel
async fn predict_form(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<FormRequest>,
) -> Result<Json<CurveResponse>, ApiError> {
    state
        .orchestrator
        .predict_curve(request.mode, &request.inputs)
        .await
        .map(|curve| {
            Json(CurveResponse {
                series: curve.series,
                info: curve.info,
            })
        })
        .map_err(error_response)
}

fn error_response(e: OrchestratorError) -> ApiError {
    let (status, field) = match &e {
        OrchestratorError::MissingField { field, .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, Some(field.as_str().to_string()))
        }
        _ => {
            warn!(error = %e, "Upstream prediction failed");
            (StatusCode::BAD_GATEWAY, None)
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            field,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorConfig;
    use crate::orchestrator::tests::{MockBackend, advanced_inputs, basic_inputs};
    use serde_json::json;

    async fn serve() -> String {
        let orchestrator = PredictionOrchestrator::new(
            Arc::new(MockBackend::default()),
            OrchestratorConfig::default(),
        );
        let catalog = OptionCatalog::from_lists([
            (FieldKey::WorkState, vec!["CA".to_string(), "TX".to_string()]),
            (FieldKey::Sex, vec!["Man".to_string(), "Woman".to_string()]),
        ]);
        let state = Arc::new(ApiState {
            orchestrator: Arc::new(orchestrator),
            catalog: Arc::new(catalog),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_options_endpoints() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let states: Vec<String> = client
            .get(format!("{base}/options/WORKSTATE"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(states, ["CA", "TX"]);

        let missing = client.get(format!("{base}/options/SALARY")).send().await.unwrap();
        assert_eq!(missing.status(), 404);

        let all: BTreeMap<String, Vec<String>> = client
            .get(format!("{base}/options"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_predict_and_predict_form() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let point: PointResponse = client
            .post(format!("{base}/predict"))
            .json(&json!({"mode": "basic", "inputs": basic_inputs()}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(point.prediction, 60_000.0);

        let curve: CurveResponse = client
            .post(format!("{base}/predict_form"))
            .json(&json!({"mode": "advanced", "inputs": advanced_inputs()}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(curve.series.len(), 40);
        assert_eq!(curve.series[0].age, 25);
        assert_eq!(curve.info.len(), 6);
        assert_eq!(curve.info[0].label, "Gender");
    }

    #[tokio::test]
    async fn test_missing_field_is_unprocessable() {
        let base = serve().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/predict_form"))
            .json(&json!({"mode": "advanced", "inputs": basic_inputs()}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 422);

        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.field.as_deref(), Some("SEX"));
        assert_eq!(body.error, "Please select Gender");
    }
}
