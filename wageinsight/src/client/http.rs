//! HTTP client for the hosted prediction service

use super::{
    BatchPredictions, ClientError, Estimate, HealthStatus, PredictionBackend, PredictionRequest,
    PredictionResponse,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Prediction service reached over HTTP
pub struct HttpPredictionClient {
    client: Client,
    prediction_url: String,
    upload_url: Option<String>,
    name: String,
}

impl HttpPredictionClient {
    /// Create a client posting JSON predictions to `prediction_url`
    pub fn new(prediction_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let prediction_url = prediction_url.into();
        let name = format!("http:{}", prediction_url);

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            prediction_url,
            upload_url: None,
            name,
        })
    }

    /// Set the multipart CSV upload endpoint
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = Some(upload_url.into());
        self
    }

    pub fn prediction_url(&self) -> &str {
        &self.prediction_url
    }

    /// Upload a CSV of rows and get one prediction per row
    pub async fn upload_csv(&self, path: &Path) -> Result<BatchPredictions, ClientError> {
        let url = self.upload_url.as_deref().ok_or(ClientError::NoUploadUrl)?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        debug!(url, file = %file_name, bytes = bytes.len(), "Uploading CSV");

        let part = Part::bytes(bytes).file_name(file_name).mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        let body = read_success(response).await?;

        let raw: RawBatch = serde_json::from_str(&body)?;
        match (raw.predictions, raw.prediction) {
            (Some(predictions), _) => Ok(BatchPredictions { predictions }),
            (None, Some(single)) => Ok(BatchPredictions {
                predictions: vec![single],
            }),
            (None, None) => Err(ClientError::MalformedResponse(
                "expected `predictions` in upload response".to_string(),
            )),
        }
    }

    fn health_url(&self) -> Option<Url> {
        let mut url = Url::parse(&self.prediction_url).ok()?;
        url.set_path("/");
        url.set_query(None);
        Some(url)
    }
}

/// Upload responses carry a list, older deployments a single value
#[derive(Deserialize)]
struct RawBatch {
    #[serde(default)]
    predictions: Option<Vec<f64>>,
    #[serde(default)]
    prediction: Option<f64>,
}

async fn read_success(response: reqwest::Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[async_trait]
impl PredictionBackend for HttpPredictionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<Estimate, ClientError> {
        let start = Instant::now();

        let response = self
            .client
            .post(&self.prediction_url)
            .json(request)
            .send()
            .await?;
        let body = read_success(response).await?;

        let parsed: PredictionResponse = serde_json::from_str(&body)?;
        debug!(
            mode = %request.mode,
            age = ?request.inputs.get(crate::fields::FieldKey::Age),
            latency_ms = start.elapsed().as_millis() as u64,
            "Prediction received"
        );
        parsed.normalize()
    }

    async fn health_check(&self) -> HealthStatus {
        let Some(url) = self.health_url() else {
            return HealthStatus {
                healthy: false,
                latency_ms: None,
                error: Some(format!("Invalid URL: {}", self.prediction_url)),
            };
        };
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => HealthStatus {
                healthy: true,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Ok(response) => HealthStatus {
                healthy: false,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: Some(format!("HTTP {}", response.status())),
            },
            Err(e) => HealthStatus {
                healthy: false,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldKey, FormInputs, Mode};
    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<Value>>>;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn record(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
        seen.lock().unwrap().push(body);
        Json(json!({"prediction": 95000.5}))
    }

    async fn upload(mut multipart: Multipart) -> Json<Value> {
        let mut rows = 0;
        while let Some(field) = multipart.next_field().await.unwrap() {
            assert_eq!(field.name(), Some("file"));
            let text = field.text().await.unwrap();
            rows = text.lines().skip(1).count();
        }
        Json(json!({"predictions": vec![50000.0; rows]}))
    }

    #[tokio::test]
    async fn test_predict_posts_json_body() {
        let seen: Seen = Arc::default();
        let base = spawn(
            Router::new()
                .route("/", get(|| async { "Welcome" }))
                .route("/predict", post(record))
                .with_state(Arc::clone(&seen)),
        )
        .await;

        let client =
            HttpPredictionClient::new(format!("{base}/predict"), Duration::from_secs(5)).unwrap();
        let inputs = FormInputs::new()
            .with(FieldKey::Occ, "Engineer")
            .with(FieldKey::WorkState, "CA");
        let estimate = client
            .predict(&PredictionRequest::new(Mode::Basic, inputs))
            .await
            .unwrap();

        assert_eq!(estimate, Estimate::Point(95000.5));
        assert!(client.health_check().await.healthy);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            json!({"mode": "basic", "inputs": {"OCC": "Engineer", "WORKSTATE": "CA"}})
        );
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base = spawn(Router::new().route(
            "/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
        ))
        .await;

        let client =
            HttpPredictionClient::new(format!("{base}/predict"), Duration::from_secs(5)).unwrap();
        let err = client
            .predict(&PredictionRequest::new(Mode::Basic, FormInputs::new()))
            .await
            .unwrap_err();

        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model not loaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_upload_csv() {
        let base = spawn(Router::new().route("/predict", post(upload))).await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "SEX,AGE\nMan,30\nWoman,41\n").unwrap();

        let client = HttpPredictionClient::new(format!("{base}/predict"), Duration::from_secs(5))
            .unwrap()
            .with_upload_url(format!("{base}/predict"));
        let batch = client.upload_csv(&path).await.unwrap();
        assert_eq!(batch.predictions, vec![50000.0, 50000.0]);
    }

    #[tokio::test]
    async fn test_upload_without_url() {
        let client =
            HttpPredictionClient::new("http://127.0.0.1:9/predict", Duration::from_secs(1))
                .unwrap();
        let result = client.upload_csv(Path::new("missing.csv")).await;
        assert!(matches!(result, Err(ClientError::NoUploadUrl)));
    }
}
