//! Prediction service abstraction and wire types

mod http;

pub use http::HttpPredictionClient;

use crate::fields::{FieldKey, FormInputs, Mode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the prediction service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Prediction service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed prediction response: {0}")]
    MalformedResponse(String),

    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("No upload URL configured")]
    NoUploadUrl,
}

/// Body of a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub mode: Mode,
    pub inputs: FormInputs,
}

impl PredictionRequest {
    pub fn new(mode: Mode, inputs: FormInputs) -> Self {
        Self { mode, inputs }
    }

    /// Override the `AGE` input
    pub fn with_age(self, age: u32) -> Self {
        self.with_field(FieldKey::Age, age.to_string())
    }

    /// Override a single input
    pub fn with_field(mut self, field: FieldKey, value: impl Into<String>) -> Self {
        self.inputs.set(field, value);
        self
    }
}

/// One point of a salary-vs-age curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub age: u32,
    pub salary: f64,
}

/// Salary difference attributable to one binary attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonInfo {
    /// Display label of the attribute, e.g. "Gender"
    pub label: String,
    /// The user's value
    pub you: String,
    /// The flipped value
    pub other: String,
    /// Absolute salary difference
    pub delta: f64,
    /// Whether the user's value earns more than the flipped one
    pub more: bool,
}

/// Raw prediction response
///
/// The service answers with one of three shapes; see [`PredictionResponse::normalize`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub prediction: Option<f64>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub series: Option<Vec<CurvePoint>>,
    #[serde(default)]
    pub info: Option<Vec<ComparisonInfo>>,
}

/// A prediction reduced to one of its two meaningful shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    Curve {
        series: Vec<CurvePoint>,
        info: Vec<ComparisonInfo>,
    },
    Point(f64),
}

impl PredictionResponse {
    /// Pick the response shape, probing `series`, then `salary`, then `prediction`
    pub fn normalize(self) -> Result<Estimate, ClientError> {
        if let Some(series) = self.series {
            return Ok(Estimate::Curve {
                series,
                info: self.info.unwrap_or_default(),
            });
        }
        self.salary
            .or(self.prediction)
            .map(Estimate::Point)
            .ok_or_else(|| {
                ClientError::MalformedResponse(
                    "expected one of `series`, `salary` or `prediction`".to_string(),
                )
            })
    }
}

impl Estimate {
    /// Salary for `age`; a point estimate applies to any age
    pub fn salary_at(&self, age: u32) -> Option<f64> {
        match self {
            Estimate::Point(salary) => Some(*salary),
            Estimate::Curve { series, .. } => {
                series.iter().find(|p| p.age == age).map(|p| p.salary)
            }
        }
    }
}

/// Predictions for every row of an uploaded CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictions {
    pub predictions: Vec<f64>,
}

/// Health status of the prediction service
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Trait for prediction services
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Name for logging/identification
    fn name(&self) -> &str;

    /// Send a single prediction request
    async fn predict(&self, request: &PredictionRequest) -> Result<Estimate, ClientError>;

    /// Check if the service is reachable
    async fn health_check(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Estimate, ClientError> {
        serde_json::from_value::<PredictionResponse>(value)
            .unwrap()
            .normalize()
    }

    #[test]
    fn test_request_body() {
        let inputs = FormInputs::new()
            .with(FieldKey::Occ, "Engineer")
            .with(FieldKey::Ind, "Tech")
            .with(FieldKey::DegField1, "Computer Science")
            .with(FieldKey::Educ, "4 years of college")
            .with(FieldKey::WorkState, "CA");
        let request = PredictionRequest::new(Mode::Basic, inputs);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "mode": "basic",
                "inputs": {
                    "OCC": "Engineer",
                    "IND": "Tech",
                    "DEGFIELD1": "Computer Science",
                    "EDUC": "4 years of college",
                    "WORKSTATE": "CA"
                }
            })
        );
    }

    #[test]
    fn test_age_override() {
        let request = PredictionRequest::new(
            Mode::Advanced,
            FormInputs::new().with(FieldKey::Age, "30"),
        )
        .with_age(47);
        assert_eq!(request.inputs.get(FieldKey::Age), Some("47"));
    }

    #[test]
    fn test_normalize_precedence() {
        assert_eq!(parse(json!({"prediction": 95000.5})).unwrap(), Estimate::Point(95000.5));
        assert_eq!(
            parse(json!({"prediction": 1.0, "salary": 2.0})).unwrap(),
            Estimate::Point(2.0)
        );

        let curve = parse(json!({
            "salary": 2.0,
            "series": [{"age": 25, "salary": 40000.0}, {"age": 26, "salary": 41000.0}],
            "info": [{"label": "Gender", "you": "Man", "other": "Woman", "delta": 10.0, "more": true}]
        }))
        .unwrap();
        match &curve {
            Estimate::Curve { series, info } => {
                assert_eq!(series.len(), 2);
                assert_eq!(info[0].label, "Gender");
            }
            other => panic!("expected curve, got {other:?}"),
        }
        assert_eq!(curve.salary_at(26), Some(41000.0));
        assert_eq!(curve.salary_at(27), None);
    }

    #[test]
    fn test_normalize_rejects_empty_body() {
        assert!(matches!(
            parse(json!({"status": "ok"})),
            Err(ClientError::MalformedResponse(_))
        ));
    }
}
