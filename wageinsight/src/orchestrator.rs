//! Prediction orchestration: validation, salary curves and peer comparisons

use crate::client::{
    ClientError, ComparisonInfo, CurvePoint, Estimate, PredictionBackend, PredictionRequest,
};
use crate::fields::{BINARY_FIELDS, FieldKey, FormInputs, Mode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors from prediction orchestration
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Please select {label}")]
    MissingField { field: FieldKey, label: &'static str },

    #[error("Prediction request failed: {0}")]
    Client(#[from] ClientError),

    #[error("No salary returned for age {0}")]
    MissingAge(u32),

    #[error("Prediction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// How the age used for comparisons is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeAge {
    /// Middle of the age domain
    #[default]
    Midpoint,
    /// The user's own `AGE` input when it lies in the domain, else the midpoint
    UserAge,
}

/// Inclusive range of ages a curve is evaluated over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeDomain {
    min: u32,
    max: u32,
}

impl AgeDomain {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn ages(&self) -> impl Iterator<Item = u32> {
        self.min..=self.max
    }

    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }

    /// Age at index `len / 2`
    pub fn midpoint(&self) -> u32 {
        self.min + (self.len() / 2) as u32
    }
}

impl Default for AgeDomain {
    fn default() -> Self {
        Self::new(25, 64)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub ages: AgeDomain,
    pub representative_age: RepresentativeAge,
}

/// What kind of result a submission asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    #[default]
    Point,
    Curve,
}

/// Salary curve with its comparison panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveResult {
    pub series: Vec<CurvePoint>,
    pub info: Vec<ComparisonInfo>,
    pub representative_age: u32,
}

impl CurveResult {
    pub fn salary_at(&self, age: u32) -> Option<f64> {
        self.series.iter().find(|p| p.age == age).map(|p| p.salary)
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Point(f64),
    Curve(CurveResult),
}

/// Drives prediction requests for a filled-in form
pub struct PredictionOrchestrator {
    backend: Arc<dyn PredictionBackend>,
    config: OrchestratorConfig,
}

impl PredictionOrchestrator {
    pub fn new(backend: Arc<dyn PredictionBackend>, config: OrchestratorConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Check that every field required by `mode` has a value
    pub fn validate(&self, mode: Mode, inputs: &FormInputs) -> Result<(), OrchestratorError> {
        match inputs.first_missing(mode.fields()) {
            Some(field) => Err(OrchestratorError::MissingField {
                field,
                label: field.label(),
            }),
            None => Ok(()),
        }
    }

    /// Run a submission of the given kind
    pub async fn run(
        &self,
        kind: PredictionKind,
        mode: Mode,
        inputs: &FormInputs,
    ) -> Result<PredictionOutcome, OrchestratorError> {
        match kind {
            PredictionKind::Point => self
                .predict_point(mode, inputs)
                .await
                .map(PredictionOutcome::Point),
            PredictionKind::Curve => self
                .predict_curve(mode, inputs)
                .await
                .map(PredictionOutcome::Curve),
        }
    }

    /// One request, one salary estimate
    pub async fn predict_point(
        &self,
        mode: Mode,
        inputs: &FormInputs,
    ) -> Result<f64, OrchestratorError> {
        self.validate(mode, inputs)?;

        let request = PredictionRequest::new(mode, inputs.clone());
        let estimate = self.backend.predict(&request).await?;

        let age = self.representative_age(inputs);
        let salary = estimate
            .salary_at(age)
            .ok_or(OrchestratorError::MissingAge(age))?;

        info!(mode = %mode, salary, "Point prediction complete");
        Ok(salary)
    }

    /// Salary across the age domain plus the comparison panel
    pub async fn predict_curve(
        &self,
        mode: Mode,
        inputs: &FormInputs,
    ) -> Result<CurveResult, OrchestratorError> {
        self.validate(mode, inputs)?;

        let series = self.fetch_curve(mode, inputs).await?;

        let representative_age = self.representative_age(inputs);
        let salary = series
            .iter()
            .find(|p| p.age == representative_age)
            .map(|p| p.salary)
            .ok_or(OrchestratorError::MissingAge(representative_age))?;

        let info = self
            .compare(mode, inputs, representative_age, salary)
            .await?;

        info!(
            mode = %mode,
            points = series.len(),
            comparisons = info.len(),
            representative_age,
            "Curve prediction complete"
        );

        Ok(CurveResult {
            series,
            info,
            representative_age,
        })
    }

    /// Age used for comparison deltas
    pub fn representative_age(&self, inputs: &FormInputs) -> u32 {
        let midpoint = self.config.ages.midpoint();
        match self.config.representative_age {
            RepresentativeAge::Midpoint => midpoint,
            RepresentativeAge::UserAge => inputs
                .get(FieldKey::Age)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|age| self.config.ages.contains(*age))
                .unwrap_or(midpoint),
        }
    }

    /// Fan out one request per age; results are keyed by the requested age
    async fn fetch_curve(
        &self,
        mode: Mode,
        inputs: &FormInputs,
    ) -> Result<Vec<CurvePoint>, OrchestratorError> {
        let mut tasks = JoinSet::new();
        for age in self.config.ages.ages() {
            let backend = Arc::clone(&self.backend);
            let request = PredictionRequest::new(mode, inputs.clone()).with_age(age);
            tasks.spawn(async move {
                let estimate = backend.predict(&request).await?;
                Ok::<_, OrchestratorError>((age, estimate))
            });
        }
        debug!(requests = tasks.len(), "Dispatched curve requests");

        let mut by_age = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (age, estimate) = joined?.inspect_err(|e| {
                warn!(error = %e, "Curve request failed, aborting remaining requests");
            })?;
            let salary = estimate
                .salary_at(age)
                .ok_or(OrchestratorError::MissingAge(age))?;
            by_age.insert(age, salary);
        }

        Ok(by_age
            .into_iter()
            .map(|(age, salary)| CurvePoint { age, salary })
            .collect())
    }

    /// Re-query with each supplied binary attribute flipped
    async fn compare(
        &self,
        mode: Mode,
        inputs: &FormInputs,
        age: u32,
        salary: f64,
    ) -> Result<Vec<ComparisonInfo>, OrchestratorError> {
        let mut tasks = JoinSet::new();
        for (slot, field) in BINARY_FIELDS.into_iter().enumerate() {
            let Some(you) = inputs.get(field) else {
                continue;
            };
            let Some(other) = field.flip(you) else {
                debug!(field = %field, value = you, "No flip for value, skipping comparison");
                continue;
            };

            let backend = Arc::clone(&self.backend);
            let request = PredictionRequest::new(mode, inputs.clone())
                .with_age(age)
                .with_field(field, other);
            let you = you.to_string();
            tasks.spawn(async move {
                let estimate: Estimate = backend.predict(&request).await?;
                let flipped = estimate
                    .salary_at(age)
                    .ok_or(OrchestratorError::MissingAge(age))?;
                let delta = salary - flipped;
                Ok::<_, OrchestratorError>((
                    slot,
                    ComparisonInfo {
                        label: field.label().to_string(),
                        you,
                        other: other.to_string(),
                        delta: delta.abs(),
                        more: delta > 0.0,
                    },
                ))
            });
        }

        let mut by_slot = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (slot, comparison) = joined??;
            by_slot.insert(slot, comparison);
        }
        Ok(by_slot.into_values().collect())
    }
}
