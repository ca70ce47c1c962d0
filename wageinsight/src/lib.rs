//! WageInsight - salary prediction client
//!
//! This crate provides:
//! - Dropdown option loading from static CSV resources, with domain ordering
//! - A prediction orchestrator that builds salary-vs-age curves and
//!   peer comparisons by fanning out requests to the prediction service
//! - Form sessions that guard against double submission and stale results
//! - A REST API exposing the orchestrator to dashboards

pub mod api;
pub mod client;
pub mod fields;
pub mod options;
pub mod orchestrator;
pub mod render;
pub mod session;

pub use client::{HttpPredictionClient, PredictionBackend, PredictionRequest};
pub use fields::{FieldKey, FormInputs, Mode};
pub use options::{OptionCatalog, OptionLoader};
pub use orchestrator::{PredictionOrchestrator, RepresentativeAge};
pub use session::FormSession;

use orchestrator::{AgeDomain, OrchestratorConfig};
use std::time::Duration;

/// Configuration for the WageInsight client and server
#[derive(Debug, Clone, serde::Deserialize)]
pub struct WageInsightConfig {
    /// JSON prediction endpoint answering single-point requests
    #[serde(default = "default_prediction_url")]
    pub prediction_url: String,

    /// Multipart CSV upload endpoint
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// URL or directory prefix holding the option CSV files
    #[serde(default = "default_options_prefix")]
    pub options_prefix: String,

    /// HTTP timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// First age of the salary curve
    #[serde(default = "default_age_min")]
    pub age_min: u32,

    /// Last age of the salary curve (inclusive)
    #[serde(default = "default_age_max")]
    pub age_max: u32,

    /// How the comparison panel picks its age: "midpoint" or "user_age"
    #[serde(default)]
    pub representative_age: RepresentativeAge,

    /// Address the server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_prediction_url() -> String { "https://wageinsight.onrender.com/predict_form".to_string() }
fn default_upload_url() -> String { "https://wageinsight.onrender.com/predict".to_string() }
fn default_options_prefix() -> String { "/wageinsight/options/".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_age_min() -> u32 { 25 }
fn default_age_max() -> u32 { 64 }
fn default_listen_addr() -> String { "0.0.0.0:8080".to_string() }

impl Default for WageInsightConfig {
    fn default() -> Self {
        Self {
            prediction_url: default_prediction_url(),
            upload_url: default_upload_url(),
            options_prefix: default_options_prefix(),
            timeout_secs: default_timeout_secs(),
            age_min: default_age_min(),
            age_max: default_age_max(),
            representative_age: RepresentativeAge::default(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl WageInsightConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            ages: AgeDomain::new(self.age_min, self.age_max),
            representative_age: self.representative_age,
        }
    }
}
