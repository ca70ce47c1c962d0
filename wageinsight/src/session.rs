//! Form session state
//!
//! A session owns the mode, the inputs and the latest results of one user's
//! form. Only one submission runs at a time; a mode change or an explicit
//! cancel bumps the generation counter, which aborts the running submission
//! and keeps its results from landing.

use crate::fields::{FieldKey, FormInputs, Mode};
use crate::orchestrator::{
    OrchestratorError, PredictionKind, PredictionOrchestrator, PredictionOutcome,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Errors from a session submission
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A prediction is already in progress")]
    Busy,

    #[error("Prediction was cancelled")]
    Cancelled,

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Snapshot of what the form currently shows
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub mode: Mode,
    pub inputs: FormInputs,
    pub outcome: Option<PredictionOutcome>,
    pub loading: bool,
    pub last_error: Option<String>,
}

/// One user's form session
pub struct FormSession {
    orchestrator: Arc<PredictionOrchestrator>,
    state: Mutex<SessionState>,
    generation: watch::Sender<u64>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FormSession {
    pub fn new(orchestrator: Arc<PredictionOrchestrator>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            orchestrator,
            state: Mutex::new(SessionState::default()),
            generation,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Switch mode, resetting inputs and results
    pub fn set_mode(&self, mode: Mode) {
        {
            let mut state = self.lock();
            state.mode = mode;
            state.inputs.clear();
            state.outcome = None;
            state.last_error = None;
        }
        self.bump();
        info!(mode = %mode, "Form mode changed");
    }

    /// Set a field; an empty value clears it
    pub fn set_input(&self, field: FieldKey, value: impl Into<String>) {
        self.lock().inputs.set(field, value);
    }

    /// Invalidate the running submission, if any
    pub fn cancel(&self) {
        self.bump();
        debug!("Submission cancelled");
    }

    /// Validate and run a prediction for the current inputs
    ///
    /// Returns [`SessionError::Busy`] while another submission runs and
    /// [`SessionError::Cancelled`] when superseded before completion.
    pub async fn submit(&self, kind: PredictionKind) -> Result<PredictionOutcome, SessionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }
        let _in_flight = InFlight(&self.in_flight);

        let (mode, inputs) = {
            let mut state = self.lock();
            state.outcome = None;
            state.last_error = None;
            state.loading = true;
            (state.mode, state.inputs.clone())
        };
        let generation = self.bump();
        let mut watcher = self.generation.subscribe();

        let result = tokio::select! {
            result = self.orchestrator.run(kind, mode, &inputs) => result.map_err(SessionError::from),
            _ = superseded(&mut watcher, generation) => Err(SessionError::Cancelled),
        };

        let mut state = self.lock();
        state.loading = false;

        if self.generation() != generation {
            debug!(generation, "Discarding stale prediction");
            return Err(SessionError::Cancelled);
        }

        match &result {
            Ok(outcome) => state.outcome = Some(outcome.clone()),
            Err(e) => {
                error!(error = %e, mode = %mode, "Prediction failed");
                state.last_error = Some(e.to_string());
            }
        }
        result
    }

    fn bump(&self) -> u64 {
        self.generation.send_modify(|g| *g += 1);
        self.generation()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves once the generation moves past `generation`
async fn superseded(watcher: &mut watch::Receiver<u64>, generation: u64) {
    while watcher.changed().await.is_ok() {
        if *watcher.borrow_and_update() != generation {
            return;
        }
    }
    std::future::pending::<()>().await
}
