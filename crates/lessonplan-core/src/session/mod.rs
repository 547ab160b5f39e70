//! Generation session state.
//!
//! A [`Session`] holds the user's inputs, the last decoded record set and
//! the current [`SessionState`]. State changes only through the named
//! transitions below:
//!
//! ```text
//! Idle | Ready | NoData | DecodeFailed | Failed  --submit-->  Loading
//! Loading  --succeed(records)-->      Ready
//! Loading  --succeed(no records)-->   NoData
//! Loading  --succeed(undecodable)-->  DecodeFailed
//! Loading  --fail-->                  Failed
//! any      --reset-->                 Idle
//! ```
//!
//! `succeed` and `fail` are refused outside `Loading`. A failed call keeps
//! the previous records; a completed call replaces them wholesale.

use std::fmt;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::gateway::{
    Attachment, DEFAULT_TEMPERATURE, GatewayError, GenerateRequest, GenerationGateway, ModelTier,
};
use crate::plan::{LessonPlanRecord, PresentationItem, decode_records, normalize};

/// Message shown to the user for any failed generation call. Details go to
/// the log.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyse the input. Check the API key.";

/// Where a session is in its generate cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been submitted yet.
    #[default]
    Idle,
    /// A generation request is in flight.
    Loading,
    /// The last response decoded to at least one record.
    Ready,
    /// The last response decoded to an empty list.
    NoData,
    /// The last response could not be decoded, even after repair.
    DecodeFailed(String),
    /// The generation call itself failed.
    Failed(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Ready => f.write_str("ready"),
            Self::NoData => f.write_str("no data"),
            Self::DecodeFailed(reason) => write!(f, "decode failed: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Refused transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a generation request is already in progress")]
    AlreadyLoading,

    #[error("nothing to submit: provide a prompt or at least one file")]
    NothingToSubmit,

    #[error("no generation request is in progress (state: {0})")]
    NotLoading(SessionState),
}

/// Inputs, results and state of one interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    pub model: ModelTier,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub temperature: f32,
    records: Vec<LessonPlanRecord>,
    repaired: bool,
    last_response: Option<String>,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ModelTier::default())
    }
}

impl Session {
    pub fn new(model: ModelTier) -> Self {
        Self {
            model,
            prompt: String::new(),
            attachments: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            records: Vec::new(),
            repaired: false,
            last_response: None,
            state: SessionState::Idle,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    /// Raw records of the last completed generation, in response order.
    pub fn records(&self) -> &[LessonPlanRecord] {
        &self.records
    }

    /// `true` when the last response needed the backslash repair pass.
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }

    /// Raw text of the last completed response, decodable or not.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Whether there is anything to export.
    pub fn can_export(&self) -> bool {
        !self.records.is_empty()
    }

    /// Sorted, chapter-grouped view of the current records.
    pub fn presentation(&self) -> Vec<PresentationItem> {
        normalize(&self.records)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Enter `Loading` and build the request for the current inputs.
    ///
    /// Refused while a request is in flight, or when there is neither a
    /// prompt nor an attachment.
    pub fn submit(&mut self) -> Result<GenerateRequest, SessionError> {
        if self.is_loading() {
            return Err(SessionError::AlreadyLoading);
        }
        if self.prompt.trim().is_empty() && self.attachments.is_empty() {
            return Err(SessionError::NothingToSubmit);
        }

        self.state = SessionState::Loading;
        Ok(GenerateRequest::new(self.model, &self.prompt)
            .with_attachments(self.attachments.clone())
            .with_temperature(self.temperature))
    }

    fn ensure_loading(&self) -> Result<(), SessionError> {
        if self.is_loading() {
            Ok(())
        } else {
            Err(SessionError::NotLoading(self.state.clone()))
        }
    }

    /// Complete the in-flight request with the model's raw response text.
    pub fn succeed(&mut self, raw: &str) -> Result<&SessionState, SessionError> {
        self.ensure_loading()?;
        self.last_response = Some(raw.to_string());
        match decode_records(raw) {
            Ok(decoded) => {
                self.repaired = decoded.repaired;
                self.records = decoded.records;
                self.state = if self.records.is_empty() {
                    SessionState::NoData
                } else {
                    SessionState::Ready
                };
            }
            Err(e) => {
                error!(error = %e, response_len = raw.len(), "discarding undecodable response");
                self.repaired = false;
                self.records.clear();
                self.state = SessionState::DecodeFailed(e.to_string());
            }
        }
        Ok(&self.state)
    }

    /// Complete the in-flight request with a gateway failure. Previous
    /// records are kept.
    pub fn fail(&mut self, err: &GatewayError) -> Result<&SessionState, SessionError> {
        self.ensure_loading()?;
        error!(error = %err, "generation failed");
        self.state = SessionState::Failed(err.to_string());
        Ok(&self.state)
    }

    /// Drop inputs, records and state.
    pub fn reset(&mut self) {
        self.prompt.clear();
        self.attachments.clear();
        self.records.clear();
        self.repaired = false;
        self.last_response = None;
        self.state = SessionState::Idle;
    }
}

/// Submit the session, await the gateway and record the outcome.
///
/// The session never stays in `Loading` after this returns.
pub async fn run_generation(
    session: &mut Session,
    gateway: &dyn GenerationGateway,
) -> Result<SessionState, SessionError> {
    let request = session.submit()?;
    info!(
        gateway = gateway.name(),
        model = %session.model,
        attachments = request.attachments.len(),
        "starting generation"
    );

    let state = match gateway.generate(&request).await {
        Ok(raw) => session.succeed(&raw)?.clone(),
        Err(e) => session.fail(&e)?.clone(),
    };

    match &state {
        SessionState::Ready => info!(records = session.records().len(), "generation complete"),
        SessionState::NoData => warn!("generation returned no records"),
        _ => {}
    }
    Ok(state)
}
