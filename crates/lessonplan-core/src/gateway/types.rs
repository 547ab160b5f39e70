//! Request, model and error types for the generation gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::prompt;

// ---------------------------------------------------------------------------
// Model tiers
// ---------------------------------------------------------------------------

/// The two selectable generation tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    #[default]
    #[serde(alias = "flash")]
    Fast,
    #[serde(alias = "pro")]
    Smart,
}

impl ModelTier {
    /// Identifier sent to the generation API.
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Fast => "gemini-3-flash-preview",
            Self::Smart => "gemini-3-pro-preview",
        }
    }

    /// Human-readable engine name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fast => "Fast Engine (Flash)",
            Self::Smart => "Smart Engine (Pro)",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fast => "fast",
            Self::Smart => "smart",
        };
        f.write_str(s)
    }
}

impl FromStr for ModelTier {
    type Err = ModelTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "flash" => Ok(Self::Fast),
            "smart" | "pro" => Ok(Self::Smart),
            other => Err(ModelTierParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ModelTier`] string.
#[derive(Debug, Clone)]
pub struct ModelTierParseError(pub String);

impl fmt::Display for ModelTierParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid model tier: {:?} (expected fast or smart)", self.0)
    }
}

impl std::error::Error for ModelTierParseError {}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// A file sent alongside the prompt, already base64-encoded.
///
/// An attachment whose file could not be read carries an empty payload
/// rather than failing the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: Uuid,
    /// Display name (file name without directories).
    pub name: String,
    pub mime_type: String,
    /// Base64 payload (standard alphabet, padded).
    pub data: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// `true` when there is no payload to send.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Sampling temperature used unless the caller overrides it.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Everything the gateway needs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: ModelTier,
    pub system_instruction: String,
    pub user_text: String,
    pub attachments: Vec<Attachment>,
    pub temperature: f32,
}

impl GenerateRequest {
    /// Build a request with the fixed lesson-plan system instruction and
    /// the user's free-text input wrapped in the standard template.
    pub fn new(model: ModelTier, input: &str) -> Self {
        Self {
            model,
            system_instruction: prompt::SYSTEM_INSTRUCTION.to_string(),
            user_text: prompt::build_user_text(input),
            attachments: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unrecoverable failures of a generation call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API key is missing")]
    MissingCredential,

    #[error("request to the generation API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation API returned an unreadable response: {0}")]
    InvalidResponse(String),
}
