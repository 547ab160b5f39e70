//! Generation gateway: the boundary to the hosted language model.
//!
//! ```text
//! Session --submit()--> GenerateRequest
//!     |
//!     v
//! &dyn GenerationGateway --generate(request)--> raw JSON text
//!     |                                             |
//!     |                                             v
//!     |                                  plan::decode_records
//!     v
//! GeminiGateway (reqwest, generateContent REST endpoint)
//! ```

pub mod gemini;
pub mod prompt;
pub mod trait_def;
pub mod types;

pub use gemini::GeminiGateway;
pub use trait_def::GenerationGateway;
pub use types::{
    Attachment, DEFAULT_TEMPERATURE, GatewayError, GenerateRequest, ModelTier, ModelTierParseError,
};
