//! The `GenerationGateway` trait -- the adapter interface for model APIs.
//!
//! The trait is object-safe so callers can hold a `&dyn GenerationGateway`
//! and tests can substitute a canned implementation.

use async_trait::async_trait;

use super::types::{GatewayError, GenerateRequest};

/// Adapter interface for a text/JSON generation service.
///
/// Implementations return the model's raw text. Decoding that text into
/// records is the caller's job (see [`crate::plan::decode_records`]).
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Human-readable name for this gateway (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one generation call and return the raw response text.
    ///
    /// There is no retry policy; a failure is returned to the caller, which
    /// may re-invoke on explicit user request.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GatewayError>;
}

// Compile-time assertion: GenerationGateway must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerationGateway) {}
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelTier;

    /// Echoes the model id back as the response.
    struct EchoGateway;

    #[async_trait]
    impl GenerationGateway for EchoGateway {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, GatewayError> {
            Ok(request.model.model_id().to_string())
        }
    }

    #[tokio::test]
    async fn gateway_is_usable_as_trait_object() {
        let gateway: Box<dyn GenerationGateway> = Box::new(EchoGateway);
        assert_eq!(gateway.name(), "echo");

        let request = GenerateRequest::new(ModelTier::Smart, "x");
        let text = gateway.generate(&request).await.unwrap();
        assert_eq!(text, "gemini-3-pro-preview");
    }
}
