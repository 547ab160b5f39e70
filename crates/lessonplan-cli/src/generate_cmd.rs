//! `lessonplan generate`: one generation round trip.
//!
//! Resolves settings, reads attachments, runs the session against Gemini,
//! then renders the result and optionally writes the raw response and a
//! `.docx` export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

use lessonplan_core::attachment::read_attachments;
use lessonplan_core::gateway::{GatewayError, GeminiGateway, ModelTier};
use lessonplan_core::session::{GENERIC_FAILURE_MESSAGE, Session, SessionState, run_generation};

use crate::config::{API_KEY_ENV, GenerationConfig};
use crate::{offline_cmds, render};

/// Options collected from the command line.
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub model: Option<ModelTier>,
    pub prompt: String,
    pub files: Vec<PathBuf>,
    pub api_key: Option<String>,
    pub export: Option<PathBuf>,
    pub save_raw: Option<PathBuf>,
    pub json: bool,
    pub raw_math: bool,
}

pub async fn run_generate(options: GenerateOptions) -> Result<()> {
    let resolved = GenerationConfig::resolve(options.api_key.as_deref(), options.model)?;
    let gateway = build_gateway(&resolved)?;

    let attachments = read_attachments(&options.files).await;
    let unreadable = attachments.iter().filter(|a| a.is_empty()).count();
    if unreadable > 0 {
        warn!(unreadable, "some files could not be read and were skipped");
    }

    let mut session = Session::new(resolved.model)
        .with_prompt(options.prompt)
        .with_attachments(attachments)
        .with_temperature(resolved.temperature);

    eprintln!("Analysing with {}...", resolved.model.label());
    let state = run_generation(&mut session, &gateway).await?;

    if let (Some(path), Some(raw)) = (&options.save_raw, session.last_response()) {
        save_raw(path, raw)?;
    }

    match state {
        SessionState::Ready => {
            if session.was_repaired() {
                info!("response contained unescaped backslashes and was repaired");
            }
            render::print_plan(&session.presentation(), options.json, options.raw_math)?;
            if let Some(target) = &options.export {
                let written = offline_cmds::write_document(session.records(), Some(target))?;
                eprintln!("Exported {} rows to {}", session.records().len(), written.display());
            }
            Ok(())
        }
        SessionState::NoData => {
            println!("The model returned no lesson plan rows.");
            if options.export.is_some() {
                warn!("nothing to export");
            }
            Ok(())
        }
        SessionState::DecodeFailed(reason) => {
            error!(%reason, "model response could not be decoded");
            bail!(
                "the model response could not be read as a lesson plan{}",
                if options.save_raw.is_some() {
                    " (raw response saved)"
                } else {
                    "; rerun with --save-raw to inspect it"
                }
            );
        }
        SessionState::Failed(_) => bail!(GENERIC_FAILURE_MESSAGE),
        other => bail!("generation ended in unexpected state: {other}"),
    }
}

/// Build the gateway before any file is read or request sent, so a missing
/// key fails fast.
fn build_gateway(resolved: &GenerationConfig) -> Result<GeminiGateway> {
    let key = resolved.api_key.as_ref().map(|(k, _)| k.as_str()).unwrap_or_default();
    match GeminiGateway::new(key) {
        Ok(gateway) => {
            if let Some((_, source)) = &resolved.api_key {
                info!(%source, endpoint = %resolved.endpoint, "using API key");
            }
            Ok(gateway.with_base_url(&resolved.endpoint))
        }
        Err(GatewayError::MissingCredential) => bail!(
            "API key is missing: run `lessonplan key set <KEY>`, set {API_KEY_ENV} or pass --api-key"
        ),
        Err(e) => Err(e).context("failed to create generation client"),
    }
}

fn save_raw(path: &Path, raw: &str) -> Result<()> {
    std::fs::write(path, raw)
        .with_context(|| format!("cannot write raw response to {}", path.display()))?;
    info!(path = %path.display(), bytes = raw.len(), "raw response saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySource;

    fn resolved(api_key: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            api_key: api_key.map(|k| (k.to_string(), KeySource::Flag)),
            model: ModelTier::Fast,
            temperature: 0.1,
            endpoint: "http://127.0.0.1:9/v1beta/".to_string(),
        }
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let err = build_gateway(&resolved(None)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("API key is missing"), "unexpected error: {msg}");
        assert!(msg.contains(API_KEY_ENV));
    }

    #[test]
    fn gateway_uses_resolved_endpoint() {
        let gateway = build_gateway(&resolved(Some("k"))).unwrap();
        assert_eq!(gateway.base_url(), "http://127.0.0.1:9/v1beta");
    }

    #[test]
    fn raw_response_is_written_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("raw.json");
        save_raw(&path, r#"[{"tenBai": "$\widehat{A}$"}]"#).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"[{"tenBai": "$\widehat{A}$"}]"#
        );
    }

    #[tokio::test]
    async fn empty_input_is_refused() {
        let _lock = crate::test_util::lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = run_generate(GenerateOptions {
            api_key: Some("k".to_string()),
            prompt: "   ".to_string(),
            ..GenerateOptions::default()
        })
        .await;

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("nothing to submit"), "unexpected error: {msg}");
    }
}
