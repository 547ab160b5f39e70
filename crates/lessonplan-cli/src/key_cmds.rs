//! `lessonplan key` commands: the credential store.

use anyhow::{Result, bail};

use crate::KeyCommands;
use crate::config::{self, API_KEY_ENV};

pub fn run_key_command(command: KeyCommands) -> Result<()> {
    match command {
        KeyCommands::Set { key } => cmd_set(&key),
        KeyCommands::Show => cmd_show(),
        KeyCommands::Clear => cmd_clear(),
    }
}

fn cmd_set(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let mut cfg = config::load_config()?;
    cfg.set_api_key(key);
    let path = config::save_config(&cfg)?;

    println!("API key saved to {}", path.display());
    println!("  credential.gemini_api_key = {}", mask_key(key.trim()));
    Ok(())
}

fn cmd_show() -> Result<()> {
    let cfg = config::load_config()?;
    let env_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty());

    match cfg.api_key() {
        Some(key) => println!("Stored key: {} ({})", mask_key(key), config::config_path().display()),
        None => println!("No key stored. Run `lessonplan key set <KEY>`."),
    }
    if let Some(key) = env_key {
        println!("{API_KEY_ENV} is set ({}) and takes precedence.", mask_key(key.trim()));
    }
    Ok(())
}

fn cmd_clear() -> Result<()> {
    let mut cfg = config::load_config()?;
    if !cfg.clear_api_key() {
        println!("No key stored.");
        return Ok(());
    }
    let path = config::save_config(&cfg)?;
    println!("API key removed from {}", path.display());
    Ok(())
}

/// Show only the first and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_keys_keep_head_and_tail() {
        assert_eq!(mask_key("AIzaSyD-0123456789abcd"), "AIza...abcd");
    }

    #[test]
    fn short_keys_are_fully_hidden() {
        assert_eq!(mask_key("abc"), "****");
        assert_eq!(mask_key("abcdefghijkl"), "************");
    }
}
