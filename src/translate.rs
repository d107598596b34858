//! Optional synopsis translation through a local Ollama-style endpoint.
//! Pure fallback: any failure returns the input text unchanged.

use crate::config::TranslationConfig;
use serde_json::{json, Value};
use std::time::Duration;

// Fixed bound on the local-model call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f64 = 0.3;

pub fn translate_synopsis(cfg: &TranslationConfig, text: &str) -> String {
    if !cfg.enabled || text.trim().is_empty() {
        return text.to_string();
    }

    match request_translation(cfg, text) {
        Ok(translated) if !translated.is_empty() => translated,
        Ok(_) => text.to_string(),
        Err(e) => {
            log::error!("translation failed, keeping original text: {e}");
            text.to_string()
        }
    }
}

fn request_translation(cfg: &TranslationConfig, text: &str) -> anyhow::Result<String> {
    let prompt = format!(
        "Translate the following movie synopsis to Spanish (Latin American). \
         Then rewrite it as a short synopsis of maximum 5-6 lines. \
         Use natural, neutral Latin American Spanish suitable for movie descriptions. \
         Return ONLY the final text, no intro, no quotes.\n\nText: {text}"
    );

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    log::info!("translating synopsis via {} ({})", cfg.endpoint, cfg.model);
    let response = client
        .post(&cfg.endpoint)
        .json(&json!({
            "model": cfg.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": TEMPERATURE },
        }))
        .send()?;

    if !response.status().is_success() {
        anyhow::bail!("translation endpoint returned {}", response.status());
    }

    let value: Value = response.json()?;
    Ok(value
        .get("response")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string())
}
