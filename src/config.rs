use crate::storage::{BackendLocal, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_CTA_URL: &str = "https://instagram.com";
const DEFAULT_STARS_PRICE: u32 = 250;
const DEFAULT_MAX_HANDLER_THREADS: u16 = 4;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

const DEFAULT_TRANSLATION_MODEL: &str = "dolphin-llama3:latest";
const DEFAULT_TRANSLATION_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Optional synopsis translation through a local Ollama-style endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Enable or disable translation of the synopsis before publishing
    #[serde(default)]
    pub enabled: bool,

    /// Local model name
    #[serde(default = "default_translation_model")]
    pub model: String,

    /// Generate endpoint of the local model server
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_TRANSLATION_MODEL.to_string(),
            endpoint: DEFAULT_TRANSLATION_ENDPOINT.to_string(),
        }
    }
}

fn default_translation_model() -> String {
    DEFAULT_TRANSLATION_MODEL.to_string()
}

fn default_translation_endpoint() -> String {
    DEFAULT_TRANSLATION_ENDPOINT.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Bot API token. Overridable via the BOT_TOKEN env var.
    #[serde(default)]
    pub bot_token: String,

    /// Destination channel handle, e.g. "@mychannel" or a numeric chat id.
    #[serde(default)]
    pub channel_id: String,

    /// Privileged identity, always authorized.
    #[serde(default)]
    pub admin_id: u64,

    /// Unlock password. Empty disables the password path.
    #[serde(default)]
    pub access_password: String,

    /// Invoice price in stars for the payment unlock path.
    #[serde(default = "default_stars_price")]
    pub stars_price: u32,

    /// Secondary catalog API key. Overridable via TMDB_API_KEY.
    /// Empty disables enrichment.
    #[serde(default)]
    pub tmdb_api_key: String,

    /// Call-to-action link appended to every publication.
    #[serde(default = "default_cta_url")]
    pub cta_url: String,

    #[serde(default = "default_max_handler_threads")]
    pub max_handler_threads: u16,

    /// Long-poll timeout for the update loop.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            admin_id: 0,
            access_password: String::new(),
            stars_price: DEFAULT_STARS_PRICE,
            tmdb_api_key: String::new(),
            cta_url: DEFAULT_CTA_URL.to_string(),
            max_handler_threads: DEFAULT_MAX_HANDLER_THREADS,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            translation: TranslationConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_stars_price() -> u32 {
    DEFAULT_STARS_PRICE
}

fn default_cta_url() -> String {
    DEFAULT_CTA_URL.to_string()
}

fn default_max_handler_threads() -> u16 {
    DEFAULT_MAX_HANDLER_THREADS
}

fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}

/// Base directory holding config.yaml and the allow-list.
/// CINECAST_DIR wins; falls back to ~/.config/cinecast.
pub fn default_base_path() -> String {
    if let Ok(dir) = std::env::var("CINECAST_DIR") {
        if !dir.is_empty() {
            return dir;
        }
    }

    match homedir::my_home() {
        Ok(Some(home)) => home
            .join(".config")
            .join("cinecast")
            .to_string_lossy()
            .to_string(),
        _ => ".".to_string(),
    }
}

impl Config {
    fn validate(&mut self) -> anyhow::Result<()> {
        if self.max_handler_threads == 0 {
            self.max_handler_threads = 1;
        }

        if self.poll_timeout_secs == 0 || self.poll_timeout_secs > 60 {
            bail!(
                "poll_timeout_secs must be between 1 and 60, got {}",
                self.poll_timeout_secs
            );
        }

        if self.stars_price == 0 {
            bail!("stars_price must be greater than 0");
        }

        Ok(())
    }

    /// Secrets come from the environment when present so the config file
    /// can stay free of tokens.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                self.bot_token = token;
            }
        }
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            if !key.is_empty() {
                self.tmdb_api_key = key;
            }
        }
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            let default_yaml =
                serde_yml::to_string(&Self::default()).context("serializing default config")?;
            store.write("config.yaml", default_yaml.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read("config.yaml")?).context("config file is not valid utf8")?;
        let mut config: Self =
            serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;
        config.apply_env();

        Ok(config)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}
