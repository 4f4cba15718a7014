//! Application configuration
//!
//! ## Configuration Resolution
//!
//! 1. Embedded defaults (`config/sensei.toml`, compiled into the binary)
//! 2. Override file: `--config <path>`, else
//!    `~/.local/share/upisensei/config/sensei.toml` if it exists
//! 3. Environment variables (`OCR_SPACE_API_KEYS`, `GEMINI_API_KEY`, ...)
//!
//! Each layer only replaces the keys it sets.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::ocr::OcrConfig;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/sensei.toml");

/// LLM backend selection and credentials
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// gemini | openai_compatible | mock
    pub backend: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_host: Option<String>,
    pub openai_model: String,
    pub openai_api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openai_host: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_key: None,
            request_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Apply `LLM_BACKEND`, `GEMINI_*` and `OPENAI_COMPATIBLE_*` overrides
    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = var("LLM_BACKEND") {
            self.backend = backend;
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.gemini_model = model;
        }
        if let Some(url) = var("GEMINI_BASE_URL") {
            self.gemini_base_url = url;
        }
        if let Some(host) = var("OPENAI_COMPATIBLE_HOST") {
            self.openai_host = Some(host);
        }
        if let Some(model) = var("OPENAI_COMPATIBLE_MODEL") {
            self.openai_model = model;
        }
        if let Some(key) = var("OPENAI_COMPATIBLE_API_KEY") {
            self.openai_api_key = Some(key);
        }
    }
}

/// HTTP server defaults (CLI flags override these)
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub seed_demo: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: None,
            seed_demo: true,
        }
    }
}

/// Complete UPISensei configuration
#[derive(Debug, Clone, Default)]
pub struct SenseiConfig {
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub server: ServerSettings,
}

impl SenseiConfig {
    /// Resolve embedded defaults, override file and environment
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_toml(DEFAULT_CONFIG)?;

        match override_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                config.merge_file(path)?;
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    config.merge_file(&path)?;
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Defaults with one TOML document applied on top
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge_toml(content)?;
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "Loading config override");
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        self.merge_toml(&content)
    }

    /// Apply every key present in `content`
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        if let Some(ocr) = raw.ocr {
            ocr.apply(&mut self.ocr);
        }
        if let Some(llm) = raw.llm {
            llm.apply(&mut self.llm);
        }
        if let Some(server) = raw.server {
            server.apply(&mut self.server);
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(keys) = var("OCR_SPACE_API_KEYS") {
            let keys: Vec<String> = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if !keys.is_empty() {
                self.ocr.retry.credentials = keys;
            }
        }
        if let Some(url) = var("OCR_SPACE_URL") {
            self.ocr.endpoint = url;
        }
        if let Some(host) = var("UPISENSEI_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("UPISENSEI_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self.llm.apply_vars(&var);
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("upisensei").join("config").join("sensei.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    ocr: Option<RawOcr>,
    llm: Option<RawLlm>,
    server: Option<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawOcr {
    endpoint: Option<String>,
    credentials: Option<Vec<String>>,
    language: Option<String>,
    engine: Option<u8>,
    max_request_kb: Option<usize>,
    chunk_ratio: Option<f64>,
    kb_per_page: Option<usize>,
    rate_limit_backoff_ms: Option<u64>,
    error_backoff_ms: Option<u64>,
    inter_chunk_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl RawOcr {
    fn apply(self, ocr: &mut OcrConfig) {
        if let Some(endpoint) = self.endpoint {
            ocr.endpoint = endpoint;
        }
        if let Some(credentials) = self.credentials {
            ocr.retry.credentials = credentials;
        }
        if let Some(language) = self.language {
            ocr.language = language;
        }
        if let Some(engine) = self.engine {
            ocr.engine = engine;
        }
        if let Some(kb) = self.max_request_kb {
            ocr.max_request_bytes = kb * 1024;
        }
        if let Some(ratio) = self.chunk_ratio.filter(|r| *r > 0.0 && *r <= 1.0) {
            ocr.chunk_ratio = ratio;
        }
        if let Some(kb) = self.kb_per_page {
            ocr.bytes_per_page = kb * 1024;
        }
        if let Some(ms) = self.rate_limit_backoff_ms {
            ocr.retry.rate_limit_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = self.error_backoff_ms {
            ocr.retry.error_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = self.inter_chunk_delay_ms {
            ocr.retry.inter_chunk_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            ocr.retry.request_timeout = Duration::from_secs(secs);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLlm {
    backend: Option<String>,
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    openai_host: Option<String>,
    openai_model: Option<String>,
    openai_api_key: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl RawLlm {
    fn apply(self, llm: &mut LlmConfig) {
        if let Some(backend) = self.backend {
            llm.backend = backend;
        }
        if self.gemini_api_key.is_some() {
            llm.gemini_api_key = self.gemini_api_key;
        }
        if let Some(model) = self.gemini_model {
            llm.gemini_model = model;
        }
        if let Some(url) = self.gemini_base_url {
            llm.gemini_base_url = url;
        }
        if self.openai_host.is_some() {
            llm.openai_host = self.openai_host;
        }
        if let Some(model) = self.openai_model {
            llm.openai_model = model;
        }
        if self.openai_api_key.is_some() {
            llm.openai_api_key = self.openai_api_key;
        }
        if let Some(secs) = self.request_timeout_secs {
            llm.request_timeout_secs = secs;
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
    seed_demo: Option<bool>,
}

impl RawServer {
    fn apply(self, server: &mut ServerSettings) {
        if let Some(host) = self.host {
            server.host = host;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if self.static_dir.is_some() {
            server.static_dir = self.static_dir;
        }
        if let Some(seed) = self.seed_demo {
            server.seed_demo = seed;
        }
    }
}
