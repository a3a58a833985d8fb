//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with a double underscore, so
//! `APP_EMBEDDING__MODEL_DIR` sets `embedding.model_dir`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_FAKE_DIM: usize = 1024;
pub const DEFAULT_MAX_LEN: usize = 256;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an explicit figment, e.g. an in-memory TOML string.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Missing sections fall back to defaults; malformed ones are errors.
    fn section<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.get(key)
    }

    pub fn embedding(&self) -> Result<EmbeddingSettings> {
        let mut settings: EmbeddingSettings = self.section("embedding")?;
        // Flat legacy keys: APP_USE_FAKE_EMBEDDINGS / APP_MODEL_DIR.
        if let Ok(flag) = self.get::<String>("use_fake_embeddings") {
            settings.use_fake = flag == "1" || flag.eq_ignore_ascii_case("true");
        } else if let Ok(flag) = self.get::<i64>("use_fake_embeddings") {
            settings.use_fake = flag == 1;
        } else if let Ok(flag) = self.get::<bool>("use_fake_embeddings") {
            settings.use_fake = flag;
        }
        if settings.model_dir.is_none() {
            settings.model_dir = self.get::<String>("model_dir").ok();
        }
        Ok(settings)
    }

    pub fn retrieval(&self) -> Result<RetrievalSettings> {
        self.section("retrieval")
    }

    fn validate(&self) -> Result<()> {
        let embedding = self.embedding()?;
        if embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be positive".into()));
        }
        if embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be positive".into()));
        }
        if self.retrieval()?.default_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_top_k must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub use_fake: bool,
    pub fake_dim: usize,
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { use_fake: false, fake_dim: DEFAULT_FAKE_DIM, model_dir: None, max_len: DEFAULT_MAX_LEN }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_top_k: DEFAULT_TOP_K }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
