//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (nested keys split on `__`,
//! e.g. `APP_OLLAMA__BASE_URL`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against the config directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Datasource, SourceLabels};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads configuration relative to the current working directory.
    pub fn load() -> Result<Self> {
        let base_dir = env::current_dir()
            .map_err(|e| Error::InvalidConfig(format!("cannot read working directory: {e}")))?;
        Self::load_from(&base_dir)
    }

    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.validate_for_env(&env_name)?;
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

    /// Typed view of the whole configuration with paths resolved against
    /// the config directory.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings.resolve_paths(&self.base_dir))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        match env {
            "prod" | "production" => {
                // Production must not silently run on hashed embeddings.
                let fake = env::var("APP_USE_FAKE_EMBEDDINGS").ok();
                if fake.as_deref().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
                    return Err(Error::InvalidConfig(
                        "APP_USE_FAKE_EMBEDDINGS is not allowed in production".to_string(),
                    ));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub ollama: OllamaSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub chunks_file: String,
    pub lexical_index_dir: String,
    pub vector_index_dir: String,
    pub vector_table: String,
    /// File-backed sessions are used when set, in-memory otherwise.
    pub session_dir: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            chunks_file: "data/contextualized_chunks.json".to_string(),
            lexical_index_dir: "data/indexes/lexical".to_string(),
            vector_index_dir: "data/indexes/lancedb".to_string(),
            vector_table: "chunks".to_string(),
            session_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub embedding_model: String,
    pub router_model: String,
    pub generation_model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text:latest".to_string(),
            router_model: "gpt-oss:20b".to_string(),
            generation_model: "gpt-oss:20b".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub model_dir: String,
    pub max_length: usize,
    pub top_k: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self { model_dir: "models/ms-marco-MiniLM-L-6-v2".to_string(), max_length: 512, top_k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub candidate_limit: usize,
    /// Route each question to a corpus partition before retrieval.
    pub multi_corpus: bool,
    pub legacy_source: String,
    pub actual_source: String,
    /// Used whenever the router's output cannot be parsed.
    pub default_datasource: Datasource,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        let labels = SourceLabels::default();
        Self {
            candidate_limit: 20,
            multi_corpus: true,
            legacy_source: labels.legacy,
            actual_source: labels.actual,
            default_datasource: Datasource::Actual,
        }
    }
}

impl RetrievalSettings {
    pub fn source_labels(&self) -> SourceLabels {
        SourceLabels { legacy: self.legacy_source.clone(), actual: self.actual_source.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { dimension: 768 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.candidate_limit == 0 {
            return Err(Error::InvalidConfig("retrieval.candidate_limit must be > 0".to_string()));
        }
        if self.reranker.top_k == 0 {
            return Err(Error::InvalidConfig("reranker.top_k must be > 0".to_string()));
        }
        if self.reranker.max_length == 0 {
            return Err(Error::InvalidConfig("reranker.max_length must be > 0".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".to_string()));
        }
        Ok(())
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &str| resolve_with_base(base, p).to_string_lossy().to_string();
        self.data.chunks_file = resolve(&self.data.chunks_file);
        self.data.lexical_index_dir = resolve(&self.data.lexical_index_dir);
        self.data.vector_index_dir = resolve(&self.data.vector_index_dir);
        self.data.session_dir = self.data.session_dir.as_deref().map(resolve);
        self.reranker.model_dir = resolve(&self.reranker.model_dir);
        self
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

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_files() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            let settings = config.settings().map_err(|e| e.to_string())?;
            assert_eq!(settings.retrieval.candidate_limit, 20);
            assert_eq!(settings.reranker.top_k, 5);
            assert_eq!(settings.retrieval.default_datasource, Datasource::Actual);
            assert!(settings.retrieval.multi_corpus);
            assert_eq!(
                PathBuf::from(&settings.data.chunks_file),
                jail.directory().join("data/contextualized_chunks.json")
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_files() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [retrieval]
                candidate_limit = 7
                multi_corpus = false

                [ollama]
                base_url = "http://file:11434"
                "#,
            )?;
            jail.set_env("APP_OLLAMA__BASE_URL", "http://env:11434");
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            let settings = config.settings().map_err(|e| e.to_string())?;
            assert_eq!(settings.retrieval.candidate_limit, 7);
            assert!(!settings.retrieval.multi_corpus);
            assert_eq!(settings.ollama.base_url, "http://env:11434");
            let limit: usize = config.get("retrieval.candidate_limit").map_err(|e| e.to_string())?;
            assert_eq!(limit, 7);
            Ok(())
        });
    }

    #[test]
    fn env_specific_file_is_merged() {
        Jail::expect_with(|jail| {
            jail.set_env("RUST_ENV", "test");
            jail.create_file("config.toml", "[reranker]\ntop_k = 3\n")?;
            jail.create_file("config.test.toml", "[reranker]\ntop_k = 2\n")?;
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            let settings = config.settings().map_err(|e| e.to_string())?;
            assert_eq!(settings.reranker.top_k, 2);
            Ok(())
        });
    }

    #[test]
    fn zero_limits_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[retrieval]\ncandidate_limit = 0\n")?;
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            assert!(matches!(config.settings(), Err(Error::InvalidConfig(_))));
            Ok(())
        });
    }

    #[test]
    fn absolute_paths_are_kept() {
        let base = Path::new("/srv/contarag");
        assert_eq!(resolve_with_base(base, "/data/x.json"), PathBuf::from("/data/x.json"));
        assert_eq!(resolve_with_base(base, "data/x.json"), base.join("data/x.json"));
    }
}
